//! Configuration handling for Depwalk
//!
//! Supports depwalk.toml, .depwalkrc, and environment variable overrides.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{DepwalkError, DepwalkResult};
use crate::walker::ProviderKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog sources, in lookup order
    pub sources: Vec<SourceConfig>,

    /// Walk behaviour
    pub walk: WalkConfig,

    /// Source cache policy
    pub cache: CacheConfig,

    /// Package namespace filtering
    pub namespaces: NamespacesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Expand transitive dependencies
    pub recursive: bool,

    /// Bound on a cross-source lookup, in seconds
    pub find_timeout_secs: u64,

    /// Target framework when none is given
    pub framework: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bypass source caches
    pub no_cache: bool,

    /// Do not keep downloads in the global packages folder
    pub direct_download: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespacesConfig {
    /// Source name to package name patterns (`Contoso.*` or an exact id)
    pub sources: HashMap<String, Vec<String>>,
}

/// A catalog file served as one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name, used by namespace patterns
    pub name: String,

    /// Kind of provider the catalog is served as
    pub kind: ProviderKind,

    /// Catalog file, relative to the project directory
    pub path: PathBuf,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            find_timeout_secs: 300, // 5 minutes
            framework: None,
        }
    }
}

impl Config {
    /// Load configuration from project directory and merge with defaults
    pub fn load(project_dir: &Path) -> DepwalkResult<Self> {
        let mut config = Config::default();

        // Try loading depwalk.toml
        let toml_path = project_dir.join("depwalk.toml");
        if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)?;
            let file_config: Config = toml::from_str(&content)?;
            config = config.merge(file_config);
        }

        // Try loading .depwalkrc (JSON format)
        let rc_path = project_dir.join(".depwalkrc");
        if rc_path.exists() {
            let content = std::fs::read_to_string(&rc_path)?;
            let file_config: Config = serde_json::from_str(&content)?;
            config = config.merge(file_config);
        }

        // Apply environment variable overrides
        config = config.apply_overrides(|key| env::var(key).ok())?;

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(self, other: Config) -> Self {
        Self {
            walk: WalkConfig {
                recursive: other.walk.recursive,
                find_timeout_secs: if other.walk.find_timeout_secs != WalkConfig::default().find_timeout_secs {
                    other.walk.find_timeout_secs
                } else {
                    self.walk.find_timeout_secs
                },
                framework: other.walk.framework.or(self.walk.framework),
            },
            cache: CacheConfig {
                no_cache: other.cache.no_cache || self.cache.no_cache,
                direct_download: other.cache.direct_download || self.cache.direct_download,
            },
            namespaces: NamespacesConfig {
                sources: {
                    let mut merged = self.namespaces.sources;
                    merged.extend(other.namespaces.sources);
                    merged
                },
            },
            sources: if !other.sources.is_empty() {
                other.sources
            } else {
                self.sources
            },
        }
    }

    /// Apply `DEPWALK_*` overrides read through `lookup`
    fn apply_overrides<F>(mut self, lookup: F) -> DepwalkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |value: &str| value == "1" || value.eq_ignore_ascii_case("true");

        if let Some(timeout) = lookup("DEPWALK_FIND_TIMEOUT") {
            self.walk.find_timeout_secs = timeout.trim().parse().map_err(|_| {
                DepwalkError::config(format!("DEPWALK_FIND_TIMEOUT is not a number: {}", timeout))
            })?;
        }

        if let Some(recursive) = lookup("DEPWALK_RECURSIVE") {
            self.walk.recursive = flag(&recursive);
        }

        if let Some(no_cache) = lookup("DEPWALK_NO_CACHE") {
            self.cache.no_cache = flag(&no_cache);
        }

        if let Some(framework) = lookup("DEPWALK_FRAMEWORK") {
            self.walk.framework = Some(framework);
        }

        Ok(self)
    }

    /// Resolve a source path against the project directory
    pub fn source_path(&self, project_dir: &Path, source: &SourceConfig) -> PathBuf {
        if source.path.is_absolute() {
            source.path.clone()
        } else {
            project_dir.join(&source.path)
        }
    }

    /// Save configuration to depwalk.toml
    pub fn save(&self, project_dir: &Path) -> DepwalkResult<()> {
        let toml_path = project_dir.join("depwalk.toml");
        let content = toml::to_string_pretty(self)?;
        std::fs::write(toml_path, content)?;
        Ok(())
    }
}
