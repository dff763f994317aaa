//! Everything one walk needs from its surroundings

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::SourceCacheContext;
use crate::core::config::Config;
use crate::library::{name_key, same_name};
use crate::utils::WalkMetrics;
use crate::walker::{DependencyProvider, ProviderKind};

/// Default bound on a cross-provider lookup
pub const DEFAULT_FIND_TIMEOUT: Duration = Duration::from_secs(300);

/// Per-source package name patterns
///
/// A pattern ending in `*` matches names with that prefix, any other pattern
/// matches one name exactly. Both compare case-insensitively. When any source
/// is configured, sources without a matching pattern are not consulted.
#[derive(Debug, Clone, Default)]
pub struct PackageNamespaces {
    sources: HashMap<String, Vec<String>>,
}

impl PackageNamespaces {
    pub fn new(sources: HashMap<String, Vec<String>>) -> Self {
        Self { sources }
    }

    pub fn is_enabled(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Whether `source` may serve `package`
    pub fn is_source_eligible(&self, source: &str, package: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        self.sources
            .iter()
            .filter(|(name, _)| same_name(name, source))
            .flat_map(|(_, patterns)| patterns)
            .any(|pattern| pattern_matches(pattern, package))
    }

    /// Sources configured for `package`, sorted
    pub fn sources_for(&self, package: &str) -> Vec<&str> {
        let mut sources: Vec<&str> = self
            .sources
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| pattern_matches(p, package)))
            .map(|(source, _)| source.as_str())
            .collect();
        sources.sort_unstable();
        sources
    }
}

fn pattern_matches(pattern: &str, package: &str) -> bool {
    let pattern = pattern.trim();
    match pattern.strip_suffix('*') {
        Some(prefix) => name_key(package).starts_with(&name_key(prefix)),
        None => same_name(pattern, package),
    }
}

/// Providers, cache policy and limits for one resolution run
pub struct RemoteWalkContext {
    pub cache_context: SourceCacheContext,
    pub local_providers: Vec<Arc<dyn DependencyProvider>>,
    pub remote_providers: Vec<Arc<dyn DependencyProvider>>,
    pub project_providers: Vec<Arc<dyn DependencyProvider>>,
    /// `None` when every provider may serve every name
    pub package_namespaces: Option<PackageNamespaces>,
    /// How long a cross-provider lookup may take before partial answers
    /// are used
    pub find_timeout: Duration,
    pub metrics: Arc<WalkMetrics>,
}

impl RemoteWalkContext {
    pub fn new(cache_context: SourceCacheContext) -> Self {
        Self {
            cache_context,
            local_providers: Vec::new(),
            remote_providers: Vec::new(),
            project_providers: Vec::new(),
            package_namespaces: None,
            find_timeout: DEFAULT_FIND_TIMEOUT,
            metrics: Arc::new(WalkMetrics::new()),
        }
    }

    /// Context with cache policy, namespaces and timeout from config; no
    /// providers yet
    pub fn from_config(config: &Config) -> Self {
        let namespaces = PackageNamespaces::new(config.namespaces.sources.clone());
        Self {
            package_namespaces: namespaces.is_enabled().then_some(namespaces),
            find_timeout: Duration::from_secs(config.walk.find_timeout_secs),
            ..Self::new(SourceCacheContext::from_config(&config.cache))
        }
    }

    /// File a provider under the list its kind belongs to
    pub fn add_provider(&mut self, provider: Arc<dyn DependencyProvider>) {
        match provider.kind() {
            ProviderKind::Local => self.local_providers.push(provider),
            ProviderKind::Remote => self.remote_providers.push(provider),
            ProviderKind::Project => self.project_providers.push(provider),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn DependencyProvider>) -> Self {
        self.add_provider(provider);
        self
    }

    pub fn with_namespaces(mut self, namespaces: PackageNamespaces) -> Self {
        self.package_namespaces = namespaces.is_enabled().then_some(namespaces);
        self
    }

    pub fn with_find_timeout(mut self, timeout: Duration) -> Self {
        self.find_timeout = timeout;
        self
    }

    /// Remote providers allowed to serve `package`
    pub fn eligible_remote_providers(&self, package: &str) -> Vec<Arc<dyn DependencyProvider>> {
        self.remote_providers
            .iter()
            .filter(|provider| {
                self.package_namespaces
                    .as_ref()
                    .map_or(true, |ns| ns.is_source_eligible(provider.source(), package))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespaces() -> PackageNamespaces {
        let mut sources = HashMap::new();
        sources.insert("nuget".to_string(), vec!["*".to_string()]);
        sources.insert(
            "contoso".to_string(),
            vec!["Contoso.*".to_string(), "Special".to_string()],
        );
        PackageNamespaces::new(sources)
    }

    #[test]
    fn test_prefix_and_exact_patterns() {
        let ns = namespaces();

        assert!(ns.is_source_eligible("contoso", "contoso.core"));
        assert!(ns.is_source_eligible("Contoso", "SPECIAL"));
        assert!(!ns.is_source_eligible("contoso", "Special.Extra"));
        assert!(ns.is_source_eligible("nuget", "anything"));
        assert!(!ns.is_source_eligible("unknown", "anything"));
        assert_eq!(ns.sources_for("Contoso.Core"), vec!["contoso", "nuget"]);
    }

    #[test]
    fn test_patterns_fold_non_ascii_case() {
        let mut sources = HashMap::new();
        sources.insert("intern".to_string(), vec!["Öffentlich.*".to_string(), "Straße".to_string()]);
        let ns = PackageNamespaces::new(sources);

        assert!(ns.is_source_eligible("intern", "öffentlich.Core"));
        assert!(ns.is_source_eligible("intern", "STRAßE"));
        assert!(!ns.is_source_eligible("intern", "Öffentlich"));
    }

    #[test]
    fn test_disabled_allows_everything() {
        let ns = PackageNamespaces::default();
        assert!(!ns.is_enabled());
        assert!(ns.is_source_eligible("any", "thing"));
    }
}
