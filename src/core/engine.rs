//! Core engine coordinating all Depwalk operations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{load_source, LoadedSource};
use crate::core::{Config, DepwalkError, DepwalkResult};
use crate::graph::{analyze, AnalysisReport, Disposition, GraphTree};
use crate::library::{Framework, LibraryIdentity, LibraryRange};
use crate::resolver::{DependencyBehavior, PackageResolver, PackageResolverContext};
use crate::utils::MetricsSummary;
use crate::walker::{RemoteDependencyWalker, RemoteResolveResult, RemoteWalkContext, RuntimeGraph};

/// What to walk and how
#[derive(Debug, Clone)]
pub struct WalkRequest {
    pub root: LibraryRange,
    /// Falls back to the configured framework, then to `any`
    pub framework: Option<String>,
    pub runtime_identifier: Option<String>,
    /// JSON runtime graph file
    pub runtime_graph: Option<PathBuf>,
    /// Falls back to the configured `walk.recursive`
    pub recursive: Option<bool>,
}

impl WalkRequest {
    pub fn new(root: LibraryRange) -> Self {
        Self {
            root,
            framework: None,
            runtime_identifier: None,
            runtime_graph: None,
            recursive: None,
        }
    }
}

/// One rendered tree node
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub depth: usize,
    pub id: String,
    pub requested: String,
    pub disposition: Disposition,
    pub source: Option<String>,
    pub central: bool,
}

/// Pre-order rendering of a walked tree
pub fn tree_entries(tree: &GraphTree<RemoteResolveResult>) -> Vec<TreeEntry> {
    let mut entries = Vec::with_capacity(tree.len());
    tree.for_each(|id, node| {
        let item = node.item();
        entries.push(TreeEntry {
            depth: node.depth(),
            id: tree.get_id_and_version(id),
            requested: tree.get_id_and_range(id),
            disposition: node.disposition(),
            source: item.and_then(|item| item.data.source().map(str::to_string)),
            central: item.is_some_and(|item| item.is_central_transitive),
        });
    });
    entries
}

/// Everything one analyzed walk produced
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    pub root: String,
    pub framework: String,
    pub success: bool,
    pub summary: String,
    pub tree: Vec<TreeEntry>,
    pub analysis: AnalysisReport,
    pub flattened: Vec<String>,
    pub metrics: MetricsSummary,
}

/// Main engine for Depwalk operations
pub struct Engine {
    /// Project root directory
    pub project_dir: PathBuf,

    /// Configuration
    pub config: Config,

    /// Loaded catalog sources, in configuration order
    pub sources: Vec<LoadedSource>,

    token: CancellationToken,
}

impl Engine {
    /// Create a new engine for the given project directory
    pub fn new(project_dir: &Path) -> DepwalkResult<Self> {
        let project_dir = project_dir.canonicalize().unwrap_or_else(|_| project_dir.to_path_buf());
        let config = Config::load(&project_dir)?;
        Self::with_config(project_dir, config)
    }

    /// Create an engine from an already loaded configuration
    pub fn with_config(project_dir: PathBuf, config: Config) -> DepwalkResult<Self> {
        let sources = config
            .sources
            .iter()
            .map(|source| load_source(&config, &project_dir, source))
            .collect::<DepwalkResult<Vec<_>>>()?;

        Ok(Self {
            project_dir,
            config,
            sources,
            token: CancellationToken::new(),
        })
    }

    /// Cancel walks and resolves when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Ensure at least one source is configured
    pub fn ensure_sources(&self) -> DepwalkResult<()> {
        if self.sources.is_empty() {
            return Err(DepwalkError::config(
                "No sources configured; add [[sources]] to depwalk.toml",
            ));
        }
        Ok(())
    }

    /// Requested framework, else the configured one, else `any`
    pub fn framework(&self, requested: Option<&str>) -> Framework {
        requested
            .or(self.config.walk.framework.as_deref())
            .map(Framework::new)
            .unwrap_or_else(Framework::any)
    }

    /// A walker over every loaded source, with fresh caches and metrics
    pub fn walker(&self) -> RemoteDependencyWalker {
        let mut context = RemoteWalkContext::from_config(&self.config);
        for source in &self.sources {
            context.add_provider(Arc::clone(&source.provider));
        }
        RemoteDependencyWalker::new(Arc::new(context)).with_cancellation(self.token.clone())
    }

    fn load_runtime_graph(&self, path: &Path) -> DepwalkResult<RuntimeGraph> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        };
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Walk without analysis
    pub async fn walk(
        &self,
        walker: &RemoteDependencyWalker,
        request: &WalkRequest,
    ) -> DepwalkResult<GraphTree<RemoteResolveResult>> {
        self.ensure_sources()?;
        let framework = self.framework(request.framework.as_deref());
        let runtime_graph = request
            .runtime_graph
            .as_deref()
            .map(|path| self.load_runtime_graph(path))
            .transpose()?;
        let recursive = request.recursive.unwrap_or(self.config.walk.recursive);

        debug!(
            "Walking {} for {} (recursive: {})",
            request.root, framework, recursive
        );
        walker
            .walk(
                request.root.clone(),
                framework,
                request.runtime_identifier.as_deref(),
                runtime_graph.as_ref(),
                recursive,
            )
            .await
    }

    /// Walk, analyze and flatten
    pub async fn analyze(&self, request: &WalkRequest) -> DepwalkResult<WalkReport> {
        let walker = self.walker();
        let mut tree = self.walk(&walker, request).await?;
        let result = analyze(&mut tree);
        info!("{}", result.summary());

        let flattened = tree
            .flatten()
            .into_iter()
            .map(|identity| identity.to_string())
            .collect();

        Ok(WalkReport {
            root: request.root.to_string(),
            framework: self.framework(request.framework.as_deref()).to_string(),
            success: result.is_success(),
            summary: result.summary(),
            tree: tree_entries(&tree),
            analysis: result.report(&tree),
            flattened,
            metrics: walker.context().metrics.summary(),
        })
    }

    /// Pick one version per package for `targets` across all package sources
    pub fn resolve(
        &self,
        targets: Vec<String>,
        behavior: DependencyBehavior,
        preferred: Vec<LibraryIdentity>,
        framework: Option<&str>,
    ) -> DepwalkResult<Vec<LibraryIdentity>> {
        self.ensure_sources()?;
        let framework = self.framework(framework);
        let mut available = Vec::new();
        for source in &self.sources {
            available.extend(source.catalog.package_infos(&source.name, &framework)?);
        }

        let context = PackageResolverContext::new(behavior, targets, available)
            .with_preferred_versions(preferred);
        PackageResolver::new()
            .with_cancellation(self.token.clone())
            .resolve(&context)
    }
}
