//! File-backed package and project catalogs

pub mod provider;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::core::config::{Config, SourceConfig};
use crate::core::DepwalkResult;
use crate::walker::DependencyProvider;

pub use provider::CatalogProvider;
pub use types::{Catalog, CatalogDependency, CatalogPackage, CatalogProject};

/// A configured source, parsed and ready to serve
pub struct LoadedSource {
    pub name: String,
    pub catalog: Catalog,
    pub provider: Arc<dyn DependencyProvider>,
}

/// Load one configured source
pub fn load_source(config: &Config, project_dir: &Path, source: &SourceConfig) -> DepwalkResult<LoadedSource> {
    let path = config.source_path(project_dir, source);
    let catalog = Catalog::load(&path)?;
    debug!(
        "Loaded source '{}' from {}: {} packages, {} projects",
        source.name,
        path.display(),
        catalog.packages.len(),
        catalog.projects.len()
    );
    let provider = CatalogProvider::new(source.name.clone(), source.kind, catalog.clone())?;
    Ok(LoadedSource {
        name: source.name.clone(),
        catalog,
        provider: Arc::new(provider),
    })
}
