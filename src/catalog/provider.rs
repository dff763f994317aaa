//! Provider backed by an in-memory catalog

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::cache::SourceCacheContext;
use crate::catalog::types::{dependency_group, Catalog, CatalogDependency};
use crate::core::{DepwalkError, DepwalkResult};
use crate::library::{
    name_key, Framework, LibraryDependency, LibraryIdentity, LibraryRange, SemanticVersion,
};
use crate::walker::{DependencyProvider, LibraryDependencyInfo, ProviderKind};

struct PackageEntry {
    identity: LibraryIdentity,
    listed: bool,
    dependencies: std::collections::BTreeMap<String, Vec<CatalogDependency>>,
}

/// Serves one catalog as a source of the given kind
///
/// Package and project kinds read different halves of the catalog: a
/// `Project` provider only answers for `projects`, the others only for
/// `packages`.
pub struct CatalogProvider {
    source: String,
    kind: ProviderKind,
    /// Lowercased id to every version, in catalog order
    packages: HashMap<String, Vec<PackageEntry>>,
    projects: HashMap<String, (LibraryIdentity, std::collections::BTreeMap<String, Vec<CatalogDependency>>)>,
}

impl CatalogProvider {
    pub fn new(source: impl Into<String>, kind: ProviderKind, catalog: Catalog) -> DepwalkResult<Self> {
        let mut packages: HashMap<String, Vec<PackageEntry>> = HashMap::new();
        for package in catalog.packages {
            let version = SemanticVersion::parse(&package.version)?;
            packages
                .entry(name_key(&package.id))
                .or_default()
                .push(PackageEntry {
                    identity: LibraryIdentity::package(package.id, version),
                    listed: package.listed,
                    dependencies: package.dependencies,
                });
        }

        let mut projects = HashMap::new();
        for project in catalog.projects {
            let version = project
                .version
                .as_deref()
                .map(SemanticVersion::parse)
                .transpose()?;
            projects.insert(
                name_key(&project.name),
                (LibraryIdentity::project(project.name, version), project.dependencies),
            );
        }

        Ok(Self {
            source: source.into(),
            kind,
            packages,
            projects,
        })
    }

    fn convert(dependencies: &[CatalogDependency]) -> DepwalkResult<Vec<LibraryDependency>> {
        dependencies
            .iter()
            .map(CatalogDependency::to_library_dependency)
            .collect()
    }

    fn find_package(&self, range: &LibraryRange) -> Option<LibraryIdentity> {
        let entries = self.packages.get(&range.name_key())?;
        let Some(version_range) = range.version_range() else {
            // Unversioned requests take the highest listed version
            return entries
                .iter()
                .filter(|entry| entry.listed)
                .max_by(|a, b| a.identity.version().cmp(&b.identity.version()))
                .map(|entry| entry.identity.clone());
        };

        let listed = entries
            .iter()
            .filter(|entry| entry.listed)
            .filter_map(|entry| entry.identity.version());
        if let Some(best) = version_range.find_best_match(listed) {
            return entries
                .iter()
                .find(|entry| entry.identity.version() == Some(best))
                .map(|entry| entry.identity.clone());
        }

        // An unlisted version is still served when it is the exact floor
        entries
            .iter()
            .find(|entry| {
                entry
                    .identity
                    .version()
                    .is_some_and(|version| version_range.is_unbeatable(version))
            })
            .map(|entry| entry.identity.clone())
    }
}

#[async_trait]
impl DependencyProvider for CatalogProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn source(&self) -> &str {
        &self.source
    }

    async fn find_library(
        &self,
        range: &LibraryRange,
        _framework: &Framework,
        _cache: &SourceCacheContext,
        token: &CancellationToken,
    ) -> DepwalkResult<Option<LibraryIdentity>> {
        if token.is_cancelled() {
            return Err(DepwalkError::Cancelled);
        }
        let found = match self.kind {
            ProviderKind::Project => self
                .projects
                .get(&range.name_key())
                .map(|(identity, _)| identity.clone()),
            ProviderKind::Local | ProviderKind::Remote => self.find_package(range),
        };
        trace!(
            "{} '{}' -> {}",
            self.source,
            range,
            found.as_ref().map(|f| f.to_string()).unwrap_or_else(|| "none".to_string())
        );
        Ok(found)
    }

    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        framework: &Framework,
        _cache: &SourceCacheContext,
        token: &CancellationToken,
    ) -> DepwalkResult<LibraryDependencyInfo> {
        if token.is_cancelled() {
            return Err(DepwalkError::Cancelled);
        }
        let not_found = || DepwalkError::PackageNotFound {
            package: identity.name().to_string(),
            version: identity
                .version()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            source_name: self.source.clone(),
        };

        let groups = match self.kind {
            ProviderKind::Project => {
                let (_, groups) = self.projects.get(&identity.name_key()).ok_or_else(not_found)?;
                groups
            }
            ProviderKind::Local | ProviderKind::Remote => {
                let entry = self
                    .packages
                    .get(&identity.name_key())
                    .and_then(|entries| entries.iter().find(|entry| entry.identity == *identity))
                    .ok_or_else(not_found)?;
                &entry.dependencies
            }
        };

        let dependencies = Self::convert(dependency_group(groups, framework))?;
        Ok(LibraryDependencyInfo::new(
            identity.clone(),
            framework.clone(),
            dependencies,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::VersionRange;

    fn provider() -> CatalogProvider {
        let mut catalog = Catalog::new()
            .with_package("X", "1.0.0-bEta", &[])
            .with_package("A", "1.0", &[("B", "[2.0]")])
            .with_package("A", "2.0", &[])
            .with_package("A", "3.0", &[]);
        catalog.packages[3].listed = false;
        CatalogProvider::new("feed", ProviderKind::Remote, catalog).unwrap()
    }

    async fn find(provider: &CatalogProvider, name: &str, range: &str) -> Option<LibraryIdentity> {
        provider
            .find_library(
                &LibraryRange::package(name, VersionRange::parse(range).unwrap()),
                &Framework::any(),
                &SourceCacheContext::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_keeps_published_casing() {
        let provider = provider();
        let found = find(&provider, "x", "1.0.0-beta").await.unwrap();
        assert_eq!(found.name(), "X");
        assert_eq!(found.version().unwrap().to_string(), "1.0.0-bEta");
    }

    #[tokio::test]
    async fn test_unlisted_versions() {
        let provider = provider();
        assert_eq!(find(&provider, "a", "*").await.unwrap().to_string(), "A 2.0");
        assert_eq!(find(&provider, "a", "[3.0]").await.unwrap().to_string(), "A 3.0");
        assert!(find(&provider, "a", "4.0").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_version_is_not_found() {
        let provider = provider();
        let token = CancellationToken::new();
        let cache = SourceCacheContext::new();

        let info = provider
            .get_dependencies(
                &LibraryIdentity::package("a", SemanticVersion::new(1, 0, 0)),
                &Framework::new("net8.0"),
                &cache,
                &token,
            )
            .await
            .unwrap();
        assert_eq!(info.dependencies.len(), 1);
        assert_eq!(info.dependencies[0].name(), "B");

        let err = provider
            .get_dependencies(
                &LibraryIdentity::package("a", SemanticVersion::new(9, 0, 0)),
                &Framework::any(),
                &cache,
                &token,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
