//! Library provider capability
//!
//! A provider answers two questions for one source: which concrete library
//! best satisfies a range, and what that library depends on. Everything
//! about how it finds out (files, HTTP, project system) stays behind the
//! trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cache::SourceCacheContext;
use crate::core::DepwalkResult;
use crate::library::{Framework, LibraryDependency, LibraryDependencyTarget, LibraryIdentity, LibraryRange};

/// Where a provider's libraries come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Packages already on disk, consulted before any remote source
    Local,
    /// Projects of the current solution
    Project,
    /// Package feeds
    Remote,
}

impl ProviderKind {
    /// Whether this kind of provider can satisfy a request with this constraint
    pub fn is_eligible(self, target: LibraryDependencyTarget) -> bool {
        match self {
            ProviderKind::Project => target.intersects(
                LibraryDependencyTarget::PROJECT | LibraryDependencyTarget::EXTERNAL_PROJECT,
            ),
            ProviderKind::Local | ProviderKind::Remote => {
                target.contains(LibraryDependencyTarget::PACKAGE)
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Local => "local",
            ProviderKind::Project => "project",
            ProviderKind::Remote => "remote",
        };
        write!(f, "{}", s)
    }
}

/// Declared edges of one concrete library
#[derive(Debug, Clone)]
pub struct LibraryDependencyInfo {
    pub identity: LibraryIdentity,
    pub framework: Framework,
    pub dependencies: Vec<LibraryDependency>,
    /// False when the source knew the library but not its dependencies
    pub resolved: bool,
}

impl LibraryDependencyInfo {
    pub fn new(identity: LibraryIdentity, framework: Framework, dependencies: Vec<LibraryDependency>) -> Self {
        Self {
            identity,
            framework,
            dependencies,
            resolved: true,
        }
    }

    /// Info for a library whose dependencies could not be determined
    pub fn unresolved(identity: LibraryIdentity, framework: Framework) -> Self {
        Self {
            identity,
            framework,
            dependencies: Vec::new(),
            resolved: false,
        }
    }
}

#[async_trait]
pub trait DependencyProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Source name, matched against package namespace configuration
    fn source(&self) -> &str;

    /// Best library this source has for `range`, if any
    async fn find_library(
        &self,
        range: &LibraryRange,
        framework: &Framework,
        cache: &SourceCacheContext,
        token: &CancellationToken,
    ) -> DepwalkResult<Option<LibraryIdentity>>;

    /// Dependencies of a library this source returned from `find_library`
    ///
    /// Fails with [`crate::core::DepwalkError::PackageNotFound`] when the
    /// source listed the library but can no longer serve it.
    async fn get_dependencies(
        &self,
        identity: &LibraryIdentity,
        framework: &Framework,
        cache: &SourceCacheContext,
        token: &CancellationToken,
    ) -> DepwalkResult<LibraryDependencyInfo>;
}

/// A library together with the provider that found it
#[derive(Clone)]
pub struct RemoteMatch {
    pub library: LibraryIdentity,
    pub provider: Arc<dyn DependencyProvider>,
}

impl fmt::Debug for RemoteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMatch")
            .field("library", &self.library)
            .field("source", &self.provider.source())
            .field("kind", &self.provider.kind())
            .finish()
    }
}

/// Payload the walker stores on every graph item
#[derive(Debug, Clone)]
pub struct RemoteResolveResult {
    /// `None` for unresolved libraries
    pub match_: Option<RemoteMatch>,
    pub dependencies: Vec<LibraryDependency>,
}

impl RemoteResolveResult {
    pub fn unresolved() -> Self {
        Self {
            match_: None,
            dependencies: Vec::new(),
        }
    }

    /// Name of the source that served the library
    pub fn source(&self) -> Option<&str> {
        self.match_.as_ref().map(|m| m.provider.source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility() {
        let package = LibraryDependencyTarget::PACKAGE;
        let project = LibraryDependencyTarget::PROJECT;
        let external = LibraryDependencyTarget::EXTERNAL_PROJECT;

        assert!(ProviderKind::Remote.is_eligible(package));
        assert!(ProviderKind::Local.is_eligible(package | project));
        assert!(!ProviderKind::Remote.is_eligible(external));
        assert!(ProviderKind::Project.is_eligible(external));
        assert!(ProviderKind::Project.is_eligible(package | project));
        assert!(!ProviderKind::Project.is_eligible(package));
    }
}
