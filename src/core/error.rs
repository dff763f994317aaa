//! Error types for Depwalk

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for Depwalk operations
pub type DepwalkResult<T> = Result<T, DepwalkError>;

/// Main error type for Depwalk
#[derive(Error, Debug)]
pub enum DepwalkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A source listed the package but could not serve it when asked.
    #[error("Package not found: {package} {version} in source '{source_name}'")]
    PackageNotFound {
        package: String,
        version: String,
        source_name: String,
    },

    #[error("Failed to retrieve information about '{package}' from remote source: {message}")]
    FatalProtocol { package: String, message: String },

    #[error("Package source mapping is enabled, but no source matches the package '{package}'")]
    NamespaceMisconfiguration { package: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid version range: {0}")]
    InvalidVersionRange(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Unable to resolve dependencies: {0}")]
    Unsatisfiable(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout: no source answered within {0} seconds")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    /// A failure observed through a memoized in-flight request.
    #[error(transparent)]
    Shared(Arc<DepwalkError>),

    #[error("{0}")]
    Other(String),
}

impl DepwalkError {
    /// Create a generic error from a string
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DepwalkError::Other(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DepwalkError::Config(msg.into())
    }

    /// Create a catalog error
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        DepwalkError::Catalog(msg.into())
    }

    /// Create a fatal protocol error for a package
    pub fn fatal<P: Into<String>, M: Into<String>>(package: P, message: M) -> Self {
        DepwalkError::FatalProtocol {
            package: package.into(),
            message: message.into(),
        }
    }

    /// The underlying error, looking through shared wrappers
    pub fn root_cause(&self) -> &DepwalkError {
        match self {
            DepwalkError::Shared(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether this is the transient "listed but missing" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), DepwalkError::PackageNotFound { .. })
    }

    /// Whether this error aborts a walk without a retry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root_cause(),
            DepwalkError::FatalProtocol { .. }
                | DepwalkError::NamespaceMisconfiguration { .. }
                | DepwalkError::Timeout(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), DepwalkError::Cancelled)
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.root_cause() {
            DepwalkError::PackageNotFound { .. } => 2,
            DepwalkError::FatalProtocol { .. } => 2,
            DepwalkError::NamespaceMisconfiguration { .. } => 3,
            DepwalkError::Unsatisfiable(_) => 4,
            DepwalkError::Config(_) => 5,
            DepwalkError::Cancelled => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_looks_through_shared() {
        let err = DepwalkError::Shared(Arc::new(DepwalkError::Shared(Arc::new(
            DepwalkError::PackageNotFound {
                package: "a".to_string(),
                version: "1.0.0".to_string(),
                source_name: "feed".to_string(),
            },
        ))));

        assert!(err.is_not_found());
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Package not found: a 1.0.0"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DepwalkError::fatal("a", "boom").is_fatal());
        assert!(DepwalkError::NamespaceMisconfiguration {
            package: "a".to_string()
        }
        .is_fatal());
        assert!(!DepwalkError::Cancelled.is_fatal());
        assert!(DepwalkError::Cancelled.is_cancelled());
    }
}
