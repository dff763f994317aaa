//! Target framework names

use std::fmt;

use serde::{Deserialize, Serialize};

/// A target framework moniker such as `net8.0`
///
/// Frameworks are opaque to the walker; they only key caches and select the
/// dependency group a source reports. Comparison ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Framework(String);

impl Framework {
    /// Framework used when a source does not group dependencies
    pub const ANY: &'static str = "any";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn any() -> Self {
        Self::new(Self::ANY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_any(&self) -> bool {
        self.0 == Self::ANY
    }
}

impl From<String> for Framework {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Framework {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Framework> for String {
    fn from(framework: Framework) -> Self {
        framework.0
    }
}

impl Default for Framework {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
