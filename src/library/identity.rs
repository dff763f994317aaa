//! Library identities: a name plus the concrete version that was resolved

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::library::{LibraryRange, SemanticVersion, VersionRange};

/// What kind of library an identity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Package,
    Project,
    ExternalProject,
    Reference,
    Unresolved,
}

impl LibraryType {
    /// Projects and external projects shadow packages of the same name
    pub fn is_project(&self) -> bool {
        matches!(self, LibraryType::Project | LibraryType::ExternalProject)
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LibraryType::Package => "package",
            LibraryType::Project => "project",
            LibraryType::ExternalProject => "externalProject",
            LibraryType::Reference => "reference",
            LibraryType::Unresolved => "unresolved",
        };
        write!(f, "{}", s)
    }
}

/// A resolved (or explicitly unresolved) library
///
/// Names keep their original casing but compare case-insensitively.
#[derive(Debug, Clone)]
pub struct LibraryIdentity {
    name: String,
    version: Option<SemanticVersion>,
    library_type: LibraryType,
    /// Requested range, only kept for unresolved identities
    unresolved_range: Option<VersionRange>,
}

impl LibraryIdentity {
    pub fn new(name: impl Into<String>, version: Option<SemanticVersion>, library_type: LibraryType) -> Self {
        Self {
            name: name.into(),
            version,
            library_type,
            unresolved_range: None,
        }
    }

    pub fn package(name: impl Into<String>, version: SemanticVersion) -> Self {
        Self::new(name, Some(version), LibraryType::Package)
    }

    pub fn project(name: impl Into<String>, version: Option<SemanticVersion>) -> Self {
        Self::new(name, version, LibraryType::Project)
    }

    /// Placeholder identity for a range no source could satisfy
    pub fn unresolved(range: &LibraryRange) -> Self {
        Self {
            name: range.name().to_string(),
            version: None,
            library_type: LibraryType::Unresolved,
            unresolved_range: range.version_range().cloned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&SemanticVersion> {
        self.version.as_ref()
    }

    pub fn library_type(&self) -> LibraryType {
        self.library_type
    }

    pub fn is_unresolved(&self) -> bool {
        self.library_type == LibraryType::Unresolved
    }

    /// The range an unresolved identity was requested with
    pub fn unresolved_range(&self) -> Option<&VersionRange> {
        self.unresolved_range.as_ref()
    }

    /// Case-insensitive name key
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

impl PartialEq for LibraryIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.library_type == other.library_type
            && same_name(&self.name, &other.name)
            && self.version == other.version
            && self.unresolved_range == other.unresolved_range
    }
}

impl Eq for LibraryIdentity {}

impl Hash for LibraryIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_name(&self.name, state);
        self.version.hash(state);
        self.library_type.hash(state);
    }
}

/// Key under which library names compare, hash and index
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Case-insensitive library name equality
pub fn same_name(left: &str, right: &str) -> bool {
    left == right || name_key(left) == name_key(right)
}

/// Hash a library name the way names compare
pub(crate) fn hash_name<H: Hasher>(name: &str, state: &mut H) {
    name_key(name).hash(state);
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, &self.unresolved_range) {
            (Some(version), _) => write!(f, "{} {}", self.name, version),
            (None, Some(range)) if self.is_unresolved() => {
                write!(f, "{} {}", self.name, range.pretty_print())
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn test_name_compares_case_insensitively() {
        let a = LibraryIdentity::package("Newtonsoft.Json", v("13.0.1"));
        let b = LibraryIdentity::package("newtonsoft.json", v("13.0.1"));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.name(), "Newtonsoft.Json");

        let upper = LibraryIdentity::package("Ünicode.Ölçü", v("1.0"));
        let lower = LibraryIdentity::package("ünicode.ölçü", v("1.0"));
        assert_eq!(upper, lower);
        assert_eq!(hash_of(&upper), hash_of(&lower));
        assert_eq!(upper.name_key(), "ünicode.ölçü");
    }

    #[test]
    fn test_type_and_version_distinguish() {
        let package = LibraryIdentity::package("a", v("1.0.0"));
        let project = LibraryIdentity::project("a", Some(v("1.0.0")));
        assert_ne!(package, project);
        assert_ne!(package, LibraryIdentity::package("a", v("1.0.1")));
    }

    #[test]
    fn test_unresolved_compares_by_range() {
        let one = LibraryRange::package("a", VersionRange::parse("1.0").unwrap());
        let two = LibraryRange::package("a", VersionRange::parse("2.0").unwrap());

        let unresolved = LibraryIdentity::unresolved(&one);
        assert_eq!(unresolved, LibraryIdentity::unresolved(&one));
        assert_ne!(unresolved, LibraryIdentity::unresolved(&two));
        assert_ne!(unresolved, LibraryIdentity::new("a", None, LibraryType::Package));
        assert_eq!(unresolved.to_string(), "a (>= 1.0.0)");
    }
}
