//! Library requests: a name, an acceptable version range and the kinds of
//! library allowed to satisfy it

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitOr, BitOrAssign};

use crate::library::identity::{hash_name, name_key, same_name};
use crate::library::{LibraryType, VersionRange};

/// Set of library kinds a request may resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LibraryDependencyTarget(u8);

impl LibraryDependencyTarget {
    pub const NONE: Self = Self(0);
    pub const PACKAGE: Self = Self(1);
    pub const PROJECT: Self = Self(1 << 1);
    pub const EXTERNAL_PROJECT: Self = Self(1 << 2);
    pub const REFERENCE: Self = Self(1 << 3);
    pub const PACKAGE_PROJECT_EXTERNAL: Self = Self(1 | (1 << 1) | (1 << 2));
    pub const ALL: Self = Self(0b1111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether a resolved type is allowed by this set
    pub fn allows(self, library_type: LibraryType) -> bool {
        match library_type {
            LibraryType::Package => self.contains(Self::PACKAGE),
            LibraryType::Project => self.contains(Self::PROJECT),
            LibraryType::ExternalProject => self.contains(Self::EXTERNAL_PROJECT),
            LibraryType::Reference => self.contains(Self::REFERENCE),
            LibraryType::Unresolved => true,
        }
    }

    /// Parse a target name such as `package` or `project`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "package" => Some(Self::PACKAGE),
            "project" => Some(Self::PROJECT),
            "externalproject" => Some(Self::EXTERNAL_PROJECT),
            "reference" => Some(Self::REFERENCE),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }
}

impl BitOr for LibraryDependencyTarget {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LibraryDependencyTarget {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A request for a library
#[derive(Debug, Clone)]
pub struct LibraryRange {
    name: String,
    version_range: Option<VersionRange>,
    type_constraint: LibraryDependencyTarget,
}

impl LibraryRange {
    pub fn new(
        name: impl Into<String>,
        version_range: Option<VersionRange>,
        type_constraint: LibraryDependencyTarget,
    ) -> Self {
        Self {
            name: name.into(),
            version_range,
            type_constraint,
        }
    }

    /// A request that only packages may satisfy
    pub fn package(name: impl Into<String>, version_range: VersionRange) -> Self {
        Self::new(name, Some(version_range), LibraryDependencyTarget::PACKAGE)
    }

    /// A project reference, which carries no version
    pub fn project(name: impl Into<String>) -> Self {
        Self::new(
            name,
            None,
            LibraryDependencyTarget::PROJECT | LibraryDependencyTarget::EXTERNAL_PROJECT,
        )
    }

    /// The name exactly as it was requested
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_range(&self) -> Option<&VersionRange> {
        self.version_range.as_ref()
    }

    pub fn type_constraint(&self) -> LibraryDependencyTarget {
        self.type_constraint
    }

    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Range rendering used in paths: `(>= 1.0.0)`, empty when unversioned
    pub fn pretty_range(&self) -> String {
        self.version_range
            .as_ref()
            .map(|range| range.pretty_print())
            .unwrap_or_default()
    }
}

impl PartialEq for LibraryRange {
    fn eq(&self, other: &Self) -> bool {
        same_name(&self.name, &other.name)
            && self.version_range == other.version_range
            && self.type_constraint == other.type_constraint
    }
}

impl Eq for LibraryRange {}

impl Hash for LibraryRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_name(&self.name, state);
        self.version_range.hash(state);
        self.type_constraint.hash(state);
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_range {
            Some(range) => write!(f, "{} {}", self.name, range),
            None => write!(f, "{}", self.name),
        }
    }
}

/// How a dependency was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceType {
    #[default]
    Direct,
    Transitive,
    /// Not a reference at all, e.g. a central version pin
    None,
}

/// A declared dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryDependency {
    pub library_range: LibraryRange,
    pub reference_type: ReferenceType,
    pub version_centrally_managed: bool,
}

impl LibraryDependency {
    pub fn new(library_range: LibraryRange) -> Self {
        Self {
            library_range,
            reference_type: ReferenceType::Direct,
            version_centrally_managed: false,
        }
    }

    /// A centrally managed version that nothing references directly
    pub fn central_pin(library_range: LibraryRange) -> Self {
        Self {
            library_range,
            reference_type: ReferenceType::None,
            version_centrally_managed: true,
        }
    }

    pub fn name(&self) -> &str {
        self.library_range.name()
    }

    /// Pins are injected later rather than walked as edges
    pub fn is_central_pin(&self) -> bool {
        self.version_centrally_managed && self.reference_type == ReferenceType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_target_flags() {
        let both = LibraryDependencyTarget::PACKAGE | LibraryDependencyTarget::PROJECT;
        assert!(both.contains(LibraryDependencyTarget::PACKAGE));
        assert!(both.intersects(LibraryDependencyTarget::PROJECT));
        assert!(!both.contains(LibraryDependencyTarget::EXTERNAL_PROJECT));
        assert!(!LibraryDependencyTarget::EXTERNAL_PROJECT.allows(LibraryType::Package));
        assert!(LibraryDependencyTarget::ALL.allows(LibraryType::Reference));
        assert_eq!(
            LibraryDependencyTarget::parse("ExternalProject"),
            Some(LibraryDependencyTarget::EXTERNAL_PROJECT)
        );
    }

    #[test]
    fn test_range_is_case_insensitive_key() {
        let mut map = HashMap::new();
        map.insert(
            LibraryRange::package("Foo", VersionRange::parse("1.0").unwrap()),
            1,
        );
        let lookup = LibraryRange::package("foo", VersionRange::parse("1.0.0").unwrap());
        assert_eq!(map.get(&lookup), Some(&1));

        let other = LibraryRange::package("foo", VersionRange::parse("[1.0]").unwrap());
        assert!(!map.contains_key(&other));
    }

    #[test]
    fn test_central_pin() {
        let pin = LibraryDependency::central_pin(LibraryRange::package(
            "d",
            VersionRange::parse("[2.0]").unwrap(),
        ));
        assert!(pin.is_central_pin());
        assert!(!LibraryDependency::new(pin.library_range.clone()).is_central_pin());
    }
}
