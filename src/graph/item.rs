//! Resolved graph items

use std::hash::{Hash, Hasher};

use crate::library::LibraryIdentity;

/// A resolved library together with whatever the resolver learned about it
///
/// Identity is the key alone. Two items with the same key are the same item
/// no matter what payload they carry, so a path never holds one library twice.
#[derive(Debug, Clone)]
pub struct GraphItem<T> {
    key: LibraryIdentity,
    pub data: T,
    pub is_central_transitive: bool,
}

impl<T> GraphItem<T> {
    pub fn new(key: LibraryIdentity, data: T) -> Self {
        Self {
            key,
            data,
            is_central_transitive: false,
        }
    }

    pub fn key(&self) -> &LibraryIdentity {
        &self.key
    }

    pub fn with_central_transitive(mut self, is_central_transitive: bool) -> Self {
        self.is_central_transitive = is_central_transitive;
        self
    }

    /// Whether a source actually satisfied the request
    pub fn is_resolved(&self) -> bool {
        !self.key.is_unresolved()
    }
}

impl<T> PartialEq for GraphItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for GraphItem<T> {}

impl<T> Hash for GraphItem<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{LibraryType, SemanticVersion};
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn identity(name: &str, version: &str, library_type: LibraryType) -> LibraryIdentity {
        LibraryIdentity::new(name, Some(SemanticVersion::parse(version).unwrap()), library_type)
    }

    #[test]
    fn test_equality_ignores_payload() {
        let a = GraphItem::new(identity("a", "1.0.0", LibraryType::Package), vec!["x"]);
        let b = GraphItem::new(identity("A", "1.0.0", LibraryType::Package), vec!["y", "z"])
            .with_central_transitive(true);

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_key_fields_distinguish() {
        let base = GraphItem::new(identity("a", "1.0.0", LibraryType::Package), ());
        let other_name = GraphItem::new(identity("b", "1.0.0", LibraryType::Package), ());
        let other_version = GraphItem::new(identity("a", "2.0.0", LibraryType::Package), ());
        let other_type = GraphItem::new(identity("a", "1.0.0", LibraryType::Project), ());

        for other in [&other_name, &other_version, &other_type] {
            assert_ne!(&base, other);
            assert_ne!(hash_of(&base), hash_of(other));
        }
    }
}
