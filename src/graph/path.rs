//! Human readable node names and root-to-node paths

use crate::graph::{GraphTree, NodeId};
use crate::library::{LibraryDependencyTarget, LibraryType, SemanticVersion};

impl<T> GraphTree<T> {
    /// Resolved name if there is one, otherwise the name as requested
    pub fn get_id(&self, id: NodeId) -> &str {
        let node = &self[id];
        match node.resolved_item() {
            Some(item) => item.key().name(),
            None => node.key().name(),
        }
    }

    /// `name (>= 1.0.0)`, or just the name for unversioned requests
    pub fn get_id_and_range(&self, id: NodeId) -> String {
        let node = &self[id];
        let range = node.key().pretty_range();
        if range.is_empty() {
            self.get_id(id).to_string()
        } else {
            format!("{} {}", self.get_id(id), range)
        }
    }

    /// `name version` for resolved nodes
    ///
    /// Unresolved nodes fall back to the requested range, except for requests
    /// that could never be a package, which print the bare name.
    pub fn get_id_and_version(&self, id: NodeId) -> String {
        let node = &self[id];
        match node.resolved_item() {
            Some(item) => match item.key().version() {
                Some(version) => format!("{} {}", item.key().name(), version),
                None => item.key().name().to_string(),
            },
            None if !node
                .key()
                .type_constraint()
                .contains(LibraryDependencyTarget::PACKAGE) =>
            {
                self.get_id(id).to_string()
            }
            None => self.get_id_and_range(id),
        }
    }

    pub fn get_version_or_default(&self, id: NodeId) -> Option<&SemanticVersion> {
        self[id].resolved_item().and_then(|item| item.key().version())
    }

    pub fn is_package(&self, id: NodeId) -> bool {
        let node = &self[id];
        match node.resolved_item() {
            Some(item) => item.key().library_type() == LibraryType::Package,
            None => node
                .key()
                .type_constraint()
                .contains(LibraryDependencyTarget::PACKAGE),
        }
    }

    /// Rendered nodes from the root down to `id`
    pub fn get_path_segments(&self, id: NodeId) -> Vec<String> {
        let mut chain: Vec<NodeId> = std::iter::once(id).chain(self.ancestors(id)).collect();
        chain.reverse();
        chain
            .into_iter()
            .map(|node| self.get_id_and_version(node))
            .collect()
    }

    /// `A 1.0 -> B 2.0 -> C 1.0`
    pub fn get_path(&self, id: NodeId) -> String {
        self.get_path_segments(id).join(" -> ")
    }

    /// Like [`GraphTree::get_path`] but the last node shows the range it was
    /// requested with rather than what it resolved to
    pub fn get_path_with_last_range(&self, id: NodeId) -> String {
        let mut segments = self.get_path_segments(id);
        if let Some(last) = segments.last_mut() {
            *last = self.get_id_and_range(id);
        }
        segments.join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{GraphItem, GraphNode, GraphTree};
    use crate::library::{
        LibraryDependencyTarget, LibraryIdentity, LibraryRange, SemanticVersion, VersionRange,
    };

    fn resolved(name: &str, version: &str) -> GraphNode<()> {
        GraphNode::with_item(
            LibraryRange::package(name, VersionRange::parse(version).unwrap()),
            GraphItem::new(
                LibraryIdentity::package(name, SemanticVersion::parse(version).unwrap()),
                (),
            ),
        )
    }

    fn unresolved(range: LibraryRange) -> GraphNode<()> {
        let item = GraphItem::new(LibraryIdentity::unresolved(&range), ());
        GraphNode::with_item(range, item)
    }

    #[test]
    fn test_path_of_resolved_and_unresolved() {
        let mut tree = GraphTree::new(resolved("A", "1.0"));
        let b = tree.add_inner_node(tree.root(), resolved("B", "2.0"));
        let c = tree.add_inner_node(
            b,
            unresolved(LibraryRange::package("C", VersionRange::parse("1.0").unwrap())),
        );

        assert_eq!(tree.get_path(b), "A 1.0 -> B 2.0");
        assert_eq!(tree.get_path(c), "A 1.0 -> B 2.0 -> C (>= 1.0.0)");
        assert_eq!(
            tree.get_path_segments(c),
            vec!["A 1.0", "B 2.0", "C (>= 1.0.0)"]
        );
        assert_eq!(tree.get_path_with_last_range(b), "A 1.0 -> B (>= 2.0.0)");
        assert!(tree.get_version_or_default(c).is_none());
        assert_eq!(tree.get_version_or_default(b).unwrap().to_string(), "2.0");
    }

    #[test]
    fn test_projects_print_name_only() {
        let mut tree = GraphTree::new(GraphNode::with_item(
            LibraryRange::project("App"),
            GraphItem::new(LibraryIdentity::project("App", None), ()),
        ));
        let lib = tree.add_inner_node(tree.root(), unresolved(LibraryRange::project("Lib")));

        assert_eq!(tree.get_path(lib), "App -> Lib");
        assert!(!tree.is_package(tree.root()));
        assert!(!tree.is_package(lib));
    }

    #[test]
    fn test_get_id_uses_requested_name_when_unresolved() {
        let range = LibraryRange::new(
            "Some.Package",
            Some(VersionRange::parse("[1.0,2.0)").unwrap()),
            LibraryDependencyTarget::PACKAGE | LibraryDependencyTarget::PROJECT,
        );
        let tree = GraphTree::new(unresolved(range));

        assert_eq!(tree.get_id(tree.root()), "Some.Package");
        assert!(tree.is_package(tree.root()));
        assert_eq!(
            tree.get_id_and_version(tree.root()),
            "Some.Package (>= 1.0.0 && < 2.0.0)"
        );
    }
}
