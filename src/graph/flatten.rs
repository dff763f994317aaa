//! Projection of an analyzed tree onto an install order

use std::collections::HashMap;

use tracing::debug;

use crate::graph::{Disposition, GraphTree};
use crate::library::{name_key, LibraryIdentity};
use crate::resolver::graph::DependencyGraph;

impl<T> GraphTree<T> {
    /// Accepted identities, each listed after everything it depends on
    ///
    /// An identity with an unresolved dependency is dropped together with
    /// everything that depends on it. Call after [`crate::graph::analyze`].
    pub fn flatten(&self) -> Vec<LibraryIdentity> {
        let order = self.preorder();

        // Winning identity of every name, from the accepted occurrences
        let mut winners: HashMap<String, LibraryIdentity> = HashMap::new();
        let mut graph = DependencyGraph::new();
        for &id in &order {
            let node = &self[id];
            if node.disposition() != Disposition::Accepted {
                continue;
            }
            if let Some(item) = node.resolved_item() {
                winners
                    .entry(item.key().name_key())
                    .or_insert_with(|| item.key().clone());
                graph.add_library(item.key());
            }
        }

        let mut broken = Vec::new();
        for &id in &order {
            let node = &self[id];
            if node.disposition() != Disposition::Accepted {
                continue;
            }
            let Some(item) = node.resolved_item() else {
                continue;
            };

            for child in self.children(id) {
                let child_node = &self[child];
                match child_node.disposition() {
                    Disposition::Cycle => continue,
                    _ if child_node.resolved_item().is_none() => {
                        broken.push(item.key().clone());
                    }
                    _ => {
                        if let Some(winner) = winners.get(&name_key(self.get_id(child))) {
                            graph.add_dependency(item.key(), winner);
                        }
                    }
                }
            }
        }

        let excluded = graph.dependents_closure(broken.iter());
        if !excluded.is_empty() {
            debug!(
                "Dropping {} librar(ies) with unresolved dependencies",
                excluded.len()
            );
        }

        let root = match self[self.root()].resolved_item() {
            Some(item) => item.key().clone(),
            None => return Vec::new(),
        };
        graph
            .post_order(&root)
            .into_iter()
            .filter(|identity| !excluded.contains(identity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{analyze, GraphItem, GraphNode, GraphTree};
    use crate::library::{LibraryIdentity, LibraryRange, SemanticVersion, VersionRange};

    fn node(name: &str, version: &str) -> GraphNode<()> {
        GraphNode::with_item(
            LibraryRange::package(name, VersionRange::parse(version).unwrap()),
            GraphItem::new(identity(name, version), ()),
        )
    }

    fn identity(name: &str, version: &str) -> LibraryIdentity {
        LibraryIdentity::package(name, SemanticVersion::parse(version).unwrap())
    }

    fn names(identities: &[LibraryIdentity]) -> Vec<String> {
        identities.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_leaves_first_with_winners() {
        let mut tree = GraphTree::new(node("A", "1.0"));
        let root = tree.root();
        let b = tree.add_inner_node(root, node("B", "1.0"));
        tree.add_inner_node(b, node("D", "2.0"));
        let c = tree.add_inner_node(root, node("C", "1.0"));
        let d1 = tree.add_inner_node(c, node("D", "1.0"));
        tree.add_inner_node(d1, node("E", "1.0"));
        analyze(&mut tree);

        assert_eq!(names(&tree.flatten()), vec!["D 2.0", "B 1.0", "C 1.0", "A 1.0"]);
    }

    #[test]
    fn test_unresolved_dependency_drops_dependents() {
        let mut tree = GraphTree::new(node("A", "1.0"));
        let root = tree.root();
        let b = tree.add_inner_node(root, node("B", "1.0"));
        let missing = LibraryRange::package("Missing", VersionRange::parse("1.0").unwrap());
        tree.add_inner_node(
            b,
            GraphNode::with_item(
                missing.clone(),
                GraphItem::new(LibraryIdentity::unresolved(&missing), ()),
            ),
        );
        tree.add_inner_node(root, node("C", "1.0"));
        analyze(&mut tree);

        assert_eq!(names(&tree.flatten()), vec!["C 1.0"]);
    }

    #[test]
    fn test_cycle_edges_are_ignored() {
        let mut tree = GraphTree::new(node("A", "1.0"));
        let b = tree.add_inner_node(tree.root(), node("B", "1.0"));
        tree.add_inner_node(b, node("A", "1.0"));
        analyze(&mut tree);

        assert_eq!(names(&tree.flatten()), vec!["B 1.0", "A 1.0"]);
    }
}
