//! Resolved dependency tree
//!
//! Nodes live in a flat arena owned by [`GraphTree`]. A node owns its children
//! through their ids, and its parent link is a plain index used only to
//! rebuild paths, so the tree never forms reference cycles even when the
//! dependency graph does.

use std::fmt::Write as _;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::core::{DepwalkError, DepwalkResult};
use crate::graph::GraphItem;
use crate::library::{same_name, LibraryRange};

/// Index of a node within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Classification of a node after analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Disposition {
    Acceptable,
    Accepted,
    Rejected,
    PotentiallyDowngraded,
    Cycle,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Disposition::Acceptable => "Acceptable",
            Disposition::Accepted => "Accepted",
            Disposition::Rejected => "Rejected",
            Disposition::PotentiallyDowngraded => "PotentiallyDowngraded",
            Disposition::Cycle => "Cycle",
        };
        write!(f, "{}", s)
    }
}

/// Shared by every childless node
static EMPTY_INNER_NODES: Lazy<Arc<Vec<NodeId>>> = Lazy::new(|| Arc::new(Vec::new()));

/// Child list of a node
///
/// Childless nodes all point at one shared empty list. The list becomes owned
/// the first time a child is added through the tree; pushing onto the shared
/// list directly is refused.
#[derive(Debug, Clone)]
pub struct InnerNodes {
    nodes: Arc<Vec<NodeId>>,
    owned: bool,
}

impl InnerNodes {
    pub fn empty() -> Self {
        Self {
            nodes: Arc::clone(&EMPTY_INNER_NODES),
            owned: false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Whether this is the canonical shared empty list
    pub fn is_shared_empty(&self) -> bool {
        !self.owned && Arc::ptr_eq(&self.nodes, &EMPTY_INNER_NODES)
    }

    /// Whether two lists are the same allocation
    pub fn ptr_eq(&self, other: &InnerNodes) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
    }

    /// Append in place; fails on the shared empty list
    pub fn try_push(&mut self, id: NodeId) -> DepwalkResult<()> {
        if !self.owned {
            return Err(DepwalkError::NotSupported(
                "the shared empty child list is read-only".to_string(),
            ));
        }
        Arc::make_mut(&mut self.nodes).push(id);
        Ok(())
    }

    /// Switch to an owned list so it can be appended to
    fn make_owned(&mut self) {
        if !self.owned {
            self.nodes = Arc::new(Vec::new());
            self.owned = true;
        }
    }

    fn push(&mut self, id: NodeId) {
        self.make_owned();
        Arc::make_mut(&mut self.nodes).push(id);
    }
}

impl Default for InnerNodes {
    fn default() -> Self {
        Self::empty()
    }
}

/// One expanded dependency edge
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    key: LibraryRange,
    item: Option<GraphItem<T>>,
    inner_nodes: InnerNodes,
    outer_node: Option<NodeId>,
    disposition: Disposition,
    depth: usize,
}

impl<T> GraphNode<T> {
    pub fn new(key: LibraryRange) -> Self {
        Self {
            key,
            item: None,
            inner_nodes: InnerNodes::empty(),
            outer_node: None,
            disposition: Disposition::Acceptable,
            depth: 0,
        }
    }

    pub fn with_item(key: LibraryRange, item: GraphItem<T>) -> Self {
        let mut node = Self::new(key);
        node.item = Some(item);
        node
    }

    /// The request that produced this node
    pub fn key(&self) -> &LibraryRange {
        &self.key
    }

    pub fn item(&self) -> Option<&GraphItem<T>> {
        self.item.as_ref()
    }

    pub fn item_mut(&mut self) -> Option<&mut GraphItem<T>> {
        self.item.as_mut()
    }

    pub fn set_item(&mut self, item: Option<GraphItem<T>>) {
        self.item = item;
    }

    /// Item of a node that a source actually satisfied
    pub fn resolved_item(&self) -> Option<&GraphItem<T>> {
        self.item.as_ref().filter(|item| item.is_resolved())
    }

    pub fn inner_nodes(&self) -> &InnerNodes {
        &self.inner_nodes
    }

    pub fn inner_nodes_mut(&mut self) -> &mut InnerNodes {
        &mut self.inner_nodes
    }

    pub fn outer_node(&self) -> Option<NodeId> {
        self.outer_node
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn set_disposition(&mut self, disposition: Disposition) {
        self.disposition = disposition;
    }

    /// Distance from the root
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Arena-backed tree produced by one walk
#[derive(Debug, Clone)]
pub struct GraphTree<T> {
    nodes: Vec<GraphNode<T>>,
    root: NodeId,
}

impl<T> GraphTree<T> {
    pub fn new(mut root: GraphNode<T>) -> Self {
        root.outer_node = None;
        root.depth = 0;
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode<T> {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GraphNode<T> {
        &mut self.nodes[id.0]
    }

    /// Attach a node under `parent`, returning its id
    pub fn add_inner_node(&mut self, parent: NodeId, mut node: GraphNode<T>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.outer_node = Some(parent);
        node.depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(node);
        self.nodes[parent.0].inner_nodes.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].inner_nodes.iter()
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].outer_node, move |current| {
            self.nodes[current.0].outer_node
        })
    }

    /// Node ids in depth-first pre-order, children in declaration order
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].inner_nodes.as_slice().iter().rev());
        }
        order
    }

    /// Visit every node in pre-order
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(NodeId, &GraphNode<T>),
    {
        for id in self.preorder() {
            f(id, &self.nodes[id.0]);
        }
    }

    /// Nodes whose resolved or requested name matches, in pre-order
    pub fn find_nodes(&self, name: &str) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| same_name(self.get_id(*id), name))
            .collect()
    }

    /// Indented rendering of the whole tree
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.preorder() {
            let node = &self.nodes[id.0];
            let central = match node.item() {
                Some(item) if item.is_central_transitive => " (central)",
                _ => "",
            };
            let _ = writeln!(
                out,
                "{}{} [{}]{}",
                "  ".repeat(node.depth),
                self.get_id_and_version(id),
                node.disposition,
                central
            );
        }
        out
    }
}

impl<T> Index<NodeId> for GraphTree<T> {
    type Output = GraphNode<T>;

    fn index(&self, id: NodeId) -> &GraphNode<T> {
        self.node(id)
    }
}

impl<T> IndexMut<NodeId> for GraphTree<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut GraphNode<T> {
        self.node_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::VersionRange;

    fn range(name: &str) -> LibraryRange {
        LibraryRange::package(name, VersionRange::parse("1.0").unwrap())
    }

    #[test]
    fn test_childless_nodes_share_empty_list() {
        let a: GraphNode<()> = GraphNode::new(range("a"));
        let b: GraphNode<()> = GraphNode::new(range("b"));

        assert!(a.inner_nodes().ptr_eq(b.inner_nodes()));
        assert!(a.inner_nodes().is_shared_empty());
    }

    #[test]
    fn test_shared_empty_list_rejects_mutation() {
        let mut a: GraphNode<()> = GraphNode::new(range("a"));
        let b: GraphNode<()> = GraphNode::new(range("b"));

        let err = a.inner_nodes_mut().try_push(NodeId(7)).unwrap_err();
        assert!(matches!(err, DepwalkError::NotSupported(_)));
        assert!(b.inner_nodes().is_empty());
        assert!(a.inner_nodes().is_empty());
    }

    #[test]
    fn test_adding_child_promotes_list() {
        let mut tree: GraphTree<()> = GraphTree::new(GraphNode::new(range("root")));
        let leaf = tree.add_inner_node(tree.root(), GraphNode::new(range("leaf")));
        let other: GraphNode<()> = GraphNode::new(range("other"));

        let root = &tree[tree.root()];
        assert!(!root.inner_nodes().is_shared_empty());
        assert!(!root.inner_nodes().ptr_eq(other.inner_nodes()));
        assert_eq!(root.inner_nodes().as_slice(), &[leaf]);
        assert!(tree[leaf].inner_nodes().is_shared_empty());
        assert!(other.inner_nodes().is_empty());

        // Once owned, in-place appends are allowed
        let mut owned = root.inner_nodes().clone();
        owned.try_push(NodeId(9)).unwrap();
        assert_eq!(owned.len(), 2);
        assert_eq!(tree[tree.root()].inner_nodes().len(), 1);
    }

    #[test]
    fn test_preorder_and_depth() {
        let mut tree: GraphTree<()> = GraphTree::new(GraphNode::new(range("a")));
        let root = tree.root();
        let b = tree.add_inner_node(root, GraphNode::new(range("b")));
        let c = tree.add_inner_node(root, GraphNode::new(range("c")));
        let d = tree.add_inner_node(b, GraphNode::new(range("d")));

        assert_eq!(tree.preorder(), vec![root, b, d, c]);
        assert_eq!(tree[d].depth(), 2);
        assert_eq!(tree.ancestors(d).collect::<Vec<_>>(), vec![b, root]);
        assert_eq!(tree.find_nodes("D"), vec![d]);
    }
}
