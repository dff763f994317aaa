//! Flat dependency graph over resolved identities

use std::collections::{HashMap, HashSet};

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::library::LibraryIdentity;

/// Directed graph with an edge from each library to each of its dependencies
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<LibraryIdentity, ()>,
    nodes: HashMap<LibraryIdentity, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Add a library, returning the existing node if it is already present
    pub fn add_library(&mut self, identity: &LibraryIdentity) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(identity) {
            return idx;
        }
        let idx = self.graph.add_node(identity.clone());
        self.nodes.insert(identity.clone(), idx);
        idx
    }

    /// Add a dependency edge; both ends must already be present
    pub fn add_dependency(&mut self, from: &LibraryIdentity, to: &LibraryIdentity) {
        if let (Some(&from_idx), Some(&to_idx)) = (self.nodes.get(from), self.nodes.get(to)) {
            if !self.graph.contains_edge(from_idx, to_idx) {
                self.graph.add_edge(from_idx, to_idx, ());
            }
        }
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// First cycle met by a depth-first search in insertion order
    pub fn find_cycle(&self) -> Option<Vec<LibraryIdentity>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for node in self.graph.node_indices() {
            if !visited.contains(&node) {
                if let Some(cycle) = self.dfs_cycle(node, &mut visited, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        stack: &mut Vec<NodeIndex>,
    ) -> Option<Vec<LibraryIdentity>> {
        visited.insert(node);
        stack.push(node);

        for neighbor in self.ordered_dependencies(node) {
            if let Some(start) = stack.iter().position(|n| *n == neighbor) {
                let mut cycle: Vec<LibraryIdentity> =
                    stack[start..].iter().map(|n| self.graph[*n].clone()).collect();
                cycle.push(self.graph[neighbor].clone());
                return Some(cycle);
            }
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle(neighbor, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }

    /// Dependencies of a node in the order their edges were added
    fn ordered_dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        neighbors.reverse();
        neighbors
    }

    /// Libraries with their dependencies first, or `None` when cyclic
    pub fn topological_order(&self) -> Option<Vec<LibraryIdentity>> {
        let order = toposort(&self.graph, None).ok()?;
        Some(
            order
                .into_iter()
                .rev()
                .map(|idx| self.graph[idx].clone())
                .collect(),
        )
    }

    /// Depth-first post-order starting at `root`, then at every other library
    /// in insertion order; a library is emitted after all of its dependencies
    /// unless a cycle makes that impossible
    pub fn post_order(&self, root: &LibraryIdentity) -> Vec<LibraryIdentity> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.graph.node_count());

        let starts = self
            .nodes
            .get(root)
            .copied()
            .into_iter()
            .chain(self.graph.node_indices());
        for start in starts {
            if visited.insert(start) {
                self.visit_post_order(start, &mut visited, &mut order);
            }
        }
        order
    }

    fn visit_post_order(
        &self,
        start: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        order: &mut Vec<LibraryIdentity>,
    ) {
        // Explicit stack of (node, remaining dependencies) keeps deep graphs
        // off the call stack
        let mut stack = vec![(start, self.ordered_dependencies(start).into_iter())];
        while let Some((node, pending)) = stack.last_mut() {
            match pending.next() {
                Some(next) => {
                    if visited.insert(next) {
                        let deps = self.ordered_dependencies(next).into_iter();
                        stack.push((next, deps));
                    }
                }
                None => {
                    order.push(self.graph[*node].clone());
                    stack.pop();
                }
            }
        }
    }

    /// The given libraries plus everything that depends on them, directly or
    /// transitively
    pub fn dependents_closure<'a, I>(&self, roots: I) -> HashSet<LibraryIdentity>
    where
        I: IntoIterator<Item = &'a LibraryIdentity>,
    {
        let mut stack: Vec<NodeIndex> = roots
            .into_iter()
            .filter_map(|identity| self.nodes.get(identity).copied())
            .collect();
        let mut seen: HashSet<NodeIndex> = stack.iter().copied().collect();

        while let Some(node) = stack.pop() {
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                if seen.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        seen.into_iter().map(|idx| self.graph[idx].clone()).collect()
    }

    /// Direct dependencies in insertion order
    pub fn dependencies(&self, identity: &LibraryIdentity) -> Vec<LibraryIdentity> {
        self.nodes
            .get(identity)
            .map(|&idx| {
                self.ordered_dependencies(idx)
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Libraries that depend directly on this one
    pub fn dependents(&self, identity: &LibraryIdentity) -> Vec<LibraryIdentity> {
        self.nodes
            .get(identity)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn library_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_library(&self, identity: &LibraryIdentity) -> bool {
        self.nodes.contains_key(identity)
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
