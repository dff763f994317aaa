//! Post-walk analysis
//!
//! Runs once the tree is materialized. Cycles are cut first so nothing below a
//! repeated ancestor takes part in version election. Names that resolved to
//! more than one identity then go through nearest-wins election: the
//! occurrence closest to the root wins, ties going to the one met first in
//! pre-order, and every losing occurrence takes its whole subtree out of the
//! running. A project always beats a package of the same name.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::graph::{Disposition, GraphItem, GraphTree, NodeId, Tracker};
use crate::library::same_name;

/// A node whose range does not admit the version that won its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionConflictResult {
    pub selected: NodeId,
    pub conflicting: NodeId,
}

/// A nearer, lower version overriding a deeper request for a higher one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DowngradeResult {
    pub downgraded_from: NodeId,
    pub downgraded_to: NodeId,
}

/// Findings of one analysis run, in pre-order discovery order
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub cycles: Vec<NodeId>,
    pub downgrades: Vec<DowngradeResult>,
    pub version_conflicts: Vec<VersionConflictResult>,
    /// Names claimed by more than one distinct project
    pub ambiguous: Vec<String>,
}

impl AnalysisResult {
    /// Downgrades are warnings; cycles and conflicts are not
    pub fn is_success(&self) -> bool {
        self.cycles.is_empty() && self.version_conflicts.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} cycle(s), {} downgrade(s), {} version conflict(s), {} ambiguous name(s)",
            self.cycles.len(),
            self.downgrades.len(),
            self.version_conflicts.len(),
            self.ambiguous.len()
        )
    }

    /// Render every finding as paths from the root
    pub fn report<T>(&self, tree: &GraphTree<T>) -> AnalysisReport {
        AnalysisReport {
            cycles: self
                .cycles
                .iter()
                .map(|id| tree.get_path_segments(*id))
                .collect(),
            downgrades: self
                .downgrades
                .iter()
                .map(|d| DowngradeReport {
                    downgraded_from: tree.get_path_with_last_range(d.downgraded_from),
                    downgraded_to: tree.get_path(d.downgraded_to),
                })
                .collect(),
            version_conflicts: self
                .version_conflicts
                .iter()
                .map(|c| ConflictReport {
                    selected: tree.get_path(c.selected),
                    conflicting: tree.get_path_with_last_range(c.conflicting),
                })
                .collect(),
            ambiguous: self.ambiguous.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DowngradeReport {
    pub downgraded_from: String,
    pub downgraded_to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub selected: String,
    pub conflicting: String,
}

/// Serializable form of an [`AnalysisResult`]
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub cycles: Vec<Vec<String>>,
    pub downgrades: Vec<DowngradeReport>,
    pub version_conflicts: Vec<ConflictReport>,
    pub ambiguous: Vec<String>,
}

/// Per-run bookkeeping, indexed by node
struct Analyzer<'a, T> {
    tree: &'a mut GraphTree<T>,
    /// Pre-order position of each node
    position: Vec<usize>,
    /// Excluded from election: cycles and everything under a rejected node
    dead: Vec<bool>,
    decided: Vec<bool>,
}

impl<'a, T: Clone> Analyzer<'a, T> {
    fn new(tree: &'a mut GraphTree<T>) -> Self {
        let len = tree.len();
        let mut position = vec![0; len];
        for (pos, id) in tree.preorder().into_iter().enumerate() {
            position[id.index()] = pos;
        }
        Self {
            tree,
            position,
            dead: vec![false; len],
            decided: vec![false; len],
        }
    }

    fn rank(&self, id: NodeId) -> (usize, usize) {
        (self.tree[id].depth(), self.position[id.index()])
    }

    fn is_live(&self, id: NodeId) -> bool {
        !self.dead[id.index()]
    }

    fn detect_cycles(&mut self, order: &[NodeId]) -> Vec<NodeId> {
        let mut cycles = Vec::new();
        for &id in order {
            if let Some(parent) = self.tree[id].outer_node() {
                if self.dead[parent.index()] {
                    self.dead[id.index()] = true;
                    continue;
                }
            }

            let name = self.tree.get_id(id);
            let repeats = self
                .tree
                .ancestors(id)
                .any(|ancestor| same_name(self.tree.get_id(ancestor), name));
            if repeats {
                debug!("Cycle detected: {}", self.tree.get_path(id));
                self.tree[id].set_disposition(Disposition::Cycle);
                self.dead[id.index()] = true;
                self.decided[id.index()] = true;
                cycles.push(id);
            }
        }
        cycles
    }

    /// Take a rejected node's descendants out of the running
    fn kill_subtree(&mut self, id: NodeId) {
        let mut stack: Vec<NodeId> = self.tree.children(id).collect();
        while let Some(current) = stack.pop() {
            if self.dead[current.index()] {
                continue;
            }
            self.dead[current.index()] = true;
            self.decided[current.index()] = true;
            self.tree[current].set_disposition(Disposition::Rejected);
            stack.extend(self.tree.children(current));
        }
    }

    /// Nearest live occurrence, projects first
    fn winner(&self, occurrences: &[NodeId]) -> Option<NodeId> {
        let live = occurrences.iter().copied().filter(|id| self.is_live(*id));
        let is_project = |id: &NodeId| {
            self.tree[*id]
                .resolved_item()
                .is_some_and(|item| item.key().library_type().is_project())
        };

        let nearest_project = live
            .clone()
            .filter(is_project)
            .min_by_key(|id| self.rank(*id));
        nearest_project.or_else(|| live.min_by_key(|id| self.rank(*id)))
    }
}

/// Classify every node of a walked tree and collect cycles, downgrades and
/// version conflicts
pub fn analyze<T: Clone>(tree: &mut GraphTree<T>) -> AnalysisResult {
    let order = tree.preorder();
    let mut analyzer = Analyzer::new(tree);
    let mut result = AnalysisResult {
        cycles: analyzer.detect_cycles(&order),
        ..Default::default()
    };

    // Track every live resolved occurrence, grouped by name in first-seen order
    let mut tracker = Tracker::new();
    let mut names: Vec<String> = Vec::new();
    let mut occurrences: HashMap<String, Vec<NodeId>> = HashMap::new();
    for &id in &order {
        if !analyzer.is_live(id) {
            continue;
        }
        let Some(item) = analyzer.tree[id].resolved_item() else {
            continue;
        };
        let name = item.key().name_key();
        if tracker.conflicts_with_tracked_project(item) {
            if !tracker.is_ambiguous(item) {
                result.ambiguous.push(item.key().name().to_string());
            }
            tracker.mark_ambiguous(item);
        } else {
            tracker.track(item);
        }
        occurrences
            .entry(name.clone())
            .or_insert_with(|| {
                names.push(name);
                Vec::new()
            })
            .push(id);
    }

    let any_item = |name: &str, check: &dyn Fn(&GraphItem<T>) -> bool| {
        occurrences[name]
            .iter()
            .any(|id| analyzer.tree[*id].resolved_item().is_some_and(check))
    };
    let ambiguous: HashSet<String> = names
        .iter()
        .filter(|name| any_item(name, &|item| tracker.is_ambiguous(item)))
        .cloned()
        .collect();
    let mut undecided: Vec<String> = names
        .into_iter()
        .filter(|name| {
            ambiguous.contains(name)
                || tracker.is_shadowed(name)
                || any_item(name, &|item| tracker.is_disputed(item))
        })
        .collect();

    // Decide names nearest-first so a rejection is settled before anything
    // below it is considered
    while !undecided.is_empty() {
        let next = undecided
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                analyzer
                    .winner(&occurrences[name])
                    .map(|winner| (analyzer.rank(winner), index, winner))
            })
            .min();
        let Some((_, index, winner)) = next else {
            break;
        };
        let name = undecided.swap_remove(index);
        decide(&mut analyzer, &mut result, &occurrences[&name], winner, ambiguous.contains(&name));
    }

    for &id in &order {
        if analyzer.decided[id.index()] {
            continue;
        }
        // Resolved survivors are accepted, which also clears a speculative
        // downgrade mark the election did not confirm
        if analyzer.tree[id].resolved_item().is_some() {
            analyzer.tree[id].set_disposition(Disposition::Accepted);
        } else {
            analyzer.tree[id].set_disposition(Disposition::Acceptable);
        }
    }

    let position = &analyzer.position;
    result
        .downgrades
        .sort_by_key(|d| position[d.downgraded_from.index()]);
    result
        .version_conflicts
        .sort_by_key(|c| position[c.conflicting.index()]);

    debug!("Analysis finished: {}", result.summary());
    result
}

fn decide<T: Clone>(
    analyzer: &mut Analyzer<'_, T>,
    result: &mut AnalysisResult,
    occurrences: &[NodeId],
    winner: NodeId,
    ambiguous: bool,
) {
    let Some(winning_item) = analyzer.tree[winner].resolved_item().cloned() else {
        return;
    };
    let winner_is_project = winning_item.key().library_type().is_project();

    for &id in occurrences {
        if !analyzer.is_live(id) {
            continue;
        }
        analyzer.decided[id.index()] = true;

        let Some(item) = analyzer.tree[id].resolved_item() else {
            continue;
        };
        if *item == winning_item {
            analyzer.tree[id].set_disposition(Disposition::Accepted);
            continue;
        }

        let shadowed = winner_is_project && !item.key().library_type().is_project();
        let rejected_version = item.key().version().cloned();
        analyzer.tree[id].set_disposition(Disposition::Rejected);
        analyzer.kill_subtree(id);
        debug!(
            "Rejected {} in favour of {}",
            analyzer.tree.get_path(id),
            analyzer.tree.get_id_and_version(winner)
        );

        if shadowed || ambiguous {
            continue;
        }
        let (Some(rejected_version), Some(winning_version)) =
            (rejected_version, winning_item.key().version())
        else {
            continue;
        };

        if rejected_version > *winning_version {
            result.downgrades.push(DowngradeResult {
                downgraded_from: id,
                downgraded_to: winner,
            });
        } else if analyzer.tree[id]
            .key()
            .version_range()
            .is_some_and(|range| !range.satisfies(winning_version))
        {
            result.version_conflicts.push(VersionConflictResult {
                selected: winner,
                conflicting: id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphItem, GraphNode};
    use crate::library::{LibraryIdentity, LibraryRange, SemanticVersion, VersionRange};

    /// Build a node requested with `range` that resolved to `version`
    fn node(name: &str, range: &str, version: &str) -> GraphNode<()> {
        GraphNode::with_item(
            LibraryRange::package(name, VersionRange::parse(range).unwrap()),
            GraphItem::new(
                LibraryIdentity::package(name, SemanticVersion::parse(version).unwrap()),
                (),
            ),
        )
    }

    fn project(name: &str) -> GraphNode<()> {
        GraphNode::with_item(
            LibraryRange::project(name),
            GraphItem::new(LibraryIdentity::project(name, None), ()),
        )
    }

    #[test]
    fn test_nearest_wins_with_conflict() {
        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let root = tree.root();
        let b = tree.add_inner_node(root, node("B", "[2.0]", "2.0"));
        let d2 = tree.add_inner_node(b, node("D", "[2.0]", "2.0"));
        let c = tree.add_inner_node(root, node("C", "[2.0]", "2.0"));
        let d1 = tree.add_inner_node(c, node("D", "[1.0]", "1.0"));

        let result = analyze(&mut tree);

        assert_eq!(tree[d2].disposition(), Disposition::Accepted);
        assert_eq!(tree[d1].disposition(), Disposition::Rejected);
        assert_eq!(
            result.version_conflicts,
            vec![VersionConflictResult {
                selected: d2,
                conflicting: d1
            }]
        );
        assert!(result.downgrades.is_empty());
        assert!(!result.is_success());

        let report = result.report(&tree);
        assert_eq!(report.version_conflicts[0].selected, "A 1.0 -> B 2.0 -> D 2.0");
        assert_eq!(
            report.version_conflicts[0].conflicting,
            "A 1.0 -> C 2.0 -> D (= 1.0.0)"
        );
    }

    #[test]
    fn test_cycles_same_and_different_version() {
        for repeated in ["1.0", "5.0"] {
            let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
            let b = tree.add_inner_node(tree.root(), node("B", "2.0", "2.0"));
            let a = tree.add_inner_node(b, node("A", repeated, repeated));

            let result = analyze(&mut tree);

            assert_eq!(result.cycles, vec![a]);
            assert_eq!(tree[a].disposition(), Disposition::Cycle);
            assert_eq!(tree[b].disposition(), Disposition::Accepted);
            assert!(result.version_conflicts.is_empty());
            assert!(result.downgrades.is_empty());
        }

        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let b = tree.add_inner_node(tree.root(), node("B", "2.0", "2.0"));
        let a = tree.add_inner_node(b, node("A", "1.0", "1.0"));
        analyze(&mut tree);
        assert_eq!(
            tree.get_path_segments(a),
            vec!["A 1.0", "B 2.0", "A 1.0"]
        );
    }

    #[test]
    fn test_downgrade_then_upgrade_is_not_reported() {
        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let root = tree.root();
        tree.add_inner_node(root, node("B", "2.0", "2.0"));
        let c = tree.add_inner_node(root, node("C", "1.0", "1.0"));
        let b1 = tree.add_inner_node(c, node("B", "1.0", "1.0"));
        let mut upgraded = node("B", "2.0", "2.0");
        upgraded.set_disposition(Disposition::PotentiallyDowngraded);
        tree.add_inner_node(b1, upgraded);

        let result = analyze(&mut tree);

        assert!(result.downgrades.is_empty());
        assert!(result.version_conflicts.is_empty());
        assert_eq!(tree[b1].disposition(), Disposition::Rejected);
    }

    #[test]
    fn test_double_downgrade_in_discovery_order() {
        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let root = tree.root();
        let d1 = tree.add_inner_node(root, node("D", "1.0", "1.0"));
        let b1 = tree.add_inner_node(root, node("B", "1.0", "1.0"));
        let x = tree.add_inner_node(root, node("X", "1.0", "1.0"));
        let b2 = tree.add_inner_node(x, node("B", "2.0", "2.0"));
        let y = tree.add_inner_node(root, node("Y", "1.0", "1.0"));
        let d2 = tree.add_inner_node(y, node("D", "2.0", "2.0"));

        let result = analyze(&mut tree);

        assert_eq!(
            result.downgrades,
            vec![
                DowngradeResult {
                    downgraded_from: b2,
                    downgraded_to: b1
                },
                DowngradeResult {
                    downgraded_from: d2,
                    downgraded_to: d1
                },
            ]
        );
        assert!(result.is_success());
        let report = result.report(&tree);
        assert_eq!(report.downgrades[0].downgraded_from, "A 1.0 -> X 1.0 -> B (>= 2.0.0)");
        assert_eq!(report.downgrades[0].downgraded_to, "A 1.0 -> B 1.0");
    }

    #[test]
    fn test_rejected_subtree_leaves_election() {
        // E 2.0 only appears below the losing B, so E 1.0 stands unopposed
        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let root = tree.root();
        tree.add_inner_node(root, node("B", "1.0", "1.0"));
        let c = tree.add_inner_node(root, node("C", "1.0", "1.0"));
        let b2 = tree.add_inner_node(c, node("B", "2.0", "2.0"));
        let e2 = tree.add_inner_node(b2, node("E", "2.0", "2.0"));
        let f = tree.add_inner_node(c, node("F", "1.0", "1.0"));
        let e1 = tree.add_inner_node(f, node("E", "1.0", "1.0"));

        let result = analyze(&mut tree);

        assert_eq!(tree[e2].disposition(), Disposition::Rejected);
        assert_eq!(tree[e1].disposition(), Disposition::Accepted);
        assert_eq!(result.downgrades.len(), 1);
        assert_eq!(result.downgrades[0].downgraded_from, b2);
    }

    #[test]
    fn test_project_shadows_package() {
        let mut tree = GraphTree::new(project("App"));
        let root = tree.root();
        let x = tree.add_inner_node(root, node("X", "1.0", "1.0"));
        let lib_package = tree.add_inner_node(x, node("Lib", "3.0", "3.0"));
        let lib_project = tree.add_inner_node(root, project("Lib"));

        let result = analyze(&mut tree);

        assert_eq!(tree[lib_project].disposition(), Disposition::Accepted);
        assert_eq!(tree[lib_package].disposition(), Disposition::Rejected);
        assert!(result.downgrades.is_empty());
        assert!(result.version_conflicts.is_empty());
        assert!(result.ambiguous.is_empty());
    }

    #[test]
    fn test_distinct_projects_are_ambiguous() {
        let mut tree = GraphTree::new(project("App"));
        let root = tree.root();
        tree.add_inner_node(root, project("Lib"));
        let x = tree.add_inner_node(root, node("X", "1.0", "1.0"));
        tree.add_inner_node(
            x,
            GraphNode::with_item(
                LibraryRange::project("lib"),
                GraphItem::new(
                    LibraryIdentity::project("lib", Some(SemanticVersion::new(2, 0, 0))),
                    (),
                ),
            ),
        );

        let result = analyze(&mut tree);

        assert_eq!(result.ambiguous, vec!["lib".to_string()]);
        assert!(result.downgrades.is_empty());
    }

    #[test]
    fn test_unresolved_nodes_stay_acceptable() {
        let mut tree = GraphTree::new(node("A", "1.0", "1.0"));
        let range = LibraryRange::package("Missing", VersionRange::parse("1.0").unwrap());
        let missing = tree.add_inner_node(
            tree.root(),
            GraphNode::with_item(
                range.clone(),
                GraphItem::new(LibraryIdentity::unresolved(&range), ()),
            ),
        );

        let result = analyze(&mut tree);

        assert_eq!(tree[missing].disposition(), Disposition::Acceptable);
        assert_eq!(tree[tree.root()].disposition(), Disposition::Accepted);
        assert!(result.is_success());
    }
}
