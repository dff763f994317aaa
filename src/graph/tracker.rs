//! Per-run registry of the distinct items seen for each library name

use std::collections::HashMap;

use crate::graph::GraphItem;
use crate::library::name_key;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrackerKey {
    name: String,
    project: bool,
}

impl TrackerKey {
    fn of<T>(item: &GraphItem<T>) -> Self {
        Self {
            name: item.key().name_key(),
            project: item.key().library_type().is_project(),
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    items: Vec<(GraphItem<T>, usize)>,
    ambiguous: bool,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ambiguous: false,
        }
    }
}

/// Counts the distinct items tracked per name
///
/// Projects and packages of the same name are kept in separate entries, so a
/// project shadowing a package never disputes it. A name is disputed once two
/// distinct items share an entry.
#[derive(Debug)]
pub struct Tracker<T> {
    entries: HashMap<TrackerKey, Entry<T>>,
}

impl<T: Clone> Tracker<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn track(&mut self, item: &GraphItem<T>) {
        let entry = self.entries.entry(TrackerKey::of(item)).or_default();
        match entry.items.iter_mut().find(|(tracked, _)| tracked == item) {
            Some((_, count)) => *count += 1,
            None => entry.items.push((item.clone(), 1)),
        }
    }

    pub fn mark_ambiguous(&mut self, item: &GraphItem<T>) {
        self.entries
            .entry(TrackerKey::of(item))
            .or_default()
            .ambiguous = true;
    }

    pub fn is_disputed(&self, item: &GraphItem<T>) -> bool {
        self.get_disputes(item).len() > 1
    }

    pub fn is_ambiguous(&self, item: &GraphItem<T>) -> bool {
        self.entries
            .get(&TrackerKey::of(item))
            .is_some_and(|entry| entry.ambiguous)
    }

    /// Whether a project item would clash with a different project already
    /// tracked under the same name
    pub fn conflicts_with_tracked_project(&self, item: &GraphItem<T>) -> bool {
        if !item.key().library_type().is_project() {
            return false;
        }
        self.entries
            .get(&TrackerKey::of(item))
            .is_some_and(|entry| entry.items.iter().any(|(tracked, _)| tracked != item))
    }

    /// Every distinct item tracked alongside this one, itself included
    pub fn get_disputes(&self, item: &GraphItem<T>) -> Vec<&GraphItem<T>> {
        self.entries
            .get(&TrackerKey::of(item))
            .map(|entry| entry.items.iter().map(|(tracked, _)| tracked).collect())
            .unwrap_or_default()
    }

    /// Whether both a project and a package were tracked for this name
    pub fn is_shadowed(&self, name: &str) -> bool {
        let name = name_key(name);
        let has = |project| {
            self.entries.contains_key(&TrackerKey {
                name: name.clone(),
                project,
            })
        };
        has(true) && has(false)
    }
}

impl<T: Clone> Default for Tracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{LibraryIdentity, SemanticVersion};

    fn package(name: &str, version: &str) -> GraphItem<()> {
        GraphItem::new(
            LibraryIdentity::package(name, SemanticVersion::parse(version).unwrap()),
            (),
        )
    }

    fn project(name: &str) -> GraphItem<()> {
        GraphItem::new(LibraryIdentity::project(name, None), ())
    }

    #[test]
    fn test_same_item_is_not_disputed() {
        let mut tracker = Tracker::new();
        tracker.track(&package("a", "1.0"));
        tracker.track(&package("A", "1.0.0"));

        assert!(!tracker.is_disputed(&package("a", "1.0")));
        assert_eq!(tracker.get_disputes(&package("a", "1.0")).len(), 1);
    }

    #[test]
    fn test_distinct_versions_are_disputed() {
        let mut tracker = Tracker::new();
        tracker.track(&package("a", "1.0"));
        tracker.track(&package("a", "2.0"));
        tracker.track(&package("b", "1.0"));

        assert!(tracker.is_disputed(&package("a", "2.0")));
        assert!(!tracker.is_disputed(&package("b", "1.0")));
        assert_eq!(tracker.get_disputes(&package("a", "1.0")).len(), 2);
    }

    #[test]
    fn test_project_shadows_package_without_dispute() {
        let mut tracker = Tracker::new();
        tracker.track(&package("a", "1.0"));
        tracker.track(&project("a"));

        assert!(!tracker.is_disputed(&package("a", "1.0")));
        assert!(!tracker.is_disputed(&project("a")));
        assert!(tracker.is_shadowed("A"));
    }

    #[test]
    fn test_ambiguous_projects() {
        let mut tracker = Tracker::new();
        let first = GraphItem::new(
            LibraryIdentity::project("a", Some(SemanticVersion::new(1, 0, 0))),
            (),
        );
        let second = project("a");
        tracker.track(&first);

        assert!(tracker.conflicts_with_tracked_project(&second));
        assert!(!tracker.conflicts_with_tracked_project(&first));
        tracker.mark_ambiguous(&second);
        assert!(tracker.is_ambiguous(&first));
        assert!(!tracker.is_ambiguous(&package("a", "1.0")));
    }
}
