//! Pending central version injections

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::library::{name_key, same_name};

/// Names of central pins some transitive edge asked for
///
/// Filled concurrently while the tree is walked and drained once the natural
/// walk is complete. A name is handed out at most once per walk.
#[derive(Debug, Default)]
pub struct TransitiveCentralPackageVersions {
    inner: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    pending: Vec<String>,
    seen: HashSet<String>,
}

impl TransitiveCentralPackageVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a name; returns false if it was already queued or taken
    pub fn try_add(&self, name: &str) -> bool {
        let mut state = self.inner.lock();
        if !state.seen.insert(name_key(name)) {
            return false;
        }
        state.pending.push(name.to_string());
        true
    }

    /// Take a specific queued name
    pub fn try_take_name(&self, name: &str) -> Option<String> {
        let mut state = self.inner.lock();
        let index = state
            .pending
            .iter()
            .position(|pending| same_name(pending, name))?;
        Some(state.pending.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_ignored() {
        let set = TransitiveCentralPackageVersions::new();
        assert!(set.try_add("D"));
        assert!(!set.try_add("d"));
        assert!(set.try_add("E"));

        assert_eq!(set.try_take_name("e").as_deref(), Some("E"));
        assert!(set.try_take_name("E").is_none());
        assert_eq!(set.try_take_name("D").as_deref(), Some("D"));

        // Taken names stay known for the rest of the walk
        assert!(!set.try_add("D"));
        assert!(set.try_take_name("D").is_none());
    }
}
