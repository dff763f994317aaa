//! Runtime identifier graph
//!
//! Each runtime identifier (RID) may import more general RIDs and may declare
//! extra dependencies for specific packages, e.g. a native asset package that
//! is only needed on `linux-x64`.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::DepwalkResult;
use crate::library::{same_name, LibraryDependency, LibraryRange, VersionRange};

/// One extra dependency declared by a runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeDependency {
    pub id: String,
    pub range: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeDescription {
    /// More general runtimes this one inherits from, nearest first
    #[serde(default, rename = "#import")]
    pub imports: Vec<String>,
    /// Package name to the dependencies it gains on this runtime
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<RuntimeDependency>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeGraph {
    #[serde(default)]
    pub runtimes: HashMap<String, RuntimeDescription>,
}

impl RuntimeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_runtime(&mut self, rid: impl Into<String>, description: RuntimeDescription) {
        self.runtimes.insert(rid.into(), description);
    }

    /// `rid` followed by everything it imports, breadth-first, without repeats
    pub fn expand_runtime(&self, rid: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([rid.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(description) = self.runtimes.get(&current) {
                queue.extend(description.imports.iter().cloned());
            }
            order.push(current);
        }
        order
    }

    /// Extra dependencies of `package` on `rid`
    ///
    /// The nearest runtime that mentions the package wins; more general
    /// runtimes are not merged in.
    pub fn find_runtime_dependencies(&self, rid: &str, package: &str) -> DepwalkResult<Vec<LibraryDependency>> {
        for runtime in self.expand_runtime(rid) {
            let Some(description) = self.runtimes.get(&runtime) else {
                continue;
            };
            let declared = description
                .dependencies
                .iter()
                .find(|(name, _)| same_name(name, package));
            if let Some((_, dependencies)) = declared {
                return dependencies
                    .iter()
                    .map(|dependency| {
                        let range = VersionRange::parse(&dependency.range)?;
                        Ok(LibraryDependency::new(LibraryRange::package(
                            dependency.id.clone(),
                            range,
                        )))
                    })
                    .collect();
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> RuntimeGraph {
        serde_json::from_str(
            r##"{
                "runtimes": {
                    "any": {},
                    "unix": { "#import": ["any"],
                              "dependencies": { "Native": [ { "id": "Native.Unix", "range": "1.0" } ] } },
                    "linux": { "#import": ["unix"] },
                    "linux-x64": { "#import": ["linux"],
                                   "dependencies": { "native": [ { "id": "Native.LinuxX64", "range": "[2.0]" } ] } }
                }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_expand_nearest_first() {
        assert_eq!(
            graph().expand_runtime("linux-x64"),
            vec!["linux-x64", "linux", "unix", "any"]
        );
        assert_eq!(graph().expand_runtime("unknown"), vec!["unknown"]);
    }

    #[test]
    fn test_nearest_runtime_wins() {
        let graph = graph();

        let x64 = graph.find_runtime_dependencies("linux-x64", "Native").unwrap();
        assert_eq!(x64.len(), 1);
        assert_eq!(x64[0].name(), "Native.LinuxX64");

        let linux = graph.find_runtime_dependencies("linux", "Native").unwrap();
        assert_eq!(linux[0].name(), "Native.Unix");

        assert!(graph.find_runtime_dependencies("any", "Native").unwrap().is_empty());
    }
}
