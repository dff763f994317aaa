//! Ordering and diagnostics for a resolved package set

use std::collections::HashMap;

use crate::library::{name_key, same_name, LibraryIdentity};
use crate::resolver::graph::DependencyGraph;
use crate::resolver::SourcePackageDependencyInfo;

fn project(packages: &[&SourcePackageDependencyInfo]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let by_name: HashMap<String, &LibraryIdentity> = packages
        .iter()
        .map(|package| (package.name_key(), &package.identity))
        .collect();

    for package in packages {
        graph.add_library(&package.identity);
    }
    for package in packages {
        for dependency in &package.dependencies {
            if let Some(target) = by_name.get(&name_key(&dependency.id)) {
                graph.add_dependency(&package.identity, target);
            }
        }
    }
    graph
}

/// Packages ordered so each comes after everything it depends on
///
/// Ties keep the order of `packages`. Cycles are broken at the edge that
/// closes them.
pub fn topological_sort(packages: &[&SourcePackageDependencyInfo]) -> Vec<LibraryIdentity> {
    let Some(first) = packages.first() else {
        return Vec::new();
    };
    project(packages).post_order(&first.identity)
}

/// The first dependency cycle among `packages`, starting and ending with the
/// same identity
pub fn find_first_circular_dependency(
    packages: &[&SourcePackageDependencyInfo],
) -> Option<Vec<LibraryIdentity>> {
    project(packages).find_cycle()
}

/// Explain why `selected` could not be completed from `available`
///
/// Reports the first requirement, in selection order, that no available
/// package can meet.
pub fn diagnostic_message(
    targets: &[String],
    selected: &[&SourcePackageDependencyInfo],
    available: &[SourcePackageDependencyInfo],
) -> String {
    let candidates = |id: &str| -> Vec<&SourcePackageDependencyInfo> {
        available
            .iter()
            .filter(|package| same_name(package.identity.name(), id))
            .collect()
    };

    for target in targets {
        if candidates(target).is_empty() {
            return format!("Unable to find package '{}'", target);
        }
    }

    for package in selected {
        for dependency in &package.dependencies {
            let found = candidates(&dependency.id);
            if found.is_empty() {
                return format!(
                    "Unable to find package '{}'. {} depends on it",
                    dependency.id, package.identity
                );
            }

            if let Some(chosen) = selected
                .iter()
                .find(|other| same_name(other.identity.name(), &dependency.id))
            {
                if !chosen.satisfies(&dependency.range) {
                    return format!(
                        "{} requires {} {} but {} was selected",
                        package.identity,
                        dependency.id,
                        dependency.range.pretty_print(),
                        chosen.identity
                    );
                }
                continue;
            }

            // Every selected package that constrains this id
            let requirements: Vec<(&LibraryIdentity, &crate::library::VersionRange)> = selected
                .iter()
                .flat_map(|requirer| {
                    requirer
                        .dependencies
                        .iter()
                        .filter(|d| same_name(&d.id, &dependency.id))
                        .map(move |d| (&requirer.identity, &d.range))
                })
                .collect();
            let joint = found
                .iter()
                .any(|candidate| requirements.iter().all(|(_, range)| candidate.satisfies(range)));
            if !joint {
                let detail: Vec<String> = requirements
                    .iter()
                    .map(|(requirer, range)| format!("{} requires {}", requirer, range.pretty_print()))
                    .collect();
                return format!(
                    "Unable to find a version of '{}' that satisfies every requirement: {}",
                    dependency.id,
                    detail.join(", ")
                );
            }
        }
    }

    format!("Unable to resolve dependencies of {}", targets.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PackageDependency;

    fn package(id: &str, version: &str, dependencies: &[(&str, &str)]) -> SourcePackageDependencyInfo {
        SourcePackageDependencyInfo::new(
            id,
            version,
            dependencies
                .iter()
                .map(|(id, range)| PackageDependency::parse(id, range).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let a = package("A", "1.0", &[("B", "1.0"), ("C", "1.0")]);
        let b = package("B", "1.0", &[("C", "1.0")]);
        let c = package("C", "1.0", &[]);

        let order: Vec<String> = topological_sort(&[&a, &b, &c])
            .into_iter()
            .map(|identity| identity.to_string())
            .collect();
        assert_eq!(order, vec!["C 1.0", "B 1.0", "A 1.0"]);
        assert!(find_first_circular_dependency(&[&a, &b, &c]).is_none());
    }

    #[test]
    fn test_cycle_is_found() {
        let a = package("A", "1.0", &[("B", "1.0")]);
        let b = package("B", "1.0", &[("A", "1.0")]);

        let cycle: Vec<String> = find_first_circular_dependency(&[&a, &b])
            .unwrap()
            .into_iter()
            .map(|identity| identity.to_string())
            .collect();
        assert_eq!(cycle, vec!["A 1.0", "B 1.0", "A 1.0"]);
    }

    #[test]
    fn test_diagnostic_names_first_broken_requirement() {
        let a = package("A", "1.0", &[("C", "[1.0]")]);
        let b = package("B", "1.0", &[("C", "[2.0]")]);
        let available = vec![
            a.clone(),
            b.clone(),
            package("C", "1.0", &[]),
            package("C", "2.0", &[]),
        ];
        let targets = vec!["A".to_string(), "B".to_string()];

        let message = diagnostic_message(&targets, &[&a, &b], &available);
        assert_eq!(
            message,
            "Unable to find a version of 'C' that satisfies every requirement: \
             A 1.0 requires (= 1.0.0), B 1.0 requires (= 2.0.0)"
        );

        let missing = diagnostic_message(&["Z".to_string()], &[], &available);
        assert_eq!(missing, "Unable to find package 'Z'");
    }
}
