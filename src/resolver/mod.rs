//! Package resolver for Depwalk
//!
//! Picks one version per package id for a set of install targets so that
//! every selected package's dependency ranges hold at once. Candidates are
//! tried in preference order with backtracking.

pub mod graph;
pub mod utility;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::core::{DepwalkError, DepwalkResult};
use crate::library::{name_key, LibraryIdentity, SemanticVersion, VersionRange};
use crate::walker::LibraryDependencyInfo;

pub use graph::DependencyGraph;
pub use utility::{diagnostic_message, find_first_circular_dependency, topological_sort};

/// Upper bound on candidate trials before a resolve gives up
pub const DEFAULT_MAX_ATTEMPTS: usize = 100_000;

/// Which version of a dependency to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyBehavior {
    /// Do not pull in dependencies at all
    Ignore,
    #[default]
    Lowest,
    /// Lowest major.minor, highest patch within it
    HighestPatch,
    /// Lowest major, highest minor and patch within it
    HighestMinor,
    Highest,
}

impl std::str::FromStr for DependencyBehavior {
    type Err = DepwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "lowest" => Ok(Self::Lowest),
            "highestpatch" => Ok(Self::HighestPatch),
            "highestminor" => Ok(Self::HighestMinor),
            "highest" => Ok(Self::Highest),
            _ => Err(DepwalkError::config(format!("Unknown dependency behavior '{}'", s))),
        }
    }
}

impl DependencyBehavior {
    /// Preference order of two versions, `Less` meaning tried first
    fn order(self, a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
        match self {
            Self::Ignore | Self::Lowest => a.cmp(b),
            Self::Highest => b.cmp(a),
            Self::HighestPatch => (a.major(), a.minor())
                .cmp(&(b.major(), b.minor()))
                .then_with(|| b.cmp(a)),
            Self::HighestMinor => a.major().cmp(&b.major()).then_with(|| b.cmp(a)),
        }
    }
}

/// A dependency edge as the resolver sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    pub id: String,
    pub range: VersionRange,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }

    pub fn parse(id: &str, range: &str) -> DepwalkResult<Self> {
        Ok(Self::new(id, VersionRange::parse(range)?))
    }
}

/// One package version offered by a source, with its dependencies
#[derive(Debug, Clone)]
pub struct SourcePackageDependencyInfo {
    pub identity: LibraryIdentity,
    pub dependencies: Vec<PackageDependency>,
    pub listed: bool,
    pub source: String,
}

impl SourcePackageDependencyInfo {
    pub fn new(id: &str, version: &str, dependencies: Vec<PackageDependency>) -> DepwalkResult<Self> {
        Ok(Self {
            identity: LibraryIdentity::package(id, SemanticVersion::parse(version)?),
            dependencies,
            listed: true,
            source: String::new(),
        })
    }

    /// Package dependencies of a walker lookup; project references are not
    /// part of package resolution
    pub fn from_dependency_info(info: &LibraryDependencyInfo, source: impl Into<String>) -> Self {
        let dependencies = info
            .dependencies
            .iter()
            .filter(|dependency| !dependency.is_central_pin())
            .filter_map(|dependency| {
                dependency
                    .library_range
                    .version_range()
                    .map(|range| PackageDependency::new(dependency.name(), range.clone()))
            })
            .collect();
        Self {
            identity: info.identity.clone(),
            dependencies,
            listed: true,
            source: source.into(),
        }
    }

    pub fn name_key(&self) -> String {
        self.identity.name_key()
    }

    pub fn satisfies(&self, range: &VersionRange) -> bool {
        self.identity
            .version()
            .is_some_and(|version| range.satisfies(version))
    }
}

/// Everything one resolve needs
#[derive(Debug, Clone)]
pub struct PackageResolverContext {
    pub behavior: DependencyBehavior,
    /// Ids that must appear in the result
    pub targets: Vec<String>,
    /// Versions to try first, e.g. the ones already installed
    pub preferred_versions: Vec<LibraryIdentity>,
    pub available: Vec<SourcePackageDependencyInfo>,
    pub max_attempts: usize,
}

impl PackageResolverContext {
    pub fn new(
        behavior: DependencyBehavior,
        targets: Vec<String>,
        available: Vec<SourcePackageDependencyInfo>,
    ) -> Self {
        Self {
            behavior,
            targets,
            preferred_versions: Vec::new(),
            available,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_preferred_versions(mut self, preferred: Vec<LibraryIdentity>) -> Self {
        self.preferred_versions = preferred;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Backtracking version selection over a fixed package set
#[derive(Default)]
pub struct PackageResolver {
    token: CancellationToken,
}

struct Requirement {
    key: String,
    range: VersionRange,
}

struct Search<'a> {
    context: &'a PackageResolverContext,
    token: &'a CancellationToken,
    /// Lowercased id to candidates in the order they are tried
    candidates: HashMap<String, Vec<&'a SourcePackageDependencyInfo>>,
    attempts: usize,
    /// Largest partial selection reached, kept for the failure message
    deepest: Vec<&'a SourcePackageDependencyInfo>,
}

impl PackageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Select one package per id, dependencies first
    pub fn resolve(&self, context: &PackageResolverContext) -> DepwalkResult<Vec<LibraryIdentity>> {
        let mut search = Search {
            context,
            token: &self.token,
            candidates: Self::order_candidates(context),
            attempts: 0,
            deepest: Vec::new(),
        };

        for target in &context.targets {
            if !search.candidates.contains_key(&name_key(target)) {
                return Err(DepwalkError::Unsatisfiable(diagnostic_message(
                    &context.targets,
                    &[],
                    &context.available,
                )));
            }
        }

        let mut requirements: Vec<Requirement> = context
            .targets
            .iter()
            .map(|target| Requirement {
                key: name_key(target),
                range: VersionRange::all(),
            })
            .collect();
        let mut selected = Vec::new();

        if !search.solve(&mut selected, &mut requirements)? {
            let message = diagnostic_message(&context.targets, &search.deepest, &context.available);
            debug!("Resolve failed after {} attempts: {}", search.attempts, message);
            return Err(DepwalkError::Unsatisfiable(message));
        }

        if let Some(cycle) = find_first_circular_dependency(&selected) {
            let path: Vec<String> = cycle.iter().map(|identity| identity.to_string()).collect();
            return Err(DepwalkError::Unsatisfiable(format!(
                "Circular dependency detected: {}",
                path.join(" -> ")
            )));
        }

        debug!(
            "Resolved {} packages in {} attempts",
            selected.len(),
            search.attempts
        );
        Ok(topological_sort(&selected))
    }

    /// Candidates per id: preferred versions first, then the behavior's
    /// order for dependencies or highest first for targets, unlisted last
    fn order_candidates(context: &PackageResolverContext) -> HashMap<String, Vec<&SourcePackageDependencyInfo>> {
        let targets: HashSet<String> = context
            .targets
            .iter()
            .map(|target| name_key(target))
            .collect();
        let preferred: HashSet<&LibraryIdentity> = context.preferred_versions.iter().collect();

        let mut candidates: HashMap<String, Vec<&SourcePackageDependencyInfo>> = HashMap::new();
        for package in &context.available {
            let entry = candidates.entry(package.name_key()).or_default();
            // The first source offering a version wins
            if !entry.iter().any(|existing| existing.identity == package.identity) {
                entry.push(package);
            }
        }

        for (key, list) in candidates.iter_mut() {
            let behavior = if targets.contains(key) {
                DependencyBehavior::Highest
            } else {
                context.behavior
            };
            list.sort_by(|a, b| {
                let rank = |p: &SourcePackageDependencyInfo| {
                    (!preferred.contains(&p.identity), !p.listed)
                };
                rank(*a).cmp(&rank(*b)).then_with(|| match (a.identity.version(), b.identity.version()) {
                    (Some(x), Some(y)) => behavior.order(x, y),
                    _ => Ordering::Equal,
                })
            });
        }
        candidates
    }
}

impl<'a> Search<'a> {
    fn solve(
        &mut self,
        selected: &mut Vec<&'a SourcePackageDependencyInfo>,
        requirements: &mut Vec<Requirement>,
    ) -> DepwalkResult<bool> {
        let next = requirements
            .iter()
            .find(|requirement| !selected.iter().any(|p| p.name_key() == requirement.key))
            .map(|requirement| requirement.key.clone());
        let Some(key) = next else {
            return Ok(true);
        };

        let candidates = self.candidates.get(&key).cloned().unwrap_or_default();
        for candidate in candidates {
            if self.token.is_cancelled() {
                return Err(DepwalkError::Cancelled);
            }
            self.attempts += 1;
            if self.attempts > self.context.max_attempts {
                return Err(DepwalkError::Unsatisfiable(format!(
                    "Gave up after {} attempts",
                    self.context.max_attempts
                )));
            }

            if !self.accepts(candidate, selected, requirements) {
                continue;
            }
            trace!("Trying {}", candidate.identity);

            let mark = requirements.len();
            selected.push(candidate);
            if self.context.behavior != DependencyBehavior::Ignore {
                requirements.extend(candidate.dependencies.iter().map(|dependency| Requirement {
                    key: name_key(&dependency.id),
                    range: dependency.range.clone(),
                }));
            }
            if selected.len() > self.deepest.len() {
                self.deepest = selected.clone();
            }

            if self.solve(selected, requirements)? {
                return Ok(true);
            }

            selected.pop();
            requirements.truncate(mark);
        }
        Ok(false)
    }

    /// Whether `candidate` fits the current partial selection
    fn accepts(
        &self,
        candidate: &SourcePackageDependencyInfo,
        selected: &[&SourcePackageDependencyInfo],
        requirements: &[Requirement],
    ) -> bool {
        let key = candidate.name_key();
        if !requirements
            .iter()
            .filter(|requirement| requirement.key == key)
            .all(|requirement| candidate.satisfies(&requirement.range))
        {
            return false;
        }
        if self.context.behavior == DependencyBehavior::Ignore {
            return true;
        }

        candidate.dependencies.iter().all(|dependency| {
            let dependency_key = name_key(&dependency.id);
            match selected.iter().find(|p| p.name_key() == dependency_key) {
                Some(chosen) => chosen.satisfies(&dependency.range),
                None => self
                    .candidates
                    .get(&dependency_key)
                    .is_some_and(|list| list.iter().any(|p| p.satisfies(&dependency.range))),
            }
        })
    }
}
