//! Catalog file types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{DepwalkError, DepwalkResult};
use crate::library::{
    Framework, LibraryDependency, LibraryDependencyTarget, LibraryRange, ReferenceType,
    VersionRange,
};
use crate::resolver::{PackageDependency, SourcePackageDependencyInfo};

/// Packages and projects one source knows about
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    /// Package versions
    #[serde(default)]
    pub packages: Vec<CatalogPackage>,

    /// Projects
    #[serde(default)]
    pub projects: Vec<CatalogProject>,
}

/// One version of a package
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogPackage {
    /// Package id, casing as published
    pub id: String,

    /// Version string, kept verbatim
    pub version: String,

    /// Unlisted versions are only served when asked for exactly
    #[serde(default = "default_listed")]
    pub listed: bool,

    /// Dependency groups by framework
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<CatalogDependency>>,
}

/// A project of the current solution
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogProject {
    /// Project name
    pub name: String,

    /// Optional project version
    #[serde(default)]
    pub version: Option<String>,

    /// Dependency groups by framework
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<CatalogDependency>>,
}

/// A declared dependency
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogDependency {
    /// Dependency id
    pub id: String,

    /// Version range; absent means any version
    #[serde(default)]
    pub range: Option<String>,

    /// `package` (default), `project`, `externalproject` or `all`
    #[serde(default)]
    pub target: Option<String>,

    /// Centrally managed version that is not itself referenced
    #[serde(default)]
    pub central: bool,
}

fn default_listed() -> bool {
    true
}

impl CatalogDependency {
    pub fn new(id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            range: Some(range.into()),
            target: None,
            central: false,
        }
    }

    /// Convert to the walker's dependency type
    pub fn to_library_dependency(&self) -> DepwalkResult<LibraryDependency> {
        let target = match &self.target {
            Some(target) => LibraryDependencyTarget::parse(target).ok_or_else(|| {
                DepwalkError::catalog(format!(
                    "Unknown dependency target '{}' for '{}'",
                    target, self.id
                ))
            })?,
            None => LibraryDependencyTarget::PACKAGE,
        };

        let range = match &self.range {
            Some(range) => Some(VersionRange::parse(range)?),
            None if target.contains(LibraryDependencyTarget::PACKAGE) => Some(VersionRange::all()),
            None => None,
        };

        let library_range = LibraryRange::new(self.id.clone(), range, target);
        Ok(if self.central {
            LibraryDependency::central_pin(library_range)
        } else {
            LibraryDependency {
                library_range,
                reference_type: ReferenceType::Direct,
                version_centrally_managed: false,
            }
        })
    }
}

/// Dependencies declared for `framework`, falling back to the `any` group
pub(crate) fn dependency_group<'a>(
    groups: &'a BTreeMap<String, Vec<CatalogDependency>>,
    framework: &Framework,
) -> &'a [CatalogDependency] {
    groups
        .iter()
        .find(|(name, _)| Framework::new(name.as_str()) == *framework)
        .or_else(|| groups.iter().find(|(name, _)| Framework::new(name.as_str()).is_any()))
        .map(|(_, dependencies)| dependencies.as_slice())
        .unwrap_or(&[])
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    pub fn from_toml_str(content: &str) -> DepwalkResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON
    pub fn from_json_str(content: &str) -> DepwalkResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a catalog file, choosing the format by extension
    pub fn load(path: &std::path::Path) -> DepwalkResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(DepwalkError::catalog(format!(
                "Unsupported catalog format: {}",
                path.display()
            ))),
        }
    }

    /// Every package version as resolver input for `framework`
    ///
    /// Only package dependencies with a version range take part; central pins
    /// are left out.
    pub fn package_infos(
        &self,
        source: &str,
        framework: &Framework,
    ) -> DepwalkResult<Vec<SourcePackageDependencyInfo>> {
        self.packages
            .iter()
            .map(|package| {
                let dependencies = dependency_group(&package.dependencies, framework)
                    .iter()
                    .filter(|dependency| !dependency.central)
                    .map(CatalogDependency::to_library_dependency)
                    .filter_map(|dependency| match dependency {
                        Ok(dependency) => dependency
                            .library_range
                            .version_range()
                            .filter(|_| {
                                dependency
                                    .library_range
                                    .type_constraint()
                                    .contains(LibraryDependencyTarget::PACKAGE)
                            })
                            .map(|range| Ok(PackageDependency::new(dependency.name(), range.clone()))),
                        Err(e) => Some(Err(e)),
                    })
                    .collect::<DepwalkResult<Vec<_>>>()?;
                let mut info = SourcePackageDependencyInfo::new(&package.id, &package.version, dependencies)?;
                info.listed = package.listed;
                info.source = source.to_string();
                Ok(info)
            })
            .collect()
    }

    /// Add a package version whose dependencies apply to every framework
    pub fn with_package(mut self, id: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        self.packages.push(CatalogPackage {
            id: id.to_string(),
            version: version.to_string(),
            listed: true,
            dependencies: any_group(dependencies.iter().map(|(id, range)| CatalogDependency::new(*id, *range))),
        });
        self
    }

    /// Add a project with the given dependencies for every framework
    pub fn with_project(mut self, name: &str, dependencies: Vec<CatalogDependency>) -> Self {
        self.projects.push(CatalogProject {
            name: name.to_string(),
            version: None,
            dependencies: any_group(dependencies),
        });
        self
    }
}

fn any_group(
    dependencies: impl IntoIterator<Item = CatalogDependency>,
) -> BTreeMap<String, Vec<CatalogDependency>> {
    let mut groups = BTreeMap::new();
    groups.insert(Framework::ANY.to_string(), dependencies.into_iter().collect());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_catalog() {
        let catalog = Catalog::from_toml_str(
            r#"
            [[packages]]
            id = "Serilog"
            version = "2.10.0"

            [[packages.dependencies."net8.0"]]
            id = "System.Memory"
            range = "[4.5,5.0)"

            [[projects]]
            name = "App"

            [[projects.dependencies.any]]
            id = "Serilog"
            range = "2.0"

            [[projects.dependencies.any]]
            id = "Serilog.Sinks.Console"
            range = "[4.0]"
            central = true
            "#,
        )
        .unwrap();

        assert_eq!(catalog.packages.len(), 1);
        assert!(catalog.packages[0].listed);
        let group = dependency_group(&catalog.packages[0].dependencies, &Framework::new("NET8.0"));
        assert_eq!(group[0].id, "System.Memory");
        assert!(dependency_group(&catalog.packages[0].dependencies, &Framework::any()).is_empty());

        let project = &catalog.projects[0];
        let deps: Vec<LibraryDependency> = dependency_group(&project.dependencies, &Framework::new("net8.0"))
            .iter()
            .map(|d| d.to_library_dependency().unwrap())
            .collect();
        assert!(!deps[0].is_central_pin());
        assert!(deps[1].is_central_pin());
    }

    #[test]
    fn test_dependency_targets() {
        let project = CatalogDependency {
            id: "Lib".to_string(),
            range: None,
            target: Some("project".to_string()),
            central: false,
        };
        let dependency = project.to_library_dependency().unwrap();
        assert!(dependency.library_range.version_range().is_none());
        assert_eq!(
            dependency.library_range.type_constraint(),
            LibraryDependencyTarget::PROJECT
        );

        let bad = CatalogDependency {
            target: Some("nonsense".to_string()),
            ..project
        };
        assert!(bad.to_library_dependency().is_err());
    }

    #[test]
    fn test_package_infos_for_resolver() {
        let mut catalog = Catalog::new()
            .with_package("A", "1.0", &[("B", "[1.0,2.0)")])
            .with_package("B", "1.5", &[]);
        catalog.packages[1].listed = false;
        catalog.packages[0].dependencies.get_mut(Framework::ANY).unwrap().push(CatalogDependency {
            central: true,
            ..CatalogDependency::new("C", "[3.0]")
        });

        let infos = catalog.package_infos("feed", &Framework::new("net8.0")).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].dependencies.len(), 1);
        assert_eq!(infos[0].dependencies[0].id, "B");
        assert_eq!(infos[0].source, "feed");
        assert!(!infos[1].listed);
    }
}
