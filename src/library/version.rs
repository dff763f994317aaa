//! Semantic versions and version ranges
//!
//! Versions keep the text they were parsed from for display, and compare on a
//! normalized form: partial versions are padded, prerelease labels compare
//! case-insensitively and build metadata is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::{DepwalkError, DepwalkResult};

/// A semantic version that remembers its original spelling
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    /// Normalized form used for comparisons
    version: semver::Version,
    /// Text as given by the source
    original: String,
}

impl SemanticVersion {
    /// Parse a version string, accepting partial versions ("1.0" -> 1.0.0)
    pub fn parse(s: &str) -> DepwalkResult<Self> {
        let original = s.trim();
        let s = original.trim_start_matches('v');
        if s.is_empty() {
            return Err(DepwalkError::InvalidVersion(original.to_string()));
        }

        let without_build = s.split('+').next().unwrap_or(s);
        let (base, release) = match without_build.split_once('-') {
            Some((base, release)) => (base, Some(release)),
            None => (without_build, None),
        };

        let parts: Vec<&str> = base.split('.').collect();
        let base = match parts.len() {
            1 => format!("{}.0.0", parts[0]),
            2 => format!("{}.{}.0", parts[0], parts[1]),
            3 => base.to_string(),
            // A zero revision is dropped, anything else has no semver equivalent
            4 if parts[3] == "0" => parts[..3].join("."),
            _ => return Err(DepwalkError::InvalidVersion(original.to_string())),
        };

        let normalized = match release {
            Some(release) => format!("{}-{}", base, release.to_ascii_lowercase()),
            None => base,
        };

        let version = semver::Version::parse(&normalized)
            .map_err(|_| DepwalkError::InvalidVersion(original.to_string()))?;

        Ok(Self {
            version,
            original: original.to_string(),
        })
    }

    /// Create a release version from its numeric parts
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        let version = semver::Version::new(major, minor, patch);
        Self {
            original: version.to_string(),
            version,
        }
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Lowercased prerelease label, empty for releases
    pub fn release_label(&self) -> &str {
        self.version.pre.as_str()
    }

    /// The text this version was created from
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Canonical text (three parts, lowercased label)
    pub fn to_normalized_string(&self) -> String {
        self.version.to_string()
    }

    /// The same version with any prerelease label removed
    pub fn without_release_label(&self) -> Self {
        Self::new(self.major(), self.minor(), self.patch())
    }

    fn numeric(&self) -> (u64, u64, u64) {
        (self.version.major, self.version.minor, self.version.patch)
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Build metadata is stripped at parse time, so this is precedence order
        self.version.cmp(&other.version)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl std::str::FromStr for SemanticVersion {
    type Err = DepwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Which part of a floating range floats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatBehavior {
    /// `1.0.0-*` or `1.0.0-beta*`
    Prerelease,
    /// `1.0.*`
    Patch,
    /// `1.*`
    Minor,
    /// `*`
    Major,
}

/// The floating part of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FloatRange {
    behavior: FloatBehavior,
    min_version: SemanticVersion,
    /// Lowercased prerelease prefix for `Prerelease` floats
    release_prefix: String,
}

impl FloatRange {
    pub fn behavior(&self) -> FloatBehavior {
        self.behavior
    }

    pub fn min_version(&self) -> &SemanticVersion {
        &self.min_version
    }

    pub fn release_prefix(&self) -> &str {
        &self.release_prefix
    }

    /// Whether a version sits inside the floating window
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        let min = &self.min_version;
        match self.behavior {
            FloatBehavior::Major => !version.is_prerelease(),
            FloatBehavior::Minor => !version.is_prerelease() && version.major() == min.major(),
            FloatBehavior::Patch => {
                !version.is_prerelease()
                    && version.major() == min.major()
                    && version.minor() == min.minor()
            }
            FloatBehavior::Prerelease => {
                version.numeric() == min.numeric()
                    && (!version.is_prerelease()
                        || version.release_label().starts_with(&self.release_prefix))
            }
        }
    }
}

/// A version range in interval or floating notation
///
/// Supported forms: `1.0` (minimum, inclusive), `[1.0]` (exact),
/// `[1.0,2.0)`, `(,3.0]`, `*`, `1.*`, `1.0.*` and `1.0.0-beta*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: Option<SemanticVersion>,
    include_min: bool,
    max: Option<SemanticVersion>,
    include_max: bool,
    float: Option<FloatRange>,
}

impl VersionRange {
    /// The unbounded range
    pub fn all() -> Self {
        Self {
            min: None,
            include_min: false,
            max: None,
            include_max: false,
            float: None,
        }
    }

    /// `>= version`
    pub fn at_least(version: SemanticVersion) -> Self {
        Self {
            min: Some(version),
            include_min: true,
            ..Self::all()
        }
    }

    /// `= version`
    pub fn exact(version: SemanticVersion) -> Self {
        Self {
            min: Some(version.clone()),
            include_min: true,
            max: Some(version),
            include_max: true,
            float: None,
        }
    }

    /// Parse a range string
    pub fn parse(s: &str) -> DepwalkResult<Self> {
        let s = s.trim();
        let invalid = || DepwalkError::InvalidVersionRange(s.to_string());

        if s.is_empty() {
            return Err(invalid());
        }

        if s.starts_with('[') || s.starts_with('(') {
            return Self::parse_interval(s).ok_or_else(invalid);
        }

        if s.contains('*') {
            return Self::parse_float(s).ok_or_else(invalid);
        }

        let version = SemanticVersion::parse(s).map_err(|_| invalid())?;
        Ok(Self::at_least(version))
    }

    fn parse_interval(s: &str) -> Option<Self> {
        let include_min = s.starts_with('[');
        let include_max = s.ends_with(']');
        if !s.ends_with(']') && !s.ends_with(')') {
            return None;
        }

        let inner = s.get(1..s.len() - 1)?.trim();
        let parse_bound = |part: &str| -> Option<Option<SemanticVersion>> {
            let part = part.trim();
            if part.is_empty() {
                Some(None)
            } else {
                SemanticVersion::parse(part).ok().map(Some)
            }
        };

        match inner.split_once(',') {
            None => {
                // [1.0] is the only single-version interval
                if !(include_min && include_max) {
                    return None;
                }
                let version = parse_bound(inner)??;
                Some(Self::exact(version))
            }
            Some((left, right)) => {
                let min = parse_bound(left)?;
                let max = parse_bound(right)?;
                if let (Some(min), Some(max)) = (&min, &max) {
                    if min > max || (min == max && !(include_min && include_max)) {
                        return None;
                    }
                }
                Some(Self {
                    include_min: include_min && min.is_some(),
                    include_max: include_max && max.is_some(),
                    min,
                    max,
                    float: None,
                })
            }
        }
    }

    fn parse_float(s: &str) -> Option<Self> {
        if s == "*" {
            return Some(Self::floating(FloatBehavior::Major, SemanticVersion::new(0, 0, 0), String::new()));
        }

        if let Some((base, release)) = s.split_once('-') {
            // 1.0.0-* or 1.0.0-beta*
            let prefix = release.strip_suffix('*')?;
            if prefix.contains('*') || base.contains('*') {
                return None;
            }
            let min = if prefix.is_empty() {
                SemanticVersion::parse(&format!("{}-0", base)).ok()?
            } else {
                SemanticVersion::parse(&format!("{}-{}", base, prefix.trim_end_matches('.'))).ok()?
            };
            return Some(Self::floating(
                FloatBehavior::Prerelease,
                min,
                prefix.to_ascii_lowercase(),
            ));
        }

        let stem = s.strip_suffix(".*")?;
        if stem.contains('*') {
            return None;
        }
        let behavior = match stem.split('.').count() {
            1 => FloatBehavior::Minor,
            2 => FloatBehavior::Patch,
            _ => return None,
        };
        let min = SemanticVersion::parse(stem).ok()?;
        Some(Self::floating(behavior, min, String::new()))
    }

    fn floating(behavior: FloatBehavior, min: SemanticVersion, release_prefix: String) -> Self {
        Self {
            min: Some(min.clone()),
            include_min: true,
            max: None,
            include_max: false,
            float: Some(FloatRange {
                behavior,
                min_version: min,
                release_prefix,
            }),
        }
    }

    pub fn min_version(&self) -> Option<&SemanticVersion> {
        self.min.as_ref()
    }

    pub fn max_version(&self) -> Option<&SemanticVersion> {
        self.max.as_ref()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.include_min
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.include_max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_some()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_some()
    }

    pub fn is_floating(&self) -> bool {
        self.float.is_some()
    }

    pub fn float(&self) -> Option<&FloatRange> {
        self.float.as_ref()
    }

    /// Whether a version lies within the bounds
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        if let Some(min) = &self.min {
            let ok = if self.include_min { version >= min } else { version > min };
            if !ok {
                return false;
            }
        }
        if let Some(max) = &self.max {
            let ok = if self.include_max { version <= max } else { version < max };
            if !ok {
                return false;
            }
        }
        if let Some(float) = &self.float {
            // Prereleases only float into ranges that ask for them
            if version.is_prerelease() && float.behavior != FloatBehavior::Prerelease {
                return false;
            }
        }
        true
    }

    /// Whether `considering` is a better pick than `current`
    ///
    /// Floating ranges prefer the highest version inside the float, fixed
    /// ranges prefer the version nearest to their floor.
    pub fn is_better(&self, current: Option<&SemanticVersion>, considering: &SemanticVersion) -> bool {
        if !self.satisfies(considering) {
            return false;
        }
        let Some(current) = current else {
            return true;
        };
        if current == considering {
            return false;
        }

        if let Some(float) = &self.float {
            let current_in = float.satisfies(current);
            let considering_in = float.satisfies(considering);
            return match (current_in, considering_in) {
                (true, false) => false,
                (false, true) => true,
                (true, true) => considering > current,
                (false, false) => considering < current,
            };
        }

        considering < current
    }

    /// Pick the best match from a set of versions
    pub fn find_best_match<'a, I>(&self, versions: I) -> Option<&'a SemanticVersion>
    where
        I: IntoIterator<Item = &'a SemanticVersion>,
    {
        let mut best = None;
        for version in versions {
            if self.is_better(best, version) {
                best = Some(version);
            }
        }
        best
    }

    /// Whether a match can not be improved upon by any other source
    pub fn is_unbeatable(&self, version: &SemanticVersion) -> bool {
        !self.is_floating() && self.include_min && self.min.as_ref() == Some(version)
    }

    /// Effective floor of `self` is at or above the floor of `other`
    ///
    /// Unbounded ranges sit above everything. Floating ranges compare on their
    /// release-label-free floor, then on the release prefix where the longer,
    /// more specific prefix wins a tie on the shared characters.
    pub fn is_greater_than_or_equal_to(&self, other: &VersionRange) -> bool {
        if !self.has_lower_bound() {
            return true;
        }
        if !other.has_lower_bound() {
            return false;
        }

        if self.is_floating() || other.is_floating() {
            let (near_min, near_release) = match self.floor_for_comparison() {
                Some(floor) => floor,
                None => return true,
            };
            let (far_min, far_release) = match other.floor_for_comparison() {
                Some(floor) => floor,
                None => return false,
            };

            match near_min.cmp(&far_min) {
                Ordering::Greater => return true,
                Ordering::Less => return false,
                Ordering::Equal => {}
            }

            if near_release.is_empty() {
                return true;
            }
            if far_release.is_empty() {
                return false;
            }
            let len = near_release.len().min(far_release.len());
            return match near_release[..len].cmp(&far_release[..len]) {
                Ordering::Equal => near_release.len() >= far_release.len(),
                order => order == Ordering::Greater,
            };
        }

        match (&self.min, &other.min) {
            (Some(near), Some(far)) => near >= far,
            _ => true,
        }
    }

    /// Floor and release prefix, `None` for the `*` float which tops everything
    fn floor_for_comparison(&self) -> Option<(SemanticVersion, String)> {
        match &self.float {
            Some(float) if float.behavior == FloatBehavior::Major => None,
            Some(float) => Some((
                float.min_version.without_release_label(),
                float.release_prefix.clone(),
            )),
            None => {
                let min = self.min.clone()?;
                let release = min.release_label().to_string();
                Some((min.without_release_label(), release))
            }
        }
    }

    /// Human readable form such as `(>= 1.0.0)` or `(>= 1.0.0 && < 2.0.0)`
    pub fn pretty_print(&self) -> String {
        let min = self.min.as_ref().map(|v| v.to_normalized_string());
        let max = self.max.as_ref().map(|v| v.to_normalized_string());

        match (min, max) {
            (Some(min), Some(max)) if min == max && self.include_min && self.include_max => {
                format!("(= {})", min)
            }
            (Some(min), Some(max)) => format!(
                "({} {} && {} {})",
                if self.include_min { ">=" } else { ">" },
                min,
                if self.include_max { "<=" } else { "<" },
                max
            ),
            (Some(min), None) => format!("({} {})", if self.include_min { ">=" } else { ">" }, min),
            (None, Some(max)) => format!("({} {})", if self.include_max { "<=" } else { "<" }, max),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(float) = &self.float {
            let min = &float.min_version;
            return match float.behavior {
                FloatBehavior::Major => write!(f, "*"),
                FloatBehavior::Minor => write!(f, "{}.*", min.major()),
                FloatBehavior::Patch => write!(f, "{}.{}.*", min.major(), min.minor()),
                FloatBehavior::Prerelease => write!(
                    f,
                    "{}.{}.{}-{}*",
                    min.major(),
                    min.minor(),
                    min.patch(),
                    float.release_prefix
                ),
            };
        }

        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            if min == max && self.include_min && self.include_max {
                return write!(f, "[{}]", min.to_normalized_string());
            }
        }

        write!(
            f,
            "{}{}, {}{}",
            if self.include_min { '[' } else { '(' },
            self.min.as_ref().map(|v| v.to_normalized_string()).unwrap_or_default(),
            self.max.as_ref().map(|v| v.to_normalized_string()).unwrap_or_default(),
            if self.include_max { ']' } else { ')' }
        )
    }
}

impl std::str::FromStr for VersionRange {
    type Err = DepwalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn r(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    #[test]
    fn test_version_keeps_original_text() {
        let version = v("1.0.0-bEta");
        assert_eq!(version.to_string(), "1.0.0-bEta");
        assert_eq!(version.to_normalized_string(), "1.0.0-beta");
        assert_eq!(version, v("1.0.0-BETA"));
    }

    #[test]
    fn test_partial_versions() {
        assert_eq!(v("1.0"), SemanticVersion::new(1, 0, 0));
        assert_eq!(v("2"), SemanticVersion::new(2, 0, 0));
        assert_eq!(v("1.2.3.0"), SemanticVersion::new(1, 2, 3));
        assert_eq!(v("1.0").to_string(), "1.0");
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
        assert!(SemanticVersion::parse("abc").is_err());
    }

    #[test]
    fn test_prerelease_ordering() {
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.0-beta") < v("1.0.0"));
        assert!(v("1.0.0+build") == v("1.0.0"));
    }

    #[test]
    fn test_parse_interval() {
        let range = r("[1.0,2.0)");
        assert!(range.satisfies(&v("1.0.0")));
        assert!(range.satisfies(&v("1.9.9")));
        assert!(!range.satisfies(&v("2.0.0")));

        let exact = r("[1.0]");
        assert!(exact.satisfies(&v("1.0.0")));
        assert!(!exact.satisfies(&v("1.0.1")));

        let upper = r("(,3.0]");
        assert!(!upper.has_lower_bound());
        assert!(upper.satisfies(&v("0.1.0")));
        assert!(upper.satisfies(&v("3.0.0")));

        assert!(VersionRange::parse("[2.0,1.0]").is_err());
        assert!(VersionRange::parse("(1.0)").is_err());
        assert!(VersionRange::parse("[1.0").is_err());
    }

    #[test]
    fn test_parse_floating() {
        let minor = r("1.*");
        assert!(minor.is_floating());
        assert_eq!(minor.float().unwrap().behavior(), FloatBehavior::Minor);
        assert!(minor.satisfies(&v("3.0.0")));

        let pre = r("1.0.0-beta*");
        assert_eq!(pre.float().unwrap().release_prefix(), "beta");
        assert!(pre.satisfies(&v("1.0.0-beta.2")));

        assert_eq!(r("1.0.*").to_string(), "1.0.*");
        assert_eq!(r("*").to_string(), "*");
        assert!(VersionRange::parse("1.*.0").is_err());
    }

    #[test]
    fn test_best_match() {
        let versions = vec![v("1.0.0"), v("1.5.0"), v("2.0.0"), v("2.1.0")];

        assert_eq!(r("1.0").find_best_match(&versions), Some(&versions[0]));
        assert_eq!(r("1.2").find_best_match(&versions), Some(&versions[1]));
        assert_eq!(r("1.*").find_best_match(&versions), Some(&versions[1]));
        assert_eq!(r("*").find_best_match(&versions), Some(&versions[3]));
        assert_eq!(r("[3.0,)").find_best_match(&versions), None);
    }

    #[test]
    fn test_pretty_print() {
        assert_eq!(r("1.0").pretty_print(), "(>= 1.0.0)");
        assert_eq!(r("[1.0]").pretty_print(), "(= 1.0.0)");
        assert_eq!(r("[1.0,2.0)").pretty_print(), "(>= 1.0.0 && < 2.0.0)");
        assert_eq!(r("(1.0,)").pretty_print(), "(> 1.0.0)");
        assert_eq!(r("1.0.*").pretty_print(), "(>= 1.0.0)");
        assert_eq!(VersionRange::all().pretty_print(), "");
    }

    #[test]
    fn test_greater_than_or_equal_basic() {
        assert!(VersionRange::all().is_greater_than_or_equal_to(&r("1.0")));
        assert!(!r("1.0").is_greater_than_or_equal_to(&VersionRange::all()));
        assert!(r("2.0").is_greater_than_or_equal_to(&r("1.0")));
        assert!(!r("1.0").is_greater_than_or_equal_to(&r("2.0")));
        assert!(r("1.0").is_greater_than_or_equal_to(&r("1.0")));
        assert!(r("*").is_greater_than_or_equal_to(&r("5.0")));
        assert!(!r("5.0").is_greater_than_or_equal_to(&r("*")));
        assert!(r("1.0.*").is_greater_than_or_equal_to(&r("1.0.0")));
        assert!(r("1.0.0-*").is_greater_than_or_equal_to(&r("1.0.0-beta*")));
        assert!(!r("1.0.0-beta*").is_greater_than_or_equal_to(&r("1.0.0-*")));
        assert!(r("1.0.0-beta*").is_greater_than_or_equal_to(&r("1.0.0-alpha*")));
        assert!(!r("1.0.0-alpha*").is_greater_than_or_equal_to(&r("1.0.0-beta*")));
        assert!(r("1.0.0-aa*").is_greater_than_or_equal_to(&r("1.0.0-a*")));
        assert!(!r("1.0.0-a*").is_greater_than_or_equal_to(&r("1.0.0-aa*")));
    }

    #[test]
    fn test_greater_than_or_equal_is_total_preorder() {
        let ranges: Vec<VersionRange> = [
            "(,2.0]", "*", "1.0", "2.0", "[1.0]", "[1.0,2.0)", "1.*", "2.*", "1.0.*", "1.0.0-*",
            "1.0.0-beta*", "1.0.0-alpha*", "1.0.0-beta", "3.0.0-rc.1", "(1.0,)", "0.5",
            "1.0.0-a*", "1.0.0-aa*", "1.0.0-ab*",
        ]
        .iter()
        .map(|s| r(s))
        .collect();

        for a in &ranges {
            assert!(a.is_greater_than_or_equal_to(a), "reflexive for {}", a);
            for b in &ranges {
                // Total: one of the two orders must hold
                assert!(
                    a.is_greater_than_or_equal_to(b) || b.is_greater_than_or_equal_to(a),
                    "total for {} and {}",
                    a,
                    b
                );
                for c in &ranges {
                    if a.is_greater_than_or_equal_to(b) && b.is_greater_than_or_equal_to(c) {
                        assert!(
                            a.is_greater_than_or_equal_to(c),
                            "transitive for {} >= {} >= {}",
                            a,
                            b,
                            c
                        );
                    }
                }
            }
        }
    }
}
