//! Utility functions for Depwalk

mod metrics;

pub use metrics::{MetricsSummary, WalkMetrics};

use crate::core::DepwalkResult;
use crate::library::{LibraryRange, VersionRange};

/// Format duration as human-readable string
pub fn format_duration(millis: u128) -> String {
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60000 {
        format!("{:.2}s", millis as f64 / 1000.0)
    } else {
        let seconds = millis / 1000;
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;
        format!("{}m {}s", minutes, remaining_seconds)
    }
}

/// Split a `name@range` specifier
pub fn parse_package_spec(spec: &str) -> (String, Option<String>) {
    match spec.split_once('@') {
        Some((name, range)) if !name.is_empty() && !range.is_empty() => {
            (name.to_string(), Some(range.to_string()))
        }
        _ => (spec.trim_end_matches('@').to_string(), None),
    }
}

/// Parse `name@range` into a package request; a missing range accepts any
/// version
pub fn parse_library_range(spec: &str) -> DepwalkResult<LibraryRange> {
    let (name, range) = parse_package_spec(spec.trim());
    let range = match range {
        Some(range) => VersionRange::parse(&range)?,
        None => VersionRange::all(),
    };
    Ok(LibraryRange::package(name, range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.50s");
        assert_eq!(format_duration(125_000), "2m 5s");
    }

    #[test]
    fn test_parse_package_spec() {
        assert_eq!(parse_package_spec("Newtonsoft.Json"), ("Newtonsoft.Json".to_string(), None));
        assert_eq!(
            parse_package_spec("Serilog@[2.0,3.0)"),
            ("Serilog".to_string(), Some("[2.0,3.0)".to_string()))
        );
        assert_eq!(parse_package_spec("a@"), ("a".to_string(), None));
    }

    #[test]
    fn test_parse_library_range() {
        let range = parse_library_range("A@1.0").unwrap();
        assert_eq!(range.name(), "A");
        assert_eq!(range.pretty_range(), "(>= 1.0.0)");

        let any = parse_library_range("B").unwrap();
        assert_eq!(any.pretty_range(), "");
        assert!(parse_library_range("C@not-a-version").is_err());
    }
}
