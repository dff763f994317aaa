//! Output formatting for CLI

use console::{style, StyledObject};
use serde::Serialize;

use crate::core::TreeEntry;
use crate::graph::Disposition;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print JSON output
pub fn json<T: Serialize>(data: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a section header
pub fn header(title: &str) {
    println!();
    println!("{}", style(title).bold());
}

/// Print a divider line
pub fn divider() {
    println!("{}", style("─".repeat(60)).dim());
}

/// Style a label by node disposition
pub fn disposition(text: String, disposition: Disposition) -> StyledObject<String> {
    match disposition {
        Disposition::Accepted => style(text).green(),
        Disposition::Rejected => style(text).dim(),
        Disposition::Cycle => style(text).red(),
        Disposition::PotentiallyDowngraded => style(text).yellow(),
        Disposition::Acceptable => style(text),
    }
}

/// One tree line, indented by depth
pub fn tree_line(entry: &TreeEntry) -> String {
    let mut line = format!("{}{}", "  ".repeat(entry.depth), entry.id);
    if entry.central {
        line.push_str(" (central)");
    }
    let mut out = disposition(line, entry.disposition).to_string();
    if let Some(source) = &entry.source {
        out.push_str(&format!(" {}", style(format!("[{}]", source)).dim()));
    }
    out
}

/// Print a rendered tree
pub fn tree(entries: &[TreeEntry]) {
    for entry in entries {
        println!("{}", tree_line(entry));
    }
}
