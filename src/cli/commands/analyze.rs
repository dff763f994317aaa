//! depwalk analyze - Report cycles, downgrades and version conflicts

use clap::Args;

use crate::cli::commands::RootArgs;
use crate::cli::output;
use crate::core::{DepwalkResult, Engine};
use crate::utils::format_duration;

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Also print the analyzed tree
    #[arg(long)]
    pub tree: bool,
}

pub async fn execute(args: AnalyzeArgs, json_output: bool) -> DepwalkResult<()> {
    let engine = Engine::new(&args.root.project_dir()?)?;
    let report = engine.analyze(&args.root.to_request()?).await?;

    if json_output {
        output::json(&report)?;
        return Ok(());
    }

    if args.tree {
        output::tree(&report.tree);
        output::divider();
    }

    let analysis = &report.analysis;
    if !analysis.cycles.is_empty() {
        output::header("Cycles");
        for cycle in &analysis.cycles {
            output::error(&cycle.join(" -> "));
        }
    }
    if !analysis.version_conflicts.is_empty() {
        output::header("Version conflicts");
        for conflict in &analysis.version_conflicts {
            output::error(&format!("{}\n    vs {}", conflict.conflicting, conflict.selected));
        }
    }
    if !analysis.downgrades.is_empty() {
        output::header("Downgrades");
        for downgrade in &analysis.downgrades {
            output::warning(&format!(
                "{}\n    downgraded to {}",
                downgrade.downgraded_from, downgrade.downgraded_to
            ));
        }
    }
    if !analysis.ambiguous.is_empty() {
        output::header("Ambiguous projects");
        for name in &analysis.ambiguous {
            output::warning(name);
        }
    }

    println!();
    let timing = format!(
        "{} ({} lookups, {})",
        report.summary,
        report.metrics.find_requests,
        format_duration(report.metrics.elapsed_ms)
    );
    if report.success {
        output::success(&timing);
    } else {
        output::error(&timing);
    }

    Ok(())
}
