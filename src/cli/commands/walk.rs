//! depwalk walk - Print the raw dependency tree

use std::time::Instant;

use clap::Args;

use crate::cli::commands::RootArgs;
use crate::cli::output;
use crate::core::{tree_entries, DepwalkResult, Engine};
use crate::utils::format_duration;

#[derive(Args)]
pub struct WalkArgs {
    #[command(flatten)]
    pub root: RootArgs,
}

pub async fn execute(args: WalkArgs, json_output: bool) -> DepwalkResult<()> {
    let start_time = Instant::now();
    let engine = Engine::new(&args.root.project_dir()?)?;
    let request = args.root.to_request()?;

    if !json_output {
        output::info(&format!("Walking {}", request.root));
    }
    let walker = engine.walker();
    let tree = engine.walk(&walker, &request).await?;
    let entries = tree_entries(&tree);

    if json_output {
        output::json(&serde_json::json!({
            "root": request.root.to_string(),
            "tree": entries,
            "metrics": walker.context().metrics.summary(),
        }))?;
    } else {
        output::tree(&entries);
        output::divider();
        output::success(&format!(
            "Walked {} node(s) in {}",
            entries.len(),
            format_duration(start_time.elapsed().as_millis())
        ));
    }

    Ok(())
}
