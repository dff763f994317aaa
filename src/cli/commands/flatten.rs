//! depwalk flatten - Print accepted libraries in install order

use clap::Args;

use crate::cli::commands::RootArgs;
use crate::cli::output;
use crate::core::{DepwalkResult, Engine};

#[derive(Args)]
pub struct FlattenArgs {
    #[command(flatten)]
    pub root: RootArgs,
}

pub async fn execute(args: FlattenArgs, json_output: bool) -> DepwalkResult<()> {
    let engine = Engine::new(&args.root.project_dir()?)?;
    let report = engine.analyze(&args.root.to_request()?).await?;

    if json_output {
        output::json(&serde_json::json!({
            "root": report.root,
            "success": report.success,
            "libraries": report.flattened,
        }))?;
        return Ok(());
    }

    for library in &report.flattened {
        println!("{}", library);
    }
    if !report.success {
        output::warning(&report.summary);
    }

    Ok(())
}
