//! depwalk resolve - Pick one version per package

use std::path::PathBuf;

use clap::Args;

use crate::cli::commands::resolve_dir;
use crate::cli::output;
use crate::core::{DepwalkError, DepwalkResult, Engine};
use crate::library::{LibraryIdentity, SemanticVersion};
use crate::resolver::DependencyBehavior;
use crate::utils::parse_package_spec;

#[derive(Args)]
pub struct ResolveArgs {
    /// Package ids that must be installed
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// lowest, highestpatch, highestminor, highest or ignore
    #[arg(long, default_value = "lowest")]
    pub behavior: DependencyBehavior,

    /// Versions to try first, as name@version
    #[arg(long)]
    pub prefer: Vec<String>,

    /// Target framework
    #[arg(short, long)]
    pub framework: Option<String>,

    /// Project directory (default: current directory)
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,
}

fn parse_preferred(spec: &str) -> DepwalkResult<LibraryIdentity> {
    match parse_package_spec(spec) {
        (name, Some(version)) => Ok(LibraryIdentity::package(name, SemanticVersion::parse(&version)?)),
        (name, None) => Err(DepwalkError::config(format!(
            "Preferred version for '{}' must be given as name@version",
            name
        ))),
    }
}

pub async fn execute(args: ResolveArgs, json_output: bool) -> DepwalkResult<()> {
    let engine = Engine::new(&resolve_dir(&args.cwd)?)?;
    let preferred = args
        .prefer
        .iter()
        .map(|spec| parse_preferred(spec))
        .collect::<DepwalkResult<Vec<_>>>()?;

    let resolved = engine.resolve(
        args.targets.clone(),
        args.behavior,
        preferred,
        args.framework.as_deref(),
    )?;

    if json_output {
        output::json(&serde_json::json!({
            "success": true,
            "packages": resolved.iter().map(|identity| identity.to_string()).collect::<Vec<_>>(),
        }))?;
    } else {
        for identity in &resolved {
            println!("{}", identity);
        }
        output::success(&format!("Resolved {} package(s)", resolved.len()));
    }

    Ok(())
}
