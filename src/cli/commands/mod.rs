//! CLI command implementations

pub mod analyze;
pub mod flatten;
pub mod resolve;
pub mod walk;

use std::env;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::core::{DepwalkResult, WalkRequest};
use crate::library::LibraryRange;
use crate::utils::parse_library_range;

/// Root selection shared by the graph commands
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Root package as `name@range`, or a project name with --project
    pub root: String,

    /// Treat the root as a project
    #[arg(long)]
    pub project: bool,

    /// Target framework (default: walk.framework from config, then any)
    #[arg(short, long)]
    pub framework: Option<String>,

    /// Runtime identifier, e.g. linux-x64
    #[arg(long, requires = "runtime_graph")]
    pub runtime: Option<String>,

    /// JSON runtime graph file
    #[arg(long)]
    pub runtime_graph: Option<PathBuf>,

    /// Only resolve direct dependencies of the root
    #[arg(long)]
    pub no_recursive: bool,

    /// Project directory (default: current directory)
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,
}

impl RootArgs {
    pub fn project_dir(&self) -> DepwalkResult<PathBuf> {
        resolve_dir(&self.cwd)
    }

    pub fn to_request(&self) -> DepwalkResult<WalkRequest> {
        let root = if self.project {
            LibraryRange::project(self.root.clone())
        } else {
            parse_library_range(&self.root)?
        };
        Ok(WalkRequest {
            root,
            framework: self.framework.clone(),
            runtime_identifier: self.runtime.clone(),
            runtime_graph: self.runtime_graph.clone(),
            recursive: self.no_recursive.then_some(false),
        })
    }
}

pub(crate) fn resolve_dir(path: &Path) -> DepwalkResult<PathBuf> {
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    })
}
