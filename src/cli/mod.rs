//! CLI module for Depwalk
//!
//! Provides command-line interface using clap.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::*;

/// Depwalk - walk, analyze and flatten dependency graphs
#[derive(Parser)]
#[command(name = "depwalk")]
#[command(author = "Depwalk Contributors")]
#[command(version)]
#[command(about = "Walk a dependency graph across package sources and explain its conflicts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the raw dependency tree
    #[command(visible_alias = "w")]
    Walk(walk::WalkArgs),

    /// Report cycles, downgrades and version conflicts
    #[command(visible_alias = "a")]
    Analyze(analyze::AnalyzeArgs),

    /// Print the accepted libraries, dependencies first
    #[command(visible_alias = "f")]
    Flatten(flatten::FlattenArgs),

    /// Pick one version per package for a set of targets
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),
}
