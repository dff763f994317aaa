//! Depwalk - dependency graph walking and conflict analysis
//!
//! Depwalk expands a root request into a dependency tree across local,
//! project and remote sources, then elects one version per library with a
//! nearest-wins rule and reports cycles, downgrades and version conflicts.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod graph;
pub mod library;
pub mod resolver;
pub mod utils;
pub mod walker;
