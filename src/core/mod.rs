//! Core module for Depwalk
//!
//! This module contains the engine, configuration and error types.

pub mod config;
pub mod engine;
pub mod error;

pub use config::Config;
pub use engine::{tree_entries, Engine, TreeEntry, WalkReport, WalkRequest};
pub use error::{DepwalkError, DepwalkResult};
