//! Resolved dependency tree, tracking and post-walk analysis

mod analyze;
mod flatten;
mod item;
mod node;
mod path;
mod tracker;

pub use analyze::{
    analyze, AnalysisReport, AnalysisResult, ConflictReport, DowngradeReport, DowngradeResult,
    VersionConflictResult,
};
pub use item::GraphItem;
pub use node::{Disposition, GraphNode, GraphTree, InnerNodes, NodeId};
pub use tracker::Tracker;
