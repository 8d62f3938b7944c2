//! Core types and traits for dirdupe.
//!
//! This crate provides the fundamental data structures used throughout
//! the dirdupe ecosystem: the path tree built from a duplicate listing,
//! the directory oracle trait, configuration, progress and checkpoints.

mod checkpoint;
mod config;
mod error;
mod node;
mod oracle;
mod progress;
mod tree;

pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint, Stage};
pub use config::{AnalyzeConfig, AnalyzeConfigBuilder};
pub use error::{AnalysisWarning, DirdupeError, WarningKind};
pub use node::{Fingerprint, GroupId, NodeId, NodeKind, PathNode};
pub use oracle::{DirectoryOracle, EntryNames};
pub use progress::{PassProgress, Phase, ProgressTracker};
pub use tree::{PathTree, TreeStats};
