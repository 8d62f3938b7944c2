//! Duplicate listing ingestion and filesystem access for dirdupe.
//!
//! This crate turns the output of a file-level duplicate finder into a
//! [`PathTree`] and provides the directory oracles the classifier checks
//! that tree against.
//!
//! # Example
//!
//! ```rust
//! use dirdupe_scan::{build_from_str, ProgressTracker};
//!
//! let listing = "/a/x\n/b/x\n\n/a/y\n/b/y\n";
//! let mut progress = ProgressTracker::new();
//! let built = build_from_str(listing, &mut progress).unwrap();
//!
//! assert_eq!(built.tree.file_count(), 4);
//! assert_eq!(built.stats.groups, 2);
//! ```
//!
//! # Live scans
//!
//! ```rust,no_run
//! use std::path::Path;
//! use dirdupe_scan::{build_from_str, run_fdupes, FsOracle, ProgressTracker};
//!
//! let listing = run_fdupes("fdupes", Path::new("/srv/photos")).unwrap();
//! let built = build_from_str(&listing, &mut ProgressTracker::new()).unwrap();
//! let oracle = FsOracle::new();
//! ```

mod builder;
mod fdupes;
mod listing;
mod oracle;

pub use builder::{BuildStats, BuiltTree, InsertOutcome, TreeBuilder, build_from_reader, build_from_str};
pub use fdupes::run_fdupes;
pub use listing::{ListingRecord, SEPARATOR, parse_line};
pub use oracle::{FsOracle, MemoryOracle};

// Re-export core types for convenience
pub use dirdupe_core::{
    AnalysisWarning, DirectoryOracle, DirdupeError, EntryNames, GroupId, NodeId, NodeKind,
    PathNode, PathTree, ProgressTracker, WarningKind,
};
