//! Duplicate directory analysis for dirdupe.
//!
//! Three passes run over a [`PathTree`](dirdupe_core::PathTree), strictly in
//! order:
//!
//! - [`Classifier`]: decides bottom-up which nodes are potential duplicates,
//!   checking directories against a [`DirectoryOracle`](dirdupe_core::DirectoryOracle)
//! - [`fingerprint_tree`]: gives every candidate an order-independent
//!   fingerprint and every other node the sentinel
//! - [`resolve`]: groups shared fingerprints into [`DuplicateSet`]s, reported
//!   at the highest level they occur
//!
//! [`Analyzer`] runs all three and can checkpoint between them.
//!
//! # Example
//!
//! ```rust,ignore
//! use dirdupe_analyze::Analyzer;
//! use dirdupe_scan::{build_from_str, FsOracle, ProgressTracker};
//!
//! let mut progress = ProgressTracker::new();
//! let built = build_from_str(&listing, &mut progress)?;
//! let analysis = Analyzer::new(FsOracle::new()).run(built.tree, built.warnings, &mut progress)?;
//! print!("{}", analysis.report.to_text());
//! ```

mod classify;
mod fingerprint;
mod pipeline;
mod render;
mod report;
mod resolve;

pub use classify::{ClassifyReport, ClassifyStats, Classifier};
pub use fingerprint::{FingerprintStats, directory_fingerprint, file_fingerprint, fingerprint_tree};
pub use pipeline::{Analysis, Analyzer};
pub use render::{TreeFormat, render_dot, render_graphml, render_text, render_tree};
pub use report::{ContentKind, DuplicateDirReport, DuplicateSet, ResolveStats};
pub use resolve::resolve;
