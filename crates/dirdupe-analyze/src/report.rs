//! Duplicate sets and their human-readable rendering.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dirdupe_core::{AnalysisWarning, Fingerprint};

/// Width of the line closing each duplicate set in text output.
const RULE_WIDTH: usize = 40;

/// What kind of node a duplicate set holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Identical files.
    File,
    /// Directories with identical content.
    Directory,
}

impl ContentKind {
    fn as_str(self) -> &'static str {
        match self {
            ContentKind::File => "file",
            ContentKind::Directory => "directory",
        }
    }
}

/// Locations sharing one fingerprint.
///
/// A set always has at least one top-level location. Content that only
/// occurs inside reported locations gets no set of its own: when `/a` and
/// `/b` are reported as a directory pair, the file pairs `/a/x`,`/b/x` and
/// `/a/y`,`/b/y` are not listed anywhere. Such sets are only counted, in
/// [`ResolveStats::sets_suppressed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateSet {
    /// Shared fingerprint.
    pub fingerprint: Fingerprint,
    /// Whether the set holds files or directories.
    pub kind: ContentKind,
    /// Locations not covered by an enclosing duplicate, in traversal order.
    pub toplevel: Vec<PathBuf>,
    /// Locations inside an enclosing duplicate, in traversal order.
    pub nested: Vec<PathBuf>,
}

impl DuplicateSet {
    /// Total number of locations.
    pub fn len(&self) -> usize {
        self.toplevel.len() + self.nested.len()
    }

    /// Check whether the set has no locations.
    pub fn is_empty(&self) -> bool {
        self.toplevel.is_empty() && self.nested.is_empty()
    }

    /// All locations, top-level first.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.toplevel.iter().chain(&self.nested)
    }
}

/// Counters from the resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Nodes with a non-sentinel fingerprint.
    pub candidates: u64,
    /// Fingerprints shared by more than one node.
    pub duplicate_fingerprints: u64,
    /// Sets reported.
    pub sets_reported: u64,
    /// Sets dropped because every location was nested.
    pub sets_suppressed: u64,
}

/// Result of a full analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateDirReport {
    /// Duplicate sets in report order.
    pub sets: Vec<DuplicateSet>,
    /// Resolution counters.
    pub stats: ResolveStats,
    /// Non-fatal problems collected along the way.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

impl DuplicateDirReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.sets.is_empty()
    }

    /// Sets holding directories.
    pub fn directory_sets(&self) -> impl Iterator<Item = &DuplicateSet> {
        self.sets.iter().filter(|s| s.kind == ContentKind::Directory)
    }

    /// Sets holding single files.
    pub fn file_sets(&self) -> impl Iterator<Item = &DuplicateSet> {
        self.sets.iter().filter(|s| s.kind == ContentKind::File)
    }

    /// Find the set a path belongs to, top-level or nested.
    pub fn set_containing(&self, path: impl AsRef<std::path::Path>) -> Option<&DuplicateSet> {
        let path = path.as_ref();
        self.sets.iter().find(|s| s.paths().any(|p| p == path))
    }

    /// Render every set as text blocks.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (index, set) in self.sets.iter().enumerate() {
            let _ = writeln!(
                out,
                "Duplicate set {}: {}, fingerprint {}",
                index + 1,
                set.kind.as_str(),
                set.fingerprint.short_hex()
            );
            for path in &set.toplevel {
                let _ = writeln!(out, "  {}", path.display());
            }
            for path in &set.nested {
                let _ = writeln!(out, "  nested: {}", path.display());
            }
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        }
        out
    }

    /// Write the text rendering to `writer`.
    pub fn write_text<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.to_text().as_bytes())
    }
}
