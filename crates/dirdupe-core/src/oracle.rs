//! Source of truth for what a directory really contains.

use std::collections::BTreeSet;
use std::path::Path;

use compact_str::CompactString;

use crate::error::DirdupeError;

/// Names found in one directory, sorted.
pub type EntryNames = BTreeSet<CompactString>;

/// Lists the live contents of a directory at analysis time.
///
/// The classifier only trusts a directory as a duplicate candidate if the
/// oracle reports no more entries than the scanner did. Implementations
/// must return [`DirdupeError::NotFound`] for a directory that no longer
/// exists; any other error marks the directory as unreadable.
pub trait DirectoryOracle: Send + Sync {
    /// List the names directly inside `path`.
    fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError>;
}

impl<T: DirectoryOracle + ?Sized> DirectoryOracle for &T {
    fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
        (**self).list_entries(path)
    }
}

impl<T: DirectoryOracle + ?Sized> DirectoryOracle for Box<T> {
    fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
        (**self).list_entries(path)
    }
}
