//! Directory oracles backed by the live filesystem or by memory.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use compact_str::{CompactString, format_compact};
use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

use dirdupe_core::{AnalyzeConfig, DirectoryOracle, DirdupeError, EntryNames};

/// Lists directories on disk, one level deep.
#[derive(Debug, Clone, Default)]
pub struct FsOracle {
    ignore: Option<GlobSet>,
}

impl FsOracle {
    /// Create an oracle that counts every entry.
    pub fn new() -> Self {
        Self { ignore: None }
    }

    /// Create an oracle that drops entries whose names match any pattern.
    pub fn with_ignore_patterns(patterns: &[String]) -> Result<Self, DirdupeError> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| DirdupeError::InvalidConfig {
                message: format!("bad ignore pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| DirdupeError::InvalidConfig {
            message: e.to_string(),
        })?;
        Ok(Self { ignore: Some(set) })
    }

    /// Create an oracle from analysis settings.
    pub fn from_config(config: &AnalyzeConfig) -> Result<Self, DirdupeError> {
        Self::with_ignore_patterns(&config.ignore_entries)
    }

    fn is_ignored(&self, name: &OsStr) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(Path::new(name)))
    }
}

/// Key for one directory entry, distinct for distinct on-disk names.
///
/// Names that are not valid UTF-8 are escaped behind a leading `/`, which no
/// real entry name can contain.
fn entry_name(name: &OsStr) -> CompactString {
    match name.to_str() {
        Some(name) => CompactString::new(name),
        None => format_compact!("/{}", name.as_encoded_bytes().escape_ascii()),
    }
}

impl DirectoryOracle for FsOracle {
    fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
        // A path that turned into a file or symlink no longer is the directory
        // the scanner saw.
        let metadata = std::fs::symlink_metadata(path).map_err(|e| DirdupeError::io(path, e))?;
        if !metadata.is_dir() {
            return Err(DirdupeError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let walker = WalkDir::new(path)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .min_depth(1)
            .max_depth(1);

        let mut names = EntryNames::new();
        for entry_result in walker {
            let entry = entry_result.map_err(|err| match err.io_error() {
                Some(io) => DirdupeError::io(path, std::io::Error::new(io.kind(), io.to_string())),
                None => DirdupeError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::other(err.to_string()),
                },
            })?;

            let name = entry.file_name();
            if !self.is_ignored(name) {
                names.insert(entry_name(name));
            }
        }
        Ok(names)
    }
}

/// In-memory directory layout, for tests and offline replays.
///
/// Adding a path implicitly creates all of its parent directories.
#[derive(Debug, Clone)]
pub struct MemoryOracle {
    dirs: BTreeMap<PathBuf, EntryNames>,
    unreadable: BTreeSet<PathBuf>,
}

impl MemoryOracle {
    /// Create a layout containing only an empty `/`.
    pub fn new() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert(PathBuf::from("/"), EntryNames::new());
        Self {
            dirs,
            unreadable: BTreeSet::new(),
        }
    }

    /// Create a layout holding the given files.
    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut oracle = Self::new();
        for file in files {
            oracle.insert_file(file);
        }
        oracle
    }

    /// Add a file.
    pub fn insert_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.ensure_dir(parent);
            if let Some(entries) = self.dirs.get_mut(parent) {
                entries.insert(CompactString::new(name.to_string_lossy()));
            }
        }
    }

    /// Add a directory, empty unless files are added to it.
    pub fn insert_dir(&mut self, path: impl AsRef<Path>) {
        self.ensure_dir(path.as_ref());
    }

    /// Delete a file or directory and everything below it.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.dirs.retain(|dir, _| !dir.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(entries) = self.dirs.get_mut(parent) {
                entries.remove(&*name.to_string_lossy());
            }
        }
    }

    /// Make listing `path` fail with a permission error.
    pub fn mark_unreadable(&mut self, path: impl AsRef<Path>) {
        self.unreadable.insert(path.as_ref().to_path_buf());
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.dirs.contains_key(path) {
            return;
        }
        self.dirs.insert(path.to_path_buf(), EntryNames::new());
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.ensure_dir(parent);
            if let Some(entries) = self.dirs.get_mut(parent) {
                entries.insert(CompactString::new(name.to_string_lossy()));
            }
        }
    }
}

impl Default for MemoryOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryOracle for MemoryOracle {
    fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
        if self.unreadable.contains(path) {
            return Err(DirdupeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        self.dirs.get(path).cloned().ok_or_else(|| DirdupeError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fs_oracle_lists_one_level() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join(".hidden"), "h").unwrap();
        fs::write(root.join("sub/deep.txt"), "d").unwrap();

        let names = FsOracle::new().list_entries(root).unwrap();
        let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec![".hidden", "a.txt", "sub"]);
    }

    #[test]
    fn test_fs_oracle_missing_dir() {
        let temp = TempDir::new().unwrap();
        let err = FsOracle::new()
            .list_entries(&temp.path().join("gone"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fs_oracle_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, "x").unwrap();
        assert!(FsOracle::new().list_entries(&file).unwrap_err().is_not_found());
    }

    #[test]
    fn test_fs_oracle_ignore_patterns() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".DS_Store"), "").unwrap();
        fs::write(temp.path().join("keep.txt"), "").unwrap();

        let oracle = FsOracle::with_ignore_patterns(&[".DS_Store".to_string()]).unwrap();
        let names = oracle.list_entries(temp.path()).unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("keep.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_oracle_keeps_non_utf8_names_apart() {
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("x\u{FFFD}"), "").unwrap();
        // Some filesystems only accept UTF-8 names.
        if fs::write(temp.path().join(OsStr::from_bytes(b"x\xff")), "").is_err() {
            return;
        }
        let on_disk = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(on_disk, 2);

        let names = FsOracle::new().list_entries(temp.path()).unwrap();
        assert_eq!(names.len(), on_disk);
        assert!(names.contains("x\u{FFFD}"));
        assert!(names.contains("/x\\xff"));
    }

    #[cfg(unix)]
    #[test]
    fn test_ignore_patterns_match_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        if fs::write(temp.path().join(OsStr::from_bytes(b"junk\xff.tmp")), "").is_err() {
            return;
        }
        fs::write(temp.path().join("keep"), "").unwrap();

        let oracle = FsOracle::with_ignore_patterns(&["*.tmp".to_string()]).unwrap();
        let names = oracle.list_entries(temp.path()).unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("keep"));
    }

    #[test]
    fn test_bad_glob_rejected() {
        let err = FsOracle::with_ignore_patterns(&["a[".to_string()]).unwrap_err();
        assert!(matches!(err, DirdupeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_memory_oracle_implies_parents() {
        let oracle = MemoryOracle::from_files(["/a/x", "/a/y", "/b/x"]);
        assert_eq!(oracle.list_entries(Path::new("/")).unwrap().len(), 2);
        assert_eq!(oracle.list_entries(Path::new("/a")).unwrap().len(), 2);
        assert!(oracle.list_entries(Path::new("/c")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_memory_oracle_remove() {
        let mut oracle = MemoryOracle::from_files(["/a/x", "/b/sub/x"]);
        oracle.remove("/b");
        assert!(oracle.list_entries(Path::new("/b")).unwrap_err().is_not_found());
        assert!(oracle.list_entries(Path::new("/b/sub")).unwrap_err().is_not_found());
        assert_eq!(oracle.list_entries(Path::new("/")).unwrap().len(), 1);
    }
}
