//! Builds a path tree from a duplicate listing.

use std::collections::HashMap;
use std::io::BufRead;

use compact_str::CompactString;

use dirdupe_core::{
    AnalysisWarning, DirdupeError, GroupId, NodeId, NodeKind, PathNode, PathTree, Phase,
    ProgressTracker, WarningKind,
};

use crate::listing::{ListingRecord, parse_line};

/// Counters collected while reading a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Lines read, separators included.
    pub lines: u64,
    /// Path lines inserted or re-stamped.
    pub paths: u64,
    /// Groups that received at least one path.
    pub groups: u64,
    /// Lines discarded because they were not absolute paths.
    pub discarded: u64,
    /// Paths skipped because they clash with an existing file or directory.
    pub conflicts: u64,
}

/// What happened to a single inserted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new file node was created.
    Inserted(NodeId),
    /// The path was already known; its group id was overwritten.
    Restamped(NodeId),
    /// The path contradicts the existing tree and was skipped.
    Conflict,
}

/// Result of reading a whole listing.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    /// The materialized tree.
    pub tree: PathTree,
    /// Counters.
    pub stats: BuildStats,
    /// Recoverable problems found while reading.
    pub warnings: Vec<AnalysisWarning>,
}

/// Incrementally turns listing lines into a [`PathTree`].
///
/// Group ids start at 0 and advance on every separator line, so each file
/// is stamped with the group it was listed in.
#[derive(Debug)]
pub struct TreeBuilder {
    tree: PathTree,
    index: HashMap<(NodeId, CompactString), NodeId>,
    group: GroupId,
    last_filled_group: Option<GroupId>,
    stats: BuildStats,
    warnings: Vec<AnalysisWarning>,
}

impl TreeBuilder {
    /// Start from an empty tree.
    pub fn new() -> Self {
        Self::from_tree(PathTree::new())
    }

    /// Extend an existing tree, e.g. one restored from a checkpoint.
    pub fn from_tree(tree: PathTree) -> Self {
        let mut index = HashMap::new();
        let mut next_group = GroupId::new(0);
        for id in tree.pre_order() {
            let node = tree.node(id);
            if let Some(parent) = node.parent {
                index.insert((parent, node.name.clone()), id);
            }
            if let NodeKind::File { group } = node.kind {
                next_group = next_group.max(group.next());
            }
        }

        Self {
            tree,
            index,
            group: next_group,
            last_filled_group: None,
            stats: BuildStats::default(),
            warnings: Vec::new(),
        }
    }

    /// Group the next path will be stamped with.
    pub fn current_group(&self) -> GroupId {
        self.group
    }

    /// Counters so far.
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Feed one listing line.
    pub fn push_line(&mut self, line: &str) -> Result<(), DirdupeError> {
        self.stats.lines += 1;
        match parse_line(line) {
            ListingRecord::Separator => {
                self.group = self.group.next();
            }
            ListingRecord::Path(path) => {
                self.insert_path(path, self.group)?;
            }
            ListingRecord::Malformed(text) => {
                self.stats.discarded += 1;
                tracing::debug!(line = self.stats.lines, "discarding malformed listing line");
                self.warnings
                    .push(AnalysisWarning::malformed_line(self.stats.lines as usize, text));
            }
        }
        Ok(())
    }

    /// Insert an absolute path as a file of `group`, creating any missing
    /// parent directories.
    pub fn insert_path(&mut self, path: &str, group: GroupId) -> Result<InsertOutcome, DirdupeError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return Ok(self.conflict(path, "the root cannot be a file"));
        };

        let mut current = self.tree.root();
        for (depth, segment) in dirs.iter().enumerate() {
            match self.lookup(current, segment) {
                Some(existing) if self.tree.node(existing).is_file() => {
                    let at = format!("/{}", dirs[..=depth].join("/"));
                    return Ok(self.conflict(path, &format!("{at} is listed as a file")));
                }
                Some(existing) => current = existing,
                None => current = self.create(current, PathNode::new_directory(*segment))?,
            }
        }

        let outcome = match self.lookup(current, file_name) {
            Some(existing) if self.tree.node(existing).is_file() => {
                self.tree.node_mut(existing).kind = NodeKind::File { group };
                InsertOutcome::Restamped(existing)
            }
            Some(_) => return Ok(self.conflict(path, "path is already a directory")),
            None => InsertOutcome::Inserted(self.create(current, PathNode::new_file(*file_name, group))?),
        };

        self.stats.paths += 1;
        if self.last_filled_group != Some(group) {
            self.last_filled_group = Some(group);
            self.stats.groups += 1;
        }
        Ok(outcome)
    }

    /// Hand over the finished tree.
    pub fn finish(self) -> BuiltTree {
        BuiltTree {
            tree: self.tree,
            stats: self.stats,
            warnings: self.warnings,
        }
    }

    fn lookup(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.index.get(&(parent, CompactString::new(name))).copied()
    }

    fn create(&mut self, parent: NodeId, node: PathNode) -> Result<NodeId, DirdupeError> {
        let name = node.name.clone();
        let id = self.tree.add_child(parent, node)?;
        self.index.insert((parent, name), id);
        Ok(id)
    }

    fn conflict(&mut self, path: &str, reason: &str) -> InsertOutcome {
        self.stats.conflicts += 1;
        tracing::warn!(path, reason, "skipping conflicting listing entry");
        self.warnings
            .push(AnalysisWarning::new(path, reason, WarningKind::KindConflict));
        InsertOutcome::Conflict
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a tree from a listing stream.
pub fn build_from_reader<R: BufRead>(
    reader: R,
    progress: &mut ProgressTracker,
) -> Result<BuiltTree, DirdupeError> {
    progress.start(Phase::Building, 0);
    let mut builder = TreeBuilder::new();
    for line in reader.lines() {
        let line = line.map_err(|e| DirdupeError::io("<listing>", e))?;
        builder.push_line(&line)?;
        progress.advance(1);
    }
    progress.finish();
    Ok(summarize(builder.finish()))
}

/// Build a tree from listing text.
pub fn build_from_str(text: &str, progress: &mut ProgressTracker) -> Result<BuiltTree, DirdupeError> {
    progress.start(Phase::Building, text.lines().count() as u64);
    let mut builder = TreeBuilder::new();
    for line in text.lines() {
        builder.push_line(line)?;
        progress.advance(1);
    }
    progress.finish();
    Ok(summarize(builder.finish()))
}

fn summarize(built: BuiltTree) -> BuiltTree {
    let stats = built.tree.stats();
    tracing::info!(
        files = stats.files,
        folders = stats.directories,
        groups = built.stats.groups,
        discarded = built.stats.discarded,
        "directory tree built"
    );
    built
}
