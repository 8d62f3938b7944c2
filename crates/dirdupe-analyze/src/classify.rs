//! Potential-duplicate classification ("treeshake").
//!
//! A directory can only duplicate another directory if every descendant is
//! itself a duplicate and the directory holds nothing the scanner left out.
//! Both conditions are checked bottom-up:
//!
//! 1. Files are always candidates; the scanner already grouped them.
//! 2. A directory with a non-candidate child is not a candidate.
//! 3. A directory whose live listing has more entries than the tree knows
//!    about is not a candidate.
//!
//! Directories that vanished from disk are detached from the tree entirely.

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use dirdupe_core::{
    AnalysisWarning, DirectoryOracle, DirdupeError, NodeId, PathTree, Phase, ProgressTracker,
};

/// Directory listings fetched per parallel batch.
const BATCH_SIZE: usize = 256;

/// Counters from a classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyStats {
    /// Directories checked against the oracle.
    pub directories_checked: u64,
    /// Directories left as potential duplicates.
    pub potential_directories: u64,
    /// Directories holding entries the scanner never reported.
    pub extra_entries: u64,
    /// Directories with a non-duplicate child.
    pub tainted_by_child: u64,
    /// Directories left without children.
    pub empty: u64,
    /// Directories that could not be listed.
    pub unreadable: u64,
    /// Nodes removed because their directory vanished.
    pub detached_nodes: u64,
}

/// Result of a classification pass.
#[derive(Debug, Clone, Default)]
pub struct ClassifyReport {
    /// Counters.
    pub stats: ClassifyStats,
    /// Vanished and unreadable directories.
    pub warnings: Vec<AnalysisWarning>,
}

/// Marks which subtrees are fully explained by known duplicates.
pub struct Classifier<O> {
    oracle: O,
    threads: usize,
}

impl<O: DirectoryOracle> Classifier<O> {
    /// Create a classifier using the default thread count.
    pub fn new(oracle: O) -> Self {
        Self { oracle, threads: 0 }
    }

    /// Limit how many directory listings run at once (0 = auto-detect).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// The oracle this classifier consults.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Classify every attached node of `tree`, children before parents.
    pub fn classify(
        &self,
        tree: &mut PathTree,
        progress: &mut ProgressTracker,
    ) -> Result<ClassifyReport, DirdupeError> {
        let order = tree.post_order();
        let directories: Vec<(NodeId, PathBuf)> = order
            .iter()
            .copied()
            .filter(|&id| tree.node(id).is_dir())
            .map(|id| (id, tree.path_of(id)))
            .collect();

        progress.start(Phase::Classifying, directories.len() as u64);
        let result = self
            .fetch_entry_counts(&directories, progress)
            .and_then(|listings| self.apply_listings(tree, &order, &listings));
        progress.finish();
        let report = result?;

        tracing::info!(
            checked = report.stats.directories_checked,
            potential = report.stats.potential_directories,
            detached = report.stats.detached_nodes,
            "classification finished"
        );
        Ok(report)
    }

    /// List every directory, in parallel batches, keeping only entry counts.
    fn fetch_entry_counts(
        &self,
        directories: &[(NodeId, PathBuf)],
        progress: &mut ProgressTracker,
    ) -> Result<HashMap<NodeId, Result<usize, DirdupeError>>, DirdupeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| DirdupeError::InvalidConfig {
                message: format!("cannot start {} listing threads: {e}", self.threads),
            })?;

        let mut listings = HashMap::with_capacity(directories.len());
        for batch in directories.chunks(BATCH_SIZE) {
            let fetched: Vec<(NodeId, Result<usize, DirdupeError>)> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|(id, path)| (*id, self.oracle.list_entries(path).map(|names| names.len())))
                    .collect()
            });
            listings.extend(fetched);
            progress.advance(batch.len() as u64);
        }
        Ok(listings)
    }

    /// Apply fetched listings in post-order.
    fn apply_listings(
        &self,
        tree: &mut PathTree,
        order: &[NodeId],
        listings: &HashMap<NodeId, Result<usize, DirdupeError>>,
    ) -> Result<ClassifyReport, DirdupeError> {
        let mut report = ClassifyReport::default();
        for &id in order {
            if tree.node(id).is_file() {
                tree.node_mut(id).potential_duplicate = true;
                continue;
            }
            let Some(listing) = listings.get(&id) else {
                return Err(DirdupeError::structural(format!(
                    "no listing fetched for {}",
                    tree.path_of(id).display()
                )));
            };
            self.classify_directory(tree, id, listing, &mut report)?;
        }
        Ok(report)
    }

    fn classify_directory(
        &self,
        tree: &mut PathTree,
        id: NodeId,
        listing: &Result<usize, DirdupeError>,
        report: &mut ClassifyReport,
    ) -> Result<(), DirdupeError> {
        let stats = &mut report.stats;
        stats.directories_checked += 1;

        let real_entries = match listing {
            Ok(count) => *count,
            Err(err) if err.is_not_found() => {
                let path = tree.path_of(id);
                tracing::warn!(path = %path.display(), "directory vanished, dropping its subtree");
                report.warnings.push(AnalysisWarning::vanished(&path));

                if id == tree.root() {
                    // The root stays; everything below it goes.
                    for child in tree.children(id).to_vec() {
                        stats.detached_nodes += tree.detach(child)? as u64;
                    }
                    tree.node_mut(id).potential_duplicate = false;
                } else {
                    stats.detached_nodes += tree.detach(id)? as u64;
                }
                return Ok(());
            }
            Err(err) => {
                let path = tree.path_of(id);
                tracing::warn!(path = %path.display(), error = %err, "cannot list directory");
                report.warnings.push(AnalysisWarning::read_error(&path, err));
                stats.unreadable += 1;
                tree.node_mut(id).potential_duplicate = false;
                return Ok(());
            }
        };

        let node = tree.node(id);
        let known_entries = node.children.len();
        let children_ok = node
            .children
            .iter()
            .all(|&child| tree.node(child).potential_duplicate);

        let mut potential = true;
        if !children_ok {
            stats.tainted_by_child += 1;
            potential = false;
        }
        if real_entries > known_entries {
            stats.extra_entries += 1;
            potential = false;
        }
        if known_entries == 0 {
            stats.empty += 1;
            potential = false;
        }
        if potential {
            stats.potential_directories += 1;
        }

        tree.node_mut(id).potential_duplicate = potential;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirdupe_core::{EntryNames, GroupId, PathNode};
    use std::path::Path;

    /// Reports a fixed entry count per known directory.
    struct CountingOracle {
        known: HashMap<PathBuf, usize>,
    }

    impl DirectoryOracle for CountingOracle {
        fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
            let count = *self.known.get(path).ok_or_else(|| DirdupeError::NotFound {
                path: path.to_path_buf(),
            })?;
            Ok((0..count).map(|i| i.to_string().into()).collect())
        }
    }

    fn tree_with_pair() -> PathTree {
        let mut tree = PathTree::new();
        let root = tree.root();
        for dir in ["a", "b"] {
            let d = tree.add_child(root, PathNode::new_directory(dir)).unwrap();
            tree.add_child(d, PathNode::new_file("x", GroupId::new(0))).unwrap();
        }
        tree
    }

    #[test]
    fn test_matching_counts_keep_candidates() {
        let mut tree = tree_with_pair();
        let oracle = CountingOracle {
            known: [("/", 2), ("/a", 1), ("/b", 1)]
                .into_iter()
                .map(|(p, c)| (PathBuf::from(p), c))
                .collect(),
        };

        let report = Classifier::new(oracle)
            .classify(&mut tree, &mut ProgressTracker::new())
            .unwrap();

        assert!(tree.node(tree.find("/a").unwrap()).potential_duplicate);
        assert!(tree.node(tree.root()).potential_duplicate);
        assert_eq!(report.stats.potential_directories, 3);
    }

    #[test]
    fn test_extra_entry_taints_parents() {
        let mut tree = tree_with_pair();
        let oracle = CountingOracle {
            known: [("/", 2), ("/a", 2), ("/b", 1)]
                .into_iter()
                .map(|(p, c)| (PathBuf::from(p), c))
                .collect(),
        };

        let report = Classifier::new(oracle)
            .with_threads(1)
            .classify(&mut tree, &mut ProgressTracker::new())
            .unwrap();

        assert!(!tree.node(tree.find("/a").unwrap()).potential_duplicate);
        assert!(tree.node(tree.find("/b").unwrap()).potential_duplicate);
        assert!(!tree.node(tree.root()).potential_duplicate);
        assert_eq!(report.stats.extra_entries, 1);
        assert_eq!(report.stats.tainted_by_child, 1);
    }

    #[test]
    fn test_missing_root_detaches_everything_below() {
        let mut tree = tree_with_pair();
        let oracle = CountingOracle {
            known: HashMap::new(),
        };

        let report = Classifier::new(oracle)
            .classify(&mut tree, &mut ProgressTracker::new())
            .unwrap();

        assert!(tree.children(tree.root()).is_empty());
        assert!(!tree.node(tree.root()).potential_duplicate);
        assert_eq!(report.stats.detached_nodes, 4);
    }
}
