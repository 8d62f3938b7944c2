//! Content-summarizing subtree fingerprints.
//!
//! Files are fingerprinted from their duplicate group alone. Directories are
//! fingerprinted from the sorted fingerprints of their children, so two
//! directories share a fingerprint exactly when they hold the same multiset
//! of duplicate groups in the same shape, whatever the entry names or order.

use serde::{Deserialize, Serialize};

use dirdupe_core::{
    DirdupeError, Fingerprint, GroupId, NodeId, NodeKind, PathTree, Phase, ProgressTracker,
};

const FILE_CONTEXT: &str = "dirdupe 2026-10-16 duplicate group fingerprint";
const DIRECTORY_CONTEXT: &str = "dirdupe 2026-10-16 directory fingerprint";

/// Counters from a fingerprinting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintStats {
    /// Files fingerprinted.
    pub files: u64,
    /// Directories fingerprinted from their children.
    pub directories: u64,
    /// Nodes given the sentinel.
    pub sentinels: u64,
}

/// Fingerprint of every file in duplicate group `group`.
pub fn file_fingerprint(group: GroupId) -> Fingerprint {
    let mut hasher = blake3::Hasher::new_derive_key(FILE_CONTEXT);
    hasher.update(&group.0.to_le_bytes());
    Fingerprint::new(*hasher.finalize().as_bytes())
}

/// Fingerprint of a directory holding children with the given fingerprints.
///
/// Order of `children` does not matter.
pub fn directory_fingerprint(mut children: Vec<Fingerprint>) -> Fingerprint {
    children.sort_unstable();
    let mut hasher = blake3::Hasher::new_derive_key(DIRECTORY_CONTEXT);
    hasher.update(&(children.len() as u64).to_le_bytes());
    for child in &children {
        hasher.update(child.as_bytes());
    }
    Fingerprint::new(*hasher.finalize().as_bytes())
}

/// Assign a fingerprint to every attached node, children before parents.
///
/// Expects a classified tree: nodes that are not potential duplicates get
/// the sentinel.
pub fn fingerprint_tree(
    tree: &mut PathTree,
    progress: &mut ProgressTracker,
) -> Result<FingerprintStats, DirdupeError> {
    let order = tree.post_order();
    progress.start(Phase::Fingerprinting, order.len() as u64);
    let result = fingerprint_nodes(tree, &order, progress);
    progress.finish();
    let stats = result?;

    tracing::info!(
        files = stats.files,
        directories = stats.directories,
        sentinels = stats.sentinels,
        "fingerprints computed"
    );
    Ok(stats)
}

fn fingerprint_nodes(
    tree: &mut PathTree,
    order: &[NodeId],
    progress: &mut ProgressTracker,
) -> Result<FingerprintStats, DirdupeError> {
    let mut stats = FingerprintStats::default();
    for &id in order {
        let node = tree.node(id);
        let fingerprint = if !node.potential_duplicate {
            stats.sentinels += 1;
            Fingerprint::sentinel()
        } else {
            match node.kind {
                NodeKind::File { group } => {
                    stats.files += 1;
                    file_fingerprint(group)
                }
                NodeKind::Directory => {
                    let children = node
                        .children
                        .iter()
                        .map(|&child| {
                            tree.node(child).fingerprint.ok_or_else(|| {
                                DirdupeError::structural(format!(
                                    "{} has no fingerprint",
                                    tree.path_of(child).display()
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    stats.directories += 1;
                    directory_fingerprint(children)
                }
            }
        };

        tree.node_mut(id).fingerprint = Some(fingerprint);
        progress.advance(1);
    }
    Ok(stats)
}
