//! Extraction of top-level duplicate sets from a fingerprinted tree.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use itertools::Itertools;

use dirdupe_core::{DirdupeError, Fingerprint, NodeId, PathTree, Phase, ProgressTracker};

use crate::report::{ContentKind, DuplicateDirReport, DuplicateSet, ResolveStats};

/// Group duplicate fingerprints into sets, reporting each piece of content
/// at the highest level it occurs.
///
/// Anything below a reported location is only listed as a nested occurrence,
/// and sets whose every location is nested are dropped.
pub fn resolve(tree: &PathTree, progress: &mut ProgressTracker) -> Result<DuplicateDirReport, DirdupeError> {
    let mut stats = ResolveStats::default();

    // Count every real fingerprint.
    let attached = tree.post_order();
    let mut counts: HashMap<Fingerprint, u64> = HashMap::new();
    for &id in &attached {
        let node = tree.node(id);
        if !node.potential_duplicate {
            continue;
        }
        let fingerprint = fingerprint_of(tree, id)?;
        if fingerprint.is_sentinel() {
            continue;
        }
        stats.candidates += 1;
        *counts.entry(fingerprint).or_default() += 1;
    }

    let duplicates: HashSet<Fingerprint> = counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(fingerprint, _)| fingerprint)
        .collect();
    stats.duplicate_fingerprints = duplicates.len() as u64;

    progress.start(Phase::Resolving, attached.len() as u64);

    // Walk top-down, children by name, remembering whether a duplicate has
    // already been seen on the way down.
    let mut buckets: IndexMap<Fingerprint, Vec<(bool, NodeId)>> = IndexMap::new();
    let mut stack = vec![(tree.root(), true)];
    while let Some((id, toplevel)) = stack.pop() {
        progress.advance(1);
        let node = tree.node(id);
        let mut child_toplevel = toplevel;
        if let Some(fingerprint) = node.fingerprint.filter(|f| duplicates.contains(f)) {
            if node.potential_duplicate {
                buckets.entry(fingerprint).or_default().push((toplevel, id));
                child_toplevel = false;
            }
        }

        let ordered = node
            .children
            .iter()
            .sorted_by(|&&a, &&b| tree.node(a).name.cmp(&tree.node(b).name));
        for &child in ordered.rev() {
            stack.push((child, child_toplevel));
        }
    }

    let mut sets = Vec::new();
    for (fingerprint, mut entries) in buckets {
        entries.sort_by_key(|&(toplevel, _)| std::cmp::Reverse(toplevel));
        let Some(&(true, first)) = entries.first() else {
            stats.sets_suppressed += 1;
            continue;
        };

        let kind = if tree.node(first).is_dir() {
            ContentKind::Directory
        } else {
            ContentKind::File
        };
        let (toplevel, nested): (Vec<_>, Vec<_>) = entries.into_iter().partition(|&(top, _)| top);
        sets.push(DuplicateSet {
            fingerprint,
            kind,
            toplevel: toplevel.into_iter().map(|(_, id)| tree.path_of(id)).collect(),
            nested: nested.into_iter().map(|(_, id)| tree.path_of(id)).collect(),
        });
    }
    stats.sets_reported = sets.len() as u64;
    progress.finish();

    tracing::info!(
        sets = stats.sets_reported,
        suppressed = stats.sets_suppressed,
        "duplicate sets resolved"
    );
    Ok(DuplicateDirReport {
        sets,
        stats,
        warnings: Vec::new(),
    })
}

fn fingerprint_of(tree: &PathTree, id: NodeId) -> Result<Fingerprint, DirdupeError> {
    tree.node(id).fingerprint.ok_or_else(|| {
        DirdupeError::structural(format!(
            "{} was not fingerprinted before resolution",
            tree.path_of(id).display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{directory_fingerprint, file_fingerprint};
    use dirdupe_core::{GroupId, PathNode};
    use std::path::PathBuf;

    /// Build and fingerprint a tree where every node is a candidate.
    fn candidate_tree(files: &[(&str, u64)]) -> PathTree {
        let mut tree = PathTree::new();
        for &(path, group) in files {
            let mut current = tree.root();
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let (name, dirs) = segments.split_last().unwrap();
            for dir in dirs {
                current = match tree.child_by_name(current, dir) {
                    Some(existing) => existing,
                    None => tree.add_child(current, PathNode::new_directory(*dir)).unwrap(),
                };
            }
            tree.add_child(current, PathNode::new_file(*name, GroupId::new(group)))
                .unwrap();
        }
        for id in tree.post_order() {
            let node = tree.node(id);
            let fingerprint = match node.kind.group() {
                Some(group) => file_fingerprint(group),
                None => directory_fingerprint(
                    node.children.iter().map(|&c| tree.node(c).fingerprint.unwrap()).collect(),
                ),
            };
            tree.node_mut(id).fingerprint = Some(fingerprint);
        }
        tree
    }

    #[test]
    fn test_nested_only_sets_are_dropped() {
        let tree = candidate_tree(&[("/a/x", 0), ("/b/x", 0), ("/a/y", 1), ("/b/y", 1)]);
        let report = resolve(&tree, &mut ProgressTracker::new()).unwrap();

        assert_eq!(report.sets.len(), 1);
        let set = &report.sets[0];
        assert_eq!(set.kind, ContentKind::Directory);
        assert_eq!(set.toplevel, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(set.nested.is_empty());
        assert_eq!(report.stats.sets_suppressed, 2);
    }

    #[test]
    fn test_copy_below_unique_dir_stays_toplevel() {
        let tree = candidate_tree(&[("/a/x", 0), ("/b/x", 0), ("/c/a/x", 0)]);
        let report = resolve(&tree, &mut ProgressTracker::new()).unwrap();

        // /c itself is unique, so /c/a is as top-level as /a and /b.
        let dirs: Vec<_> = report.directory_sets().collect();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].toplevel.len(), 3);
        assert_eq!(dirs[0].toplevel[2], PathBuf::from("/c/a"));
        assert_eq!(report.file_sets().count(), 0);
    }

    #[test]
    fn test_duplicate_inside_duplicate_is_nested() {
        let tree = candidate_tree(&[
            ("/a/x", 0),
            ("/b/x", 0),
            ("/p/a/x", 0),
            ("/p/q", 1),
            ("/r/a/x", 0),
            ("/r/q", 1),
            ("/s/x", 0),
            ("/s/z", 2),
        ]);
        let report = resolve(&tree, &mut ProgressTracker::new()).unwrap();

        let outer = report.set_containing("/p").unwrap();
        assert_eq!(outer.toplevel, vec![PathBuf::from("/p"), PathBuf::from("/r")]);

        let inner = report.set_containing("/a").unwrap();
        assert_eq!(inner.toplevel, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(inner.nested, vec![PathBuf::from("/p/a"), PathBuf::from("/r/a")]);
    }

    #[test]
    fn test_progress_completes_after_detach() {
        let mut tree = candidate_tree(&[("/a/x", 0), ("/b/x", 0), ("/c/x", 0)]);
        let c = tree.find("/c").unwrap();
        assert_eq!(tree.detach(c).unwrap(), 2);

        let mut progress = ProgressTracker::with_interval(1);
        let mut rx = progress.subscribe();
        resolve(&tree, &mut progress).unwrap();

        let last = std::iter::from_fn(|| rx.try_recv().ok()).last().unwrap();
        assert!(last.finished);
        assert_eq!(last.total, 5);
        assert_eq!(last.processed, last.total);
        assert_eq!(last.fraction(), 1.0);
    }

    #[test]
    fn test_missing_fingerprint_is_structural() {
        let mut tree = PathTree::new();
        let root = tree.root();
        tree.add_child(root, PathNode::new_file("x", GroupId::new(0))).unwrap();

        let err = resolve(&tree, &mut ProgressTracker::new()).unwrap_err();
        assert!(matches!(err, DirdupeError::Structural { .. }));
    }
}
