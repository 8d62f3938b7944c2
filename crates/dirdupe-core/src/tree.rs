//! Arena-backed path tree and summary statistics.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DirdupeError;
use crate::node::{NodeId, PathNode};

/// Summary statistics for the attached part of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Number of file nodes.
    pub files: u64,
    /// Number of directory nodes, not counting the root.
    pub directories: u64,
    /// Deepest level below the root.
    pub max_depth: u32,
}

/// Hierarchical namespace of every path the scanner reported.
///
/// Nodes live in a flat arena and refer to each other by [`NodeId`]. A
/// parent owns its `children` list; `parent` is only a back-reference used
/// for upward walks. Detaching a subtree unlinks it from its parent, after
/// which it is unreachable from the root and ignored by every traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTree {
    nodes: Vec<PathNode>,
    root: NodeId,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// Create a tree holding only the `/` root directory.
    pub fn new() -> Self {
        Self {
            nodes: vec![PathNode::new_directory("")],
            root: NodeId::new(0),
        }
    }

    /// Root directory id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node. Panics if `id` did not come from this tree.
    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id.index()]
    }

    /// Mutably borrow a node. Panics if `id` did not come from this tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut PathNode {
        &mut self.nodes[id.index()]
    }

    /// Borrow a node if the id is in range.
    pub fn get(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id.index())
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Find a direct child by name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).name.as_str() == name)
    }

    /// Append `node` as a new child of `parent`.
    ///
    /// Files can't have children; callers are expected to have checked
    /// that no sibling already uses the same name.
    pub fn add_child(&mut self, parent: NodeId, mut node: PathNode) -> Result<NodeId, DirdupeError> {
        if !self.node(parent).is_dir() {
            return Err(DirdupeError::structural(format!(
                "cannot add {:?} below file {}",
                node.name,
                self.path_of(parent).display()
            )));
        }
        debug_assert!(self.child_by_name(parent, &node.name).is_none());

        let id = NodeId::new(self.nodes.len() as u64);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.node_mut(parent).children.push(id);
        Ok(id)
    }

    /// Absolute path of a node, rebuilt by walking parent links.
    pub fn path_of(&self, id: NodeId) -> PathBuf {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            let node = self.node(node_id);
            names.push(node.name.as_str());
            current = node.parent;
        }

        let mut path = PathBuf::from("/");
        for name in names.into_iter().rev() {
            path.push(name);
        }
        path
    }

    /// Look up an attached node by absolute path.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<NodeId> {
        let mut current = self.root;
        for component in path.as_ref().components() {
            match component {
                Component::RootDir | Component::CurDir => continue,
                Component::Normal(name) => {
                    current = self.child_by_name(current, name.to_str()?)?;
                }
                Component::Prefix(_) | Component::ParentDir => return None,
            }
        }
        Some(current)
    }

    /// Unlink a subtree from its parent. Returns how many nodes became
    /// unreachable.
    pub fn detach(&mut self, id: NodeId) -> Result<usize, DirdupeError> {
        let Some(parent) = self.node(id).parent else {
            return Err(DirdupeError::structural(if id == self.root {
                "the root cannot be detached".to_string()
            } else {
                format!("node {} is already detached", id.0)
            }));
        };

        let siblings = &mut self.node_mut(parent).children;
        let before = siblings.len();
        siblings.retain(|&child| child != id);
        if siblings.len() == before {
            return Err(DirdupeError::structural(format!(
                "node {} is missing from its parent's children",
                id.0
            )));
        }

        self.node_mut(id).parent = None;
        Ok(self.subtree_size(id))
    }

    /// Check whether a node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            count += 1;
            stack.extend_from_slice(self.children(current));
        }
        count
    }

    /// Attached node ids, every node after all of its descendants.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.children(id).iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Attached node ids, every node before its descendants.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Statistics for the attached part of the tree.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            if id != self.root {
                if node.is_file() {
                    stats.files += 1;
                } else {
                    stats.directories += 1;
                }
            }
            stats.max_depth = stats.max_depth.max(depth);
            for &child in &node.children {
                stack.push((child, depth + 1));
            }
        }
        stats
    }

    /// Number of attached file nodes.
    pub fn file_count(&self) -> u64 {
        self.stats().files
    }

    /// Number of attached directory nodes below the root.
    pub fn dir_count(&self) -> u64 {
        self.stats().directories
    }

    /// Verify the invariants every other component relies on.
    ///
    /// Trees restored from a checkpoint go through this before use.
    pub fn validate(&self) -> Result<(), DirdupeError> {
        let len = self.nodes.len();
        if self.root.index() >= len {
            return Err(DirdupeError::structural("root id out of range"));
        }
        let root = self.node(self.root);
        if root.parent.is_some() || !root.is_dir() {
            return Err(DirdupeError::structural("root must be a parentless directory"));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(DirdupeError::structural(format!("node {} reachable twice", id.0)));
            }
            let node = self.node(id);
            if node.is_file() && !node.children.is_empty() {
                return Err(DirdupeError::structural(format!(
                    "file {} has children",
                    self.path_of(id).display()
                )));
            }

            let mut names = HashSet::new();
            for &child in &node.children {
                let Some(child_node) = self.get(child) else {
                    return Err(DirdupeError::structural(format!("child id {} out of range", child.0)));
                };
                if child_node.parent != Some(id) {
                    return Err(DirdupeError::structural(format!(
                        "node {} does not point back to its parent {}",
                        child.0, id.0
                    )));
                }
                if child_node.name.is_empty() || !names.insert(child_node.name.as_str()) {
                    return Err(DirdupeError::structural(format!(
                        "invalid or repeated name {:?} in {}",
                        child_node.name,
                        self.path_of(id).display()
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}
