//! Path tree node types.

use std::fmt;
use std::sync::LazyLock;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Key derivation context for the reserved non-duplicate fingerprint.
const SENTINEL_CONTEXT: &str = "dirdupe 2026-10-16 unique subtree sentinel";

static SENTINEL: LazyLock<Fingerprint> =
    LazyLock::new(|| Fingerprint(blake3::derive_key(SENTINEL_CONTEXT, &[])));

/// Index of a node inside a [`PathTree`](crate::PathTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Position of this node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a duplicate group as numbered by the upstream scanner listing.
///
/// Unique per group, not per file: every file reported in the same group
/// carries the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Create a new GroupId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// BLAKE3 digest summarizing a node or a whole subtree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create a new Fingerprint from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The reserved fingerprint assigned to subtrees that failed classification.
    ///
    /// Derived under its own key derivation context, so no file or directory
    /// fingerprint can ever equal it.
    pub fn sentinel() -> Self {
        *SENTINEL
    }

    /// Check whether this is the reserved non-duplicate fingerprint.
    pub fn is_sentinel(&self) -> bool {
        *self == *SENTINEL
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Get the fingerprint as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First 12 hex digits, for human-readable output.
    pub fn short_hex(&self) -> String {
        self.0[..6].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short_hex())
    }
}

/// Type of path tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A file reported by the scanner as a member of a duplicate group.
    File {
        /// Group the file was listed in.
        group: GroupId,
    },
    /// A directory, created implicitly while inserting file paths.
    Directory,
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. })
    }

    /// Duplicate group of a file node.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            NodeKind::File { group } => Some(*group),
            NodeKind::Directory => None,
        }
    }
}

/// A single file or directory in the path tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    /// Single path segment (not full path). Empty for the root.
    pub name: CompactString,

    /// Node type and group membership.
    pub kind: NodeKind,

    /// Back-reference to the containing directory. Not an ownership edge.
    pub parent: Option<NodeId>,

    /// Children owned by this node, in insertion order.
    pub children: Vec<NodeId>,

    /// Whether everything below this node is explained by duplicate groups.
    pub potential_duplicate: bool,

    /// Content fingerprint, set by the fingerprint pass.
    pub fingerprint: Option<Fingerprint>,
}

impl PathNode {
    /// Create a new file node.
    pub fn new_file(name: impl Into<CompactString>, group: GroupId) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File { group },
            parent: None,
            children: Vec::new(),
            potential_duplicate: true,
            fingerprint: None,
        }
    }

    /// Create a new directory node.
    pub fn new_directory(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory,
            parent: None,
            children: Vec::new(),
            potential_duplicate: true,
            fingerprint: None,
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}
