//! Saving and resuming intermediate analysis state.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisWarning, DirdupeError};
use crate::tree::PathTree;

/// Current version of the checkpoint file format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// How far the analysis got before the checkpoint was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Tree built from the listing.
    Built,
    /// Potential duplicates classified against the filesystem.
    Classified,
    /// Fingerprints computed.
    Fingerprinted,
}

/// Saved analysis state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version.
    pub version: u32,
    /// When the checkpoint was written.
    pub created_at: DateTime<Utc>,
    /// Last completed stage.
    pub stage: Stage,
    /// Attached file nodes in `tree`.
    pub file_count: u64,
    /// Attached directory nodes in `tree`, root excluded.
    pub folder_count: u64,
    /// The tree itself.
    pub tree: PathTree,
    /// Warnings collected so far.
    #[serde(default)]
    pub warnings: Vec<AnalysisWarning>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    checksum: String,
    checkpoint: &'a Checkpoint,
}

#[derive(Deserialize)]
struct Envelope {
    checksum: String,
    checkpoint: Checkpoint,
}

impl Checkpoint {
    /// Snapshot a tree at the given stage.
    pub fn new(stage: Stage, tree: PathTree, warnings: Vec<AnalysisWarning>) -> Self {
        let stats = tree.stats();
        Self {
            version: CHECKPOINT_VERSION,
            created_at: Utc::now(),
            stage,
            file_count: stats.files,
            folder_count: stats.directories,
            tree,
            warnings,
        }
    }

    /// Serialize with an integrity checksum.
    pub fn to_json(&self) -> Result<String, DirdupeError> {
        let payload = serde_json::to_string(self)?;
        let envelope = EnvelopeRef {
            checksum: blake3::hash(payload.as_bytes()).to_hex().to_string(),
            checkpoint: self,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Write the checkpoint, replacing any previous one atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DirdupeError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| DirdupeError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| DirdupeError::io(path, e))?;
        tracing::debug!(path = %path.display(), stage = ?self.stage, "checkpoint saved");
        Ok(())
    }

    /// Load and verify a checkpoint.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirdupeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DirdupeError::io(path, e))?;
        Self::from_json(&text, path)
    }

    /// Parse and verify checkpoint text. `origin` is used in error messages.
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, DirdupeError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| DirdupeError::Checkpoint {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        let checkpoint = envelope.checkpoint;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(DirdupeError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        // Must match the compact form used by to_json.
        let payload = serde_json::to_string(&checkpoint)?;
        if blake3::hash(payload.as_bytes()).to_hex().as_str() != envelope.checksum {
            return Err(DirdupeError::ChecksumMismatch {
                path: origin.to_path_buf(),
            });
        }

        checkpoint.tree.validate()?;
        let stats = checkpoint.tree.stats();
        if stats.files != checkpoint.file_count || stats.directories != checkpoint.folder_count {
            return Err(DirdupeError::Checkpoint {
                path: origin.to_path_buf(),
                message: format!(
                    "recorded {} files / {} folders but tree holds {} / {}",
                    checkpoint.file_count, checkpoint.folder_count, stats.files, stats.directories
                ),
            });
        }

        Ok(checkpoint)
    }
}
