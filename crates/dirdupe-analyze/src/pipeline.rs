//! Running the passes in order, with optional checkpoints between them.

use std::path::{Path, PathBuf};

use dirdupe_core::{
    AnalysisWarning, AnalyzeConfig, Checkpoint, DirectoryOracle, DirdupeError, PathTree,
    ProgressTracker, Stage,
};

use crate::classify::{ClassifyStats, Classifier};
use crate::fingerprint::{FingerprintStats, fingerprint_tree};
use crate::report::DuplicateDirReport;
use crate::resolve::resolve;

/// Outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Duplicate sets and all warnings.
    pub report: DuplicateDirReport,
    /// The fingerprinted tree.
    pub tree: PathTree,
    /// Stage the run started from.
    pub started_at: Stage,
    /// Classification counters, if classification ran.
    pub classify: Option<ClassifyStats>,
    /// Fingerprint counters, if fingerprinting ran.
    pub fingerprint: Option<FingerprintStats>,
}

/// Drives classification, fingerprinting and resolution.
pub struct Analyzer<O> {
    classifier: Classifier<O>,
    checkpoint: Option<PathBuf>,
}

impl<O: DirectoryOracle> Analyzer<O> {
    /// Create an analyzer without checkpoints.
    pub fn new(oracle: O) -> Self {
        Self {
            classifier: Classifier::new(oracle),
            checkpoint: None,
        }
    }

    /// Create an analyzer honouring `threads` and `checkpoint` from `config`.
    pub fn from_config(oracle: O, config: &AnalyzeConfig) -> Self {
        Self {
            classifier: Classifier::new(oracle).with_threads(config.threads),
            checkpoint: config.checkpoint.clone(),
        }
    }

    /// Save state to `path` after every pass.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    /// Where checkpoints are written, if anywhere.
    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }

    /// Analyze a freshly built tree.
    pub fn run(
        &self,
        tree: PathTree,
        warnings: Vec<AnalysisWarning>,
        progress: &mut ProgressTracker,
    ) -> Result<Analysis, DirdupeError> {
        self.save(Stage::Built, &tree, &warnings)?;
        self.run_from(Stage::Built, tree, warnings, progress)
    }

    /// Continue from a saved checkpoint, skipping the passes it already covers.
    pub fn resume(&self, checkpoint: Checkpoint, progress: &mut ProgressTracker) -> Result<Analysis, DirdupeError> {
        tracing::info!(
            stage = ?checkpoint.stage,
            files = checkpoint.file_count,
            folders = checkpoint.folder_count,
            "resuming from checkpoint"
        );
        self.run_from(checkpoint.stage, checkpoint.tree, checkpoint.warnings, progress)
    }

    fn run_from(
        &self,
        stage: Stage,
        mut tree: PathTree,
        mut warnings: Vec<AnalysisWarning>,
        progress: &mut ProgressTracker,
    ) -> Result<Analysis, DirdupeError> {
        let mut classify = None;
        if stage < Stage::Classified {
            let classified = self.classifier.classify(&mut tree, progress)?;
            warnings.extend(classified.warnings);
            classify = Some(classified.stats);
            self.save(Stage::Classified, &tree, &warnings)?;
        }

        let mut fingerprint = None;
        if stage < Stage::Fingerprinted {
            fingerprint = Some(fingerprint_tree(&mut tree, progress)?);
            self.save(Stage::Fingerprinted, &tree, &warnings)?;
        }

        let mut report = resolve(&tree, progress)?;
        report.warnings = warnings;

        Ok(Analysis {
            report,
            tree,
            started_at: stage,
            classify,
            fingerprint,
        })
    }

    fn save(&self, stage: Stage, tree: &PathTree, warnings: &[AnalysisWarning]) -> Result<(), DirdupeError> {
        let Some(path) = &self.checkpoint else {
            return Ok(());
        };
        Checkpoint::new(stage, tree.clone(), warnings.to_vec()).save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirdupe_core::{EntryNames, GroupId, PathNode};
    use tempfile::TempDir;

    /// Lists every known directory with exactly its tree children.
    struct Mirror(PathTree);

    impl DirectoryOracle for Mirror {
        fn list_entries(&self, path: &Path) -> Result<EntryNames, DirdupeError> {
            let id = self.0.find(path).ok_or_else(|| DirdupeError::NotFound {
                path: path.to_path_buf(),
            })?;
            Ok(self.0.children(id).iter().map(|&c| self.0.node(c).name.clone()).collect())
        }
    }

    fn pair_tree() -> PathTree {
        let mut tree = PathTree::new();
        let root = tree.root();
        for dir in ["a", "b"] {
            let d = tree.add_child(root, PathNode::new_directory(dir)).unwrap();
            tree.add_child(d, PathNode::new_file("x", GroupId::new(0))).unwrap();
            tree.add_child(d, PathNode::new_file("y", GroupId::new(1))).unwrap();
        }
        tree
    }

    #[test]
    fn test_full_run() {
        let tree = pair_tree();
        let analyzer = Analyzer::new(Mirror(tree.clone()));
        let analysis = analyzer.run(tree, Vec::new(), &mut ProgressTracker::new()).unwrap();

        assert_eq!(analysis.started_at, Stage::Built);
        assert!(analysis.classify.is_some());
        assert_eq!(analysis.report.sets.len(), 1);
    }

    #[test]
    fn test_checkpoint_written_and_resumable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        let tree = pair_tree();

        let analyzer = Analyzer::new(Mirror(tree.clone())).with_checkpoint(&path);
        let first = analyzer.run(tree, Vec::new(), &mut ProgressTracker::new()).unwrap();

        let checkpoint = Checkpoint::load(&path).unwrap();
        assert_eq!(checkpoint.stage, Stage::Fingerprinted);

        let second = analyzer.resume(checkpoint, &mut ProgressTracker::new()).unwrap();
        assert!(second.classify.is_none());
        assert!(second.fingerprint.is_none());
        assert_eq!(first.report.to_text(), second.report.to_text());
    }
}
