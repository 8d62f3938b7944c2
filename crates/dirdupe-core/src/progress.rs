//! Progress reporting for tree passes.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// The pass a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Reading the duplicate listing into the tree.
    Building,
    /// Checking directories against the live filesystem.
    Classifying,
    /// Computing subtree fingerprints.
    Fingerprinting,
    /// Extracting top-level duplicate sets.
    Resolving,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Building => "Building directory tree",
            Phase::Classifying => "Classifying directories",
            Phase::Fingerprinting => "Fingerprinting",
            Phase::Resolving => "Resolving duplicates",
        };
        f.write_str(name)
    }
}

/// Progress information during a pass.
#[derive(Debug, Clone)]
pub struct PassProgress {
    /// Pass being run.
    pub phase: Phase,
    /// Items handled so far.
    pub processed: u64,
    /// Items expected in total (0 if unknown).
    pub total: u64,
    /// Time elapsed since the pass started.
    pub elapsed: Duration,
    /// Whether the pass has completed.
    pub finished: bool,
}

impl PassProgress {
    /// Fraction of the pass completed, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            if self.finished { 1.0 } else { 0.0 }
        } else {
            (self.processed as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Progress context handed explicitly to every pass.
///
/// A pass calls [`start`](Self::start), then [`advance`](Self::advance) as
/// it goes, then [`finish`](Self::finish). Snapshots are broadcast to any
/// subscriber every `report_every` items and once at each start and finish.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: broadcast::Sender<PassProgress>,
    phase: Option<Phase>,
    start_time: Instant,
    processed: u64,
    total: u64,
    report_every: u64,
}

impl ProgressTracker {
    /// Create a tracker that reports every 500 items.
    pub fn new() -> Self {
        Self::with_interval(500)
    }

    /// Create a tracker with a custom reporting interval.
    pub fn with_interval(report_every: u64) -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            tx,
            phase: None,
            start_time: Instant::now(),
            processed: 0,
            total: 0,
            report_every: report_every.max(1),
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<PassProgress> {
        self.tx.subscribe()
    }

    /// Begin a pass over `total` items.
    ///
    /// A pass that is still running, because it returned early on an error,
    /// is finished first so subscribers never see two passes open at once.
    pub fn start(&mut self, phase: Phase, total: u64) {
        if let Some(abandoned) = self.finish() {
            tracing::debug!(
                phase = %abandoned.phase,
                processed = abandoned.processed,
                total = abandoned.total,
                "closing unfinished pass"
            );
        }
        self.phase = Some(phase);
        self.start_time = Instant::now();
        self.processed = 0;
        self.total = total;
        self.publish(false);
    }

    /// Record `n` more items as done.
    pub fn advance(&mut self, n: u64) {
        let before = self.processed / self.report_every;
        self.processed += n;
        if self.processed / self.report_every != before {
            self.publish(false);
        }
    }

    /// End the current pass and return its final snapshot.
    pub fn finish(&mut self) -> Option<PassProgress> {
        let snapshot = self.snapshot_with(true)?;
        // No subscribers is fine.
        let _ = self.tx.send(snapshot.clone());
        self.phase = None;
        Some(snapshot)
    }

    /// Current pass, if one is running.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Snapshot of the running pass.
    pub fn snapshot(&self) -> Option<PassProgress> {
        self.snapshot_with(false)
    }

    fn snapshot_with(&self, finished: bool) -> Option<PassProgress> {
        Some(PassProgress {
            phase: self.phase?,
            processed: self.processed,
            total: self.total,
            elapsed: self.start_time.elapsed(),
            finished,
        })
    }

    fn publish(&self, finished: bool) {
        if let Some(snapshot) = self.snapshot_with(finished) {
            let _ = self.tx.send(snapshot);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut tracker = ProgressTracker::with_interval(2);
        assert!(tracker.snapshot().is_none());

        tracker.start(Phase::Classifying, 4);
        tracker.advance(3);
        let snapshot = tracker.snapshot().unwrap();
        assert_eq!(snapshot.phase, Phase::Classifying);
        assert_eq!(snapshot.processed, 3);
        assert!((snapshot.fraction() - 0.75).abs() < f64::EPSILON);

        let done = tracker.finish().unwrap();
        assert!(done.finished);
        assert!(tracker.phase().is_none());
    }

    #[test]
    fn test_subscriber_sees_updates() {
        let mut tracker = ProgressTracker::with_interval(1);
        let mut rx = tracker.subscribe();

        tracker.start(Phase::Fingerprinting, 2);
        tracker.advance(1);
        tracker.advance(1);
        tracker.finish();

        let mut last = None;
        while let Ok(update) = rx.try_recv() {
            last = Some(update);
        }
        let last = last.unwrap();
        assert!(last.finished);
        assert_eq!(last.processed, 2);
    }

    #[test]
    fn test_start_closes_unfinished_pass() {
        let mut tracker = ProgressTracker::with_interval(100);
        let mut rx = tracker.subscribe();

        // Classifying bails out without calling finish.
        tracker.start(Phase::Classifying, 10);
        tracker.advance(3);
        tracker.start(Phase::Fingerprinting, 5);

        let updates: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let phases: Vec<_> = updates.iter().map(|u| (u.phase, u.finished)).collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Classifying, false),
                (Phase::Classifying, true),
                (Phase::Fingerprinting, false),
            ]
        );
        assert_eq!(updates[1].processed, 3);

        let snapshot = tracker.snapshot().unwrap();
        assert_eq!(snapshot.phase, Phase::Fingerprinting);
        assert_eq!(snapshot.processed, 0);
        assert_eq!(snapshot.total, 5);
    }

    #[test]
    fn test_empty_pass_fraction() {
        let mut tracker = ProgressTracker::new();
        tracker.start(Phase::Resolving, 0);
        assert_eq!(tracker.snapshot().unwrap().fraction(), 0.0);
        assert_eq!(tracker.finish().unwrap().fraction(), 1.0);
    }
}
