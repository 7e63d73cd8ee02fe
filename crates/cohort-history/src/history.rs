//! Linear undo/redo log
//!
//! History is a sequence of snapshots with a cursor. Building truncates the
//! redo tail and appends; undo and redo only move the cursor. The empty
//! snapshot a history starts from is replaced by the first build, so it is
//! never an undo target.

use crate::error::HistoryError;
use crate::snapshot::Snapshot;
use chrono::Utc;
use cohort_compiler::{CompileError, PopulationScope, QueryCompiler};
use cohort_jobs::JobTicket;
use cohort_temporal::ConstraintSet;
use cohort_tree::CriteriaTree;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// History settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Keep at most this many snapshots, evicting the oldest first
    pub max_snapshots: Option<usize>,
}

/// Snapshot log with a movable cursor
#[derive(Debug)]
pub struct SnapshotHistory {
    snapshots: Vec<Arc<Snapshot>>,
    cursor: usize,
    next_sequence: u64,
    /// Only the untouched starting snapshot is held
    pristine: bool,
    compiler: QueryCompiler,
    config: HistoryConfig,
}

impl SnapshotHistory {
    /// History holding one snapshot of an empty tree
    pub fn new(
        compiler: QueryCompiler,
        config: HistoryConfig,
        scope: PopulationScope,
    ) -> Result<Self, CompileError> {
        let mut history = Self {
            snapshots: Vec::new(),
            cursor: 0,
            next_sequence: 0,
            pristine: true,
            compiler,
            config,
        };
        history.reset(scope)?;
        Ok(history)
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// The snapshot presented to the user
    pub fn current(&self) -> &Arc<Snapshot> {
        &self.snapshots[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.snapshots.iter()
    }

    /// Compile the inputs and append them as the newest snapshot
    ///
    /// Discards every snapshot after the cursor, or replaces the starting
    /// snapshot if nothing was built since [`reset`](Self::reset). Nothing
    /// changes when compilation fails.
    pub fn build(
        &mut self,
        tree: CriteriaTree,
        constraints: ConstraintSet,
        scope: PopulationScope,
    ) -> Result<Arc<Snapshot>, CompileError> {
        let query = self.compiler.compile(&tree, &constraints, &scope)?;
        let snapshot = Arc::new(Snapshot {
            sequence: self.next_sequence,
            tree,
            constraints,
            scope,
            query,
            count_job: None,
            created_at: Utc::now(),
        });
        self.next_sequence += 1;

        if self.pristine {
            self.pristine = false;
            self.snapshots = vec![Arc::clone(&snapshot)];
            self.cursor = 0;
            log::debug!("built snapshot {} over the starting snapshot", snapshot.sequence);
            return Ok(snapshot);
        }

        let discarded = self.snapshots.len().saturating_sub(self.cursor + 1);
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(Arc::clone(&snapshot));
        self.cursor = self.snapshots.len() - 1;
        self.evict();
        log::debug!(
            "built snapshot {} ({} redo snapshots discarded)",
            snapshot.sequence,
            discarded
        );
        Ok(snapshot)
    }

    /// Step back one snapshot
    pub fn undo(&mut self) -> Result<Arc<Snapshot>, HistoryError> {
        if !self.can_undo() {
            return Err(HistoryError::AtOldestSnapshot);
        }
        self.cursor -= 1;
        log::debug!("undo to snapshot {}", self.current().sequence);
        Ok(Arc::clone(self.current()))
    }

    /// Step forward one snapshot
    pub fn redo(&mut self) -> Result<Arc<Snapshot>, HistoryError> {
        if !self.can_redo() {
            return Err(HistoryError::AtNewestSnapshot);
        }
        self.cursor += 1;
        log::debug!("redo to snapshot {}", self.current().sequence);
        Ok(Arc::clone(self.current()))
    }

    /// Drop everything and start over from an empty tree
    pub fn reset(&mut self, scope: PopulationScope) -> Result<Arc<Snapshot>, CompileError> {
        let tree = CriteriaTree::new();
        let constraints = ConstraintSet::new();
        let query = self.compiler.compile(&tree, &constraints, &scope)?;
        let snapshot = Arc::new(Snapshot {
            sequence: self.next_sequence,
            tree,
            constraints,
            scope,
            query,
            count_job: None,
            created_at: Utc::now(),
        });
        self.next_sequence += 1;
        self.snapshots = vec![Arc::clone(&snapshot)];
        self.cursor = 0;
        self.pristine = true;
        log::debug!("history reset at snapshot {}", snapshot.sequence);
        Ok(snapshot)
    }

    /// Record the count job requested from the current snapshot
    pub fn attach_count_job(&mut self, ticket: JobTicket) -> Arc<Snapshot> {
        let updated = Arc::new(self.current().with_count_job(ticket));
        self.snapshots[self.cursor] = Arc::clone(&updated);
        self.pristine = false;
        updated
    }

    fn evict(&mut self) {
        let Some(max) = self.config.max_snapshots else {
            return;
        };
        let max = max.max(1);
        if self.snapshots.len() > max {
            let excess = self.snapshots.len() - max;
            let excess = excess.min(self.cursor);
            self.snapshots.drain(..excess);
            self.cursor -= excess;
            log::debug!("evicted {excess} oldest snapshots");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_tree::{NewLeaf, NodeId};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn history(config: HistoryConfig) -> SnapshotHistory {
        SnapshotHistory::new(QueryCompiler::new(), config, PopulationScope::default()).unwrap()
    }

    fn tree(label: &str) -> CriteriaTree {
        let mut tree = CriteriaTree::new();
        tree.add_leaf(NodeId::ROOT, NewLeaf::new("Condition", json!({ "label": label })))
            .unwrap();
        tree
    }

    fn build(history: &mut SnapshotHistory, label: &str) -> Arc<Snapshot> {
        history
            .build(tree(label), ConstraintSet::new(), PopulationScope::default())
            .unwrap()
    }

    #[test]
    fn test_starts_with_empty_snapshot() {
        let history = history(HistoryConfig::default());
        assert_eq!(history.len(), 1);
        assert!(history.current().tree.is_empty());
        assert!(history.current().query.document.matches_everything());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_eviction_keeps_current() {
        let mut history = history(HistoryConfig {
            max_snapshots: Some(3),
        });
        for label in ["a", "b", "c", "d", "e"] {
            build(&mut history, label);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.current().tree, tree("e"));
        let sequences: Vec<u64> = history.snapshots().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
    }

    #[rstest]
    #[case::unbounded(None, 5)]
    #[case::zero_keeps_current(Some(0), 1)]
    #[case::single(Some(1), 1)]
    #[case::above_len(Some(10), 5)]
    fn test_cap_bounds_length(#[case] max_snapshots: Option<usize>, #[case] expected: usize) {
        let mut history = history(HistoryConfig { max_snapshots });
        for label in ["a", "b", "c", "d", "e"] {
            build(&mut history, label);
        }
        assert_eq!(history.len(), expected);
        assert_eq!(history.current().tree, tree("e"));
    }

    #[test]
    fn test_attach_count_job_replaces_slot() {
        let mut history = history(HistoryConfig::default());
        let built = build(&mut history, "a");

        let updated = history.attach_count_job(JobTicket::new(4));

        assert_eq!(built.count_job, None);
        assert_eq!(updated.count_job, Some(JobTicket::new(4)));
        assert_eq!(updated.sequence, built.sequence);
        assert_eq!(history.current().count_job, Some(JobTicket::new(4)));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_first_build_replaces_starting_snapshot() {
        let mut history = history(HistoryConfig::default());
        let first = build(&mut history, "a");
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.current(), &first);

        build(&mut history, "b");
        build(&mut history, "c");
        assert_eq!(history.undo().unwrap().tree, tree("b"));
        assert_eq!(history.undo().unwrap().tree, tree("a"));
        assert_eq!(history.undo(), Err(HistoryError::AtOldestSnapshot));
    }

    #[test]
    fn test_counted_starting_snapshot_is_kept() {
        let mut history = history(HistoryConfig::default());
        history.attach_count_job(JobTicket::new(1));
        build(&mut history, "a");

        assert_eq!(history.len(), 2);
        assert!(history.undo().unwrap().tree.is_empty());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut history = history(HistoryConfig::default());
        build(&mut history, "a");
        build(&mut history, "b");
        history.undo().unwrap();

        history.reset(PopulationScope::default()).unwrap();

        assert_eq!(history.len(), 1);
        assert!(history.current().tree.is_empty());
        assert_eq!(history.undo(), Err(HistoryError::AtOldestSnapshot));
        assert_eq!(history.redo(), Err(HistoryError::AtNewestSnapshot));

        build(&mut history, "c");
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }
}
