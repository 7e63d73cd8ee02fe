//! Editing session
//!
//! [`CohortEditor`] ties the pieces together. Every edit runs against the
//! current snapshot, produces a new tree or constraint set, and is committed
//! to the history as a freshly compiled snapshot. Count jobs are requested
//! for the current snapshot and cancelled once the user moves to a snapshot
//! with a different query.

use crate::config::EngineConfig;
use cohort_compiler::{CompiledQuery, PopulationScope, QueryCompiler};
use cohort_diagnostics::{COH0010, COH0400, CohortError, Result};
use cohort_history::{Snapshot, SnapshotHistory};
use cohort_jobs::{CountJobController, CountService, JobSnapshot, JobState, JobTicket, PollOutcome};
use cohort_temporal::{
    ConstraintFamily, ConstraintKind, ConstraintResult, ConstraintSet, TemporalConstraint,
    TemporalDuration,
};
use cohort_tree::{Combinator, CriteriaTree, KindPolicy, NewLeaf, NodeId, TreeCommand};
use std::collections::BTreeSet;
use std::sync::Arc;

/// What an edit changed
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// Id allocated by the edit, if any
    pub created: Option<NodeId>,
    /// Node ids removed from the tree
    pub removed: Vec<NodeId>,
    /// Constraints the edit invalidated
    pub dropped_constraints: Vec<TemporalConstraint>,
    /// The snapshot now current
    pub snapshot: Arc<Snapshot>,
}

/// One user's cohort editing session
pub struct CohortEditor<S: ?Sized> {
    config: EngineConfig,
    history: SnapshotHistory,
    jobs: CountJobController<S>,
}

impl<S: CountService + ?Sized + 'static> CohortEditor<S> {
    /// Session over an empty tree and the default population
    pub fn new(service: Arc<S>, config: EngineConfig) -> Result<Self> {
        Self::with_scope(service, config, PopulationScope::default())
    }

    /// Session over an empty tree and `scope`
    pub fn with_scope(service: Arc<S>, config: EngineConfig, scope: PopulationScope) -> Result<Self> {
        let compiler = QueryCompiler::with_options(config.compiler.clone());
        let history = SnapshotHistory::new(compiler, config.history, scope.normalized())?;
        let jobs = CountJobController::new(service).with_polling(config.polling);
        Ok(Self {
            config,
            history,
            jobs,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn jobs(&self) -> &CountJobController<S> {
        &self.jobs
    }

    // Projections of the current snapshot

    pub fn current(&self) -> &Arc<Snapshot> {
        self.history.current()
    }

    pub fn tree(&self) -> &CriteriaTree {
        &self.current().tree
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.current().constraints
    }

    pub fn scope(&self) -> &PopulationScope {
        &self.current().scope
    }

    pub fn query(&self) -> &CompiledQuery {
        &self.current().query
    }

    /// Leaves a partial constraint of `family` may reference
    pub fn selectable_leaves(&self, family: ConstraintFamily) -> BTreeSet<NodeId> {
        cohort_temporal::selectable_leaves(self.tree(), family, &self.config.kinds)
    }

    /// Global constraint kinds of `family` the current tree admits
    pub fn available_global_kinds(&self, family: ConstraintFamily) -> Vec<ConstraintKind> {
        cohort_temporal::available_global_kinds(self.tree(), family)
    }

    /// Partial constraints adopting a global `family` constraint would discard
    pub fn preview_global_switch(&self, family: ConstraintFamily) -> Vec<TemporalConstraint> {
        self.constraints().preview_global_switch(family)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Most recent count job, live or not
    pub fn job(&self) -> Option<JobSnapshot> {
        self.jobs.current()
    }

    pub fn job_state(&self) -> JobState {
        self.jobs.state()
    }

    pub fn last_finished_job(&self) -> Option<JobSnapshot> {
        self.jobs.last_finished()
    }

    /// Whether the displayed count belongs to a different query
    pub fn is_outdated(&self) -> bool {
        self.jobs.is_outdated(&self.current().fingerprint())
    }

    // Tree edits

    /// Apply a tree command and commit the result
    ///
    /// Constraints the new tree invalidates are dropped before compiling.
    /// Population changes go through [`set_population`](Self::set_population)
    /// so the tree and the scope move together.
    pub fn apply(&mut self, command: TreeCommand) -> Result<EditOutcome> {
        if let TreeCommand::ApplyPopulationChange { .. } = command {
            return Err(CohortError::structural(
                COH0010,
                "Population changes must go through set_population",
                Vec::new(),
            ));
        }
        let current = Arc::clone(self.history.current());
        let outcome = command.apply(&current.tree, &self.config.kinds)?;
        outcome
            .tree
            .check_access(current.scope.access_level, &self.config.kinds)?;
        let mut constraints = current.constraints.clone();
        let dropped = constraints.prune(&outcome.tree, &self.config.kinds);
        if !dropped.is_empty() {
            log::debug!(
                "{} invalidated {} temporal constraints",
                command.name(),
                dropped.len()
            );
        }
        let snapshot = self.commit(outcome.tree, constraints, current.scope.clone())?;
        Ok(EditOutcome {
            created: outcome.created,
            removed: outcome.removed,
            dropped_constraints: dropped,
            snapshot,
        })
    }

    pub fn add_leaf(&mut self, parent: NodeId, leaf: NewLeaf) -> Result<NodeId> {
        let outcome = self.apply(TreeCommand::AddLeaf { parent, leaf })?;
        created_id(&outcome)
    }

    pub fn add_group(
        &mut self,
        parent: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    ) -> Result<NodeId> {
        let outcome = self.apply(TreeCommand::AddGroup {
            parent,
            combinator,
            is_inclusive,
        })?;
        created_id(&outcome)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<EditOutcome> {
        self.apply(TreeCommand::RemoveNode { id })
    }

    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, position: usize) -> Result<EditOutcome> {
        self.apply(TreeCommand::Reparent {
            id,
            new_parent,
            position,
        })
    }

    pub fn cleanup_empty_groups(&mut self) -> Result<EditOutcome> {
        self.apply(TreeCommand::CleanupEmptyGroups)
    }

    pub fn replace_leaf(&mut self, id: NodeId, leaf: NewLeaf) -> Result<EditOutcome> {
        self.apply(TreeCommand::ReplaceLeaf { id, leaf })
    }

    pub fn duplicate_leaf(&mut self, id: NodeId) -> Result<NodeId> {
        let outcome = self.apply(TreeCommand::DuplicateLeaf { id })?;
        created_id(&outcome)
    }

    pub fn update_group(
        &mut self,
        id: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    ) -> Result<EditOutcome> {
        self.apply(TreeCommand::UpdateGroup {
            id,
            combinator,
            is_inclusive,
        })
    }

    /// Switch the population the query runs against
    ///
    /// Moving to a more restrictive access level removes the criteria that
    /// need identified data.
    pub fn set_population(&mut self, scope: PopulationScope) -> Result<EditOutcome> {
        let scope = scope.normalized();
        let current = Arc::clone(self.history.current());
        if scope == current.scope {
            return Ok(EditOutcome {
                created: None,
                removed: Vec::new(),
                dropped_constraints: Vec::new(),
                snapshot: current,
            });
        }

        let command = TreeCommand::ApplyPopulationChange {
            previous: current.scope.access_level,
            next: scope.access_level,
        };
        let outcome = command.apply(&current.tree, &self.config.kinds)?;
        let mut constraints = current.constraints.clone();
        let dropped = constraints.prune(&outcome.tree, &self.config.kinds);
        let snapshot = self.commit(outcome.tree, constraints, scope)?;
        Ok(EditOutcome {
            created: None,
            removed: outcome.removed,
            dropped_constraints: dropped,
            snapshot,
        })
    }

    // Constraint edits

    /// Replace every `family` constraint with one global constraint
    ///
    /// Returns the partial constraints that were discarded; see
    /// [`preview_global_switch`](Self::preview_global_switch).
    pub fn adopt_global_constraint(
        &mut self,
        family: ConstraintFamily,
        kind: ConstraintKind,
    ) -> Result<Vec<TemporalConstraint>> {
        self.edit_constraints(|set, tree, policy| set.adopt_global(tree, family, kind, policy))
    }

    pub fn adopt_partial_constraint(
        &mut self,
        first: NodeId,
        second: NodeId,
        kind: ConstraintKind,
    ) -> Result<()> {
        self.edit_constraints(|set, tree, policy| set.adopt_partial(tree, first, second, kind, policy))
    }

    /// Require `before` to happen before `after`
    pub fn adopt_ordering(
        &mut self,
        before: NodeId,
        after: NodeId,
        min_duration: Option<TemporalDuration>,
        max_duration: Option<TemporalDuration>,
    ) -> Result<()> {
        self.edit_constraints(|set, tree, policy| {
            set.adopt_ordering(tree, before, after, min_duration, max_duration, policy)
        })
    }

    pub fn remove_constraint(&mut self, index: usize) -> Result<TemporalConstraint> {
        self.edit_constraints(|set, _, _| set.remove(index))
    }

    // History

    pub fn undo(&mut self) -> Result<Arc<Snapshot>> {
        let snapshot = self.history.undo()?;
        self.settle_job();
        Ok(snapshot)
    }

    pub fn redo(&mut self) -> Result<Arc<Snapshot>> {
        let snapshot = self.history.redo()?;
        self.settle_job();
        Ok(snapshot)
    }

    /// Start over from an empty tree, keeping the population
    pub fn reset(&mut self) -> Result<Arc<Snapshot>> {
        let scope = self.scope().clone();
        let snapshot = self.history.reset(scope)?;
        self.settle_job();
        Ok(snapshot)
    }

    // Count jobs

    /// Submit the current query for counting
    ///
    /// Any previous job is cancelled. The ticket is recorded on the current
    /// snapshot.
    pub async fn request_count(&mut self) -> Result<JobTicket> {
        let current = Arc::clone(self.history.current());
        let ticket = self.jobs.submit(&current.query, &current.scope).await?;
        self.history.attach_count_job(ticket);
        log::info!(
            "requested count {} for snapshot {} ({})",
            ticket,
            current.sequence,
            current.fingerprint().short()
        );
        Ok(ticket)
    }

    /// Poll the live job once
    pub async fn poll_count(&self) -> PollOutcome {
        self.jobs.poll().await
    }

    /// Stop tracking the live job without telling the backend
    pub fn cancel_count(&self) -> bool {
        self.jobs.cancel()
    }

    /// Cancel the live job and ask the backend to abort it
    pub async fn abort_count(&self) -> Result<()> {
        Ok(self.jobs.abort().await?)
    }

    fn edit_constraints<T>(
        &mut self,
        edit: impl FnOnce(&mut ConstraintSet, &CriteriaTree, &KindPolicy) -> ConstraintResult<T>,
    ) -> Result<T> {
        let current = Arc::clone(self.history.current());
        let mut constraints = current.constraints.clone();
        let value = edit(&mut constraints, &current.tree, &self.config.kinds)?;
        self.commit(current.tree.clone(), constraints, current.scope.clone())?;
        Ok(value)
    }

    fn commit(
        &mut self,
        tree: CriteriaTree,
        constraints: ConstraintSet,
        scope: PopulationScope,
    ) -> Result<Arc<Snapshot>> {
        let snapshot = self.history.build(tree, constraints, scope)?;
        self.settle_job();
        Ok(snapshot)
    }

    /// Cancel the live job once the current query no longer matches it
    fn settle_job(&self) {
        let current = self.current().fingerprint();
        if let Some(in_flight) = self.jobs.in_flight_fingerprint()
            && in_flight != current
            && self.jobs.cancel()
        {
            log::info!(
                "cancelled count job for {}: current query is {}",
                in_flight.short(),
                current.short()
            );
        }
    }
}

fn created_id(outcome: &EditOutcome) -> Result<NodeId> {
    outcome
        .created
        .ok_or_else(|| CohortError::system(COH0400, "Command did not allocate a node id"))
}
