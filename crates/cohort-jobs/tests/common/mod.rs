//! Scripted count service for controller tests

use async_trait::async_trait;
use cohort_compiler::{CompiledQuery, Fingerprint, PopulationScope, QueryCompiler};
use cohort_jobs::{BackendStatus, CountService, JobId, TransportError};
use cohort_temporal::ConstraintSet;
use cohort_tree::{CriteriaTree, NewLeaf, NodeId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Count service answering from queues of canned responses
///
/// Unscripted submissions get sequential ids, unscripted status requests
/// answer `Pending`. Gates hold a request until the test releases it.
#[derive(Default)]
pub struct ScriptedCountService {
    submit_results: Mutex<VecDeque<Result<JobId, TransportError>>>,
    statuses: Mutex<VecDeque<Result<BackendStatus, TransportError>>>,
    submitted: Mutex<Vec<Fingerprint>>,
    aborted: Mutex<Vec<JobId>>,
    submit_gate: Mutex<Option<Arc<Notify>>>,
    status_gate: Mutex<Option<Arc<Notify>>>,
    status_calls: AtomicUsize,
}

impl ScriptedCountService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_status(&self, status: Result<BackendStatus, TransportError>) {
        self.statuses.lock().push_back(status);
    }

    pub fn push_submit(&self, result: Result<JobId, TransportError>) {
        self.submit_results.lock().push_back(result);
    }

    /// Hold every status request until the returned gate is notified
    pub fn hold_status(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.status_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every submission until the returned gate is notified
    pub fn hold_submit(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.submit_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Fingerprint> {
        self.submitted.lock().clone()
    }

    pub fn aborted(&self) -> Vec<JobId> {
        self.aborted.lock().clone()
    }
}

#[async_trait]
impl CountService for ScriptedCountService {
    async fn submit(
        &self,
        query: &CompiledQuery,
        _scope: &PopulationScope,
    ) -> Result<JobId, TransportError> {
        let gate = self.submit_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let position = {
            let mut submitted = self.submitted.lock();
            submitted.push(query.fingerprint);
            submitted.len()
        };
        let scripted = self.submit_results.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(JobId::new(format!("job-{position}"))))
    }

    async fn status(&self, _job: &JobId) -> Result<BackendStatus, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.status_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let scripted = self.statuses.lock().pop_front();
        scripted.unwrap_or(Ok(BackendStatus::Pending))
    }

    async fn abort(&self, job: &JobId) -> Result<(), TransportError> {
        self.aborted.lock().push(job.clone());
        Ok(())
    }
}

/// Compiled query whose single leaf carries `label`
pub fn query(label: &str) -> CompiledQuery {
    let mut tree = CriteriaTree::new();
    tree.add_leaf(NodeId::ROOT, NewLeaf::new("Condition", json!({ "label": label })))
        .unwrap();
    QueryCompiler::new()
        .compile(&tree, &ConstraintSet::new(), &PopulationScope::default())
        .unwrap()
}
