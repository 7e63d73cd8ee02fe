//! In-memory count service for editor tests

use async_trait::async_trait;
use cohort::compiler::{CompiledQuery, Fingerprint, PopulationScope};
use cohort::jobs::{BackendStatus, CountService, JobId, TransportError};
use cohort::{CohortEditor, EngineConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Answers status requests from a queue, `Pending` once it runs dry
#[derive(Default)]
pub struct StubCountService {
    statuses: Mutex<VecDeque<Result<BackendStatus, TransportError>>>,
    submitted: Mutex<Vec<(Fingerprint, PopulationScope)>>,
    aborted: Mutex<Vec<JobId>>,
}

impl StubCountService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_status(&self, status: Result<BackendStatus, TransportError>) {
        self.statuses.lock().push_back(status);
    }

    pub fn finish_next(&self, count: u64) {
        self.push_status(Ok(BackendStatus::Finished { count }));
    }

    pub fn submitted(&self) -> Vec<(Fingerprint, PopulationScope)> {
        self.submitted.lock().clone()
    }

    pub fn aborted(&self) -> Vec<JobId> {
        self.aborted.lock().clone()
    }
}

#[async_trait]
impl CountService for StubCountService {
    async fn submit(
        &self,
        query: &CompiledQuery,
        scope: &PopulationScope,
    ) -> Result<JobId, TransportError> {
        let mut submitted = self.submitted.lock();
        submitted.push((query.fingerprint, scope.clone()));
        Ok(JobId::new(format!("job-{}", submitted.len())))
    }

    async fn status(&self, _job: &JobId) -> Result<BackendStatus, TransportError> {
        let scripted = self.statuses.lock().pop_front();
        scripted.unwrap_or(Ok(BackendStatus::Pending))
    }

    async fn abort(&self, job: &JobId) -> Result<(), TransportError> {
        self.aborted.lock().push(job.clone());
        Ok(())
    }
}

/// Editor with default settings over a fresh stub service
pub fn editor() -> (CohortEditor<StubCountService>, Arc<StubCountService>) {
    editor_with(EngineConfig::default())
}

pub fn editor_with(config: EngineConfig) -> (CohortEditor<StubCountService>, Arc<StubCountService>) {
    let service = StubCountService::new();
    let editor = CohortEditor::new(Arc::clone(&service), config).unwrap();
    (editor, service)
}
