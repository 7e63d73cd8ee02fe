//! Count service seam
//!
//! The count itself is computed by a remote engine. The controller only
//! needs to submit a compiled query, ask for the status of a job by the
//! opaque id the service returned, and optionally abort it.

use async_trait::async_trait;
use cohort_compiler::{CompiledQuery, PopulationScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque job identifier assigned by the count service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by the count service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BackendStatus {
    /// Accepted or running
    Pending,
    /// Computation finished with a patient count
    Finished { count: u64 },
    /// Computation ran and the backend rejected or errored the query
    Failed { reason: String },
}

/// The count service could not be reached or answered nonsense
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for the remote count computation service
#[async_trait]
pub trait CountService: Send + Sync {
    /// Start a count job for `query` over `scope`
    async fn submit(
        &self,
        query: &CompiledQuery,
        scope: &PopulationScope,
    ) -> Result<JobId, TransportError>;

    /// Current status of a job
    async fn status(&self, job: &JobId) -> Result<BackendStatus, TransportError>;

    /// Ask the service to stop computing a job
    ///
    /// Services without an abort endpoint keep the default no-op.
    async fn abort(&self, _job: &JobId) -> Result<(), TransportError> {
        Ok(())
    }
}
