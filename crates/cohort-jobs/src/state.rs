//! Count job states and read-only projections

use crate::service::JobId;
use chrono::{DateTime, Utc};
use cohort_compiler::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller-assigned handle of one submission
///
/// Tickets are local and monotonically increasing; snapshots record the
/// ticket of the job they requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobTicket(u64);

impl JobTicket {
    pub const fn new(ticket: u64) -> Self {
        Self(ticket)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a count job
///
/// `Uninitiated -> New -> Pending -> Finished | Failed`, with `Error`
/// reachable from `New` and `Pending` on transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum JobState {
    #[default]
    Uninitiated,
    New,
    Pending,
    Finished {
        count: u64,
    },
    /// The backend ran the query and rejected it
    Failed {
        reason: String,
    },
    /// The backend could not be reached
    Error {
        message: String,
    },
}

impl JobState {
    /// Still waiting on the backend
    pub fn is_active(&self) -> bool {
        matches!(self, Self::New | Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. } | Self::Error { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitiated => "uninitiated",
            Self::New => "new",
            Self::Pending => "pending",
            Self::Finished { .. } => "finished",
            Self::Failed { .. } => "failed",
            Self::Error { .. } => "error",
        }
    }
}

/// Read-only view of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub ticket: JobTicket,
    /// Backend id, absent until the submission is acknowledged
    pub job_id: Option<JobId>,
    pub state: JobState,
    /// Fingerprint of the query the job computes
    pub fingerprint: Fingerprint,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set once the job was cancelled; later responses are discarded
    pub cancelled: bool,
}

impl JobSnapshot {
    pub fn count(&self) -> Option<u64> {
        match self.state {
            JobState::Finished { count } => Some(count),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { reason } => Some(reason),
            JobState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Still polled: active and not cancelled
    pub fn is_live(&self) -> bool {
        !self.cancelled && self.state.is_active()
    }
}

/// True when no job has finished, or the last finished job computed a
/// different query than `current`
pub fn is_outdated(current: &Fingerprint, last_finished: Option<&JobSnapshot>) -> bool {
    last_finished.is_none_or(|job| job.fingerprint != *current)
}
