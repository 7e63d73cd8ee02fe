//! Job errors

use crate::service::TransportError;
use crate::state::{JobSnapshot, JobState, JobTicket};
use cohort_diagnostics::{COH0300, COH0301, COH0302, COH0303, CohortError, ErrorCode};
use thiserror::Error;

/// Count job failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Count computation failed: {reason}")]
    Failed { reason: String },

    #[error("Count service unreachable: {message}")]
    Transport { message: String },

    #[error("No active count job")]
    NoActiveJob,

    #[error("Count job {ticket} was superseded before the service answered")]
    Superseded { ticket: JobTicket },
}

impl JobError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Failed { .. } => COH0300,
            Self::Transport { .. } => COH0301,
            Self::NoActiveJob => COH0302,
            Self::Superseded { .. } => COH0303,
        }
    }

    /// Error a terminal job reports to the view layer
    pub fn from_snapshot(job: &JobSnapshot) -> Option<Self> {
        match &job.state {
            JobState::Failed { reason } => Some(Self::Failed {
                reason: reason.clone(),
            }),
            JobState::Error { message } => Some(Self::Transport {
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

impl From<TransportError> for JobError {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<JobError> for CohortError {
    fn from(err: JobError) -> Self {
        CohortError::job(err.code(), err.to_string())
    }
}
