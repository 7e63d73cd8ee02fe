use cohort_diagnostics::{COH0200, COH0201, CohortError, ErrorCode};
use thiserror::Error;

/// Cursor moves past either end of the history
///
/// Both are reported as no-ops: the cursor does not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Nothing to undo: already at the oldest snapshot")]
    AtOldestSnapshot,

    #[error("Nothing to redo: already at the newest snapshot")]
    AtNewestSnapshot,
}

impl HistoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AtOldestSnapshot => COH0200,
            Self::AtNewestSnapshot => COH0201,
        }
    }
}

impl From<HistoryError> for CohortError {
    fn from(err: HistoryError) -> Self {
        CohortError::history(err.code(), err.to_string())
    }
}
