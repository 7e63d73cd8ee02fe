//! Constraint validation errors

use crate::constraint::ConstraintFamily;
use cohort_diagnostics::{
    COH0100, COH0101, COH0102, COH0103, COH0104, COH0105, COH0106, COH0107, COH0108, COH0109,
    CohortError, ErrorCode,
};
use cohort_tree::NodeId;
use thiserror::Error;

/// Result type for constraint operations
pub type ConstraintResult<T> = Result<T, ConstraintError>;

/// Reasons a constraint set is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Constraint references unknown criterion {id}")]
    UnknownCriteriaReference { id: NodeId },

    #[error("Criterion {id} cannot take part in a {family} constraint")]
    IneligibleCriteriaReference { id: NodeId, family: ConstraintFamily },

    #[error("More than one global {family} constraint")]
    ConflictingGlobalConstraint { family: ConstraintFamily },

    #[error("Global '{kind}' constraint is unavailable when the root group is not AND")]
    GlobalConstraintUnavailable { kind: &'static str },

    #[error("Chronological ordering {before} -> {after} already exists")]
    DuplicateChronologicalOrdering { before: NodeId, after: NodeId },

    #[error("Constraint needs {required} distinct criteria, found {found}")]
    InsufficientCriteria { required: usize, found: usize },

    #[error("Minimum duration exceeds maximum duration")]
    InvalidDurationRange,

    #[error("Constraint kind '{kind}' does not belong to the {family} family")]
    FamilyMismatch { kind: &'static str, family: ConstraintFamily },

    #[error("No constraint at index {index} (set holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A partial constraint must name a constraint kind")]
    PartialWithoutKind,
}

impl ConstraintError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownCriteriaReference { .. } => COH0100,
            Self::IneligibleCriteriaReference { .. } => COH0101,
            Self::ConflictingGlobalConstraint { .. } => COH0102,
            Self::GlobalConstraintUnavailable { .. } => COH0103,
            Self::DuplicateChronologicalOrdering { .. } => COH0104,
            Self::InsufficientCriteria { .. } => COH0105,
            Self::InvalidDurationRange => COH0106,
            Self::FamilyMismatch { .. } => COH0107,
            Self::IndexOutOfRange { .. } => COH0108,
            Self::PartialWithoutKind => COH0109,
        }
    }

    fn nodes(&self) -> Vec<u32> {
        match self {
            Self::UnknownCriteriaReference { id } | Self::IneligibleCriteriaReference { id, .. } => {
                vec![id.get()]
            }
            Self::DuplicateChronologicalOrdering { before, after } => vec![before.get(), after.get()],
            _ => Vec::new(),
        }
    }
}

impl From<ConstraintError> for CohortError {
    fn from(err: ConstraintError) -> Self {
        CohortError::constraint(err.code(), err.to_string(), err.nodes())
    }
}
