//! Structural errors raised by tree mutations

use crate::node::{CriterionKind, NodeId};
use cohort_diagnostics::{
    COH0001, COH0002, COH0003, COH0004, COH0005, COH0006, COH0007, COH0008, COH0009, CohortError,
    ErrorCode,
};
use thiserror::Error;

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that reject a tree mutation; the tree is left unchanged
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The parent id is not in the tree
    #[error("Unknown parent group: {id}")]
    UnknownParent { id: NodeId },

    /// The target id names a leaf where a group was required
    #[error("Node {id} is not a group")]
    NotAGroup { id: NodeId },

    /// The root group is permanent
    #[error("The root group cannot be removed")]
    RootRemovalForbidden,

    /// Moving `id` under `parent` would create a cycle
    #[error("Cannot move node {id} under {parent}: {parent} is {id} or one of its descendants")]
    CyclicReference { id: NodeId, parent: NodeId },

    /// The id is not in the tree
    #[error("Unknown node: {id}")]
    UnknownNode { id: NodeId },

    /// The target id names a group where a leaf was required
    #[error("Node {id} is not a leaf criterion")]
    NotALeaf { id: NodeId },

    /// N-among-M groups need a positive threshold
    #[error("Invalid N-among-M threshold: {threshold}")]
    InvalidThreshold { threshold: u32 },

    /// A decoded tree breaks the single-parent, acyclic shape
    #[error("Malformed tree: {reason}")]
    MalformedTree { reason: String },

    /// The population only grants de-identified data
    #[error("Criterion {id} of kind '{kind}' requires identified data")]
    IdentifiedDataRequired { id: NodeId, kind: CriterionKind },
}

impl TreeError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownParent { .. } => COH0001,
            Self::NotAGroup { .. } => COH0002,
            Self::RootRemovalForbidden => COH0003,
            Self::CyclicReference { .. } => COH0004,
            Self::UnknownNode { .. } => COH0005,
            Self::NotALeaf { .. } => COH0006,
            Self::InvalidThreshold { .. } => COH0007,
            Self::MalformedTree { .. } => COH0008,
            Self::IdentifiedDataRequired { .. } => COH0009,
        }
    }

    /// Nodes named by the error
    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Self::UnknownParent { id }
            | Self::NotAGroup { id }
            | Self::UnknownNode { id }
            | Self::NotALeaf { id }
            | Self::IdentifiedDataRequired { id, .. } => vec![*id],
            Self::CyclicReference { id, parent } => vec![*id, *parent],
            Self::RootRemovalForbidden => vec![NodeId::ROOT],
            Self::InvalidThreshold { .. } | Self::MalformedTree { .. } => Vec::new(),
        }
    }
}

impl From<TreeError> for CohortError {
    fn from(err: TreeError) -> Self {
        let nodes = err.nodes().into_iter().map(NodeId::get).collect();
        CohortError::structural(err.code(), err.to_string(), nodes)
    }
}
