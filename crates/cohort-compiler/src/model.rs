//! Query document structures
//!
//! The document is what the count service receives: the population scope,
//! the criteria tree with empty interior groups left out, and the temporal
//! constraints resolved against leaf ids.

use cohort_temporal::{ConstraintFamily, ConstraintKind, ConstraintTarget};
use cohort_tree::{AccessLevel, Combinator, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Document
// ============================================================================

/// Document type tag written into every request
pub const REQUEST_TYPE: &str = "request";

/// Compiled cohort query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDocument {
    /// Wire format version
    pub version: String,
    /// Document type, always [`REQUEST_TYPE`]
    #[serde(rename = "_type")]
    pub document_type: String,
    /// Population the query runs against
    pub scope: PopulationScope,
    /// Root group
    pub root: CompiledGroup,
    /// Temporal constraints, in canonical order
    #[serde(default)]
    pub temporal_constraints: Vec<CompiledConstraint>,
}

impl QueryDocument {
    /// Number of leaves in the compiled tree
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// True for the degenerate "match everything in scope" document
    pub fn matches_everything(&self) -> bool {
        self.root.children.is_empty()
    }
}

// ============================================================================
// Population scope
// ============================================================================

/// Population a query is evaluated against
///
/// Perimeter ids are opaque identifiers owned by the population selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationScope {
    #[serde(default)]
    pub perimeter_ids: Vec<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
}

impl PopulationScope {
    pub fn new(perimeter_ids: impl IntoIterator<Item = impl Into<String>>, access_level: AccessLevel) -> Self {
        Self {
            perimeter_ids: perimeter_ids.into_iter().map(Into::into).collect(),
            access_level,
        }
    }

    /// Sorted, deduplicated copy
    pub fn normalized(&self) -> Self {
        let mut perimeter_ids = self.perimeter_ids.clone();
        perimeter_ids.sort();
        perimeter_ids.dedup();
        Self {
            perimeter_ids,
            access_level: self.access_level,
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A node of the compiled tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "camelCase")]
pub enum CompiledNode {
    Group(CompiledGroup),
    Leaf(CompiledLeaf),
}

impl CompiledNode {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Group(group) => group.id,
            Self::Leaf(leaf) => leaf.id,
        }
    }
}

/// Compiled group with its non-empty children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledGroup {
    pub id: NodeId,
    pub combinator: Combinator,
    pub is_inclusive: bool,
    pub children: Vec<CompiledNode>,
}

impl CompiledGroup {
    fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                CompiledNode::Group(group) => group.leaf_count(),
                CompiledNode::Leaf(_) => 1,
            })
            .sum()
    }
}

/// Compiled leaf; the payload is passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledLeaf {
    pub id: NodeId,
    pub kind: String,
    pub is_inclusive: bool,
    pub payload: Value,
}

// ============================================================================
// Temporal constraints
// ============================================================================

/// Temporal constraint resolved against leaf ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledConstraint {
    pub family: ConstraintFamily,
    pub kind: ConstraintKind,
    /// `"all"` for global constraints, otherwise the leaf ids
    pub criteria: ConstraintTarget,
}
