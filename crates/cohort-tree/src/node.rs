//! Leaf criteria, group nodes and their identifiers

use crate::error::{TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier shared by leaves and groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// The reserved id of the root group
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Opaque clinical-domain tag of a leaf criterion
///
/// Only compared for equality (and ordered, so policies can hold sets of kinds).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionKind(String);

impl CriterionKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CriterionKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_string())
    }
}

impl From<String> for CriterionKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

/// How an N-among-M group compares the number of satisfied children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdComparator {
    #[default]
    AtLeast,
    AtMost,
    Exactly,
}

impl ThresholdComparator {
    /// Operator symbol for display
    pub fn symbol(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Exactly => "=",
        }
    }
}

/// Boolean rule a group applies to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Combinator {
    /// Every child must match
    All,
    /// At least one child must match
    Any,
    /// A threshold of children must match
    NAmongM {
        threshold: u32,
        #[serde(default)]
        comparator: ThresholdComparator,
    },
}

impl Combinator {
    /// N-among-M with the default `AtLeast` comparator
    pub fn at_least(threshold: u32) -> Self {
        Self::NAmongM {
            threshold,
            comparator: ThresholdComparator::AtLeast,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub(crate) fn validate(&self) -> TreeResult<()> {
        match self {
            Self::NAmongM { threshold: 0, .. } => Err(TreeError::InvalidThreshold { threshold: 0 }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Any => f.write_str("ANY"),
            Self::NAmongM {
                threshold,
                comparator,
            } => write!(f, "{} {threshold}", comparator.symbol()),
        }
    }
}

/// Atomic filter rule produced by a criterion editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafCriterion {
    pub id: NodeId,
    pub kind: CriterionKind,
    pub is_inclusive: bool,
    /// Domain-specific fields; passed through untouched
    pub payload: Value,
}

/// Leaf record before the engine assigns it an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeaf {
    pub kind: CriterionKind,
    pub is_inclusive: bool,
    pub payload: Value,
}

impl NewLeaf {
    /// Create an inclusive leaf record
    pub fn new(kind: impl Into<CriterionKind>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            is_inclusive: true,
            payload,
        }
    }

    /// Mark the record as an exclusion rule
    pub fn excluded(mut self) -> Self {
        self.is_inclusive = false;
        self
    }

    pub(crate) fn into_leaf(self, id: NodeId) -> LeafCriterion {
        LeafCriterion {
            id,
            kind: self.kind,
            is_inclusive: self.is_inclusive,
            payload: self.payload,
        }
    }
}

impl From<&LeafCriterion> for NewLeaf {
    fn from(leaf: &LeafCriterion) -> Self {
        Self {
            kind: leaf.kind.clone(),
            is_inclusive: leaf.is_inclusive,
            payload: leaf.payload.clone(),
        }
    }
}

/// Composite node combining its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub id: NodeId,
    pub combinator: Combinator,
    pub is_inclusive: bool,
    pub children: Vec<NodeId>,
}

impl GroupNode {
    pub(crate) fn new(id: NodeId, combinator: Combinator, is_inclusive: bool) -> Self {
        Self {
            id,
            combinator,
            is_inclusive,
            children: Vec::new(),
        }
    }
}

/// Borrowed view of a tree node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Leaf(&'a LeafCriterion),
    Group(&'a GroupNode),
}

impl NodeRef<'_> {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Leaf(leaf) => leaf.id,
            Self::Group(group) => group.id,
        }
    }

    pub fn is_inclusive(&self) -> bool {
        match self {
            Self::Leaf(leaf) => leaf.is_inclusive,
            Self::Group(group) => group.is_inclusive,
        }
    }
}
