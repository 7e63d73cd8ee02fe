//! Criteria tree for cohort queries
//!
//! This crate provides:
//! - Leaf criteria and group nodes sharing one id namespace
//! - The [`CriteriaTree`] with its single reserved root group
//! - Atomic mutation commands ([`TreeCommand`]) applied to a working copy
//! - The [`KindPolicy`] describing which criterion kinds are structural,
//!   episode-bearing, or restricted to identified populations
//!
//! The engine never reads into a leaf payload: criterion editors own their
//! schema, the tree only stores and arranges the records they hand over.
//!
//! # Example
//!
//! ```
//! use cohort_tree::{Combinator, CriteriaTree, NewLeaf, NodeId};
//! use serde_json::json;
//!
//! let mut tree = CriteriaTree::new();
//! let leaf = tree.add_leaf(NodeId::ROOT, NewLeaf::new("Patient", json!({"gender": "f"}))).unwrap();
//! let group = tree.add_group(NodeId::ROOT, Combinator::Any, true).unwrap();
//!
//! assert_eq!(leaf, NodeId::new(1));
//! assert_eq!(group, NodeId::new(2));
//! assert_eq!(tree.cleanup_empty_groups(), vec![group]);
//! ```

pub mod command;
pub mod error;
pub mod kinds;
pub mod node;
pub mod tree;

pub use command::{CommandOutcome, TreeCommand};
pub use error::{TreeError, TreeResult};
pub use kinds::{AccessLevel, KindPolicy};
pub use node::{
    Combinator, CriterionKind, GroupNode, LeafCriterion, NewLeaf, NodeId, NodeRef,
    ThresholdComparator,
};
pub use tree::CriteriaTree;
