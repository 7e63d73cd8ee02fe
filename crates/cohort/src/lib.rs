//! Cohort query editing and execution engine
//!
//! This crate provides:
//! - A criteria tree of leaves and ALL/ANY/N-among-M groups
//! - Temporal constraints between criteria (same stay, ordering, episodes)
//! - Undo/redo over immutable snapshots
//! - A deterministic query compiler with a content fingerprint
//! - An asynchronous count job controller with staleness detection
//!
//! # Example
//!
//! ```ignore
//! use cohort::{CohortEditor, EngineConfig, NewLeaf, NodeId};
//! use serde_json::json;
//!
//! let mut editor = CohortEditor::new(service, EngineConfig::default())?;
//! editor.add_leaf(NodeId::ROOT, NewLeaf::new("Condition", json!({"code": "E11"})))?;
//! editor.request_count().await?;
//! ```

pub mod config;
pub mod editor;

// Re-export all public APIs from internal crates
pub use cohort_compiler as compiler;
pub use cohort_diagnostics as diagnostics;
pub use cohort_history as history;
pub use cohort_jobs as jobs;
pub use cohort_temporal as temporal;
pub use cohort_tree as tree;

// Convenience re-exports
pub use cohort_compiler::{CompiledQuery, Fingerprint, PopulationScope};
pub use cohort_diagnostics::{CohortError, Result};
pub use cohort_jobs::{CountService, JobState};
pub use cohort_temporal::{ConstraintFamily, ConstraintKind, TemporalConstraint};
pub use cohort_tree::{AccessLevel, Combinator, CriteriaTree, KindPolicy, NewLeaf, NodeId};
pub use config::{ConfigError, EngineConfig};
pub use editor::{CohortEditor, EditOutcome};
