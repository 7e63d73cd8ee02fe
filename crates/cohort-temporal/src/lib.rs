//! Temporal constraints between cohort criteria
//!
//! Constraints relate the timing or care context of criteria: same or
//! different encounter, same or different episode of care, and direct
//! chronological ordering with optional duration bounds. They come in two
//! families (stay and episode), each holding at most one global constraint
//! plus any number of partial ones.
//!
//! The engine answers two questions for the editor:
//! - which leaves may take part in a partial constraint ([`selectable_leaves`])
//! - whether a constraint set is consistent with a tree ([`validate`])

pub mod constraint;
pub mod engine;
pub mod error;
pub mod set;

pub use constraint::{
    ConstraintFamily, ConstraintKind, ConstraintTarget, TemporalConstraint, TemporalDuration,
};
pub use engine::{
    available_global_kinds, conjunctive_scope, global_available, selectable_leaves, validate,
    validate_constraint,
};
pub use error::{ConstraintError, ConstraintResult};
pub use set::ConstraintSet;
