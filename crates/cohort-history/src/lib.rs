//! Snapshot history for cohort query edits
//!
//! Every successful edit is captured as an immutable [`Snapshot`] holding the
//! tree, the temporal constraints, the population scope and the compiled
//! query. [`SnapshotHistory`] keeps them in a linear log with a cursor, so
//! undo and redo restore whole values instead of reversing mutations.

pub mod error;
pub mod history;
pub mod snapshot;

pub use error::HistoryError;
pub use history::{HistoryConfig, SnapshotHistory};
pub use snapshot::Snapshot;
