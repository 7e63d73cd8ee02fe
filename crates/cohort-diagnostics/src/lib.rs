//! Cohort query diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every
//! cohort crate: structured error codes, diagnostic records for the view
//! layer, and the umbrella [`CohortError`] that domain errors convert into.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for cohort operations
pub type Result<T> = std::result::Result<T, CohortError>;
