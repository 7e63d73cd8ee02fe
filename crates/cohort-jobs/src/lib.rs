//! Count job controller for compiled cohort queries
//!
//! This crate provides:
//! - The [`CountService`] seam to the remote computation engine
//! - The job state machine and its read-only [`JobSnapshot`] projection
//! - [`CountJobController`], which submits, polls and cancels jobs and keeps
//!   the last finished job for staleness checks ([`is_outdated`])
//!
//! Cancellation is cooperative: a response that arrives after `cancel` or a
//! newer `submit` is discarded, never applied.

pub mod controller;
pub mod error;
pub mod service;
pub mod state;

pub use controller::{CountJobController, DEFAULT_POLL_INTERVAL_MS, PollOutcome, PollingConfig};
pub use error::JobError;
pub use service::{BackendStatus, CountService, JobId, TransportError};
pub use state::{JobSnapshot, JobState, JobTicket, is_outdated};
