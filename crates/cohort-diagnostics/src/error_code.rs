//! Cohort error codes following a structured numbering system
//!
//! Error code ranges:
//! - COH0001-COH0099: Structural errors (tree shape, node references)
//! - COH0100-COH0199: Constraint errors (temporal constraint validation)
//! - COH0200-COH0299: History errors (undo/redo cursor)
//! - COH0300-COH0399: Job errors (count computation)
//! - COH0400-COH0499: System errors (configuration, serialization)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a structural error (0001-0099)
    pub const fn is_structural_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a constraint error (0100-0199)
    pub const fn is_constraint_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a history error (0200-0299)
    pub const fn is_history_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a job error (0300-0399)
    pub const fn is_job_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COH{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Structural errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unknown parent group")
        .with_help("The parent id does not exist in the current tree"));
    map.insert(2, ErrorInfo::new("Target is not a group")
        .with_help("Children can only be attached to group nodes"));
    map.insert(3, ErrorInfo::new("The root group cannot be removed"));
    map.insert(4, ErrorInfo::new("Cyclic reference")
        .with_help("A group cannot be moved under itself or one of its descendants"));
    map.insert(5, ErrorInfo::new("Unknown node"));
    map.insert(6, ErrorInfo::new("Target is not a leaf criterion"));
    map.insert(7, ErrorInfo::new("Invalid group threshold")
        .with_help("An N-among-M threshold must be at least 1"));
    map.insert(8, ErrorInfo::new("Malformed tree")
        .with_help("Every node must be reachable from the root exactly once"));
    map.insert(9, ErrorInfo::new("Criterion requires identified data")
        .with_help("Switch the population to identified data before adding this criterion"));
    map.insert(10, ErrorInfo::new("Population change outside the population scope")
        .with_help("Change the population scope instead of applying the tree command directly"));

    // Constraint errors (0100-0199)
    map.insert(100, ErrorInfo::new("Unknown criteria reference")
        .with_help("The constraint names a criterion that is not in the tree"));
    map.insert(101, ErrorInfo::new("Ineligible criteria reference")
        .with_help("Only criteria reachable through AND groups and carrying a clinical event can be constrained"));
    map.insert(102, ErrorInfo::new("Conflicting global constraint"));
    map.insert(103, ErrorInfo::new("Global constraint unavailable")
        .with_help("Same-encounter and same-episode constraints are undefined when the root group is not AND"));
    map.insert(104, ErrorInfo::new("Duplicate chronological ordering"));
    map.insert(105, ErrorInfo::new("Insufficient criteria for a partial constraint"));
    map.insert(106, ErrorInfo::new("Invalid duration range")
        .with_help("The minimum duration must not exceed the maximum duration"));
    map.insert(107, ErrorInfo::new("Constraint kind does not belong to the requested family"));
    map.insert(108, ErrorInfo::new("Constraint index out of range"));
    map.insert(109, ErrorInfo::new("Partial constraint without a kind")
        .with_help("Only a global constraint may use the 'none' kind"));

    // History errors (0200-0299)
    map.insert(200, ErrorInfo::new("Already at the oldest snapshot"));
    map.insert(201, ErrorInfo::new("Already at the newest snapshot"));

    // Job errors (0300-0399)
    map.insert(300, ErrorInfo::new("Count computation failed")
        .with_help("The backend rejected the query; edit it or submit again"));
    map.insert(301, ErrorInfo::new("Transport error")
        .with_help("The count service could not be reached; retry the submission"));
    map.insert(302, ErrorInfo::new("No active count job"));
    map.insert(303, ErrorInfo::new("Count job superseded"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Serialization error"));
    map.insert(404, ErrorInfo::new("Unsupported format"));

    map
});

// Structural errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);
pub const COH0006: ErrorCode = ErrorCode::new(6);
pub const COH0007: ErrorCode = ErrorCode::new(7);
pub const COH0008: ErrorCode = ErrorCode::new(8);
pub const COH0009: ErrorCode = ErrorCode::new(9);
pub const COH0010: ErrorCode = ErrorCode::new(10);

// Constraint errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);
pub const COH0104: ErrorCode = ErrorCode::new(104);
pub const COH0105: ErrorCode = ErrorCode::new(105);
pub const COH0106: ErrorCode = ErrorCode::new(106);
pub const COH0107: ErrorCode = ErrorCode::new(107);
pub const COH0108: ErrorCode = ErrorCode::new(108);
pub const COH0109: ErrorCode = ErrorCode::new(109);

// History errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);

// Job errors
pub const COH0300: ErrorCode = ErrorCode::new(300);
pub const COH0301: ErrorCode = ErrorCode::new(301);
pub const COH0302: ErrorCode = ErrorCode::new(302);
pub const COH0303: ErrorCode = ErrorCode::new(303);

// System errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
pub const COH0403: ErrorCode = ErrorCode::new(403);
pub const COH0404: ErrorCode = ErrorCode::new(404);
