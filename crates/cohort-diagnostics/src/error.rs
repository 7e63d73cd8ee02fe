//! Cohort error types

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the operation was rejected
    Error,
    /// Warning - the operation succeeded but needs attention
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message for the view layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context or help
    pub help: Option<String>,
    /// Related information
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            help: None,
            related: Vec::new(),
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            help: None,
            related: Vec::new(),
        }
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add related information
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        let nodes: Vec<String> = self
            .related
            .iter()
            .filter_map(|r| r.node)
            .map(|n| n.to_string())
            .collect();
        if !nodes.is_empty() {
            write!(f, " (nodes {})", nodes.join(", "))?;
        }
        Ok(())
    }
}

/// Related diagnostic information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedInfo {
    /// Tree node the information points at
    pub node: Option<u32>,
    /// Message explaining the relationship
    pub message: String,
}

impl RelatedInfo {
    /// Create new related info
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            node: None,
            message: message.into(),
        }
    }

    /// Point the information at a tree node
    pub fn with_node(mut self, node: u32) -> Self {
        self.node = Some(node);
        self
    }
}

/// Main cohort error type
///
/// Domain crates keep their own precise error enums and convert into this
/// one at the facade boundary.
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// Tree shape or node reference error
    #[error("{code}: {message}")]
    Structural {
        code: ErrorCode,
        message: String,
        nodes: Vec<u32>,
    },

    /// Temporal constraint validation error
    #[error("{code}: {message}")]
    Constraint {
        code: ErrorCode,
        message: String,
        nodes: Vec<u32>,
    },

    /// Undo/redo cursor error (non-fatal)
    #[error("{code}: {message}")]
    History { code: ErrorCode, message: String },

    /// Count job error
    #[error("{code}: {message}")]
    Job { code: ErrorCode, message: String },

    /// Configuration, serialization and internal errors
    #[error("{code}: {message}")]
    System { code: ErrorCode, message: String },
}

impl CohortError {
    /// Create a structural error
    pub fn structural(code: ErrorCode, message: impl Into<String>, nodes: Vec<u32>) -> Self {
        Self::Structural {
            code,
            message: message.into(),
            nodes,
        }
    }

    /// Create a constraint error
    pub fn constraint(code: ErrorCode, message: impl Into<String>, nodes: Vec<u32>) -> Self {
        Self::Constraint {
            code,
            message: message.into(),
            nodes,
        }
    }

    /// Create a history error
    pub fn history(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::History {
            code,
            message: message.into(),
        }
    }

    /// Create a job error
    pub fn job(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Job {
            code,
            message: message.into(),
        }
    }

    /// Create a system error
    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Structural { code, .. } => *code,
            Self::Constraint { code, .. } => *code,
            Self::History { code, .. } => *code,
            Self::Job { code, .. } => *code,
            Self::System { code, .. } => *code,
        }
    }

    /// History errors are reported as no-ops rather than failures
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::History { .. })
    }

    /// Tree nodes involved in the error
    pub fn nodes(&self) -> &[u32] {
        match self {
            Self::Structural { nodes, .. } | Self::Constraint { nodes, .. } => nodes,
            _ => &[],
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Structural { code, message, nodes } | Self::Constraint { code, message, nodes } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(help) = code.info().help {
                    diag = diag.with_help(help);
                }
                for node in nodes {
                    diag = diag.with_related(RelatedInfo::new("involved node").with_node(*node));
                }
                diag
            }
            Self::History { code, message } => Diagnostic::warning(*code, message.clone()),
            Self::Job { code, message } | Self::System { code, message } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(help) = code.info().help {
                    diag = diag.with_help(help);
                }
                diag
            }
        }
    }
}
