//! Engine configuration
//!
//! Every section is optional; missing fields fall back to their defaults.
//!
//! ```json
//! {
//!   "kinds": { "nominativeKinds": ["IPPList"] },
//!   "polling": { "intervalMs": 2000 },
//!   "history": { "maxSnapshots": 50 },
//!   "compiler": { "version": "v1.4", "pretty": false }
//! }
//! ```

use cohort_compiler::CompilerOptions;
use cohort_diagnostics::{COH0401, COH0402, COH0404, CohortError, ErrorCode};
use cohort_history::HistoryConfig;
use cohort_jobs::PollingConfig;
use cohort_tree::KindPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => COH0401,
            Self::Parse(_) => COH0402,
            Self::UnsupportedFormat(_) => COH0404,
        }
    }
}

impl From<ConfigError> for CohortError {
    fn from(err: ConfigError) -> Self {
        CohortError::system(err.code(), err.to_string())
    }
}

/// Settings for a [`CohortEditor`](crate::CohortEditor) session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Criterion kind classification
    pub kinds: KindPolicy,
    /// Count job poller
    pub polling: PollingConfig,
    pub history: HistoryConfig,
    pub compiler: CompilerOptions,
}

impl EngineConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Load a configuration file, choosing the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            Some(ext) => Err(ConfigError::UnsupportedFormat(format!(
                "Unsupported file extension: .{ext}. Expected .json"
            ))),
            None => Err(ConfigError::UnsupportedFormat(format!(
                "No file extension found in {}. Expected .json",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_tree::CriterionKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_json(
            r#"{
                "kinds": { "nominativeKinds": ["IPPList"] },
                "polling": { "intervalMs": 250 },
                "history": { "maxSnapshots": 10 }
            }"#,
        )
        .unwrap();

        assert!(
            config
                .kinds
                .nominative_kinds
                .contains(&CriterionKind::new("IPPList"))
        );
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.history.max_snapshots, Some(10));
        assert_eq!(config.compiler, CompilerOptions::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(err.code(), COH0402);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "compiler": {{ "version": "v2", "pretty": true }} }}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.compiler.version, "v2");
        assert!(config.compiler.pretty);
    }

    #[test]
    fn test_from_file_rejects_other_extensions() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.code(), COH0404);
        assert!(err.to_string().contains(".yaml"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let cohort: CohortError = err.into();
        assert_eq!(cohort.code(), COH0401);
    }
}
