//! Immutable editor snapshots

use chrono::{DateTime, Utc};
use cohort_compiler::{CompiledQuery, Fingerprint, PopulationScope};
use cohort_jobs::JobTicket;
use cohort_temporal::ConstraintSet;
use cohort_tree::CriteriaTree;
use serde::{Deserialize, Serialize};

/// One fully compiled state of the editor
///
/// Snapshots are never mutated once built. Recording a count job produces a
/// new snapshot value that replaces the old one in its history slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Build sequence number, increasing across the whole session
    pub sequence: u64,
    pub tree: CriteriaTree,
    pub constraints: ConstraintSet,
    pub scope: PopulationScope,
    pub query: CompiledQuery,
    /// Count job requested from this snapshot
    pub count_job: Option<JobTicket>,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn fingerprint(&self) -> Fingerprint {
        self.query.fingerprint
    }

    /// Copy of this snapshot that records `ticket`
    pub fn with_count_job(&self, ticket: JobTicket) -> Self {
        Self {
            count_job: Some(ticket),
            ..self.clone()
        }
    }
}
