//! Criterion kind policy and population access levels
//!
//! The engine treats criterion kinds as opaque tags. Which kinds carry no
//! clinical event, which belong to episode-bearing domains, and which need
//! identified patient data is policy owned by the host and the criterion
//! editors; it reaches the engine through [`KindPolicy`].

use crate::node::CriterionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Demographic criteria
pub const PATIENT: &str = "Patient";
/// Explicit patient identifier lists
pub const IPP_LIST: &str = "IPPList";
/// Pregnancy records
pub const PREGNANCY: &str = "Pregnancy";
/// Hospitalization records
pub const HOSPITALIZATION: &str = "Hospit";

/// Identification level of the source population
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessLevel {
    #[default]
    Identified,
    DeIdentified,
}

impl AccessLevel {
    /// True when moving from `previous` to `self` loses access to identified data
    pub fn is_more_restrictive_than(self, previous: AccessLevel) -> bool {
        matches!(
            (previous, self),
            (AccessLevel::Identified, AccessLevel::DeIdentified)
        )
    }

    pub fn grants_identified_data(self) -> bool {
        matches!(self, AccessLevel::Identified)
    }
}

/// Classification of criterion kinds supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KindPolicy {
    /// Kinds carrying no clinical event (never temporally constrained)
    pub structural_kinds: BTreeSet<CriterionKind>,
    /// Kinds eligible for episode-of-care constraints
    pub episode_kinds: BTreeSet<CriterionKind>,
    /// Kinds that require an identified population
    pub nominative_kinds: BTreeSet<CriterionKind>,
}

impl Default for KindPolicy {
    fn default() -> Self {
        Self {
            structural_kinds: [PATIENT, IPP_LIST].into_iter().map(CriterionKind::from).collect(),
            episode_kinds: [PREGNANCY, HOSPITALIZATION]
                .into_iter()
                .map(CriterionKind::from)
                .collect(),
            nominative_kinds: BTreeSet::new(),
        }
    }
}

impl KindPolicy {
    /// Policy with no classified kinds at all
    pub fn empty() -> Self {
        Self {
            structural_kinds: BTreeSet::new(),
            episode_kinds: BTreeSet::new(),
            nominative_kinds: BTreeSet::new(),
        }
    }

    pub fn with_structural(mut self, kind: impl Into<CriterionKind>) -> Self {
        self.structural_kinds.insert(kind.into());
        self
    }

    pub fn with_episode(mut self, kind: impl Into<CriterionKind>) -> Self {
        self.episode_kinds.insert(kind.into());
        self
    }

    pub fn with_nominative(mut self, kind: impl Into<CriterionKind>) -> Self {
        self.nominative_kinds.insert(kind.into());
        self
    }

    pub fn is_structural(&self, kind: &CriterionKind) -> bool {
        self.structural_kinds.contains(kind)
    }

    pub fn is_episode_bearing(&self, kind: &CriterionKind) -> bool {
        self.episode_kinds.contains(kind)
    }

    pub fn requires_identified_data(&self, kind: &CriterionKind) -> bool {
        self.nominative_kinds.contains(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restriction_direction() {
        assert!(AccessLevel::DeIdentified.is_more_restrictive_than(AccessLevel::Identified));
        assert!(!AccessLevel::Identified.is_more_restrictive_than(AccessLevel::DeIdentified));
        assert!(!AccessLevel::DeIdentified.is_more_restrictive_than(AccessLevel::DeIdentified));
        assert!(AccessLevel::Identified.grants_identified_data());
        assert!(!AccessLevel::DeIdentified.grants_identified_data());
    }

    #[test]
    fn test_default_policy() {
        let policy = KindPolicy::default();
        assert!(policy.is_structural(&CriterionKind::from(PATIENT)));
        assert!(policy.is_episode_bearing(&CriterionKind::from(PREGNANCY)));
        assert!(policy.nominative_kinds.is_empty());
    }

    #[test]
    fn test_partial_policy_deserializes_with_defaults() {
        let policy: KindPolicy =
            serde_json::from_str(r#"{"nominativeKinds": ["DocumentReference"]}"#).unwrap();
        assert!(policy.requires_identified_data(&CriterionKind::from("DocumentReference")));
        assert!(policy.is_structural(&CriterionKind::from(IPP_LIST)));
    }
}
