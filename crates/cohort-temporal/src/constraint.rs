//! Temporal constraint model

use cohort_tree::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Context level a constraint relates criteria at
///
/// Stay-level and episode-level global constraints are tracked separately:
/// each family holds at most one global constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintFamily {
    /// Hospital stays / encounters
    Stay,
    /// Episodes of care (maternity and other episode-bearing domains)
    Episode,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => f.write_str("stay"),
            Self::Episode => f.write_str("episode"),
        }
    }
}

/// Calendar duration bound of a chronological ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporalDuration {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl TemporalDuration {
    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn months(months: u32) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    /// Length in minutes, counting 30-day months and 365-day years
    pub fn approximate_minutes(&self) -> u64 {
        u64::from(self.years) * 365 * 24 * 60
            + u64::from(self.months) * 30 * 24 * 60
            + u64::from(self.days) * 24 * 60
            + u64::from(self.hours) * 60
            + u64::from(self.minutes)
    }
}

/// What a temporal constraint requires of the criteria it names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConstraintKind {
    /// No constraint; only meaningful as a global placeholder
    None,
    SameEncounter,
    DifferentEncounter,
    SameEpisodeOfCare,
    DifferentEpisodeOfCare,
    /// The first criterion happens before the second, optionally within bounds
    DirectChronologicalOrdering {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_duration: Option<TemporalDuration>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_duration: Option<TemporalDuration>,
    },
}

impl ConstraintKind {
    /// Chronological ordering without duration bounds
    pub fn ordering() -> Self {
        Self::DirectChronologicalOrdering {
            min_duration: None,
            max_duration: None,
        }
    }

    /// Family this kind belongs to; `None` is family-neutral
    pub fn family(&self) -> Option<ConstraintFamily> {
        match self {
            Self::None => None,
            Self::SameEncounter | Self::DifferentEncounter | Self::DirectChronologicalOrdering { .. } => {
                Some(ConstraintFamily::Stay)
            }
            Self::SameEpisodeOfCare | Self::DifferentEpisodeOfCare => Some(ConstraintFamily::Episode),
        }
    }

    /// Kinds requiring every criterion to share one encounter or episode
    pub fn is_same_context(&self) -> bool {
        matches!(self, Self::SameEncounter | Self::SameEpisodeOfCare)
    }

    pub fn is_chronological(&self) -> bool {
        matches!(self, Self::DirectChronologicalOrdering { .. })
    }

    /// Wire name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SameEncounter => "sameEncounter",
            Self::DifferentEncounter => "differentEncounter",
            Self::SameEpisodeOfCare => "sameEpisodeOfCare",
            Self::DifferentEpisodeOfCare => "differentEpisodeOfCare",
            Self::DirectChronologicalOrdering { .. } => "directChronologicalOrdering",
        }
    }
}

/// Criteria a constraint applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintTarget {
    /// The whole tree
    All,
    /// An explicit list of leaves; ordered for chronological constraints
    Partial(Vec<NodeId>),
}

/// One temporal constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalConstraint {
    pub family: ConstraintFamily,
    pub kind: ConstraintKind,
    pub target: ConstraintTarget,
}

impl TemporalConstraint {
    /// Constraint over the whole tree
    pub fn global(family: ConstraintFamily, kind: ConstraintKind) -> Self {
        Self {
            family,
            kind,
            target: ConstraintTarget::All,
        }
    }

    /// Constraint over explicit leaves
    ///
    /// Unordered kinds get their ids sorted and deduplicated; chronological
    /// orderings keep the given order. The family is taken from the kind,
    /// falling back to `Stay` for the family-neutral `None`.
    pub fn partial(kind: ConstraintKind, ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut ids: Vec<NodeId> = ids.into_iter().collect();
        if !kind.is_chronological() {
            ids.sort_unstable();
            ids.dedup();
        }
        Self {
            family: kind.family().unwrap_or(ConstraintFamily::Stay),
            kind,
            target: ConstraintTarget::Partial(ids),
        }
    }

    /// Pairwise constraint between two leaves
    pub fn pair(kind: ConstraintKind, first: NodeId, second: NodeId) -> Self {
        Self::partial(kind, [first, second])
    }

    pub fn is_global(&self) -> bool {
        matches!(self.target, ConstraintTarget::All)
    }

    /// Leaves named by a partial constraint; empty for globals
    pub fn referenced_ids(&self) -> &[NodeId] {
        match &self.target {
            ConstraintTarget::All => &[],
            ConstraintTarget::Partial(ids) => ids,
        }
    }

    /// Ordered pair of a chronological constraint
    pub fn ordered_pair(&self) -> Option<(NodeId, NodeId)> {
        match (self.kind.is_chronological(), self.referenced_ids()) {
            (true, [first, second]) => Some((*first, *second)),
            _ => None,
        }
    }
}
