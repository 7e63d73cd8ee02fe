//! The constraint set stored next to a tree in each snapshot

use crate::constraint::{ConstraintFamily, ConstraintKind, TemporalConstraint, TemporalDuration};
use crate::engine;
use crate::error::{ConstraintError, ConstraintResult};
use cohort_tree::{CriteriaTree, KindPolicy, NodeId};
use serde::{Deserialize, Serialize};

/// Ordered list of temporal constraints
///
/// Every editing operation validates a candidate set against the tree and
/// only commits it when the whole set is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    constraints: Vec<TemporalConstraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemporalConstraint> {
        self.constraints.iter()
    }

    pub fn as_slice(&self) -> &[TemporalConstraint] {
        &self.constraints
    }

    pub fn get(&self, index: usize) -> Option<&TemporalConstraint> {
        self.constraints.get(index)
    }

    /// Global constraint of `family`, if any
    pub fn global(&self, family: ConstraintFamily) -> Option<&TemporalConstraint> {
        self.constraints
            .iter()
            .find(|c| c.is_global() && c.family == family)
    }

    /// Partial constraints of `family`
    pub fn partials(&self, family: ConstraintFamily) -> impl Iterator<Item = &TemporalConstraint> {
        self.constraints
            .iter()
            .filter(move |c| !c.is_global() && c.family == family)
    }

    /// Validate the whole set against `tree`
    pub fn validate(&self, tree: &CriteriaTree, policy: &KindPolicy) -> ConstraintResult<()> {
        engine::validate(tree, &self.constraints, policy)
    }

    /// Partial constraints a switch to a global `family` constraint discards
    pub fn preview_global_switch(&self, family: ConstraintFamily) -> Vec<TemporalConstraint> {
        self.partials(family).cloned().collect()
    }

    /// Replace every constraint of `family` with one global constraint
    ///
    /// Returns the discarded partial constraints. Callers present them as a
    /// destructive confirmation before calling this.
    pub fn adopt_global(
        &mut self,
        tree: &CriteriaTree,
        family: ConstraintFamily,
        kind: ConstraintKind,
        policy: &KindPolicy,
    ) -> ConstraintResult<Vec<TemporalConstraint>> {
        let (discarded, mut kept): (Vec<_>, Vec<_>) = self
            .constraints
            .iter()
            .cloned()
            .partition(|c| c.family == family);
        kept.push(TemporalConstraint::global(family, kind));
        engine::validate(tree, &kept, policy)?;

        let discarded: Vec<_> = discarded.into_iter().filter(|c| !c.is_global()).collect();
        log::debug!(
            "adopted global {} constraint '{}', discarded {} partial constraints",
            family,
            kind.name(),
            discarded.len()
        );
        self.constraints = kept;
        Ok(discarded)
    }

    /// Add a pairwise constraint between two leaves
    pub fn adopt_partial(
        &mut self,
        tree: &CriteriaTree,
        first: NodeId,
        second: NodeId,
        kind: ConstraintKind,
        policy: &KindPolicy,
    ) -> ConstraintResult<()> {
        self.adopt(tree, TemporalConstraint::pair(kind, first, second), policy)
    }

    /// Add a chronological ordering `before -> after` with optional bounds
    pub fn adopt_ordering(
        &mut self,
        tree: &CriteriaTree,
        before: NodeId,
        after: NodeId,
        min_duration: Option<TemporalDuration>,
        max_duration: Option<TemporalDuration>,
        policy: &KindPolicy,
    ) -> ConstraintResult<()> {
        let kind = ConstraintKind::DirectChronologicalOrdering {
            min_duration,
            max_duration,
        };
        self.adopt_partial(tree, before, after, kind, policy)
    }

    /// Add any constraint after validating the resulting set
    pub fn adopt(
        &mut self,
        tree: &CriteriaTree,
        constraint: TemporalConstraint,
        policy: &KindPolicy,
    ) -> ConstraintResult<()> {
        let mut candidate = self.constraints.clone();
        candidate.push(constraint);
        engine::validate(tree, &candidate, policy)?;
        self.constraints = candidate;
        Ok(())
    }

    /// Remove the constraint at `index`
    pub fn remove(&mut self, index: usize) -> ConstraintResult<TemporalConstraint> {
        if index >= self.constraints.len() {
            return Err(ConstraintError::IndexOutOfRange {
                index,
                len: self.constraints.len(),
            });
        }
        Ok(self.constraints.remove(index))
    }

    /// Drop constraints a tree mutation invalidated
    ///
    /// Constraints are checked in order; each one is kept only if the set
    /// built so far plus that constraint still validates. Returns the dropped
    /// constraints.
    pub fn prune(&mut self, tree: &CriteriaTree, policy: &KindPolicy) -> Vec<TemporalConstraint> {
        let mut kept: Vec<TemporalConstraint> = Vec::with_capacity(self.constraints.len());
        let mut dropped = Vec::new();
        for constraint in std::mem::take(&mut self.constraints) {
            kept.push(constraint);
            if engine::validate(tree, &kept, policy).is_err()
                && let Some(rejected) = kept.pop()
            {
                dropped.push(rejected);
            }
        }
        if !dropped.is_empty() {
            log::debug!("pruned {} temporal constraints", dropped.len());
        }
        self.constraints = kept;
        dropped
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a TemporalConstraint;
    type IntoIter = std::slice::Iter<'a, TemporalConstraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_tree::{Combinator, NewLeaf};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree_with(kinds: &[&str]) -> (CriteriaTree, Vec<NodeId>) {
        let mut tree = CriteriaTree::new();
        let ids = kinds
            .iter()
            .map(|kind| tree.add_leaf(NodeId::ROOT, NewLeaf::new(*kind, json!({}))).unwrap())
            .collect();
        (tree, ids)
    }

    #[test]
    fn test_adopt_partial_then_global_switch_discards() {
        let (tree, ids) = tree_with(&["Condition", "Procedure", "Measurement"]);
        let policy = KindPolicy::default();
        let mut set = ConstraintSet::new();

        set.adopt_partial(&tree, ids[0], ids[1], ConstraintKind::SameEncounter, &policy)
            .unwrap();
        set.adopt_ordering(&tree, ids[1], ids[2], None, None, &policy).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.preview_global_switch(ConstraintFamily::Stay).len(), 2);
        assert!(set.preview_global_switch(ConstraintFamily::Episode).is_empty());

        let discarded = set
            .adopt_global(&tree, ConstraintFamily::Stay, ConstraintKind::DifferentEncounter, &policy)
            .unwrap();

        assert_eq!(discarded.len(), 2);
        assert_eq!(set.len(), 1);
        assert!(set.global(ConstraintFamily::Stay).is_some());
    }

    #[test]
    fn test_global_switch_replaces_previous_global() {
        let (tree, _) = tree_with(&["Condition"]);
        let policy = KindPolicy::default();
        let mut set = ConstraintSet::new();

        set.adopt_global(&tree, ConstraintFamily::Episode, ConstraintKind::SameEpisodeOfCare, &policy)
            .unwrap();
        let discarded = set
            .adopt_global(&tree, ConstraintFamily::Episode, ConstraintKind::None, &policy)
            .unwrap();

        assert!(discarded.is_empty());
        assert_eq!(
            set.global(ConstraintFamily::Episode).map(|c| c.kind),
            Some(ConstraintKind::None)
        );
    }

    #[test]
    fn test_duplicate_ordering_rejected() {
        let (tree, ids) = tree_with(&["Condition", "Procedure"]);
        let policy = KindPolicy::default();
        let mut set = ConstraintSet::new();

        set.adopt_ordering(&tree, ids[0], ids[1], None, None, &policy).unwrap();
        let err = set
            .adopt_ordering(&tree, ids[0], ids[1], Some(TemporalDuration::days(1)), None, &policy)
            .unwrap_err();
        assert_eq!(
            err,
            ConstraintError::DuplicateChronologicalOrdering {
                before: ids[0],
                after: ids[1]
            }
        );
        // reverse direction is a different ordered pair
        set.adopt_ordering(&tree, ids[1], ids[0], None, None, &policy).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_adopt_rejection_leaves_set_unchanged() {
        let (tree, ids) = tree_with(&["Patient", "Condition"]);
        let policy = KindPolicy::default();
        let mut set = ConstraintSet::new();

        let err = set
            .adopt_partial(&tree, ids[0], ids[1], ConstraintKind::SameEncounter, &policy)
            .unwrap_err();
        assert_eq!(
            err,
            ConstraintError::IneligibleCriteriaReference {
                id: ids[0],
                family: ConstraintFamily::Stay
            }
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_prune_after_tree_change() {
        let (mut tree, ids) = tree_with(&["Condition", "Procedure", "Measurement"]);
        let policy = KindPolicy::default();
        let mut set = ConstraintSet::new();
        set.adopt_partial(&tree, ids[0], ids[1], ConstraintKind::SameEncounter, &policy)
            .unwrap();
        set.adopt_partial(&tree, ids[1], ids[2], ConstraintKind::DifferentEncounter, &policy)
            .unwrap();
        set.adopt_global(&tree, ConstraintFamily::Episode, ConstraintKind::SameEpisodeOfCare, &policy)
            .unwrap();

        tree.remove_node(ids[0]).unwrap();
        tree.update_group(NodeId::ROOT, Combinator::Any, true).unwrap();
        let dropped = set.prune(&tree, &policy);

        // the first pair lost a leaf, the second is no longer under AND, the
        // same-episode global has no meaning under an OR root
        assert_eq!(dropped.len(), 3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut set = ConstraintSet::new();
        assert_eq!(
            set.remove(3),
            Err(ConstraintError::IndexOutOfRange { index: 3, len: 0 })
        );
    }

    #[test]
    fn test_serializes_as_list() {
        let set = ConstraintSet::new();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[]");
    }
}
