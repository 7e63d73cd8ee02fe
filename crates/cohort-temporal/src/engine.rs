//! Eligibility and validation of temporal constraints against a tree
//!
//! A leaf can be temporally constrained only inside a conjunction: every
//! group between the root and the leaf must be AND. Under a non-AND root the
//! conjunction starts at the root's child instead, so each AND branch of an
//! OR root is constrained on its own and constraints never span branches.

use crate::constraint::{ConstraintFamily, ConstraintKind, TemporalConstraint};
use crate::error::{ConstraintError, ConstraintResult};
use cohort_tree::{CriteriaTree, KindPolicy, NodeId};
use std::collections::{BTreeSet, HashSet};

/// Group that bounds the conjunction `leaf` belongs to
///
/// `None` when the leaf sits under an OR or N-among-M group, or directly
/// under a non-AND root.
pub fn conjunctive_scope(tree: &CriteriaTree, leaf: NodeId) -> Option<NodeId> {
    tree.leaf(leaf)?;
    let path = tree.ancestors(leaf)?;
    let (_, below_root) = path.split_first()?;
    let all_and = below_root
        .iter()
        .all(|id| tree.group(*id).is_some_and(|group| group.combinator.is_all()));
    if !all_and {
        return None;
    }
    if tree.root().combinator.is_all() {
        Some(NodeId::ROOT)
    } else {
        below_root.first().copied()
    }
}

/// Leaves eligible for a partial constraint of `family`
pub fn selectable_leaves(
    tree: &CriteriaTree,
    family: ConstraintFamily,
    policy: &KindPolicy,
) -> BTreeSet<NodeId> {
    tree.leaves_depth_first()
        .into_iter()
        .filter(|leaf| !policy.is_structural(&leaf.kind))
        .filter(|leaf| family == ConstraintFamily::Stay || policy.is_episode_bearing(&leaf.kind))
        .filter(|leaf| conjunctive_scope(tree, leaf.id).is_some())
        .map(|leaf| leaf.id)
        .collect()
}

/// Whether a global constraint of `kind` is defined for this tree
pub fn global_available(tree: &CriteriaTree, kind: &ConstraintKind) -> bool {
    !kind.is_same_context() || tree.root().combinator.is_all()
}

/// Global kinds the view layer may offer for `family`
pub fn available_global_kinds(tree: &CriteriaTree, family: ConstraintFamily) -> Vec<ConstraintKind> {
    let candidates = match family {
        ConstraintFamily::Stay => [
            ConstraintKind::None,
            ConstraintKind::SameEncounter,
            ConstraintKind::DifferentEncounter,
        ],
        ConstraintFamily::Episode => [
            ConstraintKind::None,
            ConstraintKind::SameEpisodeOfCare,
            ConstraintKind::DifferentEpisodeOfCare,
        ],
    };
    candidates
        .into_iter()
        .filter(|kind| global_available(tree, kind))
        .collect()
}

/// Check one constraint in isolation
pub fn validate_constraint(
    tree: &CriteriaTree,
    constraint: &TemporalConstraint,
    policy: &KindPolicy,
) -> ConstraintResult<()> {
    let kind = &constraint.kind;
    if let Some(family) = kind.family()
        && family != constraint.family
    {
        return Err(ConstraintError::FamilyMismatch {
            kind: kind.name(),
            family: constraint.family,
        });
    }

    if let ConstraintKind::DirectChronologicalOrdering {
        min_duration: Some(min),
        max_duration: Some(max),
    } = kind
        && min.approximate_minutes() > max.approximate_minutes()
    {
        return Err(ConstraintError::InvalidDurationRange);
    }

    if constraint.is_global() {
        if kind.is_chronological() {
            return Err(ConstraintError::InsufficientCriteria {
                required: 2,
                found: 0,
            });
        }
        if !global_available(tree, kind) {
            return Err(ConstraintError::GlobalConstraintUnavailable { kind: kind.name() });
        }
        return Ok(());
    }

    if matches!(kind, ConstraintKind::None) {
        return Err(ConstraintError::PartialWithoutKind);
    }

    let ids = constraint.referenced_ids();
    let distinct: HashSet<NodeId> = ids.iter().copied().collect();
    let required = 2;
    if distinct.len() < required || (kind.is_chronological() && ids.len() != required) {
        return Err(ConstraintError::InsufficientCriteria {
            required,
            found: distinct.len(),
        });
    }

    let selectable = selectable_leaves(tree, constraint.family, policy);
    let mut scope = None;
    for id in ids {
        if !tree.contains(*id) {
            return Err(ConstraintError::UnknownCriteriaReference { id: *id });
        }
        let ineligible = ConstraintError::IneligibleCriteriaReference {
            id: *id,
            family: constraint.family,
        };
        if !selectable.contains(id) {
            return Err(ineligible);
        }
        let leaf_scope = conjunctive_scope(tree, *id);
        match scope {
            None => scope = leaf_scope,
            Some(expected) if leaf_scope != Some(expected) => return Err(ineligible),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Check a whole constraint set against the tree
pub fn validate(
    tree: &CriteriaTree,
    constraints: &[TemporalConstraint],
    policy: &KindPolicy,
) -> ConstraintResult<()> {
    for constraint in constraints {
        validate_constraint(tree, constraint, policy)?;
    }

    for family in [ConstraintFamily::Stay, ConstraintFamily::Episode] {
        let globals = constraints
            .iter()
            .filter(|c| c.is_global() && c.family == family)
            .count();
        if globals > 1 {
            return Err(ConstraintError::ConflictingGlobalConstraint { family });
        }
    }

    let mut pairs = HashSet::new();
    for (before, after) in constraints.iter().filter_map(TemporalConstraint::ordered_pair) {
        if !pairs.insert((before, after)) {
            return Err(ConstraintError::DuplicateChronologicalOrdering { before, after });
        }
    }
    Ok(())
}
