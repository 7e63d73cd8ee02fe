//! Tree mutation commands
//!
//! A command never touches the tree it is given: it runs against a working
//! copy and hands the copy back only when every step succeeded.

use crate::error::TreeResult;
use crate::kinds::{AccessLevel, KindPolicy};
use crate::node::{Combinator, NewLeaf, NodeId};
use crate::tree::CriteriaTree;
use serde::{Deserialize, Serialize};

/// One atomic edit of a criteria tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TreeCommand {
    AddLeaf {
        parent: NodeId,
        leaf: NewLeaf,
    },
    AddGroup {
        parent: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    },
    RemoveNode {
        id: NodeId,
    },
    Reparent {
        id: NodeId,
        new_parent: NodeId,
        position: usize,
    },
    CleanupEmptyGroups,
    ApplyPopulationChange {
        previous: AccessLevel,
        next: AccessLevel,
    },
    ReplaceLeaf {
        id: NodeId,
        leaf: NewLeaf,
    },
    DuplicateLeaf {
        id: NodeId,
    },
    UpdateGroup {
        id: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    },
}

/// Result of a successful command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// The new tree
    pub tree: CriteriaTree,
    /// Id allocated by the command, if any
    pub created: Option<NodeId>,
    /// Ids discarded by the command
    pub removed: Vec<NodeId>,
}

impl CommandOutcome {
    fn new(tree: CriteriaTree) -> Self {
        Self {
            tree,
            created: None,
            removed: Vec::new(),
        }
    }
}

impl TreeCommand {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddLeaf { .. } => "addLeaf",
            Self::AddGroup { .. } => "addGroup",
            Self::RemoveNode { .. } => "removeNode",
            Self::Reparent { .. } => "reparent",
            Self::CleanupEmptyGroups => "cleanupEmptyGroups",
            Self::ApplyPopulationChange { .. } => "applyPopulationChange",
            Self::ReplaceLeaf { .. } => "replaceLeaf",
            Self::DuplicateLeaf { .. } => "duplicateLeaf",
            Self::UpdateGroup { .. } => "updateGroup",
        }
    }

    /// Apply the command to a copy of `tree`
    pub fn apply(&self, tree: &CriteriaTree, policy: &KindPolicy) -> TreeResult<CommandOutcome> {
        let mut outcome = CommandOutcome::new(tree.clone());
        let working = &mut outcome.tree;
        match self {
            Self::AddLeaf { parent, leaf } => {
                outcome.created = Some(working.add_leaf(*parent, leaf.clone())?);
            }
            Self::AddGroup {
                parent,
                combinator,
                is_inclusive,
            } => {
                outcome.created = Some(working.add_group(*parent, *combinator, *is_inclusive)?);
            }
            Self::RemoveNode { id } => {
                outcome.removed = working.remove_node(*id)?;
            }
            Self::Reparent {
                id,
                new_parent,
                position,
            } => {
                working.reparent(*id, *new_parent, *position)?;
            }
            Self::CleanupEmptyGroups => {
                outcome.removed = working.cleanup_empty_groups();
            }
            Self::ApplyPopulationChange { previous, next } => {
                outcome.removed = working.apply_population_change(*previous, *next, policy);
            }
            Self::ReplaceLeaf { id, leaf } => {
                working.replace_leaf(*id, leaf.clone())?;
            }
            Self::DuplicateLeaf { id } => {
                outcome.created = Some(working.duplicate_leaf(*id)?);
            }
            Self::UpdateGroup {
                id,
                combinator,
                is_inclusive,
            } => {
                working.update_group(*id, *combinator, *is_inclusive)?;
            }
        }
        log::debug!(
            "{} applied (created: {:?}, removed: {})",
            self.name(),
            outcome.created,
            outcome.removed.len()
        );
        Ok(outcome)
    }
}
