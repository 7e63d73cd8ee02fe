//! The criteria tree
//!
//! Groups and leaves live in insertion-ordered maps keyed by [`NodeId`]; the
//! shape is carried by each group's ordered `children`. Every mutation checks
//! all of its preconditions before touching anything, so a rejected call
//! leaves the tree exactly as it was.

use crate::error::{TreeError, TreeResult};
use crate::kinds::{AccessLevel, KindPolicy};
use crate::node::{Combinator, GroupNode, LeafCriterion, NewLeaf, NodeId, NodeRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Groups and leaves of one cohort query
///
/// Decoding checks the same shape invariants the mutations maintain, so a
/// deserialized tree is always safe to walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTree")]
pub struct CriteriaTree {
    root: GroupNode,
    groups: IndexMap<NodeId, GroupNode>,
    leaves: IndexMap<NodeId, LeafCriterion>,
    next_id: u32,
}

/// Wire form of [`CriteriaTree`] before its shape is checked
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTree {
    root: GroupNode,
    #[serde(default)]
    groups: IndexMap<NodeId, GroupNode>,
    #[serde(default)]
    leaves: IndexMap<NodeId, LeafCriterion>,
    next_id: u32,
}

impl TryFrom<RawTree> for CriteriaTree {
    type Error = TreeError;

    fn try_from(raw: RawTree) -> TreeResult<Self> {
        let tree = Self {
            root: raw.root,
            groups: raw.groups,
            leaves: raw.leaves,
            next_id: raw.next_id,
        };
        tree.check_shape()?;
        Ok(tree)
    }
}

impl Default for CriteriaTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CriteriaTree {
    /// Create an empty tree with an inclusive AND root
    pub fn new() -> Self {
        Self::with_root(Combinator::All)
    }

    /// Create an empty tree with the given root combinator
    pub fn with_root(combinator: Combinator) -> Self {
        Self {
            root: GroupNode::new(NodeId::ROOT, combinator, true),
            groups: IndexMap::new(),
            leaves: IndexMap::new(),
            next_id: 1,
        }
    }

    // ------------------------------------------------------------------
    // Read projections
    // ------------------------------------------------------------------

    pub fn root(&self) -> &GroupNode {
        &self.root
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        if let Some(group) = self.group(id) {
            return Some(NodeRef::Group(group));
        }
        self.leaves.get(&id).map(NodeRef::Leaf)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn group(&self, id: NodeId) -> Option<&GroupNode> {
        if id.is_root() {
            Some(&self.root)
        } else {
            self.groups.get(&id)
        }
    }

    pub fn leaf(&self, id: NodeId) -> Option<&LeafCriterion> {
        self.leaves.get(&id)
    }

    /// Number of nodes, root included
    pub fn node_count(&self) -> usize {
        1 + self.groups.len() + self.leaves.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Id the next created node will receive
    pub fn next_id(&self) -> NodeId {
        NodeId::new(self.next_id)
    }

    /// Every group, root first, then in creation order
    pub fn groups(&self) -> impl Iterator<Item = &GroupNode> {
        std::iter::once(&self.root).chain(self.groups.values())
    }

    /// Node ids in depth-first pre-order, starting at the root
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(group) = self.group(id) {
                stack.extend(group.children.iter().rev().copied());
            }
        }
        out
    }

    /// Leaves in depth-first order
    pub fn leaves_depth_first(&self) -> Vec<&LeafCriterion> {
        self.preorder().into_iter().filter_map(|id| self.leaf(id)).collect()
    }

    /// Parent group of `id`, `None` for the root or unknown ids
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.groups()
            .find(|group| group.children.contains(&id))
            .map(|group| group.id)
    }

    /// Groups from the root down to the direct parent of `id`
    ///
    /// Returns `None` when `id` is not attached to the tree.
    pub fn ancestors(&self, id: NodeId) -> Option<Vec<NodeId>> {
        if id.is_root() {
            return Some(Vec::new());
        }
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            path.push(parent);
            if parent.is_root() {
                path.reverse();
                return Some(path);
            }
            current = parent;
        }
        None
    }

    /// True when `candidate` sits strictly below `ancestor`
    pub fn is_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut current = candidate;
        while let Some(parent) = self.parent_of(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Ids of `id` and everything beneath it, pre-order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            if let Some(group) = self.group(current) {
                stack.extend(group.children.iter().rev().copied());
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Append a leaf as the last child of `parent`
    pub fn add_leaf(&mut self, parent: NodeId, leaf: NewLeaf) -> TreeResult<NodeId> {
        self.check_parent(parent)?;
        let id = self.allocate_id();
        self.leaves.insert(id, leaf.into_leaf(id));
        self.attach(parent, id, None);
        log::debug!("added leaf {id} under group {parent}");
        Ok(id)
    }

    /// Append an empty group as the last child of `parent`
    pub fn add_group(
        &mut self,
        parent: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    ) -> TreeResult<NodeId> {
        self.check_parent(parent)?;
        combinator.validate()?;
        let id = self.allocate_id();
        self.groups.insert(id, GroupNode::new(id, combinator, is_inclusive));
        self.attach(parent, id, None);
        log::debug!("added {combinator} group {id} under group {parent}");
        Ok(id)
    }

    /// Detach `id` and discard its subtree, returning the removed ids
    pub fn remove_node(&mut self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        if id.is_root() {
            return Err(TreeError::RootRemovalForbidden);
        }
        if !self.contains(id) {
            return Err(TreeError::UnknownNode { id });
        }
        let removed = self.subtree(id);
        self.detach(id);
        for node in &removed {
            self.groups.shift_remove(node);
            self.leaves.shift_remove(node);
        }
        log::debug!("removed node {id} ({} nodes)", removed.len());
        Ok(removed)
    }

    /// Move `id` under `new_parent` at `position`
    ///
    /// The position indexes the new parent's children after `id` has been
    /// detached; positions past the end append.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, position: usize) -> TreeResult<()> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode { id });
        }
        self.check_parent(new_parent)?;
        if new_parent == id || self.is_descendant(new_parent, id) {
            return Err(TreeError::CyclicReference { id, parent: new_parent });
        }
        self.detach(id);
        self.attach(new_parent, id, Some(position));
        log::debug!("moved node {id} under group {new_parent} at {position}");
        Ok(())
    }

    /// Remove every empty non-root group until none remain
    pub fn cleanup_empty_groups(&mut self) -> Vec<NodeId> {
        let mut removed = Vec::new();
        loop {
            let empty: Vec<NodeId> = self
                .groups
                .values()
                .filter(|group| group.children.is_empty())
                .map(|group| group.id)
                .collect();
            if empty.is_empty() {
                break;
            }
            for id in empty {
                self.detach(id);
                self.groups.shift_remove(&id);
                removed.push(id);
            }
        }
        if !removed.is_empty() {
            log::debug!("cleaned up {} empty groups", removed.len());
        }
        removed
    }

    /// Drop identified-only leaves when the population becomes de-identified
    ///
    /// Returns every removed id: the leaves first, then groups emptied by
    /// their removal. A change that does not restrict access is a no-op.
    pub fn apply_population_change(
        &mut self,
        previous: AccessLevel,
        next: AccessLevel,
        policy: &KindPolicy,
    ) -> Vec<NodeId> {
        if !next.is_more_restrictive_than(previous) {
            return Vec::new();
        }
        let nominative: Vec<NodeId> = self
            .leaves
            .values()
            .filter(|leaf| policy.requires_identified_data(&leaf.kind))
            .map(|leaf| leaf.id)
            .collect();
        if nominative.is_empty() {
            return Vec::new();
        }
        for id in &nominative {
            self.detach(*id);
            self.leaves.shift_remove(id);
        }
        log::debug!(
            "population restricted to {:?}: removed {} identified-only criteria",
            next,
            nominative.len()
        );
        let mut removed = nominative;
        removed.extend(self.cleanup_empty_groups());
        removed
    }

    /// Replace the record of an existing leaf, keeping its id and position
    pub fn replace_leaf(&mut self, id: NodeId, leaf: NewLeaf) -> TreeResult<()> {
        match self.get(id) {
            None => Err(TreeError::UnknownNode { id }),
            Some(NodeRef::Group(_)) => Err(TreeError::NotALeaf { id }),
            Some(NodeRef::Leaf(_)) => {
                self.leaves.insert(id, leaf.into_leaf(id));
                log::debug!("replaced leaf {id}");
                Ok(())
            }
        }
    }

    /// Copy a leaf under a fresh id, right after the original
    pub fn duplicate_leaf(&mut self, id: NodeId) -> TreeResult<NodeId> {
        let record = match self.get(id) {
            None => return Err(TreeError::UnknownNode { id }),
            Some(NodeRef::Group(_)) => return Err(TreeError::NotALeaf { id }),
            Some(NodeRef::Leaf(leaf)) => NewLeaf::from(leaf),
        };
        let parent = self.parent_of(id).ok_or(TreeError::UnknownNode { id })?;
        let position = self
            .group(parent)
            .and_then(|group| group.children.iter().position(|child| *child == id))
            .map_or(usize::MAX, |index| index + 1);
        let copy = self.allocate_id();
        self.leaves.insert(copy, record.into_leaf(copy));
        self.attach(parent, copy, Some(position));
        log::debug!("duplicated leaf {id} as {copy}");
        Ok(copy)
    }

    /// Change the combinator and inclusion flag of a group
    pub fn update_group(
        &mut self,
        id: NodeId,
        combinator: Combinator,
        is_inclusive: bool,
    ) -> TreeResult<()> {
        if self.leaf(id).is_some() {
            return Err(TreeError::NotAGroup { id });
        }
        combinator.validate()?;
        let group = self.group_mut(id).ok_or(TreeError::UnknownNode { id })?;
        group.combinator = combinator;
        group.is_inclusive = is_inclusive;
        Ok(())
    }

    /// Reject leaves the population `access` level may not query
    pub fn check_access(&self, access: AccessLevel, policy: &KindPolicy) -> TreeResult<()> {
        if access.grants_identified_data() {
            return Ok(());
        }
        match self
            .leaves
            .values()
            .find(|leaf| policy.requires_identified_data(&leaf.kind))
        {
            Some(leaf) => Err(TreeError::IdentifiedDataRequired {
                id: leaf.id,
                kind: leaf.kind.clone(),
            }),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Every stored node reachable from the root through exactly one parent
    fn check_shape(&self) -> TreeResult<()> {
        let malformed = |reason: String| TreeError::MalformedTree { reason };

        if !self.root.id.is_root() {
            return Err(malformed(format!("root group has id {}", self.root.id)));
        }
        self.root.combinator.validate()?;
        for (key, group) in &self.groups {
            if key.is_root() || group.id != *key {
                return Err(malformed(format!("group keyed {key} has id {}", group.id)));
            }
            group.combinator.validate()?;
        }
        for (key, leaf) in &self.leaves {
            if key.is_root() || leaf.id != *key || self.groups.contains_key(key) {
                return Err(malformed(format!("leaf keyed {key} has id {}", leaf.id)));
            }
        }
        let highest = self
            .groups
            .keys()
            .chain(self.leaves.keys())
            .map(|id| id.get())
            .max()
            .unwrap_or(0);
        if self.next_id <= highest {
            return Err(malformed(format!(
                "next id {} does not exceed existing id {highest}",
                self.next_id
            )));
        }

        let mut seen = BTreeSet::from([NodeId::ROOT]);
        let mut stack = vec![&self.root];
        while let Some(group) = stack.pop() {
            for child in &group.children {
                if !seen.insert(*child) {
                    return Err(malformed(format!("node {child} is referenced more than once")));
                }
                if let Some(nested) = self.groups.get(child) {
                    stack.push(nested);
                } else if !self.leaves.contains_key(child) {
                    return Err(malformed(format!(
                        "group {} references unknown node {child}",
                        group.id
                    )));
                }
            }
        }
        if seen.len() != self.node_count() {
            return Err(malformed(format!(
                "{} nodes are not attached to the root",
                self.node_count() - seen.len()
            )));
        }
        Ok(())
    }

    fn check_parent(&self, parent: NodeId) -> TreeResult<()> {
        if self.group(parent).is_some() {
            Ok(())
        } else if self.leaves.contains_key(&parent) {
            Err(TreeError::NotAGroup { id: parent })
        } else {
            Err(TreeError::UnknownParent { id: parent })
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn group_mut(&mut self, id: NodeId) -> Option<&mut GroupNode> {
        if id.is_root() {
            Some(&mut self.root)
        } else {
            self.groups.get_mut(&id)
        }
    }

    fn attach(&mut self, parent: NodeId, id: NodeId, position: Option<usize>) {
        if let Some(group) = self.group_mut(parent) {
            let index = position.map_or(group.children.len(), |p| p.min(group.children.len()));
            group.children.insert(index, id);
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent_of(id)
            && let Some(group) = self.group_mut(parent)
        {
            group.children.retain(|child| *child != id);
        }
    }
}
