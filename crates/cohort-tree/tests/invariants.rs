//! Tree invariants over random command sequences
//!
//! Covers:
//! - Id uniqueness (each node reachable exactly once)
//! - Acyclicity of reparenting
//! - Idempotence of empty-group cleanup
//! - Atomicity of rejected commands

use cohort_tree::{
    AccessLevel, Combinator, CriteriaTree, KindPolicy, NewLeaf, NodeId, TreeCommand, TreeError,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;
use std::collections::HashSet;

const KINDS: [&str; 4] = ["Patient", "Condition", "DocumentReference", "Pregnancy"];

fn policy() -> KindPolicy {
    KindPolicy::default().with_nominative("DocumentReference")
}

fn command_strategy() -> impl Strategy<Value = TreeCommand> {
    let id = (0u32..16).prop_map(NodeId::new);
    prop_oneof![
        (id.clone(), 0usize..KINDS.len(), any::<bool>()).prop_map(|(parent, kind, inclusive)| {
            let mut leaf = NewLeaf::new(KINDS[kind], json!({ "k": kind }));
            leaf.is_inclusive = inclusive;
            TreeCommand::AddLeaf { parent, leaf }
        }),
        (id.clone(), prop_oneof![Just(Combinator::All), Just(Combinator::Any)]).prop_map(
            |(parent, combinator)| TreeCommand::AddGroup {
                parent,
                combinator,
                is_inclusive: true,
            }
        ),
        id.clone().prop_map(|id| TreeCommand::RemoveNode { id }),
        (id.clone(), id.clone(), 0usize..4).prop_map(|(id, new_parent, position)| {
            TreeCommand::Reparent {
                id,
                new_parent,
                position,
            }
        }),
        Just(TreeCommand::CleanupEmptyGroups),
        Just(TreeCommand::ApplyPopulationChange {
            previous: AccessLevel::Identified,
            next: AccessLevel::DeIdentified,
        }),
        id.prop_map(|id| TreeCommand::DuplicateLeaf { id }),
    ]
}

fn run(commands: &[TreeCommand]) -> CriteriaTree {
    let policy = policy();
    let mut tree = CriteriaTree::new();
    for command in commands {
        match command.apply(&tree, &policy) {
            Ok(outcome) => tree = outcome.tree,
            Err(_) => continue,
        }
    }
    tree
}

fn apply_in_place(tree: &mut CriteriaTree, command: &TreeCommand) -> Result<(), TreeError> {
    match command {
        TreeCommand::AddLeaf { parent, leaf } => tree.add_leaf(*parent, leaf.clone()).map(drop),
        TreeCommand::AddGroup {
            parent,
            combinator,
            is_inclusive,
        } => tree.add_group(*parent, *combinator, *is_inclusive).map(drop),
        TreeCommand::RemoveNode { id } => tree.remove_node(*id).map(drop),
        TreeCommand::Reparent {
            id,
            new_parent,
            position,
        } => tree.reparent(*id, *new_parent, *position),
        TreeCommand::DuplicateLeaf { id } => tree.duplicate_leaf(*id).map(drop),
        other => other.apply(tree, &policy()).map(|outcome| *tree = outcome.tree),
    }
}

fn assert_well_formed(tree: &CriteriaTree) {
    let order = tree.preorder();
    let unique: HashSet<_> = order.iter().copied().collect();
    assert_eq!(unique.len(), order.len(), "node visited twice: {order:?}");
    assert_eq!(order.len(), tree.node_count(), "unreachable nodes in {order:?}");

    let mut references = HashSet::new();
    for group in tree.groups() {
        for child in &group.children {
            assert!(references.insert(*child), "{child} referenced twice");
            assert!(tree.contains(*child), "dangling child {child}");
        }
    }
    assert!(!references.contains(&NodeId::ROOT));
}

proptest! {
    #[test]
    fn prop_ids_unique_and_reachable(commands in prop::collection::vec(command_strategy(), 0..40)) {
        let tree = run(&commands);
        assert_well_formed(&tree);
    }

    #[test]
    fn prop_cleanup_is_idempotent(commands in prop::collection::vec(command_strategy(), 0..40)) {
        let mut once = run(&commands);
        once.cleanup_empty_groups();
        let mut twice = once.clone();
        prop_assert!(twice.cleanup_empty_groups().is_empty());
        prop_assert_eq!(twice, once.clone());
        prop_assert!(once.groups().skip(1).all(|g| !g.children.is_empty()));
    }

    #[test]
    fn prop_rejected_in_place_mutations_change_nothing(
        commands in prop::collection::vec(command_strategy(), 0..30),
        extra in command_strategy(),
    ) {
        let mut tree = run(&commands);
        let before = tree.clone();
        if apply_in_place(&mut tree, &extra).is_err() {
            prop_assert_eq!(&tree, &before);
        }
        assert_well_formed(&tree);
    }

    #[test]
    fn prop_reparent_under_descendant_always_fails(commands in prop::collection::vec(command_strategy(), 0..40)) {
        let mut tree = run(&commands);
        let groups: Vec<NodeId> = tree.groups().map(|g| g.id).collect();
        for group in groups {
            for node in tree.subtree(group) {
                if tree.group(node).is_none() {
                    continue;
                }
                let before = tree.clone();
                let result = tree.reparent(group, node, 0);
                prop_assert_eq!(result, Err(TreeError::CyclicReference { id: group, parent: node }));
                prop_assert_eq!(&tree, &before);
            }
        }
    }
}

#[rstest]
#[case::unknown_parent(TreeCommand::AddGroup { parent: NodeId::new(7), combinator: Combinator::All, is_inclusive: true }, TreeError::UnknownParent { id: NodeId::new(7) })]
#[case::leaf_parent(TreeCommand::AddLeaf { parent: NodeId::new(1), leaf: NewLeaf::new("Condition", json!({})) }, TreeError::NotAGroup { id: NodeId::new(1) })]
#[case::root_removal(TreeCommand::RemoveNode { id: NodeId::ROOT }, TreeError::RootRemovalForbidden)]
#[case::unknown_removal(TreeCommand::RemoveNode { id: NodeId::new(9) }, TreeError::UnknownNode { id: NodeId::new(9) })]
#[case::self_parent(TreeCommand::Reparent { id: NodeId::new(2), new_parent: NodeId::new(2), position: 0 }, TreeError::CyclicReference { id: NodeId::new(2), parent: NodeId::new(2) })]
#[case::replace_group(TreeCommand::ReplaceLeaf { id: NodeId::new(2), leaf: NewLeaf::new("Condition", json!({})) }, TreeError::NotALeaf { id: NodeId::new(2) })]
fn test_structural_errors(#[case] command: TreeCommand, #[case] expected: TreeError) {
    let mut tree = CriteriaTree::new();
    tree.add_leaf(NodeId::ROOT, NewLeaf::new("Condition", json!({}))).unwrap();
    tree.add_group(NodeId::ROOT, Combinator::All, true).unwrap();
    let before = tree.clone();

    let err = command.apply(&tree, &policy()).unwrap_err();

    assert_eq!(err, expected);
    assert_eq!(tree, before);
}

#[test]
fn test_scenario_cleanup_after_empty_group() {
    let policy = KindPolicy::default();
    let tree = CriteriaTree::new();

    let added = TreeCommand::AddLeaf {
        parent: NodeId::ROOT,
        leaf: NewLeaf::new("Patient", json!({"gender": "f"})),
    }
    .apply(&tree, &policy)
    .unwrap();
    assert_eq!(added.created, Some(NodeId::new(1)));

    let grouped = TreeCommand::AddGroup {
        parent: NodeId::ROOT,
        combinator: Combinator::Any,
        is_inclusive: true,
    }
    .apply(&added.tree, &policy)
    .unwrap();
    assert_eq!(grouped.created, Some(NodeId::new(2)));

    let cleaned = TreeCommand::CleanupEmptyGroups.apply(&grouped.tree, &policy).unwrap();
    assert_eq!(cleaned.removed, vec![NodeId::new(2)]);
    assert_eq!(cleaned.tree.root().children, vec![NodeId::new(1)]);
}
