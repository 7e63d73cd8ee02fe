//! Undo/redo laws
//!
//! Checks the history against a plain vector-and-cursor model over random
//! sequences of builds, undos and redos.

use cohort_compiler::{PopulationScope, QueryCompiler};
use cohort_history::{HistoryConfig, HistoryError, SnapshotHistory};
use cohort_temporal::ConstraintSet;
use cohort_tree::{CriteriaTree, NewLeaf, NodeId};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn tree(label: u32) -> CriteriaTree {
    let mut tree = CriteriaTree::new();
    tree.add_leaf(NodeId::ROOT, NewLeaf::new("Condition", json!({ "label": label })))
        .unwrap();
    tree
}

fn history() -> SnapshotHistory {
    SnapshotHistory::new(
        QueryCompiler::new(),
        HistoryConfig::default(),
        PopulationScope::default(),
    )
    .unwrap()
}

fn build(history: &mut SnapshotHistory, label: u32) {
    history
        .build(tree(label), ConstraintSet::new(), PopulationScope::default())
        .unwrap();
}

#[test]
fn test_undo_redo_over_three_builds() {
    let mut history = history();
    build(&mut history, 1);
    build(&mut history, 2);
    build(&mut history, 3);

    assert_eq!(history.len(), 3);
    assert_eq!(history.undo().unwrap().tree, tree(2));
    assert_eq!(history.undo().unwrap().tree, tree(1));
    // the empty starting tree was replaced by the first build
    assert_eq!(history.undo(), Err(HistoryError::AtOldestSnapshot));
    assert_eq!(history.current().tree, tree(1));

    assert_eq!(history.redo().unwrap().tree, tree(2));
    build(&mut history, 4);
    assert_eq!(history.redo(), Err(HistoryError::AtNewestSnapshot));
    assert_eq!(history.current().tree, tree(4));
    assert_eq!(history.undo().unwrap().tree, tree(2));
    assert_eq!(history.len(), 3);
}

#[test]
fn test_restored_snapshot_keeps_its_query() {
    let mut history = history();
    build(&mut history, 1);
    let first = history.current().fingerprint();
    build(&mut history, 2);
    assert_ne!(history.current().fingerprint(), first);

    let restored = history.undo().unwrap();
    assert_eq!(restored.fingerprint(), first);
}

#[derive(Debug, Clone)]
enum Op {
    Build(u32),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..1000).prop_map(Op::Build),
        Just(Op::Undo),
        Just(Op::Redo),
    ]
}

proptest! {
    #[test]
    fn prop_matches_vector_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut history = history();
        // None stands for the starting empty tree, which the first build replaces
        let mut model: Vec<Option<u32>> = vec![None];
        let mut cursor = 0usize;
        let mut pristine = true;

        for op in ops {
            match op {
                Op::Build(label) => {
                    build(&mut history, label);
                    if pristine {
                        model[0] = Some(label);
                        pristine = false;
                    } else {
                        model.truncate(cursor + 1);
                        model.push(Some(label));
                        cursor = model.len() - 1;
                    }
                }
                Op::Undo => {
                    let result = history.undo();
                    if cursor == 0 {
                        prop_assert_eq!(result, Err(HistoryError::AtOldestSnapshot));
                    } else {
                        cursor -= 1;
                        prop_assert!(result.is_ok());
                    }
                }
                Op::Redo => {
                    let result = history.redo();
                    if cursor + 1 == model.len() {
                        prop_assert_eq!(result, Err(HistoryError::AtNewestSnapshot));
                    } else {
                        cursor += 1;
                        prop_assert!(result.is_ok());
                    }
                }
            }

            prop_assert_eq!(history.len(), model.len());
            prop_assert_eq!(history.cursor(), cursor);
            let expected = model[cursor].map(tree).unwrap_or_default();
            prop_assert_eq!(&history.current().tree, &expected);
        }
    }
}
