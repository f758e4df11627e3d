//! Property tests: arbitrary drag sequences committed through the in-memory store keep the
//! forest acyclic, sibling orders distinct, and every folder within the depth ceiling.

use folder_tree::{
    DragController, DropBounds, DropPosition, FolderId, FolderStore, Forest, MemoryFolderStore,
    StoreError, TreeConfig, classify, commit_move, is_valid_drop, refresh_forest,
};
use futures::executor::block_on;
use proptest::prelude::*;

const ROW: DropBounds = DropBounds {
    top: 0.0,
    height: 24.0,
};

#[derive(Debug, Clone)]
struct DragOp {
    active: usize,
    target: usize,
    pointer_y: f32,
}

fn drag_strategy() -> impl Strategy<Value = DragOp> {
    (0usize..64, 0usize..64, -4.0f32..28.0).prop_map(|(active, target, pointer_y)| DragOp {
        active,
        target,
        pointer_y,
    })
}

/// Grow a tree by creating folders under earlier ones; deep picks fall back to root level.
fn build_store(parents: &[usize]) -> (MemoryFolderStore, Vec<FolderId>) {
    let store = MemoryFolderStore::new(TreeConfig::default());
    let mut ids: Vec<FolderId> = Vec::new();
    for (ix, pick) in parents.iter().enumerate() {
        let parent = (ix > 0 && pick % 4 != 0).then(|| ids[pick % ids.len()].clone());
        let name = format!("f{ix}");
        let folder = match block_on(store.create_folder(&name, parent.as_ref())) {
            Ok(folder) => folder,
            Err(StoreError::ParentAtCeiling { .. }) => {
                block_on(store.create_folder(&name, None)).unwrap()
            }
            Err(err) => panic!("unexpected create failure: {err}"),
        };
        ids.push(folder.id);
    }
    (store, ids)
}

fn assert_forest_invariants(forest: &Forest) {
    forest.check_invariants(TreeConfig::default().depth_ceiling).unwrap();
    for id in forest.flatten_ids() {
        let folder = forest.find_by_id(id.as_str()).unwrap();
        if let Some(parent_id) = folder.parent_id.as_ref() {
            assert!(!forest.is_descendant_of(parent_id.as_str(), id.as_str()));
        }
    }
    let reachable = forest.preorder().len();
    assert_eq!(reachable, forest.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn drag_sequences_preserve_invariants(
        parents in prop::collection::vec(0usize..64, 1..16),
        ops in prop::collection::vec(drag_strategy(), 0..24),
    ) {
        let (store, ids) = build_store(&parents);
        let forest = block_on(refresh_forest(&store)).unwrap();
        let mut ctl = DragController::new(forest, TreeConfig::default());
        assert_forest_invariants(ctl.forest());

        for op in ops {
            let active = ids[op.active % ids.len()].clone();
            let target = ids[op.target % ids.len()].clone();

            ctl.start(active.as_str()).unwrap();
            let indicator = ctl.hover(op.pointer_y, Some((target.as_str(), ROW)));
            let valid = is_valid_drop(ctl.forest(), active.as_str(), target.as_str());
            prop_assert_eq!(indicator.is_some(), valid);

            let Some(command) = ctl.finish() else {
                prop_assert!(!valid);
                continue;
            };
            prop_assert!(!ctl.is_dragging());

            match block_on(commit_move(&store, &command)) {
                Ok(forest) => {
                    assert_forest_invariants(&forest);
                    ctl.replace_forest(forest);
                }
                Err(StoreError::DepthExceeded { .. }) => {
                    // Only sibling drops can overshoot; inside drops were demoted beforehand.
                    prop_assert!(command.new_order.is_some());
                }
                Err(err) => prop_assert!(false, "unexpected store error: {}", err),
            }
        }
    }

    #[test]
    fn classification_is_deterministic_and_never_overshoots(
        pointer_y in -10.0f32..40.0,
        height in 0.0f32..40.0,
        target_depth in 1usize..=5,
        reach in 0usize..5,
    ) {
        let first = classify(pointer_y, 0.0, height, target_depth, reach, 5);
        prop_assert_eq!(first, classify(pointer_y, 0.0, height, target_depth, reach, 5));
        if first == DropPosition::Inside && height > 0.0 {
            prop_assert!(target_depth + 1 + reach <= 5);
        }
    }

    #[test]
    fn midpoint_orders_fall_strictly_between_neighbours(
        orders in prop::collection::btree_set(-1000i32..1000, 2..10),
        pick in 0usize..10,
        after in any::<bool>(),
    ) {
        let orders: Vec<f64> = orders.into_iter().map(f64::from).collect();
        let nodes = orders
            .iter()
            .enumerate()
            .map(|(ix, order)| folder_tree::FolderNode::new(format!("s{ix}"), "s", *order))
            .chain(std::iter::once(folder_tree::FolderNode::new("moved", "moved", 5000.0)))
            .collect::<Vec<_>>();
        let forest = Forest::from_nodes(nodes).unwrap();
        let ref_ix = pick % orders.len();
        let position = if after { DropPosition::After } else { DropPosition::Before };

        let placement =
            folder_tree::assign_order(&forest, "moved", position, &format!("s{ref_ix}")).unwrap();
        let order = placement.order.unwrap();
        let reference = orders[ref_ix];
        if after {
            prop_assert!(order > reference);
            if let Some(next) = orders.get(ref_ix + 1) {
                prop_assert!(order < *next);
            }
        } else {
            prop_assert!(order < reference);
            if ref_ix > 0 {
                prop_assert!(order > orders[ref_ix - 1]);
            }
        }
    }
}
