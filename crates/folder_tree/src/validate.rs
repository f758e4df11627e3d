use crate::Forest;

/// Why a hovered folder cannot receive the dragged one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropRejection {
    SelfDrop,
    IntoDescendant,
}

/// Identity and ancestry checks only; the depth ceiling is handled by [`crate::classify_with`].
pub fn check_drop(forest: &Forest, active_id: &str, target_id: &str) -> Result<(), DropRejection> {
    if active_id == target_id {
        return Err(DropRejection::SelfDrop);
    }
    if forest.is_descendant_of(target_id, active_id) {
        return Err(DropRejection::IntoDescendant);
    }
    Ok(())
}

pub fn is_valid_drop(forest: &Forest, active_id: &str, target_id: &str) -> bool {
    check_drop(forest, active_id, target_id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolderNode;

    fn chain() -> Forest {
        Forest::from_nodes(vec![
            FolderNode::new("A", "A", 1.0)
                .child(FolderNode::new("B", "B", 1.0).child(FolderNode::new("C", "C", 1.0))),
            FolderNode::new("D", "D", 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn self_drop_rejected() {
        let forest = chain();
        for id in ["A", "B", "C", "D", "not-in-tree"] {
            assert_eq!(check_drop(&forest, id, id), Err(DropRejection::SelfDrop));
        }
    }

    #[test]
    fn drop_into_own_subtree_rejected() {
        let forest = chain();
        assert_eq!(check_drop(&forest, "A", "C"), Err(DropRejection::IntoDescendant));
        assert_eq!(check_drop(&forest, "A", "B"), Err(DropRejection::IntoDescendant));
        assert_eq!(check_drop(&forest, "B", "C"), Err(DropRejection::IntoDescendant));
    }

    #[test]
    fn other_targets_allowed() {
        let forest = chain();
        assert!(is_valid_drop(&forest, "C", "A"));
        assert!(is_valid_drop(&forest, "A", "D"));
        assert!(is_valid_drop(&forest, "D", "C"));
    }
}
