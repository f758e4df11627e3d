use crate::{DropPosition, FolderId, Forest};

/// Gap left on either side of a reference folder when it has no neighbour there.
const EDGE_GAP: f64 = 2.0;

/// Destination of a moved folder.
///
/// `order` is `None` for `inside` drops: the receiving side appends the folder.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub parent_id: Option<FolderId>,
    pub order: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("reference folder `{0}` is not in the tree")]
    UnknownReference(FolderId),
    #[error("no order fits between {lower} and {upper} next to `{reference}`")]
    PrecisionExhausted {
        reference: FolderId,
        lower: f64,
        upper: f64,
    },
}

/// Compute where `moved_id` goes when dropped at `position` relative to `reference_id`.
///
/// Sibling drops take the midpoint between the reference and its neighbour on that side,
/// ignoring `moved_id` itself; a missing neighbour is replaced by `reference ± 2`.
pub fn assign_order(
    forest: &Forest,
    moved_id: &str,
    position: DropPosition,
    reference_id: &str,
) -> Result<Placement, OrderError> {
    let reference = forest
        .find_by_id(reference_id)
        .ok_or_else(|| OrderError::UnknownReference(reference_id.into()))?;

    if position == DropPosition::Inside {
        return Ok(Placement {
            parent_id: Some(reference.id.clone()),
            order: None,
        });
    }

    let parent_id = reference.parent_id.clone();
    let siblings: Vec<_> = forest
        .siblings_of_parent(parent_id.as_ref().map(FolderId::as_str))
        .into_iter()
        .filter(|folder| folder.id.as_str() != moved_id)
        .collect();
    let ref_ix = siblings
        .iter()
        .position(|folder| folder.id == reference.id)
        .ok_or_else(|| OrderError::UnknownReference(reference.id.clone()))?;

    let ref_order = reference.order;
    let (lower, upper) = match position {
        DropPosition::Before => {
            let prev = ref_ix
                .checked_sub(1)
                .map(|ix| siblings[ix].order)
                .unwrap_or(ref_order - EDGE_GAP);
            (prev, ref_order)
        }
        _ => {
            let next = siblings
                .get(ref_ix + 1)
                .map(|folder| folder.order)
                .unwrap_or(ref_order + EDGE_GAP);
            (ref_order, next)
        }
    };

    let order = midpoint_between(lower, upper).ok_or_else(|| OrderError::PrecisionExhausted {
        reference: reference.id.clone(),
        lower,
        upper,
    })?;

    Ok(Placement {
        parent_id,
        order: Some(order),
    })
}

/// Midpoint of `lower` and `upper`, or `None` once floating point can no longer separate them.
pub fn midpoint_between(lower: f64, upper: f64) -> Option<f64> {
    let mid = (lower + upper) / 2.0;
    (mid.is_finite() && lower < mid && mid < upper).then_some(mid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Folder;

    fn roots(orders: &[(&str, f64)]) -> Forest {
        Forest::from_records(
            orders
                .iter()
                .map(|(id, order)| Folder::new(*id, *id, *order)),
        )
        .unwrap()
    }

    #[test]
    fn after_last_sibling_uses_plus_two_fallback() {
        let forest = roots(&[("A", 1.0), ("B", 2.0)]);
        let placement = assign_order(&forest, "A", DropPosition::After, "B").unwrap();
        assert_eq!(
            placement,
            Placement {
                parent_id: None,
                order: Some(3.0),
            }
        );
    }

    #[test]
    fn before_first_sibling_uses_minus_two_fallback() {
        let forest = roots(&[("A", 1.0), ("B", 3.0)]);
        let placement = assign_order(&forest, "B", DropPosition::Before, "A").unwrap();
        assert_eq!(placement.order, Some(0.0));
        assert_eq!(placement.parent_id, None);
    }

    #[test]
    fn between_neighbours_takes_midpoint() {
        let forest = roots(&[("A", 1.0), ("B", 2.0), ("C", 4.0)]);
        let before = assign_order(&forest, "A", DropPosition::Before, "C").unwrap();
        assert_eq!(before.order, Some(3.0));
        let after = assign_order(&forest, "C", DropPosition::After, "A").unwrap();
        assert_eq!(after.order, Some(1.5));
    }

    #[test]
    fn moved_folder_is_not_its_own_neighbour() {
        // Dragging B after A: B's current slot must not bound the midpoint.
        let forest = roots(&[("A", 1.0), ("B", 2.0), ("C", 3.0)]);
        let placement = assign_order(&forest, "B", DropPosition::After, "A").unwrap();
        assert_eq!(placement.order, Some(2.0));
    }

    #[test]
    fn inside_only_sets_parent() {
        let forest = Forest::from_records(vec![
            Folder::new("A", "A", 1.0),
            Folder::new("B", "B", 2.0),
            Folder::new("B1", "B1", 7.0).parent("B"),
        ])
        .unwrap();
        let placement = assign_order(&forest, "A", DropPosition::Inside, "B").unwrap();
        assert_eq!(
            placement,
            Placement {
                parent_id: Some("B".into()),
                order: None,
            }
        );
    }

    #[test]
    fn sibling_drop_adopts_reference_parent() {
        let forest = Forest::from_records(vec![
            Folder::new("A", "A", 1.0),
            Folder::new("B", "B", 2.0),
            Folder::new("B1", "B1", 5.0).parent("B"),
        ])
        .unwrap();
        let placement = assign_order(&forest, "A", DropPosition::Before, "B1").unwrap();
        assert_eq!(placement.parent_id, Some("B".into()));
        assert_eq!(placement.order, Some(4.0));
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let forest = roots(&[("A", 1.0)]);
        assert_eq!(
            assign_order(&forest, "A", DropPosition::After, "ghost"),
            Err(OrderError::UnknownReference("ghost".into()))
        );
    }

    #[test]
    fn exhausted_precision_is_reported() {
        let next = f64::from_bits(1.0f64.to_bits() + 1);
        let forest = roots(&[("A", 1.0), ("B", next), ("C", 9.0)]);
        assert!(matches!(
            assign_order(&forest, "C", DropPosition::After, "A"),
            Err(OrderError::PrecisionExhausted { .. })
        ));
    }

    #[test]
    fn repeated_insertions_stay_strictly_ordered() {
        let mut lower = 0.0;
        let upper = 1.0;
        for _ in 0..40 {
            let mid = midpoint_between(lower, upper).unwrap();
            assert!(lower < mid && mid < upper);
            lower = mid;
        }
    }
}
