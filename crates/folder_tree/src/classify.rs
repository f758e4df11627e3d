use serde::{Deserialize, Serialize};

use crate::TreeConfig;

/// Where a dragged folder lands relative to the folder under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

/// Vertical extent of a rendered row, in the same coordinate space as the pointer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DropBounds {
    pub top: f32,
    pub height: f32,
}

impl DropBounds {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }
}

/// Classify a pending drop using the default band ratios.
pub fn classify(
    pointer_y: f32,
    box_top: f32,
    box_height: f32,
    target_depth: usize,
    dragged_max_descendant_depth: usize,
    depth_ceiling: usize,
) -> DropPosition {
    let config = TreeConfig::default().depth_ceiling(depth_ceiling);
    classify_with(
        &config,
        pointer_y,
        DropBounds::new(box_top, box_height),
        target_depth,
        dragged_max_descendant_depth,
    )
}

/// The top band means `before`, the bottom band `after`, and the middle `inside`.
///
/// An `inside` that would push the dragged subtree past the depth ceiling is demoted to the
/// nearer sibling position instead, so the result is always a usable position. Rows that have
/// not been measured yet (zero height) report `inside`.
pub fn classify_with(
    config: &TreeConfig,
    pointer_y: f32,
    bounds: DropBounds,
    target_depth: usize,
    dragged_max_descendant_depth: usize,
) -> DropPosition {
    let height = bounds.height;
    if height.is_nan() || height <= 0.0 {
        return DropPosition::Inside;
    }

    let relative_y = pointer_y - bounds.top;
    let candidate = if relative_y < config.before_ratio * height {
        DropPosition::Before
    } else if relative_y > config.after_ratio * height {
        DropPosition::After
    } else {
        DropPosition::Inside
    };

    let reach = target_depth + 1 + dragged_max_descendant_depth;
    if candidate == DropPosition::Inside && reach > config.depth_ceiling {
        if relative_y < config.demote_split_ratio * height {
            DropPosition::Before
        } else {
            DropPosition::After
        }
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_split_at_twenty_and_eighty_percent() {
        // Row spans 100..120.
        assert_eq!(classify(100.0, 100.0, 20.0, 1, 0, 5), DropPosition::Before);
        assert_eq!(classify(103.9, 100.0, 20.0, 1, 0, 5), DropPosition::Before);
        assert_eq!(classify(104.0, 100.0, 20.0, 1, 0, 5), DropPosition::Inside);
        assert_eq!(classify(110.0, 100.0, 20.0, 1, 0, 5), DropPosition::Inside);
        assert_eq!(classify(116.0, 100.0, 20.0, 1, 0, 5), DropPosition::Inside);
        assert_eq!(classify(116.1, 100.0, 20.0, 1, 0, 5), DropPosition::After);
        assert_eq!(classify(119.0, 100.0, 20.0, 1, 0, 5), DropPosition::After);
    }

    #[test]
    fn pointer_outside_box_still_classifies() {
        assert_eq!(classify(90.0, 100.0, 20.0, 1, 0, 5), DropPosition::Before);
        assert_eq!(classify(150.0, 100.0, 20.0, 1, 0, 5), DropPosition::After);
    }

    #[test]
    fn inside_is_demoted_when_ceiling_would_be_crossed() {
        // Target at depth 4, dragged subtree two levels deep: 4 + 1 + 2 = 7 > 5.
        assert_eq!(classify(105.0, 100.0, 20.0, 4, 2, 5), DropPosition::Before);
        assert_eq!(classify(109.9, 100.0, 20.0, 4, 2, 5), DropPosition::Before);
        assert_eq!(classify(110.0, 100.0, 20.0, 4, 2, 5), DropPosition::After);
        assert_eq!(classify(115.0, 100.0, 20.0, 4, 2, 5), DropPosition::After);
    }

    #[test]
    fn inside_allowed_exactly_at_ceiling() {
        // 4 + 1 + 0 = 5, still within the ceiling.
        assert_eq!(classify(110.0, 100.0, 20.0, 4, 0, 5), DropPosition::Inside);
        assert_eq!(classify(110.0, 100.0, 20.0, 5, 0, 5), DropPosition::After);
    }

    #[test]
    fn unmeasured_row_defaults_to_inside() {
        assert_eq!(classify(0.0, 0.0, 0.0, 5, 3, 5), DropPosition::Inside);
        assert_eq!(classify(10.0, 0.0, f32::NAN, 1, 0, 5), DropPosition::Inside);
        assert_eq!(classify(10.0, 0.0, -4.0, 1, 0, 5), DropPosition::Inside);
    }

    #[test]
    fn classification_is_repeatable() {
        let first = classify(117.5, 100.0, 24.0, 3, 1, 5);
        for _ in 0..16 {
            assert_eq!(classify(117.5, 100.0, 24.0, 3, 1, 5), first);
        }
    }

    #[test]
    fn custom_bands_from_config() {
        let config = TreeConfig {
            before_ratio: 0.5,
            after_ratio: 0.5,
            ..TreeConfig::default()
        };
        let bounds = DropBounds::new(0.0, 10.0);
        assert_eq!(classify_with(&config, 4.0, bounds, 1, 0), DropPosition::Before);
        assert_eq!(classify_with(&config, 6.0, bounds, 1, 0), DropPosition::After);
        assert_eq!(classify_with(&config, 5.0, bounds, 1, 0), DropPosition::Inside);
    }
}
