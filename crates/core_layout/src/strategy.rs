//! Companion placement strategy.
//!
//! Decides which side of the header the companion panels open on. The
//! decision order is fixed: users learn where panels appear, so the
//! thresholds and tie-breaks below must stay stable.

use crate::Rect;
use serde::{Deserialize, Serialize};

/// A side of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Below,
    Above,
    Left,
    Right,
}

/// Which rule produced a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyName {
    Below,
    Above,
    RightSide,
    LeftSide,
    Adaptive,
}

/// Primary and secondary placement axes for companion windows.
///
/// Recomputed on every layout pass; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStrategy {
    pub name: StrategyName,
    pub primary: Placement,
    pub secondary: Placement,
}

/// Thresholds that drive [`determine_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyRules {
    /// Free space needed above/below the header to open vertically.
    pub vertical_space: i32,
    /// Free space needed beside the header to open sideways.
    pub side_space: i32,
    /// Relative x below which the header counts as hugging the left edge.
    pub leading_cutoff: f64,
    /// Relative x above which the header counts as hugging the right edge.
    pub trailing_cutoff: f64,
    /// Relative x that splits "open to the right" from "open to the left".
    pub midpoint: f64,
}

impl Default for StrategyRules {
    fn default() -> Self {
        Self {
            vertical_space: 400,
            side_space: 800,
            leading_cutoff: 0.3,
            trailing_cutoff: 0.7,
            midpoint: 0.5,
        }
    }
}

/// Free space around the header inside a work area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSpace {
    pub below: i32,
    pub above: i32,
    pub left: i32,
    pub right: i32,
}

impl FreeSpace {
    /// Measure the space between the header and each work-area edge.
    pub fn around(header: &Rect, work_area: &Rect) -> Self {
        Self {
            below: work_area.bottom() - header.bottom(),
            above: header.y - work_area.y,
            left: header.x - work_area.x,
            right: work_area.right() - header.right(),
        }
    }

    fn taller_side(&self) -> Placement {
        if self.below > self.above {
            Placement::Below
        } else {
            Placement::Above
        }
    }

    fn wider_side(&self) -> Placement {
        if self.right > self.left {
            Placement::Right
        } else {
            Placement::Left
        }
    }
}

/// Header center as a fraction of the work area on each axis.
fn relative_position(header: &Rect, work_area: &Rect) -> (f64, f64) {
    let fraction = |offset: f64, extent: i32| {
        if extent > 0 {
            offset / extent as f64
        } else {
            0.5
        }
    };
    (
        fraction(header.center_x() - work_area.x as f64, work_area.width),
        fraction(header.center_y() - work_area.y as f64, work_area.height),
    )
}

/// Choose where companion windows open relative to the header.
///
/// First match wins:
/// 1. enough room below → `below`
/// 2. enough room above → `above`
/// 3. header near the left edge with wide room to the right → `right-side`
/// 4. header near the right edge with wide room to the left → `left-side`
/// 5. otherwise `adaptive`: the roomier vertical side, then the roomier
///    horizontal side.
pub fn determine_strategy(header: &Rect, work_area: &Rect, rules: &StrategyRules) -> LayoutStrategy {
    let space = FreeSpace::around(header, work_area);
    let (relative_x, _relative_y) = relative_position(header, work_area);

    let horizontal = if relative_x < rules.midpoint {
        Placement::Right
    } else {
        Placement::Left
    };

    if space.below >= rules.vertical_space {
        LayoutStrategy {
            name: StrategyName::Below,
            primary: Placement::Below,
            secondary: horizontal,
        }
    } else if space.above >= rules.vertical_space {
        LayoutStrategy {
            name: StrategyName::Above,
            primary: Placement::Above,
            secondary: horizontal,
        }
    } else if relative_x < rules.leading_cutoff && space.right >= rules.side_space {
        LayoutStrategy {
            name: StrategyName::RightSide,
            primary: Placement::Right,
            secondary: space.taller_side(),
        }
    } else if relative_x > rules.trailing_cutoff && space.left >= rules.side_space {
        LayoutStrategy {
            name: StrategyName::LeftSide,
            primary: Placement::Left,
            secondary: space.taller_side(),
        }
    } else {
        LayoutStrategy {
            name: StrategyName::Adaptive,
            primary: space.taller_side(),
            secondary: space.wider_side(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_hd() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    #[test]
    fn test_free_space() {
        let space = FreeSpace::around(&Rect::new(500, 0, 345, 60), &full_hd());
        assert_eq!(space.below, 1020);
        assert_eq!(space.above, 0);
        assert_eq!(space.left, 500);
        assert_eq!(space.right, 1920 - 845);
    }

    #[test]
    fn test_header_at_top_opens_below() {
        let strategy = determine_strategy(&Rect::new(500, 0, 345, 60), &full_hd(), &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Below);
        assert_eq!(strategy.primary, Placement::Below);
        // Center x = 672.5 → relative 0.35 → opens to the right
        assert_eq!(strategy.secondary, Placement::Right);
    }

    #[test]
    fn test_secondary_flips_past_midpoint() {
        let strategy = determine_strategy(&Rect::new(1200, 100, 345, 60), &full_hd(), &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Below);
        assert_eq!(strategy.secondary, Placement::Left);
    }

    #[test]
    fn test_header_at_bottom_opens_above() {
        let strategy = determine_strategy(&Rect::new(800, 1000, 345, 60), &full_hd(), &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Above);
        assert_eq!(strategy.primary, Placement::Above);
    }

    #[test]
    fn test_below_wins_ties_with_above() {
        // Both sides have at least 400px; below is checked first
        let strategy = determine_strategy(&Rect::new(800, 500, 345, 60), &full_hd(), &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Below);
    }

    #[test]
    fn test_short_display_left_edge_opens_right_side() {
        // 700px tall: neither vertical side reaches 400px
        let work_area = Rect::new(0, 0, 1920, 700);
        let strategy = determine_strategy(&Rect::new(50, 320, 345, 60), &work_area, &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::RightSide);
        assert_eq!(strategy.primary, Placement::Right);
        // below = 320, above = 320 → not strictly greater → above
        assert_eq!(strategy.secondary, Placement::Above);
    }

    #[test]
    fn test_short_display_right_edge_opens_left_side() {
        let work_area = Rect::new(0, 0, 1920, 700);
        let strategy = determine_strategy(&Rect::new(1500, 300, 345, 60), &work_area, &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::LeftSide);
        assert_eq!(strategy.primary, Placement::Left);
        // below = 340 > above = 300
        assert_eq!(strategy.secondary, Placement::Below);
    }

    #[test]
    fn test_short_display_center_is_adaptive() {
        let work_area = Rect::new(0, 0, 1920, 700);
        let strategy = determine_strategy(&Rect::new(700, 250, 345, 60), &work_area, &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Adaptive);
        // below = 390 > above = 250
        assert_eq!(strategy.primary, Placement::Below);
        // right = 875 > left = 700
        assert_eq!(strategy.secondary, Placement::Right);
    }

    #[test]
    fn test_secondary_work_area_uses_relative_coordinates() {
        // Same header placement as the top-left case, but on a display to the right
        let work_area = Rect::new(1920, 0, 1920, 1080);
        let strategy = determine_strategy(&Rect::new(1920 + 500, 0, 345, 60), &work_area, &StrategyRules::default());
        assert_eq!(strategy.name, StrategyName::Below);
        assert_eq!(strategy.secondary, Placement::Right);
    }
}
