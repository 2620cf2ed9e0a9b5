//! Concrete bounds for companion and auxiliary windows.
//!
//! Companion bounds are always derived from the header's current bounds and
//! the active strategy. The functions here are pure, so calling them twice
//! with the same inputs yields the same output.

use crate::{LayoutStrategy, Placement, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Spacing rules for the companion row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionRules {
    /// Horizontal gap between two companions shown side by side.
    pub gap: i32,
    /// Minimum clearance to the work-area edges.
    pub edge_margin: i32,
}

impl Default for CompanionRules {
    fn default() -> Self {
        Self {
            gap: 8,
            edge_margin: 8,
        }
    }
}

/// Pixel constants for the auxiliary (settings-like) panel.
///
/// These were tuned by eye; they are not derived from anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryRules {
    /// Gap between the header and the auxiliary panel.
    pub padding: i32,
    /// Inset of the trigger point from the header's trailing edge.
    pub trigger_inset: i32,
    /// Minimum clearance to the work-area edges.
    pub screen_margin: i32,
    /// Companions closer than this count as overlapping.
    pub overlap_margin: i32,
    /// Distance below a trigger button when opened from one.
    pub trigger_drop: i32,
}

impl Default for AuxiliaryRules {
    fn default() -> Self {
        Self {
            padding: 5,
            trigger_inset: 17,
            screen_margin: 10,
            overlap_margin: 10,
            trigger_drop: 31,
        }
    }
}

/// Output of [`position_companions`]. `None` for companions not shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompanionPlacement {
    pub first: Option<Rect>,
    pub second: Option<Rect>,
}

/// Which anchor the auxiliary panel ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryAnchor {
    /// Under the header, aligned to the trigger point.
    Trigger,
    /// Beside the header's trailing edge.
    Trailing,
    /// Beside the header's leading edge.
    Leading,
    /// Above the header.
    Above,
    /// Everything overlapped; flush under the header's trailing edge.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryPlacement {
    pub rect: Rect,
    pub anchor: AuxiliaryAnchor,
}

/// Check whether two rectangles overlap or come within `margin` of each other.
pub fn overlaps_with_margin(a: &Rect, b: &Rect, margin: i32) -> bool {
    !(a.right() + margin < b.x
        || b.right() + margin < a.x
        || a.bottom() + margin < b.y
        || b.bottom() + margin < a.y)
}

/// Vertical offset (relative to the work area) for a companion of `height`.
///
/// Flush against the header: below its bottom edge, or above its top edge.
/// Strategies whose primary axis is horizontal still stack below.
fn companion_y(header: &Rect, work_area: &Rect, primary: Placement, height: i32) -> f64 {
    let top = (header.y - work_area.y) as f64;
    match primary {
        Placement::Above => top - height as f64,
        Placement::Below | Placement::Left | Placement::Right => top + header.height as f64,
    }
}

/// Place the visible companion windows around the header.
///
/// With two companions they sit side by side, `gap` apart, centred as a group
/// on the header's horizontal centre, and slide inward as a unit if either
/// would cross a screen edge. A row wider than the work area overlaps
/// rather than leaving it. A lone companion is centred on the header and
/// clamped on both axes.
pub fn position_companions(
    header: &Rect,
    work_area: &Rect,
    strategy: &LayoutStrategy,
    first: Option<Size>,
    second: Option<Size>,
    rules: &CompanionRules,
) -> CompanionPlacement {
    let header_center = header.x as f64 - work_area.x as f64 + header.width as f64 / 2.0;
    let screen_width = work_area.width as f64;
    let screen_height = work_area.height as f64;
    let gap = rules.gap as f64;
    let margin = rules.edge_margin as f64;

    let absolute = |x_rel: f64, y_rel: f64, size: Size| {
        Rect::new(
            (x_rel + work_area.x as f64).round() as i32,
            (y_rel + work_area.y as f64).round() as i32,
            size.width,
            size.height,
        )
    };

    match (first, second) {
        (Some(a), Some(b)) => {
            let (wa, wb) = (a.width as f64, b.width as f64);
            let combined = wa + gap + wb;

            let mut a_x = header_center - combined / 2.0;
            let mut b_x = a_x + wa + gap;

            if a_x < margin {
                a_x = margin;
                b_x = a_x + wa + gap;
            }
            if b_x + wb > screen_width - margin {
                b_x = screen_width - margin - wb;
                a_x = b_x - wa - gap;
            }
            // Row wider than the room: each panel stays on screen on its
            // own, leading edge wins
            a_x = a_x.min(screen_width - wa).max(0.0);
            b_x = b_x.min(screen_width - wb).max(0.0);

            // Keep the row aligned: one y for both, from the taller panel
            let tallest = a.height.max(b.height);
            let y = companion_y(header, work_area, strategy.primary, tallest);
            let y = y.min(screen_height - tallest as f64).max(0.0);

            CompanionPlacement {
                first: Some(absolute(a_x, y, a)),
                second: Some(absolute(b_x, y, b)),
            }
        }
        (Some(only), None) | (None, Some(only)) => {
            let x = header_center - only.width as f64 / 2.0;
            let y = companion_y(header, work_area, strategy.primary, only.height);

            let x = x.min(screen_width - only.width as f64 - margin).max(margin);
            let y = y.min(screen_height - only.height as f64 - margin).max(margin);

            let rect = absolute(x, y, only);
            if first.is_some() {
                CompanionPlacement {
                    first: Some(rect),
                    second: None,
                }
            } else {
                CompanionPlacement {
                    first: None,
                    second: Some(rect),
                }
            }
        }
        (None, None) => CompanionPlacement::default(),
    }
}

/// Place the auxiliary panel near the header while avoiding `obstacles`.
///
/// The default spot hangs under the header's trigger point. If that comes
/// within the overlap margin of any obstacle, try beside the trailing edge,
/// then beside the leading edge, then above the header. The result is always
/// clamped into the work area.
pub fn position_auxiliary(
    header: &Rect,
    work_area: &Rect,
    size: Size,
    obstacles: &[Rect],
    rules: &AuxiliaryRules,
) -> AuxiliaryPlacement {
    let margin = rules.screen_margin;
    let mut anchor = AuxiliaryAnchor::Trigger;
    let mut x = header.right() - size.width - rules.trigger_inset;
    let mut y = header.bottom() + rules.padding;

    let candidate = Rect::new(x, y, size.width, size.height);
    let blocked = obstacles
        .iter()
        .any(|other| overlaps_with_margin(&candidate, other, rules.overlap_margin));

    if blocked {
        anchor = AuxiliaryAnchor::Trailing;
        x = header.right() + rules.padding;
        y = header.y;

        if x + size.width > work_area.right() - margin {
            anchor = AuxiliaryAnchor::Leading;
            x = header.x - size.width - rules.padding;
        }

        if x < work_area.x + margin {
            anchor = AuxiliaryAnchor::Above;
            x = header.right() - size.width - rules.trigger_inset;
            y = header.y - size.height - rules.padding;

            if y < work_area.y + margin {
                anchor = AuxiliaryAnchor::Fallback;
                x = header.right() - size.width;
                y = header.bottom() + rules.padding;
            }
        }
    }

    let origin = work_area.clamp_origin(Point::new(x, y), size, margin);
    AuxiliaryPlacement {
        rect: Rect::from_parts(origin, size),
        anchor,
    }
}

/// Place the auxiliary panel under a trigger control inside the header.
///
/// `trigger` is relative to the header's origin. The panel is centred on the
/// trigger horizontally and dropped `trigger_drop` pixels below it.
pub fn position_at_trigger(
    header: &Rect,
    trigger: &Rect,
    work_area: &Rect,
    size: Size,
    rules: &AuxiliaryRules,
) -> Rect {
    let x = (header.x as f64 + trigger.center_x() - size.width as f64 / 2.0).round() as i32;
    let y = header.y + trigger.bottom() + rules.trigger_drop;
    let origin = work_area.clamp_origin(Point::new(x, y), size, rules.screen_margin);
    Rect::from_parts(origin, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{determine_strategy, StrategyName, StrategyRules};

    fn work_area() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    fn below() -> LayoutStrategy {
        LayoutStrategy {
            name: StrategyName::Below,
            primary: Placement::Below,
            secondary: Placement::Right,
        }
    }

    fn above() -> LayoutStrategy {
        LayoutStrategy {
            name: StrategyName::Above,
            primary: Placement::Above,
            secondary: Placement::Right,
        }
    }

    #[test]
    fn test_two_companions_centered_on_header() {
        // Header center x = 700
        let header = Rect::new(700 - 172, 0, 344, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &below(),
            Some(Size::new(400, 300)),
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );

        assert_eq!(placement.first, Some(Rect::new(196, 60, 400, 300)));
        assert_eq!(placement.second, Some(Rect::new(604, 60, 600, 350)));
    }

    #[test]
    fn test_two_companions_slide_in_from_left_edge() {
        let header = Rect::new(0, 0, 345, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &below(),
            Some(Size::new(400, 300)),
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );

        assert_eq!(placement.first.map(|r| r.x), Some(8));
        assert_eq!(placement.second.map(|r| r.x), Some(8 + 400 + 8));
    }

    #[test]
    fn test_two_companions_slide_in_from_right_edge() {
        let header = Rect::new(1920 - 345, 0, 345, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &below(),
            Some(Size::new(400, 300)),
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );

        let second = placement.second.unwrap();
        let first = placement.first.unwrap();
        assert_eq!(second.right(), 1920 - 8);
        assert_eq!(first.right() + 8, second.x);
    }

    #[test]
    fn test_two_companions_above_align_to_tallest() {
        let header = Rect::new(800, 900, 345, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &above(),
            Some(Size::new(400, 300)),
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );

        assert_eq!(placement.first.map(|r| r.y), Some(900 - 350));
        assert_eq!(placement.second.map(|r| r.y), Some(900 - 350));
    }

    #[test]
    fn test_single_companion_centered_below() {
        let header = Rect::new(500, 0, 345, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &below(),
            None,
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );

        assert!(placement.first.is_none());
        // 672.5 - 300 = 372.5 → rounds to 373
        assert_eq!(placement.second, Some(Rect::new(373, 60, 600, 350)));
    }

    #[test]
    fn test_single_companion_clamped_with_margin() {
        let header = Rect::new(1700, 0, 200, 60);
        let placement = position_companions(
            &header,
            &work_area(),
            &below(),
            Some(Size::new(400, 300)),
            None,
            &CompanionRules::default(),
        );

        assert_eq!(placement.first.map(|r| r.x), Some(1920 - 400 - 8));
        assert!(placement.second.is_none());
    }

    #[test]
    fn test_no_companions() {
        let placement = position_companions(
            &Rect::new(0, 0, 345, 60),
            &work_area(),
            &below(),
            None,
            None,
            &CompanionRules::default(),
        );
        assert_eq!(placement, CompanionPlacement::default());
    }

    #[test]
    fn test_companions_respect_work_area_origin() {
        let work_area = Rect::new(1920, 25, 2560, 1415);
        let header = Rect::new(1920 + 500, 25, 345, 60);
        let placement = position_companions(
            &header,
            &work_area,
            &below(),
            Some(Size::new(400, 300)),
            None,
            &CompanionRules::default(),
        );

        let rect = placement.first.unwrap();
        assert_eq!(rect.y, 25 + 60);
        assert!(work_area.contains_rect(&rect));
    }

    #[test]
    fn test_companions_always_inside_work_area() {
        let sizes = [
            (Some(Size::new(400, 300)), Some(Size::new(600, 350))),
            (Some(Size::new(400, 700)), Some(Size::new(600, 350))),
            (Some(Size::new(400, 300)), None),
            (None, Some(Size::new(600, 350))),
        ];

        for work_area in [Rect::new(0, 0, 1920, 1040), Rect::new(-1000, 0, 1000, 800)] {
            for x in (work_area.x..=work_area.right() - 345).step_by(97) {
                for y in (work_area.y..=work_area.bottom() - 60).step_by(53) {
                    let header = Rect::new(x, y, 345, 60);
                    let strategy = determine_strategy(&header, &work_area, &StrategyRules::default());
                    for (first, second) in sizes {
                        let placement = position_companions(
                            &header,
                            &work_area,
                            &strategy,
                            first,
                            second,
                            &CompanionRules::default(),
                        );
                        for rect in [placement.first, placement.second].into_iter().flatten() {
                            assert!(
                                work_area.contains_rect(&rect),
                                "{:?} escapes work area for header {:?}",
                                rect,
                                header
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_companion_row_wider_than_work_area() {
        let work_area = Rect::new(0, 0, 1000, 1080);
        let header = Rect::new(300, 0, 345, 60);
        let strategy = determine_strategy(&header, &work_area, &StrategyRules::default());
        let placement = position_companions(
            &header,
            &work_area,
            &strategy,
            Some(Size::new(400, 300)),
            Some(Size::new(600, 350)),
            &CompanionRules::default(),
        );
        let first = placement.first.unwrap();
        let second = placement.second.unwrap();
        assert_eq!(first.x, 0);
        assert_eq!(second.x, 392);
        assert!(work_area.contains_rect(&first));
        assert!(work_area.contains_rect(&second));
        assert_eq!(first.y, second.y);
    }

    #[test]
    fn test_positioning_is_idempotent() {
        let header = Rect::new(321, 456, 345, 60);
        let strategy = determine_strategy(&header, &work_area(), &StrategyRules::default());
        let run = || {
            position_companions(
                &header,
                &work_area(),
                &strategy,
                Some(Size::new(400, 300)),
                Some(Size::new(600, 350)),
                &CompanionRules::default(),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_overlaps_with_margin() {
        let a = Rect::new(0, 0, 100, 100);
        assert!(overlaps_with_margin(&a, &Rect::new(50, 50, 100, 100), 10));
        // 5px apart counts as overlapping with a 10px margin
        assert!(overlaps_with_margin(&a, &Rect::new(105, 0, 100, 100), 10));
        assert!(!overlaps_with_margin(&a, &Rect::new(111, 0, 100, 100), 10));
    }

    #[test]
    fn test_auxiliary_default_under_trigger() {
        let header = Rect::new(800, 100, 345, 60);
        let placement = position_auxiliary(
            &header,
            &work_area(),
            Size::new(400, 600),
            &[],
            &AuxiliaryRules::default(),
        );

        assert_eq!(placement.anchor, AuxiliaryAnchor::Trigger);
        assert_eq!(placement.rect, Rect::new(1145 - 400 - 17, 165, 400, 600));
    }

    #[test]
    fn test_auxiliary_moves_beside_trailing_edge() {
        let header = Rect::new(600, 100, 345, 60);
        let companion = Rect::new(600, 160, 400, 300);
        let placement = position_auxiliary(
            &header,
            &work_area(),
            Size::new(400, 600),
            &[companion],
            &AuxiliaryRules::default(),
        );

        assert_eq!(placement.anchor, AuxiliaryAnchor::Trailing);
        assert_eq!(placement.rect, Rect::new(945 + 5, 100, 400, 600));
    }

    #[test]
    fn test_auxiliary_moves_beside_leading_edge() {
        let header = Rect::new(1400, 100, 345, 60);
        let companion = Rect::new(1300, 160, 400, 300);
        let placement = position_auxiliary(
            &header,
            &work_area(),
            Size::new(400, 600),
            &[companion],
            &AuxiliaryRules::default(),
        );

        assert_eq!(placement.anchor, AuxiliaryAnchor::Leading);
        assert_eq!(placement.rect, Rect::new(1400 - 400 - 5, 100, 400, 600));
    }

    #[test]
    fn test_auxiliary_moves_above_when_both_sides_blocked() {
        // Narrow display: neither side has room for a 400px panel
        let work_area = Rect::new(0, 0, 1000, 1080);
        let header = Rect::new(300, 700, 345, 60);
        let companion = Rect::new(200, 760, 600, 300);
        let placement = position_auxiliary(
            &header,
            &work_area,
            Size::new(400, 600),
            &[companion],
            &AuxiliaryRules::default(),
        );

        assert_eq!(placement.anchor, AuxiliaryAnchor::Above);
        assert_eq!(placement.rect, Rect::new(645 - 400 - 17, 700 - 600 - 5, 400, 600));
    }

    #[test]
    fn test_auxiliary_fallback_still_inside_work_area() {
        // Nothing fits: narrow and short, header near the top
        let work_area = Rect::new(0, 0, 1000, 800);
        let header = Rect::new(300, 20, 345, 60);
        let companion = Rect::new(200, 80, 600, 300);
        let placement = position_auxiliary(
            &header,
            &work_area,
            Size::new(400, 600),
            &[companion],
            &AuxiliaryRules::default(),
        );

        assert_eq!(placement.anchor, AuxiliaryAnchor::Fallback);
        assert!(work_area.contains_rect(&placement.rect));
        // Flush with the header's trailing edge, back under it
        assert_eq!(placement.rect, Rect::new(645 - 400, 80 + 5, 400, 600));
    }

    #[test]
    fn test_auxiliary_always_inside_work_area() {
        let work_area = Rect::new(0, 0, 1920, 1040);
        let size = Size::new(400, 600);
        for x in (0..=1920 - 345).step_by(113) {
            for y in (0..=1040 - 60).step_by(71) {
                let header = Rect::new(x, y, 345, 60);
                let companion = Rect::new(x, y + 60, 600, 350);
                let placement =
                    position_auxiliary(&header, &work_area, size, &[companion], &AuxiliaryRules::default());
                assert!(
                    work_area.contains_rect(&placement.rect),
                    "{:?} escapes work area for header {:?}",
                    placement,
                    header
                );
            }
        }
    }

    #[test]
    fn test_position_at_trigger() {
        let header = Rect::new(800, 100, 345, 60);
        // Gear button at the right end of the header
        let trigger = Rect::new(300, 15, 30, 30);
        let rect = position_at_trigger(
            &header,
            &trigger,
            &work_area(),
            Size::new(400, 600),
            &AuxiliaryRules::default(),
        );

        assert_eq!(rect, Rect::new(800 + 315 - 200, 100 + 45 + 31, 400, 600));
    }

    #[test]
    fn test_position_at_trigger_clamps() {
        let header = Rect::new(1575, 500, 345, 60);
        let trigger = Rect::new(300, 15, 30, 30);
        let rect = position_at_trigger(
            &header,
            &trigger,
            &work_area(),
            Size::new(400, 600),
            &AuxiliaryRules::default(),
        );

        assert_eq!(rect.x, 1920 - 400 - 10);
        assert_eq!(rect.y, 1080 - 600 - 10);
    }
}
