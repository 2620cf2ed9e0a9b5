//! Display lookup.
//!
//! A [`DisplayResolver`] wraps one snapshot of the host's display list. It is
//! cheap to build and meant to be rebuilt whenever geometry depends on
//! "which screen", never cached across display changes.

use crate::{DisplayId, LayoutError, Point, Rect};
use serde::{Deserialize, Serialize};

/// Fallback display used when the host reports no displays at all.
const FALLBACK_WIDTH: i32 = 1920;
const FALLBACK_HEIGHT: i32 = 1080;
const FALLBACK_WORK_AREA_HEIGHT: i32 = 1040;

/// A physical display as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    /// Host-assigned identifier.
    pub id: DisplayId,
    /// Full display bounds.
    pub bounds: Rect,
    /// Usable region, excluding taskbars, docks and menu bars.
    pub work_area: Rect,
    /// Device pixel ratio.
    pub scale_factor: f64,
    /// Whether this is the primary display.
    pub is_primary: bool,
}

impl Display {
    /// Create a non-primary display with a scale factor of 1.0.
    pub fn new(id: DisplayId, bounds: Rect, work_area: Rect) -> Self {
        Self {
            id,
            bounds,
            work_area,
            scale_factor: 1.0,
            is_primary: false,
        }
    }

    /// Mark this display as the primary one.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }
}

/// Resolves windows and identifiers to displays.
///
/// Every lookup succeeds: anything that cannot be matched falls back to the
/// primary display.
#[derive(Debug, Clone)]
pub struct DisplayResolver {
    displays: Vec<Display>,
    primary: usize,
}

impl DisplayResolver {
    /// Build a resolver over a display snapshot.
    ///
    /// The first display flagged primary wins; with none flagged, the first
    /// display is treated as primary.
    pub fn new(displays: Vec<Display>) -> Result<Self, LayoutError> {
        if displays.is_empty() {
            return Err(LayoutError::NoDisplays);
        }
        if let Some(empty) = displays
            .iter()
            .find(|d| d.work_area.width <= 0 || d.work_area.height <= 0)
        {
            return Err(LayoutError::EmptyWorkArea(empty.id));
        }

        let primary = displays.iter().position(|d| d.is_primary).unwrap_or(0);
        Ok(Self { displays, primary })
    }

    /// A single 1920x1080 primary display, used when the host has nothing.
    pub fn fallback() -> Self {
        let display = Display::new(
            0,
            Rect::new(0, 0, FALLBACK_WIDTH, FALLBACK_HEIGHT),
            Rect::new(0, 0, FALLBACK_WIDTH, FALLBACK_WORK_AREA_HEIGHT),
        )
        .primary();
        Self {
            displays: vec![display],
            primary: 0,
        }
    }

    /// All displays in enumeration order.
    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    /// The primary display.
    pub fn primary(&self) -> &Display {
        &self.displays[self.primary]
    }

    /// Look up a display by id without falling back.
    pub fn find(&self, id: DisplayId) -> Option<&Display> {
        self.displays.iter().find(|d| d.id == id)
    }

    /// Look up a display by id, falling back to the primary display.
    pub fn display_by_id(&self, id: DisplayId) -> &Display {
        self.find(id).unwrap_or_else(|| self.primary())
    }

    /// The display whose work area contains the point, or failing that the
    /// display whose work area is closest to it.
    pub fn display_nearest_point(&self, x: f64, y: f64) -> &Display {
        if let Some(display) = self.displays.iter().find(|d| d.work_area.contains_point(x, y)) {
            return display;
        }

        let mut nearest = self.primary();
        let mut best = f64::INFINITY;
        for display in &self.displays {
            let distance = display.work_area.distance_sq_to(x, y);
            if distance < best {
                best = distance;
                nearest = display;
            }
        }
        nearest
    }

    /// The display a window currently belongs to, judged by its center point.
    ///
    /// `None` (absent or destroyed window) resolves to the primary display.
    pub fn current_display(&self, window: Option<&Rect>) -> &Display {
        match window {
            Some(bounds) => self.display_nearest_point(bounds.center_x(), bounds.center_y()),
            None => self.primary(),
        }
    }

    /// Whether `rect` fits entirely inside at least one work area.
    pub fn fits_on_any(&self, rect: &Rect) -> bool {
        self.displays.iter().any(|d| d.work_area.contains_rect(rect))
    }
}

/// Map a window's position from one display onto another.
///
/// The window's offset is expressed as a fraction of the source work area,
/// applied to the target work area, then clamped so the window stays fully
/// inside the target.
pub fn map_between_displays(bounds: &Rect, from: &Display, to: &Display) -> Point {
    let source = from.work_area;
    let target = to.work_area;

    let relative_x = (bounds.x - source.x) as f64 / source.width as f64;
    let relative_y = (bounds.y - source.y) as f64 / source.height as f64;

    let x = target.x as f64 + target.width as f64 * relative_x;
    let y = target.y as f64 + target.height as f64 * relative_y;

    let max_x = (target.right() - bounds.width) as f64;
    let max_y = (target.bottom() - bounds.height) as f64;

    Point::new(
        x.min(max_x).max(target.x as f64).round() as i32,
        y.min(max_y).max(target.y as f64).round() as i32,
    )
}
