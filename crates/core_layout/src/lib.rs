//! Glasspane Core Layout
//!
//! Platform-agnostic geometry for a small "header" window and the companion
//! windows that hang off it.
//!
//! This crate only answers *where* things go:
//! - Which display a window belongs to (`display`)
//! - Which side of the header companion panels open on (`strategy`)
//! - Edge snapping and off-screen targets for header motion (`edge`)
//! - Concrete bounds for companion and auxiliary windows (`positioner`)
//! - The curves used to interpolate header motion (`easing`)
//!
//! Nothing here touches a window or a clock. Callers feed in snapshots and
//! apply the results themselves.

pub mod display;
pub mod easing;
pub mod edge;
pub mod positioner;
pub mod strategy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use display::{map_between_displays, Display, DisplayResolver};
pub use easing::{lerp, Easing};
pub use edge::{flush_origin, hidden_origin, nearest_edge, Direction, Edge};
pub use positioner::{
    overlaps_with_margin, position_at_trigger, position_auxiliary, position_companions,
    AuxiliaryAnchor, AuxiliaryPlacement, AuxiliaryRules, CompanionPlacement, CompanionRules,
};
pub use strategy::{determine_strategy, FreeSpace, LayoutStrategy, Placement, StrategyName, StrategyRules};

/// Unique identifier for a display, as reported by the host.
pub type DisplayId = u64;

/// Errors that can occur while building layout inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("No displays available")]
    NoDisplays,

    #[error("Display {0} has an empty work area")]
    EmptyWorkArea(DisplayId),
}

/// A point in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size.
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from an origin and a size.
    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Horizontal center, unrounded.
    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    /// Vertical center, unrounded.
    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    /// Same size, different origin.
    pub fn moved_to(&self, origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, self.width, self.height)
    }

    /// Check whether a point lies inside this rectangle.
    ///
    /// The left/top edges are inclusive and the right/bottom edges exclusive,
    /// so adjacent displays never both claim the same point.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && x < self.right() as f64 && y >= self.y as f64 && y < self.bottom() as f64
    }

    /// Check whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Squared distance from a point to the closest point of this rectangle.
    /// Zero when the point is inside.
    pub fn distance_sq_to(&self, x: f64, y: f64) -> f64 {
        let dx = (self.x as f64 - x).max(0.0).max(x - self.right() as f64);
        let dy = (self.y as f64 - y).max(0.0).max(y - self.bottom() as f64);
        dx * dx + dy * dy
    }

    /// Clamp an origin so a window of `size` stays inside this rectangle,
    /// keeping `margin` pixels of clearance on every side.
    ///
    /// When the window is larger than the available room the leading edge
    /// wins, matching how the positioners treat oversize panels.
    pub fn clamp_origin(&self, origin: Point, size: Size, margin: i32) -> Point {
        let min_x = self.x + margin;
        let max_x = self.right() - size.width - margin;
        let min_y = self.y + margin;
        let max_y = self.bottom() - size.height - margin;
        Point::new(origin.x.min(max_x).max(min_x), origin.y.min(max_y).max(min_y))
    }
}
