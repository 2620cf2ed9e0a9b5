//! Directions, edges, and the target positions derived from them.

use crate::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A movement direction for the header window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit offset on each axis, screen coordinates (y grows downward).
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The work-area edge this direction points at.
    pub fn edge(self) -> Edge {
        match self {
            Direction::Up => Edge::Top,
            Direction::Down => Edge::Bottom,
            Direction::Left => Edge::Left,
            Direction::Right => Edge::Right,
        }
    }
}

/// One edge of a work area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    /// Tie-break order for [`nearest_edge`].
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];
}

/// The work-area edge closest to the window's center.
///
/// Distances are compared four ways; on a tie the earlier edge in
/// [`Edge::ALL`] wins.
pub fn nearest_edge(bounds: &Rect, work_area: &Rect) -> Edge {
    let cx = bounds.center_x();
    let cy = bounds.center_y();
    let distance = |edge: Edge| match edge {
        Edge::Top => cy - work_area.y as f64,
        Edge::Bottom => work_area.bottom() as f64 - cy,
        Edge::Left => cx - work_area.x as f64,
        Edge::Right => work_area.right() as f64 - cx,
    };

    let mut nearest = Edge::Top;
    let mut best = distance(Edge::Top);
    for edge in Edge::ALL.into_iter().skip(1) {
        let d = distance(edge);
        if d < best {
            best = d;
            nearest = edge;
        }
    }
    nearest
}

/// Origin that puts the window flush against `edge`, keeping the other axis.
pub fn flush_origin(bounds: &Rect, work_area: &Rect, edge: Edge) -> Point {
    match edge {
        Edge::Top => Point::new(bounds.x, work_area.y),
        Edge::Bottom => Point::new(bounds.x, work_area.bottom() - bounds.height),
        Edge::Left => Point::new(work_area.x, bounds.y),
        Edge::Right => Point::new(work_area.right() - bounds.width, bounds.y),
    }
}

/// Origin that puts the window entirely past `edge`, `margin` pixels clear.
pub fn hidden_origin(bounds: &Rect, work_area: &Rect, edge: Edge, margin: i32) -> Point {
    match edge {
        Edge::Top => Point::new(bounds.x, work_area.y - bounds.height - margin),
        Edge::Bottom => Point::new(bounds.x, work_area.bottom() + margin),
        Edge::Left => Point::new(work_area.x - bounds.width - margin, bounds.y),
        Edge::Right => Point::new(work_area.right() + margin, bounds.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_area() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    #[test]
    fn test_direction_edge_mapping() {
        assert_eq!(Direction::Up.edge(), Edge::Top);
        assert_eq!(Direction::Down.edge(), Edge::Bottom);
        assert_eq!(Direction::Left.offset(), (-1, 0));
        assert_eq!(Direction::Down.offset(), (0, 1));
    }

    #[test]
    fn test_nearest_edge() {
        assert_eq!(nearest_edge(&Rect::new(800, 0, 345, 60), &work_area()), Edge::Top);
        assert_eq!(nearest_edge(&Rect::new(800, 1000, 345, 60), &work_area()), Edge::Bottom);
        assert_eq!(nearest_edge(&Rect::new(0, 500, 345, 60), &work_area()), Edge::Left);
        assert_eq!(nearest_edge(&Rect::new(1575, 500, 345, 60), &work_area()), Edge::Right);
    }

    #[test]
    fn test_nearest_edge_tie_prefers_top() {
        // Square work area, centered window: all four distances equal
        let work_area = Rect::new(0, 0, 1000, 1000);
        assert_eq!(nearest_edge(&Rect::new(450, 450, 100, 100), &work_area), Edge::Top);
    }

    #[test]
    fn test_flush_origin_keeps_other_axis() {
        let bounds = Rect::new(500, 300, 345, 60);
        let work_area = Rect::new(0, 25, 1920, 1015);
        assert_eq!(flush_origin(&bounds, &work_area, Edge::Top), Point::new(500, 25));
        assert_eq!(flush_origin(&bounds, &work_area, Edge::Bottom), Point::new(500, 980));
        assert_eq!(flush_origin(&bounds, &work_area, Edge::Left), Point::new(0, 300));
        assert_eq!(flush_origin(&bounds, &work_area, Edge::Right), Point::new(1575, 300));
    }

    #[test]
    fn test_hidden_origin_is_off_screen() {
        let bounds = Rect::new(500, 300, 345, 60);
        let wa = work_area();

        assert_eq!(hidden_origin(&bounds, &wa, Edge::Right, 20), Point::new(1940, 300));
        assert_eq!(hidden_origin(&bounds, &wa, Edge::Left, 20), Point::new(-365, 300));
        assert_eq!(hidden_origin(&bounds, &wa, Edge::Top, 20), Point::new(500, -80));
        assert_eq!(hidden_origin(&bounds, &wa, Edge::Bottom, 20), Point::new(500, 1100));

        for edge in Edge::ALL {
            let hidden = bounds.moved_to(hidden_origin(&bounds, &wa, edge, 20));
            assert!(!hidden.intersects(&wa), "{:?} still overlaps", edge);
        }
    }
}
