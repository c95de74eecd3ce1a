//! Geometry primitives for layout computation.
//!
//! All coordinates are logical screen pixels. Fractional values appear during
//! weight math; rects pushed to the backend are rounded at seam boundaries so
//! sibling extents always sum back to the parent extent.

use std::fmt;

/// A point in logical screen coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A size in logical screen coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

/// A rectangle: location plus size.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub loc: Point,
    pub size: Size,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

impl Rect {
    pub fn from_loc_and_size(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            loc: Point::new(x, y),
            size: Size::new(w, h),
        }
    }

    pub fn left(&self) -> f64 {
        self.loc.x
    }

    pub fn right(&self) -> f64 {
        self.loc.x + self.size.w
    }

    pub fn top(&self) -> f64 {
        self.loc.y
    }

    pub fn bottom(&self) -> f64 {
        self.loc.y + self.size.h
    }

    /// Position of the rect's near edge along an axis.
    pub fn pos(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.loc.x,
            Axis::Vertical => self.loc.y,
        }
    }

    /// Extent of the rect along an axis.
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.size.w,
            Axis::Vertical => self.size.h,
        }
    }

    pub fn set_pos(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Horizontal => self.loc.x = value,
            Axis::Vertical => self.loc.y = value,
        }
    }

    pub fn set_extent(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Horizontal => self.size.w = value,
            Axis::Vertical => self.size.h = value,
        }
    }

    /// Shrinks the rect by per-edge insets, clamping the size at zero.
    pub fn inset(&self, top: f64, bottom: f64, left: f64, right: f64) -> Self {
        let w = (self.size.w - left - right).max(0.);
        let h = (self.size.h - top - bottom).max(0.);
        Self::from_loc_and_size(self.loc.x + left, self.loc.y + top, w, h)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.loc.x + self.size.w / 2.,
            self.loc.y + self.size.h / 2.,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.size.w, self.size.h, self.loc.x, self.loc.y
        )
    }
}

/// Axis of a container orientation or a resize dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn perpendicular(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// Sign of a movement or an edge along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Positive,
}

impl Sign {
    pub fn flip(self) -> Self {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Positive => Sign::Negative,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Sign::Negative => -1.,
            Sign::Positive => 1.,
        }
    }
}

/// Cardinal direction for navigation and movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Up | Direction::Down => Axis::Vertical,
        }
    }

    pub fn sign(self) -> Sign {
        match self {
            Direction::Left | Direction::Up => Sign::Negative,
            Direction::Right | Direction::Down => Sign::Positive,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl From<trellis_ipc::Direction> for Direction {
    fn from(value: trellis_ipc::Direction) -> Self {
        match value {
            trellis_ipc::Direction::Left => Direction::Left,
            trellis_ipc::Direction::Right => Direction::Right,
            trellis_ipc::Direction::Up => Direction::Up,
            trellis_ipc::Direction::Down => Direction::Down,
        }
    }
}

/// Splits a span into cells separated by `gap`, one cell per entry of
/// `extents`, rounding the seam positions so the rounded cells tile the span
/// exactly.
///
/// Returns `(position, extent)` pairs. The caller is responsible for making
/// the extents fit: cells are placed at `start + rounded cumulative extent +
/// i * gap`.
pub fn split_with_gaps(start: f64, extents: &[f64], gap: f64) -> Vec<(f64, f64)> {
    let mut cells = Vec::with_capacity(extents.len());
    let mut cumulative = 0.;
    let mut prev_seam = 0.;
    for (i, extent) in extents.iter().enumerate() {
        cumulative += extent;
        let seam = cumulative.round();
        let pos = start + prev_seam + i as f64 * gap;
        cells.push((pos, seam - prev_seam));
        prev_seam = seam;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_with_gaps_tiles_the_span() {
        let cells = split_with_gaps(0., &[293.3333, 293.3333, 293.3333], 10.);
        assert_eq!(cells, vec![(0., 293.), (303., 294.), (607., 293.)]);

        let total: f64 = cells.iter().map(|(_, e)| e).sum::<f64>() + 2. * 10.;
        assert_eq!(total, 900.);
    }

    #[test]
    fn split_without_gap_is_contiguous() {
        let cells = split_with_gaps(100., &[250.5, 250.5], 0.);
        assert_eq!(cells, vec![(100., 251.), (351., 250.)]);
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(Direction::Left.axis(), Axis::Horizontal);
        assert_eq!(Direction::Down.axis(), Axis::Vertical);
        assert_eq!(Direction::Left.sign(), Sign::Negative);
        assert_eq!(Direction::Down.sign(), Sign::Positive);
        assert_eq!(Direction::Up.opposite(), Direction::Down);
    }

    #[test]
    fn rect_inset_clamps_at_zero() {
        let rect = Rect::from_loc_and_size(0., 0., 100., 40.);
        let inset = rect.inset(30., 30., 10., 10.);
        assert_eq!(inset, Rect::from_loc_and_size(10., 30., 80., 0.));
    }
}
