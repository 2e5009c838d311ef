//! Point keys and small planar helpers.

use std::cmp::Ordering;

use crate::epsilon::cmp_f64;

/// A 2-D point, the key type of [`QuadTree`](crate::QuadTree).
///
/// `PartialEq` compares coordinates exactly. Map lookups match keys with
/// [`Point::approx_eq`] instead, which tolerates a machine-epsilon difference
/// on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Epsilon-tolerant equality on both axes.
    #[inline]
    pub fn approx_eq(&self, other: &Point) -> bool {
        cmp_f64(self.x, other.x) == Ordering::Equal && cmp_f64(self.y, other.y) == Ordering::Equal
    }

    /// Euclidean distance.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Manhattan (taxicab) distance: the sum of the absolute axis differences.
    #[inline]
    pub fn manhattan_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    #[inline]
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Axis-aligned rectangle given as `[min, max]` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Rect {
    #[inline]
    pub const fn new(x: [f64; 2], y: [f64; 2]) -> Self {
        Self { x, y }
    }

    /// Whether `point` lies inside or on the edge of the rectangle.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x[0] && point.x <= self.x[1] && point.y >= self.y[0] && point.y <= self.y[1]
    }
}
