// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas geometry primitives.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Below this magnitude two segments are treated as parallel
const PARALLEL_EPSILON: f64 = 1e-9;

/// A point (or offset) in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of a box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Size {
    /// Create a new size
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub origin: Point,
    /// Extent
    pub size: Size,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Bottom-right corner
    pub fn max(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    /// Center point
    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Point) -> bool {
        let max = self.max();
        point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let (a, b) = (self.max(), other.max());
        let origin = Point::new(
            self.origin.x.min(other.origin.x),
            self.origin.y.min(other.origin.y),
        );
        Rect::new(origin, Size::new(a.x.max(b.x) - origin.x, a.y.max(b.y) - origin.y))
    }
}

/// A straight line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point
    pub start: Point,
    /// End point
    pub end: Point,
}

impl Segment {
    /// Create a new segment
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Determinant-based intersection test.
    ///
    /// Parallel (including collinear) segments never intersect. Otherwise the
    /// segments intersect when both interpolation parameters lie in `[0, 1]`.
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;

        let denom = d1.x * d2.y - d1.y * d2.x;
        if denom.abs() < PARALLEL_EPSILON {
            return false;
        }

        let offset = other.start - self.start;
        let t = (offset.x * d2.y - offset.y * d2.x) / denom;
        let u = (offset.x * d1.y - offset.y * d1.x) / denom;

        (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(Point::ZERO, Size::new(400.0, 300.0));
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(400.0, 300.0)));
        assert!(!rect.contains(Point::new(400.1, 10.0)));
        assert_eq!(rect.center(), Point::new(200.0, 150.0));
    }

    #[test]
    fn test_crossing_segments() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_parallel_segments_never_intersect() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let b = Segment::new(Point::new(0.0, 5.0), Point::new(10.0, 5.0));
        assert!(!a.intersects(&b));

        // Collinear and overlapping still counts as parallel
        let c = Segment::new(Point::new(5.0, 0.0), Point::new(15.0, 0.0));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_segments_that_would_meet_if_extended() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        let b = Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_touching_endpoint_counts() {
        let a = Segment::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let b = Segment::new(Point::new(5.0, 5.0), Point::new(10.0, 0.0));
        assert!(a.intersects(&b));
    }
}
