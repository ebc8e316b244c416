//! Cubic Bezier path

use super::{distance, expect_points, PathError, PathType, Point};

/// Chord count used to approximate arc length
pub const ARC_SEGMENTS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct BezierPath {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl BezierPath {
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self { p0, p1, p2, p3 }
    }

    pub fn position(&self, t: f32) -> Point {
        let u = 1.0 - t;
        let uu = u * u;
        let tt = t * t;
        let a = uu * u;
        let b = 3.0 * uu * t;
        let c = 3.0 * u * tt;
        let d = tt * t;
        [
            a * self.p0[0] + b * self.p1[0] + c * self.p2[0] + d * self.p3[0],
            a * self.p0[1] + b * self.p1[1] + c * self.p2[1] + d * self.p3[1],
        ]
    }

    /// Sum of chord lengths over `ARC_SEGMENTS` equal steps in t
    pub fn arc_length(&self) -> f32 {
        let mut length = 0.0;
        let mut prev = self.position(0.0);
        for i in 1..=ARC_SEGMENTS {
            let point = self.position(i as f32 / ARC_SEGMENTS as f32);
            length += distance(prev, point);
            prev = point;
        }
        length
    }

    pub fn control_points(&self) -> Vec<Point> {
        vec![self.p0, self.p1, self.p2, self.p3]
    }

    pub fn from_control_points(points: &[Point]) -> Result<Self, PathError> {
        expect_points(PathType::Bezier, points, 4)?;
        Ok(Self::new(points[0], points[1], points[2], points[3]))
    }
}
