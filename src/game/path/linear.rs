//! Straight-line path

use super::{distance, expect_points, lerp, PathError, PathType, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearPath {
    pub start: Point,
    pub end: Point,
}

impl LinearPath {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn position(&self, t: f32) -> Point {
        lerp(self.start, self.end, t)
    }

    pub fn length(&self) -> f32 {
        distance(self.start, self.end)
    }

    pub fn control_points(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }

    pub fn from_control_points(points: &[Point]) -> Result<Self, PathError> {
        expect_points(PathType::Linear, points, 2)?;
        Ok(Self::new(points[0], points[1]))
    }
}
