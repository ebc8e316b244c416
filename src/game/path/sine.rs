//! Sinusoidal path along a straight base segment
//!
//! The wave offset is applied along the perpendicular of the group anchor
//! segment when one is present. Members of a school are parallel copies of
//! the anchor, so every member shares the same wave axis and the same
//! phase at the same `t`.

use std::f32::consts::TAU;

use super::{distance, expect_points, lerp, PathError, PathType, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct SinePath {
    pub start: Point,
    pub end: Point,
    pub amplitude: f32,
    pub frequency: f32,
    /// Shared group anchor segment
    pub anchor: Option<(Point, Point)>,
}

impl SinePath {
    pub fn new(start: Point, end: Point, amplitude: f32, frequency: f32) -> Self {
        Self {
            start,
            end,
            amplitude,
            frequency,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor_start: Point, anchor_end: Point) -> Self {
        self.anchor = Some((anchor_start, anchor_end));
        self
    }

    fn wave_axis(&self) -> Option<Point> {
        let (a, b) = self.anchor.unwrap_or((self.start, self.end));
        let dx = b[0] - a[0];
        let dy = b[1] - a[1];
        let len = (dx * dx + dy * dy).sqrt();
        (len > f32::EPSILON).then(|| [-dy / len, dx / len])
    }

    pub fn position(&self, t: f32) -> Point {
        let base = lerp(self.start, self.end, t);
        let Some(perp) = self.wave_axis() else {
            return base;
        };
        let offset = (t * self.frequency * TAU).sin() * self.amplitude;
        [base[0] + perp[0] * offset, base[1] + perp[1] * offset]
    }

    /// Base segment length; the wave does not change traversal time
    pub fn length(&self) -> f32 {
        distance(self.start, self.end)
    }

    pub fn control_points(&self) -> Vec<Point> {
        let mut points = vec![self.start, self.end, [self.amplitude, self.frequency]];
        if let Some((a, b)) = self.anchor {
            points.push(a);
            points.push(b);
        }
        points
    }

    pub fn from_control_points(points: &[Point]) -> Result<Self, PathError> {
        expect_points(PathType::Sine, points, 3)?;
        let path = Self::new(points[0], points[1], points[2][0], points[2][1]);
        Ok(match (points.get(3), points.get(4)) {
            (Some(a), Some(b)) => path.with_anchor(*a, *b),
            _ => path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_is_zero_at_endpoints() {
        let path = SinePath::new([0.0, 100.0], [1000.0, 100.0], 40.0, 3.0);
        let start = path.position(0.0);
        let end = path.position(1.0);
        assert!((start[0] - 0.0).abs() < 1e-3 && (start[1] - 100.0).abs() < 1e-3);
        assert!((end[0] - 1000.0).abs() < 1e-2 && (end[1] - 100.0).abs() < 1e-2);
    }

    #[test]
    fn peak_offset_is_perpendicular() {
        // One full wave: peak at t = 0.25
        let path = SinePath::new([0.0, 0.0], [1000.0, 0.0], 50.0, 1.0);
        let p = path.position(0.25);
        assert!((p[0] - 250.0).abs() < 1e-3);
        assert!((p[1] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn school_members_share_phase() {
        let anchor = ([0.0, 200.0], [1000.0, 500.0]);
        let leader = SinePath::new(anchor.0, anchor.1, 30.0, 2.0).with_anchor(anchor.0, anchor.1);
        let follower = SinePath::new([-20.0, 240.0], [980.0, 540.0], 30.0, 2.0)
            .with_anchor(anchor.0, anchor.1);
        for i in 0..=50 {
            let t = i as f32 / 50.0;
            let a = leader.position(t);
            let b = follower.position(t);
            // Constant separation means the two waves move in lockstep
            assert!((b[0] - a[0] + 20.0).abs() < 1e-2);
            assert!((b[1] - a[1] - 40.0).abs() < 1e-2);
        }
    }

    #[test]
    fn anchor_survives_control_points() {
        let path = SinePath::new([0.0, 0.0], [10.0, 0.0], 5.0, 2.0).with_anchor([1.0, 1.0], [11.0, 1.0]);
        let rebuilt = SinePath::from_control_points(&path.control_points()).unwrap();
        assert_eq!(rebuilt, path);
    }

    #[test]
    fn degenerate_segment_has_no_wave() {
        let path = SinePath::new([5.0, 5.0], [5.0, 5.0], 30.0, 2.0);
        assert_eq!(path.position(0.37), [5.0, 5.0]);
    }
}
