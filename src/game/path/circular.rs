//! Elliptical orbit path

use std::f32::consts::{PI, TAU};

use super::{expect_points, PathError, PathType, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct CircularPath {
    pub center: Point,
    pub radius_x: f32,
    pub radius_y: f32,
    /// Radians
    pub start_angle: f32,
    pub clockwise: bool,
}

impl CircularPath {
    pub fn new(center: Point, radius_x: f32, radius_y: f32, start_angle: f32, clockwise: bool) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
            start_angle,
            clockwise,
        }
    }

    pub fn position(&self, t: f32) -> Point {
        let sweep = t * TAU;
        let angle = if self.clockwise {
            self.start_angle - sweep
        } else {
            self.start_angle + sweep
        };
        [
            self.center[0] + angle.cos() * self.radius_x,
            self.center[1] + angle.sin() * self.radius_y,
        ]
    }

    /// Ramanujan's approximation of the ellipse perimeter
    pub fn circumference(&self) -> f32 {
        let a = self.radius_x;
        let b = self.radius_y;
        PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
    }

    pub fn control_points(&self) -> Vec<Point> {
        vec![
            self.center,
            [self.radius_x, self.radius_y],
            [self.start_angle, if self.clockwise { 1.0 } else { 0.0 }],
        ]
    }

    pub fn from_control_points(points: &[Point]) -> Result<Self, PathError> {
        expect_points(PathType::Circular, points, 3)?;
        Ok(Self::new(
            points[0],
            points[1][0],
            points[1][1],
            points[2][0],
            points[2][1] >= 0.5,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_lies_on_x_radius() {
        let path = CircularPath::new([500.0, 250.0], 200.0, 100.0, 0.0, false);
        let p = path.position(0.0);
        assert!((p[0] - 700.0).abs() < 1e-3);
        assert!((p[1] - 250.0).abs() < 1e-3);
    }

    #[test]
    fn quarter_turn_lies_on_y_radius() {
        let path = CircularPath::new([500.0, 250.0], 200.0, 100.0, 0.0, false);
        let p = path.position(0.25);
        assert!((p[0] - 500.0).abs() < 1e-2);
        assert!((p[1] - 350.0).abs() < 1e-2);
    }

    #[test]
    fn clockwise_mirrors_direction() {
        let path = CircularPath::new([0.0, 0.0], 100.0, 100.0, 0.0, true);
        let p = path.position(0.25);
        assert!(p[0].abs() < 1e-2);
        assert!((p[1] + 100.0).abs() < 1e-2);
    }

    #[test]
    fn circle_circumference() {
        let path = CircularPath::new([0.0, 0.0], 100.0, 100.0, 0.0, false);
        assert!((path.circumference() - TAU * 100.0).abs() < 1e-2);
    }

    #[test]
    fn direction_flag_round_trips() {
        let path = CircularPath::new([10.0, 20.0], 30.0, 40.0, 1.25, true);
        let rebuilt = CircularPath::from_control_points(&path.control_points()).unwrap();
        assert_eq!(rebuilt, path);
    }
}
