//! Deterministic fish paths
//!
//! A fish never has its coordinates streamed. The server sends a `PathData`
//! once and every peer evaluates it locally from the current tick. The
//! shape set is closed; anything that needs to know the concrete shape
//! matches on `PathShape`.

mod bezier;
mod circular;
mod generator;
mod linear;
mod sine;

pub use bezier::BezierPath;
pub use circular::CircularPath;
pub use generator::{GroupSpec, PathGenerator, PathRequest, SpawnEdge};
pub use linear::LinearPath;
pub use sine::SinePath;

use serde::{Deserialize, Serialize};

use crate::util::time::SIMULATION_TPS;

/// 2D point on the arena plane
pub type Point = [f32; 2];

/// Path type tag, serialized as its numeric discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PathType {
    Linear = 0,
    Sine = 1,
    Bezier = 2,
    Circular = 3,
}

impl From<PathType> for u8 {
    fn from(value: PathType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for PathType {
    type Error = PathError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PathType::Linear),
            1 => Ok(PathType::Sine),
            2 => Ok(PathType::Bezier),
            3 => Ok(PathType::Circular),
            other => Err(PathError::UnknownType(other)),
        }
    }
}

/// Errors rebuilding a path from its wire description
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("unknown path type {0}")]
    UnknownType(u8),

    #[error("{path_type:?} path needs {expected} control points, got {actual}")]
    ControlPoints {
        path_type: PathType,
        expected: usize,
        actual: usize,
    },
}

/// Serializable motion descriptor. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub fish_id: u32,
    pub path_type: PathType,
    pub seed: u32,
    pub start_tick: u64,
    pub speed: f32,
    pub control_points: Vec<Point>,
    /// Seconds for one traversal at `speed`
    pub duration: f32,
    pub looping: bool,
    /// Optional duration multiplier used to stagger schools
    pub variance: Option<f32>,
}

impl PathData {
    /// Effective traversal time in seconds
    pub fn effective_duration(&self) -> f64 {
        self.duration as f64 * self.variance.unwrap_or(1.0) as f64
    }

    /// Normalized progress at `current_tick`, `None` before the path starts
    pub fn progress_at_tick(&self, current_tick: u64) -> Option<f32> {
        if current_tick < self.start_tick {
            return None;
        }
        let elapsed = (current_tick - self.start_tick) as f64 / SIMULATION_TPS as f64;
        let duration = self.effective_duration();
        if duration <= 0.0 {
            return Some(1.0);
        }

        let mut t = elapsed / duration;
        if t > 1.0 {
            if self.looping {
                t -= t.floor();
            } else {
                t = 1.0;
            }
        }
        Some(t as f32)
    }

    /// Ticks until a non-looping path reaches its end point
    pub fn lifetime_ticks(&self) -> Option<u64> {
        if self.looping {
            return None;
        }
        Some((self.effective_duration() * SIMULATION_TPS as f64).ceil() as u64)
    }

    /// Position at `current_tick`, `None` before the path starts
    #[cfg(test)]
    pub fn position_at_tick(&self, current_tick: u64) -> Result<Option<Point>, PathError> {
        let shape = PathShape::from_control_points(self.path_type, &self.control_points)?;
        Ok(self
            .progress_at_tick(current_tick)
            .map(|t| shape.position(t)))
    }
}

/// Closed set of path shapes
#[derive(Debug, Clone, PartialEq)]
pub enum PathShape {
    Linear(LinearPath),
    Sine(SinePath),
    Bezier(BezierPath),
    Circular(CircularPath),
}

impl PathShape {
    /// Position at normalized time `t` in [0, 1]
    pub fn position(&self, t: f32) -> Point {
        match self {
            PathShape::Linear(p) => p.position(t),
            PathShape::Sine(p) => p.position(t),
            PathShape::Bezier(p) => p.position(t),
            PathShape::Circular(p) => p.position(t),
        }
    }

    pub fn path_type(&self) -> PathType {
        match self {
            PathShape::Linear(_) => PathType::Linear,
            PathShape::Sine(_) => PathType::Sine,
            PathShape::Bezier(_) => PathType::Bezier,
            PathShape::Circular(_) => PathType::Circular,
        }
    }

    /// Length of one traversal in pixels
    pub fn length(&self) -> f32 {
        match self {
            PathShape::Linear(p) => p.length(),
            PathShape::Sine(p) => p.length(),
            PathShape::Bezier(p) => p.arc_length(),
            PathShape::Circular(p) => p.circumference(),
        }
    }

    /// Circular paths orbit forever; the rest cross the arena once
    pub fn looping(&self) -> bool {
        matches!(self, PathShape::Circular(_))
    }

    pub fn control_points(&self) -> Vec<Point> {
        match self {
            PathShape::Linear(p) => p.control_points(),
            PathShape::Sine(p) => p.control_points(),
            PathShape::Bezier(p) => p.control_points(),
            PathShape::Circular(p) => p.control_points(),
        }
    }

    pub fn from_control_points(path_type: PathType, points: &[Point]) -> Result<Self, PathError> {
        match path_type {
            PathType::Linear => LinearPath::from_control_points(points).map(PathShape::Linear),
            PathType::Sine => SinePath::from_control_points(points).map(PathShape::Sine),
            PathType::Bezier => BezierPath::from_control_points(points).map(PathShape::Bezier),
            PathType::Circular => {
                CircularPath::from_control_points(points).map(PathShape::Circular)
            }
        }
    }
}

/// A shape bound to a fish, seed, start tick and speed
#[derive(Debug, Clone, PartialEq)]
pub struct FishPath {
    pub fish_id: u32,
    pub seed: u32,
    pub start_tick: u64,
    pub speed: f32,
    pub variance: Option<f32>,
    pub shape: PathShape,
}

impl FishPath {
    pub fn position(&self, t: f32) -> Point {
        self.shape.position(t)
    }

    pub fn path_type(&self) -> PathType {
        self.shape.path_type()
    }

    /// Seconds for one traversal; zero speed yields zero
    pub fn duration(&self) -> f32 {
        if self.speed <= 0.0 {
            0.0
        } else {
            self.shape.length() / self.speed
        }
    }

    pub fn to_path_data(&self) -> PathData {
        PathData {
            fish_id: self.fish_id,
            path_type: self.path_type(),
            seed: self.seed,
            start_tick: self.start_tick,
            speed: self.speed,
            control_points: self.shape.control_points(),
            duration: self.duration(),
            looping: self.shape.looping(),
            variance: self.variance,
        }
    }

    pub fn from_path_data(data: &PathData) -> Result<Self, PathError> {
        Ok(Self {
            fish_id: data.fish_id,
            seed: data.seed,
            start_tick: data.start_tick,
            speed: data.speed,
            variance: data.variance,
            shape: PathShape::from_control_points(data.path_type, &data.control_points)?,
        })
    }
}

pub(crate) fn lerp(a: Point, b: Point, t: f32) -> Point {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

pub(crate) fn distance(a: Point, b: Point) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

pub(crate) fn expect_points(
    path_type: PathType,
    points: &[Point],
    expected: usize,
) -> Result<(), PathError> {
    if points.len() < expected {
        return Err(PathError::ControlPoints {
            path_type,
            expected,
            actual: points.len(),
        });
    }
    Ok(())
}
