//! Procedural path selection for newly spawned fish
//!
//! Every path is built from a `SeededRandom` whose seed comes from the
//! request alone, so the same request always yields the same path. Schools
//! share one anchor segment per group id; members are offset from it in
//! movement-local space (lateral along the perpendicular, rank along the
//! heading). Anchors live in a per-match cache evicted by tick age.

use std::collections::HashMap;
use std::f32::consts::TAU;

use crate::game::catalog::FishCategory;
use crate::game::rng::{weighted_pick, SeededRandom, LCG_M};

use super::{
    lerp, BezierPath, CircularPath, FishPath, LinearPath, PathShape, Point, SinePath,
};

/// How far outside the arena a fish enters
pub const SPAWN_MARGIN: f32 = 60.0;
/// How far outside the arena a crossing path ends
pub const EXIT_MARGIN: f32 = 150.0;
/// Anchors older than this many ticks are dropped
pub const GROUP_CACHE_TICKS: u64 = 300;

const EDGE_INSET: f32 = 100.0;
const LATERAL_SPACING: f32 = 45.0;
const RANK_SPACING: f32 = 55.0;
const MEMBER_JITTER: f64 = 6.0;
const BOSS_SPEED_FACTOR: f32 = 0.7;

/// Spawn region selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnEdge {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftCenter,
    RightCenter,
    TopCenter,
    BottomCenter,
}

impl SpawnEdge {
    pub const ALL: [SpawnEdge; 12] = [
        SpawnEdge::Left,
        SpawnEdge::Right,
        SpawnEdge::Top,
        SpawnEdge::Bottom,
        SpawnEdge::TopLeft,
        SpawnEdge::TopRight,
        SpawnEdge::BottomLeft,
        SpawnEdge::BottomRight,
        SpawnEdge::LeftCenter,
        SpawnEdge::RightCenter,
        SpawnEdge::TopCenter,
        SpawnEdge::BottomCenter,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn opposite(self) -> SpawnEdge {
        match self {
            SpawnEdge::Left => SpawnEdge::Right,
            SpawnEdge::Right => SpawnEdge::Left,
            SpawnEdge::Top => SpawnEdge::Bottom,
            SpawnEdge::Bottom => SpawnEdge::Top,
            SpawnEdge::TopLeft => SpawnEdge::BottomRight,
            SpawnEdge::BottomRight => SpawnEdge::TopLeft,
            SpawnEdge::TopRight => SpawnEdge::BottomLeft,
            SpawnEdge::BottomLeft => SpawnEdge::TopRight,
            SpawnEdge::LeftCenter => SpawnEdge::RightCenter,
            SpawnEdge::RightCenter => SpawnEdge::LeftCenter,
            SpawnEdge::TopCenter => SpawnEdge::BottomCenter,
            SpawnEdge::BottomCenter => SpawnEdge::TopCenter,
        }
    }

    /// Sample a point in this region, `margin` pixels outside the arena
    fn sample(self, rng: &mut SeededRandom, width: f32, height: f32, margin: f32) -> Point {
        let w = width as f64;
        let h = height as f64;
        let m = margin as f64;
        let inset = EDGE_INSET as f64;
        let (x, y) = match self {
            SpawnEdge::Left => (-m, rng.next_range(inset, h - inset)),
            SpawnEdge::Right => (w + m, rng.next_range(inset, h - inset)),
            SpawnEdge::Top => (rng.next_range(inset, w - inset), -m),
            SpawnEdge::Bottom => (rng.next_range(inset, w - inset), h + m),
            SpawnEdge::TopLeft => (rng.next_range(-m, 2.0 * inset), -m),
            SpawnEdge::TopRight => (rng.next_range(w - 2.0 * inset, w + m), -m),
            SpawnEdge::BottomLeft => (rng.next_range(-m, 2.0 * inset), h + m),
            SpawnEdge::BottomRight => (rng.next_range(w - 2.0 * inset, w + m), h + m),
            SpawnEdge::LeftCenter => (-m, rng.next_range(h * 0.35, h * 0.65)),
            SpawnEdge::RightCenter => (w + m, rng.next_range(h * 0.35, h * 0.65)),
            SpawnEdge::TopCenter => (rng.next_range(w * 0.35, w * 0.65), -m),
            SpawnEdge::BottomCenter => (rng.next_range(w * 0.35, w * 0.65), h + m),
        };
        [x as f32, y as f32]
    }
}

/// School membership of a spawn request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpec {
    pub group_id: u64,
    /// Position within the formation, 0 is the leader
    pub index: u32,
}

/// Everything the generator needs for one fish
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRequest {
    pub fish_id: u32,
    pub category: FishCategory,
    pub speed: f32,
    pub tick: u64,
    /// `None` picks a random region
    pub edge: Option<SpawnEdge>,
    pub group: Option<GroupSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SchoolStyle {
    Linear,
    Sine { amplitude: f32, frequency: f32 },
    Parabola { height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GroupAnchor {
    start: Point,
    end: Point,
    style: SchoolStyle,
    created_tick: u64,
}

/// Chooses and parameterizes a path per spawned fish
#[derive(Debug)]
pub struct PathGenerator {
    width: f32,
    height: f32,
    groups: HashMap<u64, GroupAnchor>,
}

impl PathGenerator {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            groups: HashMap::new(),
        }
    }

    /// Number of cached school anchors
    pub fn cached_groups(&self) -> usize {
        self.groups.len()
    }

    /// Build a deterministic path for one fish
    pub fn generate(&mut self, req: &PathRequest) -> FishPath {
        self.groups
            .retain(|_, anchor| anchor.created_tick + GROUP_CACHE_TICKS >= req.tick);

        let seed = path_seed(req);
        let mut rng = SeededRandom::new(seed as i64);
        let edge = req.edge.unwrap_or_else(|| random_edge(&mut rng));

        let mut speed = req.speed;
        let mut variance = None;
        let shape = match req.category {
            FishCategory::Small | FishCategory::Medium => {
                let anchor = self.anchor_for(req, edge, &mut rng);
                let (start, end) = self.member_segment(&anchor, req.group, &mut rng);
                if let Some(group) = req.group {
                    let rank = group.index / 3;
                    if rank > 0 {
                        variance = Some(1.0 + rank as f32 * 0.015);
                    }
                }
                school_shape(&anchor, start, end)
            }
            FishCategory::Bonus => {
                let start = edge.sample(&mut rng, self.width, self.height, SPAWN_MARGIN);
                let end = edge
                    .opposite()
                    .sample(&mut rng, self.width, self.height, EXIT_MARGIN);
                let amplitude = rng.next_range(60.0, 110.0) as f32;
                let frequency = rng.next_range(3.0, 6.0) as f32;
                PathShape::Sine(SinePath::new(start, end, amplitude, frequency))
            }
            FishCategory::Large => {
                let start = edge.sample(&mut rng, self.width, self.height, SPAWN_MARGIN);
                let end = edge
                    .opposite()
                    .sample(&mut rng, self.width, self.height, EXIT_MARGIN);
                let p1 = [
                    start[0] + rng.next_range(-200.0, 200.0) as f32,
                    start[1] + rng.next_range(-200.0, 200.0) as f32,
                ];
                let p2 = [
                    end[0] + rng.next_range(-200.0, 200.0) as f32,
                    end[1] + rng.next_range(-200.0, 200.0) as f32,
                ];
                PathShape::Bezier(BezierPath::new(start, p1, p2, end))
            }
            FishCategory::Boss => {
                speed *= BOSS_SPEED_FACTOR;
                let start = edge.sample(&mut rng, self.width, self.height, SPAWN_MARGIN);
                let end = edge
                    .opposite()
                    .sample(&mut rng, self.width, self.height, EXIT_MARGIN);
                let p1 = self.interior_point(&mut rng);
                let p2 = self.interior_point(&mut rng);
                PathShape::Bezier(BezierPath::new(start, p1, p2, end))
            }
            FishCategory::Special => {
                let w = self.width as f64;
                let h = self.height as f64;
                let center = [
                    rng.next_range(300.0, w - 300.0) as f32,
                    rng.next_range(200.0, h - 200.0) as f32,
                ];
                let radius_x = rng.next_range(100.0, 250.0) as f32;
                let radius_y = rng.next_range(80.0, 200.0) as f32;
                let start_angle = rng.next_range(0.0, TAU as f64) as f32;
                let clockwise = rng.next_float() > 0.5;
                PathShape::Circular(CircularPath::new(
                    center,
                    radius_x,
                    radius_y,
                    start_angle,
                    clockwise,
                ))
            }
        };

        FishPath {
            fish_id: req.fish_id,
            seed,
            start_tick: req.tick,
            speed,
            variance,
            shape,
        }
    }

    /// Shared anchor for the request's group, or a private one for solo fish
    fn anchor_for(
        &mut self,
        req: &PathRequest,
        edge: SpawnEdge,
        fish_rng: &mut SeededRandom,
    ) -> GroupAnchor {
        let Some(group) = req.group else {
            return self.build_anchor(fish_rng, edge, req.tick);
        };
        if let Some(anchor) = self.groups.get(&group.group_id) {
            return *anchor;
        }

        let mut group_rng = SeededRandom::new(group_seed(group.group_id, req.tick, edge));
        let anchor = self.build_anchor(&mut group_rng, edge, req.tick);
        self.groups.insert(group.group_id, anchor);
        anchor
    }

    fn build_anchor(&self, rng: &mut SeededRandom, edge: SpawnEdge, tick: u64) -> GroupAnchor {
        let start = edge.sample(rng, self.width, self.height, SPAWN_MARGIN);
        let end = edge
            .opposite()
            .sample(rng, self.width, self.height, EXIT_MARGIN);

        let table = [(0u8, 30), (1u8, 30), (2u8, 40)];
        let style = match weighted_pick(&table, |total| rng.next_below(total)) {
            Some(0) => SchoolStyle::Sine {
                amplitude: rng.next_range(20.0, 50.0) as f32,
                frequency: rng.next_range(2.0, 5.0) as f32,
            },
            Some(2) => {
                let height = rng.next_range(80.0, 220.0) as f32;
                let sign = if rng.next_float() < 0.5 { -1.0 } else { 1.0 };
                SchoolStyle::Parabola {
                    height: height * sign,
                }
            }
            _ => SchoolStyle::Linear,
        };

        GroupAnchor {
            start,
            end,
            style,
            created_tick: tick,
        }
    }

    /// Offset the anchor segment for a formation slot
    fn member_segment(
        &self,
        anchor: &GroupAnchor,
        group: Option<GroupSpec>,
        rng: &mut SeededRandom,
    ) -> (Point, Point) {
        let Some(group) = group else {
            return (anchor.start, anchor.end);
        };
        if group.index == 0 {
            return (anchor.start, anchor.end);
        }

        let (dir, perp) = heading(anchor.start, anchor.end);
        let lateral_slot = match group.index % 3 {
            0 => 0.0,
            1 => -1.0,
            _ => 1.0,
        };
        let rank = (group.index / 3) as f32;
        let lateral =
            lateral_slot * LATERAL_SPACING + rng.next_range(-MEMBER_JITTER, MEMBER_JITTER) as f32;
        let back = rank * RANK_SPACING + rng.next_range(0.0, MEMBER_JITTER) as f32;

        let shift = [
            perp[0] * lateral - dir[0] * back,
            perp[1] * lateral - dir[1] * back,
        ];
        (
            [anchor.start[0] + shift[0], anchor.start[1] + shift[1]],
            [anchor.end[0] + shift[0], anchor.end[1] + shift[1]],
        )
    }

    fn interior_point(&self, rng: &mut SeededRandom) -> Point {
        [
            rng.next_range(300.0, (self.width - 300.0) as f64) as f32,
            rng.next_range(100.0, (self.height - 100.0) as f64) as f32,
        ]
    }
}

fn school_shape(anchor: &GroupAnchor, start: Point, end: Point) -> PathShape {
    match anchor.style {
        SchoolStyle::Linear => PathShape::Linear(LinearPath::new(start, end)),
        SchoolStyle::Sine {
            amplitude,
            frequency,
        } => PathShape::Sine(
            SinePath::new(start, end, amplitude, frequency).with_anchor(anchor.start, anchor.end),
        ),
        SchoolStyle::Parabola { height } => {
            let (_, perp) = heading(anchor.start, anchor.end);
            let lift = [perp[0] * height, perp[1] * height];
            let a = lerp(start, end, 1.0 / 3.0);
            let b = lerp(start, end, 2.0 / 3.0);
            PathShape::Bezier(BezierPath::new(
                start,
                [a[0] + lift[0], a[1] + lift[1]],
                [b[0] + lift[0], b[1] + lift[1]],
                end,
            ))
        }
    }
}

/// Unit heading and its left perpendicular
fn heading(start: Point, end: Point) -> (Point, Point) {
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f32::EPSILON {
        return ([1.0, 0.0], [0.0, 1.0]);
    }
    let dir = [dx / len, dy / len];
    (dir, [-dir[1], dir[0]])
}

fn random_edge(rng: &mut SeededRandom) -> SpawnEdge {
    let idx = rng.next_int(0, SpawnEdge::ALL.len() as i32) as usize;
    SpawnEdge::ALL[idx.min(SpawnEdge::ALL.len() - 1)]
}

/// Mix the request identity into the 31-bit seed space
pub fn path_seed(req: &PathRequest) -> u32 {
    let edge = req.edge.map(SpawnEdge::code).unwrap_or(SpawnEdge::ALL.len() as i64);
    let group_index = req.group.map(|g| g.index as i64).unwrap_or(0);
    let mixed = (req.fish_id as i64)
        .wrapping_mul(31)
        .wrapping_add((req.tick as i64).wrapping_mul(17))
        .wrapping_add(edge.wrapping_mul(7_919))
        .wrapping_add(group_index.wrapping_mul(104_729));
    mixed.rem_euclid(LCG_M as i64) as u32
}

fn group_seed(group_id: u64, tick: u64, edge: SpawnEdge) -> i64 {
    (group_id as i64)
        .wrapping_mul(7_919)
        .wrapping_add((tick as i64).wrapping_mul(17))
        .wrapping_add(edge.code().wrapping_mul(131))
        .rem_euclid(LCG_M as i64)
}
