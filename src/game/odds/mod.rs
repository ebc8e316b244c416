//! Dynamic odds controllers
//!
//! All state here is owned by one match. Nothing is shared across matches.

pub mod boss_curve;
pub mod hot_cold;
pub mod hot_seat;

pub use boss_curve::{BossCurveConfig, BossKillCurve};
pub use hot_cold::{HotColdConfig, HotColdCycle, TableState, Transition};
pub use hot_seat::{ActiveHotSeat, HotSeat, HotSeatConfig};

use rand::Rng;

/// What changed during one odds update
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OddsUpdate {
    pub table: Option<Transition>,
    pub hot_seat: Option<ActiveHotSeat>,
}

/// The per-match controller set
#[derive(Debug)]
pub struct OddsControllers {
    pub boss_curve: BossKillCurve,
    pub hot_cold: HotColdCycle,
    pub hot_seat: HotSeat,
}

impl OddsControllers {
    pub fn new(
        boss_curve: BossKillCurve,
        hot_cold: HotColdCycle,
        hot_seat: HotSeat,
    ) -> Self {
        Self {
            boss_curve,
            hot_cold,
            hot_seat,
        }
    }

    pub fn update(&mut self, tick: u64, rng: &mut impl Rng) -> OddsUpdate {
        OddsUpdate {
            table: self.hot_cold.update(tick, rng),
            hot_seat: self.hot_seat.update(tick, rng),
        }
    }

    pub fn table_state(&self) -> TableState {
        self.hot_cold.state()
    }
}
