//! Hot/cold table-state cycle

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::credits::Credits;
use crate::util::time::secs_to_ticks;

/// Table mood, biases bosses and payouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Cold,
    Neutral,
    Hot,
}

impl TableState {
    pub fn boss_spawn_multiplier(self) -> f64 {
        match self {
            TableState::Cold => 0.7,
            TableState::Neutral => 1.0,
            TableState::Hot => 1.5,
        }
    }

    pub fn boss_odds_multiplier(self) -> f64 {
        match self {
            TableState::Hot => 3.0,
            TableState::Cold | TableState::Neutral => 1.0,
        }
    }

    pub fn payout_boost(self) -> f64 {
        match self {
            TableState::Hot => 1.8,
            TableState::Cold | TableState::Neutral => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HotColdConfig {
    pub min_dwell_minutes: u32,
    pub max_dwell_minutes: u32,
    /// Share of natural transitions that go cold
    pub cold_share: f64,
    /// Shots observed before RTP correction kicks in
    pub min_shots_for_correction: u32,
    pub rtp_band_low: f64,
    pub rtp_band_high: f64,
}

impl Default for HotColdConfig {
    fn default() -> Self {
        Self {
            min_dwell_minutes: 3,
            max_dwell_minutes: 8,
            cold_share: 0.7,
            min_shots_for_correction: 500,
            rtp_band_low: 0.95,
            rtp_band_high: 0.97,
        }
    }
}

/// Why the state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Dwell time ran out
    Natural(TableState),
    /// Running RTP left the target band
    Forced(TableState),
}

/// Per-match table-state machine
#[derive(Debug)]
pub struct HotColdCycle {
    config: HotColdConfig,
    state: TableState,
    state_start_tick: u64,
    dwell_ticks: u64,
    locked_until: Option<u64>,
    total_shots: u32,
    total_wagered: Credits,
    total_paid: Credits,
}

impl HotColdCycle {
    pub fn new(config: HotColdConfig, tick: u64, rng: &mut impl Rng) -> Self {
        let mut cycle = Self {
            config,
            state: TableState::Neutral,
            state_start_tick: tick,
            dwell_ticks: 0,
            locked_until: None,
            total_shots: 0,
            total_wagered: Credits::ZERO,
            total_paid: Credits::ZERO,
        };
        cycle.dwell_ticks = cycle.roll_dwell(rng);
        cycle
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn is_locked(&self, tick: u64) -> bool {
        self.locked_until.is_some_and(|until| tick < until)
    }

    /// Paid out over wagered, 0 before any wager
    pub fn rtp(&self) -> f64 {
        self.total_paid.ratio(self.total_wagered)
    }

    pub fn total_shots(&self) -> u32 {
        self.total_shots
    }

    pub fn record_wager(&mut self, wager: Credits) {
        self.total_shots += 1;
        self.total_wagered += wager;
    }

    pub fn record_payout(&mut self, payout: Credits) {
        self.total_paid += payout;
    }

    /// Advance the cycle. A forced state holds until its lock expires.
    pub fn update(&mut self, tick: u64, rng: &mut impl Rng) -> Option<Transition> {
        if self.is_locked(tick) {
            return None;
        }

        let mut transition = None;
        if tick.saturating_sub(self.state_start_tick) >= self.dwell_ticks {
            let next = if rng.gen_bool(self.config.cold_share.clamp(0.0, 1.0)) {
                TableState::Cold
            } else {
                TableState::Hot
            };
            self.enter(next, tick, rng);
            self.locked_until = None;
            transition = Some(Transition::Natural(next));
        }

        if self.total_shots >= self.config.min_shots_for_correction {
            let rtp = self.rtp();
            let forced = if rtp < self.config.rtp_band_low && self.state != TableState::Hot {
                Some(TableState::Hot)
            } else if rtp > self.config.rtp_band_high && self.state != TableState::Cold {
                Some(TableState::Cold)
            } else {
                None
            };
            if let Some(next) = forced {
                self.enter(next, tick, rng);
                self.locked_until = Some(tick + self.dwell_ticks);
                transition = Some(Transition::Forced(next));
            }
        }

        transition
    }

    pub fn boss_spawn_multiplier(&self) -> f64 {
        self.state.boss_spawn_multiplier()
    }

    pub fn boss_odds_multiplier(&self) -> f64 {
        self.state.boss_odds_multiplier()
    }

    pub fn payout_boost(&self) -> f64 {
        self.state.payout_boost()
    }

    fn enter(&mut self, state: TableState, tick: u64, rng: &mut impl Rng) {
        self.state = state;
        self.state_start_tick = tick;
        self.dwell_ticks = self.roll_dwell(rng);
    }

    fn roll_dwell(&self, rng: &mut impl Rng) -> u64 {
        let low = self.config.min_dwell_minutes.min(self.config.max_dwell_minutes);
        let high = self.config.max_dwell_minutes.max(low);
        let minutes = rng.gen_range(low..=high);
        secs_to_ticks(minutes as f64 * 60.0)
    }
}
