//! Boss kill-probability curve
//!
//! Bosses are not worn down by HP. Each hit rolls against a logistic curve
//! over the wagered damage the boss type has soaked up in this match,
//! centred on the break-even point where expected payout meets the target
//! return-to-player.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::game::catalog::FishKind;
use crate::game::credits::Credits;

/// Curve tuning
#[derive(Debug, Clone)]
pub struct BossCurveConfig {
    /// Chance added to every hit so any shot can land the kill
    pub one_shot_chance: f64,
    /// Logistic steepness
    pub steepness: f64,
    pub target_rtp: f64,
    /// Amplitude numerator, divided by log10(base / 100)
    pub amplitude_scale: f64,
    pub amplitude_min: f64,
    pub amplitude_max: f64,
    /// Hard cap on the final probability
    pub ceiling: f64,
    /// Records idle for longer than this are evictable
    pub record_max_age_ticks: u64,
}

impl Default for BossCurveConfig {
    fn default() -> Self {
        Self {
            one_shot_chance: 0.005,
            steepness: 12.0,
            target_rtp: 1.05,
            amplitude_scale: 0.5,
            amplitude_min: 0.08,
            amplitude_max: 0.60,
            ceiling: 0.95,
            record_max_age_ticks: 10 * 60 * 30,
        }
    }
}

/// Damage soaked by one boss type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BossDamageRecord {
    pub total_shots: u32,
    pub total_damage: Credits,
    pub last_hit_tick: u64,
}

/// Per-match boss damage tracking and kill rolls
#[derive(Debug)]
pub struct BossKillCurve {
    config: BossCurveConfig,
    average_multiplier: f64,
    records: HashMap<u16, BossDamageRecord>,
}

impl BossKillCurve {
    /// `average_multiplier` is the mean of the payout multiplier table
    pub fn new(config: BossCurveConfig, average_multiplier: f64) -> Self {
        Self {
            config,
            average_multiplier,
            records: HashMap::new(),
        }
    }

    /// Wagered credits at which the expected boss payout meets the target RTP
    pub fn break_even(&self, base_value: f64) -> f64 {
        base_value * self.average_multiplier / self.config.target_rtp
    }

    /// Peak of the logistic term; cheaper bosses peak higher
    pub fn amplitude(&self, base_value: f64) -> f64 {
        let scale = (base_value / 100.0).log10().max(1.0);
        (self.config.amplitude_scale / scale).clamp(self.config.amplitude_min, self.config.amplitude_max)
    }

    /// Kill probability after `damage` wagered credits in total
    pub fn probability_at(&self, base_value: f64, damage: f64) -> f64 {
        let break_even = self.break_even(base_value);
        if break_even <= 0.0 {
            return self.config.ceiling;
        }
        let ratio = damage / break_even;
        let logistic =
            self.amplitude(base_value) / (1.0 + (-self.config.steepness * (ratio - 1.0)).exp());
        (self.config.one_shot_chance + logistic).min(self.config.ceiling)
    }

    /// Probability for the next hit, counting its wager
    pub fn kill_probability(&self, kind: &FishKind, wager: Credits) -> f64 {
        let prior = self
            .records
            .get(&kind.type_id)
            .map(|r| r.total_damage)
            .unwrap_or(Credits::ZERO);
        self.probability_at(kind.base_value, whole_credits(prior + wager))
    }

    pub fn record_shot(&mut self, type_id: u16, wager: Credits, tick: u64) {
        let record = self.records.entry(type_id).or_default();
        record.total_shots += 1;
        record.total_damage += wager;
        record.last_hit_tick = tick;
    }

    /// Roll one hit: compute the probability including this shot, record the
    /// shot, then draw. A kill clears the record for the type.
    pub fn roll_hit(
        &mut self,
        kind: &FishKind,
        wager: Credits,
        tick: u64,
        odds_multiplier: f64,
        rng: &mut impl Rng,
    ) -> bool {
        let probability =
            (self.kill_probability(kind, wager) * odds_multiplier).clamp(0.0, self.config.ceiling);
        self.record_shot(kind.type_id, wager, tick);
        let killed = rng.gen_bool(probability);
        if killed {
            debug!(
                boss = kind.name,
                probability,
                shots = self.records.get(&kind.type_id).map_or(0, |r| r.total_shots),
                "Boss kill roll succeeded"
            );
            self.reset(kind.type_id);
        }
        killed
    }

    pub fn reset(&mut self, type_id: u16) {
        self.records.remove(&type_id);
    }

    #[cfg(test)]
    pub fn record(&self, type_id: u16) -> Option<&BossDamageRecord> {
        self.records.get(&type_id)
    }

    /// Drop records idle past the configured age, keeping any boss type that
    /// is still alive. Returns the number evicted.
    pub fn evict_stale(&mut self, tick: u64, is_alive: impl Fn(u16) -> bool) -> usize {
        let max_age = self.config.record_max_age_ticks;
        let before = self.records.len();
        self.records.retain(|type_id, record| {
            is_alive(*type_id) || tick.saturating_sub(record.last_hit_tick) <= max_age
        });
        before - self.records.len()
    }
}

fn whole_credits(amount: Credits) -> f64 {
    amount.cents() as f64 / 100.0
}
