//! Hot seat bonus: one slot at a time gets a payout multiplier

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::player::MAX_SLOTS;
use crate::game::rng::weighted_pick;

#[derive(Debug, Clone)]
pub struct HotSeatConfig {
    pub duration_ticks: u64,
    /// Measured from expiry
    pub cooldown_ticks: u64,
    /// Per-tick activation chance once the cooldown has passed
    pub activation_chance: f64,
    /// `(multiplier, weight)` pairs
    pub multipliers: Vec<(f64, u32)>,
}

impl Default for HotSeatConfig {
    fn default() -> Self {
        Self {
            duration_ticks: 900,
            cooldown_ticks: 1_800,
            activation_chance: 0.02,
            multipliers: vec![(1.05, 50), (1.08, 30), (1.10, 15), (1.15, 5)],
        }
    }
}

/// The active bonus, as broadcast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveHotSeat {
    pub slot: u8,
    pub multiplier: f64,
    pub expires_at_tick: u64,
}

/// Hot seat activation and expiry
#[derive(Debug)]
pub struct HotSeat {
    config: HotSeatConfig,
    active: Option<ActiveHotSeat>,
    last_expired_tick: Option<u64>,
}

impl HotSeat {
    pub fn new(config: HotSeatConfig) -> Self {
        Self {
            config,
            active: None,
            last_expired_tick: None,
        }
    }

    pub fn active(&self) -> Option<ActiveHotSeat> {
        self.active
    }

    /// Expire the current seat or roll a new one. Returns a fresh activation.
    pub fn update(&mut self, tick: u64, rng: &mut impl Rng) -> Option<ActiveHotSeat> {
        if let Some(active) = self.active {
            if tick < active.expires_at_tick {
                return None;
            }
            self.active = None;
            self.last_expired_tick = Some(tick);
        }

        let cooled_down = self
            .last_expired_tick
            .map_or(true, |expired| tick.saturating_sub(expired) >= self.config.cooldown_ticks);
        if !cooled_down || !rng.gen_bool(self.config.activation_chance.clamp(0.0, 1.0)) {
            return None;
        }

        let slot = rng.gen_range(0..MAX_SLOTS as u8);
        let pool: Vec<(usize, u32)> = self
            .config
            .multipliers
            .iter()
            .enumerate()
            .map(|(i, (_, w))| (i, *w))
            .collect();
        let multiplier = weighted_pick(&pool, |total| rng.gen_range(0..total))
            .and_then(|i| self.config.multipliers.get(i))
            .map_or(1.0, |(m, _)| *m);

        let activated = ActiveHotSeat {
            slot,
            multiplier,
            expires_at_tick: tick + self.config.duration_ticks,
        };
        self.active = Some(activated);
        Some(activated)
    }

    /// Payout multiplier for `slot`, 1.0 unless it holds the hot seat
    pub fn multiplier_for(&self, slot: u8) -> f64 {
        match self.active {
            Some(active) if active.slot == slot => active.multiplier,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn always_on() -> HotSeatConfig {
        HotSeatConfig {
            activation_chance: 1.0,
            ..HotSeatConfig::default()
        }
    }

    #[test]
    fn activates_immediately_when_certain() {
        let mut seat = HotSeat::new(always_on());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let active = seat.update(0, &mut rng).unwrap();
        assert!(active.slot < 6);
        assert_eq!(active.expires_at_tick, 900);
        assert_eq!(seat.multiplier_for(active.slot), active.multiplier);
        assert_eq!(seat.multiplier_for((active.slot + 1) % 6), 1.0);
    }

    #[test]
    fn at_most_one_active_until_expiry() {
        let mut seat = HotSeat::new(always_on());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let first = seat.update(0, &mut rng).unwrap();
        for tick in 1..900 {
            assert!(seat.update(tick, &mut rng).is_none());
            assert_eq!(seat.active(), Some(first));
        }
        assert!(seat.update(900, &mut rng).is_none());
        assert!(seat.active().is_none());
    }

    #[test]
    fn cooldown_counts_from_expiry() {
        let mut seat = HotSeat::new(always_on());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        seat.update(0, &mut rng).unwrap();
        // Expires at 900, cooldown runs to 2700
        for tick in 900..2_700 {
            assert!(seat.update(tick, &mut rng).is_none(), "tick {tick}");
        }
        assert!(seat.update(2_700, &mut rng).is_some());
    }

    #[test]
    fn never_activates_at_zero_chance() {
        let mut seat = HotSeat::new(HotSeatConfig {
            activation_chance: 0.0,
            ..HotSeatConfig::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for tick in 0..10_000 {
            assert!(seat.update(tick, &mut rng).is_none());
        }
    }

    #[test]
    fn multipliers_come_from_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut seen_low = 0;
        for _ in 0..1_000 {
            let mut seat = HotSeat::new(always_on());
            let active = seat.update(0, &mut rng).unwrap();
            assert!([1.05, 1.08, 1.10, 1.15].contains(&active.multiplier));
            if active.multiplier == 1.05 {
                seen_low += 1;
            }
        }
        assert!((400..600).contains(&seen_low), "1.05x chosen {seen_low} times");
    }
}
