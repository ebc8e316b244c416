//! Boss rotation rounds
//!
//! Each round picks which bosses may spawn. When the round clock runs out no
//! new boss is rolled; once the last boss and its death sweep are gone the
//! match sits in a short transition before the next round draws a fresh set.
//! Regular fish keep spawning throughout.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::{self, BossTier};

#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub duration_ticks: u64,
    pub transition_ticks: u64,
    pub ultra_rare_per_round: usize,
    pub rare_mid_per_round: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            // 10 minutes at 30 TPS
            duration_ticks: 18_000,
            transition_ticks: 90,
            ultra_rare_per_round: 4,
            rare_mid_per_round: 5,
        }
    }
}

/// Round progress, as broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub number: u32,
    /// Zero once the round clock has run out
    pub ticks_remaining: u64,
    pub transitioning: bool,
}

/// A round boundary crossed during `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// The finished round's bosses are all gone; transition started
    Ended { number: u32 },
    Started { number: u32 },
}

#[derive(Debug)]
pub struct RoundCycle {
    config: RoundConfig,
    number: u32,
    ends_at_tick: u64,
    transition_started: Option<u64>,
    /// Sorted type ids
    eligible: Vec<u16>,
}

impl RoundCycle {
    pub fn new(config: RoundConfig, tick: u64, rng: &mut impl Rng) -> Self {
        let mut cycle = Self {
            ends_at_tick: tick + config.duration_ticks,
            config,
            number: 1,
            transition_started: None,
            eligible: Vec::new(),
        };
        cycle.select_bosses(rng);
        cycle
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition_started.is_some()
    }

    /// Bosses this round may spawn; empty once the round clock has run out
    pub fn spawnable_bosses(&self, tick: u64) -> &[u16] {
        if self.is_transitioning() || tick >= self.ends_at_tick {
            &[]
        } else {
            &self.eligible
        }
    }

    pub fn view(&self, tick: u64) -> RoundView {
        RoundView {
            number: self.number,
            ticks_remaining: if self.is_transitioning() {
                0
            } else {
                self.ends_at_tick.saturating_sub(tick)
            },
            transitioning: self.is_transitioning(),
        }
    }

    /// Advance the round clock. `bosses_active` is whether any boss or boss
    /// death sweep is still in play.
    pub fn update(&mut self, tick: u64, bosses_active: bool, rng: &mut impl Rng) -> Option<RoundEvent> {
        match self.transition_started {
            Some(started) if tick >= started + self.config.transition_ticks => {
                self.transition_started = None;
                self.number += 1;
                self.ends_at_tick = tick + self.config.duration_ticks;
                self.select_bosses(rng);
                Some(RoundEvent::Started {
                    number: self.number,
                })
            }
            Some(_) => None,
            None if tick >= self.ends_at_tick && !bosses_active => {
                self.transition_started = Some(tick);
                Some(RoundEvent::Ended {
                    number: self.number,
                })
            }
            None => None,
        }
    }

    pub fn eligible(&self) -> &[u16] {
        &self.eligible
    }

    fn select_bosses(&mut self, rng: &mut impl Rng) {
        let ultra = catalog::bosses_in_tier(BossTier::UltraRare);
        let mid = catalog::bosses_in_tier(BossTier::RareMid);

        let mut eligible: Vec<u16> = ultra
            .choose_multiple(rng, self.config.ultra_rare_per_round)
            .chain(mid.choose_multiple(rng, self.config.rare_mid_per_round))
            .copied()
            .collect();
        eligible.sort_unstable();
        self.eligible = eligible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::lookup;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn short_rounds() -> RoundConfig {
        RoundConfig {
            duration_ticks: 100,
            transition_ticks: 10,
            ..RoundConfig::default()
        }
    }

    #[test]
    fn selection_draws_from_each_tier() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let round = RoundCycle::new(RoundConfig::default(), 0, &mut rng);

        let tiers: Vec<BossTier> = round
            .eligible()
            .iter()
            .map(|id| lookup(*id).unwrap().boss_tier.unwrap())
            .collect();
        assert_eq!(tiers.iter().filter(|t| **t == BossTier::UltraRare).count(), 4);
        assert_eq!(tiers.iter().filter(|t| **t == BossTier::RareMid).count(), 5);
        assert!(round.eligible().windows(2).all(|w| w[0] < w[1]));
        assert!(!round.eligible().contains(&0));
    }

    #[test]
    fn bosses_stop_when_the_clock_runs_out() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let round = RoundCycle::new(short_rounds(), 0, &mut rng);
        assert_eq!(round.spawnable_bosses(99).len(), 9);
        assert!(round.spawnable_bosses(100).is_empty());
        assert_eq!(round.view(40).ticks_remaining, 60);
        assert_eq!(round.view(140).ticks_remaining, 0);
    }

    #[test]
    fn transition_waits_for_bosses_to_clear() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut round = RoundCycle::new(short_rounds(), 0, &mut rng);

        assert_eq!(round.update(50, false, &mut rng), None);
        assert_eq!(round.update(100, true, &mut rng), None);
        assert!(!round.is_transitioning());

        assert_eq!(round.update(120, false, &mut rng), Some(RoundEvent::Ended { number: 1 }));
        assert!(round.view(121).transitioning);
        assert_eq!(round.update(129, false, &mut rng), None);

        assert_eq!(round.update(130, false, &mut rng), Some(RoundEvent::Started { number: 2 }));
        assert_eq!(round.number(), 2);
        assert_eq!(round.view(130).ticks_remaining, 100);
        assert_eq!(round.spawnable_bosses(130).len(), 9);
    }

    #[test]
    fn rotation_is_seeded() {
        let a = RoundCycle::new(RoundConfig::default(), 0, &mut ChaCha8Rng::seed_from_u64(11));
        let b = RoundCycle::new(RoundConfig::default(), 0, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a.eligible(), b.eligible());
    }
}
