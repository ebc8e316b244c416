//! Boss death sweeps
//!
//! A dead boss runs its catalog death effect over the other fish in steps
//! of `STEP_TICKS`. Swept fish are removed and their value, at the wager of
//! the boss-killing shot, joins the boss payout. The total is credited on
//! the last step, scaled by the interaction modifier when the boss had one.
//! A sequence whose boss holds an interaction does not start stepping until
//! that interaction resolves.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::DeathEffect;
use super::credits::Credits;
use super::fish::{Fish, FishManager};
use super::path::Point;
use super::player::PlayerId;

/// Ticks between sweep steps
pub const STEP_TICKS: u64 = 15;

impl DeathEffect {
    /// Number of steps before the sequence pays out
    pub fn steps(self) -> u32 {
        match self {
            DeathEffect::ScreenWipe => 2,
            DeathEffect::SectorBlast => 3,
            DeathEffect::VortexPull => 2,
            DeathEffect::LineClear => 1,
            DeathEffect::ChainLightning => 5,
            DeathEffect::LootDrop => 1,
            DeathEffect::ExplosionRing => 1,
            DeathEffect::TimeFreeze => 2,
        }
    }

    /// Fish swept on `step`, picked from the non-boss fish in id order
    fn targets(self, step: u32, fish: &[&Fish], arena: Point, rng: &mut impl Rng) -> Vec<u32> {
        let [width, height] = arena;
        match (self, step) {
            (DeathEffect::ScreenWipe, 1) => pick_random(fish, 30, rng),
            (DeathEffect::SectorBlast, 1..=3) => {
                let sector_x = width * step as f32 / 4.0;
                fish.iter()
                    .filter(|f| (f.position[0] - sector_x).abs() < width * 3.0 / 16.0)
                    .take(8)
                    .map(|f| f.id)
                    .collect()
            }
            (DeathEffect::VortexPull, 1..=2) => {
                let center = [width / 2.0, height / 2.0];
                let mut nearest: Vec<(f32, u32)> = fish
                    .iter()
                    .map(|f| (distance_sq(f.position, center), f.id))
                    .collect();
                nearest.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                nearest.into_iter().take(10).map(|(_, id)| id).collect()
            }
            (DeathEffect::LineClear, 1) => fish
                .iter()
                .filter(|f| (f.position[1] - height / 2.0).abs() < height / 8.0)
                .take(15)
                .map(|f| f.id)
                .collect(),
            (DeathEffect::ChainLightning, 1..=5) => pick_random(fish, 2, rng),
            (DeathEffect::ExplosionRing, 1) => pick_random(fish, 12, rng),
            // The first step only freezes
            (DeathEffect::TimeFreeze, 2) => pick_random(fish, 20, rng),
            _ => Vec::new(),
        }
    }
}

fn pick_random(fish: &[&Fish], count: usize, rng: &mut impl Rng) -> Vec<u32> {
    fish.choose_multiple(rng, count).map(|f| f.id).collect()
}

fn distance_sq(a: Point, b: Point) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Everything needed to start a sweep for a dead boss
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStart {
    pub fish_id: u32,
    pub type_id: u16,
    pub effect: DeathEffect,
    pub killer_id: PlayerId,
    pub killer_slot: u8,
    pub multiplier: u32,
    /// Boss payout before the sweep is added
    pub base_payout: Credits,
    /// Wager of the killing shot, used to value swept fish
    pub wager: Credits,
    /// Interaction the sequence waits on
    pub interaction_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct KillSequence {
    pub id: u32,
    pub start: SequenceStart,
    /// `None` while waiting on the interaction
    pub started_tick: Option<u64>,
    pub step: u32,
    pub swept_value: Credits,
    pub modifier: f64,
}

/// One step of a sweep, as broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub sequence_id: u32,
    pub fish_id: u32,
    pub type_id: u16,
    pub killer_slot: u8,
    pub effect: DeathEffect,
    /// 0 marks the boss death itself
    pub step: u32,
    pub destroyed: Vec<u32>,
    /// Credited total, set on the last step
    pub payout: Option<Credits>,
}

/// A finished sweep, ready to credit
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSequence {
    pub sequence_id: u32,
    pub start: SequenceStart,
    pub modifier: f64,
    /// `(base_payout + swept value) × modifier`
    pub total: Credits,
}

/// What one `advance` produced
#[derive(Debug, Default)]
pub struct SequenceAdvance {
    pub steps: Vec<SequenceStep>,
    pub completed: Vec<CompletedSequence>,
}

/// Active death sweeps of one match
#[derive(Debug)]
pub struct KillSequences {
    active: BTreeMap<u32, KillSequence>,
    next_id: u32,
    arena: Point,
}

impl KillSequences {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            active: BTreeMap::new(),
            next_id: 1,
            arena: [width, height],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Start a sweep and return its opening step
    pub fn start(&mut self, start: SequenceStart, tick: u64) -> SequenceStep {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        let opening = SequenceStep {
            sequence_id: id,
            fish_id: start.fish_id,
            type_id: start.type_id,
            killer_slot: start.killer_slot,
            effect: start.effect,
            step: 0,
            destroyed: Vec::new(),
            payout: None,
        };
        let started_tick = start.interaction_id.is_none().then_some(tick);
        self.active.insert(
            id,
            KillSequence {
                id,
                start,
                started_tick,
                step: 0,
                swept_value: Credits::ZERO,
                modifier: 1.0,
            },
        );
        opening
    }

    /// Apply a resolved interaction's modifier and start the waiting sweep.
    /// Returns false if no sweep waits on `interaction_id`.
    pub fn release(&mut self, interaction_id: u32, modifier: f64, tick: u64) -> bool {
        let Some(sequence) = self
            .active
            .values_mut()
            .find(|s| s.start.interaction_id == Some(interaction_id) && s.started_tick.is_none())
        else {
            return false;
        };
        sequence.modifier = modifier;
        sequence.started_tick = Some(tick);
        true
    }

    /// Run every step that has come due by `tick`
    pub fn advance(&mut self, tick: u64, fish: &mut FishManager, rng: &mut impl Rng) -> SequenceAdvance {
        let mut out = SequenceAdvance::default();
        let arena = self.arena;

        for sequence in self.active.values_mut() {
            let Some(started) = sequence.started_tick else {
                continue;
            };
            let last = sequence.start.effect.steps();
            let due = ((tick.saturating_sub(started) / STEP_TICKS) as u32).min(last);

            while sequence.step < due {
                sequence.step += 1;
                let candidates: Vec<&Fish> = fish.iter().filter(|f| !f.is_boss()).collect();
                let targets = sequence
                    .start
                    .effect
                    .targets(sequence.step, &candidates, arena, rng);

                let mut destroyed = Vec::with_capacity(targets.len());
                for id in targets {
                    if let Some(swept) = fish.remove(id) {
                        sequence.swept_value += sequence.start.wager.scale(swept.kind.base_value);
                        destroyed.push(id);
                    }
                }

                let payout = (sequence.step == last).then(|| {
                    (sequence.start.base_payout + sequence.swept_value).scale(sequence.modifier)
                });
                out.steps.push(SequenceStep {
                    sequence_id: sequence.id,
                    fish_id: sequence.start.fish_id,
                    type_id: sequence.start.type_id,
                    killer_slot: sequence.start.killer_slot,
                    effect: sequence.start.effect,
                    step: sequence.step,
                    destroyed,
                    payout,
                });
                if let Some(total) = payout {
                    out.completed.push(CompletedSequence {
                        sequence_id: sequence.id,
                        start: sequence.start.clone(),
                        modifier: sequence.modifier,
                        total,
                    });
                }
            }
        }

        for done in &out.completed {
            self.active.remove(&done.sequence_id);
        }
        out
    }

    /// Drop a departed killer's sweeps; their payouts are forfeit
    pub fn discard_owned_by(&mut self, player_id: &PlayerId) -> usize {
        let before = self.active.len();
        self.active.retain(|_, s| &s.start.killer_id != player_id);
        before - self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog;
    use crate::game::fish::FishSpawnConfig;
    use crate::game::path::SpawnEdge;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn start(effect: DeathEffect, interaction_id: Option<u32>) -> SequenceStart {
        SequenceStart {
            fish_id: 900,
            type_id: 100,
            effect,
            killer_id: Uuid::new_v4(),
            killer_slot: 1,
            multiplier: 2,
            base_payout: Credits::whole(140),
            wager: Credits::whole(10),
            interaction_id,
        }
    }

    /// `count` clownfish parked at `at`
    fn school(count: usize, at: Point) -> FishManager {
        let mut fish = FishManager::new(FishSpawnConfig::default(), 1800.0, 900.0);
        let kind = catalog::lookup(0).unwrap();
        for _ in 0..count {
            let id = fish.spawn(kind, 0, Some(SpawnEdge::Left), None);
            fish.get_mut(id).unwrap().position = at;
        }
        fish
    }

    fn run_to_end(
        sequences: &mut KillSequences,
        fish: &mut FishManager,
        from: u64,
        rng: &mut ChaCha8Rng,
    ) -> SequenceAdvance {
        let mut all = SequenceAdvance::default();
        for tick in from..from + 200 {
            let step = sequences.advance(tick, fish, rng);
            all.steps.extend(step.steps);
            all.completed.extend(step.completed);
        }
        all
    }

    #[test]
    fn steps_come_every_fifteen_ticks() {
        let mut sequences = KillSequences::new(1800.0, 900.0);
        let mut fish = school(40, [900.0, 450.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let opening = sequences.start(start(DeathEffect::ChainLightning, None), 100);
        assert_eq!(opening.step, 0);

        assert!(sequences.advance(114, &mut fish, &mut rng).steps.is_empty());
        let first = sequences.advance(115, &mut fish, &mut rng);
        assert_eq!(first.steps.len(), 1);
        assert_eq!(first.steps[0].step, 1);
        assert_eq!(first.steps[0].destroyed.len(), 2);
        assert_eq!(fish.len(), 38);

        let rest = run_to_end(&mut sequences, &mut fish, 116, &mut rng);
        assert_eq!(rest.steps.iter().map(|s| s.step).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(rest.completed.len(), 1);
        assert_eq!(fish.len(), 30);
        assert!(sequences.is_empty());
    }

    #[test]
    fn payout_adds_swept_value() {
        let mut sequences = KillSequences::new(1800.0, 900.0);
        let mut fish = school(5, [900.0, 450.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        sequences.start(start(DeathEffect::ExplosionRing, None), 0);

        let done = run_to_end(&mut sequences, &mut fish, 0, &mut rng);
        assert!(fish.is_empty());
        // Five clownfish at 1.0 × 10 credits each
        assert_eq!(done.completed[0].total, Credits::whole(190));
        assert_eq!(done.steps.last().unwrap().payout, Some(Credits::whole(190)));
    }

    #[test]
    fn loot_drop_pays_without_sweeping() {
        let mut sequences = KillSequences::new(1800.0, 900.0);
        let mut fish = school(5, [900.0, 450.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        sequences.start(start(DeathEffect::LootDrop, None), 0);

        let done = run_to_end(&mut sequences, &mut fish, 0, &mut rng);
        assert_eq!(fish.len(), 5);
        assert_eq!(done.completed[0].total, Credits::whole(140));
    }

    #[test]
    fn sweeps_respect_geometry_and_spare_bosses() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        // Far from the middle line
        let mut fish = school(6, [900.0, 50.0]);
        let boss = fish.spawn(catalog::lookup(101).unwrap(), 0, None, None);
        fish.get_mut(boss).unwrap().position = [900.0, 450.0];
        let mut sequences = KillSequences::new(1800.0, 900.0);
        sequences.start(start(DeathEffect::LineClear, None), 0);
        let done = run_to_end(&mut sequences, &mut fish, 0, &mut rng);
        assert!(done.steps.iter().all(|s| s.destroyed.is_empty()));
        assert_eq!(fish.len(), 7);

        let mut fish = school(12, [450.0, 450.0]);
        let mut sequences = KillSequences::new(1800.0, 900.0);
        sequences.start(start(DeathEffect::SectorBlast, None), 0);
        let done = run_to_end(&mut sequences, &mut fish, 0, &mut rng);
        let per_step: Vec<usize> = done.steps.iter().map(|s| s.destroyed.len()).collect();
        assert_eq!(per_step, vec![8, 0, 0]);
    }

    #[test]
    fn interaction_holds_the_sweep_and_scales_it() {
        let mut sequences = KillSequences::new(1800.0, 900.0);
        let mut fish = school(3, [900.0, 450.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        sequences.start(start(DeathEffect::VortexPull, Some(7)), 0);

        assert!(run_to_end(&mut sequences, &mut fish, 0, &mut rng).steps.is_empty());
        assert_eq!(fish.len(), 3);

        assert!(!sequences.release(8, 1.3, 300));
        assert!(sequences.release(7, 0.7, 300));
        let done = run_to_end(&mut sequences, &mut fish, 300, &mut rng);
        assert_eq!(done.steps.first().unwrap().step, 1);
        // (140 + 3 × 10) × 0.7
        assert_eq!(done.completed[0].total, Credits::whole(119));
        assert_eq!(done.completed[0].modifier, 0.7);
    }

    #[test]
    fn departed_killer_forfeits() {
        let mut sequences = KillSequences::new(1800.0, 900.0);
        let first = start(DeathEffect::TimeFreeze, None);
        let killer = first.killer_id;
        sequences.start(first, 0);
        sequences.start(start(DeathEffect::TimeFreeze, None), 0);

        assert_eq!(sequences.discard_owned_by(&killer), 1);
        assert_eq!(sequences.discard_owned_by(&killer), 0);
        assert!(!sequences.is_empty());
    }
}
