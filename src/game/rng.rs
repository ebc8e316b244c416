//! Deterministic random sources
//!
//! `SeededRandom` is the linear congruential generator shared with clients:
//! `seed' = (A * seed + C) mod 2^31`. Clients rebuild fish paths from the
//! same seed, so the sequence must stay bit-identical across runtimes.
//! Intermediates are computed in `u64` and floats in `f64`, which is what a
//! JavaScript peer computes with as well.

/// LCG multiplier
pub const LCG_A: u64 = 1_103_515_245;
/// LCG increment
pub const LCG_C: u64 = 12_345;
/// LCG modulus (2^31)
pub const LCG_M: u64 = 1 << 31;

const SEED_MASK: i64 = (LCG_M - 1) as i64;

/// Reproducible LCG used for path generation
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    /// Seed is masked to the non-negative 31-bit range
    pub fn new(seed: i64) -> Self {
        Self {
            state: (seed & SEED_MASK) as u32,
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Next unsigned 31-bit integer
    pub fn next_u31(&mut self) -> u32 {
        let next = (LCG_A * self.state as u64 + LCG_C) % LCG_M;
        self.state = next as u32;
        self.state
    }

    /// Next float in [0, 1)
    pub fn next_float(&mut self) -> f64 {
        self.next_u31() as f64 / LCG_M as f64
    }

    /// Next float in [min, max)
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_float() * (max - min)
    }

    /// Next int in [min, max)
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        min + (self.next_float() * (max - min) as f64).floor() as i32
    }

    /// Uniform integer in [0, bound), for weighted draws
    pub fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (self.next_float() * bound as f64).floor() as u32
    }
}

/// Pick an entry from a `(value, weight)` table using a single uniform draw.
///
/// `draw` receives the total weight and must return an integer in
/// `[0, total)`. The walk selects the first bucket whose cumulative weight
/// exceeds the draw, so a draw of 0 lands on the first non-zero bucket.
/// Returns `None` for an empty or all-zero table.
pub fn weighted_pick<T: Copy>(table: &[(T, u32)], draw: impl FnOnce(u32) -> u32) -> Option<T> {
    let total = table
        .iter()
        .fold(0u32, |acc, (_, weight)| acc.saturating_add(*weight));
    if total == 0 {
        return None;
    }

    let roll = draw(total).min(total - 1);
    let mut cumulative = 0u32;
    for (value, weight) in table {
        cumulative = cumulative.saturating_add(*weight);
        if cumulative > roll {
            return Some(*value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn known_sequence() {
        let mut rng = SeededRandom::new(12345);
        assert_eq!(rng.next_u31(), 1_406_932_606);
        assert_eq!(rng.next_u31(), 654_583_775);
        assert_eq!(rng.next_u31(), 1_449_466_924);
        assert_eq!(rng.next_u31(), 229_283_573);
        assert_eq!(rng.next_u31(), 1_109_335_178);
    }

    #[test]
    fn seed_is_masked_to_31_bits() {
        assert_eq!(SeededRandom::new(-1).state(), 0x7FFF_FFFF);
        assert_eq!(SeededRandom::new(1 << 40 | 7).state(), 7);

        let mut a = SeededRandom::new(1);
        let mut b = SeededRandom::new((1 << 31) + 1);
        assert_eq!(a.next_u31(), 1_103_527_590);
        assert_eq!(b.next_u31(), 1_103_527_590);
    }

    #[test]
    fn floats_stay_in_range() {
        let mut rng = SeededRandom::new(987_654);
        for _ in 0..10_000 {
            let f = rng.next_float();
            assert!((0.0..1.0).contains(&f));
            let r = rng.next_range(-50.0, 50.0);
            assert!((-50.0..50.0).contains(&r));
            let i = rng.next_int(3, 7);
            assert!((3..7).contains(&i));
        }
    }

    #[test]
    fn identical_seeds_identical_streams() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..256 {
            assert_eq!(a.next_float().to_bits(), b.next_float().to_bits());
        }
    }

    #[test]
    fn zero_draw_selects_first_nonzero_bucket() {
        let table = [('a', 0), ('b', 0), ('c', 5), ('d', 5)];
        assert_eq!(weighted_pick(&table, |_| 0), Some('c'));
        assert_eq!(weighted_pick(&table, |_| 4), Some('c'));
        assert_eq!(weighted_pick(&table, |_| 5), Some('d'));
    }

    #[test]
    fn empty_table_picks_nothing() {
        let table: [(u8, u32); 2] = [(1, 0), (2, 0)];
        assert_eq!(weighted_pick(&table, |_| 0), None);
        assert_eq!(weighted_pick::<u8>(&[], |_| 0), None);
    }

    #[test]
    fn draw_receives_total_weight() {
        let table = [(1u32, 50), (2, 25), (3, 15), (5, 8), (10, 2)];
        let mut seen_total = 0;
        weighted_pick(&table, |total| {
            seen_total = total;
            0
        });
        assert_eq!(seen_total, 100);
    }

    #[test]
    fn empirical_distribution_converges() {
        let table = [(1u32, 50), (2, 25), (3, 15), (5, 8), (10, 2)];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts = [0u32; 5];
        let trials = 200_000;
        for _ in 0..trials {
            let pick = weighted_pick(&table, |total| rng.gen_range(0..total)).unwrap();
            let idx = table.iter().position(|(m, _)| *m == pick).unwrap();
            counts[idx] += 1;
        }
        for (i, (_, weight)) in table.iter().enumerate() {
            let expected = *weight as f64 / 100.0;
            let observed = counts[i] as f64 / trials as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "bucket {i}: expected {expected}, observed {observed}"
            );
        }
    }

    #[test]
    fn lcg_draws_also_converge() {
        let table = [(0usize, 70), (1, 30)];
        let mut rng = SeededRandom::new(2024);
        let mut hits = 0;
        let trials = 50_000;
        for _ in 0..trials {
            if weighted_pick(&table, |total| rng.next_below(total)) == Some(0) {
                hits += 1;
            }
        }
        let observed = hits as f64 / trials as f64;
        assert!((observed - 0.7).abs() < 0.02, "observed {observed}");
    }

    proptest! {
        #[test]
        fn pick_is_always_a_weighted_bucket(
            weights in proptest::collection::vec(0u32..20, 1..12),
            roll in 0u32..1000,
        ) {
            let table: Vec<(usize, u32)> = weights.iter().copied().enumerate().collect();
            let total: u32 = weights.iter().sum();
            let picked = weighted_pick(&table, |t| roll % t.max(1));
            if total == 0 {
                prop_assert!(picked.is_none());
            } else {
                let idx = picked.unwrap();
                prop_assert!(weights[idx] > 0);
            }
        }
    }
}
