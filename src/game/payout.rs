//! Kill payouts

use rand::Rng;

use super::catalog::FishKind;
use super::credits::Credits;
use super::rng::weighted_pick;

/// Payout multiplier distribution
#[derive(Debug, Clone)]
pub struct PayoutConfig {
    /// `(multiplier, weight)` pairs
    pub multipliers: Vec<(u32, u32)>,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            multipliers: vec![(1, 50), (2, 25), (3, 15), (5, 8), (10, 2)],
        }
    }
}

impl PayoutConfig {
    /// Weighted mean of the multiplier table
    pub fn average_multiplier(&self) -> f64 {
        let total: u64 = self.multipliers.iter().map(|(_, w)| *w as u64).sum();
        if total == 0 {
            return 1.0;
        }
        let weighted: u64 = self
            .multipliers
            .iter()
            .map(|(m, w)| *m as u64 * *w as u64)
            .sum();
        weighted as f64 / total as f64
    }
}

/// Multiplicative modifiers applied on top of the rolled multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutModifiers {
    /// Hot/cold payout boost
    pub table: f64,
    /// Hot seat multiplier of the killer's slot
    pub hot_seat: f64,
    /// Outcome of a boss interaction
    pub interaction: f64,
}

impl Default for PayoutModifiers {
    fn default() -> Self {
        Self {
            table: 1.0,
            hot_seat: 1.0,
            interaction: 1.0,
        }
    }
}

impl PayoutModifiers {
    pub fn product(&self) -> f64 {
        self.table * self.hot_seat * self.interaction
    }
}

/// Rolls multipliers and turns kills into credits
#[derive(Debug, Clone)]
pub struct PayoutEngine {
    config: PayoutConfig,
    average_multiplier: f64,
}

impl PayoutEngine {
    pub fn new(config: PayoutConfig) -> Self {
        let average_multiplier = config.average_multiplier();
        Self {
            config,
            average_multiplier,
        }
    }

    pub fn average_multiplier(&self) -> f64 {
        self.average_multiplier
    }

    /// One weighted draw from the multiplier table
    pub fn roll_multiplier(&self, rng: &mut impl Rng) -> u32 {
        weighted_pick(&self.config.multipliers, |total| rng.gen_range(0..total)).unwrap_or(1)
    }

    /// Regular fish pay `base × multiplier` times the wager; bosses pay
    /// `base × multiplier` whole credits.
    pub fn compute(
        &self,
        kind: &FishKind,
        multiplier: u32,
        wager: Credits,
        modifiers: PayoutModifiers,
    ) -> Credits {
        let factor = kind.base_value * multiplier as f64 * modifiers.product();
        if kind.is_boss() {
            Credits::whole(1).scale(factor)
        } else {
            wager.scale(factor)
        }
    }
}

impl Default for PayoutEngine {
    fn default() -> Self {
        Self::new(PayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn average_of_default_table() {
        let config = PayoutConfig::default();
        assert!((config.average_multiplier() - 2.05).abs() < 1e-9);
    }

    #[test]
    fn empty_table_averages_to_one() {
        let config = PayoutConfig { multipliers: vec![] };
        assert_eq!(config.average_multiplier(), 1.0);
        let engine = PayoutEngine::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(engine.roll_multiplier(&mut rng), 1);
    }

    #[test]
    fn rolls_follow_weights() {
        let engine = PayoutEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trials = 100_000;
        let ones = (0..trials)
            .filter(|_| engine.roll_multiplier(&mut rng) == 1)
            .count();
        let share = ones as f64 / trials as f64;
        assert!((share - 0.5).abs() < 0.01, "share of 1x was {share}");
    }

    #[test]
    fn regular_fish_scale_with_wager() {
        let engine = PayoutEngine::default();
        let clownfish = catalog::lookup(0).unwrap();
        let payout = engine.compute(clownfish, 3, Credits::whole(10), PayoutModifiers::default());
        let expected = Credits::whole(10).scale(clownfish.base_value * 3.0);
        assert_eq!(payout, expected);
    }

    #[test]
    fn bosses_pay_flat_credits() {
        let engine = PayoutEngine::default();
        let tuna = catalog::lookup(100).unwrap();
        let small = engine.compute(tuna, 2, Credits::whole(10), PayoutModifiers::default());
        let large = engine.compute(tuna, 2, Credits::whole(200), PayoutModifiers::default());
        assert_eq!(small, large);
        assert_eq!(small, Credits::whole(1).scale(tuna.base_value * 2.0));
    }

    #[test]
    fn modifiers_multiply() {
        let engine = PayoutEngine::default();
        let clownfish = catalog::lookup(0).unwrap();
        let modifiers = PayoutModifiers {
            table: 1.8,
            hot_seat: 1.1,
            interaction: 0.5,
        };
        let boosted = engine.compute(clownfish, 1, Credits::whole(100), modifiers);
        let plain = engine.compute(clownfish, 1, Credits::whole(100), PayoutModifiers::default());
        assert_eq!(plain, Credits::whole(100));
        // 100 × 0.99, give or take a truncated cent
        assert!((boosted.cents() - 9_900).abs() <= 1, "{boosted}");
    }
}
