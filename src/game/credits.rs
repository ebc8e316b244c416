//! Fixed-point currency
//!
//! Balances, wagers and payouts are whole cents stored in an `i64`.
//! Multipliers are applied once and truncated toward zero, so a payout
//! never rounds up past what the multiplier table allows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Cents per whole credit
pub const CENTS_PER_CREDIT: i64 = 100;

/// Currency amount in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credits(i64);

impl Credits {
    pub const ZERO: Credits = Credits(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole credits, saturating at the `i64` cent range
    pub const fn whole(credits: i64) -> Self {
        Self(credits.saturating_mul(CENTS_PER_CREDIT))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Subtract, returning `None` if the result would go negative
    pub fn checked_debit(self, amount: Credits) -> Option<Credits> {
        let rest = self.0.checked_sub(amount.0)?;
        (rest >= 0).then_some(Credits(rest))
    }

    /// Multiply by an integer count
    pub fn times(self, n: u32) -> Credits {
        Credits(self.0.saturating_mul(n as i64))
    }

    /// Scale by a real factor, truncating to whole cents
    pub fn scale(self, factor: f64) -> Credits {
        if !factor.is_finite() || factor <= 0.0 {
            return Credits::ZERO;
        }
        // Nudge past representation error so 0.7 × 1000 stays 700
        Credits((self.0 as f64 * factor + 1e-6).trunc() as i64)
    }

    /// Ratio of two amounts, 0 when the denominator is zero
    pub fn ratio(self, denominator: Credits) -> f64 {
        if denominator.0 == 0 {
            0.0
        } else {
            self.0 as f64 / denominator.0 as f64
        }
    }

    pub fn clamp(self, min: Credits, max: Credits) -> Credits {
        Credits(self.0.clamp(min.0, max.0))
    }
}

impl Add for Credits {
    type Output = Credits;

    fn add(self, rhs: Credits) -> Credits {
        Credits(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Credits {
    fn add_assign(&mut self, rhs: Credits) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Credits {
    type Output = Credits;

    fn sub(self, rhs: Credits) -> Credits {
        Credits(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            abs / CENTS_PER_CREDIT as u64,
            abs % CENTS_PER_CREDIT as u64
        )
    }
}
