//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A settlement that splits a 1.50 refund across cash and account        │
//! │  credit must add back up to exactly 1.50, every time.                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    150 cents split as 100 + 50 reconstructs to exactly 150             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use creamline_core::money::Money;
//!
//! let price = Money::from_cents(150); // 1.50
//! let line = price * 2;               // 3.00
//! assert_eq!(line.cents(), 300);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are meaningful (refund due, credit)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support, serialized as a bare integer
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (rupees/dollars).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99, sign stripped).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity (line totals).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes a percentage of this amount in basis points, rounded half-up.
    ///
    /// ## Example
    /// ```rust
    /// use creamline_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10_000); // 100.00
    /// let discount = subtotal.percentage_bps(1000); // 10%
    /// assert_eq!(discount.cents(), 1000); // 10.00
    /// ```
    pub fn percentage_bps(&self, bps: u32) -> Money {
        // i128 to avoid overflow on large totals; +5000 rounds half-up
        let amount = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_cents(amount as i64)
    }

    /// Formats without a currency symbol, two decimals: `"500.00"`.
    ///
    /// ## Usage
    /// Payment summary strings on sales and returns use this shape, e.g.
    /// `"Partial (Cash (500.00) + Cheque (200.00)) - Outstanding: 300.00"`.
    pub fn to_unit_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display is for logs and debugging. API responses carry raw cents.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rs {}", self.to_unit_string())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [150, 250, 100].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total.cents(), 500);
    }

    #[test]
    fn test_percentage_bps() {
        let subtotal = Money::from_cents(10_000);
        assert_eq!(subtotal.percentage_bps(1000).cents(), 1000); // 10%
        assert_eq!(subtotal.percentage_bps(0).cents(), 0);

        // 8.25% of 10.00 = 0.825 -> rounds to 0.83
        assert_eq!(Money::from_cents(1000).percentage_bps(825).cents(), 83);
    }

    #[test]
    fn test_unit_string() {
        assert_eq!(Money::from_cents(50_000).to_unit_string(), "500.00");
        assert_eq!(Money::from_cents(150).to_unit_string(), "1.50");
        assert_eq!(Money::from_cents(-550).to_unit_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_unit_string(), "0.00");
        assert_eq!(Money::from_cents(5).to_unit_string(), "0.05");
    }

    #[test]
    fn test_refund_split_reconstructs_exactly() {
        // 1.50 refund split as 1.00 cash + 0.50 account credit
        let due = Money::from_cents(150);
        let cash = Money::from_cents(100);
        let credit = Money::from_cents(50);
        assert_eq!(cash + credit, due);
    }
}
