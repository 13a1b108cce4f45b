//! # Money Module
//!
//! Integer money for a dual-currency drawer.
//!
//! ## Two currencies, one source of truth
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Money (USD cents)   = the SETTLEMENT currency. Every total, debt   │
//! │                        and ledger amount is authoritative here.     │
//! │                                                                     │
//! │  Ves (VES céntimos)  = the SECONDARY currency. Only ever derived    │
//! │                        from Money through an exchange rate, for     │
//! │                        display and physical-cash counting.          │
//! │                                                                     │
//! │  A VES amount is NEVER the basis of debt accounting: converting     │
//! │  twice through two representations compounds rounding drift.       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Integer Cents?
//! `0.1 + 0.2 != 0.3` in floating point. All amounts are stored in the
//! smallest unit (i64); floats only appear transiently inside a rate
//! conversion, which rounds to the cent immediately.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money (USD)
// =============================================================================

/// A monetary value in USD cents, the settlement currency.
///
/// ## Design Decisions
/// - **i64 (signed)**: variances and shortages can be negative
/// - **Single-field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts, only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50, not -$4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99, absolute).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero dollars.
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

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Converts to the secondary currency at the given rate
    /// (VES per USD), rounding to the céntimo.
    ///
    /// ## Example
    /// ```rust
    /// use venta_core::money::Money;
    ///
    /// let total = Money::from_cents(2500); // $25.00
    /// let ves = total.to_ves(36.5);
    /// assert_eq!(ves.cents(), 91250); // Bs. 912.50
    /// ```
    pub fn to_ves(&self, rate: f64) -> Ves {
        Ves::from_cents((self.0 as f64 * rate).round() as i64)
    }
}

/// Debug/log formatting. UI display goes through the frontend formatter.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Ves (secondary currency)
// =============================================================================

/// A monetary value in VES céntimos, the secondary/display currency.
///
/// Deliberately NOT interchangeable with [`Money`]: the compiler refuses
/// to add dollars to bolívares, and every crossing goes through a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ves(i64);

impl Ves {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Ves(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Ves(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Ves(self.0.abs())
    }

    /// Converts back to the settlement currency at the given rate
    /// (VES per USD), rounding to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use venta_core::money::Ves;
    ///
    /// let tendered = Ves::from_cents(50_000); // Bs. 500
    /// assert_eq!(tendered.to_usd(36.5).cents(), 1370); // ≈ $13.70
    /// ```
    pub fn to_usd(&self, rate: f64) -> Money {
        Money::from_cents((self.0 as f64 / rate).round() as i64)
    }
}

impl fmt::Display for Ves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}Bs. {}.{:02}",
            sign,
            (self.0 / 100).abs(),
            (self.0 % 100).abs()
        )
    }
}

impl Default for Ves {
    fn default() -> Self {
        Ves::zero()
    }
}

impl Add for Ves {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Ves(self.0 + other.0)
    }
}

impl Sub for Ves {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Ves(self.0 - other.0)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
        assert_eq!(format!("{}", Ves::from_cents(91250)), "Bs. 912.50");
        assert_eq!(format!("{}", Ves::from_cents(-100)), "-Bs. 1.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(Money::from_cents(299).multiply_quantity(3).cents(), 897);
    }

    #[test]
    fn test_sum() {
        let total: Money = [1000, 250, 75]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 1325);
    }

    #[test]
    fn test_usd_to_ves_conversion() {
        // $25.00 at 36.5 Bs/$ = Bs. 912.50
        let ves = Money::from_cents(2500).to_ves(36.5);
        assert_eq!(ves.cents(), 91250);
    }

    #[test]
    fn test_ves_to_usd_rounds_to_cent() {
        // Bs. 500 at 36.5 Bs/$ = $13.6986... → $13.70
        let usd = Ves::from_cents(50_000).to_usd(36.5);
        assert_eq!(usd.cents(), 1370);
    }

    #[test]
    fn test_round_trip_loses_at_most_a_cent() {
        let original = Money::from_cents(2500);
        let back = original.to_ves(36.5).to_usd(36.5);
        assert!((back - original).abs().cents() <= 1);
    }

    #[test]
    fn test_zero_and_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
        assert!(Ves::from_cents(-1).is_negative());
    }
}
