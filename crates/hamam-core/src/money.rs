//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A session only closes when items - payments == 0 EXACTLY.             │
//! │  With floats, 320.00 - 300.00 - 20.00 may not be zero.                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    32000 - 30000 - 2000 = 0   (always, exactly)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hamam_core::money::Money;
//!
//! let price = Money::from_cents(30_000);          // 300.00
//! let total = price + Money::from_cents(2_000);   // 320.00
//! assert_eq!(total.to_string(), "320.00");
//!
//! let parsed: Money = "320.00".parse().unwrap();
//! assert_eq!(parsed, total);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;

/// Number of fractional digits carried by [`Money`].
pub const MONEY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents / kuruş).
///
/// ## Design Decisions
/// - **i64 (signed)**: a balance can be negative when a session is over-paid
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// SessionItem.unit_price ──► × Quantity ──► line total ──┐
///                                                        ├──► Balance
/// Payment.amount ─────────────────────────► payments ────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use hamam_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies a unit price by a fixed-point quantity.
    ///
    /// Returns `None` when the rounded product does not fit in `i64` cents.
    ///
    /// ## Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  BANKERS ROUNDING (Round Half to Even)                              │
    /// │                                                                     │
    /// │  unit 0.25 × qty 0.5 = 0.125 → 0.12  (2 is even)                   │
    /// │  unit 0.35 × qty 0.5 = 0.175 → 0.18  (8 is even)                   │
    /// │                                                                     │
    /// │  Half-way cases alternate direction, so no systematic drift        │
    /// │  accumulates across many line items.                               │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use hamam_core::{Money, Quantity};
    ///
    /// let tea = Money::from_cents(1_000);
    /// assert_eq!(tea.checked_times(Quantity::whole(2)), Some(Money::from_cents(2_000)));
    /// assert_eq!(tea.checked_times("1.5".parse().unwrap()), Some(Money::from_cents(1_500)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_times(Quantity::whole(2)), None);
    /// ```
    pub fn checked_times(&self, quantity: Quantity) -> Option<Money> {
        // i64 × i64 always fits in i128
        let raw = self.0 as i128 * quantity.thousandths() as i128;
        i64::try_from(div_round_half_even(raw, 1000)).ok().map(Money)
    }
}

/// Integer division rounding half to even. `divisor` must be positive.
fn div_round_half_even(value: i128, divisor: i128) -> i128 {
    let quotient = value.div_euclid(divisor);
    let remainder = value.rem_euclid(divisor);
    let twice = remainder * 2;

    if twice > divisor || (twice == divisor && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Fixed-Point Text Helpers
// =============================================================================

/// Parses decimal text ("320", "320.5", "-1.25") into a scaled integer.
///
/// Shared by [`Money`] (scale 2) and [`Quantity`] (scale 3). More fractional
/// digits than `scale` is rejected rather than silently rounded.
pub(crate) fn parse_fixed_point(
    input: &str,
    scale: u32,
    field: &str,
) -> Result<i64, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason,
    };

    let text = input.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("not a number".to_string()));
    }

    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a number".to_string()));
    }

    if frac.len() > scale as usize {
        return Err(invalid(format!("at most {} decimal places", scale)));
    }

    let too_large = || invalid("value is too large".to_string());

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| too_large())?
    };

    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let digits: i64 = frac.parse().map_err(|_| too_large())?;
        digits * 10i64.pow(scale - frac.len() as u32)
    };

    let value = whole_value
        .checked_mul(10i64.pow(scale))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(too_large)?;

    Ok(if negative { -value } else { value })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with exactly two decimals, no currency symbol.
///
/// ## Note
/// The engine is single-currency; the receipt renderer decides the symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, MONEY_SCALE, "amount").map(Money)
    }
}

/// Default money is zero.
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
