//! # Quantity Module
//!
//! Line-item quantities are non-negative real numbers ("1.5 hours of sauna",
//! "2 teas"). They are stored as integer thousandths so that line totals stay
//! exact integer math, the same way [`Money`](crate::Money) stores cents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::parse_fixed_point;

/// Number of fractional digits carried by [`Quantity`].
pub const QUANTITY_SCALE: u32 = 3;

/// A fixed-point quantity with three fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths (`1500` = 1.5).
    #[inline]
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Quantity(thousandths)
    }

    /// Creates a whole-unit quantity.
    #[inline]
    pub const fn whole(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Returns the raw value in thousandths.
    #[inline]
    pub const fn thousandths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Shows the shortest exact form: `2`, `1.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / 1000;
        let frac = abs % 1000;

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }

        let frac = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, frac.trim_end_matches('0'))
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, QUANTITY_SCALE, "quantity").map(Quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let q: Quantity = "1.5".parse().unwrap();
        assert_eq!(q.thousandths(), 1500);
        assert_eq!(q.to_string(), "1.5");

        assert_eq!("2".parse::<Quantity>().unwrap(), Quantity::whole(2));
        assert_eq!(Quantity::whole(2).to_string(), "2");
        assert_eq!(Quantity::from_thousandths(125).to_string(), "0.125");
        assert_eq!(Quantity::from_thousandths(50).to_string(), "0.05");

        assert!("1.2345".parse::<Quantity>().is_err());
        assert!("two".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_is_positive() {
        assert!(Quantity::whole(1).is_positive());
        assert!(!Quantity::whole(0).is_positive());
        assert!(!Quantity::from_thousandths(-1).is_positive());
    }
}
