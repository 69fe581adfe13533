use crate::error::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Tolerance used when comparing a tendered amount against an expected one.
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.01);

/// A monetary value in the club's currency.
///
/// Wraps `rust_decimal::Decimal` so money never goes through floating point.
/// Values are kept at full precision; rounding to cents happens explicitly via [`Money::round_cents`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Builds a strictly positive amount, as required for tendered payments and refunds.
    pub fn positive(amount: Decimal) -> Result<Self, LedgerError> {
        if amount > Decimal::ZERO {
            Ok(Self(amount))
        } else {
            Err(LedgerError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Unit amount times quantity.
    pub fn times(self, quantity: u8) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// True when `self` and `other` differ by no more than `tolerance`.
    pub fn approx_eq(self, other: Self, tolerance: Decimal) -> bool {
        (self.0 - other.0).abs() <= tolerance
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(10.0));
        let b = Money::new(dec!(2.5));
        assert_eq!(a + b, Money::new(dec!(12.5)));
        assert_eq!(a - b, Money::new(dec!(7.5)));
        assert_eq!(b.times(3), Money::new(dec!(7.5)));
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::new(dec!(15.0)));
    }

    #[test]
    fn test_positive_validation() {
        assert!(Money::positive(dec!(0.01)).is_ok());
        assert!(matches!(
            Money::positive(dec!(0)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Money::positive(dec!(-5)),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_tolerance() {
        let expected = Money::new(dec!(1070.00));
        assert!(Money::new(dec!(1070.01)).approx_eq(expected, DEFAULT_TOLERANCE));
        assert!(Money::new(dec!(1069.99)).approx_eq(expected, DEFAULT_TOLERANCE));
        assert!(!Money::new(dec!(1070.02)).approx_eq(expected, DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_display_always_two_places() {
        assert_eq!(Money::new(dec!(50)).to_string(), "50.00");
        assert_eq!(Money::new(dec!(12.345)).round_cents().to_string(), "12.35");
    }
}
