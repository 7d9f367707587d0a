//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round to `decimals` places, midpoints to even.
    ///
    /// The result carries exactly `decimals` places of scale.
    #[inline]
    pub fn round_dp(&self, decimals: u32) -> Self {
        let mut value = self
            .0
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven);
        value.rescale(decimals);
        Self(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Always non-negative; signed inventory is carried as a bare `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate toward zero to `decimals` places.
    ///
    /// Sizes are never rounded up so a capped quote cannot exceed its room.
    #[inline]
    pub fn truncate_dp(&self, decimals: u32) -> Self {
        let mut value = self.0.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
        value.rescale(decimals);
        Self(value)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_round_dp_half_even() {
        assert_eq!(Price::new(dec!(49962.505)).round_dp(2).inner(), dec!(49962.50));
        assert_eq!(Price::new(dec!(49962.515)).round_dp(2).inner(), dec!(49962.52));
        assert_eq!(Price::new(dec!(12345.6789)).round_dp(2).inner(), dec!(12345.68));
    }

    #[test]
    fn test_price_round_dp_pads_scale() {
        assert_eq!(Price::new(dec!(49975)).round_dp(2).to_string(), "49975.00");
        assert_eq!(Price::new(dec!(49962.5)).round_dp(2).to_string(), "49962.50");
    }

    #[test]
    fn test_size_truncates_toward_zero() {
        let size = Size::new(dec!(0.0019999));
        assert_eq!(size.truncate_dp(5).inner(), dec!(0.00199));
    }

    #[test]
    fn test_size_truncate_pads_scale() {
        assert_eq!(Size::new(dec!(0.001)).truncate_dp(5).to_string(), "0.00100");
    }
}
