//! Order price/size precision.

use mmbot_core::{Price, Size};

/// Fixed decimal precision applied at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPrecision {
    pub price_decimals: u32,
    pub qty_decimals: u32,
}

impl OrderPrecision {
    pub fn new(price_decimals: u32, qty_decimals: u32) -> Self {
        Self {
            price_decimals,
            qty_decimals,
        }
    }

    /// Round half-to-even to `price_decimals`.
    #[inline]
    pub fn price(&self, price: Price) -> Price {
        price.round_dp(self.price_decimals)
    }

    /// Truncate toward zero to `qty_decimals`, so a capped size never grows.
    #[inline]
    pub fn size(&self, size: Size) -> Size {
        size.truncate_dp(self.qty_decimals)
    }
}
