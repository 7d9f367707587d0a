//! Quote price calculation engine.
//!
//! Computes a two-sided quote from:
//! - Reference mid price
//! - Fixed half-spread (spread_bps / 2)
//! - Inventory skew (shift both quotes to work inventory back toward flat)
//! - Position-limit size capping

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use mmbot_core::{Price, Size};

use crate::config::StrategyConfig;
use crate::error::{MmError, MmResult};

/// Computed quote for one cycle. A side with zero size is not quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Bid price.
    pub bid_price: Price,
    /// Ask price.
    pub ask_price: Price,
    /// Bid size in base units.
    pub bid_size: Size,
    /// Ask size in base units.
    pub ask_size: Size,
}

impl Quote {
    /// Whether the bid side should be quoted this cycle.
    pub fn has_bid(&self) -> bool {
        self.bid_size.is_positive()
    }

    /// Whether the ask side should be quoted this cycle.
    pub fn has_ask(&self) -> bool {
        self.ask_size.is_positive()
    }
}

/// Calculate the quote for the current cycle.
///
/// # Arguments
/// * `mid_price` - Reference mid price, must be > 0
/// * `inventory` - Signed position in base units. Positive = long, negative = short.
/// * `config` - Strategy configuration
///
/// The inventory ratio is deliberately not clamped: inventory beyond
/// `max_position` skews further than a full half-spread.
///
/// # Errors
/// `MmError::InvalidArgument` if `mid_price` is not positive.
pub fn compute_quote(
    mid_price: Price,
    inventory: Decimal,
    config: &StrategyConfig,
) -> MmResult<Quote> {
    if !mid_price.is_positive() {
        return Err(MmError::InvalidArgument(format!(
            "mid price must be > 0, got {mid_price}"
        )));
    }

    let mid = mid_price.inner();
    let bps_divisor = dec!(10000);

    let half_spread = mid * (config.spread_bps / Decimal::TWO) / bps_divisor;

    let inventory_ratio = if config.max_position.is_zero() {
        Decimal::ZERO
    } else {
        inventory / config.max_position
    };

    // Long inventory → positive skew → both prices move down
    let skew = half_spread * inventory_ratio * config.skew_factor;

    let room_to_buy = config.max_position - inventory;
    let room_to_sell = config.max_position + inventory;

    let (bid_price, bid_size) =
        quotable_side(mid - half_spread - skew, config.quote_size, room_to_buy);
    let (ask_price, ask_size) =
        quotable_side(mid + half_spread - skew, config.quote_size, room_to_sell);

    Ok(Quote {
        bid_price,
        ask_price,
        bid_size,
        ask_size,
    })
}

/// Price and size for one side. A side priced at or below zero is not quoted.
fn quotable_side(price: Decimal, quote_size: Decimal, room: Decimal) -> (Price, Size) {
    if price <= Decimal::ZERO {
        return (Price::ZERO, Size::ZERO);
    }
    let size = quote_size.min(room.max(Decimal::ZERO));
    (Price::new(price), Size::new(size))
}
