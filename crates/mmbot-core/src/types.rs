//! Common data types for exchange market and account data.
//!
//! Contains top-of-book, executed trades (our fills) and asset balances.

use crate::{OrderId, OrderSide, Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-of-book state (null side detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Both bid and ask are present and valid.
    Valid,
    /// No bid side (bid price is zero or missing).
    NoBid,
    /// No ask side (ask price is zero or missing).
    NoAsk,
    /// Both sides missing.
    Empty,
    /// Crossed or locked book (bid >= ask).
    Crossed,
}

impl BookState {
    /// Check if this state allows quoting.
    pub fn is_quotable(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for BookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::NoBid => write!(f, "NO_BID"),
            Self::NoAsk => write!(f, "NO_ASK"),
            Self::Empty => write!(f, "EMPTY"),
            Self::Crossed => write!(f, "CROSSED"),
        }
    }
}

/// Best bid and offer for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOfBook {
    /// Best bid price.
    pub bid_price: Price,
    /// Best bid size.
    pub bid_size: Size,
    /// Best ask price.
    pub ask_price: Price,
    /// Best ask size.
    pub ask_size: Size,
    /// Timestamp when this snapshot was received.
    pub received_at: DateTime<Utc>,
}

impl TopOfBook {
    /// Create a new snapshot stamped with the current time.
    pub fn new(bid_price: Price, bid_size: Size, ask_price: Price, ask_size: Size) -> Self {
        Self {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
            received_at: Utc::now(),
        }
    }

    /// Calculate mid price: (bid + ask) / 2.
    ///
    /// Returns None if the book is not in the `Valid` state.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.state().is_quotable() {
            return None;
        }
        Some(Price::new(
            (self.bid_price.inner() + self.ask_price.inner()) / Decimal::TWO,
        ))
    }

    /// Determine whether both sides are present and uncrossed.
    pub fn state(&self) -> BookState {
        let has_bid = self.bid_price.is_positive();
        let has_ask = self.ask_price.is_positive();

        match (has_bid, has_ask) {
            (false, false) => BookState::Empty,
            (true, false) => BookState::NoAsk,
            (false, true) => BookState::NoBid,
            (true, true) => {
                if self.bid_price < self.ask_price {
                    BookState::Valid
                } else {
                    BookState::Crossed
                }
            }
        }
    }
}

/// Exchange-assigned trade identifier. Monotonic per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of our own executions, as reported by the account trade history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade ID.
    pub id: TradeId,
    /// Order that was filled.
    pub order_id: OrderId,
    /// Our side of the trade.
    pub side: OrderSide,
    /// Executed price.
    pub price: Price,
    /// Executed quantity.
    pub size: Size,
    /// Execution time.
    pub time: DateTime<Utc>,
}

/// Balance of a single asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Available for trading.
    pub free: Decimal,
    /// Reserved by open orders.
    pub locked: Decimal,
}

impl Balance {
    /// True when neither free nor locked holds anything.
    pub fn is_empty(&self) -> bool {
        self.free <= Decimal::ZERO && self.locked <= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book(bid: Decimal, ask: Decimal) -> TopOfBook {
        TopOfBook::new(
            Price::new(bid),
            Size::new(dec!(1)),
            Price::new(ask),
            Size::new(dec!(1)),
        )
    }

    #[test]
    fn test_mid_price() {
        let tob = book(dec!(49990), dec!(50010));
        assert_eq!(tob.state(), BookState::Valid);
        assert_eq!(tob.mid_price(), Some(Price::new(dec!(50000))));
    }

    #[test]
    fn test_crossed_book_has_no_mid() {
        let tob = book(dec!(50010), dec!(49990));
        assert_eq!(tob.state(), BookState::Crossed);
        assert!(tob.mid_price().is_none());
    }

    #[test]
    fn test_missing_sides() {
        assert_eq!(book(dec!(0), dec!(100)).state(), BookState::NoBid);
        assert_eq!(book(dec!(100), dec!(0)).state(), BookState::NoAsk);
        assert_eq!(book(dec!(0), dec!(0)).state(), BookState::Empty);
        assert!(book(dec!(0), dec!(100)).mid_price().is_none());
    }

    #[test]
    fn test_balance_empty() {
        let empty = Balance::default();
        assert!(empty.is_empty());

        let locked = Balance {
            free: dec!(0),
            locked: dec!(0.5),
        };
        assert!(!locked.is_empty());
    }
}
