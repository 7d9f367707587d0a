//! Net position and PnL tracking.
//!
//! Tracks signed quantity, average entry price of the open side and
//! realized PnL for the single quoted symbol. Fills must be supplied exactly
//! once each; see [`crate::fills::FillDeduplicator`].

use mmbot_core::{OrderSide, Price, Size};
use rust_decimal::Decimal;

/// Position state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Signed quantity (positive = long, negative = short).
    pub quantity: Decimal,
    /// Average entry price of the open side. Zero while flat.
    pub avg_price: Decimal,
    /// Cumulative realized PnL in quote currency.
    pub realized_pnl: Decimal,
    /// Total number of fills applied.
    pub fill_count: u64,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            quantity: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            fill_count: 0,
        }
    }
}

impl Position {
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// Owns the bot's [`Position`] and applies fills to it.
#[derive(Debug, Default)]
pub struct PositionTracker {
    position: Position,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fill.
    ///
    /// Adding to a position re-weights the average entry; reducing it
    /// realizes PnL on the covered amount. Crossing through zero flips the
    /// position and the average entry becomes the fill price.
    pub fn apply_fill(&mut self, side: OrderSide, size: Size, price: Price) {
        let qty = size.inner();
        let px = price.inner();
        let pos = &mut self.position;

        match side {
            OrderSide::Buy if pos.quantity >= Decimal::ZERO => {
                let total_cost = pos.quantity * pos.avg_price + qty * px;
                pos.quantity += qty;
                pos.avg_price = if pos.quantity > Decimal::ZERO {
                    total_cost / pos.quantity
                } else {
                    Decimal::ZERO
                };
            }
            OrderSide::Buy => {
                // Covering a short
                let covered = qty.min(-pos.quantity);
                pos.realized_pnl += covered * (pos.avg_price - px);
                pos.quantity += qty;
                if pos.quantity > Decimal::ZERO {
                    pos.avg_price = px;
                } else if pos.quantity.is_zero() {
                    pos.avg_price = Decimal::ZERO;
                }
            }
            OrderSide::Sell if pos.quantity <= Decimal::ZERO => {
                let total_cost = -pos.quantity * pos.avg_price + qty * px;
                pos.quantity -= qty;
                pos.avg_price = if pos.quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    total_cost / -pos.quantity
                };
            }
            OrderSide::Sell => {
                // Closing a long
                let closed = qty.min(pos.quantity);
                pos.realized_pnl += closed * (px - pos.avg_price);
                pos.quantity -= qty;
                if pos.quantity < Decimal::ZERO {
                    pos.avg_price = px;
                } else if pos.quantity.is_zero() {
                    pos.avg_price = Decimal::ZERO;
                }
            }
        }

        pos.fill_count += 1;
    }

    /// Mark-to-market PnL of the open position. Zero when flat.
    pub fn unrealized_pnl(&self, current_price: Price) -> Decimal {
        if self.position.is_flat() {
            return Decimal::ZERO;
        }
        self.position.quantity * (current_price.inner() - self.position.avg_price)
    }

    /// Realized plus unrealized PnL.
    pub fn total_pnl(&self, current_price: Price) -> Decimal {
        self.position.realized_pnl + self.unrealized_pnl(current_price)
    }

    /// Signed inventory.
    #[inline]
    pub fn quantity(&self) -> Decimal {
        self.position.quantity
    }

    #[inline]
    pub fn realized_pnl(&self) -> Decimal {
        self.position.realized_pnl
    }

    #[inline]
    pub fn fill_count(&self) -> u64 {
        self.position.fill_count
    }

    /// Average entry price, `None` while flat.
    pub fn avg_entry(&self) -> Option<Price> {
        if self.position.is_flat() {
            None
        } else {
            Some(Price::new(self.position.avg_price))
        }
    }

    /// Snapshot of the current state.
    pub fn position(&self) -> Position {
        self.position
    }
}
