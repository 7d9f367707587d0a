//! Core domain types for the mmbot market maker.
//!
//! This crate provides fundamental types used throughout the trading system:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `OrderSide`, `TimeInForce`, `OrderId`, `ClientOrderId`: Order identity and enums
//! - `TopOfBook`, `Trade`, `Balance`: Exchange data consumed by the engine

pub mod decimal;
pub mod error;
pub mod order;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use order::{ClientOrderId, LimitOrderRequest, OrderId, OrderSide, TimeInForce};
pub use types::{Balance, BookState, TopOfBook, Trade, TradeId};
