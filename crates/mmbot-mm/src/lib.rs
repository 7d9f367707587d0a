//! Market making strategy for mmbot.
//!
//! Provides the pure, exchange-independent parts of the bot:
//! - Quote calculation with inventory skew and position-limit size capping
//! - Position tracking with average entry and realized/unrealized PnL
//! - Fill deduplication for trade-history polling
//!
//! # Architecture
//!
//! ```text
//! mid price ──► compute_quote(mid, inventory, config) ──► Quote
//!                                ▲
//! trade history ──► FillDeduplicator ──► PositionTracker.apply_fill()
//! ```

pub mod config;
pub mod error;
pub mod fills;
pub mod position;
pub mod quote_engine;

pub use config::StrategyConfig;
pub use error::{MmError, MmResult};
pub use fills::FillDeduplicator;
pub use position::{Position, PositionTracker};
pub use quote_engine::{compute_quote, Quote};
