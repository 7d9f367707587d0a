//! Exchange connectivity for mmbot.
//!
//! The trading core only sees [`ExchangeClient`], a dyn-compatible capability
//! interface with the five operations the bot needs. Two implementations:
//!
//! - [`BinanceSpotClient`]: signed REST calls against Binance spot (testnet by default)
//! - [`MockExchange`]: in-memory double that records calls and replays scripted results

pub mod binance;
pub mod client;
pub mod error;
pub mod mock;

pub use binance::{BinanceConfig, BinanceSpotClient, Credentials};
pub use client::{BoxFuture, DynExchangeClient, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use mock::{MockCall, MockExchange, MockOp};
