//! mmbot: single-symbol market maker for Binance spot.
//!
//! Wires the pieces together:
//! - Configuration (TOML file + environment credentials)
//! - The trading loop: market data → quote → cancel/replace → fills → status
//! - Signal handling for graceful shutdown

pub mod app;
pub mod config;
pub mod error;
pub mod shutdown;

pub use app::{backoff_delay, CycleStatus, LoopState, TradingLoop};
pub use config::{AppConfig, ExchangeConfig};
pub use error::{AppError, AppResult};
pub use shutdown::spawn_signal_listener;
