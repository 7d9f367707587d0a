//! Market making configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MmError, MmResult};

/// Largest decimal precision accepted for order submission.
const MAX_DECIMALS: u32 = 18;

/// Market making configuration. Loaded once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Trading symbol (e.g. "BTCUSDT").
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Full quoted spread in basis points; each side sits half of it from mid.
    #[serde(default = "default_spread_bps")]
    pub spread_bps: Decimal,

    /// Size of each quote in base units.
    #[serde(default = "default_quote_size")]
    pub quote_size: Decimal,

    /// Maximum absolute inventory in base units.
    #[serde(default = "default_max_position")]
    pub max_position: Decimal,

    /// Inventory skew factor (0.0 = no skew, 1.0 = skew by a full half-spread at max inventory).
    /// When long, both quotes move down; when short, both move up.
    #[serde(default = "default_skew_factor")]
    pub skew_factor: Decimal,

    /// Delay between quote refresh cycles in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Decimal places for submitted prices.
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,

    /// Decimal places for submitted quantities.
    #[serde(default = "default_qty_decimals")]
    pub qty_decimals: u32,

    /// Number of recent account trades fetched per cycle for fill reconciliation.
    #[serde(default = "default_trade_history_limit")]
    pub trade_history_limit: u32,

    /// Upper bound for the post-failure backoff delay in milliseconds.
    /// 0 keeps the fixed polling cadence regardless of failures.
    #[serde(default)]
    pub max_backoff_ms: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            spread_bps: default_spread_bps(),
            quote_size: default_quote_size(),
            max_position: default_max_position(),
            skew_factor: default_skew_factor(),
            update_interval_ms: default_update_interval_ms(),
            price_decimals: default_price_decimals(),
            qty_decimals: default_qty_decimals(),
            trade_history_limit: default_trade_history_limit(),
            max_backoff_ms: 0,
        }
    }
}

impl StrategyConfig {
    /// Polling interval as a `Duration`.
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Reject parameter combinations the quote engine cannot honour.
    pub fn validate(&self) -> MmResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(MmError::InvalidConfig("symbol must not be empty".into()));
        }
        if self.spread_bps < Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "spread_bps must be >= 0, got {}",
                self.spread_bps
            )));
        }
        if self.quote_size <= Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "quote_size must be > 0, got {}",
                self.quote_size
            )));
        }
        if self.max_position < Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "max_position must be >= 0, got {}",
                self.max_position
            )));
        }
        if self.skew_factor < Decimal::ZERO || self.skew_factor > Decimal::ONE {
            return Err(MmError::InvalidConfig(format!(
                "skew_factor must be within [0, 1], got {}",
                self.skew_factor
            )));
        }
        if self.update_interval_ms == 0 {
            return Err(MmError::InvalidConfig(
                "update_interval_ms must be > 0".into(),
            ));
        }
        if self.price_decimals > MAX_DECIMALS || self.qty_decimals > MAX_DECIMALS {
            return Err(MmError::InvalidConfig(format!(
                "price_decimals/qty_decimals must be <= {MAX_DECIMALS}"
            )));
        }
        if self.trade_history_limit == 0 {
            return Err(MmError::InvalidConfig(
                "trade_history_limit must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}
fn default_spread_bps() -> Decimal {
    Decimal::new(10, 0) // 10 bps = 0.1%
}
fn default_quote_size() -> Decimal {
    Decimal::new(1, 3) // 0.001 BTC
}
fn default_max_position() -> Decimal {
    Decimal::new(1, 2) // 0.01 BTC
}
fn default_skew_factor() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_update_interval_ms() -> u64 {
    5000 // 5 seconds
}
fn default_price_decimals() -> u32 {
    2
}
fn default_qty_decimals() -> u32 {
    5
}
fn default_trade_history_limit() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.spread_bps, dec!(10));
        assert_eq!(config.quote_size, dec!(0.001));
        assert_eq!(config.max_position, dec!(0.01));
        assert_eq!(config.skew_factor, dec!(0.5));
        assert_eq!(config.update_interval(), Duration::from_secs(5));
        assert_eq!(config.price_decimals, 2);
        assert_eq!(config.qty_decimals, 5);
        assert_eq!(config.trade_history_limit, 10);
        assert_eq!(config.max_backoff_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let toml_str = r#"
symbol = "ETHUSDT"
spread_bps = "20"
"#;
        let config: StrategyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.spread_bps, dec!(20));
        assert_eq!(config.quote_size, dec!(0.001));
        assert_eq!(config.update_interval_ms, 5000);
    }

    #[test]
    fn test_validate_rejects_skew_out_of_range() {
        let config = StrategyConfig {
            skew_factor: dec!(1.5),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MmError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_quote_size() {
        let config = StrategyConfig {
            quote_size: dec!(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = StrategyConfig {
            update_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_symbol() {
        let config = StrategyConfig {
            symbol: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_position_is_valid() {
        let config = StrategyConfig {
            max_position: dec!(0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
