//! Application configuration.

use std::time::Duration;

use mmbot_exchange::{BinanceConfig, Credentials};
use mmbot_mm::StrategyConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Exchange connection settings.
///
/// Credentials never live in the file; only the names of the environment
/// variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// REST base URL. Defaults to the Binance spot testnet.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// recvWindow for signed requests (ms).
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// Per-request HTTP timeout (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Environment variable holding the API secret.
    #[serde(default = "default_api_secret_env")]
    pub api_secret_env: String,
}

fn default_base_url() -> String {
    mmbot_exchange::binance::TESTNET_BASE_URL.to_string()
}
fn default_recv_window_ms() -> u64 {
    5000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_api_key_env() -> String {
    "BINANCE_TESTNET_API_KEY".to_string()
}
fn default_api_secret_env() -> String {
    "BINANCE_TESTNET_API_SECRET".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            recv_window_ms: default_recv_window_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            api_key_env: default_api_key_env(),
            api_secret_env: default_api_secret_env(),
        }
    }
}

impl ExchangeConfig {
    pub fn binance_config(&self) -> BinanceConfig {
        BinanceConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            recv_window_ms: self.recv_window_ms,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// Read API credentials from the configured environment variables.
    pub fn load_credentials(&self) -> AppResult<Credentials> {
        self.credentials_from(
            std::env::var(&self.api_key_env).ok(),
            std::env::var(&self.api_secret_env).ok(),
        )
    }

    fn credentials_from(
        &self,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> AppResult<Credentials> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (non_empty(api_key), non_empty(api_secret)) {
            (Some(key), Some(secret)) => Ok(Credentials::new(key, secret)),
            _ => Err(AppError::MissingCredentials {
                key_env: self.api_key_env.clone(),
                secret_env: self.api_secret_env.clone(),
            }),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("exchange.base_url must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "exchange.request_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

impl AppConfig {
    /// Load and validate from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.strategy
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.exchange.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_config() {
        let toml_str = r#"
[strategy]
symbol = "ETHUSDT"
spread_bps = "8"
quote_size = "0.01"
max_position = "0.1"
skew_factor = "0.25"
update_interval_ms = 2000
price_decimals = 2
qty_decimals = 4
max_backoff_ms = 30000

[exchange]
base_url = "https://api.binance.com/"
recv_window_ms = 3000
"#;
        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.strategy.symbol, "ETHUSDT");
        assert_eq!(config.strategy.spread_bps, dec!(8));
        assert_eq!(config.strategy.skew_factor, dec!(0.25));
        assert_eq!(config.strategy.qty_decimals, 4);
        assert_eq!(config.strategy.max_backoff_ms, 30000);
        assert_eq!(config.strategy.trade_history_limit, 10);

        let binance = config.exchange.binance_config();
        assert_eq!(binance.base_url, "https://api.binance.com");
        assert_eq!(binance.recv_window_ms, 3000);
        assert_eq!(binance.request_timeout, Duration::from_secs(10));
        assert_eq!(config.exchange.api_key_env, "BINANCE_TESTNET_API_KEY");
    }

    #[test]
    fn test_shipped_default_config() {
        let config = AppConfig::from_toml(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.strategy.symbol, "BTCUSDT");
        assert_eq!(config.strategy.spread_bps, dec!(10));
        assert_eq!(config.strategy.max_backoff_ms, 0);
        assert_eq!(config.exchange.api_secret_env, "BINANCE_TESTNET_API_SECRET");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.strategy.symbol, "BTCUSDT");
        assert_eq!(config.exchange.base_url, "https://testnet.binance.vision");
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let err = AppConfig::from_toml("[strategy]\nskew_factor = \"2\"\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            AppConfig::from_toml("[strategy\nsymbol = 1"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::from_file("/nonexistent/mmbot.toml").is_err());
    }

    #[test]
    fn test_missing_credentials_names_env_vars() {
        let exchange = ExchangeConfig::default();
        let err = exchange
            .credentials_from(Some("key".into()), None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("BINANCE_TESTNET_API_KEY"));
        assert!(msg.contains("BINANCE_TESTNET_API_SECRET"));

        assert!(exchange
            .credentials_from(Some("key".into()), Some("  ".into()))
            .is_err());
    }

    #[test]
    fn test_credentials_present() {
        let exchange = ExchangeConfig::default();
        let creds = exchange
            .credentials_from(Some("key".into()), Some("secret".into()))
            .unwrap();
        assert_eq!(creds.api_key(), "key");
    }
}
