//! Binance spot REST client.
//!
//! Implements [`ExchangeClient`] over the public and signed (HMAC-SHA256)
//! endpoints of the Binance spot API. The default base URL is the spot testnet.
//!
//! # Signing
//! Signed endpoints carry `timestamp` and `recvWindow` in the query string,
//! which is then signed with the API secret and suffixed as `&signature=`.
//! The API key travels in the `X-MBX-APIKEY` header.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use mmbot_core::{
    Balance, LimitOrderRequest, OrderId, OrderSide, Price, Size, TopOfBook, Trade, TradeId,
};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{ExchangeError, ExchangeResult};

/// Binance spot testnet REST endpoint.
pub const TESTNET_BASE_URL: &str = "https://testnet.binance.vision";

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// API credentials. The secret is wiped from memory on drop.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: Zeroizing::new(api_secret.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`BinanceSpotClient`].
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    /// Validity window for signed requests, in milliseconds.
    pub recv_window_ms: u64,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: TESTNET_BASE_URL.to_string(),
            recv_window_ms: 5000,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Hex-encoded HMAC-SHA256 of `query` keyed by `secret`.
pub fn sign_query(query: &str, secret: &str) -> ExchangeResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::ClientBuild(format!("HMAC key rejected: {e}")))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Join parameters in insertion order. Values are expected to be URL-safe.
fn build_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBookTicker {
    bid_price: Decimal,
    bid_qty: Decimal,
    ask_price: Decimal,
    ask_qty: Decimal,
}

impl From<RawBookTicker> for TopOfBook {
    fn from(raw: RawBookTicker) -> Self {
        TopOfBook::new(
            Price::new(raw.bid_price),
            Size::new(raw.bid_qty),
            Price::new(raw.ask_price),
            Size::new(raw.ask_qty),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    order_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountTrade {
    id: u64,
    order_id: u64,
    price: Decimal,
    qty: Decimal,
    is_buyer: bool,
    time: i64,
}

impl RawAccountTrade {
    fn into_trade(self) -> ExchangeResult<Trade> {
        let time: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.time)
            .single()
            .ok_or_else(|| {
                ExchangeError::InvalidResponse(format!(
                    "trade {} has bad time {}",
                    self.id, self.time
                ))
            })?;
        Ok(Trade {
            id: TradeId(self.id),
            order_id: OrderId(self.order_id),
            side: if self.is_buyer {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            },
            price: Price::new(self.price),
            size: Size::new(self.qty),
            time,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

/// Map a non-success response to an [`ExchangeError::Api`].
fn api_error(status: StatusCode, body: &str) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => ExchangeError::Api {
            status: status.as_u16(),
            code: Some(err.code),
            msg: err.msg,
        },
        Err(_) => ExchangeError::Api {
            status: status.as_u16(),
            code: None,
            msg: body.to_string(),
        },
    }
}

// ============================================================================
// Client
// ============================================================================

/// Signed REST client for one Binance spot account.
pub struct BinanceSpotClient {
    client: Client,
    config: BinanceConfig,
    credentials: Credentials,
}

impl BinanceSpotClient {
    pub fn new(config: BinanceConfig, credentials: Credentials) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExchangeError::ClientBuild(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Append `timestamp`, `recvWindow` and `signature` to `params`.
    fn signed_query(&self, mut params: Vec<(&str, String)>) -> ExchangeResult<String> {
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        params.push(("recvWindow", self.config.recv_window_ms.to_string()));
        let query = build_query(&params);
        let signature = sign_query(&query, &self.credentials.api_secret)?;
        Ok(format!("{query}&signature={signature}"))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
        signed: bool,
    ) -> ExchangeResult<T> {
        let url = format!("{}{path}?{query}", self.config.base_url);
        trace!(%method, path, "Binance request");

        let mut builder = self.client.request(method, &url);
        if signed {
            builder = builder.header(API_KEY_HEADER, self.credentials.api_key());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExchangeError::Http(format!("{path}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Http(format!("{path}: failed to read body: {e}")))?;

        if !status.is_success() {
            let err = api_error(status, &body);
            debug!(path, %status, error = %err, "Binance request failed");
            return Err(err);
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::InvalidResponse(format!("{path}: {e}")))
    }

    async fn fetch_top_of_book(&self, symbol: &str) -> ExchangeResult<TopOfBook> {
        let query = build_query(&[("symbol", symbol.to_string())]);
        let raw: RawBookTicker = self
            .request(Method::GET, "/api/v3/ticker/bookTicker", &query, false)
            .await?;
        Ok(raw.into())
    }

    async fn submit_limit_order(&self, request: &LimitOrderRequest) -> ExchangeResult<OrderId> {
        let query = self.signed_query(vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_str().to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", request.tif.as_str().to_string()),
            ("quantity", request.size.to_string()),
            ("price", request.price.to_string()),
            ("newClientOrderId", request.cloid.to_string()),
        ])?;
        let ack: RawOrderAck = self
            .request(Method::POST, "/api/v3/order", &query, true)
            .await?;
        debug!(
            order_id = ack.order_id,
            cloid = %request.cloid,
            side = %request.side,
            "Order acknowledged"
        );
        Ok(OrderId(ack.order_id))
    }

    async fn cancel_open_orders(&self, symbol: &str) -> ExchangeResult<()> {
        let query = self.signed_query(vec![("symbol", symbol.to_string())])?;
        let _cancelled: serde_json::Value = self
            .request(Method::DELETE, "/api/v3/openOrders", &query, true)
            .await?;
        Ok(())
    }

    async fn fetch_my_trades(&self, symbol: &str, limit: u32) -> ExchangeResult<Vec<Trade>> {
        let query = self.signed_query(vec![
            ("symbol", symbol.to_string()),
            ("limit", limit.to_string()),
        ])?;
        let raw: Vec<RawAccountTrade> = self
            .request(Method::GET, "/api/v3/myTrades", &query, true)
            .await?;
        raw.into_iter().map(RawAccountTrade::into_trade).collect()
    }

    async fn fetch_balances(&self) -> ExchangeResult<BTreeMap<String, Balance>> {
        let query = self.signed_query(Vec::new())?;
        let account: RawAccount = self
            .request(Method::GET, "/api/v3/account", &query, true)
            .await?;

        let mut balances = BTreeMap::new();
        for raw in account.balances {
            if balances.contains_key(&raw.asset) {
                warn!(asset = %raw.asset, "Duplicate asset in account response");
            }
            balances.insert(
                raw.asset,
                Balance {
                    free: raw.free,
                    locked: raw.locked,
                },
            );
        }
        Ok(balances)
    }
}

impl ExchangeClient for BinanceSpotClient {
    fn top_of_book<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<TopOfBook>> {
        Box::pin(self.fetch_top_of_book(symbol))
    }

    fn place_limit_order<'a>(
        &'a self,
        request: &'a LimitOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderId>> {
        Box::pin(self.submit_limit_order(request))
    }

    fn cancel_all_orders<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(self.cancel_open_orders(symbol))
    }

    fn recent_trades<'a>(
        &'a self,
        symbol: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Trade>>> {
        Box::pin(self.fetch_my_trades(symbol, limit))
    }

    fn account_balances(&self) -> BoxFuture<'_, ExchangeResult<BTreeMap<String, Balance>>> {
        Box::pin(self.fetch_balances())
    }
}
