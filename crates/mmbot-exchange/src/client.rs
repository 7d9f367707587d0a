//! Exchange capability trait.
//!
//! Abstracts the exchange behind the handful of operations the trading loop
//! uses, so the loop can run against the real REST client or a mock.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use mmbot_core::{Balance, LimitOrderRequest, OrderId, TopOfBook, Trade};

use crate::error::ExchangeResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Shared handle to an exchange implementation.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;

pub trait ExchangeClient: Send + Sync {
    /// Best bid and ask for `symbol`.
    fn top_of_book<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<TopOfBook>>;

    /// Submit a limit order and return the exchange order id.
    ///
    /// Price and size are sent exactly as given; rounding is the caller's job.
    fn place_limit_order<'a>(
        &'a self,
        request: &'a LimitOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderId>>;

    /// Cancel every open order for `symbol`.
    ///
    /// Implementations may surface "nothing to cancel" as an error; see
    /// [`crate::ExchangeError::is_nothing_to_cancel`].
    fn cancel_all_orders<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>>;

    /// Most recent account trades for `symbol`, at most `limit`.
    fn recent_trades<'a>(
        &'a self,
        symbol: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Trade>>>;

    /// Balances keyed by asset.
    fn account_balances(&self) -> BoxFuture<'_, ExchangeResult<BTreeMap<String, Balance>>>;
}
