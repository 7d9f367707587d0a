//! Working-order lifecycle.
//!
//! Every refresh is a full reset: cancel all open orders for the symbol,
//! forget both tracked order ids, then place whichever sides the quote asks
//! for. A rejected side stays unquoted until the next refresh.

use mmbot_core::{LimitOrderRequest, OrderId, OrderSide, Price, Size};
use mmbot_exchange::{DynExchangeClient, ExchangeError};
use mmbot_mm::Quote;
use tracing::{debug, info, warn};

use crate::error::{ExecutorError, ExecutorResult};
use crate::precision::OrderPrecision;

/// What happened to one side during a refresh.
#[derive(Debug)]
pub enum SideOutcome {
    /// Order accepted by the exchange.
    Placed(OrderId),
    /// Nothing to quote (zero size after rounding).
    Skipped,
    /// Submission rejected or failed in transit.
    Failed(ExchangeError),
}

impl SideOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::Placed(id) => Some(*id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ExchangeError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-side result of [`OrderLifecycleManager::refresh_quotes`].
#[derive(Debug)]
pub struct RefreshOutcome {
    pub bid: SideOutcome,
    pub ask: SideOutcome,
}

impl RefreshOutcome {
    pub fn placed_count(&self) -> usize {
        [&self.bid, &self.ask].iter().filter(|o| o.is_placed()).count()
    }

    pub fn failed_count(&self) -> usize {
        [&self.bid, &self.ask].iter().filter(|o| o.is_failed()).count()
    }

    /// First placement error that no retry can fix (credentials, signature).
    pub fn fatal_error(&self) -> Option<&ExchangeError> {
        [&self.bid, &self.ask]
            .into_iter()
            .filter_map(SideOutcome::error)
            .find(|e| e.is_fatal())
    }

    /// Owned variant of [`Self::fatal_error`].
    pub fn into_fatal_error(self) -> Option<ExchangeError> {
        [self.bid, self.ask].into_iter().find_map(|o| match o {
            SideOutcome::Failed(e) if e.is_fatal() => Some(e),
            _ => None,
        })
    }
}

/// Owns the bot's bid and ask working orders for one symbol.
pub struct OrderLifecycleManager {
    client: DynExchangeClient,
    symbol: String,
    precision: OrderPrecision,
    bid_order_id: Option<OrderId>,
    ask_order_id: Option<OrderId>,
}

impl OrderLifecycleManager {
    pub fn new(
        client: DynExchangeClient,
        symbol: impl Into<String>,
        precision: OrderPrecision,
    ) -> Self {
        Self {
            client,
            symbol: symbol.into(),
            precision,
            bid_order_id: None,
            ask_order_id: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bid_order_id(&self) -> Option<OrderId> {
        self.bid_order_id
    }

    pub fn ask_order_id(&self) -> Option<OrderId> {
        self.ask_order_id
    }

    /// Cancel every open order for the symbol and forget both ids.
    ///
    /// "Nothing to cancel" counts as success.
    pub async fn cancel_all(&mut self) -> ExecutorResult<()> {
        let result = self.client.cancel_all_orders(&self.symbol).await;
        self.bid_order_id = None;
        self.ask_order_id = None;

        match result {
            Ok(()) => {
                debug!(symbol = %self.symbol, "Cancelled all open orders");
                Ok(())
            }
            Err(e) if e.is_nothing_to_cancel() => {
                debug!(symbol = %self.symbol, "No open orders to cancel");
                Ok(())
            }
            Err(e) => Err(ExecutorError::CancelFailed(e)),
        }
    }

    /// Replace both working orders with `quote`.
    ///
    /// Issues exactly one cancel-all. If it fails, nothing is placed this
    /// cycle so stale orders cannot stack up under new ones.
    pub async fn refresh_quotes(&mut self, quote: &Quote) -> ExecutorResult<RefreshOutcome> {
        if let Err(e) = self.cancel_all().await {
            warn!(symbol = %self.symbol, error = %e, "Cancel-all failed, skipping placement");
            return Err(e);
        }

        let bid = self
            .place_side(OrderSide::Buy, quote.bid_price, quote.bid_size)
            .await;
        self.bid_order_id = bid.order_id();

        let ask = self
            .place_side(OrderSide::Sell, quote.ask_price, quote.ask_size)
            .await;
        self.ask_order_id = ask.order_id();

        Ok(RefreshOutcome { bid, ask })
    }

    async fn place_side(&self, side: OrderSide, price: Price, size: Size) -> SideOutcome {
        let size = self.precision.size(size);
        if !size.is_positive() {
            debug!(symbol = %self.symbol, %side, "Side not quoted this cycle");
            return SideOutcome::Skipped;
        }
        let price = self.precision.price(price);

        let request = LimitOrderRequest::gtc(self.symbol.clone(), side, price, size);
        match self.client.place_limit_order(&request).await {
            Ok(order_id) => {
                info!(
                    symbol = %self.symbol,
                    %side,
                    %price,
                    %size,
                    %order_id,
                    cloid = %request.cloid,
                    "Placed quote"
                );
                SideOutcome::Placed(order_id)
            }
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    %side,
                    %price,
                    %size,
                    error = %e,
                    "Quote placement failed"
                );
                SideOutcome::Failed(e)
            }
        }
    }
}
