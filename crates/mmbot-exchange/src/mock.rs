//! In-memory exchange for tests.
//!
//! Keeps a tiny account model (open orders, trade history, balances), records
//! every call, and lets a test queue failures per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use mmbot_core::{
    Balance, LimitOrderRequest, OrderId, OrderSide, Price, Size, TopOfBook, Trade, TradeId,
};
use parking_lot::Mutex;

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{ExchangeError, ExchangeResult};

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    TopOfBook,
    PlaceOrder,
    CancelAll,
    RecentTrades,
    Balances,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    TopOfBook { symbol: String },
    PlaceLimitOrder(LimitOrderRequest),
    CancelAll { symbol: String },
    RecentTrades { symbol: String, limit: u32 },
    AccountBalances,
}

#[derive(Debug, Clone)]
struct OpenOrder {
    id: OrderId,
    request: LimitOrderRequest,
}

#[derive(Debug)]
pub struct MockExchange {
    book: Mutex<Option<TopOfBook>>,
    open_orders: Mutex<Vec<OpenOrder>>,
    trades: Mutex<Vec<Trade>>,
    balances: Mutex<BTreeMap<String, Balance>>,
    failures: Mutex<HashMap<MockOp, VecDeque<ExchangeError>>>,
    calls: Mutex<Vec<MockCall>>,
    next_order_id: AtomicU64,
    next_trade_id: AtomicU64,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            book: Mutex::new(None),
            open_orders: Mutex::new(Vec::new()),
            trades: Mutex::new(Vec::new()),
            balances: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_order_id: AtomicU64::new(1),
            next_trade_id: AtomicU64::new(1),
        }
    }

    /// Set the book returned by `top_of_book`.
    pub fn set_top_of_book(&self, bid: Price, ask: Price) {
        *self.book.lock() = Some(TopOfBook::new(
            bid,
            Size::new(rust_decimal::Decimal::ONE),
            ask,
            Size::new(rust_decimal::Decimal::ONE),
        ));
    }

    pub fn set_balance(&self, asset: &str, balance: Balance) {
        self.balances.lock().insert(asset.to_string(), balance);
    }

    /// Queue an error for the next call of `op`. Errors are consumed in order.
    pub fn push_failure(&self, op: MockOp, error: ExchangeError) {
        self.failures.lock().entry(op).or_default().push_back(error);
    }

    /// Append an execution to the account trade history.
    pub fn push_trade(&self, side: OrderSide, price: Price, size: Size) -> TradeId {
        let id = TradeId(self.next_trade_id.fetch_add(1, Ordering::SeqCst));
        self.trades.lock().push(Trade {
            id,
            order_id: OrderId(0),
            side,
            price,
            size,
            time: Utc::now(),
        });
        id
    }

    /// Fully fill the resting order on `side`, if any, and record the trade.
    pub fn fill_open_order(&self, side: OrderSide) -> Option<TradeId> {
        let order = {
            let mut open = self.open_orders.lock();
            let idx = open.iter().position(|o| o.request.side == side)?;
            open.remove(idx)
        };
        let id = TradeId(self.next_trade_id.fetch_add(1, Ordering::SeqCst));
        self.trades.lock().push(Trade {
            id,
            order_id: order.id,
            side,
            price: order.request.price,
            size: order.request.size,
            time: Utc::now(),
        });
        Some(id)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn cancel_all_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, MockCall::CancelAll { .. }))
            .count()
    }

    /// Every order submission attempt, including failed ones.
    pub fn placed_orders(&self) -> Vec<LimitOrderRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MockCall::PlaceLimitOrder(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    /// Requests currently resting on the book.
    pub fn open_orders(&self) -> Vec<LimitOrderRequest> {
        self.open_orders
            .lock()
            .iter()
            .map(|o| o.request.clone())
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }

    fn take_failure(&self, op: MockOp) -> Option<ExchangeError> {
        self.failures.lock().get_mut(&op).and_then(VecDeque::pop_front)
    }
}

impl ExchangeClient for MockExchange {
    fn top_of_book<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<TopOfBook>> {
        Box::pin(async move {
            self.record(MockCall::TopOfBook {
                symbol: symbol.to_string(),
            });
            if let Some(err) = self.take_failure(MockOp::TopOfBook) {
                return Err(err);
            }
            self.book.lock().clone().ok_or_else(|| ExchangeError::Api {
                status: 400,
                code: Some(-1121),
                msg: "Invalid symbol.".to_string(),
            })
        })
    }

    fn place_limit_order<'a>(
        &'a self,
        request: &'a LimitOrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderId>> {
        Box::pin(async move {
            self.record(MockCall::PlaceLimitOrder(request.clone()));
            if let Some(err) = self.take_failure(MockOp::PlaceOrder) {
                return Err(err);
            }
            let id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst));
            self.open_orders.lock().push(OpenOrder {
                id,
                request: request.clone(),
            });
            Ok(id)
        })
    }

    fn cancel_all_orders<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<()>> {
        Box::pin(async move {
            self.record(MockCall::CancelAll {
                symbol: symbol.to_string(),
            });
            if let Some(err) = self.take_failure(MockOp::CancelAll) {
                return Err(err);
            }
            let mut open = self.open_orders.lock();
            let before = open.len();
            open.retain(|o| o.request.symbol != symbol);
            if open.len() == before {
                // Binance reports an empty cancel-all as an error
                return Err(ExchangeError::Api {
                    status: 400,
                    code: Some(-2011),
                    msg: "Unknown order sent.".to_string(),
                });
            }
            Ok(())
        })
    }

    fn recent_trades<'a>(
        &'a self,
        symbol: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, ExchangeResult<Vec<Trade>>> {
        Box::pin(async move {
            self.record(MockCall::RecentTrades {
                symbol: symbol.to_string(),
                limit,
            });
            if let Some(err) = self.take_failure(MockOp::RecentTrades) {
                return Err(err);
            }
            let trades = self.trades.lock();
            let skip = trades.len().saturating_sub(limit as usize);
            Ok(trades[skip..].to_vec())
        })
    }

    fn account_balances(&self) -> BoxFuture<'_, ExchangeResult<BTreeMap<String, Balance>>> {
        Box::pin(async move {
            self.record(MockCall::AccountBalances);
            if let Some(err) = self.take_failure(MockOp::Balances) {
                return Err(err);
            }
            Ok(self.balances.lock().clone())
        })
    }
}
