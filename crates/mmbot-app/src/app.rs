//! Trading loop.
//!
//! One cycle at a time, on a fixed cadence:
//! 1. Fetch top of book and derive the mid price
//! 2. Compute the quote from mid and current inventory
//! 3. Cancel-then-replace the working orders
//! 4. Fetch recent account trades and apply unseen fills to the position
//! 5. Log a status line
//!
//! Cycle errors are logged and the loop carries on; only credential or
//! signature errors stop it. Stop requests are honoured at cycle
//! boundaries, and every exit path ends with a best-effort cancel-all.

use std::time::{Duration, Instant};

use mmbot_core::{OrderSide, Price};
use mmbot_exchange::{DynExchangeClient, ExchangeError};
use mmbot_executor::{OrderLifecycleManager, OrderPrecision, SideOutcome};
use mmbot_mm::{compute_quote, FillDeduplicator, PositionTracker, StrategyConfig};
use mmbot_telemetry::{CycleStage, Metrics, SessionStatsReporter};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;

/// Completed cycles between session statistics reports.
const STATS_REPORT_EVERY_CYCLES: u64 = 60;

/// Cap on the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// How a single cycle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every stage succeeded.
    Clean,
    /// A stage failed; the error was logged and the cycle cut short or degraded.
    Degraded,
}

/// Delay before the next cycle after `failures` consecutive failed cycles.
///
/// `min(interval × 2^failures, max_backoff)`, never below the interval.
/// A `max_backoff_ms` of 0 disables backoff.
pub fn backoff_delay(interval_ms: u64, max_backoff_ms: u64, failures: u32) -> Duration {
    if max_backoff_ms == 0 || failures == 0 {
        return Duration::from_millis(interval_ms);
    }
    let factor = 1u64 << failures.min(MAX_BACKOFF_SHIFT);
    let delay = interval_ms
        .saturating_mul(factor)
        .min(max_backoff_ms)
        .max(interval_ms);
    Duration::from_millis(delay)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn side_label(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    }
}

/// The market making driver for one symbol.
pub struct TradingLoop {
    config: StrategyConfig,
    client: DynExchangeClient,
    orders: OrderLifecycleManager,
    position: PositionTracker,
    fills: FillDeduplicator,
    stats: SessionStatsReporter,
    state: LoopState,
    cycle_count: u64,
    consecutive_failures: u32,
}

impl TradingLoop {
    pub fn new(config: StrategyConfig, client: DynExchangeClient) -> Self {
        let orders = OrderLifecycleManager::new(
            client.clone(),
            config.symbol.clone(),
            OrderPrecision::new(config.price_decimals, config.qty_decimals),
        );
        let fills = FillDeduplicator::new(config.trade_history_limit as usize);
        let stats = SessionStatsReporter::new(config.symbol.clone(), STATS_REPORT_EVERY_CYCLES);

        Self {
            config,
            client,
            orders,
            position: PositionTracker::new(),
            fills,
            stats,
            state: LoopState::Running,
            cycle_count: 0,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn position(&self) -> &PositionTracker {
        &self.position
    }

    pub fn orders(&self) -> &OrderLifecycleManager {
        &self.orders
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Run until `token` is cancelled or a fatal error occurs.
    ///
    /// Always finishes with a best-effort cancel-all and a stats report.
    pub async fn run(&mut self, token: CancellationToken) -> AppResult<()> {
        self.state = LoopState::Running;
        self.startup().await;

        let mut fatal = None;
        while !token.is_cancelled() {
            let started = Instant::now();
            match self.run_cycle().await {
                Ok(CycleStatus::Clean) => self.consecutive_failures = 0,
                Ok(CycleStatus::Degraded) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1)
                }
                Err(e) => {
                    error!(symbol = %self.symbol(), error = %e, "Unrecoverable error, stopping");
                    fatal = Some(e);
                    break;
                }
            }
            self.cycle_count += 1;
            Metrics::cycle_completed(
                &self.config.symbol,
                started.elapsed().as_secs_f64() * 1000.0,
            );
            Metrics::consecutive_failures(&self.config.symbol, self.consecutive_failures);
            self.stats.maybe_report(self.cycle_count);

            let delay = backoff_delay(
                self.config.update_interval_ms,
                self.config.max_backoff_ms,
                self.consecutive_failures,
            );
            if self.consecutive_failures > 0 {
                debug!(
                    failures = self.consecutive_failures,
                    delay_ms = delay.as_millis() as u64,
                    "Delaying next cycle"
                );
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown().await;
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Log parameters and balances, and prime fill deduplication with the
    /// pre-existing trade history. Nothing here is fatal.
    pub async fn startup(&mut self) {
        let c = &self.config;
        info!(
            symbol = %c.symbol,
            spread_bps = %c.spread_bps,
            quote_size = %c.quote_size,
            max_position = %c.max_position,
            skew_factor = %c.skew_factor,
            update_interval_ms = c.update_interval_ms,
            price_decimals = c.price_decimals,
            qty_decimals = c.qty_decimals,
            "Starting market maker"
        );

        match self.client.account_balances().await {
            Ok(balances) => {
                for (asset, balance) in balances.iter().filter(|(_, b)| !b.is_empty()) {
                    info!(
                        %asset,
                        free = %balance.free,
                        locked = %balance.locked,
                        "Balance"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Failed to fetch account balances"),
        }

        if let Err(e) = self.prime_fills().await {
            warn!(
                error = %e,
                "Failed to fetch trade history; quoting waits until fill tracking is primed"
            );
        }
    }

    /// Record the current trade history as already accounted for.
    ///
    /// Must succeed before the first order is placed, otherwise the bot's own
    /// fills would end up inside the priming batch and never be applied.
    async fn prime_fills(&mut self) -> Result<(), ExchangeError> {
        let history = self
            .client
            .recent_trades(&self.config.symbol, self.config.trade_history_limit)
            .await?;
        self.fills.prime(&history);
        Ok(())
    }

    /// Execute one trading cycle.
    ///
    /// Returns `Err` only for errors that make further cycles pointless.
    pub async fn run_cycle(&mut self) -> AppResult<CycleStatus> {
        let symbol = self.config.symbol.clone();

        // No quoting until pre-session trades are known
        if !self.fills.is_primed() {
            if let Err(e) = self.prime_fills().await {
                return self.stage_failed(CycleStage::Fills, e);
            }
        }

        // 1. Market data
        let book = match self.client.top_of_book(&symbol).await {
            Ok(book) => book,
            Err(e) => return self.stage_failed(CycleStage::MarketData, e),
        };
        let Some(mid) = book.mid_price() else {
            warn!(%symbol, state = %book.state(), "Book not quotable, skipping cycle");
            Metrics::cycle_failed(&symbol, CycleStage::MarketData);
            return Ok(CycleStatus::Degraded);
        };

        // 2. Quote
        let quote = match compute_quote(mid, self.position.quantity(), &self.config) {
            Ok(quote) => quote,
            Err(e) => {
                warn!(%symbol, %mid, error = %e, "Quote computation failed");
                Metrics::cycle_failed(&symbol, CycleStage::Quote);
                return Ok(CycleStatus::Degraded);
            }
        };

        // 3. Cancel-then-replace
        let outcome = match self.orders.refresh_quotes(&quote).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(%symbol, error = %e, "Quote refresh failed");
                Metrics::cycle_failed(&symbol, CycleStage::Refresh);
                return Ok(CycleStatus::Degraded);
            }
        };
        for (side, result) in [(OrderSide::Buy, &outcome.bid), (OrderSide::Sell, &outcome.ask)] {
            match result {
                SideOutcome::Placed(_) => Metrics::order_placed(&symbol, side_label(side)),
                SideOutcome::Failed(_) => Metrics::order_failed(&symbol, side_label(side)),
                SideOutcome::Skipped => {}
            }
        }
        if let Some(e) = outcome.into_fatal_error() {
            return Err(e.into());
        }

        // 4. Fills
        let mut status = CycleStatus::Clean;
        if let Err(e) = self.reconcile_fills(&symbol).await {
            if e.is_fatal() {
                return Err(e.into());
            }
            warn!(%symbol, error = %e, "Failed to fetch recent trades");
            Metrics::cycle_failed(&symbol, CycleStage::Fills);
            status = CycleStatus::Degraded;
        }

        // 5. Status
        self.log_status(mid, &quote);
        Ok(status)
    }

    fn stage_failed(&self, stage: CycleStage, e: ExchangeError) -> AppResult<CycleStatus> {
        if e.is_fatal() {
            return Err(e.into());
        }
        if e.is_rate_limited() {
            warn!(symbol = %self.symbol(), stage = stage.as_str(), error = %e, "Rate limited");
        } else {
            warn!(
                symbol = %self.symbol(),
                stage = stage.as_str(),
                error = %e,
                "Cycle stage failed"
            );
        }
        Metrics::cycle_failed(self.symbol(), stage);
        Ok(CycleStatus::Degraded)
    }

    async fn reconcile_fills(&mut self, symbol: &str) -> Result<(), ExchangeError> {
        let trades = self
            .client
            .recent_trades(symbol, self.config.trade_history_limit)
            .await?;

        for trade in self.fills.take_new(trades) {
            self.position.apply_fill(trade.side, trade.size, trade.price);
            Metrics::fill_applied(symbol, side_label(trade.side));
            info!(
                %symbol,
                trade_id = %trade.id,
                order_id = %trade.order_id,
                side = %trade.side,
                price = %trade.price,
                size = %trade.size,
                inventory = %self.position.quantity(),
                "Fill applied"
            );
        }
        Ok(())
    }

    fn log_status(&self, mid: Price, quote: &mmbot_mm::Quote) {
        let inventory = self.position.quantity();
        let realized = self.position.realized_pnl();
        let total = self.position.total_pnl(mid);

        info!(
            symbol = %self.symbol(),
            %mid,
            bid = %quote.bid_price,
            ask = %quote.ask_price,
            bid_size = %quote.bid_size,
            ask_size = %quote.ask_size,
            %inventory,
            realized_pnl = %realized,
            total_pnl = %total,
            "Status"
        );
        Metrics::position(self.symbol(), to_f64(inventory), to_f64(realized), to_f64(total));
    }

    async fn shutdown(&mut self) {
        self.state = LoopState::Stopped;
        info!(
            symbol = %self.symbol(),
            cycles = self.cycle_count,
            "Stopping, cancelling open orders"
        );

        if let Err(e) = self.orders.cancel_all().await {
            warn!(symbol = %self.symbol(), error = %e, "Final cancel-all failed");
        }
        self.stats.report();
        info!(
            symbol = %self.symbol(),
            inventory = %self.position.quantity(),
            realized_pnl = %self.position.realized_pnl(),
            fills = self.position.fill_count(),
            "Trading loop stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_disabled_keeps_interval() {
        assert_eq!(backoff_delay(5000, 0, 0), Duration::from_millis(5000));
        assert_eq!(backoff_delay(5000, 0, 7), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1000, 30_000, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1000, 30_000, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(1000, 30_000, 3), Duration::from_millis(8000));
        assert_eq!(backoff_delay(1000, 30_000, 5), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(1000, 30_000, 500), Duration::from_millis(30_000));
    }

    #[test]
    fn test_backoff_never_below_interval() {
        assert_eq!(backoff_delay(5000, 1000, 2), Duration::from_millis(5000));
    }
}
