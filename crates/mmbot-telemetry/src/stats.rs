//! Session statistics summary.
//!
//! Reads the Prometheus metrics back and logs a one-line summary of the
//! session so far: cycles, failures, orders, fills, inventory and PnL.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::metrics::{
    CycleStage, CYCLES_TOTAL, CYCLE_FAILURES_TOTAL, FILLS_TOTAL, INVENTORY, ORDERS_PLACED_TOTAL,
    ORDER_FAILURES_TOTAL, REALIZED_PNL, SIDES, TOTAL_PNL,
};

/// Session statistics for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub symbol: String,
    pub uptime_secs: i64,
    pub cycles: u64,
    pub cycle_failures: u64,
    pub orders_placed: u64,
    pub order_failures: u64,
    pub fills: u64,
    pub inventory: f64,
    pub realized_pnl: f64,
    pub total_pnl: f64,
}

/// Periodic session statistics reporter.
pub struct SessionStatsReporter {
    symbol: String,
    start_time: DateTime<Utc>,
    /// Report every N completed cycles. 0 disables periodic reports.
    report_every: u64,
}

impl SessionStatsReporter {
    pub fn new(symbol: impl Into<String>, report_every: u64) -> Self {
        Self {
            symbol: symbol.into(),
            start_time: Utc::now(),
            report_every,
        }
    }

    pub fn snapshot(&self) -> SessionStats {
        let symbol = self.symbol.as_str();

        let cycle_failures: u64 = CycleStage::ALL
            .iter()
            .map(|stage| {
                CYCLE_FAILURES_TOTAL
                    .with_label_values(&[symbol, stage.as_str()])
                    .get() as u64
            })
            .sum();

        let per_side = |counter: &prometheus::CounterVec| -> u64 {
            SIDES
                .iter()
                .map(|side| counter.with_label_values(&[symbol, *side]).get() as u64)
                .sum()
        };

        SessionStats {
            symbol: self.symbol.clone(),
            uptime_secs: (Utc::now() - self.start_time).num_seconds(),
            cycles: CYCLES_TOTAL.with_label_values(&[symbol]).get() as u64,
            cycle_failures,
            orders_placed: per_side(&ORDERS_PLACED_TOTAL),
            order_failures: per_side(&ORDER_FAILURES_TOTAL),
            fills: per_side(&FILLS_TOTAL),
            inventory: INVENTORY.with_label_values(&[symbol]).get(),
            realized_pnl: REALIZED_PNL.with_label_values(&[symbol]).get(),
            total_pnl: TOTAL_PNL.with_label_values(&[symbol]).get(),
        }
    }

    /// Whether a periodic report is due after `cycle` completed cycles.
    pub fn is_due(&self, cycle: u64) -> bool {
        self.report_every > 0 && cycle > 0 && cycle % self.report_every == 0
    }

    /// Log the summary if a periodic report is due.
    pub fn maybe_report(&self, cycle: u64) {
        if self.is_due(cycle) {
            self.report();
        }
    }

    /// Log the summary unconditionally.
    pub fn report(&self) {
        let s = self.snapshot();
        info!(
            symbol = %s.symbol,
            uptime_secs = s.uptime_secs,
            cycles = s.cycles,
            cycle_failures = s.cycle_failures,
            orders_placed = s.orders_placed,
            order_failures = s.order_failures,
            fills = s.fills,
            inventory = s.inventory,
            realized_pnl = s.realized_pnl,
            total_pnl = s.total_pnl,
            "Session stats"
        );
    }
}
