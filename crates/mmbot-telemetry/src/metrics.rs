//! Prometheus metrics for the mmbot trading loop.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which should crash at startup rather than
//! silently drop observations. These panics only happen during static
//! initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

/// Completed trading cycles.
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("mmbot_cycles_total", "Completed trading cycles", &["symbol"]).unwrap()
});

/// Cycles that hit an error, by the stage that failed.
pub static CYCLE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mmbot_cycle_failures_total",
        "Trading cycles that hit an error",
        &["symbol", "stage"]
    )
    .unwrap()
});

/// Cycle wall time in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "mmbot_cycle_duration_ms",
        "Trading cycle duration in milliseconds",
        &["symbol"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Quote orders accepted by the exchange.
pub static ORDERS_PLACED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mmbot_orders_placed_total",
        "Quote orders accepted by the exchange",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Quote orders rejected or lost in transit.
pub static ORDER_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mmbot_order_failures_total",
        "Quote order submissions that failed",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Fills applied to the position.
pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mmbot_fills_total",
        "Fills applied to the position",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Signed inventory in base units.
pub static INVENTORY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("mmbot_inventory", "Signed inventory in base units", &["symbol"]).unwrap()
});

pub static REALIZED_PNL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!("mmbot_realized_pnl", "Realized PnL in quote currency", &["symbol"])
        .unwrap()
});

pub static TOTAL_PNL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "mmbot_total_pnl",
        "Realized plus unrealized PnL in quote currency",
        &["symbol"]
    )
    .unwrap()
});

/// Consecutive failed cycles (drives backoff).
pub static CONSECUTIVE_FAILURES: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "mmbot_consecutive_failures",
        "Consecutive failed trading cycles",
        &["symbol"]
    )
    .unwrap()
});

/// Stage of the trading cycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStage {
    MarketData,
    Quote,
    Refresh,
    Fills,
}

impl CycleStage {
    pub const ALL: [CycleStage; 4] = [
        CycleStage::MarketData,
        CycleStage::Quote,
        CycleStage::Refresh,
        CycleStage::Fills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::Quote => "quote",
            Self::Refresh => "refresh",
            Self::Fills => "fills",
        }
    }
}

/// Metric label for an order side.
pub const SIDES: [&str; 2] = ["buy", "sell"];

/// Metrics recorder.
pub struct Metrics;

impl Metrics {
    /// Record a finished cycle and its duration.
    pub fn cycle_completed(symbol: &str, duration_ms: f64) {
        CYCLES_TOTAL.with_label_values(&[symbol]).inc();
        CYCLE_DURATION_MS
            .with_label_values(&[symbol])
            .observe(duration_ms);
    }

    pub fn cycle_failed(symbol: &str, stage: CycleStage) {
        CYCLE_FAILURES_TOTAL
            .with_label_values(&[symbol, stage.as_str()])
            .inc();
    }

    /// `side` is "buy" or "sell".
    pub fn order_placed(symbol: &str, side: &str) {
        ORDERS_PLACED_TOTAL.with_label_values(&[symbol, side]).inc();
    }

    pub fn order_failed(symbol: &str, side: &str) {
        ORDER_FAILURES_TOTAL.with_label_values(&[symbol, side]).inc();
    }

    pub fn fill_applied(symbol: &str, side: &str) {
        FILLS_TOTAL.with_label_values(&[symbol, side]).inc();
    }

    /// Update inventory and PnL gauges.
    pub fn position(symbol: &str, inventory: f64, realized_pnl: f64, total_pnl: f64) {
        INVENTORY.with_label_values(&[symbol]).set(inventory);
        REALIZED_PNL.with_label_values(&[symbol]).set(realized_pnl);
        TOTAL_PNL.with_label_values(&[symbol]).set(total_pnl);
    }

    pub fn consecutive_failures(symbol: &str, count: u32) {
        CONSECUTIVE_FAILURES
            .with_label_values(&[symbol])
            .set(f64::from(count));
    }
}
