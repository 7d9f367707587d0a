//! End-to-end tests for the trading loop against the in-memory exchange.

use std::sync::Arc;
use std::time::Duration;

use mmbot_app::{CycleStatus, LoopState, TradingLoop};
use mmbot_core::{Balance, OrderSide, Price, Size};
use mmbot_exchange::{ExchangeError, MockCall, MockExchange, MockOp};
use mmbot_mm::StrategyConfig;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn strategy() -> StrategyConfig {
    StrategyConfig {
        symbol: "BTCUSDT".to_string(),
        update_interval_ms: 1000,
        ..Default::default()
    }
}

fn mock_with_book() -> Arc<MockExchange> {
    let mock = Arc::new(MockExchange::new());
    mock.set_top_of_book(Price::new(dec!(49990)), Price::new(dec!(50010)));
    mock
}

fn auth_error() -> ExchangeError {
    ExchangeError::Api {
        status: 401,
        code: Some(-2015),
        msg: "Invalid API-key, IP, or permissions for action.".to_string(),
    }
}

#[tokio::test]
async fn test_cycle_quotes_both_sides_around_mid() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;
    mock.clear_calls();

    let status = bot.run_cycle().await.unwrap();
    assert_eq!(status, CycleStatus::Clean);

    let placed = mock.placed_orders();
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].side, OrderSide::Buy);
    assert_eq!(placed[0].price.to_string(), "49975.00");
    assert_eq!(placed[0].size.to_string(), "0.00100");
    assert_eq!(placed[1].side, OrderSide::Sell);
    assert_eq!(placed[1].price.to_string(), "50025.00");
    assert_eq!(mock.cancel_all_count(), 1);

    let calls = mock.calls();
    assert!(matches!(calls[0], MockCall::TopOfBook { .. }));
    assert!(matches!(calls[1], MockCall::CancelAll { .. }));
    assert!(matches!(calls.last(), Some(MockCall::RecentTrades { limit: 10, .. })));
}

#[tokio::test]
async fn test_fills_applied_once_and_skew_follows_inventory() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;

    bot.run_cycle().await.unwrap();
    mock.fill_open_order(OrderSide::Buy).unwrap();

    // Fill is picked up at the end of this cycle
    bot.run_cycle().await.unwrap();
    assert_eq!(bot.position().quantity(), dec!(0.001));
    assert_eq!(bot.position().fill_count(), 1);

    mock.clear_calls();
    bot.run_cycle().await.unwrap();
    // Same trade is still in the fetched window but not applied again
    assert_eq!(bot.position().quantity(), dec!(0.001));
    assert_eq!(bot.position().fill_count(), 1);

    // ratio 0.1 → skew 1.25 below the symmetric quotes
    let placed = mock.placed_orders();
    assert_eq!(placed[0].price.to_string(), "49973.75");
    assert_eq!(placed[1].price.to_string(), "50023.75");
}

#[tokio::test]
async fn test_round_trip_fills_realize_pnl() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;

    bot.run_cycle().await.unwrap();
    mock.fill_open_order(OrderSide::Buy).unwrap();
    mock.fill_open_order(OrderSide::Sell).unwrap();
    bot.run_cycle().await.unwrap();

    // Bought 0.001 @ 49975, sold 0.001 @ 50025
    assert_eq!(bot.position().quantity(), dec!(0));
    assert_eq!(bot.position().realized_pnl(), dec!(0.05));
    assert_eq!(bot.position().fill_count(), 2);
}

#[tokio::test]
async fn test_pre_session_trades_are_ignored() {
    let mock = mock_with_book();
    mock.push_trade(OrderSide::Buy, Price::new(dec!(40000)), Size::new(dec!(0.5)));
    mock.push_trade(OrderSide::Sell, Price::new(dec!(41000)), Size::new(dec!(0.1)));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;
    bot.run_cycle().await.unwrap();

    assert_eq!(bot.position().quantity(), dec!(0));
    assert_eq!(bot.position().fill_count(), 0);
}

#[tokio::test]
async fn test_unprimed_history_is_primed_by_first_poll() {
    let mock = mock_with_book();
    mock.push_trade(OrderSide::Buy, Price::new(dec!(40000)), Size::new(dec!(0.5)));
    mock.push_failure(MockOp::RecentTrades, ExchangeError::Http("timeout".into()));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;
    bot.run_cycle().await.unwrap();

    assert_eq!(bot.position().fill_count(), 0);
}

#[tokio::test]
async fn test_no_quotes_until_history_primed_so_own_fills_count() {
    let mock = mock_with_book();
    mock.push_trade(OrderSide::Sell, Price::new(dec!(41000)), Size::new(dec!(0.1)));
    // Startup and the first cycle both fail to read the history
    mock.push_failure(MockOp::RecentTrades, ExchangeError::Http("timeout".into()));
    mock.push_failure(MockOp::RecentTrades, ExchangeError::Http("timeout".into()));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;

    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Degraded);
    assert!(mock.placed_orders().is_empty());
    assert_eq!(mock.cancel_all_count(), 0);

    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Clean);
    assert_eq!(mock.placed_orders().len(), 2);

    mock.fill_open_order(OrderSide::Buy).unwrap();
    bot.run_cycle().await.unwrap();
    bot.run_cycle().await.unwrap();

    // Own fill applied exactly once, pre-session sell ignored
    assert_eq!(bot.position().quantity(), dec!(0.001));
    assert_eq!(bot.position().fill_count(), 1);
}

#[tokio::test]
async fn test_market_data_failure_skips_cycle() {
    let mock = mock_with_book();
    mock.push_failure(MockOp::TopOfBook, ExchangeError::Http("connection reset".into()));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    let status = bot.run_cycle().await.unwrap();

    assert_eq!(status, CycleStatus::Degraded);
    assert_eq!(mock.cancel_all_count(), 0);
    assert!(mock.placed_orders().is_empty());

    // Next cycle recovers
    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Clean);
}

#[tokio::test]
async fn test_crossed_book_skips_cycle() {
    let mock = Arc::new(MockExchange::new());
    mock.set_top_of_book(Price::new(dec!(50010)), Price::new(dec!(49990)));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Degraded);
    assert!(mock.placed_orders().is_empty());
}

#[tokio::test]
async fn test_cancel_failure_skips_placement() {
    let mock = mock_with_book();
    mock.push_failure(
        MockOp::CancelAll,
        ExchangeError::Api {
            status: 429,
            code: Some(-1003),
            msg: "Too many requests.".to_string(),
        },
    );

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Degraded);
    assert!(mock.placed_orders().is_empty());
    assert!(bot.orders().bid_order_id().is_none());
}

#[tokio::test]
async fn test_placement_rejection_is_not_a_cycle_failure() {
    let mock = mock_with_book();
    mock.push_failure(
        MockOp::PlaceOrder,
        ExchangeError::Api {
            status: 400,
            code: Some(-2010),
            msg: "Account has insufficient balance for requested action.".to_string(),
        },
    );

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Clean);
    assert!(bot.orders().bid_order_id().is_none());
    assert!(bot.orders().ask_order_id().is_some());
}

#[tokio::test]
async fn test_fatal_error_fails_cycle() {
    let mock = mock_with_book();
    mock.push_failure(MockOp::TopOfBook, auth_error());

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    assert!(bot.run_cycle().await.is_err());
}

#[tokio::test]
async fn test_startup_tolerates_balance_failure() {
    let mock = mock_with_book();
    mock.set_balance(
        "BTC",
        Balance {
            free: dec!(1),
            locked: dec!(0),
        },
    );
    mock.push_failure(MockOp::Balances, ExchangeError::Http("timeout".into()));

    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;
    assert_eq!(bot.run_cycle().await.unwrap(), CycleStatus::Clean);
}

#[tokio::test]
async fn test_run_with_cancelled_token_only_cleans_up() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());

    let token = CancellationToken::new();
    token.cancel();
    bot.run(token).await.unwrap();

    assert_eq!(bot.state(), LoopState::Stopped);
    assert_eq!(bot.cycle_count(), 0);
    assert!(mock.placed_orders().is_empty());
    // Final best-effort cancel-all
    assert_eq!(mock.cancel_all_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_cycles_on_interval_until_cancelled() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());
    let token = CancellationToken::new();

    let stopper = {
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            token.cancel();
        }
    };
    let (result, ()) = tokio::join!(bot.run(token.clone()), stopper);
    result.unwrap();

    // Cycles at t = 0, 1000, 2000
    assert_eq!(bot.cycle_count(), 3);
    assert_eq!(bot.state(), LoopState::Stopped);
    // One per cycle plus the shutdown cancel
    assert_eq!(mock.cancel_all_count(), 4);
    assert!(mock.open_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_loop() {
    let mock = mock_with_book();
    let mut bot = TradingLoop::new(strategy(), mock.clone());
    bot.startup().await;
    bot.run_cycle().await.unwrap();
    assert_eq!(mock.open_orders().len(), 2);

    mock.push_failure(MockOp::TopOfBook, auth_error());
    let result = bot.run(CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(bot.state(), LoopState::Stopped);
    assert_eq!(bot.cycle_count(), 0);
    assert!(mock.open_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backoff_stretches_delay_after_failures() {
    let mock = mock_with_book();
    mock.push_failure(MockOp::TopOfBook, ExchangeError::Http("timeout".into()));
    mock.push_failure(MockOp::TopOfBook, ExchangeError::Http("timeout".into()));

    let config = StrategyConfig {
        max_backoff_ms: 8000,
        ..strategy()
    };
    let mut bot = TradingLoop::new(config, mock.clone());
    let token = CancellationToken::new();

    let stopper = {
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(6500)).await;
            token.cancel();
        }
    };
    let (result, ()) = tokio::join!(bot.run(token.clone()), stopper);
    result.unwrap();

    // t=0 fail (wait 2s), t=2000 fail (wait 4s), t=6000 ok
    assert_eq!(bot.cycle_count(), 3);
    assert_eq!(bot.consecutive_failures(), 0);
}
