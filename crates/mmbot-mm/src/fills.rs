//! Fill deduplication for trade-history polling.
//!
//! The loop re-fetches the same window of recent account trades every cycle.
//! `FillDeduplicator` keeps a trade-id high-water mark so each execution
//! reaches the position tracker exactly once.

use mmbot_core::{Trade, TradeId};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct FillDeduplicator {
    /// Highest trade id already accounted for.
    high_water: Option<TradeId>,
    /// Set once the pre-session history has been observed.
    primed: bool,
    /// Size of the fetched window; a full window of unseen trades may hide older ones.
    window: usize,
}

impl FillDeduplicator {
    pub fn new(window: usize) -> Self {
        Self {
            high_water: None,
            primed: false,
            window,
        }
    }

    /// Record pre-existing history without applying it.
    ///
    /// Trades executed before this session must not move the position.
    pub fn prime(&mut self, history: &[Trade]) {
        self.high_water = history.iter().map(|t| t.id).max().max(self.high_water);
        self.primed = true;
        debug!(
            trades = history.len(),
            high_water = ?self.high_water,
            "Fill deduplicator primed"
        );
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn high_water(&self) -> Option<TradeId> {
        self.high_water
    }

    /// Return trades not seen before, in ascending id order, and advance the mark.
    ///
    /// If the deduplicator was never primed, this batch primes it and nothing
    /// is returned. Callers prime before placing any order so that batch cannot
    /// contain fills of their own.
    pub fn take_new(&mut self, mut trades: Vec<Trade>) -> Vec<Trade> {
        if !self.primed {
            self.prime(&trades);
            return Vec::new();
        }

        let fetched = trades.len();
        trades.sort_by_key(|t| t.id);
        trades.dedup_by_key(|t| t.id);

        let mark = self.high_water;
        trades.retain(|t| mark.map_or(true, |m| t.id > m));

        if mark.is_some() && fetched > 0 && fetched >= self.window && trades.len() == fetched {
            warn!(
                window = self.window,
                high_water = ?mark,
                "Every fetched trade is new; older fills may have been missed"
            );
        }

        if let Some(last) = trades.last() {
            self.high_water = Some(last.id);
        }
        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mmbot_core::{OrderId, OrderSide, Price, Size};
    use rust_decimal_macros::dec;

    fn trade(id: u64) -> Trade {
        Trade {
            id: TradeId(id),
            order_id: OrderId(id * 10),
            side: OrderSide::Buy,
            price: Price::new(dec!(50000)),
            size: Size::new(dec!(0.001)),
            time: Utc::now(),
        }
    }

    fn ids(trades: &[Trade]) -> Vec<u64> {
        trades.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn test_primed_history_is_never_applied() {
        let mut dedup = FillDeduplicator::new(10);
        dedup.prime(&[trade(1), trade(2), trade(3)]);
        assert!(dedup.is_primed());
        assert_eq!(dedup.high_water(), Some(TradeId(3)));

        let new = dedup.take_new(vec![trade(1), trade(2), trade(3)]);
        assert!(new.is_empty());
    }

    #[test]
    fn test_repeated_polls_apply_once() {
        let mut dedup = FillDeduplicator::new(10);
        dedup.prime(&[trade(5)]);

        let first = dedup.take_new(vec![trade(5), trade(6), trade(7)]);
        assert_eq!(ids(&first), vec![6, 7]);

        let second = dedup.take_new(vec![trade(5), trade(6), trade(7)]);
        assert!(second.is_empty());
        assert_eq!(dedup.high_water(), Some(TradeId(7)));
    }

    #[test]
    fn test_unsorted_and_duplicate_ids() {
        let mut dedup = FillDeduplicator::new(10);
        dedup.prime(&[]);

        let new = dedup.take_new(vec![trade(9), trade(8), trade(9), trade(10)]);
        assert_eq!(ids(&new), vec![8, 9, 10]);
    }

    #[test]
    fn test_empty_history_primes_without_mark() {
        let mut dedup = FillDeduplicator::new(10);
        dedup.prime(&[]);
        assert!(dedup.is_primed());
        assert_eq!(dedup.high_water(), None);

        let new = dedup.take_new(vec![trade(1)]);
        assert_eq!(ids(&new), vec![1]);
    }

    #[test]
    fn test_unprimed_first_batch_only_primes() {
        let mut dedup = FillDeduplicator::new(10);
        assert!(!dedup.is_primed());

        let new = dedup.take_new(vec![trade(4), trade(2)]);
        assert!(new.is_empty());
        assert!(dedup.is_primed());
        assert_eq!(dedup.high_water(), Some(TradeId(4)));

        let next = dedup.take_new(vec![trade(4), trade(5)]);
        assert_eq!(ids(&next), vec![5]);
    }

    #[test]
    fn test_full_window_of_new_trades_still_applied() {
        let mut dedup = FillDeduplicator::new(2);
        dedup.prime(&[trade(1)]);

        let new = dedup.take_new(vec![trade(7), trade(8)]);
        assert_eq!(ids(&new), vec![7, 8]);
    }
}
