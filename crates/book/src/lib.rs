//! L1 per-instrument FIFO limit order book.
//!
//! [`book::OrderBook`] is the Engine thread's only mutator of book state:
//! `add`/`cancel`/`modify`/`trade` are strict price-time priority
//! operations over two [`level::Ladder`]s, each a sorted array of
//! [`level::PriceLevel`]s with an intrusive FIFO of arena indices.
//! `best_bid`/`best_ask`/`depth` are read-only. Every state-changing op
//! enqueues an [`update::OrderBookUpdate`] into a caller-supplied
//! [`ring::Spsc`].

pub mod book;
pub mod error;
pub mod level;
pub mod update;

pub use book::OrderBook;
pub use error::{BookError, BookResult};
pub use level::{Ladder, PriceLevel};
pub use update::{OrderBookUpdate, UpdateKind};

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Instrument, Price32nd, Px, Qty, Side, Ts};
    use ring::Spsc;

    type TestBook = OrderBook<256>;
    type UpdateRing = Spsc<OrderBookUpdate, 64>;

    fn px32(whole: i32, ts32: u8) -> Px {
        Price32nd::new(whole, ts32, false).unwrap().to_px()
    }

    /// Scenario 1: BBO after bursts, then cancel.
    #[test]
    fn scenario_bbo_after_bursts() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();

        book.add(1, Side::Bid, px32(100, 16), Qty::new(5_000_000.0), Ts(0), &updates)
            .unwrap();
        book.add(2, Side::Bid, px32(100, 15), Qty::new(3_000_000.0), Ts(1), &updates)
            .unwrap();
        book.add(3, Side::Ask, px32(100, 17), Qty::new(4_000_000.0), Ts(2), &updates)
            .unwrap();

        let (bid_px, bid_qty) = book.best_bid().unwrap();
        assert!((bid_px.as_f64() - 100.5).abs() < 1e-6);
        assert_eq!(bid_qty.as_f64(), 5_000_000.0);

        let (ask_px, ask_qty) = book.best_ask().unwrap();
        assert!((ask_px.as_f64() - 100.53125).abs() < 1e-6);
        assert_eq!(ask_qty.as_f64(), 4_000_000.0);

        book.cancel(1, Ts(3), &updates).unwrap();
        let (bid_px, bid_qty) = book.best_bid().unwrap();
        assert!((bid_px.as_f64() - 100.46875).abs() < 1e-6);
        assert_eq!(bid_qty.as_f64(), 3_000_000.0);
    }

    /// Scenario 2: aggressive cross consumes the resting ask.
    #[test]
    fn scenario_aggressive_cross() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();

        book.add(1, Side::Bid, px32(100, 16), Qty::new(5_000_000.0), Ts(0), &updates)
            .unwrap();
        book.add(2, Side::Bid, px32(100, 15), Qty::new(3_000_000.0), Ts(1), &updates)
            .unwrap();
        book.add(3, Side::Ask, px32(100, 17), Qty::new(4_000_000.0), Ts(2), &updates)
            .unwrap();
        book.cancel(1, Ts(3), &updates).unwrap();

        let filled = book.trade(px32(100, 17), Qty::new(3_000_000.0), Side::Bid, Ts(4), &updates);
        assert_eq!(filled.as_f64(), 3_000_000.0);

        let (ask_px, ask_qty) = book.best_ask().unwrap();
        assert!((ask_px.as_f64() - 100.53125).abs() < 1e-6);
        assert_eq!(ask_qty.as_f64(), 1_000_000.0);

        let mut saw_trade = false;
        while let Some(u) = updates.try_pop() {
            if u.kind == UpdateKind::Trade {
                saw_trade = true;
                assert_eq!(u.qty_delta.as_f64(), 3_000_000.0);
                assert!((u.price.as_f64() - 100.53125).abs() < 1e-6);
            }
        }
        assert!(saw_trade);
    }

    #[test]
    fn cancel_unknown_order_is_not_found() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        assert_eq!(book.cancel(999, Ts(0), &updates), Err(BookError::NotFound(999)));
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        book.add(1, Side::Bid, px32(100, 0), Qty::new(1_000_000.0), Ts(0), &updates)
            .unwrap();
        assert_eq!(
            book.add(1, Side::Bid, px32(100, 0), Qty::new(1_000_000.0), Ts(1), &updates),
            Err(BookError::Duplicate(1))
        );
    }

    #[test]
    fn trade_against_empty_side_is_a_no_op() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        let filled = book.trade(px32(100, 0), Qty::new(1_000_000.0), Side::Bid, Ts(0), &updates);
        assert_eq!(filled, Qty::ZERO);
    }

    /// Orders at the same price are consumed strictly in insertion order.
    #[test]
    fn price_time_priority_within_a_level() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        book.add(1, Side::Ask, px32(100, 0), Qty::new(1_000_000.0), Ts(0), &updates)
            .unwrap();
        book.add(2, Side::Ask, px32(100, 0), Qty::new(1_000_000.0), Ts(1), &updates)
            .unwrap();

        // Consuming 1M should exhaust order 1 (first in) in full, leaving
        // order 2 untouched.
        book.trade(px32(100, 0), Qty::new(1_000_000.0), Side::Bid, Ts(2), &updates);
        assert_eq!(book.cancel(1, Ts(3), &updates), Err(BookError::NotFound(1)));
        assert!(book.cancel(2, Ts(4), &updates).is_ok());
    }

    #[test]
    fn modify_quantity_increase_loses_priority() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        book.add(1, Side::Ask, px32(100, 0), Qty::new(1_000_000.0), Ts(0), &updates)
            .unwrap();
        book.add(2, Side::Ask, px32(100, 0), Qty::new(1_000_000.0), Ts(1), &updates)
            .unwrap();
        // Order 1 grows, losing priority to order 2.
        book.modify(1, px32(100, 0), Qty::new(2_000_000.0), Ts(2), &updates)
            .unwrap();

        let filled = book.trade(px32(100, 0), Qty::new(1_000_000.0), Side::Bid, Ts(3), &updates);
        assert_eq!(filled.as_f64(), 1_000_000.0);
        // Order 2 (now at the front) should be fully consumed, not order 1.
        assert_eq!(book.cancel(2, Ts(4), &updates), Err(BookError::NotFound(2)));
        assert!(book.cancel(1, Ts(5), &updates).is_ok());
    }

    #[test]
    fn modify_price_change_is_cancel_then_add() {
        let mut book = TestBook::new(Instrument::Note10Y);
        let updates: UpdateRing = Spsc::new();
        book.add(1, Side::Bid, px32(100, 0), Qty::new(1_000_000.0), Ts(0), &updates)
            .unwrap();
        book.modify(1, px32(100, 5), Qty::new(1_000_000.0), Ts(1), &updates)
            .unwrap();
        assert_eq!(book.best_bid().unwrap().0, px32(100, 5));
    }

    proptest::proptest! {
        /// Aggregate level quantity always equals the sum of remaining
        /// quantities of resting orders on that side, through a mix of
        /// add/cancel.
        #[test]
        fn prop_book_conservation(
            ops in proptest::collection::vec((proptest::bool::ANY, 1u8..20, 0u8..8, 1u32..20), 1..40),
        ) {
            let mut book = TestBook::new(Instrument::Note10Y);
            let updates: UpdateRing = Spsc::new();
            let mut next_id = 1u64;
            let mut live: Vec<(u64, Side, i64)> = Vec::new();

            for (is_add, whole, ts32, qty_m) in ops {
                if is_add || live.is_empty() {
                    let side = if next_id % 2 == 0 { Side::Bid } else { Side::Ask };
                    let price = px32(i32::from(whole), ts32);
                    let qty = Qty::new(f64::from(qty_m) * 1_000_000.0);
                    if book.add(next_id, side, price, qty, Ts(next_id), &updates).is_ok() {
                        live.push((next_id, side, qty.ticks()));
                    }
                    next_id += 1;
                } else {
                    let pick = (whole as usize + ts32 as usize) % live.len();
                    let (id, _, _) = live.remove(pick);
                    book.cancel(id, Ts(next_id), &updates).unwrap();
                    next_id += 1;
                }
            }

            for side in [Side::Bid, Side::Ask] {
                let expected: i64 = live.iter().filter(|(_, s, _)| *s == side).map(|(_, _, q)| q).sum();
                proptest::prop_assert_eq!(book.sum_remaining(side), expected);
            }
        }
    }
}
