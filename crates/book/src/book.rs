//! Per-instrument FIFO limit order book: two [`Ladder`]s plus an
//! `order_id -> arena index` hash index, matching this contract exactly.
//! The order arena is a [`pool::LocalPool`] (Engine-thread-only, no
//! atomics) — the book is never touched from more than one thread, per
//! this "only the Engine thread mutates book state".

use std::sync::atomic::{AtomicU64, Ordering};

use common::{Instrument, Px, Qty, Side, Ts};
use pool::LocalPool;
use ring::Spsc;
use rustc_hash::FxHashMap;

use crate::error::{BookError, BookResult};
use crate::level::{Ladder, NIL};
use crate::update::{OrderBookUpdate, UpdateKind};

/// A single resting order as stored in the arena. Not exposed outside the
/// crate: callers interact with the book through order ids.
struct RestingOrder {
    order_id: u64,
    side: Side,
    price: Px,
    remaining: Qty,
    next: u32,
    prev: u32,
}

/// Per-instrument order book. `MAX_ORDERS` bounds the resting-order arena;
/// exhaustion is a typed rejection (`BookError::ArenaExhausted`), not a
/// panic or a reallocation.
pub struct OrderBook<const MAX_ORDERS: usize> {
    pub instrument: Instrument,
    bids: Ladder,
    asks: Ladder,
    arena: LocalPool<RestingOrder, MAX_ORDERS>,
    index: FxHashMap<u64, usize>,
    seq: AtomicU64,
    pub updates_dropped: AtomicU64,
}

impl<const MAX_ORDERS: usize> OrderBook<MAX_ORDERS> {
    #[must_use]
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            bids: Ladder::new(Side::Bid, 128),
            asks: Ladder::new(Side::Ask, 128),
            arena: LocalPool::new(),
            index: FxHashMap::default(),
            seq: AtomicU64::new(0),
            updates_dropped: AtomicU64::new(0),
        }
    }

    fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn emit<const N: usize>(
        &self,
        updates: &Spsc<OrderBookUpdate, N>,
        kind: UpdateKind,
        side: Side,
        price: Px,
        qty_delta: Qty,
        ts: Ts,
    ) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let update = OrderBookUpdate {
            instrument: self.instrument,
            kind,
            side,
            price,
            qty_delta,
            ts_ns: ts,
            seq,
        };
        if !updates.try_push(update) {
            self.updates_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Unlinks arena index `idx` from its level's FIFO. Caller updates the
    /// level's `aggregate_qty` and removes the level if it goes empty.
    fn unlink(&mut self, side: Side, level_idx: usize, idx: usize) {
        let (prev, next) = {
            let order = self.arena.get(idx);
            (order.prev, order.next)
        };
        if prev != NIL {
            self.arena.get_mut(prev as usize).next = next;
        }
        if next != NIL {
            self.arena.get_mut(next as usize).prev = prev;
        }
        let level = self.ladder_mut(side).level_mut(level_idx);
        if level.head == idx as u32 {
            level.head = next;
        }
        if level.tail == idx as u32 {
            level.tail = prev;
        }
        level.count -= 1;
    }

    fn link_tail(&mut self, side: Side, level_idx: usize, idx: usize) {
        let level = self.ladder_mut(side).level_mut(level_idx);
        let old_tail = level.tail;
        level.tail = idx as u32;
        if level.head == NIL {
            level.head = idx as u32;
        }
        level.count += 1;
        if old_tail != NIL {
            self.arena.get_mut(old_tail as usize).next = idx as u32;
        }
        self.arena.get_mut(idx).prev = old_tail;
        self.arena.get_mut(idx).next = NIL;
    }

    /// Inserts `order_id` at `price` for `qty`. Rejects zero/negative
    /// quantity, non-positive price, and a previously-seen `order_id`.
    pub fn add<const N: usize>(
        &mut self,
        order_id: u64,
        side: Side,
        price: Px,
        qty: Qty,
        ts: Ts,
        updates: &Spsc<OrderBookUpdate, N>,
    ) -> BookResult<()> {
        if !qty.is_positive() || !price.is_positive() {
            return Err(BookError::InvalidOrder);
        }
        if self.index.contains_key(&order_id) {
            return Err(BookError::Duplicate(order_id));
        }
        let idx = self
            .arena
            .acquire_index(|| RestingOrder {
                order_id,
                side,
                price,
                remaining: qty,
                next: NIL,
                prev: NIL,
            })
            .ok_or(BookError::ArenaExhausted)?;

        let level_idx = self.ladder_mut(side).level_index_or_insert(price);
        self.link_tail(side, level_idx, idx);
        {
            let level = self.ladder_mut(side).level_mut(level_idx);
            level.aggregate_qty = level.aggregate_qty + qty;
        }
        self.index.insert(order_id, idx);

        self.emit(updates, UpdateKind::Add, side, price, qty, ts);
        Ok(())
    }

    /// Removes `order_id`. `NotFound` if the id is unknown (already
    /// cancelled/filled, or never existed).
    pub fn cancel<const N: usize>(
        &mut self,
        order_id: u64,
        ts: Ts,
        updates: &Spsc<OrderBookUpdate, N>,
    ) -> BookResult<()> {
        let idx = *self.index.get(&order_id).ok_or(BookError::NotFound(order_id))?;
        let (side, price, remaining) = {
            let order = self.arena.get(idx);
            (order.side, order.price, order.remaining)
        };
        let level_idx = self
            .ladder(side)
            .level_index(price)
            .expect("resting order's price must have a live level");
        self.unlink(side, level_idx, idx);
        {
            let level = self.ladder_mut(side).level_mut(level_idx);
            level.aggregate_qty = level.aggregate_qty - remaining;
        }
        self.ladder_mut(side).remove_if_empty(level_idx);
        self.arena.release(idx);
        self.index.remove(&order_id);

        self.emit(updates, UpdateKind::Cancel, side, price, remaining, ts);
        Ok(())
    }

    /// Price change is equivalent to cancel+add (new FIFO priority at the
    /// new level). A quantity-only decrease updates in place, keeping
    /// priority; a quantity-only increase updates in place but loses
    /// priority (re-queued at the tail of its level).
    pub fn modify<const N: usize>(
        &mut self,
        order_id: u64,
        new_price: Px,
        new_qty: Qty,
        ts: Ts,
        updates: &Spsc<OrderBookUpdate, N>,
    ) -> BookResult<()> {
        if !new_qty.is_positive() || !new_price.is_positive() {
            return Err(BookError::InvalidOrder);
        }
        let idx = *self.index.get(&order_id).ok_or(BookError::NotFound(order_id))?;
        let (side, old_price, old_qty) = {
            let order = self.arena.get(idx);
            (order.side, order.price, order.remaining)
        };

        if new_price != old_price {
            self.cancel(order_id, ts, updates)?;
            return self.add(order_id, side, new_price, new_qty, ts, updates);
        }

        let level_idx = self
            .ladder(side)
            .level_index(old_price)
            .expect("resting order's price must have a live level");

        if new_qty > old_qty {
            // Upward size change: re-queue at the tail, losing priority.
            self.unlink(side, level_idx, idx);
            self.link_tail(side, level_idx, idx);
        }
        self.arena.get_mut(idx).remaining = new_qty;
        let level = self.ladder_mut(side).level_mut(level_idx);
        level.aggregate_qty = level.aggregate_qty - old_qty + new_qty;

        self.emit(updates, UpdateKind::Modify, side, new_price, new_qty, ts);
        Ok(())
    }

    /// Consumes resting orders on the side opposite `aggressor_side` in
    /// strict price-time priority until `qty` is exhausted, that side is
    /// empty, or the next resting level no longer crosses `price` (a no-op
    /// on an empty or uncrossable side, not an error). Returns the quantity
    /// actually consumed and emits one `Trade` update per level walked.
    pub fn trade<const N: usize>(
        &mut self,
        price: Px,
        qty: Qty,
        aggressor_side: Side,
        ts: Ts,
        updates: &Spsc<OrderBookUpdate, N>,
    ) -> Qty {
        if !qty.is_positive() {
            return Qty::ZERO;
        }
        let resting_side = aggressor_side.opposite();
        let mut remaining_to_fill = qty.ticks();
        let mut total_filled = 0i64;

        while remaining_to_fill > 0 {
            let Some(level_idx) = self.ladder(resting_side).best_index() else {
                break;
            };
            let level_price = self.ladder(resting_side).level(level_idx).price;
            // A resting ask only crosses a bid aggressor at or below its
            // limit; a resting bid only crosses an ask aggressor at or
            // above its limit. Once the best remaining level fails that
            // bound, no deeper level can cross either (ladders are sorted).
            let crosses = match aggressor_side {
                Side::Bid => level_price <= price,
                Side::Ask => level_price >= price,
            };
            if !crosses {
                break;
            }
            let mut filled_at_level = 0i64;

            loop {
                if remaining_to_fill == 0 {
                    break;
                }
                let head = self.ladder(resting_side).level(level_idx).head;
                if head == NIL {
                    break;
                }
                let head_idx = head as usize;
                let (order_id, order_remaining) = {
                    let order = self.arena.get(head_idx);
                    (order.order_id, order.remaining.ticks())
                };
                let take = remaining_to_fill.min(order_remaining);
                remaining_to_fill -= take;
                filled_at_level += take;

                if take == order_remaining {
                    self.unlink(resting_side, level_idx, head_idx);
                    self.arena.release(head_idx);
                    self.index.remove(&order_id);
                } else {
                    self.arena.get_mut(head_idx).remaining =
                    Qty::from_ticks(order_remaining - take);
                }
            }

            if filled_at_level > 0 {
                let level = self.ladder_mut(resting_side).level_mut(level_idx);
                level.aggregate_qty = Qty::from_ticks(level.aggregate_qty.ticks() - filled_at_level);
                self.ladder_mut(resting_side).remove_if_empty(level_idx);
                self.emit(
                    updates,
                    UpdateKind::Trade,
                    resting_side,
                    level_price,
                    Qty::from_ticks(filled_at_level),
                    ts,
                );
                total_filled += filled_at_level;
            } else {
                break;
            }
        }

        Qty::from_ticks(total_filled)
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<(Px, Qty)> {
        self.bids.best()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<(Px, Qty)> {
        self.asks.best()
    }

    /// Top `n` non-empty levels on `side`, best first.
    #[must_use]
    pub fn depth(&self, side: Side, n: usize) -> Vec<(Px, Qty)> {
        self.ladder(side).depth(n.max(1))
    }

    #[must_use]
    pub fn level_count(&self, side: Side) -> usize {
        self.ladder(side).level_count()
    }

    /// Sum of `remaining` across all resting orders on `side`, walking
    /// every level — used by property tests to check level-vs-order
    /// quantity conservation, not meant for the hot path.
    #[must_use]
    pub fn sum_remaining(&self, side: Side) -> i64 {
        let mut total = 0i64;
        let mut idx = self.ladder(side).best_index();
        while let Some(i) = idx {
            total += self.ladder(side).level(i).aggregate_qty.ticks();
            idx = self.ladder(side).next_deeper(i);
        }
        total
    }
}
