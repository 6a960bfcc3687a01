//! A single side's price ladder: a sorted array of [`PriceLevel`]s, each
//! carrying an intrusive FIFO (head/tail indices into the order arena) so
//! that insertion at the tail and removal of any node are O(1) once the
//! level has been located. Struct-of-arrays level style, generalized to
//! carry individual resting orders instead of an aggregate-only depth
//! snapshot.

use common::{Px, Qty, Side};

pub(crate) const NIL: u32 = u32::MAX;

/// One price level: an aggregate quantity plus a FIFO of order-arena
/// indices. Levels are always stored in ascending-price order inside
/// [`Ladder`]; "best" is the last element for a bid ladder and the first
/// for an ask ladder.
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    pub price: Px,
    pub aggregate_qty: Qty,
    pub(crate) head: u32,
    pub(crate) tail: u32,
    pub(crate) count: u32,
}

impl PriceLevel {
    fn new(price: Px) -> Self {
        Self {
            price,
            aggregate_qty: Qty::ZERO,
            head: NIL,
            tail: NIL,
            count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// One side of an [`crate::book::OrderBook`]: a sorted array of non-empty
/// price levels. `CAP` bounds the array's pre-reserved capacity (typical
/// active-level counts are well under 128 here algorithmic contract);
/// growth past that still works, it just reallocates.
pub struct Ladder {
    side: Side,
    levels: Vec<PriceLevel>,
}

impl Ladder {
    #[must_use]
    pub fn new(side: Side, reserve: usize) -> Self {
        Self {
            side,
            levels: Vec::with_capacity(reserve),
        }
    }

    fn search(&self, price: Px) -> Result<usize, usize> {
        self.levels.binary_search_by_key(&price, |l| l.price)
    }

    /// Returns the level index for `price`, inserting an empty level in
    /// sorted position if one did not already exist.
    pub(crate) fn level_index_or_insert(&mut self, price: Px) -> usize {
        match self.search(price) {
            Ok(idx) => idx,
            Err(idx) => {
                self.levels.insert(idx, PriceLevel::new(price));
                idx
            }
        }
    }

    pub(crate) fn level_index(&self, price: Px) -> Option<usize> {
        self.search(price).ok()
    }

    pub(crate) fn level_mut(&mut self, idx: usize) -> &mut PriceLevel {
        &mut self.levels[idx]
    }

    pub(crate) fn level(&self, idx: usize) -> &PriceLevel {
        &self.levels[idx]
    }

    /// Removes the level at `idx` if it has gone empty. No-op otherwise.
    pub(crate) fn remove_if_empty(&mut self, idx: usize) {
        if self.levels[idx].is_empty() {
            self.levels.remove(idx);
        }
    }

    /// Best (highest-priority) level index: last for a bid ladder, first
    /// for an ask ladder, matching the ascending-price storage order.
    pub(crate) fn best_index(&self) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        Some(match self.side {
                Side::Bid => self.levels.len() - 1,
                Side::Ask => 0,
        })
    }

    /// The next level deeper than `idx`, walking away from the best.
    pub(crate) fn next_deeper(&self, idx: usize) -> Option<usize> {
        match self.side {
            Side::Bid => idx.checked_sub(1),
            Side::Ask => {
                let next = idx + 1;
                (next < self.levels.len()).then_some(next)
            }
        }
    }

    #[must_use]
    pub fn best(&self) -> Option<(Px, Qty)> {
        self.best_index().map(|i| {
                let l = &self.levels[i];
                (l.price, l.aggregate_qty)
        })
    }

    /// Top `n` non-empty levels, best first.
    #[must_use]
    pub fn depth(&self, n: usize) -> Vec<(Px, Qty)> {
        let mut out = Vec::with_capacity(n.min(self.levels.len()));
        let mut idx = self.best_index();
        while let Some(i) = idx {
            if out.len() >= n {
                break;
            }
            let l = &self.levels[i];
            out.push((l.price, l.aggregate_qty));
            idx = self.next_deeper(i);
        }
        out
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
