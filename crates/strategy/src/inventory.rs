//! Per-instrument inventory/PnL state, owned by the strategy quoting that
//! instrument (this `InventoryState`). VWAP cost-basis tracking follows a
//! weighted-average idiom, adapted from atomics (appropriate for a
//! position shared across threads) to plain fields, since each
//! `InventoryState` is owned single-threaded by its strategy on the Engine
//! thread.

use common::{Px, Qty, Side};

pub struct InventoryState {
    pub net_position_ticks: i64,
    pub vwap_cost_basis: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub target_position_ticks: i64,
    position_limit_ticks: i64,
}

impl InventoryState {
    #[must_use]
    pub fn new(position_limit_ticks: i64) -> Self {
        Self {
            net_position_ticks: 0,
            vwap_cost_basis: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            target_position_ticks: 0,
            position_limit_ticks,
        }
    }

    /// Applies a fill, maintaining a size-weighted average cost basis and
    /// realizing PnL on any reduction/flip, mirroring
    /// `Position::apply_fill`'s branch structure.
    pub fn apply_fill(&mut self, side: Side, qty: Qty, price: Px) {
        let qty_ticks = qty.ticks();
        let price_f = price.as_f64();
        let delta = match side {
            Side::Bid => qty_ticks,
            Side::Ask => -qty_ticks,
        };
        let old_position = self.net_position_ticks;
        let new_position = old_position + delta;

        if new_position != 0 && old_position.signum() * new_position.signum() >= 0 {
            // Opening or adding to a position in the same direction.
            self.vwap_cost_basis = if old_position == 0 {
                price_f
            } else {
                let old_abs = old_position.unsigned_abs() as f64;
                let added_abs = qty_ticks.unsigned_abs() as f64;
                (self.vwap_cost_basis * old_abs + price_f * added_abs) / (old_abs + added_abs)
            };
        } else if old_position != 0 {
            // Reducing, closing, or flipping.
            let closed = old_position.abs().min(delta.abs());
            let pnl_per_tick = if old_position > 0 {
                price_f - self.vwap_cost_basis
            } else {
                self.vwap_cost_basis - price_f
            };
            self.realized_pnl += pnl_per_tick * closed as f64;
            if new_position != 0 && new_position.signum() != old_position.signum() {
                self.vwap_cost_basis = price_f;
            }
        }

        self.net_position_ticks = new_position;
    }

    pub fn mark_unrealized(&mut self, mid: f64) {
        self.unrealized_pnl = if self.net_position_ticks > 0 {
            (mid - self.vwap_cost_basis) * self.net_position_ticks as f64
        } else if self.net_position_ticks < 0 {
            (self.vwap_cost_basis - mid) * self.net_position_ticks.unsigned_abs() as f64
        } else {
            0.0
        };
    }

    /// Position utilization against the configured limit, in `[0, 1]`
    /// (saturating at 1 for a position that has somehow exceeded it).
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.position_limit_ticks == 0 {
            return 0.0;
        }
        (self.net_position_ticks.unsigned_abs() as f64 / self.position_limit_ticks as f64).min(1.0)
    }

    #[must_use]
    pub fn position_limit_ticks(&self) -> i64 {
        self.position_limit_ticks
    }

    /// Urgency to rebalance towards `target_position_ticks`, in `[0, 1]`,
    /// scaled by how far current utilization already is past 50%.
    #[must_use]
    pub fn rebalance_urgency(&self) -> f64 {
        let drift = (self.net_position_ticks - self.target_position_ticks).unsigned_abs() as f64;
        if self.position_limit_ticks == 0 {
            return 0.0;
        }
        (drift / self.position_limit_ticks as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vwap_updates_on_same_direction_adds() {
        let mut inv = InventoryState::new(100_000_000 * common::SCALE_4);
        inv.apply_fill(Side::Bid, Qty::new(10_000_000.0), Px::new(100.0));
        inv.apply_fill(Side::Bid, Qty::new(10_000_000.0), Px::new(102.0));
        assert!((inv.vwap_cost_basis - 101.0).abs() < 1e-6);
        assert_eq!(inv.net_position_ticks, Qty::new(20_000_000.0).ticks());
    }

    #[test]
    fn realizes_pnl_on_reduction() {
        let mut inv = InventoryState::new(100_000_000 * common::SCALE_4);
        inv.apply_fill(Side::Bid, Qty::new(10_000_000.0), Px::new(100.0));
        inv.apply_fill(Side::Ask, Qty::new(10_000_000.0), Px::new(102.0));
        assert!(inv.realized_pnl > 0.0);
        assert_eq!(inv.net_position_ticks, 0);
    }

    #[test]
    fn utilization_saturates_at_one() {
        let mut inv = InventoryState::new(10_000_000 * common::SCALE_4);
        inv.apply_fill(Side::Bid, Qty::new(50_000_000.0), Px::new(100.0));
        assert_eq!(inv.utilization(), 1.0);
    }
}
