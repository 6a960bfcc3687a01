//! Layer 1: the nanosecond-scale fast gate — a `DashMap<Symbol,
//! SymbolRisk>` of per-instrument atomics and a short-circuiting
//! sequence of cheap comparisons. Target p50 <= 50ns; short-circuits on
//! the first rejection so the bitmask it returns only ever carries a
//! single bit, unlike Layer 2's complete mask.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use common::{Instrument, Qty, Side, Ts};
use dashmap::DashMap;

use crate::halt::EmergencyHalt;
use crate::outcome::{RiskOutcome, RiskViolation};

/// Layer 1 limits. A flat `Default` covers every instrument identically;
/// callers that need per-instrument limits construct one and mutate the
/// per-instrument array directly.
#[derive(Debug, Clone, Copy)]
pub struct Layer1Limits {
    pub max_position_ticks: [i64; 6],
    pub max_order_qty_ticks: i64,
    pub max_daily_orders: u64,
}

impl Default for Layer1Limits {
    fn default() -> Self {
        Self {
            max_position_ticks: [100_000_000 * common::SCALE_4; 6],
            max_order_qty_ticks: 50_000_000 * common::SCALE_4,
            max_daily_orders: 10_000,
        }
    }
}

impl Layer1Limits {
    #[must_use]
    pub fn max_position_for(&self, instrument: Instrument) -> i64 {
        self.max_position_ticks[(instrument.wire_id() - 1) as usize]
    }

    pub fn set_max_position(&mut self, instrument: Instrument, ticks: i64) {
        self.max_position_ticks[(instrument.wire_id() - 1) as usize] = ticks;
    }
}

#[derive(Debug, Default)]
struct SymbolRiskState {
    position_ticks: AtomicI64,
    daily_order_count: AtomicU64,
    last_order_ts: AtomicU64,
    daily_realized_pnl_ticks: AtomicI64,
}

/// Layer 1 fast gate. Single instance shared (read-mostly) across the
/// Engine thread (which calls `check`) and the Venue I/O / fill-application
/// path (which calls `apply_fill`) — safe because every state
/// update is an additive atomic.
pub struct Layer1Gate {
    limits: Layer1Limits,
    halt: Arc<EmergencyHalt>,
    symbol_risk: DashMap<Instrument, SymbolRiskState>,
}

impl Layer1Gate {
    #[must_use]
    pub fn new(limits: Layer1Limits, halt: Arc<EmergencyHalt>) -> Self {
        Self {
            limits,
            halt,
            symbol_risk: DashMap::with_capacity(Instrument::ALL.len()),
        }
    }

    /// Evaluates the four Layer 1 checks in increasing cost order,
    /// returning on the first rejection (this short-circuit contract).
    #[inline(always)]
    pub fn check(&self, instrument: Instrument, side: Side, qty: Qty, ts: Ts) -> (RiskOutcome, RiskViolation) {
        if self.halt.is_set() {
            return (RiskOutcome::EmergencyHalt, RiskViolation::EMERGENCY_HALT);
        }

        let qty_ticks = qty.ticks().abs();
        if qty_ticks > self.limits.max_order_qty_ticks {
            return (RiskOutcome::TradeRejected, RiskViolation::ORDER_QUANTITY);
        }

        let risk = self.symbol_risk.entry(instrument).or_default();

        if risk.daily_order_count.load(Ordering::Relaxed) >= self.limits.max_daily_orders {
            return (RiskOutcome::TradeRejected, RiskViolation::DAILY_ORDER_COUNT);
        }

        let current = risk.position_ticks.load(Ordering::Relaxed);
        let delta = match side {
            Side::Bid => qty_ticks,
            Side::Ask => -qty_ticks,
        };
        let hypothetical = current.saturating_add(delta);
        if hypothetical.abs() > self.limits.max_position_for(instrument) {
            return (RiskOutcome::TradeRejected, RiskViolation::POSITION_LIMIT);
        }

        let _ = ts;
        (RiskOutcome::Approved, RiskViolation::NONE)
    }

    /// Records that an order was sent, for the daily count limit. Called by
    /// `lifecycle` after a successful route, not inside `check` itself, so
    /// a rejected order never consumes a count slot.
    pub fn record_order_sent(&self, instrument: Instrument, ts: Ts) {
        let risk = self.symbol_risk.entry(instrument).or_default();
        risk.daily_order_count.fetch_add(1, Ordering::Relaxed);
        risk.last_order_ts.store(ts.as_nanos(), Ordering::Relaxed);
    }

    /// Applies an actual fill to the tracked position, as opposed to
    /// `check`'s hypothetical delta. Safe to call from the fill-application
    /// thread concurrently with `check` on the Engine thread.
    pub fn apply_fill(&self, instrument: Instrument, side: Side, qty: Qty, realized_pnl_delta_ticks: i64) {
        let risk = self.symbol_risk.entry(instrument).or_default();
        let delta = match side {
            Side::Bid => qty.ticks(),
            Side::Ask => -qty.ticks(),
        };
        risk.position_ticks.fetch_add(delta, Ordering::AcqRel);
        risk.daily_realized_pnl_ticks
            .fetch_add(realized_pnl_delta_ticks, Ordering::AcqRel);
    }

    #[must_use]
    pub fn position_ticks(&self, instrument: Instrument) -> i64 {
        self.symbol_risk
            .get(&instrument)
            .map_or(0, |r| r.position_ticks.load(Ordering::Relaxed))
    }

    pub fn reset_daily(&self) {
        for entry in &self.symbol_risk {
            entry.daily_order_count.store(0, Ordering::Relaxed);
            entry.daily_realized_pnl_ticks.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> Layer1Gate {
        Layer1Gate::new(Layer1Limits::default(), Arc::new(EmergencyHalt::new()))
    }

    /// Scenario 4: position=95M, limit=100M, buy 10M -> TradeRejected
    /// with `PositionLimit`.
    #[test]
    fn scenario_layer1_position_reject() {
        let gate = gate();
        gate.apply_fill(Instrument::Note10Y, Side::Bid, Qty::new(95_000_000.0), 0);

        let (outcome, violations) =
        gate.check(Instrument::Note10Y, Side::Bid, Qty::new(10_000_000.0), Ts(0));
        assert_eq!(outcome, RiskOutcome::TradeRejected);
        assert!(violations.contains(RiskViolation::POSITION_LIMIT));
    }

    #[test]
    fn emergency_halt_rejects_everything() {
        let halt = Arc::new(EmergencyHalt::new());
        let gate = Layer1Gate::new(Layer1Limits::default(), halt.clone());
        halt.trigger();
        let (outcome, violations) =
        gate.check(Instrument::Bill3M, Side::Bid, Qty::new(1_000_000.0), Ts(0));
        assert_eq!(outcome, RiskOutcome::EmergencyHalt);
        assert!(violations.contains(RiskViolation::EMERGENCY_HALT));
    }

    #[test]
    fn within_limits_is_approved() {
        let gate = gate();
        let (outcome, violations) =
        gate.check(Instrument::Bill3M, Side::Bid, Qty::new(1_000_000.0), Ts(0));
        assert_eq!(outcome, RiskOutcome::Approved);
        assert_eq!(violations, RiskViolation::NONE);
    }

    proptest::proptest! {
        /// Layer 1 severity is non-decreasing in (|position after|, order
        /// count, order quantity).
        #[test]
        fn prop_risk_monotonicity(position_m in 0u32..200, qty_m in 1u32..200) {
            let gate = gate();
            gate.apply_fill(Instrument::Note10Y, Side::Bid, Qty::new(f64::from(position_m) * 1_000_000.0), 0);
            let (outcome, _) = gate.check(
                Instrument::Note10Y,
                Side::Bid,
                Qty::new(f64::from(qty_m) * 1_000_000.0),
                Ts(0),
            );

            let hypothetical = f64::from(position_m) + f64::from(qty_m);
            if hypothetical * 1_000_000.0 <= gate.limits.max_position_for(Instrument::Note10Y) as f64 / common::SCALE_4 as f64 {
                proptest::prop_assert_eq!(outcome, RiskOutcome::Approved);
            } else {
                proptest::prop_assert_eq!(outcome, RiskOutcome::TradeRejected);
            }
        }
    }
}
