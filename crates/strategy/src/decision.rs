//! `TradingDecision`, the single output of a strategy cycle.

use common::{Instrument, Px, Qty, Ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoAction,
    UpdateQuotes,
    CancelQuotes,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingDecision {
    pub action: Action,
    pub instrument: Instrument,
    pub bid_price: Px,
    pub ask_price: Px,
    pub bid_size: Qty,
    pub ask_size: Qty,
    pub confidence: f64,
    pub expected_pnl: f64,
    pub decision_ts_ns: Ts,
}

impl TradingDecision {
    #[must_use]
    pub fn no_action(instrument: Instrument, ts: Ts) -> Self {
        Self {
            action: Action::NoAction,
            instrument,
            bid_price: Px::ZERO,
            ask_price: Px::ZERO,
            bid_size: Qty::ZERO,
            ask_size: Qty::ZERO,
            confidence: 0.0,
            expected_pnl: 0.0,
            decision_ts_ns: ts,
        }
    }

    #[must_use]
    pub fn cancel_quotes(instrument: Instrument, ts: Ts) -> Self {
        Self {
            action: Action::CancelQuotes,
            ..Self::no_action(instrument, ts)
        }
    }
}
