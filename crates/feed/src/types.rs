//! Normalized market data records produced by [`crate::handler::FeedHandler`].

use common::{Instrument, Px, Qty, Ts};

/// A two-sided market data update for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub instrument: Instrument,
    pub exchange_ts_ns: Ts,
    pub bid_price: Px,
    pub ask_price: Px,
    pub bid_size: Qty,
    pub ask_size: Qty,
    pub bid_yield: f64,
    pub ask_yield: f64,
}

impl Tick {
    /// A tick is valid iff both sides carry a positive price and size, per
    /// Strategy layers an additional `bid < ask` requirement on top of
    /// this before quoting.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bid_price.is_positive()
        && self.ask_price.is_positive()
        && self.bid_size.is_positive()
        && self.ask_size.is_positive()
    }

    #[must_use]
    pub fn is_crossed_or_locked(&self) -> bool {
        self.bid_price >= self.ask_price
    }
}

/// A single executed trade report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub instrument: Instrument,
    pub ts_ns: Ts,
    pub price: Px,
    pub size: Qty,
    pub yield_: f64,
    pub trade_id: [u8; 16],
}
