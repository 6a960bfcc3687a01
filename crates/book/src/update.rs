//! `OrderBookUpdate` stream: every state-changing book operation enqueues
//! one of these into a caller-supplied [`ring::Spsc`]. If the ring is full
//! the operation still completes and the book's `updates_dropped` counter
//! is incremented — updates are never silently lost without observability.

use common::{Px, Qty, Side, Ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Add,
    Cancel,
    Modify,
    Trade,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBookUpdate {
    pub instrument: common::Instrument,
    pub kind: UpdateKind,
    pub side: Side,
    pub price: Px,
    pub qty_delta: Qty,
    pub ts_ns: Ts,
    pub seq: u64,
}
