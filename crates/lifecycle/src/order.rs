//! The order record stored in each arena slot, and its time-in-force
//! vocabulary: order-level timeouts (`TimeInForce = Day/Ioc/Fok/Gtc`) are
//! implemented by this crate.

use rustc_hash::FxHashSet;

use common::{Instrument, Px, Qty, Side, Ts};

use crate::routing::VenueId;
use crate::state::OrderState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeInForce {
    Day,
    Ioc,
    Fok,
    Gtc,
}

/// Order type, : a price-limit order, a yield-denominated limit
/// order (the same wire shape, priced off yield rather than 32nds at the
/// book edge), a market order, or an explicit cancel request modeled as
/// its own order type so the lifecycle table can audit it uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Limit,
    YieldLimit,
    Market,
    Cancel,
}

pub struct OrderRecord {
    pub order_id: u64,
    pub instrument: Instrument,
    pub side: Side,
    pub kind: OrderKind,
    pub state: OrderState,
    pub price: Px,
    pub original_qty: Qty,
    pub filled_qty: Qty,
    pub remaining_qty: Qty,
    pub venue: Option<VenueId>,
    pub tif: TimeInForce,
    pub expires_at: Option<Ts>,
    pub created_ts: Ts,
    pub updated_ts: Ts,
    /// Execution ids already applied to this order, so a replayed or
    /// duplicated fill report is a no-op.
    pub(crate) seen_executions: FxHashSet<u64>,
}

impl OrderRecord {
    #[must_use]
    pub fn new(
        order_id: u64,
        instrument: Instrument,
        side: Side,
        kind: OrderKind,
        price: Px,
        qty: Qty,
        tif: TimeInForce,
        expires_at: Option<Ts>,
        ts: Ts,
    ) -> Self {
        Self {
            order_id,
            instrument,
            side,
            kind,
            state: OrderState::Created,
            price,
            original_qty: qty,
            filled_qty: Qty::ZERO,
            remaining_qty: qty,
            venue: None,
            tif,
            expires_at,
            created_ts: ts,
            updated_ts: ts,
            seen_executions: FxHashSet::default(),
        }
    }

    /// DAY/GTC expire at an explicit horizon set by the caller; IOC/FOK
    /// have none since they are resolved synchronously at submission and
    /// never sit on the book waiting to time out.
    #[must_use]
    pub fn should_expire(&self, now: Ts) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match self.tif {
            TimeInForce::Ioc | TimeInForce::Fok => false,
            TimeInForce::Day | TimeInForce::Gtc => self.expires_at.is_some_and(|deadline| now >= deadline),
        }
    }
}
