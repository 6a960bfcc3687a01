//! Wire-shape types for the [`crate::Venue`] interface: the order request
//! a venue accepts, the synchronous ack it returns, and the asynchronous
//! response it later yields from `poll_responses`.

use common::{Instrument, Px, Qty, Side, Ts};
use lifecycle::{OrderKind, OrderState, VenueId};

/// Everything a venue needs to accept an order. Mirrors
/// `lifecycle::OrderRecord`'s fields that a venue actually cares about —
/// the lifecycle manager keeps the rest (audit trail, seen executions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderRequest {
    pub order_id: u64,
    pub instrument: Instrument,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Px,
    pub qty: Qty,
}

/// A `<=24`-byte ASCII reason code, stored inline so venue responses never
/// allocate — the same idiom as `lifecycle::audit::Reason`, one byte
/// longer to match the wire contract's `reason[24]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueReason {
    bytes: [u8; 24],
    len: u8,
}

impl VenueReason {
    #[must_use]
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; 24];
        let n = s.len().min(24);
        bytes[..n].copy_from_slice(&s.as_bytes()[..n]);
        Self { bytes, len: n as u8 }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl Default for VenueReason {
    fn default() -> Self {
        Self::new("")
    }
}

/// Why a venue rejected a `submit`/`cancel` request synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    VenueDisabled,
    UnknownOrder,
    DuplicateOrderId,
    Disconnected,
    Throttled,
}

impl RejectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VenueDisabled => "venue disabled",
            Self::UnknownOrder => "unknown order",
            Self::DuplicateOrderId => "duplicate order id",
            Self::Disconnected => "disconnected",
            Self::Throttled => "throttled",
        }
    }
}

/// Synchronous outcome of `submit`: an `Ack` means the venue accepted the
/// request for processing (not that it filled), a `Reject` means it never
/// entered the venue's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    Ack { venue_order_id: [u8; 16] },
    Reject { reason: RejectReason },
}

/// Synchronous outcome of `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResult {
    Ack,
    Reject { reason: RejectReason },
}

/// An asynchronous venue event drained via `poll_responses`: order id,
/// new state, fill quantity/price, venue order id, and a reason code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VenueResponse {
    pub order_id: u64,
    pub venue_id: VenueId,
    pub new_state: OrderState,
    pub fill_qty: Qty,
    pub fill_price: Px,
    pub venue_order_id: [u8; 16],
    pub reason: VenueReason,
    pub latency_ns: u64,
    pub ts: Ts,
}
