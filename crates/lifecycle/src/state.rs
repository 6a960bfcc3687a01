//! The order state machine. A `HashMap<OrderState, Vec<OrderState>>`
//! transition table would be the obvious first cut, but this table is
//! consulted on the hot path (every fill, cancel, and route call checks
//! it), where a hash lookup would cost more than the check it is
//! guarding — so it's a const array indexed by `OrderState as usize`
//! instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderState {
    Created = 0,
    Validated = 1,
    Routed = 2,
    PendingNew = 3,
    Acknowledged = 4,
    PartiallyFilled = 5,
    Filled = 6,
    Cancelled = 7,
    Rejected = 8,
    Expired = 9,
    Error = 10,
    PendingCancel = 11,
    PendingReplace = 12,
    Replaced = 13,
    Suspended = 14,
}

pub const STATE_COUNT: usize = 15;

use OrderState::{
    Acknowledged, Cancelled, Created, Error as ErrorState, Expired, Filled, PartiallyFilled, PendingCancel,
    PendingNew, PendingReplace, Rejected, Replaced, Routed, Suspended, Validated,
};

/// Allowed next states for each state, indexed by `OrderState as usize`.
/// `PartiallyFilled -> PartiallyFilled` is a deliberate self-loop: a second
/// partial fill is a same-state transition, not a no-op.
// `Cancelled` is reachable directly from every non-terminal state, not
// only via `PendingCancel`: an emergency stop is an abrupt global cancel,
// so it transitions whatever non-terminal state an order happens to be
// in straight to `Cancelled` without a request/ack handshake.
const TRANSITIONS: [&[OrderState]; STATE_COUNT] = [
    &[Validated, Rejected, Cancelled, Expired, ErrorState], // Created
    &[Routed, Rejected, Cancelled, Expired, ErrorState],    // Validated
    &[PendingNew, Cancelled, Expired, ErrorState],          // Routed
    &[Acknowledged, Rejected, Cancelled, Expired, ErrorState], // PendingNew
    &[
        PartiallyFilled,
        Filled,
        PendingCancel,
        PendingReplace,
        Cancelled,
        Expired,
        Suspended,
        ErrorState,
    ], // Acknowledged
    &[
        PartiallyFilled,
        Filled,
        PendingCancel,
        PendingReplace,
        Cancelled,
        Expired,
        ErrorState,
    ], // PartiallyFilled
    &[], // Filled (terminal)
    &[], // Cancelled (terminal)
    &[], // Rejected (terminal)
    &[], // Expired (terminal)
    &[], // Error (terminal)
    &[Cancelled, Acknowledged, ErrorState],                                   // PendingCancel
    &[Replaced, Acknowledged, Cancelled, ErrorState],                         // PendingReplace
    &[Acknowledged, PartiallyFilled, Filled, Cancelled, Expired, ErrorState], // Replaced
    &[Acknowledged, Cancelled, Expired, ErrorState],                          // Suspended
];

impl OrderState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Filled | Cancelled | Rejected | Expired | ErrorState)
    }

    #[must_use]
    pub fn is_allowed(self, to: OrderState) -> bool {
        TRANSITIONS[self as usize].contains(&to)
    }

    /// Cancellable iff the order has not reached a terminal state.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        !self.is_terminal()
    }

    /// Only an order the venue has acknowledged but not yet executed on can
    /// be amended in place.
    #[must_use]
    pub const fn can_amend(self) -> bool {
        matches!(self, Acknowledged)
    }
}
