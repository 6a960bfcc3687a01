//! The `Venue` capability: realistic venue behavior is abstracted into a
//! pluggable trait the lifecycle component talks to, generalized from
//! one-venue-per-adapter-impl to one-venue-per-trait-impl with no
//! assumption about what sits on the other side.

use common::Ts;

use crate::types::{CancelResult, OrderRequest, SubmitResult, VenueResponse};

/// A trading venue collaborator. Every method takes the caller's
/// monotonic `now` rather than reading a wall clock, so a venue's fill
/// timing is reproducible under the same driving sequence of calls —
/// required for [`crate::SimVenue`] to be deterministic, and harmless for
/// a real venue adapter that ignores the hint.
pub trait Venue: Send {
    /// Submits a new order. Synchronous ack/reject only; fills and state
    /// changes past the initial ack arrive later via `poll_responses`.
    fn submit(&mut self, request: OrderRequest, now: Ts) -> SubmitResult;

    /// Requests cancellation of a previously submitted order.
    fn cancel(&mut self, order_id: u64, now: Ts) -> CancelResult;

    /// Drains up to `max` pending venue events, oldest first.
    fn poll_responses(&mut self, now: Ts, max: usize) -> Vec<VenueResponse>;
}
