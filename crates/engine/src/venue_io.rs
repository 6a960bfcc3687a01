//! The Venue I/O thread: the only thread that talks to a `Box<dyn Venue>`.
//! Drains `VenueRequestRing`, dispatches each command to the venue it
//! names, and forwards every `VenueResponse` a venue yields back to the
//! Engine thread. An adapter-poll loop generalized to a registry of
//! venues keyed by `lifecycle::VenueId`, rather than one fixed adapter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use common::Ts;
use lifecycle::{OrderState, VenueId};
use venue::{CancelResult, RejectReason, SubmitResult, Venue, VenueReason, VenueResponse};

use crate::rings::{VenueCommand, VenueRequestRing, VenueResponseRing};

/// How many venue responses are polled from a single venue per I/O cycle
/// before moving on to the next one, so one chatty venue can't starve the
/// others sharing this thread.
const POLL_BATCH_PER_VENUE: usize = 64;

/// Owns every configured venue and shuttles commands/responses between
/// them and the rest of the engine. `dropped_responses` is exposed so the
/// telemetry thread can alarm on sustained response-ring backpressure
/// rather than silently losing fills.
pub struct VenueIoContext {
    venues: FxHashMap<VenueId, Box<dyn Venue>>,
    request_ring: Arc<VenueRequestRing>,
    response_ring: Arc<VenueResponseRing>,
    dropped_responses: Arc<AtomicU64>,
}

impl VenueIoContext {
    #[must_use]
    pub fn new(
        venues: FxHashMap<VenueId, Box<dyn Venue>>,
        request_ring: Arc<VenueRequestRing>,
        response_ring: Arc<VenueResponseRing>,
        dropped_responses: Arc<AtomicU64>,
    ) -> Self {
        Self { venues, request_ring, response_ring, dropped_responses }
    }

    fn push_response(&self, response: VenueResponse) {
        if !self.response_ring.try_push(response) {
            self.dropped_responses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn handle_command(&mut self, command: VenueCommand, now: Ts) {
        match command {
            VenueCommand::Submit { venue_id, request } => {
                let Some(venue) = self.venues.get_mut(&venue_id) else {
                    tracing::warn!(venue_id, "submit routed to unknown venue");
                    return;
                };
                if let SubmitResult::Reject { reason } = venue.submit(request, now) {
                    self.push_response(rejection(request.order_id, venue_id, reason, now));
                }
            }
            VenueCommand::Cancel { venue_id, order_id } => {
                let Some(venue) = self.venues.get_mut(&venue_id) else {
                    tracing::warn!(venue_id, "cancel routed to unknown venue");
                    return;
                };
                if let CancelResult::Reject { reason } = venue.cancel(order_id, now) {
                    tracing::debug!(order_id, venue_id, reason = reason.as_str(), "cancel rejected by venue");
                }
            }
        }
    }

    /// Drains every pending command, then polls every venue once. Returns
    /// the number of commands processed and responses forwarded, so the
    /// caller can decide whether to yield.
    fn run_cycle(&mut self, now: Ts) -> usize {
        let mut work = 0usize;
        while let Some(command) = self.request_ring.try_pop() {
            self.handle_command(command, now);
            work += 1;
        }

        let venue_ids: Vec<VenueId> = self.venues.keys().copied().collect();
        for venue_id in venue_ids {
            let responses = self.venues.get_mut(&venue_id).expect("id came from this map").poll_responses(now, POLL_BATCH_PER_VENUE);
            for response in responses {
                work += 1;
                self.push_response(response);
            }
        }
        work
    }
}

/// Synthesizes the `Rejected` `VenueResponse` a synchronous
/// `SubmitResult::Reject` doesn't carry on its own, so the Engine thread's
/// single `handle_venue_response` path covers both synchronous and
/// asynchronous rejections uniformly.
fn rejection(order_id: u64, venue_id: VenueId, reason: RejectReason, now: Ts) -> VenueResponse {
    VenueResponse {
        order_id,
        venue_id,
        new_state: OrderState::Rejected,
        fill_qty: common::Qty::ZERO,
        fill_price: common::Px::ZERO,
        venue_order_id: [0u8; 16],
        reason: VenueReason::new(reason.as_str()),
        latency_ns: 0,
        ts: now,
    }
}

/// Drives [`VenueIoContext::run_cycle`] until `shutdown` is set.
pub fn run(ctx: &mut VenueIoContext, shutdown: Arc<AtomicBool>) {
    let mut idle_cycles = 0u32;
    while !shutdown.load(Ordering::Relaxed) {
        let work = ctx.run_cycle(Ts::now());
        if work == 0 {
            idle_cycles += 1;
            if idle_cycles > 64 {
                std::thread::yield_now();
            }
        } else {
            idle_cycles = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::Spsc;
    use venue::{OrderRequest, SimVenue, SimVenueConfig};

    fn ctx_with_one_venue() -> (VenueIoContext, Arc<VenueRequestRing>, Arc<VenueResponseRing>) {
        let request_ring = Arc::new(Spsc::new());
        let response_ring = Arc::new(Spsc::new());
        let mut venues: FxHashMap<VenueId, Box<dyn Venue>> = FxHashMap::default();
        venues.insert(1, Box::new(SimVenue::new(1, SimVenueConfig::default())));
        let ctx = VenueIoContext::new(venues, request_ring.clone(), response_ring.clone(), Arc::new(AtomicU64::new(0)));
        (ctx, request_ring, response_ring)
    }

    #[test]
    fn submit_to_unknown_venue_does_not_panic() {
        let (mut ctx, request_ring, _response_ring) = ctx_with_one_venue();
        request_ring.try_push(VenueCommand::Submit {
            venue_id: 99,
            request: OrderRequest {
                order_id: 1,
                instrument: common::Instrument::Note10Y,
                side: common::Side::Bid,
                kind: lifecycle::OrderKind::Limit,
                price: common::Px::new(100.0),
                qty: common::Qty::new(1_000_000.0),
            },
        });
        ctx.run_cycle(Ts(0));
    }

    #[test]
    fn a_submitted_order_eventually_yields_a_response() {
        let (mut ctx, request_ring, response_ring) = ctx_with_one_venue();
        request_ring.try_push(VenueCommand::Submit {
            venue_id: 1,
            request: OrderRequest {
                order_id: 1,
                instrument: common::Instrument::Note10Y,
                side: common::Side::Bid,
                kind: lifecycle::OrderKind::Limit,
                price: common::Px::new(100.0),
                qty: common::Qty::new(1_000_000.0),
            },
        });

        let mut saw_response = false;
        for step in 0..1_000u64 {
            ctx.run_cycle(Ts(step * 1_000));
            if response_ring.try_pop().is_some() {
                saw_response = true;
                break;
            }
        }
        assert!(saw_response);
    }
}
