//! A deterministic in-process venue simulator: a synchronous, poll-driven
//! config/status idiom (`SimVenueConfig`, `SimVenueStatus`) rather than an
//! async, task-driven one, since the Venue I/O thread is a plain OS
//! thread with no async runtime to schedule on. Every delay is expressed
//! in simulated nanoseconds relative to the caller-supplied `now`, not
//! wall clock, so a fixed seed and a fixed driving sequence of calls
//! reproduce byte-identical output.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use tracing::{info, warn};

use common::{Px, Qty, Ts};
use lifecycle::{OrderKind, OrderState, VenueId};

use crate::trait_def::Venue;
use crate::types::{CancelResult, OrderRequest, RejectReason, SubmitResult, VenueReason, VenueResponse};

/// Tunable fill behavior for [`SimVenue`]. POD, `Default` gives a venue
/// that acks quickly and fills almost everything — a fast-forward-by-default
/// bias so a caller that doesn't care about venue friction gets a venue
/// that mostly gets out of the way.
#[derive(Debug, Clone, Copy)]
pub struct SimVenueConfig {
    pub seed: u64,
    pub ack_latency_ns: u64,
    pub fill_latency_ns: u64,
    pub fill_probability: f64,
    pub partial_fill_probability: f64,
    pub reject_probability: f64,
}

impl Default for SimVenueConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            ack_latency_ns: 50_000,
            fill_latency_ns: 200_000,
            fill_probability: 0.9,
            partial_fill_probability: 0.15,
            reject_probability: 0.01,
        }
    }
}

/// Lifecycle of the simulator itself, not of any one order —.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimVenueStatus {
    Running,
    Halted,
}

struct SimOrder {
    request: OrderRequest,
    remaining: Qty,
    venue_order_id: [u8; 16],
}

struct ScheduledResponse {
    ready_at: Ts,
    response: VenueResponse,
}

/// A single simulated venue. Owned exclusively by the Venue I/O thread;
/// `submit`/`cancel`/`poll_responses` all take `&mut self`, so no interior
/// synchronization is needed.
pub struct SimVenue {
    venue_id: VenueId,
    config: SimVenueConfig,
    status: SimVenueStatus,
    rng: StdRng,
    orders: FxHashMap<u64, SimOrder>,
    pending: VecDeque<ScheduledResponse>,
    next_venue_order_id: u128,
}

impl SimVenue {
    #[must_use]
    pub fn new(venue_id: VenueId, config: SimVenueConfig) -> Self {
        Self {
            venue_id,
            config,
            status: SimVenueStatus::Running,
            rng: StdRng::seed_from_u64(config.seed),
            orders: FxHashMap::default(),
            pending: VecDeque::new(),
            next_venue_order_id: 1,
        }
    }

    #[must_use]
    pub fn status(&self) -> SimVenueStatus {
        self.status
    }

    /// Operator kill switch: further `submit` calls reject with
    /// `Disconnected` until `resume` is called.
    pub fn halt(&mut self) {
        warn!(venue_id = self.venue_id, "simulated venue halted");
        self.status = SimVenueStatus::Halted;
    }

    pub fn resume(&mut self) {
        info!(venue_id = self.venue_id, "simulated venue resumed");
        self.status = SimVenueStatus::Running;
    }

    fn next_order_id_bytes(&mut self) -> [u8; 16] {
        let id = self.next_venue_order_id;
        self.next_venue_order_id += 1;
        id.to_le_bytes()
    }

    /// Inserts `response` into `pending` keeping it sorted by `ready_at`,
    /// so `poll_responses` can drain in time order with a simple front
    /// scan regardless of the order schedule calls arrived in.
    fn schedule(&mut self, response: VenueResponse) {
        let pos = self.pending.partition_point(|s| s.ready_at <= response.ready_at_hint());
        self.pending.insert(pos, ScheduledResponse { ready_at: response.ready_at_hint(), response });
    }
}

/// `VenueResponse` doesn't itself carry its schedule time (that's a
/// simulator-internal detail, not part of the wire shape) — this extracts
/// it from the `ts` field the simulator stamped it with, which *is* the
/// scheduled delivery time for a not-yet-delivered event.
trait ReadyAtHint {
    fn ready_at_hint(&self) -> Ts;
}

impl ReadyAtHint for VenueResponse {
    fn ready_at_hint(&self) -> Ts {
        self.ts
    }
}

impl Venue for SimVenue {
    fn submit(&mut self, request: OrderRequest, now: Ts) -> SubmitResult {
        if self.status == SimVenueStatus::Halted {
            return SubmitResult::Reject { reason: RejectReason::Disconnected };
        }
        if self.orders.contains_key(&request.order_id) {
            return SubmitResult::Reject { reason: RejectReason::DuplicateOrderId };
        }
        if self.rng.gen_bool(self.config.reject_probability.clamp(0.0, 1.0)) {
            return SubmitResult::Reject { reason: RejectReason::Throttled };
        }

        let venue_order_id = self.next_order_id_bytes();
        let remaining = request.qty;
        self.orders.insert(request.order_id, SimOrder { request, remaining, venue_order_id });

        let ack_at = Ts(now.0 + self.config.ack_latency_ns);
        self.schedule(VenueResponse {
            order_id: request.order_id,
            venue_id: self.venue_id,
            new_state: OrderState::Acknowledged,
            fill_qty: Qty::ZERO,
            fill_price: Px::ZERO,
            venue_order_id,
            reason: VenueReason::new("ack"),
            latency_ns: self.config.ack_latency_ns,
            ts: ack_at,
        });

        if request.kind != OrderKind::Cancel && self.rng.gen_bool(self.config.fill_probability.clamp(0.0, 1.0)) {
            let fill_at = Ts(ack_at.0 + self.config.fill_latency_ns);
            let partial = self.rng.gen_bool(self.config.partial_fill_probability.clamp(0.0, 1.0));
            let fill_qty = if partial {
                Qty::from_ticks((remaining.ticks() / 2).max(1))
            } else {
                remaining
            };
            if let Some(order) = self.orders.get_mut(&request.order_id) {
                order.remaining = order.remaining - fill_qty;
            }
            let new_state = if partial { OrderState::PartiallyFilled } else { OrderState::Filled };
            self.schedule(VenueResponse {
                order_id: request.order_id,
                venue_id: self.venue_id,
                new_state,
                fill_qty,
                fill_price: request.price,
                venue_order_id,
                reason: VenueReason::new(if partial { "partial fill" } else { "fill" }),
                latency_ns: self.config.fill_latency_ns,
                ts: fill_at,
            });
        }

        SubmitResult::Ack { venue_order_id }
    }

    fn cancel(&mut self, order_id: u64, now: Ts) -> CancelResult {
        let Some(order) = self.orders.remove(&order_id) else {
            return CancelResult::Reject { reason: RejectReason::UnknownOrder };
        };
        let ready_at = Ts(now.0 + self.config.ack_latency_ns);
        self.schedule(VenueResponse {
            order_id,
            venue_id: self.venue_id,
            new_state: OrderState::Cancelled,
            fill_qty: Qty::ZERO,
            fill_price: Px::ZERO,
            venue_order_id: order.venue_order_id,
            reason: VenueReason::new("cancelled"),
            latency_ns: self.config.ack_latency_ns,
            ts: ready_at,
        });
        CancelResult::Ack
    }

    fn poll_responses(&mut self, now: Ts, max: usize) -> Vec<VenueResponse> {
        let mut out = Vec::new();
        while out.len() < max {
            match self.pending.front() {
                Some(scheduled) if scheduled.ready_at <= now => {
                    // SAFETY-free: `front` just confirmed `Some`.
                    out.push(self.pending.pop_front().unwrap().response);
                }
                _ => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Instrument, Side};

    fn request(order_id: u64) -> OrderRequest {
        OrderRequest {
            order_id,
            instrument: Instrument::Note10Y,
            side: Side::Bid,
            kind: OrderKind::Limit,
            price: Px::new(100.0),
            qty: Qty::new(1_000_000.0),
        }
    }

    #[test]
    fn deterministic_with_fixed_seed() {
        let config = SimVenueConfig { reject_probability: 0.0, ..SimVenueConfig::default() };
        let mut a = SimVenue::new(1, config);
        let mut b = SimVenue::new(1, config);

        let ack_a = a.submit(request(1), Ts(0));
        let ack_b = b.submit(request(1), Ts(0));
        assert_eq!(ack_a, ack_b);

        let events_a = a.poll_responses(Ts(1_000_000), 10);
        let events_b = b.poll_responses(Ts(1_000_000), 10);
        assert_eq!(events_a, events_b);
    }

    #[test]
    fn ack_precedes_fill_in_poll_order() {
        let config = SimVenueConfig {
            reject_probability: 0.0,
            fill_probability: 1.0,
            partial_fill_probability: 0.0,
            ..SimVenueConfig::default()
        };
        let mut venue = SimVenue::new(1, config);
        venue.submit(request(7), Ts(0));
        let events = venue.poll_responses(Ts(10_000_000), 10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].new_state, OrderState::Acknowledged);
        assert_eq!(events[1].new_state, OrderState::Filled);
        assert_eq!(events[1].fill_qty, Qty::new(1_000_000.0));
    }

    #[test]
    fn poll_respects_now_horizon() {
        let config = SimVenueConfig { reject_probability: 0.0, fill_probability: 0.0, ..SimVenueConfig::default() };
        let mut venue = SimVenue::new(1, config);
        venue.submit(request(1), Ts(0));
        assert!(venue.poll_responses(Ts(0), 10).is_empty());
        let events = venue.poll_responses(Ts(config.ack_latency_ns), 10);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn duplicate_order_id_rejected() {
        let config = SimVenueConfig { reject_probability: 0.0, ..SimVenueConfig::default() };
        let mut venue = SimVenue::new(1, config);
        assert!(matches!(venue.submit(request(1), Ts(0)), SubmitResult::Ack { .. }));
        assert_eq!(
            venue.submit(request(1), Ts(1)),
            SubmitResult::Reject { reason: RejectReason::DuplicateOrderId }
        );
    }

    #[test]
    fn halted_venue_rejects_submissions() {
        let mut venue = SimVenue::new(1, SimVenueConfig::default());
        venue.halt();
        assert_eq!(venue.submit(request(1), Ts(0)), SubmitResult::Reject { reason: RejectReason::Disconnected });
        venue.resume();
        assert!(matches!(venue.submit(request(1), Ts(0)), SubmitResult::Ack { .. }));
    }

    #[test]
    fn cancel_unknown_order_is_rejected() {
        let mut venue = SimVenue::new(1, SimVenueConfig::default());
        assert_eq!(venue.cancel(404, Ts(0)), CancelResult::Reject { reason: RejectReason::UnknownOrder });
    }

    #[test]
    fn cancel_known_order_acks_and_removes_it() {
        let config = SimVenueConfig { reject_probability: 0.0, fill_probability: 0.0, ..SimVenueConfig::default() };
        let mut venue = SimVenue::new(1, config);
        venue.submit(request(5), Ts(0));
        assert_eq!(venue.cancel(5, Ts(0)), CancelResult::Ack);
        let events = venue.poll_responses(Ts(1_000_000), 10);
        assert!(events.iter().any(|e| e.new_state == OrderState::Cancelled));
        assert_eq!(venue.cancel(5, Ts(0)), CancelResult::Reject { reason: RejectReason::UnknownOrder });
    }
}
