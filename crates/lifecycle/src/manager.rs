//! The order lifecycle manager: arena allocation, state transitions, fill
//! application, and emergency stop, wired together.

use std::sync::Arc;

use common::{Instrument, Px, Qty, Side, Ts};
use risk::EmergencyHalt;

use crate::audit::{AuditEntry, AuditRing};
use crate::error::{LifecycleError, LifecycleResult};
use crate::order::{OrderKind, OrderRecord, TimeInForce};
use crate::routing::{VenueId, VenueRegistry};
use crate::state::OrderState;

enum Slot {
    Empty,
    Occupied(OrderRecord),
    /// A released slot. Kept distinct from `Empty` so a lookup that probes
    /// past it (because some other order's home slot collided here)
    /// keeps probing instead of wrongly concluding "not found" — the
    /// standard open-addressing deletion problem.
    Tombstone,
}

/// Order slot table + venue routing + audit trail + the shared emergency
/// halt flag. Order slot allocation is `order_id mod MAX_ORDERS`
/// with linear probing on collision, as specified, rather than this
/// workspace's free-list pools (`pool::LocalPool`/`ObjectPool`): those
/// assign the next free slot off a stack, which does not give the direct
/// `order_id -> slot` mapping a cancel/fill lookup needs.
pub struct OrderLifecycleManager {
    slots: Vec<Slot>,
    venues: VenueRegistry,
    halt: Arc<EmergencyHalt>,
    audit: AuditRing,
}

impl OrderLifecycleManager {
    #[must_use]
    pub fn new(max_orders: usize, halt: Arc<EmergencyHalt>) -> Self {
        assert!(max_orders > 0, "max_orders must be non-zero");
        let mut slots = Vec::with_capacity(max_orders);
        slots.resize_with(max_orders, || Slot::Empty);
        Self {
            slots,
            venues: VenueRegistry::new(),
            halt,
            audit: AuditRing::new(),
        }
    }

    #[must_use]
    pub fn venues(&self) -> &VenueRegistry {
        &self.venues
    }

    pub fn venues_mut(&mut self) -> &mut VenueRegistry {
        &mut self.venues
    }

    #[must_use]
    pub fn audit(&self) -> &AuditRing {
        &self.audit
    }

    #[must_use]
    pub fn emergency_halt(&self) -> &Arc<EmergencyHalt> {
        &self.halt
    }

    fn home(&self, order_id: u64) -> usize {
        (order_id as usize) % self.slots.len()
    }

    /// Returns the slot index currently holding `order_id`, or `None` if no
    /// probe chain from its home slot reaches an occupied match before
    /// hitting a genuinely empty slot.
    fn find(&self, order_id: u64) -> Option<usize> {
        let n = self.slots.len();
        let start = self.home(order_id);
        for offset in 0..n {
            let idx = (start + offset) % n;
            match &self.slots[idx] {
                Slot::Occupied(rec) if rec.order_id == order_id => return Some(idx),
                Slot::Occupied(_) | Slot::Tombstone => continue,
                Slot::Empty => return None,
            }
        }
        None
    }

    /// Finds a slot for a new `order_id`, rejecting it as a duplicate if
    /// already present, and allocates into the first tombstone or empty
    /// slot encountered along the probe chain (preferring a tombstone so
    /// chains don't grow unnecessarily).
    fn allocate(&mut self, order_id: u64) -> LifecycleResult<usize> {
        let n = self.slots.len();
        let start = self.home(order_id);
        let mut candidate: Option<usize> = None;
        for offset in 0..n {
            let idx = (start + offset) % n;
            match &self.slots[idx] {
                Slot::Occupied(rec) if rec.order_id == order_id => return Err(LifecycleError::Duplicate(order_id)),
                Slot::Occupied(_) => {}
                Slot::Tombstone => {
                    if candidate.is_none() {
                        candidate = Some(idx);
                    }
                }
                Slot::Empty => return Ok(candidate.unwrap_or(idx)),
            }
        }
        candidate.ok_or(LifecycleError::ArenaExhausted)
    }

    pub fn create_order(
        &mut self,
        order_id: u64,
        instrument: Instrument,
        side: Side,
        kind: OrderKind,
        price: Px,
        qty: Qty,
        tif: TimeInForce,
        expires_at: Option<Ts>,
        ts: Ts,
    ) -> LifecycleResult<usize> {
        if self.halt.is_set() {
            return Err(LifecycleError::EmergencyStop);
        }
        let idx = self.allocate(order_id)?;
        let record = OrderRecord::new(order_id, instrument, side, kind, price, qty, tif, expires_at, ts);
        self.audit.record(AuditEntry::new(
                order_id,
                OrderState::Created,
                OrderState::Created,
                ts,
                "created",
                price,
                qty,
        ));
        self.slots[idx] = Slot::Occupied(record);
        Ok(idx)
    }

    #[must_use]
    pub fn get(&self, order_id: u64) -> Option<&OrderRecord> {
        self.find(order_id).map(|idx| match &self.slots[idx] {
                Slot::Occupied(rec) => rec,
                _ => unreachable!("find only returns occupied indices"),
        })
    }

    fn record_mut(&mut self, order_id: u64) -> LifecycleResult<(usize, &mut OrderRecord)> {
        let idx = self.find(order_id).ok_or(LifecycleError::NotFound(order_id))?;
        match &mut self.slots[idx] {
            Slot::Occupied(rec) => Ok((idx, rec)),
            _ => unreachable!("find only returns occupied indices"),
        }
    }

    /// Applies `to` to the order, recording an audit entry either way. An
    /// illegal transition is itself recorded as a transition into `Error`
    /// and returned as an error; the slot is released in both the
    /// legal-terminal and the forced-`Error` case, since `Error` is
    /// terminal too.
    pub fn transition(&mut self, order_id: u64, to: OrderState, reason: &str, ts: Ts) -> LifecycleResult<()> {
        let idx = self.find(order_id).ok_or(LifecycleError::NotFound(order_id))?;

        let (from, legal, price, qty) = {
            let rec = match &mut self.slots[idx] {
                Slot::Occupied(rec) => rec,
                Slot::Empty | Slot::Tombstone => unreachable!("find only returns occupied indices"),
            };
            let from = rec.state;
            let legal = from.is_allowed(to);
            rec.state = if legal { to } else { OrderState::Error };
            rec.updated_ts = ts;
            (from, legal, rec.price, rec.remaining_qty)
        };

        let effective_to = if legal { to } else { OrderState::Error };
        self.audit.record(AuditEntry::new(order_id, from, effective_to, ts, reason, price, qty));
        if effective_to.is_terminal() {
            self.slots[idx] = Slot::Tombstone;
        }

        if legal {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition { from, to })
        }
    }

    /// Applies a fill report. Idempotent on a repeated `execution_id`:
    /// the second application is a no-op that returns `Ok(())` leaving
    /// state untouched, rather than double-counting the fill.
    pub fn apply_fill(&mut self, order_id: u64, execution_id: u64, fill_qty: Qty, ts: Ts) -> LifecycleResult<()> {
        let (_, rec) = self.record_mut(order_id)?;
        if rec.seen_executions.contains(&execution_id) {
            return Ok(());
        }
        rec.seen_executions.insert(execution_id);
        rec.filled_qty = rec.filled_qty + fill_qty;
        rec.remaining_qty = if rec.remaining_qty.ticks() > fill_qty.ticks() {
            rec.remaining_qty - fill_qty
        } else {
            Qty::ZERO
        };
        let next_state = if rec.remaining_qty.is_zero() {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        self.transition(order_id, next_state, "fill", ts)
    }

    /// Rejects all new orders and transitions every non-terminal active
    /// order to `Cancelled`. Idempotent: calling it again while already
    /// halted is a no-op beyond re-scanning.
    pub fn emergency_stop(&mut self, ts: Ts) {
        self.halt.trigger();
        let order_ids: Vec<u64> = self
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Occupied(rec) if !rec.state.is_terminal() => Some(rec.order_id),
                _ => None,
            })
            .collect();
        for order_id in order_ids {
            let _ = self.transition(order_id, OrderState::Cancelled, "Emergency stop", ts);
        }
    }

    /// Sweeps every live order for a past-horizon expiry, called on each
    /// tick boundary or timer pulse, returning the ids expired.
    pub fn expire_due_orders(&mut self, now: Ts) -> Vec<u64> {
        let due: Vec<u64> = self
            .slots
            .iter()
            .filter_map(|s| match s {
                Slot::Occupied(rec) if rec.should_expire(now) => Some(rec.order_id),
                _ => None,
            })
            .collect();
        for &order_id in &due {
            let _ = self.transition(order_id, OrderState::Expired, "tif expired", now);
        }
        due
    }

    /// this `route(order) -> VenueId`: delegates to the venue registry
    /// and, on success, transitions the order `Validated -> Routed`.
    pub fn route(&mut self, order_id: u64, ts: Ts) -> LifecycleResult<VenueId> {
        let venue_id = self.venues.route().ok_or(LifecycleError::NotFound(order_id))?;
        self.transition(order_id, OrderState::Routed, "routed", ts)?;
        if let Ok((_, rec)) = self.record_mut(order_id) {
            rec.venue = Some(venue_id);
        }
        Ok(venue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> OrderLifecycleManager {
        let mut mgr = OrderLifecycleManager::new(64, Arc::new(EmergencyHalt::new()));
        mgr.venues.register(crate::routing::VenueProfile::new(1, 5));
        mgr
    }

    fn create(mgr: &mut OrderLifecycleManager, order_id: u64) {
        mgr.create_order(
            order_id,
            Instrument::Note10Y,
            Side::Bid,
            OrderKind::Limit,
            Px::new(100.0),
            Qty::new(5_000_000.0),
            TimeInForce::Day,
            None,
            Ts(0),
        )
            .unwrap();
    }

    #[test]
    fn creates_and_finds_an_order() {
        let mut mgr = manager();
        create(&mut mgr, 42);
        assert_eq!(mgr.get(42).unwrap().state, OrderState::Created);
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let mut mgr = manager();
        create(&mut mgr, 42);
        let err = mgr
            .create_order(42, Instrument::Note10Y, Side::Bid, OrderKind::Limit, Px::new(100.0), Qty::new(1.0), TimeInForce::Day, None, Ts(0))
            .unwrap_err();
        assert_eq!(err, LifecycleError::Duplicate(42));
    }

    #[test]
    fn illegal_transition_records_error_and_releases_slot() {
        let mut mgr = manager();
        create(&mut mgr, 42);
        let err = mgr.transition(42, OrderState::Filled, "skip", Ts(1)).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: OrderState::Created,
                to: OrderState::Filled
            }
        );
        assert!(mgr.get(42).is_none());
    }

    /// Applying the same execution_id twice produces the same state as
    /// applying it once.
    #[test]
    fn duplicate_execution_id_is_idempotent() {
        let mut mgr = manager();
        create(&mut mgr, 42);
        mgr.transition(42, OrderState::Validated, "validated", Ts(1)).unwrap();
        mgr.transition(42, OrderState::Routed, "routed", Ts(2)).unwrap();
        mgr.transition(42, OrderState::PendingNew, "pending", Ts(3)).unwrap();
        mgr.transition(42, OrderState::Acknowledged, "ack", Ts(4)).unwrap();

        mgr.apply_fill(42, 100, Qty::new(2_000_000.0), Ts(5)).unwrap();
        let after_first = mgr.get(42).unwrap().remaining_qty;
        mgr.apply_fill(42, 100, Qty::new(2_000_000.0), Ts(6)).unwrap();
        let after_second = mgr.get(42).unwrap().remaining_qty;
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn full_fill_transitions_to_filled_and_releases_slot() {
        let mut mgr = manager();
        create(&mut mgr, 42);
        mgr.transition(42, OrderState::Validated, "v", Ts(1)).unwrap();
        mgr.transition(42, OrderState::Routed, "r", Ts(2)).unwrap();
        mgr.transition(42, OrderState::PendingNew, "p", Ts(3)).unwrap();
        mgr.transition(42, OrderState::Acknowledged, "a", Ts(4)).unwrap();
        mgr.apply_fill(42, 1, Qty::new(5_000_000.0), Ts(5)).unwrap();
        assert!(mgr.get(42).is_none());
    }

    #[test]
    fn emergency_stop_cancels_every_active_order() {
        let mut mgr = manager();
        create(&mut mgr, 1);
        create(&mut mgr, 2);
        mgr.emergency_stop(Ts(10));
        assert!(mgr.emergency_halt().is_set());
        assert!(mgr.get(1).is_none());
        assert!(mgr.get(2).is_none());
    }

    #[test]
    fn halted_manager_rejects_new_orders() {
        let mut mgr = manager();
        mgr.emergency_stop(Ts(0));
        let err = mgr
            .create_order(9, Instrument::Bill3M, Side::Bid, OrderKind::Limit, Px::new(100.0), Qty::new(1.0), TimeInForce::Day, None, Ts(1))
            .unwrap_err();
        assert_eq!(err, LifecycleError::EmergencyStop);
    }

    #[test]
    fn tombstones_keep_later_probe_chains_intact() {
        // Craft two order ids mapping to the same home slot in a
        // small table, release the first, and confirm the second is
        // still reachable afterward.
        let mut mgr = OrderLifecycleManager::new(4, Arc::new(EmergencyHalt::new()));
        create(&mut mgr, 1);
        create(&mut mgr, 5); // home slot collides with order 1 (1 % 4 == 5 % 4)
        mgr.transition(1, OrderState::Rejected, "reject", Ts(1)).unwrap();
        assert!(mgr.get(1).is_none());
        assert!(mgr.get(5).is_some());
    }

    #[test]
    fn expire_due_orders_transitions_past_horizon_day_orders() {
        let mut mgr = manager();
        mgr.create_order(
            7,
            Instrument::Bill3M,
            Side::Bid,
            OrderKind::Limit,
            Px::new(100.0),
            Qty::new(1_000_000.0),
            TimeInForce::Day,
            Some(Ts(100)),
            Ts(0),
        )
            .unwrap();
        assert!(mgr.expire_due_orders(Ts(50)).is_empty());
        let expired = mgr.expire_due_orders(Ts(150));
        assert_eq!(expired, vec![7]);
        assert!(mgr.get(7).is_none());
    }
}
