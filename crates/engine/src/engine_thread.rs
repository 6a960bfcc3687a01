//! The Engine thread: the single-threaded owner of book state, strategy
//! evaluation, and order lifecycle/risk state. Only the Engine thread
//! mutates book state — this module is the one place in the workspace
//! where that invariant is enforced by construction rather than by
//! convention, since `OrderLifecycleManager`, `Coordinator`, and every
//! per-instrument `OrderBook` here are owned outright, not behind an `Arc`.
//! Drives one paper-trading-style run loop over the per-instrument book,
//! two-layer risk, and lifecycle pipeline each cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

use book::OrderBook;
use common::{Instrument, Px, Qty, Side, Ts};
use lifecycle::{OrderKind, OrderLifecycleManager, OrderState, TimeInForce, VenueId, VenueProfile};
use risk::{EmergencyHalt, Layer1Limits, Layer2Limits, RiskGate};
use strategy::{Action, Coordinator, MarketMaker, StrategyInput, TradingDecision};
use timing::{Histogram, Timer};

use crate::config::{EngineConfig, MAX_LIFECYCLE_ORDERS, MAX_RESTING_ORDERS_PER_INSTRUMENT};
use crate::rings::{BookUpdateRing, TickRing, TradeRing, VenueCommand, VenueRequestRing, VenueResponseRing};

/// Which resting order, if any, currently represents the firm's own quote
/// on each side of one instrument's book.
#[derive(Debug, Clone, Copy, Default)]
struct RestingQuote {
    bid_order_id: Option<u64>,
    ask_order_id: Option<u64>,
}

/// Per-instrument Engine-thread state. `book` mirrors only the firm's own
/// resting orders — this engine consumes L1 top-of-book ticks, not a
/// venue's full depth feed, so there is no market-wide ladder to maintain,
/// only bookkeeping for the firm's own two-sided quote.
struct InstrumentState {
    book: OrderBook<MAX_RESTING_ORDERS_PER_INSTRUMENT>,
    resting: RestingQuote,
    last_tick: Option<StrategyInput>,
}

impl InstrumentState {
    fn new(instrument: Instrument) -> Self {
        Self {
            book: OrderBook::new(instrument),
            resting: RestingQuote::default(),
            last_tick: None,
        }
    }
}

/// Which instrument/side an outstanding order id belongs to, so a venue
/// response (which carries only `order_id`) can be routed back to the
/// right `InstrumentState` and the right strategy's `on_fill`.
#[derive(Debug, Clone, Copy)]
struct OrderOwner {
    instrument: Instrument,
    side: Side,
}

/// `venue::VenueResponse` carries one fill event at a time and no
/// execution id of its own — `lifecycle::apply_fill`'s idempotent-fill
/// handling needs one, so the Engine thread mints a private monotonic id
/// per fill it applies.
#[derive(Default)]
struct ExecutionIdAllocator(u64);

impl ExecutionIdAllocator {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Everything the Engine thread owns exclusively. Constructed once at
/// spawn time and then driven by [`run`] for the lifetime of the process.
pub struct EngineThreadContext {
    tick_ring: Arc<TickRing>,
    trade_ring: Arc<TradeRing>,
    venue_request_ring: Arc<VenueRequestRing>,
    venue_response_ring: Arc<VenueResponseRing>,
    book_update_ring: Arc<BookUpdateRing>,

    risk: RiskGate,
    lifecycle: OrderLifecycleManager,
    coordinator: Coordinator,

    instruments: FxHashMap<Instrument, InstrumentState>,
    order_owner: FxHashMap<u64, OrderOwner>,
    next_order_id: u64,
    exec_ids: ExecutionIdAllocator,

    cycle_latency: Arc<Histogram>,
    tick_to_decision_latency: Arc<Histogram>,

    run_layer2: bool,
    cycles_since_expiry_sweep: u64,

    /// Reused every cycle so collecting this cycle's fresh ticks never
    /// allocates once warm: the per-tick step must never request dynamic
    /// memory after initialization.
    scratch_inputs: FxHashMap<Instrument, StrategyInput>,
    scratch_decisions: Vec<TradingDecision>,
}

/// How many Engine cycles elapse between `expire_due_orders` sweeps — once
/// per roughly a few hundred microseconds at hot-path cadence is plenty for
/// a day-order horizon measured in seconds.
const EXPIRY_SWEEP_EVERY_N_CYCLES: u64 = 4_096;

/// Venue responses drained per cycle, bounding one cycle's worst case.
const VENUE_RESPONSE_BATCH: usize = 256;

impl EngineThreadContext {
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        tick_ring: Arc<TickRing>,
        trade_ring: Arc<TradeRing>,
        venue_request_ring: Arc<VenueRequestRing>,
        venue_response_ring: Arc<VenueResponseRing>,
        book_update_ring: Arc<BookUpdateRing>,
        cycle_latency: Arc<Histogram>,
        tick_to_decision_latency: Arc<Histogram>,
        venues: Vec<(VenueId, u8)>,
    ) -> Self {
        let halt = Arc::new(EmergencyHalt::new());
        let risk = RiskGate::new(config.layer1_limits, config.layer2_limits, halt.clone());
        let mut lifecycle = OrderLifecycleManager::new(MAX_LIFECYCLE_ORDERS, halt);
        for (venue_id, priority) in venues {
            lifecycle.venues_mut().register(VenueProfile::new(venue_id, priority));
        }

        let mut coordinator = Coordinator::new();
        let mut instruments = FxHashMap::default();
        for (rank, &instrument) in config.instruments.iter().enumerate() {
            let priority = u8::try_from(config.instruments.len() - rank).unwrap_or(1);
            coordinator.register(Box::new(MarketMaker::new(instrument, config.strategy_config)), priority);
            instruments.insert(instrument, InstrumentState::new(instrument));
        }

        Self {
            tick_ring,
            trade_ring,
            venue_request_ring,
            venue_response_ring,
            book_update_ring,
            risk,
            lifecycle,
            coordinator,
            instruments,
            order_owner: FxHashMap::default(),
            next_order_id: 1,
            exec_ids: ExecutionIdAllocator::default(),
            cycle_latency,
            tick_to_decision_latency,
            run_layer2: config.run_layer2,
            cycles_since_expiry_sweep: 0,
            scratch_inputs: FxHashMap::with_capacity_and_hasher(config.instruments.len(), Default::default()),
            scratch_decisions: Vec::with_capacity(config.instruments.len()),
        }
    }

    fn drain_ticks(&mut self) {
        while let Some(tick) = self.tick_ring.try_pop() {
            let Some(state) = self.instruments.get_mut(&tick.instrument) else {
                continue;
            };
            state.last_tick = Some(StrategyInput {
                bid_price: tick.bid_price,
                ask_price: tick.ask_price,
                bid_size: tick.bid_size,
                ask_size: tick.ask_size,
                ts: tick.exchange_ts_ns,
            });
        }
    }

    /// Trades aren't consumed by the quoting strategy directly (`StrategyInput`
    /// is a two-sided tick, not a trade tape); the Engine
    /// thread's only obligation toward them is to drain the ring so it
    /// never backs up, counting them for the telemetry thread.
    fn drain_trades(&mut self) -> u64 {
        let mut count = 0u64;
        while self.trade_ring.try_pop().is_some() {
            count += 1;
        }
        count
    }

    fn cancel_resting(&mut self, instrument: Instrument, ts: Ts) {
        let Some(state) = self.instruments.get_mut(&instrument) else { return };
        for order_id in [state.resting.bid_order_id.take(), state.resting.ask_order_id.take()].into_iter().flatten() {
            let venue_id = self.lifecycle.get(order_id).and_then(|rec| rec.venue);
            if let Some(venue_id) = venue_id {
                let _ = self.venue_request_ring.try_push(VenueCommand::Cancel { venue_id, order_id });
            }
            let _ = self.lifecycle.transition(order_id, OrderState::PendingCancel, "cancel requested", ts);
        }
    }

    /// Places a fresh two-sided quote, replacing whatever was resting
    /// before (requote-by-cancel-then-add rather than waiting for the old
    /// cancel to ack, trading a brief double-resting window for simplicity
    /// at requote cadence).
    fn update_quotes(&mut self, decision: &TradingDecision, ts: Ts) {
        self.cancel_resting(decision.instrument, ts);
        self.place_leg(decision.instrument, Side::Bid, decision.bid_price, decision.bid_size, ts);
        self.place_leg(decision.instrument, Side::Ask, decision.ask_price, decision.ask_size, ts);
    }

    fn place_leg(&mut self, instrument: Instrument, side: Side, price: Px, qty: Qty, ts: Ts) {
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        if self
            .lifecycle
            .create_order(order_id, instrument, side, OrderKind::Limit, price, qty, TimeInForce::Day, None, ts)
            .is_err()
        {
            return;
        }
        if self.lifecycle.transition(order_id, OrderState::Validated, "strategy quote", ts).is_err() {
            return;
        }
        let Ok(venue_id) = self.lifecycle.route(order_id, ts) else {
            let _ = self.lifecycle.transition(order_id, OrderState::Rejected, "no venue available", ts);
            return;
        };
        if self.lifecycle.transition(order_id, OrderState::PendingNew, "submitting", ts).is_err() {
            return;
        }
        self.risk.layer1.record_order_sent(instrument, ts);

        let request = venue::OrderRequest { order_id, instrument, side, kind: OrderKind::Limit, price, qty };
        if !self.venue_request_ring.try_push(VenueCommand::Submit { venue_id, request }) {
            let _ = self.lifecycle.transition(order_id, OrderState::Rejected, "venue request ring full", ts);
            return;
        }

        if let Some(state) = self.instruments.get_mut(&instrument) {
            let _ = state.book.add(order_id, side, price, qty, ts, &self.book_update_ring);
            match side {
                Side::Bid => state.resting.bid_order_id = Some(order_id),
                Side::Ask => state.resting.ask_order_id = Some(order_id),
            }
        }
        self.order_owner.insert(order_id, OrderOwner { instrument, side });
    }

    fn clear_resting_slot(&mut self, owner: OrderOwner, order_id: u64) {
        if let Some(state) = self.instruments.get_mut(&owner.instrument) {
            if state.resting.bid_order_id == Some(order_id) {
                state.resting.bid_order_id = None;
            }
            if state.resting.ask_order_id == Some(order_id) {
                state.resting.ask_order_id = None;
            }
        }
    }

    fn apply_decision(&mut self, decision: &TradingDecision, ts: Ts) {
        match decision.action {
            Action::NoAction => {}
            Action::CancelQuotes => self.cancel_resting(decision.instrument, ts),
            Action::UpdateQuotes => self.update_quotes(decision, ts),
        }
    }

    fn handle_venue_response(&mut self, response: venue::VenueResponse) {
        let Some(owner) = self.order_owner.get(&response.order_id).copied() else {
            tracing::debug!(order_id = response.order_id, "venue response for unknown order id");
            return;
        };

        match response.new_state {
            OrderState::Acknowledged => {
                let _ = self.lifecycle.transition(response.order_id, OrderState::Acknowledged, response.reason.as_str(), response.ts);
                self.lifecycle.venues_mut().record_activity(response.venue_id, response.latency_ns as f64, true, response.ts);
            }
            OrderState::PartiallyFilled | OrderState::Filled => {
                let execution_id = self.exec_ids.next();
                let _ = self.lifecycle.apply_fill(response.order_id, execution_id, response.fill_qty, response.ts);
                self.lifecycle.venues_mut().record_activity(response.venue_id, response.latency_ns as f64, true, response.ts);

                if let Some(state) = self.instruments.get_mut(&owner.instrument) {
                    if response.new_state == OrderState::Filled {
                        let _ = state.book.cancel(response.order_id, response.ts, &self.book_update_ring);
                    } else if let Some(rec) = self.lifecycle.get(response.order_id) {
                        let _ = state.book.modify(response.order_id, rec.price, rec.remaining_qty, response.ts, &self.book_update_ring);
                    }
                }

                self.risk.layer1.apply_fill(owner.instrument, owner.side, response.fill_qty, 0);
                if self.run_layer2 {
                    let face_millions = (response.fill_qty.as_f64() / 1_000_000.0).round() as i64;
                    let signed = match owner.side {
                        Side::Bid => face_millions,
                        Side::Ask => -face_millions,
                    };
                    self.risk.layer2.update_dv01(owner.instrument, signed);
                }
                self.coordinator.on_fill(owner.instrument, owner.side, response.fill_qty, response.fill_price);

                if response.new_state == OrderState::Filled {
                    self.clear_resting_slot(owner, response.order_id);
                    self.order_owner.remove(&response.order_id);
                }
            }
            OrderState::Cancelled => {
                let _ = self.lifecycle.transition(response.order_id, OrderState::Cancelled, response.reason.as_str(), response.ts);
                if let Some(state) = self.instruments.get_mut(&owner.instrument) {
                    let _ = state.book.cancel(response.order_id, response.ts, &self.book_update_ring);
                }
                self.clear_resting_slot(owner, response.order_id);
                self.order_owner.remove(&response.order_id);
            }
            OrderState::Rejected | OrderState::Expired => {
                let _ = self.lifecycle.transition(response.order_id, response.new_state, response.reason.as_str(), response.ts);
                self.lifecycle.venues_mut().record_error(response.venue_id);
                if let Some(state) = self.instruments.get_mut(&owner.instrument) {
                    let _ = state.book.cancel(response.order_id, response.ts, &self.book_update_ring);
                }
                self.clear_resting_slot(owner, response.order_id);
                self.order_owner.remove(&response.order_id);
            }
            other => {
                tracing::warn!(order_id = response.order_id, ?other, "unexpected venue response state");
            }
        }
    }

    /// Runs one Engine cycle: drain market data, run every strategy,
    /// apply its decision, drain venue responses, and periodically sweep
    /// expired orders. Returns the number of ticks consumed, so the caller
    /// can back off when there was nothing to do.
    fn run_cycle(&mut self) -> usize {
        let cycle_start = Timer::cycles();

        self.drain_ticks();
        let trades = self.drain_trades();
        let _ = trades;

        self.scratch_inputs.clear();
        for (&instrument, state) in &self.instruments {
            if let Some(input) = state.last_tick {
                self.scratch_inputs.insert(instrument, input);
            }
        }
        let ticks_consumed = self.scratch_inputs.len();

        if !self.scratch_inputs.is_empty() {
            let decision_start = Timer::cycles();
            self.coordinator.step_all(&self.scratch_inputs, &self.risk, &mut self.scratch_decisions);
            for i in 0..self.scratch_decisions.len() {
                let decision = self.scratch_decisions[i];
                let ts = decision.decision_ts_ns;
                self.apply_decision(&decision, ts);
                if self.risk.emergency_halt().is_set() {
                    self.lifecycle.emergency_stop(ts);
                }
            }
            self.tick_to_decision_latency.record(Timer::elapsed_ns(decision_start));
        }

        let mut responses_handled = 0;
        while responses_handled < VENUE_RESPONSE_BATCH {
            let Some(response) = self.venue_response_ring.try_pop() else { break };
            self.handle_venue_response(response);
            responses_handled += 1;
        }

        self.cycles_since_expiry_sweep += 1;
        if self.cycles_since_expiry_sweep >= EXPIRY_SWEEP_EVERY_N_CYCLES {
            self.cycles_since_expiry_sweep = 0;
            let now = Ts::now();
            let expired = self.lifecycle.expire_due_orders(now);
            for order_id in expired {
                if let Some(owner) = self.order_owner.get(&order_id).copied() {
                    self.clear_resting_slot(owner, order_id);
                    self.order_owner.remove(&order_id);
                }
            }
        }

        self.cycle_latency.record(Timer::elapsed_ns(cycle_start));
        ticks_consumed
    }

    #[must_use]
    pub fn risk(&self) -> &RiskGate {
        &self.risk
    }

    #[must_use]
    pub fn lifecycle(&self) -> &OrderLifecycleManager {
        &self.lifecycle
    }
}

/// Drives [`EngineThreadContext::run_cycle`] until `shutdown` is set,
/// yielding the OS thread when a cycle did no work rather than spinning —
/// this is the one concession to sharing a core with other processes;
/// the quoting decision latency it measures is unaffected since the
/// histogram only records cycles that actually ran a strategy step.
pub fn run(ctx: &mut EngineThreadContext, _config: &EngineConfig, shutdown: Arc<AtomicBool>) {
    let mut idle_cycles = 0u32;
    while !shutdown.load(Ordering::Relaxed) {
        let work_done = ctx.run_cycle();
        if work_done == 0 {
            idle_cycles += 1;
            if idle_cycles > 64 {
                std::thread::yield_now();
            }
        } else {
            idle_cycles = 0;
        }
    }
    tracing::info!(audit_entries = ctx.lifecycle.audit().len(), "engine thread shutting down");
}
