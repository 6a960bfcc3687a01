//! Mechanical check, rather than an inspection-only claim, that the
//! engine's per-tick step never requests dynamic memory after
//! initialization: installs `common::test_support::CountingAllocator` as
//! the process's `#[global_allocator]`, warms the Engine thread up against
//! a steady instrument set, then asserts a measurement window sees zero
//! net allocations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::test_support::CountingAllocator;
use common::{Instrument, Px, Qty, Ts};
use engine::engine_thread::{self, EngineThreadContext};
use engine::rings::{BookUpdateRing, TickRing, TradeRing, VenueRequestRing, VenueResponseRing};
use engine::{EngineConfig, ThreadPinning};
use ring::Spsc;
use risk::{Layer1Limits, Layer2Limits};
use timing::{Calibration, Histogram};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator::new();

fn push_a_tick_per_instrument(tick_ring: &TickRing, seq: u64) {
    for (i, &instrument) in Instrument::ALL.iter().enumerate() {
        let jitter = (i as f64) * 0.001;
        tick_ring.try_push(feed::Tick {
            instrument,
            exchange_ts_ns: Ts(seq),
            bid_price: Px::new(99.9 + jitter),
            ask_price: Px::new(100.1 + jitter),
            bid_size: Qty::new(5_000_000.0),
            ask_size: Qty::new(5_000_000.0),
            bid_yield: 0.0,
            ask_yield: 0.0,
        });
    }
}

#[test]
fn steady_state_tick_to_decision_allocates_nothing() {
    Calibration::measure().expect("calibration must succeed in a test environment");

    let config = EngineConfig {
        instruments: Instrument::ALL.to_vec(),
        layer1_limits: Layer1Limits::default(),
        layer2_limits: Layer2Limits::default(),
        strategy_config: strategy::StrategyConfig::default(),
        pinning: ThreadPinning::default(),
        telemetry_period_ms: 60_000,
        run_layer2: true,
    };

    let tick_ring: Arc<TickRing> = Arc::new(Spsc::new());
    let mut ctx = EngineThreadContext::new(
        &config,
        tick_ring.clone(),
        Arc::new(Spsc::new()) as Arc<TradeRing>,
        Arc::new(Spsc::new()) as Arc<VenueRequestRing>,
        Arc::new(Spsc::new()) as Arc<VenueResponseRing>,
        Arc::new(Spsc::new()) as Arc<BookUpdateRing>,
        Arc::new(Histogram::new()),
        Arc::new(Histogram::new()),
        vec![(1, 10)],
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let run_shutdown = shutdown.clone();
    let handle = std::thread::spawn(move || engine_thread::run(&mut ctx, &config, run_shutdown));

    // Warmup: let every instrument get its first tick, its first quote,
    // its first Layer 1 DashMap entry, and the lifecycle/order_owner maps
    // grow to their steady-state working set.
    for seq in 0..2_000u64 {
        push_a_tick_per_instrument(&tick_ring, seq);
    }
    std::thread::sleep(Duration::from_millis(100));

    ALLOC.counts.reset();
    let allocations_before = ALLOC.counts.allocations.load(Ordering::Relaxed);

    for seq in 2_000..4_000u64 {
        push_a_tick_per_instrument(&tick_ring, seq);
    }
    std::thread::sleep(Duration::from_millis(100));

    let allocations_after = ALLOC.counts.allocations.load(Ordering::Relaxed);

    shutdown.store(true, Ordering::Relaxed);
    handle.join().expect("engine thread must not panic");

    assert_eq!(
        allocations_after, allocations_before,
        "tick-to-decision path allocated {} times during the measurement window",
        allocations_after - allocations_before
    );
}
