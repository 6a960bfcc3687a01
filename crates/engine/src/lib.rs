//! L4 composition root: wires the four pinned threads (Ingress, Engine,
//! Venue I/O, Telemetry) around the rings defined in [`rings`], and owns
//! their shared shutdown flag. Each thread is a dedicated OS thread with
//! optional best-effort `core_affinity` pinning.

pub mod config;
pub mod engine_thread;
pub mod error;
pub mod ingress;
pub mod rings;
pub mod telemetry;
pub mod venue_io;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use rustc_hash::FxHashMap;

use lifecycle::VenueId;
use timing::{Calibration, Histogram, Timer};
use venue::Venue;

pub use config::{EngineConfig, ThreadPinning};
pub use error::{EngineError, EngineResult};
pub use ingress::FrameSource;
pub use rings::{BookUpdateRing, TickRing, TradeRing, VenueCommand, VenueRequestRing, VenueResponseRing};

use crate::engine_thread::EngineThreadContext;
use crate::ingress::IngressContext;
use crate::telemetry::TelemetryContext;
use crate::venue_io::VenueIoContext;

/// Pins the calling thread to `core`, a no-op (logged once) on platforms or
/// configurations without a usable core list — pinning is an optimization,
/// never a startup requirement.
fn pin_to_core(core: Option<usize>, thread_name: &str) {
    let Some(core) = core else { return };
    let Some(core_ids) = core_affinity::get_core_ids() else {
        tracing::warn!(thread_name, "core_affinity unavailable on this platform, running unpinned");
        return;
    };
    match core_ids.get(core) {
        Some(&id) => {
            if core_affinity::set_for_current(id) {
                tracing::info!(thread_name, core, "pinned thread to core");
            } else {
                tracing::warn!(thread_name, core, "failed to pin thread to core");
            }
        }
        None => tracing::warn!(thread_name, core, available = core_ids.len(), "requested core out of range, running unpinned"),
    }
}

/// Every ring and shared counter the four threads pass events and metrics
/// through. Constructed once by [`Engine::build`] and cloned (as `Arc`s)
/// into each thread's context.
struct SharedRings {
    tick_ring: Arc<TickRing>,
    trade_ring: Arc<TradeRing>,
    venue_request_ring: Arc<VenueRequestRing>,
    venue_response_ring: Arc<VenueResponseRing>,
    book_update_ring: Arc<BookUpdateRing>,
    cycle_latency: Arc<Histogram>,
    tick_to_decision_latency: Arc<Histogram>,
    dropped_venue_responses: Arc<AtomicU64>,
}

impl SharedRings {
    fn new() -> Self {
        Self {
            tick_ring: Arc::new(TickRing::new()),
            trade_ring: Arc::new(TradeRing::new()),
            venue_request_ring: Arc::new(VenueRequestRing::new()),
            venue_response_ring: Arc::new(VenueResponseRing::new()),
            book_update_ring: Arc::new(BookUpdateRing::new()),
            cycle_latency: Arc::new(Histogram::new()),
            tick_to_decision_latency: Arc::new(Histogram::new()),
            dropped_venue_responses: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// A running engine: four joined OS threads plus the shutdown flag that
/// stops them. Dropping this without calling [`Engine::shutdown`] leaves
/// the threads running — callers that want a clean stop must call it
/// explicitly rather than relying on a `Drop` impl to reach across thread
/// boundaries.
pub struct Engine {
    shutdown: Arc<AtomicBool>,
    ingress: JoinHandle<()>,
    engine: JoinHandle<()>,
    venue_io: JoinHandle<()>,
    telemetry: JoinHandle<()>,
    cycle_latency: Arc<Histogram>,
    tick_to_decision_latency: Arc<Histogram>,
}

impl Engine {
    /// Calibrates the cycle counter, spawns the four threads, and returns
    /// once every thread is running. The only two ways this can fail are
    /// calibration instability and OS thread-spawn failure; everything
    /// past this point runs without a fallible path.
    pub fn build(
        config: EngineConfig,
        source: Box<dyn FrameSource>,
        venues: FxHashMap<VenueId, Box<dyn Venue>>,
        venue_priorities: Vec<(VenueId, u8)>,
    ) -> EngineResult<Self> {
        Calibration::measure()?;

        let rings = SharedRings::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut engine_ctx = EngineThreadContext::new(
            &config,
            rings.tick_ring.clone(),
            rings.trade_ring.clone(),
            rings.venue_request_ring.clone(),
            rings.venue_response_ring.clone(),
            rings.book_update_ring.clone(),
            rings.cycle_latency.clone(),
            rings.tick_to_decision_latency.clone(),
            venue_priorities,
        );
        let mut ingress_ctx = IngressContext::new(source, rings.tick_ring.clone(), rings.trade_ring.clone());
        let mut venue_io_ctx = VenueIoContext::new(
            venues,
            rings.venue_request_ring.clone(),
            rings.venue_response_ring.clone(),
            rings.dropped_venue_responses.clone(),
        );
        let telemetry_ctx = TelemetryContext::new(
            rings.cycle_latency.clone(),
            rings.tick_to_decision_latency.clone(),
            rings.dropped_venue_responses.clone(),
            config.telemetry_period_ms,
        );

        let pinning = config.pinning;

        let ingress_shutdown = shutdown.clone();
        let ingress = std::thread::Builder::new()
            .name("engine-ingress".to_string())
            .spawn(move || {
                pin_to_core(pinning.ingress_core, "engine-ingress");
                ingress::run(&mut ingress_ctx, ingress_shutdown);
            })
            .map_err(EngineError::Spawn)?;

        let engine_shutdown = shutdown.clone();
        let engine_config = config.clone();
        let engine = std::thread::Builder::new()
            .name("engine-core".to_string())
            .spawn(move || {
                pin_to_core(pinning.engine_core, "engine-core");
                engine_thread::run(&mut engine_ctx, &engine_config, engine_shutdown);
            })
            .map_err(EngineError::Spawn)?;

        let venue_io_shutdown = shutdown.clone();
        let venue_io = std::thread::Builder::new()
            .name("engine-venue-io".to_string())
            .spawn(move || {
                pin_to_core(pinning.venue_io_core, "engine-venue-io");
                venue_io::run(&mut venue_io_ctx, venue_io_shutdown);
            })
            .map_err(EngineError::Spawn)?;

        let telemetry_shutdown = shutdown.clone();
        let telemetry = std::thread::Builder::new()
            .name("engine-telemetry".to_string())
            .spawn(move || {
                pin_to_core(pinning.telemetry_core, "engine-telemetry");
                telemetry::run(&telemetry_ctx, telemetry_shutdown);
            })
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            shutdown,
            ingress,
            engine,
            venue_io,
            telemetry,
            cycle_latency: rings.cycle_latency,
            tick_to_decision_latency: rings.tick_to_decision_latency,
        })
    }

    /// Cycle-latency histogram, read-only: telemetry for the engine
    /// thread's full `run_cycle`, useful for an embedding process that
    /// wants to assert on latency in its own tests without waiting for a
    /// telemetry log line.
    #[must_use]
    pub fn cycle_latency(&self) -> &Histogram {
        &self.cycle_latency
    }

    #[must_use]
    pub fn tick_to_decision_latency(&self) -> &Histogram {
        &self.tick_to_decision_latency
    }

    /// Signals every thread to stop after its current cycle and blocks
    /// until all four have joined.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.ingress.join();
        let _ = self.engine.join();
        let _ = self.venue_io.join();
        let _ = self.telemetry.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Instrument;
    use venue::{SimVenue, SimVenueConfig};

    struct NoFrames;
    impl FrameSource for NoFrames {
        fn poll(&mut self, _buf: &mut [u8]) -> usize {
            0
        }
    }

    #[test]
    fn build_then_immediate_shutdown_joins_cleanly() {
        let mut config = EngineConfig::default();
        config.instruments = vec![Instrument::Note10Y];
        config.telemetry_period_ms = 50;

        let mut venues: FxHashMap<VenueId, Box<dyn Venue>> = FxHashMap::default();
        venues.insert(1, Box::new(SimVenue::new(1, SimVenueConfig::default())));

        let engine = Engine::build(config, Box::new(NoFrames), venues, vec![(1, 5)]).expect("engine builds");
        std::thread::sleep(std::time::Duration::from_millis(20));
        engine.shutdown();
    }
}
