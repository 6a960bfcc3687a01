//! Engine configuration: a cache-aligned, `Default`-constructible,
//! read-only-after-construction POD struct covering the pluggable `Venue`
//! trait and four-thread layout.

use risk::{Layer1Limits, Layer2Limits};
use strategy::StrategyConfig;

/// Ring capacities. Powers of two per `ring::Spsc`'s const assertion.
/// One set of constants for the whole engine rather than a per-ring knob.
pub const TICK_RING_CAPACITY: usize = 16_384;
pub const TRADE_RING_CAPACITY: usize = 4_096;
pub const VENUE_REQUEST_RING_CAPACITY: usize = 4_096;
pub const VENUE_RESPONSE_RING_CAPACITY: usize = 4_096;
pub const BOOK_UPDATE_RING_CAPACITY: usize = 4_096;
pub const MAX_RESTING_ORDERS_PER_INSTRUMENT: usize = 1_024;
pub const MAX_LIFECYCLE_ORDERS: usize = 8_192;

/// Which CPU core, if any, a thread should be pinned to. `None` leaves
/// the thread unpinned — a platform without `core_affinity` support, or
/// an operator who didn't configure pinning, degrades to this rather
/// than failing startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPinning {
    pub ingress_core: Option<usize>,
    pub engine_core: Option<usize>,
    pub venue_io_core: Option<usize>,
    pub telemetry_core: Option<usize>,
}

/// Engine-wide configuration, read-only once threads are spawned.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub instruments: Vec<common::Instrument>,
    pub layer1_limits: Layer1Limits,
    pub layer2_limits: Layer2Limits,
    pub strategy_config: StrategyConfig,
    pub pinning: ThreadPinning,
    /// How often (in telemetry-thread wakeups) the audit ring and
    /// histograms are drained and logged.
    pub telemetry_period_ms: u64,
    /// Whether Layer 2 (portfolio-level) checks run on every decision, or
    /// only Layer 1's nanosecond-scale per-symbol checks.
    pub run_layer2: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: common::Instrument::ALL.to_vec(),
            layer1_limits: Layer1Limits::default(),
            layer2_limits: Layer2Limits::default(),
            strategy_config: StrategyConfig::default(),
            pinning: ThreadPinning::default(),
            telemetry_period_ms: 1_000,
            run_layer2: true,
        }
    }
}
