//! The Telemetry thread: periodically drains the latency histograms and
//! logs a summary. This is the only thread that ever resets a histogram —
//! Engine/Venue I/O only ever call `record`, keeping the reset path off
//! the hot path entirely. A plain structured-log reporter rather than a
//! metrics-exporter integration.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use timing::Histogram;

/// Everything the telemetry thread reads each wakeup. All `Arc`-shared so
/// the producing threads never block on this one.
pub struct TelemetryContext {
    cycle_latency: Arc<Histogram>,
    tick_to_decision_latency: Arc<Histogram>,
    dropped_venue_responses: Arc<AtomicU64>,
    period: Duration,
}

impl TelemetryContext {
    #[must_use]
    pub fn new(
        cycle_latency: Arc<Histogram>,
        tick_to_decision_latency: Arc<Histogram>,
        dropped_venue_responses: Arc<AtomicU64>,
        period_ms: u64,
    ) -> Self {
        Self { cycle_latency, tick_to_decision_latency, dropped_venue_responses, period: Duration::from_millis(period_ms) }
    }

    fn report_once(&self) {
        let cycle = self.cycle_latency.stats();
        let decision = self.tick_to_decision_latency.stats();
        let dropped = self.dropped_venue_responses.load(Ordering::Relaxed);

        tracing::info!(
            cycle_count = cycle.count,
            cycle_p50_ns = cycle.p50_ns,
            cycle_p99_ns = cycle.p99_ns,
            cycle_p999_ns = cycle.p999_ns,
            decision_count = decision.count,
            decision_p50_ns = decision.p50_ns,
            decision_p99_ns = decision.p99_ns,
            decision_p999_ns = decision.p999_ns,
            dropped_venue_responses = dropped,
            "engine telemetry"
        );

        // Folded through hdrhistogram purely for its percentile-formatted
        // export; the atomic histogram above is the source of truth, this
        // is a reporting convenience at debug verbosity.
        if decision.count > 0 {
            let hdr = self.tick_to_decision_latency.to_hdr();
            tracing::debug!(
                hdr_p50_ns = hdr.value_at_percentile(50.0),
                hdr_p99_ns = hdr.value_at_percentile(99.0),
                hdr_p999_ns = hdr.value_at_percentile(99.9),
                "tick-to-decision latency (hdrhistogram export)"
            );
        }

        self.cycle_latency.reset();
        self.tick_to_decision_latency.reset();
    }
}

/// Sleeps in short slices and reports once per `period`, until `shutdown`
/// is set. Sleeping in slices (rather than one long `sleep(period)`) keeps
/// shutdown latency bounded even when `period` is large.
pub fn run(ctx: &TelemetryContext, shutdown: Arc<AtomicBool>) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut elapsed = Duration::ZERO;
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(SLICE.min(ctx.period));
        elapsed += SLICE;
        if elapsed >= ctx.period {
            elapsed = Duration::ZERO;
            ctx.report_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_once_resets_histograms() {
        let cycle = Arc::new(Histogram::new());
        let decision = Arc::new(Histogram::new());
        cycle.record(1_000);
        decision.record(2_000);
        let ctx = TelemetryContext::new(cycle.clone(), decision.clone(), Arc::new(AtomicU64::new(0)), 1_000);
        ctx.report_once();
        assert_eq!(cycle.stats().count, 0);
        assert_eq!(decision.stats().count, 0);
    }
}
