//! Monotonic cycle counter with calibrated nanosecond conversion.

use std::sync::OnceLock;
use std::time::Instant;

use thiserror::Error;

/// Fatal startup error: the cycle counter could not be calibrated against
/// the system clock to within tolerance. Per the engine's error design this
/// is one of the only two conditions that aborts before the hot path is
/// entered (the other is pool initialization failure).
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("cycle counter calibration unstable: samples disagreed by {disagreement_pct:.2}%")]
    Unstable { disagreement_pct: f64 },
}

static NS_PER_CYCLE: OnceLock<f64> = OnceLock::new();

/// Reads the monotonic cycle counter. On x86_64 this is `RDTSC`; on other
/// architectures it falls back to a counter derived from
/// [`std::time::Instant`], matching the `cfg`-gated AVX2/scalar split the
/// rest of the workspace uses for architecture-specific fast paths.
#[inline(always)]
#[must_use]
pub fn cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: `_rdtsc` is available on all x86_64 targets we build for;
        // it has no memory effects and cannot fault.
        unsafe { std::arch::x86_64::_rdtsc() }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        EPOCH.elapsed().as_nanos() as u64
    }
}

#[cfg(not(target_arch = "x86_64"))]
static EPOCH: once_cell_epoch::Lazy = once_cell_epoch::Lazy::new();

#[cfg(not(target_arch = "x86_64"))]
mod once_cell_epoch {
    use std::sync::OnceLock;
    use std::time::Instant;

    pub struct Lazy(OnceLock<Instant>);
    impl Lazy {
        pub const fn new() -> Self {
            Self(OnceLock::new())
        }
        pub fn elapsed(&self) -> std::time::Duration {
            self.0.get_or_init(Instant::now).elapsed()
        }
    }
}

/// One-time calibration of cycles-per-nanosecond against the system clock.
/// Must be called once at process startup before any `cycles_to_ns` call on
/// the hot path relies on an accurate ratio.
pub struct Calibration;

impl Calibration {
    /// Samples the cycle counter against [`Instant`] twice over a short
    /// busy-wait window and caches the resulting ratio. Returns an error if
    /// the two samples disagree beyond tolerance, which indicates a
    /// non-invariant TSC (e.g. frequency scaling without invariant-TSC
    /// support) — the process must not enter the hot path in that case.
    pub fn measure() -> Result<(), CalibrationError> {
        if NS_PER_CYCLE.get().is_some() {
            return Ok(());
        }
        let sample = |window_ns: u64| -> f64 {
            let start_cycles = cycles();
            let start = Instant::now();
            while start.elapsed().as_nanos() < u128::from(window_ns) {
                std::hint::spin_loop();
            }
            let elapsed_ns = start.elapsed().as_nanos() as f64;
            let elapsed_cycles = (cycles() - start_cycles) as f64;
            elapsed_ns / elapsed_cycles.max(1.0)
        };

        let a = sample(2_000_000);
        let b = sample(2_000_000);
        let disagreement_pct = ((a - b).abs() / a.max(b).max(f64::EPSILON)) * 100.0;
        if disagreement_pct > 5.0 {
            return Err(CalibrationError::Unstable { disagreement_pct });
        }
        let _ = NS_PER_CYCLE.set((a + b) / 2.0);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force(ns_per_cycle: f64) {
        let _ = NS_PER_CYCLE.set(ns_per_cycle);
    }
}

/// High-resolution timer built on [`cycles`] and the cached calibration
/// ratio.
pub struct Timer;

impl Timer {
    /// Monotonic cycle counter. Overhead target `<= 25ns` per call.
    #[inline(always)]
    #[must_use]
    pub fn cycles() -> u64 {
        cycles()
    }

    /// Converts a cycle delta to nanoseconds using the calibrated ratio.
    /// Returns `0` if calibration has not yet run (callers on the hot path
    /// must ensure `Calibration::measure()` succeeded at startup).
    #[inline(always)]
    #[must_use]
    pub fn cycles_to_ns(cycles_delta: u64) -> u64 {
        let ratio = NS_PER_CYCLE.get().copied().unwrap_or(0.0);
        (cycles_delta as f64 * ratio) as u64
    }

    /// Convenience: cycles elapsed since `start`, in nanoseconds.
    #[inline(always)]
    #[must_use]
    pub fn elapsed_ns(start_cycles: u64) -> u64 {
        Self::cycles_to_ns(Self::cycles().saturating_sub(start_cycles))
    }
}
