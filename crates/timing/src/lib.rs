//! L0 timing primitives: a calibrated cycle counter and a lock-free
//! latency histogram.
//!
//! Everything here is callable from the hot path. [`Timer::cycles`] targets
//! `<= 25ns` overhead per call; [`Histogram::record`] is a single relaxed
//! atomic increment.

pub mod histogram;
pub mod timer;

pub use histogram::{Histogram, HistogramStats};
pub use timer::{Calibration, CalibrationError, Timer};
