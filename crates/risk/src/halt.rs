//! The single process-wide emergency-halt flag: process-wide mutable state
//! is limited to this atomic and the timer calibration constant. One
//! instance is constructed by the engine and shared (via
//! `Arc`) with [`crate::gate::RiskGate`] and `lifecycle`'s order manager so
//! both see the same flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Acquire/release ordering here (not relaxed): the halt flag is the
/// one cross-thread signal on the hot path that must establish a strict
/// happens-before edge between the thread that trips it and every thread
/// that checks it on the next order.
#[derive(Debug, Default)]
pub struct EmergencyHalt(AtomicBool);

impl EmergencyHalt {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
