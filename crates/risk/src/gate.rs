//! The comprehensive risk check: Layer 1 always runs, Layer 2 runs only
//! when the caller opts in. The returned severity is the max across
//! whichever layers ran; the bitmask is the union of their violations.

use std::sync::Arc;

use common::{Instrument, Qty, Side, Ts};

use crate::halt::EmergencyHalt;
use crate::layer1::{Layer1Gate, Layer1Limits};
use crate::layer2::{Layer2Gate, Layer2Limits};
use crate::outcome::{RiskCheckResult, RiskOutcome, RiskViolation, ViolationEvent};

pub struct RiskGate {
    pub layer1: Layer1Gate,
    pub layer2: Layer2Gate,
    halt: Arc<EmergencyHalt>,
}

impl RiskGate {
    #[must_use]
    pub fn new(layer1_limits: Layer1Limits, layer2_limits: Layer2Limits, halt: Arc<EmergencyHalt>) -> Self {
        Self {
            layer1: Layer1Gate::new(layer1_limits, halt.clone()),
            layer2: Layer2Gate::new(layer2_limits),
            halt,
        }
    }

    #[must_use]
    pub fn emergency_halt(&self) -> &Arc<EmergencyHalt> {
        &self.halt
    }

    /// Runs Layer 1, and Layer 2 iff `with_layer2` is set. Layer 1
    /// short-circuits internally; Layer 2, when it runs, always evaluates
    /// every check.
    #[must_use]
    pub fn check(
        &self,
        instrument: Instrument,
        side: Side,
        qty: Qty,
        ts: Ts,
        with_layer2: bool,
    ) -> RiskCheckResult {
        let (mut outcome, mut violations) = self.layer1.check(instrument, side, qty, ts);

        if with_layer2 {
            let (l2_outcome, l2_violations) = self.layer2.check();
            outcome = outcome.max(l2_outcome);
            violations |= l2_violations;
        }

        let event = outcome.warrants_event().then_some(ViolationEvent {
                outcome,
                violations,
                instrument,
                ts_ns: ts,
        });

        RiskCheckResult { outcome, violations, event }
    }
}
