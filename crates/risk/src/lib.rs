//! L2 two-layer pre-trade risk gate.
//!
//! [`gate::RiskGate`] wraps [`layer1::Layer1Gate`] (nanosecond-scale,
//! per-instrument, short-circuiting) and [`layer2::Layer2Gate`]
//! (sub-microsecond, portfolio-wide, always-complete) behind one
//! `check()` call. [`halt::EmergencyHalt`] is the single
//! process-wide flag shared with `lifecycle`.

pub mod gate;
pub mod halt;
pub mod layer1;
pub mod layer2;
pub mod outcome;

pub use gate::RiskGate;
pub use halt::EmergencyHalt;
pub use layer1::{Layer1Gate, Layer1Limits};
pub use layer2::{Layer2Gate, Layer2Limits};
pub use outcome::{RiskCheckResult, RiskOutcome, RiskViolation, ViolationEvent};
