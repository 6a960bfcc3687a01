//! Layer 2: the enhanced portfolio gate. New relative to the
//! teacher (whose `risk-manager` service tracks only per-symbol
//! position/exposure, no portfolio-level DV01/VaR) but built in the same
//! atomic-counters idiom as `layer1`. Only called when the caller opts in;
//! evaluates every check regardless of earlier failures so the returned
//! bitmask is complete.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use common::Instrument;

use crate::outcome::{RiskOutcome, RiskViolation};

#[derive(Debug, Clone, Copy)]
pub struct Layer2Limits {
    pub max_portfolio_dv01_ticks: i64,
    pub max_concentration_bps: u32,
    pub max_correlation_exposure_bps: u32,
    pub max_var_ticks: i64,
    pub max_stress_loss_ticks: i64,
}

impl Default for Layer2Limits {
    fn default() -> Self {
        Self {
            max_portfolio_dv01_ticks: 500_000 * common::SCALE_4,
            max_concentration_bps: 4_000,
            max_correlation_exposure_bps: 6_000,
            max_var_ticks: 2_000_000 * common::SCALE_4,
            max_stress_loss_ticks: 5_000_000 * common::SCALE_4,
        }
    }
}

/// Running portfolio-level risk estimates. Updated by the Engine thread as
/// positions/market data change; read by `check` on the hot path.
#[derive(Debug, Default)]
pub struct PortfolioRisk {
    dv01_ticks: AtomicI64,
    concentration_bps: AtomicU64,
    correlation_exposure_bps: AtomicU64,
    var_ticks: AtomicI64,
    stress_loss_ticks: AtomicI64,
}

pub struct Layer2Gate {
    limits: Layer2Limits,
    state: PortfolioRisk,
}

impl Layer2Gate {
    #[must_use]
    pub fn new(limits: Layer2Limits) -> Self {
        Self {
            limits,
            state: PortfolioRisk::default(),
        }
    }

    pub fn update_dv01(&self, instrument: Instrument, position_delta_face_millions: i64) {
        let dv01_delta = position_delta_face_millions * instrument.dv01_per_million_ticks();
        self.state.dv01_ticks.fetch_add(dv01_delta, Ordering::AcqRel);
    }

    pub fn set_concentration_bps(&self, bps: u64) {
        self.state.concentration_bps.store(bps, Ordering::Relaxed);
    }

    pub fn set_correlation_exposure_bps(&self, bps: u64) {
        self.state.correlation_exposure_bps.store(bps, Ordering::Relaxed);
    }

    pub fn set_var_ticks(&self, var: i64) {
        self.state.var_ticks.store(var, Ordering::Relaxed);
    }

    pub fn set_stress_loss_ticks(&self, loss: i64) {
        self.state.stress_loss_ticks.store(loss, Ordering::Relaxed);
    }

    /// Evaluates every Layer 2 check and ORs together every violation that
    /// trips, returning the maximum severity across them.
    #[must_use]
    pub fn check(&self) -> (RiskOutcome, RiskViolation) {
        let mut outcome = RiskOutcome::Approved;
        let mut violations = RiskViolation::NONE;

        let dv01 = self.state.dv01_ticks.load(Ordering::Acquire).abs();
        if dv01 > self.limits.max_portfolio_dv01_ticks {
            outcome = outcome.max(RiskOutcome::TradeRejected);
            violations |= RiskViolation::PORTFOLIO_DV01;
        }

        let concentration = self.state.concentration_bps.load(Ordering::Acquire);
        if concentration > u64::from(self.limits.max_concentration_bps) {
            outcome = outcome.max(RiskOutcome::PositionReduce);
            violations |= RiskViolation::CONCENTRATION;
        }

        let correlation = self.state.correlation_exposure_bps.load(Ordering::Acquire);
        if correlation > u64::from(self.limits.max_correlation_exposure_bps) {
            outcome = outcome.max(RiskOutcome::WarningIssued);
            violations |= RiskViolation::CORRELATION;
        }

        let var = self.state.var_ticks.load(Ordering::Acquire).abs();
        if var > self.limits.max_var_ticks {
            outcome = outcome.max(RiskOutcome::TradeRejected);
            violations |= RiskViolation::VAR;
        }

        let stress_loss = self.state.stress_loss_ticks.load(Ordering::Acquire).abs();
        if stress_loss > self.limits.max_stress_loss_ticks {
            outcome = outcome.max(RiskOutcome::EmergencyHalt);
            violations |= RiskViolation::STRESS_LOSS;
        }

        (outcome, violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_portfolio_is_approved() {
        let gate = Layer2Gate::new(Layer2Limits::default());
        let (outcome, violations) = gate.check();
        assert_eq!(outcome, RiskOutcome::Approved);
        assert_eq!(violations, RiskViolation::NONE);
    }

    #[test]
    fn bitmask_is_complete_even_after_first_violation() {
        let gate = Layer2Gate::new(Layer2Limits::default());
        gate.update_dv01(Instrument::Bond30Y, 1_000_000);
        gate.set_var_ticks(10_000_000 * common::SCALE_4);
        let (outcome, violations) = gate.check();
        assert_eq!(outcome, RiskOutcome::TradeRejected);
        assert!(violations.contains(RiskViolation::PORTFOLIO_DV01));
        assert!(violations.contains(RiskViolation::VAR));
    }

    #[test]
    fn stress_loss_triggers_emergency_halt_severity() {
        let gate = Layer2Gate::new(Layer2Limits::default());
        gate.set_stress_loss_ticks(50_000_000 * common::SCALE_4);
        let (outcome, violations) = gate.check();
        assert_eq!(outcome, RiskOutcome::EmergencyHalt);
        assert!(violations.contains(RiskViolation::STRESS_LOSS));
    }
}
