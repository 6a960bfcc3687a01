//! The canonical market-making strategy (, and this resolution of the
//! "two overlapping quote managers" open question: one `MarketMaker`
//! contract, parameterized by [`StrategyConfig`] rather than duplicated).

use common::{Instrument, Px, Price32nd, Qty, Side, Ts};
use risk::{RiskGate, RiskOutcome};

use crate::config::StrategyConfig;
use crate::conditions::MarketConditions;
use crate::decision::{Action, TradingDecision};
use crate::inventory::InventoryState;

/// Per-instrument market snapshot a strategy consumes each cycle: the
/// current quote-worthy bid/ask (tick or book BBO, caller's choice) plus
/// the cycle timestamp. L1 depth feeds `MarketConditions::liquidity_score`
/// via [`MarketMaker::observe_depth`], called separately since depth is
/// optional context, not required for every quote.
#[derive(Debug, Clone, Copy)]
pub struct StrategyInput {
    pub bid_price: Px,
    pub ask_price: Px,
    pub bid_size: Qty,
    pub ask_size: Qty,
    pub ts: Ts,
}

impl StrategyInput {
    #[must_use]
    pub fn is_valid_for_quoting(&self) -> bool {
        self.bid_price.is_positive()
        && self.ask_price.is_positive()
        && self.bid_size.is_positive()
        && self.ask_size.is_positive()
        && self.bid_price < self.ask_price
    }
}

/// The capability every strategy implements; the coordinator holds a
/// heterogeneous collection of these behind `Box<dyn Strategy>`
/// ( trait abstraction replaces the source's inheritance hierarchy).
pub trait Strategy {
    fn instrument(&self) -> Instrument;
    fn step(&mut self, input: &StrategyInput, risk: &RiskGate) -> TradingDecision;

    /// Applies a venue fill to whatever inventory/cost-basis state the
    /// strategy keeps. Default no-op so a strategy with no position state
    /// doesn't need to implement it.
    fn on_fill(&mut self, _side: Side, _qty: Qty, _price: Px) {}
}

pub struct MarketMaker {
    instrument: Instrument,
    config: StrategyConfig,
    market: MarketConditions,
    inventory: InventoryState,
}

impl MarketMaker {
    #[must_use]
    pub fn new(instrument: Instrument, config: StrategyConfig) -> Self {
        Self {
            instrument,
            market: MarketConditions::new(config.vol_decay),
            inventory: InventoryState::new(config.position_limit_ticks),
            config,
        }
    }

    #[must_use]
    pub fn market_conditions(&self) -> &MarketConditions {
        &self.market
    }

    #[must_use]
    pub fn inventory(&self) -> &InventoryState {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut InventoryState {
        &mut self.inventory
    }

    /// Feeds L1 depth-derived liquidity context; cheap enough to call
    /// every cycle but kept separate from `step` since not every caller
    /// tracks depth.
    pub fn observe_depth(&mut self, top_of_book_qty: Qty, typical_qty: Qty) {
        let score = if typical_qty.is_positive() {
            (top_of_book_qty.as_f64() / typical_qty.as_f64()).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.market.set_liquidity_score(score);
    }

    pub fn apply_fill(&mut self, side: Side, qty: Qty, price: Px) {
        self.inventory.apply_fill(side, qty, price);
    }

    /// Computes a symmetric-around-mid bid/ask, applying volatility
    /// widening, inventory skew, and liquidity widening in that order, then
    /// snaps both legs to the nearest legal 32nd. Returns `None` if the
    /// snapped bid would not remain strictly below the snapped ask.
    fn compute_quotes(&self, mid_decimal: f64) -> Option<(Px, Px)> {
        let base_half_decimal = f64::from(self.instrument.base_half_spread_32nds()) / 100.0 / 32.0;
        let vol = self.market.volatility_estimate();
        let half_spread = base_half_decimal * (1.0 + self.config.k_vol * vol);

        let liquidity_widen = 1.0 + self.config.liquidity_widen_k * (1.0 - self.market.liquidity_score);
        let half_spread = half_spread * liquidity_widen;

        let limit = self.inventory.position_limit_ticks().max(1) as f64;
        let utilization_signed = self.inventory.net_position_ticks as f64 / limit;
        let skew_32nds =
        (self.config.k_inv * utilization_signed).clamp(-self.config.max_skew_32nds, self.config.max_skew_32nds);
        let skew_decimal = skew_32nds / 32.0;

        let bid = mid_decimal - half_spread - skew_decimal;
        let ask = mid_decimal + half_spread - skew_decimal;

        let bid_snapped = Price32nd::from_decimal(bid).to_px();
        let ask_snapped = Price32nd::from_decimal(ask).to_px();
        (bid_snapped < ask_snapped).then_some((bid_snapped, ask_snapped))
    }

    /// Base size scaled by confidence and inventory utilization, halved
    /// once if Layer 1 would reject the naive size.
    fn compute_size(&self, confidence: f64, risk: &RiskGate, side: Side) -> Qty {
        let utilization = self.inventory.utilization();
        let naive = (self.config.base_size_ticks as f64 * confidence * (1.0 - utilization)).round() as i64;
        if naive <= 0 {
            return Qty::ZERO;
        }
        let (outcome, _) = risk.layer1.check(self.instrument, side, Qty::from_ticks(naive), Ts(0));
        let sized = if outcome >= RiskOutcome::TradeRejected { naive / 2 } else { naive };
        Qty::from_ticks(sized.max(0))
    }

    fn should_cancel(&self, risk: &RiskGate) -> bool {
        let (l2_outcome, _) = risk.layer2.check();
        self.inventory.utilization() >= self.config.inventory_emergency_utilization
        || self.market.volatility_estimate() >= self.config.panic_volatility
        || l2_outcome >= RiskOutcome::PositionReduce
    }
}

impl Strategy for MarketMaker {
    fn instrument(&self) -> Instrument {
        self.instrument
    }

    fn on_fill(&mut self, side: Side, qty: Qty, price: Px) {
        self.apply_fill(side, qty, price);
    }

    fn step(&mut self, input: &StrategyInput, risk: &RiskGate) -> TradingDecision {
        if !input.is_valid_for_quoting() {
            return TradingDecision::no_action(self.instrument, input.ts);
        }

        let mid_decimal = (input.bid_price.as_f64() + input.ask_price.as_f64()) / 2.0;
        self.market.on_mid(mid_decimal, input.ts);
        self.market.on_order_flow(input.bid_size.as_f64(), input.ask_size.as_f64());
        self.inventory.mark_unrealized(mid_decimal);

        if self.should_cancel(risk) {
            return TradingDecision::cancel_quotes(self.instrument, input.ts);
        }

        let Some((bid_price, ask_price)) = self.compute_quotes(mid_decimal) else {
            return TradingDecision::no_action(self.instrument, input.ts);
        };

        let confidence = (1.0 - self.market.volatility_estimate() / self.config.panic_volatility).clamp(0.0, 1.0);
        let bid_size = self.compute_size(confidence, risk, Side::Bid);
        let ask_size = self.compute_size(confidence, risk, Side::Ask);
        if bid_size.is_zero() || ask_size.is_zero() {
            return TradingDecision::no_action(self.instrument, input.ts);
        }

        TradingDecision {
            action: Action::UpdateQuotes,
            instrument: self.instrument,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            confidence,
            expected_pnl: (ask_price.as_f64() - bid_price.as_f64()) * bid_size.as_f64(),
            decision_ts_ns: input.ts,
        }
    }
}
