//! Per-instrument rolling market-condition estimate, owned by the
//! strategy that quotes that instrument (this `MarketConditions`).

use common::Ts;

const PRICE_HISTORY_LEN: usize = 32;

/// EWMA volatility of mid-price returns, a short price-history ring for
/// diagnostics, last mid, a simple order-flow imbalance proxy, and a
/// liquidity score in `[0, 1]`.
pub struct MarketConditions {
    pub ewma_volatility: f64,
    history: [f64; PRICE_HISTORY_LEN],
    history_len: usize,
    history_cursor: usize,
    pub last_mid: Option<f64>,
    pub order_flow_imbalance: f64,
    pub liquidity_score: f64,
    pub last_update_ts: Ts,
    vol_decay: f64,
}

impl MarketConditions {
    #[must_use]
    pub fn new(vol_decay: f64) -> Self {
        Self {
            ewma_volatility: 0.0,
            history: [0.0; PRICE_HISTORY_LEN],
            history_len: 0,
            history_cursor: 0,
            last_mid: None,
            order_flow_imbalance: 0.0,
            liquidity_score: 1.0,
            last_update_ts: Ts(0),
            vol_decay,
        }
    }

    /// Folds in a new mid observation: updates the EWMA of squared
    /// returns (the volatility proxy), the short history ring, and the
    /// last-mid/timestamp fields.
    pub fn on_mid(&mut self, mid: f64, ts: Ts) {
        if let Some(prev) = self.last_mid {
            if prev > 0.0 {
                let ret = (mid - prev) / prev;
                self.ewma_volatility =
                self.vol_decay * self.ewma_volatility + (1.0 - self.vol_decay) * ret * ret;
            }
        }
        self.history[self.history_cursor] = mid;
        self.history_cursor = (self.history_cursor + 1) % PRICE_HISTORY_LEN;
        self.history_len = (self.history_len + 1).min(PRICE_HISTORY_LEN);
        self.last_mid = Some(mid);
        self.last_update_ts = ts;
    }

    pub fn on_order_flow(&mut self, bid_size: f64, ask_size: f64) {
        let total = bid_size + ask_size;
        self.order_flow_imbalance = if total > 0.0 { (bid_size - ask_size) / total } else { 0.0 };
    }

    pub fn set_liquidity_score(&mut self, score: f64) {
        self.liquidity_score = score.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn volatility_estimate(&self) -> f64 {
        self.ewma_volatility.sqrt()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history_len
    }
}
