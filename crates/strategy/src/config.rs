//! Per-strategy configuration: a plain `Default`-implementing POD struct
//! rather than a config-file format — no parsing crate is introduced.

#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    pub k_vol: f64,
    pub k_inv: f64,
    pub max_skew_32nds: f64,
    pub liquidity_widen_k: f64,
    pub base_size_ticks: i64,
    pub position_limit_ticks: i64,
    pub vol_decay: f64,
    pub panic_volatility: f64,
    pub inventory_emergency_utilization: f64,
    pub risk_score_cap_fraction: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            k_vol: 4.0,
            k_inv: 2.0,
            max_skew_32nds: 4.0,
            liquidity_widen_k: 1.0,
            base_size_ticks: 5_000_000 * common::SCALE_4,
            position_limit_ticks: 100_000_000 * common::SCALE_4,
            vol_decay: 0.94,
            panic_volatility: 0.02,
            inventory_emergency_utilization: 0.95,
            risk_score_cap_fraction: 0.9,
        }
    }
}
