//! L2: market-making strategy — quote and size computation per instrument,
//! inventory/PnL tracking, rolling market conditions, and
//! multi-instrument coordination. No direct dependency on `book` or
//! `feed`: strategies consume a plain [`market_maker::StrategyInput`] the
//! Engine assembles from whichever upstream source it chooses.

pub mod conditions;
pub mod config;
pub mod coordinator;
pub mod decision;
pub mod inventory;
pub mod market_maker;

pub use conditions::MarketConditions;
pub use config::StrategyConfig;
pub use coordinator::Coordinator;
pub use decision::{Action, TradingDecision};
pub use inventory::InventoryState;
pub use market_maker::{MarketMaker, Strategy, StrategyInput};
