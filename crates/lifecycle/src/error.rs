//! `lifecycle`'s error category, in the per-crate `thiserror` idiom used
//! throughout this workspace.

use thiserror::Error;

use crate::state::OrderState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("order {0} not found")]
    NotFound(u64),
    #[error("duplicate order id {0}")]
    Duplicate(u64),
    #[error("order table exhausted")]
    ArenaExhausted,
    #[error("invalid transition {from:?} -> {to:?}")]
    InvalidTransition { from: OrderState, to: OrderState },
    #[error("emergency stop is active")]
    EmergencyStop,
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
