//! Typed rejections for order book operations. Per spec, unknown
//! `order_id`s and duplicate adds are rejections, not panics; trades
//! against an empty side are no-ops, not errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum BookError {
    #[error("order {0} not found")]
    NotFound(u64),
    #[error("order {0} already exists")]
    Duplicate(u64),
    #[error("order book arena exhausted")]
    ArenaExhausted,
    #[error("invalid order: quantity and price must be positive")]
    InvalidOrder,
}

pub type BookResult<T> = Result<T, BookError>;
