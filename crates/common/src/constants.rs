//! Fixed-point scale and capacity constants shared across the workspace.

/// Fixed-point scale used by [`crate::Px`] and [`crate::Qty`]: four decimal
/// digits of precision stored as an `i64` tick count.
pub const SCALE_4: i64 = 10_000;

/// Default number of 32nds per whole point (treasury quoting convention).
pub const THIRTY_SECONDS_PER_POINT: i32 = 32;

/// Default ring buffer capacity for tick/trade delivery (power of two).
pub const DEFAULT_RING_CAPACITY: usize = 1 << 16;

/// Minimum order slot table size required by the order lifecycle manager.
pub const MIN_ORDER_SLOTS: usize = 1 << 16;
