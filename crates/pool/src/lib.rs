//! L0 object pools.
//!
//! A pool is single-threaded by default ([`LocalPool`]): the owning thread
//! acquires and releases with no synchronization at all. [`ObjectPool`] is
//! the multi-producer variant: a lock-free free list using a generation-
//! tagged index to avoid ABA on concurrent acquire/release, the same
//! pattern used for this workspace's audit-entry pool (the one exception to
//! single-writer-per-pool, per the engine's concurrency model). Neither
//! variant allocates after construction.

mod lockfree;
mod local;

pub use lockfree::{ObjectPool, PoolRef};
pub use local::{LocalPool, LocalRef};
