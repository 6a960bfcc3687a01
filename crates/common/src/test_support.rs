//! Allocation-counting `GlobalAlloc` wrapper: wraps [`System`] and
//! maintains atomic counters for live/total allocations. The engine
//! crate's no-allocation integration test installs this as
//! `#[global_allocator]` to give the "per-tick step never allocates"
//! claim a mechanical check rather than an inspection-only one.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct AllocCounts {
    pub allocations: AtomicU64,
    pub deallocations: AtomicU64,
}

impl AllocCounts {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn live(&self) -> u64 {
        self.allocations
            .load(Ordering::Relaxed)
            .saturating_sub(self.deallocations.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.allocations.store(0, Ordering::Relaxed);
        self.deallocations.store(0, Ordering::Relaxed);
    }
}

/// A `GlobalAlloc` that delegates to [`System`] and counts every call.
/// Not used anywhere on the hot path itself — only installed by test
/// binaries that need to observe whether the hot path allocates.
pub struct CountingAllocator {
    pub counts: AllocCounts,
}

impl CountingAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self { counts: AllocCounts::new() }
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: delegates every call straight to `System`, which is itself a
// sound `GlobalAlloc`; the counters are observation only and never
// influence the returned pointer or the layout passed through.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.counts.allocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.counts.deallocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.counts.allocations.fetch_add(1, Ordering::Relaxed);
        self.counts.deallocations.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}
