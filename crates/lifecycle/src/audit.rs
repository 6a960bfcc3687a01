//! Fixed-capacity audit trail: a wrap-around ring of fixed capacity; every
//! state transition appends an entry with old/new state, ts, a reason
//! (<=16 chars), and the (price, qty) at the time. Overwrites of old
//! entries are allowed and expected; durable, compliance-grade retention
//! is out of scope here, so this in-memory ring is the whole of it.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use common::{Px, Qty, Ts};

use crate::state::OrderState;

const AUDIT_CAPACITY: usize = 4_096;
const REASON_CAPACITY: usize = 16;

/// A `<=16`-byte ASCII reason code, stored inline rather than as a `String`
/// so the ring never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reason {
    bytes: [u8; REASON_CAPACITY],
    len: u8,
}

impl Reason {
    #[must_use]
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; REASON_CAPACITY];
        let n = s.len().min(REASON_CAPACITY);
        bytes[..n].copy_from_slice(&s.as_bytes()[..n]);
        Self { bytes, len: n as u8 }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl Default for Reason {
    fn default() -> Self {
        Self {
            bytes: [0u8; REASON_CAPACITY],
            len: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditEntry {
    pub order_id: u64,
    pub old_state: OrderState,
    pub new_state: OrderState,
    pub ts: Ts,
    pub reason: Reason,
    pub price: Px,
    pub qty: Qty,
}

impl AuditEntry {
    #[must_use]
    pub fn new(order_id: u64, old_state: OrderState, new_state: OrderState, ts: Ts, reason: &str, price: Px, qty: Qty) -> Self {
        Self {
            order_id,
            old_state,
            new_state,
            ts,
            reason: Reason::new(reason),
            price,
            qty,
        }
    }
}

impl Default for AuditEntry {
    fn default() -> Self {
        Self {
            order_id: 0,
            old_state: OrderState::Created,
            new_state: OrderState::Created,
            ts: Ts(0),
            reason: Reason::default(),
            price: Px::ZERO,
            qty: Qty::ZERO,
        }
    }
}

/// Fixed-capacity wrap-around audit ring with an atomic write cursor, the
/// one exception to the general single-writer-per-pool rule: no mutex
/// sits on this path. Writes come from the
/// single Engine thread; reads (telemetry snapshots) may race a concurrent
/// write and observe a torn or slightly stale entry, which is acceptable
/// for a diagnostic trail that is not itself consulted by any hot-path
/// decision.
pub struct AuditRing {
    entries: Box<[UnsafeCell<AuditEntry>; AUDIT_CAPACITY]>,
    cursor: AtomicU64,
}

// SAFETY: `entries` is written only from the single Engine thread via
// `record`; `snapshot`'s concurrent reads from other threads tolerate a
// torn entry by design, so no synchronization beyond the atomic cursor is
// required for either side.
unsafe impl Sync for AuditRing {}

impl AuditRing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Box::new(std::array::from_fn(|_| UnsafeCell::new(AuditEntry::default()))),
            cursor: AtomicU64::new(0),
        }
    }

    pub fn record(&self, entry: AuditEntry) {
        let slot = (self.cursor.fetch_add(1, Ordering::Relaxed) % AUDIT_CAPACITY as u64) as usize;
        // SAFETY: only the Engine thread ever calls `record`, so this
        // write never races another write to the same slot.
        unsafe {
            *self.entries[slot].get() = entry;
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed).min(AUDIT_CAPACITY as u64)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        AUDIT_CAPACITY
    }

    fn read_slot(&self, idx: usize) -> AuditEntry {
        // SAFETY: `AuditEntry` is `Copy`, so this read cannot observe a
        // partially-constructed value even if it races a concurrent
        // `record` write to the same slot; at worst it returns the old or
        // the new entry for that slot, both of which are valid values.
        unsafe { *self.entries[idx].get() }
    }

    /// Snapshot of every live entry, oldest first. Intended for telemetry,
    /// not the hot path.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        let written = self.cursor.load(Ordering::Relaxed);
        if written >= AUDIT_CAPACITY as u64 {
            let start = (written % AUDIT_CAPACITY as u64) as usize;
            (start..AUDIT_CAPACITY).chain(0..start).map(|i| self.read_slot(i)).collect()
        } else {
            (0..written as usize).map(|i| self.read_slot(i)).collect()
        }
    }
}

impl Default for AuditRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_truncates_to_sixteen_bytes() {
        let reason = Reason::new("this reason is definitely longer than sixteen bytes");
        assert_eq!(reason.as_str().len(), REASON_CAPACITY);
    }

    #[test]
    fn snapshot_preserves_insertion_order_before_wraparound() {
        let ring = AuditRing::new();
        for i in 0..10 {
            ring.record(AuditEntry::new(i, OrderState::Created, OrderState::Validated, Ts(i), "x", Px::ZERO, Qty::ZERO));
        }
        let snap = ring.snapshot();
        assert_eq!(snap.len(), 10);
        for (i, entry) in snap.iter().enumerate() {
            assert_eq!(entry.order_id, i as u64);
        }
    }

    #[test]
    fn wraparound_overwrites_oldest_entries() {
        let ring = AuditRing::new();
        for i in 0..(AUDIT_CAPACITY as u64 + 5) {
            ring.record(AuditEntry::new(i, OrderState::Created, OrderState::Validated, Ts(i), "x", Px::ZERO, Qty::ZERO));
        }
        let snap = ring.snapshot();
        assert_eq!(snap.len(), AUDIT_CAPACITY);
        assert_eq!(snap[0].order_id, 5);
        assert_eq!(snap[AUDIT_CAPACITY - 1].order_id, AUDIT_CAPACITY as u64 + 4);
    }
}
