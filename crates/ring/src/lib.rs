//! L0 SPSC ring buffer.
//!
//! [`Spsc<T, N>`] is a single-producer/single-consumer queue with a
//! power-of-two capacity `N`. The producer's state (`tail`, its cached
//! view of `head`) and the consumer's state (`head`, its cached view of
//! `tail`) live on two independently cache-line-aligned structs so the
//! two sides never false-share a line. `try_push`/`try_pop` never block;
//! `try_push` fails iff full, `try_pop` fails iff empty. Neither allocates
//! after construction.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

#[repr(align(64))]
struct ProducerLine {
    tail: AtomicUsize,
    cached_head: UnsafeCell<usize>,
}

#[repr(align(64))]
struct ConsumerLine {
    head: AtomicUsize,
    cached_tail: UnsafeCell<usize>,
}

/// Power-of-two-capacity SPSC ring buffer. `N` must be a power of two;
/// this is enforced by a const assertion evaluated at `new()`.
pub struct Spsc<T, const N: usize> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>; N]>,
    producer: ProducerLine,
    consumer: ConsumerLine,
}

// SAFETY: `Spsc` is sound for concurrent single-producer/single-consumer
// use: the producer only ever touches `producer` plus writes into slots it
// alone owns, the consumer only ever touches `consumer` plus reads slots it
// alone owns, and the `tail`/`head` stores/loads below establish the
// happens-before edges that hand slot ownership across.
unsafe impl<T: Send, const N: usize> Send for Spsc<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for Spsc<T, N> {}

impl<T, const N: usize> Spsc<T, N> {
    const ASSERT_POWER_OF_TWO: () = assert!(N > 0 && N.is_power_of_two(), "Spsc capacity must be a power of two");

    #[must_use]
    pub fn new() -> Self {
        let () = Self::ASSERT_POWER_OF_TWO;
        Self {
            buffer: Box::new(std::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit()))),
            producer: ProducerLine {
                tail: AtomicUsize::new(0),
                cached_head: UnsafeCell::new(0),
            },
            consumer: ConsumerLine {
                head: AtomicUsize::new(0),
                cached_tail: UnsafeCell::new(0),
            },
        }
    }

    #[inline(always)]
    const fn mask(index: usize) -> usize {
        index & (N - 1)
    }

    /// Pushes a value. Fails (returning `false`) iff the ring is full.
    /// Producer-only; never blocks.
    #[inline(always)]
    pub fn try_push(&self, value: T) -> bool {
        let tail = self.producer.tail.load(Ordering::Relaxed);
        let next_tail = tail.wrapping_add(1);

        // SAFETY: producer-exclusive field.
        let cached_head = unsafe { *self.producer.cached_head.get() };
        if next_tail.wrapping_sub(cached_head) > N {
            let head = self.consumer.head.load(Ordering::Acquire);
            // SAFETY: producer-exclusive field.
            unsafe { *self.producer.cached_head.get() = head };
            if next_tail.wrapping_sub(head) > N {
                return false;
            }
        }

        // SAFETY: slot `tail & mask` is owned by the producer until the
        // `tail` store below publishes it to the consumer.
        unsafe {
            (*self.buffer[Self::mask(tail)].get()).write(value);
        }
        self.producer.tail.store(next_tail, Ordering::Release);
        true
    }

    /// Pops the oldest value. Fails (returning `None`) iff the ring is
    /// empty. Consumer-only; never blocks.
    #[inline(always)]
    pub fn try_pop(&self) -> Option<T> {
        let head = self.consumer.head.load(Ordering::Relaxed);

        // SAFETY: consumer-exclusive field.
        let cached_tail = unsafe { *self.consumer.cached_tail.get() };
        if head == cached_tail {
            let tail = self.producer.tail.load(Ordering::Acquire);
            // SAFETY: consumer-exclusive field.
            unsafe { *self.consumer.cached_tail.get() = tail };
            if head == tail {
                return None;
            }
        }

        // SAFETY: slot `head & mask` was published by the producer's
        // `tail` store observed above and is owned by the consumer until
        // the `head` store below frees it back to the producer.
        let value = unsafe { (*self.buffer[Self::mask(head)].get()).assume_init_read() };
        self.consumer.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Pushes as many items from `iter` as fit; returns the count pushed.
    /// Stops at the first `try_push` failure (ring full).
    pub fn try_push_batch(&self, iter: impl IntoIterator<Item = T>) -> usize {
        let mut count = 0;
        for value in iter {
            if !self.try_push(value) {
                break;
            }
            count += 1;
        }
        count
    }

    /// Pops up to `out.len()` items into `out`; returns the count popped.
    pub fn try_pop_batch(&self, out: &mut [MaybeUninit<T>]) -> usize {
        let mut count = 0;
        for slot in out.iter_mut() {
            match self.try_pop() {
                Some(value) => {
                    slot.write(value);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Approximate occupied length. Racy across threads by design — useful
    /// for telemetry, not for correctness decisions.
    #[must_use]
    pub fn len_approx(&self) -> usize {
        let tail = self.producer.tail.load(Ordering::Relaxed);
        let head = self.consumer.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head)
    }

    #[must_use]
    pub fn is_empty_approx(&self) -> bool {
        self.len_approx() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Spsc<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for Spsc<T, N> {
    fn drop(&mut self) {
        // Drain remaining initialized slots so `T`'s destructor runs.
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_round_trip() {
        let ring: Spsc<u32, 4> = Spsc::new();
        assert!(ring.try_push(1));
        assert!(ring.try_push(2));
        assert_eq!(ring.try_pop(), Some(1));
        assert_eq!(ring.try_pop(), Some(2));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn fails_when_full() {
        let ring: Spsc<u32, 2> = Spsc::new();
        assert!(ring.try_push(1));
        assert!(ring.try_push(2));
        assert!(!ring.try_push(3));
        assert_eq!(ring.try_pop(), Some(1));
        assert!(ring.try_push(3));
    }

    #[test]
    fn batch_push_and_pop() {
        let ring: Spsc<u32, 8> = Spsc::new();
        let pushed = ring.try_push_batch(0..5);
        assert_eq!(pushed, 5);
        let mut out: [MaybeUninit<u32>; 8] = [const { MaybeUninit::uninit() }; 8];
        let popped = ring.try_pop_batch(&mut out);
        assert_eq!(popped, 5);
        for (i, slot) in out.iter().take(5).enumerate() {
            // SAFETY: first `popped` slots were written by try_pop_batch.
            assert_eq!(unsafe { slot.assume_init_read() }, i as u32);
        }
    }

    #[test]
    fn drop_drains_remaining_values() {
        let ring: Spsc<Arc<u32>, 4> = Spsc::new();
        let v = Arc::new(42u32);
        ring.try_push(v.clone());
        ring.try_push(v.clone());
        assert_eq!(Arc::strong_count(&v), 3);
        drop(ring);
        assert_eq!(Arc::strong_count(&v), 1);
    }

    #[test]
    fn concurrent_producer_consumer_preserves_order() {
        let ring: Arc<Spsc<u64, 1024>> = Arc::new(Spsc::new());
        let producer_ring = ring.clone();
        const COUNT: u64 = 200_000;

        let producer = thread::spawn(move || {
                let mut i = 0;
                while i < COUNT {
                    if producer_ring.try_push(i) {
                        i += 1;
                    }
                }
        });

        let mut received = Vec::with_capacity(COUNT as usize);
        while received.len() < COUNT as usize {
            if let Some(v) = ring.try_pop() {
                received.push(v);
            }
        }
        producer.join().unwrap();

        for (i, v) in received.iter().enumerate() {
            assert_eq!(*v, i as u64);
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_push_then_pop_preserves_order(values in proptest::collection::vec(0u32..1000, 0..16)) {
            let ring: Spsc<u32, 16> = Spsc::new();
            for v in &values {
                proptest::prop_assert!(ring.try_push(*v));
            }
            for v in &values {
                proptest::prop_assert_eq!(ring.try_pop(), Some(*v));
            }
            proptest::prop_assert_eq!(ring.try_pop(), None);
        }
    }
}
