//! Ingress feed handler: checksum, sequence-gap/dedup tracking, and
//! fixed-offset decode into the `Tick`/`Trade` output rings.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use common::Instrument;
use ring::Spsc;

use crate::frame::{FRAME_LEN, FrameView, MessageType};
use crate::types::{Tick, Trade};

/// Size of the short ring of last-seen sequence numbers used for
/// duplicate detection.
const DEDUP_WINDOW: usize = 64;

/// Per-feed sequencing/dedup state. Not `Sync` — the ingress thread owns
/// one `FeedHandler` per venue feed and calls it single-threaded, so the
/// dedup ring and expected-sequence cursor use plain `Cell`s; the public
/// counters are atomics purely so the telemetry thread can read them
/// concurrently.
pub struct FeedHandler {
    expected_sequence: Cell<Option<u64>>,
    recent_sequences: Box<[Cell<u64>; DEDUP_WINDOW]>,
    recent_cursor: Cell<usize>,

    pub parsed: AtomicU64,
    pub invalid: AtomicU64,
    pub sequence_gaps: AtomicU64,
    pub duplicate_messages: AtomicU64,
    pub dropped: AtomicU64,
    pub unknown_instrument: AtomicU64,
}

impl FeedHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            expected_sequence: Cell::new(None),
            recent_sequences: Box::new(std::array::from_fn(|_| Cell::new(u64::MAX))),
            recent_cursor: Cell::new(0),
            parsed: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            sequence_gaps: AtomicU64::new(0),
            duplicate_messages: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            unknown_instrument: AtomicU64::new(0),
        }
    }

    fn is_recent_duplicate(&self, sequence: u64) -> bool {
        self.recent_sequences.iter().any(|slot| slot.get() == sequence)
    }

    fn remember_sequence(&self, sequence: u64) {
        let idx = self.recent_cursor.get();
        self.recent_sequences[idx].set(sequence);
        self.recent_cursor.set((idx + 1) % DEDUP_WINDOW);
    }

    /// Processes one contiguous batch of 64-byte frames. Decoded ticks and
    /// trades are pushed into the caller-supplied output rings; if a ring
    /// is full the record is dropped and `dropped` is incremented — decoded
    /// records are never silently discarded without incrementing an
    /// observable counter. Returns the number of frames
    /// that decoded into a record (regardless of whether the ring accepted
    /// it).
    pub fn process_batch<const TICK_N: usize, const TRADE_N: usize>(
        &self,
        frames: &[u8],
        ticks_out: &Spsc<Tick, TICK_N>,
        trades_out: &Spsc<Trade, TRADE_N>,
    ) -> usize {
        let mut decoded = 0;
        for chunk in frames.chunks_exact(FRAME_LEN) {
            let frame: &[u8; FRAME_LEN] = chunk.try_into().expect("chunks_exact yields FRAME_LEN slices");
            if self.process_one(frame, ticks_out, trades_out) {
                decoded += 1;
            }
        }
        decoded
    }

    fn process_one<const TICK_N: usize, const TRADE_N: usize>(
        &self,
        frame: &[u8; FRAME_LEN],
        ticks_out: &Spsc<Tick, TICK_N>,
        trades_out: &Spsc<Trade, TRADE_N>,
    ) -> bool {
        let view = FrameView::new(frame);

        if !view.checksum_ok() {
            self.invalid.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let sequence = view.sequence_number();
        match self.expected_sequence.get() {
            None => {
                self.expected_sequence.set(Some(sequence + 1));
            }
            Some(expected) if sequence > expected => {
                self.sequence_gaps.fetch_add(1, Ordering::Relaxed);
                self.expected_sequence.set(Some(sequence + 1));
            }
            Some(expected) if sequence == expected => {
                self.expected_sequence.set(Some(expected + 1));
            }
            Some(_) => {
                if self.is_recent_duplicate(sequence) {
                    self.duplicate_messages.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            }
        }
        self.remember_sequence(sequence);

        let Some(message_type) = MessageType::from_wire(view.message_type_raw()) else {
            self.invalid.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match message_type {
            MessageType::Heartbeat => false,
            MessageType::Tick => {
                let Some(instrument) = Instrument::from_wire_id(view.instrument_id()) else {
                    self.unknown_instrument.fetch_add(1, Ordering::Relaxed);
                    return false;
                };
                let tick = view.decode_tick(instrument);
                self.parsed.fetch_add(1, Ordering::Relaxed);
                if !ticks_out.try_push(tick) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
            MessageType::Trade => {
                let Some(instrument) = Instrument::from_wire_id(view.instrument_id()) else {
                    self.unknown_instrument.fetch_add(1, Ordering::Relaxed);
                    return false;
                };
                let trade = view.decode_trade(instrument);
                self.parsed.fetch_add(1, Ordering::Relaxed);
                if !trades_out.try_push(trade) {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
        }
    }
}

impl Default for FeedHandler {
    fn default() -> Self {
        Self::new()
    }
}
