//! Raw 64-byte venue frame layout and decode helpers, per the wire contract
//! in Little-endian throughout.

use common::{Instrument, Px, Qty, Ts};

use crate::types::{Tick, Trade};

pub const FRAME_LEN: usize = 64;

const OFF_SEQUENCE: usize = 0;
const OFF_TS: usize = 8;
const OFF_MSG_TYPE: usize = 16;
const OFF_INSTRUMENT: usize = 20;
const OFF_PAYLOAD: usize = 24;
const PAYLOAD_LEN: usize = 32;
const OFF_CHECKSUM: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    Tick = 1,
    Trade = 2,
    Heartbeat = 3,
}

impl MessageType {
    #[must_use]
    pub const fn from_wire(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Tick),
            2 => Some(Self::Trade),
            3 => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

/// A borrowed view over one 64-byte frame. Does not copy or allocate.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    bytes: &'a [u8; FRAME_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("unrecognized message type {0}")]
    UnknownMessageType(u32),
    #[error("unrecognized instrument id {0}")]
    UnknownInstrument(u32),
}

impl<'a> FrameView<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        u64::from_le_bytes(self.bytes[OFF_SEQUENCE..OFF_SEQUENCE + 8].try_into().unwrap())
    }

    #[must_use]
    pub fn exchange_ts_ns(&self) -> u64 {
        u64::from_le_bytes(self.bytes[OFF_TS..OFF_TS + 8].try_into().unwrap())
    }

    #[must_use]
    pub fn message_type_raw(&self) -> u32 {
        u32::from_le_bytes(self.bytes[OFF_MSG_TYPE..OFF_MSG_TYPE + 4].try_into().unwrap())
    }

    #[must_use]
    pub fn instrument_id(&self) -> u32 {
        u32::from_le_bytes(self.bytes[OFF_INSTRUMENT..OFF_INSTRUMENT + 4].try_into().unwrap())
    }

    fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        self.bytes[OFF_PAYLOAD..OFF_PAYLOAD + PAYLOAD_LEN].try_into().unwrap()
    }

    #[must_use]
    pub fn checksum_field(&self) -> u16 {
        u16::from_le_bytes(self.bytes[OFF_CHECKSUM..OFF_CHECKSUM + 2].try_into().unwrap())
    }

    /// XOR-folds the 56 bytes preceding the checksum field as 28
    /// little-endian `u16` words. This must match whatever the venue's
    /// frame producer computes; the simulator and parser here agree on the
    /// same fold (see [`compute_checksum`]).
    #[must_use]
    pub fn computed_checksum(&self) -> u16 {
        compute_checksum(&self.bytes[..OFF_CHECKSUM])
    }

    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        self.checksum_field() == self.computed_checksum()
    }

    /// Decodes this frame's tick payload. Caller must have already checked
    /// `message_type_raw() == MessageType::Tick as u32`.
    #[must_use]
    pub fn decode_tick(&self, instrument: Instrument) -> Tick {
        let payload = self.payload();
        let bid_price = f64::from_le_bytes(payload[0..8].try_into().unwrap());
        let ask_price = f64::from_le_bytes(payload[8..16].try_into().unwrap());
        let bid_size = u64::from_le_bytes(payload[16..24].try_into().unwrap());
        let ask_size = u64::from_le_bytes(payload[24..32].try_into().unwrap());
        Tick {
            instrument,
            exchange_ts_ns: Ts::from_nanos(self.exchange_ts_ns()),
            bid_price: Px::new(bid_price),
            ask_price: Px::new(ask_price),
            bid_size: Qty::new(bid_size as f64),
            ask_size: Qty::new(ask_size as f64),
            bid_yield: 0.0,
            ask_yield: 0.0,
        }
    }

    /// Decodes this frame's trade payload. Caller must have already
    /// checked `message_type_raw() == MessageType::Trade as u32`.
    #[must_use]
    pub fn decode_trade(&self, instrument: Instrument) -> Trade {
        let payload = self.payload();
        let price = f64::from_le_bytes(payload[0..8].try_into().unwrap());
        let size = u64::from_le_bytes(payload[8..16].try_into().unwrap());
        let mut trade_id = [0u8; 16];
        trade_id.copy_from_slice(&payload[16..32]);
        Trade {
            instrument,
            ts_ns: Ts::from_nanos(self.exchange_ts_ns()),
            price: Px::new(price),
            size: Qty::new(size as f64),
            yield_: 0.0,
            trade_id,
        }
    }
}

/// XORs `bytes` as little-endian `u16` words. `bytes.len()` must be even;
/// the 64-byte frame layout guarantees this (56 bytes precede the checksum
/// field).
#[must_use]
pub fn compute_checksum(bytes: &[u8]) -> u16 {
    let mut acc = 0u16;
    for word in bytes.chunks_exact(2) {
        acc ^= u16::from_le_bytes([word[0], word[1]]);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_round_trips() {
        let mut frame = [0u8; FRAME_LEN];
        frame[0..8].copy_from_slice(&1u64.to_le_bytes());
        frame[16..20].copy_from_slice(&(MessageType::Heartbeat as u32).to_le_bytes());
        let checksum = compute_checksum(&frame[..OFF_CHECKSUM]);
        frame[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&checksum.to_le_bytes());
        let view = FrameView::new(&frame);
        assert!(view.checksum_ok());
    }

    #[test]
    fn detects_corrupted_frame() {
        let mut frame = [0u8; FRAME_LEN];
        frame[0..8].copy_from_slice(&1u64.to_le_bytes());
        let checksum = compute_checksum(&frame[..OFF_CHECKSUM]);
        frame[OFF_CHECKSUM..OFF_CHECKSUM + 2].copy_from_slice(&checksum.to_le_bytes());
        frame[4] ^= 0xFF; // corrupt a sequence-number byte
        let view = FrameView::new(&frame);
        assert!(!view.checksum_ok());
    }
}
