//! The Ingress thread: reads raw frames off a market-data source and
//! decodes them into the tick/trade rings via [`feed::FeedHandler`].
//! Generalized from one fixed socket source to any [`FrameSource`] so a
//! demo/backtest can drive the same pipeline as a live multicast feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use feed::FeedHandler;

use crate::rings::{TickRing, TradeRing};

/// Supplies raw wire frames to the ingress loop. A live implementation
/// reads a multicast socket or kernel-bypass queue; [`crate::demo`]-style
/// callers can implement this over a synthetic or file-replayed frame
/// sequence. `poll` should be non-blocking or short-blocking — it runs on
/// the dedicated ingress thread, so there is no harm in it taking a few
/// microseconds, but it must return under shutdown pressure.
pub trait FrameSource: Send {
    /// Fills as much of `buf` as there is data for, a whole number of
    /// 64-byte frames, and returns the number of bytes written (`0` if
    /// there is nothing ready right now).
    fn poll(&mut self, buf: &mut [u8]) -> usize;
}

/// Frames are read in chunks of this many bytes, large enough to absorb a
/// burst without the ingress thread falling behind the wire, matching the
/// teacher's NIC-ring read-batch sizing convention.
const READ_BUF_BYTES: usize = 64 * 1024;

pub struct IngressContext {
    source: Box<dyn FrameSource>,
    handler: FeedHandler,
    tick_ring: Arc<TickRing>,
    trade_ring: Arc<TradeRing>,
}

impl IngressContext {
    #[must_use]
    pub fn new(source: Box<dyn FrameSource>, tick_ring: Arc<TickRing>, trade_ring: Arc<TradeRing>) -> Self {
        Self { source, handler: FeedHandler::new(), tick_ring, trade_ring }
    }

    #[must_use]
    pub fn handler(&self) -> &FeedHandler {
        &self.handler
    }

    fn run_cycle(&mut self, buf: &mut [u8]) -> usize {
        let n = self.source.poll(buf);
        if n == 0 {
            return 0;
        }
        self.handler.process_batch(&buf[..n], &self.tick_ring, &self.trade_ring)
    }
}

/// Drives [`IngressContext::run_cycle`] until `shutdown` is set.
pub fn run(ctx: &mut IngressContext, shutdown: Arc<AtomicBool>) {
    let mut buf = vec![0u8; READ_BUF_BYTES];
    let mut idle_cycles = 0u32;
    while !shutdown.load(Ordering::Relaxed) {
        let decoded = ctx.run_cycle(&mut buf);
        if decoded == 0 {
            idle_cycles += 1;
            if idle_cycles > 64 {
                std::thread::yield_now();
            }
        } else {
            idle_cycles = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Instrument;
    use ring::Spsc;

    struct OnceSource {
        frame: Option<Vec<u8>>,
    }

    impl FrameSource for OnceSource {
        fn poll(&mut self, buf: &mut [u8]) -> usize {
            let Some(frame) = self.frame.take() else { return 0 };
            buf[..frame.len()].copy_from_slice(&frame);
            frame.len()
        }
    }

    fn tick_frame(sequence: u64, instrument_id: u32) -> Vec<u8> {
        let mut frame = vec![0u8; feed::FRAME_LEN];
        frame[0..8].copy_from_slice(&sequence.to_le_bytes());
        frame[8..16].copy_from_slice(&1_000u64.to_le_bytes());
        frame[16..20].copy_from_slice(&(feed::MessageType::Tick as u32).to_le_bytes());
        frame[20..24].copy_from_slice(&instrument_id.to_le_bytes());
        frame[24..32].copy_from_slice(&100.5f64.to_le_bytes());
        frame[32..40].copy_from_slice(&100.53125f64.to_le_bytes());
        frame[40..48].copy_from_slice(&5_000_000u64.to_le_bytes());
        frame[48..56].copy_from_slice(&4_000_000u64.to_le_bytes());
        let checksum = feed::frame::compute_checksum(&frame[..56]);
        frame[56..58].copy_from_slice(&checksum.to_le_bytes());
        frame
    }

    #[test]
    fn a_frame_from_the_source_reaches_the_tick_ring() {
        let tick_ring: Arc<TickRing> = Arc::new(Spsc::new());
        let trade_ring: Arc<TradeRing> = Arc::new(Spsc::new());
        let source = Box::new(OnceSource { frame: Some(tick_frame(0, 1)) });
        let mut ctx = IngressContext::new(source, tick_ring.clone(), trade_ring);

        let mut buf = vec![0u8; READ_BUF_BYTES];
        let decoded = ctx.run_cycle(&mut buf);
        assert_eq!(decoded, 1);
        let tick = tick_ring.try_pop().expect("tick decoded");
        assert_eq!(tick.instrument, Instrument::Bill3M);
    }
}
