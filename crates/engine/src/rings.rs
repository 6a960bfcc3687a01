//! Cross-thread ring type aliases: tick/trade rings, venue-request/response
//! rings, and the book-update ring, all `ring::Spsc`. One `VenueCommand`
//! carries either a submit or a cancel across the Engine→Venue I/O ring —
//! the `Venue` trait itself takes these as two separate calls, but a
//! single SPSC ring can only carry one message type, so the engine crate
//! (not `venue`, which stays a pure collaborator interface) owns this
//! envelope.

use book::OrderBookUpdate;
use feed::{Tick, Trade};
use lifecycle::VenueId;
use ring::Spsc;
use venue::{OrderRequest, VenueResponse};

use crate::config::{
    BOOK_UPDATE_RING_CAPACITY, TICK_RING_CAPACITY, TRADE_RING_CAPACITY, VENUE_REQUEST_RING_CAPACITY,
    VENUE_RESPONSE_RING_CAPACITY,
};

pub type TickRing = Spsc<Tick, TICK_RING_CAPACITY>;
pub type TradeRing = Spsc<Trade, TRADE_RING_CAPACITY>;
pub type VenueRequestRing = Spsc<VenueCommand, VENUE_REQUEST_RING_CAPACITY>;
pub type VenueResponseRing = Spsc<VenueResponse, VENUE_RESPONSE_RING_CAPACITY>;
pub type BookUpdateRing = Spsc<OrderBookUpdate, BOOK_UPDATE_RING_CAPACITY>;

/// `venue_id` names which configured venue a command targets — chosen by
/// `lifecycle::OrderLifecycleManager::route` before the command is ever
/// enqueued here; the `Venue` trait itself has no notion of a venue id
/// since a single `Venue` impl only ever represents one venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VenueCommand {
    Submit { venue_id: VenueId, request: OrderRequest },
    Cancel { venue_id: VenueId, order_id: u64 },
}
