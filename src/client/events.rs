//! The single trait a caller implements to receive command completions and
//! inbound PUBLISH deliveries.
//!
//! A completion callback is naturally "one per entry" in a description of
//! the engine, but the original reference implementation this engine is
//! modeled on dispatches by *kind* instead - one function pointer for
//! connect acks, one for subscribe acks, and so on, each given the specific
//! packet data, and the inbound-payload write callback is itself a plain
//! method taking an opaque `state` pointer rather than a separate streaming
//! object. That shape translates directly into a single Rust trait: a
//! caller implements [`ClientEvents`] once, and [`Client`](crate::client::Client)
//! is generic over it, monomorphizing the dispatch the same way it
//! monomorphizes over its [`Transport`](crate::io::Transport). Keeping the
//! topic/payload write methods directly on this trait (instead of handing
//! out a separate `&mut dyn PayloadWriter` sink) sidesteps having to keep a
//! borrow of the caller's state alive across suspended `decode` calls.

use crate::io::IoResult;
use crate::types::{QoS, SubscribeReturnCode};

/// The outcome of asking the caller for storage for an inbound topic or
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Allocate {
    /// Storage accepted; bytes will be streamed in via `write_topic`/
    /// `write_payload`.
    Use,
    /// Discard the remaining bytes of this field but keep wire-level
    /// parsing synchronized (framing is still consumed).
    Ignore,
    /// Fatal: promotes the client to the failed state.
    Error,
}

/// Per-topic SUBACK result.
pub type SubscribeResult = SubscribeReturnCode;

/// Receives command completions and inbound PUBLISH deliveries.
///
/// Every method is synchronous and must not block: an inbound PUBLISH's
/// `on_publish` and `on_publish_deallocate` in particular run inline with
/// decode, matching the same constraint placed on the encoder's own
/// sub-encoders.
pub trait ClientEvents {
    /// Asks for storage for an inbound PUBLISH topic of `len` bytes.
    fn allocate_topic(&mut self, len: u16) -> Allocate;
    /// Streams the next chunk of the topic into whatever storage
    /// `allocate_topic` committed to. Only called after `Allocate::Use`.
    fn write_topic(&mut self, chunk: &[u8]) -> IoResult<usize>;

    /// Asks for storage for an inbound PUBLISH payload of `len` bytes.
    fn allocate_payload(&mut self, len: u32) -> Allocate;
    fn write_payload(&mut self, chunk: &[u8]) -> IoResult<usize>;

    /// Called once a fully-received PUBLISH (that wasn't ignored, and isn't
    /// a duplicate QoS-2 delivery) is ready for delivery. Returns whether
    /// the application accepted it; `false` does not fail the connection,
    /// it only affects the boolean the original message-processing API
    /// surfaces.
    fn on_publish(&mut self, qos: QoS, retain: bool) -> bool;

    /// Invoked after `on_publish` (success or ignored) or after an error,
    /// so the caller can release whatever storage it committed to via
    /// `allocate_topic`/`allocate_payload`.
    fn on_publish_deallocate(&mut self);

    fn on_connect(&mut self, succeeded: bool, session_present: bool);
    fn on_publish_done(&mut self, packet_id: Option<u16>, succeeded: bool);
    fn on_subscribe(&mut self, packet_id: u16, results: &[SubscribeResult]);
    fn on_unsubscribe(&mut self, packet_id: u16, succeeded: bool);
}
