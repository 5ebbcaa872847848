//! The resumable packet encoder and decoder.

pub mod decoder;
pub mod encoder;

pub use decoder::{DecodeError, DecodeEvent, DecodeOutcome, Decoder};
pub use encoder::{EncodeError, EncodeOutcome, Encoder};

/// Identifies which application-side stream an encoder/decoder is currently
/// suspended on, so the caller can select on the right descriptor. A weak
/// reference in spirit - a relation plus a lookup, never ownership - but
/// rendered here as a plain `Copy` tag rather than a literal borrowed
/// object, since the caller already owns the stream implementation and only
/// needs to know *which* direction stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Blocked {
    OutboundPayload,
    InboundTopic,
    InboundPayload,
}
