//! The fixed header shared by every MQTT packet: one type+flags byte
//! followed by the remaining-length variable byte integer.

use crate::varint::{self, PushOutcome, VarIntDecoder};

/// The 4-bit packet type nibble, MQTT 3.1.1 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    Connect = 1,
    Connack = 2,
    Publish = 3,
    Puback = 4,
    Pubrec = 5,
    Pubrel = 6,
    Pubcomp = 7,
    Subscribe = 8,
    Suback = 9,
    Unsubscribe = 10,
    Unsuback = 11,
    Pingreq = 12,
    Pingresp = 13,
    Disconnect = 14,
}

impl PacketType {
    pub const fn from_nibble(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::Connect,
            2 => Self::Connack,
            3 => Self::Publish,
            4 => Self::Puback,
            5 => Self::Pubrec,
            6 => Self::Pubrel,
            7 => Self::Pubcomp,
            8 => Self::Subscribe,
            9 => Self::Suback,
            10 => Self::Unsubscribe,
            11 => Self::Unsuback,
            12 => Self::Pingreq,
            13 => Self::Pingresp,
            14 => Self::Disconnect,
            _ => return None,
        })
    }

    pub const fn nibble(self) -> u8 {
        self as u8
    }

    /// Whether a nonzero flags nibble other than the fixed pattern required
    /// for this type is a protocol violation. PUBLISH is the only type whose
    /// flags carry meaningful per-packet bits (DUP/QoS/RETAIN).
    pub const fn expected_flags(self) -> Option<u8> {
        match self {
            Self::Publish => None,
            Self::Pubrel | Self::Subscribe | Self::Unsubscribe => Some(0b0010),
            _ => Some(0b0000),
        }
    }
}

/// Decoded fixed header: packet type, flags nibble, and remaining length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixedHeaderError {
    InvalidType,
    InvalidFlags,
    InvalidRemainingLength,
}

/// Resumable decoder: the first byte, then the remaining-length varint,
/// byte at a time.
#[derive(Debug, Clone, Copy)]
pub enum FixedHeaderDecoder {
    AwaitingFirstByte,
    AwaitingLength { type_and_flags: u8, varint: VarIntDecoder },
}

impl Default for FixedHeaderDecoder {
    fn default() -> Self {
        Self::AwaitingFirstByte
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedHeaderStep {
    Continue,
    Done(FixedHeader),
    Error(FixedHeaderError),
}

impl FixedHeaderDecoder {
    pub const fn new() -> Self {
        Self::AwaitingFirstByte
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn push(&mut self, byte: u8) -> FixedHeaderStep {
        match *self {
            Self::AwaitingFirstByte => {
                let type_nibble = byte >> 4;
                let flags = byte & 0x0f;
                let Some(packet_type) = PacketType::from_nibble(type_nibble) else {
                    return FixedHeaderStep::Error(FixedHeaderError::InvalidType);
                };
                if let Some(expected) = packet_type.expected_flags() {
                    if flags != expected {
                        return FixedHeaderStep::Error(FixedHeaderError::InvalidFlags);
                    }
                }
                *self = Self::AwaitingLength {
                    type_and_flags: byte,
                    varint: VarIntDecoder::new(),
                };
                FixedHeaderStep::Continue
            }
            Self::AwaitingLength {
                type_and_flags,
                mut varint,
            } => {
                match varint.push(byte) {
                    PushOutcome::Continue => {
                        *self = Self::AwaitingLength {
                            type_and_flags,
                            varint,
                        };
                        FixedHeaderStep::Continue
                    }
                    PushOutcome::Done(remaining_length) => {
                        // unwrap: the first-byte arm already validated the nibble.
                        let packet_type =
                            PacketType::from_nibble(type_and_flags >> 4).unwrap();
                        let header = FixedHeader {
                            packet_type,
                            flags: type_and_flags & 0x0f,
                            remaining_length,
                        };
                        *self = Self::AwaitingFirstByte;
                        FixedHeaderStep::Done(header)
                    }
                    PushOutcome::Invalid => {
                        FixedHeaderStep::Error(FixedHeaderError::InvalidRemainingLength)
                    }
                }
            }
        }
    }
}

/// Writes a complete fixed header into `dst` in one shot (fixed headers are
/// at most 5 bytes and always fit the 16-byte encode scratch, so the encoder
/// never needs to resume mid-header).
pub fn encode_fixed_header(header: FixedHeader, dst: &mut [u8]) -> Option<usize> {
    if dst.is_empty() {
        return None;
    }
    dst[0] = (header.packet_type.nibble() << 4) | header.flags;
    let len = varint::encode(header.remaining_length, &mut dst[1..])?;
    Some(1 + len)
}

#[cfg(test)]
mod unit {
    use super::*;

    fn decode_all(bytes: &[u8]) -> FixedHeaderStep {
        let mut dec = FixedHeaderDecoder::new();
        let mut last = FixedHeaderStep::Continue;
        for &b in bytes {
            last = dec.push(b);
            if !matches!(last, FixedHeaderStep::Continue) {
                break;
            }
        }
        last
    }

    #[test]
    fn decodes_connack_header() {
        let step = decode_all(&[0x20, 0x02]);
        assert_eq!(
            step,
            FixedHeaderStep::Done(FixedHeader {
                packet_type: PacketType::Connack,
                flags: 0,
                remaining_length: 2,
            })
        );
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(
            decode_all(&[0x00]),
            FixedHeaderStep::Error(FixedHeaderError::InvalidType)
        );
    }

    #[test]
    fn rejects_bad_flags_on_pubrel() {
        // PUBREL requires flags == 0b0010.
        assert_eq!(
            decode_all(&[0x60]),
            FixedHeaderStep::Error(FixedHeaderError::InvalidFlags)
        );
    }

    #[test]
    fn publish_allows_any_flags() {
        let step = decode_all(&[0x3d, 0x00]);
        assert_eq!(
            step,
            FixedHeaderStep::Done(FixedHeader {
                packet_type: PacketType::Publish,
                flags: 0x0d,
                remaining_length: 0,
            })
        );
    }

    #[test]
    fn round_trips_encode_decode() {
        let header = FixedHeader {
            packet_type: PacketType::Publish,
            flags: 0b0010,
            remaining_length: 321,
        };
        let mut buf = [0u8; 5];
        let len = encode_fixed_header(header, &mut buf).unwrap();
        assert_eq!(decode_all(&buf[..len]), FixedHeaderStep::Done(header));
    }
}
