//! The user-facing command structs held inside store entries until their
//! acknowledgement (or immediate completion, for QoS 0 and DISCONNECT).

use heapless::Vec;

use crate::io::PayloadReader;
use crate::types::{PacketIdentifier, QoS};

/// Upper bound on subscriptions/topics carried by a single SUBSCRIBE or
/// UNSUBSCRIBE command. A plain constant rather than another const-generic
/// parameter threaded through `Store`/`Client`: real brokers cap a single
/// SUBSCRIBE's topic count far below this anyway, and a fixed ceiling here
/// keeps the command/store types from growing another type parameter.
pub const MAX_SUBSCRIPTIONS: usize = 8;

#[derive(Clone, Copy)]
pub struct Will<'a> {
    pub topic: &'a str,
    pub message: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

#[derive(Clone, Copy)]
pub struct ConnectCommand<'a> {
    pub client_id: &'a str,
    pub clean_session: bool,
    pub keep_alive: u16,
    pub will: Option<Will<'a>>,
    pub user_name: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

/// An outbound PUBLISH. The payload is a borrowed `dyn PayloadReader`
/// rather than a generic type parameter: a trait object needs no
/// allocation (it is just a fat reference), and keeping it out of the type
/// parameter list is what lets `Store`/`Client` stay free of a payload-type
/// generic. The common case - a plain caller-owned buffer - is
/// [`crate::io::SliceReader`], which the caller constructs and keeps alive
/// for as long as this command is in flight.
pub struct PublishCommand<'a> {
    pub topic: &'a str,
    pub payload: &'a mut dyn PayloadReader,
    pub payload_len: u32,
    pub qos: QoS,
    pub retain: bool,
    pub packet_id: Option<PacketIdentifier>,
    /// Incremented each time the encoder finishes this recipe. Retained
    /// across reconnects (to set DUP on retransmission), never incremented
    /// for in-session retries since none exist.
    pub encode_count: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Subscription<'a> {
    pub topic: &'a str,
    pub requested_qos: QoS,
}

pub struct SubscribeCommand<'a> {
    pub subscriptions: Vec<Subscription<'a>, MAX_SUBSCRIPTIONS>,
    pub packet_id: PacketIdentifier,
}

pub struct UnsubscribeCommand<'a> {
    pub topics: Vec<&'a str, MAX_SUBSCRIPTIONS>,
    pub packet_id: PacketIdentifier,
}

/// The payload of a store entry: everything the encoder needs to replay a
/// submitted command, and everything the client needs to identify it again
/// on acknowledgement.
pub enum Command<'a> {
    Connect(ConnectCommand<'a>),
    Publish(PublishCommand<'a>),
    Subscribe(SubscribeCommand<'a>),
    Unsubscribe(UnsubscribeCommand<'a>),
    /// Re-classification of an inbound-acked QoS-2 PUBLISH: once its PUBREC
    /// is observed, the original PUBLISH entry is replaced by this so the
    /// encoder emits PUBREL and the store awaits PUBCOMP under the same id.
    Pubrel(PacketIdentifier),
    Pingreq,
    Disconnect,
    /// Fire-and-forget replies to an inbound PUBLISH/PUBREL. These never
    /// await a further reply, so the encoder drops them the moment they are
    /// fully written, the same way it treats QoS-0 PUBLISH.
    Puback(PacketIdentifier),
    Pubrec(PacketIdentifier),
    Pubcomp(PacketIdentifier),
}

impl<'a> Command<'a> {
    pub fn packet_id(&self) -> Option<PacketIdentifier> {
        match self {
            Command::Connect(_) | Command::Pingreq | Command::Disconnect => None,
            Command::Publish(p) => p.packet_id,
            Command::Subscribe(s) => Some(s.packet_id),
            Command::Unsubscribe(u) => Some(u.packet_id),
            Command::Pubrel(id) | Command::Puback(id) | Command::Pubrec(id) | Command::Pubcomp(id) => {
                Some(*id)
            }
        }
    }

    pub fn kind(&self) -> super::Kind {
        match self {
            Command::Connect(_) => super::Kind::Connect,
            Command::Publish(p) => match p.qos {
                QoS::AtMostOnce => super::Kind::Publish0,
                QoS::AtLeastOnce => super::Kind::Publish1,
                QoS::ExactlyOnce => super::Kind::Publish2,
            },
            Command::Subscribe(_) => super::Kind::Subscribe,
            Command::Unsubscribe(_) => super::Kind::Unsubscribe,
            Command::Pubrel(_) => super::Kind::Pubrel,
            Command::Pingreq => super::Kind::Pingreq,
            Command::Disconnect => super::Kind::Disconnect,
            Command::Puback(_) => super::Kind::Puback,
            Command::Pubrec(_) => super::Kind::Pubrec,
            Command::Pubcomp(_) => super::Kind::Pubcomp,
        }
    }
}
