//! The resumable packet decoder: parses one inbound packet at a time,
//! popping/enqueueing store entries and firing [`ClientEvents`] callbacks as
//! each one completes.
//!
//! Mirrors [`super::encoder::Encoder`] in shape - a small `Phase` state
//! machine advanced one wire byte (or one streamed chunk, for PUBLISH's
//! topic/payload) at a time - but it additionally owns the store/id-set
//! bookkeeping the original reference implementation's per-kind decoder
//! table performs inline: popping the command an ack completes, or
//! enqueueing the reply an inbound PUBLISH/PUBREL demands.

use crate::client::events::{Allocate, ClientEvents};
use crate::clock::Instant;
use crate::header::{FixedHeader, FixedHeaderDecoder, FixedHeaderError, FixedHeaderStep, PacketType};
use crate::idset::PacketIdSet;
use crate::io::IoResult;
use crate::store::{Command, Kind, Store, MAX_SUBSCRIPTIONS};
use crate::types::{ConnectReturnCode, PacketIdentifier, QoS, SubscribeReturnCode};

use super::Blocked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    FixedHeaderInvalidType,
    FixedHeaderInvalidFlags,
    FixedHeaderInvalidRemainingLength,
    ConnackInvalidAckFlags,
    ConnackInvalidReturnCode,
    ConnackInvalidLength,
    PublishInvalidLength,
    PublishIdSetFull,
    PublishAllocateTopicFailed,
    PublishAllocatePayloadFailed,
    PublishWriteTopicFailed,
    PublishWritePayloadFailed,
    DecodeNonzeroRemainingLength,
    /// PUBACK/PUBREC/PUBREL/PUBCOMP/UNSUBACK's remaining length was not the
    /// fixed two bytes a packet identifier takes.
    AckInvalidLength,
    SubackInvalidLength,
    SubackInvalidReturnCode,
    /// A reply this decoder needed to enqueue (PUBACK/PUBREC/PUBCOMP) found
    /// the store full. Not in the original's taxonomy - its store is sized
    /// to never hit this in practice, but this binding surfaces a fixed
    /// capacity the caller chose, so the failure needs a name.
    ReplyQueueFull,
}

impl From<FixedHeaderError> for DecodeError {
    fn from(e: FixedHeaderError) -> Self {
        match e {
            FixedHeaderError::InvalidType => Self::FixedHeaderInvalidType,
            FixedHeaderError::InvalidFlags => Self::FixedHeaderInvalidFlags,
            FixedHeaderError::InvalidRemainingLength => Self::FixedHeaderInvalidRemainingLength,
        }
    }
}

/// What just finished. Every kind already had its `ClientEvents` callback
/// fired by the time this is returned; CONNACK additionally carries the
/// session bookkeeping the client-level state machine needs to decide which
/// store becomes current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeEvent {
    Other,
    Connack {
        accepted: bool,
        session_present: bool,
        clean_session: bool,
        keep_alive: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeOutcome {
    Ready(DecodeEvent),
    WouldBlock,
    Continue,
    Err(DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    ConnackFlags,
    ConnackCode,
    PublishTopicLenHi,
    PublishTopicLenLo,
    PublishTopicBody,
    PublishPacketIdHi,
    PublishPacketIdLo,
    PublishPayloadBody,
    SimpleIdHi,
    SimpleIdLo,
    SubackReturnCodes,
    NoBody,
}

/// Resumable decoder. Holds only per-in-progress-packet state; the store,
/// id set and event sink are borrowed for the duration of each `decode`
/// call rather than owned.
pub struct Decoder {
    header_decoder: FixedHeaderDecoder,
    header: Option<FixedHeader>,
    phase: Phase,
    scratch: [u8; 2],
    topic_len: u16,
    qos: QoS,
    retain: bool,
    packet_id: u16,
    topic_allocate: Allocate,
    payload_allocate: Allocate,
    is_duplicate_qos2: bool,
    remaining_in_field: u32,
    suback_codes: [u8; MAX_SUBSCRIPTIONS],
    suback_filled: usize,
    suback_total: usize,
    blocked: Option<Blocked>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub const fn new() -> Self {
        Self {
            header_decoder: FixedHeaderDecoder::new(),
            header: None,
            phase: Phase::Header,
            scratch: [0; 2],
            topic_len: 0,
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: 0,
            topic_allocate: Allocate::Ignore,
            payload_allocate: Allocate::Ignore,
            is_duplicate_qos2: false,
            remaining_in_field: 0,
            suback_codes: [0; MAX_SUBSCRIPTIONS],
            suback_filled: 0,
            suback_total: 0,
            blocked: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Which application-side stream, if any, the last `decode` call
    /// suspended on.
    pub fn blocking_stream(&self) -> Option<Blocked> {
        self.blocked
    }

    fn reset_for_next_packet(&mut self) {
        self.phase = Phase::Header;
        self.header = None;
        self.is_duplicate_qos2 = false;
    }

    fn start_body(&mut self, header: FixedHeader) -> Result<(), DecodeError> {
        self.header = Some(header);
        match header.packet_type {
            PacketType::Connack => {
                if header.remaining_length != 2 {
                    return Err(DecodeError::ConnackInvalidLength);
                }
                self.phase = Phase::ConnackFlags;
            }
            PacketType::Publish => {
                if header.remaining_length == 0 {
                    return Err(DecodeError::PublishInvalidLength);
                }
                self.retain = header.flags & 0x01 != 0;
                self.qos = QoS::try_from_bits((header.flags >> 1) & 0x03)
                    .map_err(|()| DecodeError::PublishInvalidLength)?;
                self.is_duplicate_qos2 = false;
                self.phase = Phase::PublishTopicLenHi;
            }
            PacketType::Puback
            | PacketType::Pubrec
            | PacketType::Pubrel
            | PacketType::Pubcomp
            | PacketType::Unsuback => {
                if header.remaining_length != 2 {
                    return Err(DecodeError::AckInvalidLength);
                }
                self.phase = Phase::SimpleIdHi;
            }
            PacketType::Suback => {
                if header.remaining_length < 3 {
                    return Err(DecodeError::SubackInvalidLength);
                }
                let total = (header.remaining_length - 2) as usize;
                if total > MAX_SUBSCRIPTIONS {
                    return Err(DecodeError::SubackInvalidLength);
                }
                self.suback_total = total;
                self.suback_filled = 0;
                self.phase = Phase::SimpleIdHi;
            }
            PacketType::Pingresp => {
                if header.remaining_length != 0 {
                    return Err(DecodeError::DecodeNonzeroRemainingLength);
                }
                self.phase = Phase::NoBody;
            }
            PacketType::Connect | PacketType::Subscribe | PacketType::Unsubscribe | PacketType::Pingreq => {
                // These are outbound-only types; seeing one from the wire is
                // a protocol violation indistinguishable from an unknown type.
                return Err(DecodeError::FixedHeaderInvalidType);
            }
        }
        Ok(())
    }

    fn enter_publish_payload<E: ClientEvents>(
        &mut self,
        payload_len: u32,
        events: &mut E,
    ) -> Result<(), DecodeError> {
        self.remaining_in_field = payload_len;
        self.payload_allocate = if self.qos == QoS::ExactlyOnce && self.is_duplicate_qos2 {
            Allocate::Ignore
        } else {
            match events.allocate_payload(payload_len) {
                Allocate::Error => return Err(DecodeError::PublishAllocatePayloadFailed),
                other => other,
            }
        };
        self.phase = Phase::PublishPayloadBody;
        Ok(())
    }

    fn finish_packet<'a, const N: usize, const ID_N: usize, E: ClientEvents>(
        &mut self,
        store: &mut Store<'a, N>,
        ids: &mut PacketIdSet<ID_N>,
        events: &mut E,
        now: Instant,
    ) -> Result<DecodeEvent, DecodeError> {
        let header = self.header.expect("finish_packet only runs with a header set");
        match header.packet_type {
            PacketType::Connack => {
                let flags = self.scratch[0];
                if flags & 0xfe != 0 {
                    return Err(DecodeError::ConnackInvalidAckFlags);
                }
                let session_present = flags & 0x01 != 0;
                let code = ConnectReturnCode::from_u8(self.scratch[1])
                    .ok_or(DecodeError::ConnackInvalidReturnCode)?;
                let accepted = code.is_accepted();
                let (clean_session, keep_alive) = match store.pop_marked_by(Kind::Connect, None) {
                    Some(Command::Connect(c)) => (c.clean_session, c.keep_alive),
                    _ => (false, 0),
                };
                events.on_connect(accepted, session_present);
                Ok(DecodeEvent::Connack {
                    accepted,
                    session_present,
                    clean_session,
                    keep_alive,
                })
            }
            PacketType::Publish => {
                let qos = self.qos;
                let retain = self.retain;
                if qos == QoS::ExactlyOnce && self.is_duplicate_qos2 {
                    events.on_publish_deallocate();
                    let pid = PacketIdentifier::from_u16(self.packet_id)
                        .expect("packet id was validated nonzero while parsing");
                    store
                        .append(Kind::Pubrec, Some(pid), Command::Pubrec(pid), now)
                        .map_err(|_| DecodeError::ReplyQueueFull)?;
                    return Ok(DecodeEvent::Other);
                }
                events.on_publish(qos, retain);
                events.on_publish_deallocate();
                match qos {
                    QoS::AtMostOnce => {}
                    QoS::AtLeastOnce => {
                        let pid = PacketIdentifier::from_u16(self.packet_id)
                            .expect("packet id was validated nonzero while parsing");
                        store
                            .append(Kind::Puback, Some(pid), Command::Puback(pid), now)
                            .map_err(|_| DecodeError::ReplyQueueFull)?;
                    }
                    QoS::ExactlyOnce => {
                        let pid = PacketIdentifier::from_u16(self.packet_id)
                            .expect("packet id was validated nonzero while parsing");
                        ids.insert(self.packet_id)
                            .map_err(|_| DecodeError::PublishIdSetFull)?;
                        store
                            .append(Kind::Pubrec, Some(pid), Command::Pubrec(pid), now)
                            .map_err(|_| DecodeError::ReplyQueueFull)?;
                    }
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Puback => {
                let id = u16::from_be_bytes(self.scratch);
                if let Some(pid) = PacketIdentifier::from_u16(id) {
                    if store.pop_marked_by(Kind::Publish1, Some(pid)).is_some() {
                        events.on_publish_done(Some(id), true);
                    }
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Pubrec => {
                let id = u16::from_be_bytes(self.scratch);
                if let Some(pid) = PacketIdentifier::from_u16(id) {
                    if store.pop_marked_by(Kind::Publish2, Some(pid)).is_some() {
                        // The entry we just popped frees exactly the slot
                        // this re-append needs, so capacity can't run out.
                        let _ = store.append(Kind::Pubrel, Some(pid), Command::Pubrel(pid), now);
                    }
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Pubrel => {
                let id = u16::from_be_bytes(self.scratch);
                ids.remove(id);
                if let Some(pid) = PacketIdentifier::from_u16(id) {
                    store
                        .append(Kind::Pubcomp, Some(pid), Command::Pubcomp(pid), now)
                        .map_err(|_| DecodeError::ReplyQueueFull)?;
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Pubcomp => {
                let id = u16::from_be_bytes(self.scratch);
                if let Some(pid) = PacketIdentifier::from_u16(id) {
                    if store.pop_marked_by(Kind::Pubrel, Some(pid)).is_some() {
                        events.on_publish_done(Some(id), true);
                    }
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Suback => {
                let id = u16::from_be_bytes(self.scratch);
                let popped = PacketIdentifier::from_u16(id).and_then(|pid| store.pop_marked_by(Kind::Subscribe, Some(pid)));
                if let Some(Command::Subscribe(sub)) = &popped {
                    if sub.subscriptions.len() != self.suback_filled {
                        return Err(DecodeError::SubackInvalidLength);
                    }
                }
                let mut results = [SubscribeReturnCode::Failure; MAX_SUBSCRIPTIONS];
                for (slot, byte) in results.iter_mut().zip(&self.suback_codes[..self.suback_filled]) {
                    *slot = SubscribeReturnCode::from_u8(*byte).ok_or(DecodeError::SubackInvalidReturnCode)?;
                }
                events.on_subscribe(id, &results[..self.suback_filled]);
                Ok(DecodeEvent::Other)
            }
            PacketType::Unsuback => {
                let id = u16::from_be_bytes(self.scratch);
                if let Some(pid) = PacketIdentifier::from_u16(id) {
                    if store.pop_marked_by(Kind::Unsubscribe, Some(pid)).is_some() {
                        events.on_unsubscribe(id, true);
                    }
                }
                Ok(DecodeEvent::Other)
            }
            PacketType::Pingresp => {
                let _ = store.pop_marked_by(Kind::Pingreq, None);
                Ok(DecodeEvent::Other)
            }
            _ => Err(DecodeError::FixedHeaderInvalidType),
        }
    }

    /// Consumes bytes from `src` until one packet is fully decoded and
    /// dispatched, the buffer is exhausted mid-packet, an inbound payload
    /// stream blocks, or an error occurs. Returns the outcome and how many
    /// bytes of `src` were consumed.
    pub fn decode<'a, const N: usize, const ID_N: usize, E: ClientEvents>(
        &mut self,
        store: &mut Store<'a, N>,
        ids: &mut PacketIdSet<ID_N>,
        events: &mut E,
        src: &[u8],
        now: Instant,
    ) -> (DecodeOutcome, usize) {
        self.blocked = None;
        let mut consumed = 0usize;
        loop {
            match self.phase {
                Phase::Header => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    let byte = src[consumed];
                    consumed += 1;
                    match self.header_decoder.push(byte) {
                        FixedHeaderStep::Continue => continue,
                        FixedHeaderStep::Error(e) => return (DecodeOutcome::Err(e.into()), consumed),
                        FixedHeaderStep::Done(header) => match self.start_body(header) {
                            Ok(()) => continue,
                            Err(e) => return (DecodeOutcome::Err(e), consumed),
                        },
                    }
                }
                Phase::ConnackFlags => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[0] = src[consumed];
                    consumed += 1;
                    self.phase = Phase::ConnackCode;
                }
                Phase::ConnackCode => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[1] = src[consumed];
                    consumed += 1;
                    match self.finish_packet(store, ids, events, now) {
                        Ok(event) => {
                            self.reset_for_next_packet();
                            return (DecodeOutcome::Ready(event), consumed);
                        }
                        Err(e) => return (DecodeOutcome::Err(e), consumed),
                    }
                }
                Phase::PublishTopicLenHi => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[0] = src[consumed];
                    consumed += 1;
                    self.phase = Phase::PublishTopicLenLo;
                }
                Phase::PublishTopicLenLo => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[1] = src[consumed];
                    consumed += 1;
                    let topic_len = u16::from_be_bytes(self.scratch);
                    if topic_len == 0 {
                        return (DecodeOutcome::Err(DecodeError::PublishInvalidLength), consumed);
                    }
                    let header = self.header.expect("set in start_body");
                    let id_bytes: u32 = if self.qos != QoS::AtMostOnce { 2 } else { 0 };
                    let needed = 2u32 + topic_len as u32 + id_bytes;
                    if needed > header.remaining_length {
                        return (DecodeOutcome::Err(DecodeError::PublishInvalidLength), consumed);
                    }
                    self.topic_len = topic_len;
                    self.remaining_in_field = topic_len as u32;
                    self.topic_allocate = match events.allocate_topic(topic_len) {
                        Allocate::Error => {
                            return (DecodeOutcome::Err(DecodeError::PublishAllocateTopicFailed), consumed)
                        }
                        other => other,
                    };
                    self.phase = Phase::PublishTopicBody;
                }
                Phase::PublishTopicBody => {
                    if self.remaining_in_field == 0 {
                        if self.qos == QoS::AtMostOnce {
                            let header = self.header.expect("set in start_body");
                            let payload_len = header.remaining_length - 2 - self.topic_len as u32;
                            if let Err(e) = self.enter_publish_payload(payload_len, events) {
                                return (DecodeOutcome::Err(e), consumed);
                            }
                        } else {
                            self.phase = Phase::PublishPacketIdHi;
                        }
                        continue;
                    }
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    let want = core::cmp::min(src.len() - consumed, self.remaining_in_field as usize);
                    let chunk = &src[consumed..consumed + want];
                    match self.topic_allocate {
                        Allocate::Use => match events.write_topic(chunk) {
                            IoResult::Ready(n) => {
                                consumed += n;
                                self.remaining_in_field -= n as u32;
                            }
                            IoResult::WouldBlock => {
                                self.blocked = Some(Blocked::InboundTopic);
                                return (DecodeOutcome::WouldBlock, consumed);
                            }
                            IoResult::Err(_) => {
                                return (DecodeOutcome::Err(DecodeError::PublishWriteTopicFailed), consumed)
                            }
                        },
                        Allocate::Ignore => {
                            consumed += want;
                            self.remaining_in_field -= want as u32;
                        }
                        Allocate::Error => unreachable!("Error is resolved at allocate time"),
                    }
                }
                Phase::PublishPacketIdHi => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[0] = src[consumed];
                    consumed += 1;
                    self.phase = Phase::PublishPacketIdLo;
                }
                Phase::PublishPacketIdLo => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[1] = src[consumed];
                    consumed += 1;
                    self.packet_id = u16::from_be_bytes(self.scratch);
                    if self.packet_id == 0 {
                        return (DecodeOutcome::Err(DecodeError::PublishInvalidLength), consumed);
                    }
                    if self.qos == QoS::ExactlyOnce {
                        self.is_duplicate_qos2 = ids.contains(self.packet_id);
                    }
                    let header = self.header.expect("set in start_body");
                    let payload_len = header.remaining_length - 2 - self.topic_len as u32 - 2;
                    if let Err(e) = self.enter_publish_payload(payload_len, events) {
                        return (DecodeOutcome::Err(e), consumed);
                    }
                }
                Phase::PublishPayloadBody => {
                    if self.remaining_in_field == 0 {
                        match self.finish_packet(store, ids, events, now) {
                            Ok(event) => {
                                self.reset_for_next_packet();
                                return (DecodeOutcome::Ready(event), consumed);
                            }
                            Err(e) => return (DecodeOutcome::Err(e), consumed),
                        }
                    }
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    let want = core::cmp::min(src.len() - consumed, self.remaining_in_field as usize);
                    let chunk = &src[consumed..consumed + want];
                    match self.payload_allocate {
                        Allocate::Use => match events.write_payload(chunk) {
                            IoResult::Ready(n) => {
                                consumed += n;
                                self.remaining_in_field -= n as u32;
                            }
                            IoResult::WouldBlock => {
                                self.blocked = Some(Blocked::InboundPayload);
                                return (DecodeOutcome::WouldBlock, consumed);
                            }
                            IoResult::Err(_) => {
                                return (DecodeOutcome::Err(DecodeError::PublishWritePayloadFailed), consumed)
                            }
                        },
                        Allocate::Ignore => {
                            consumed += want;
                            self.remaining_in_field -= want as u32;
                        }
                        Allocate::Error => unreachable!("Error is resolved at allocate time"),
                    }
                }
                Phase::SimpleIdHi => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[0] = src[consumed];
                    consumed += 1;
                    self.phase = Phase::SimpleIdLo;
                }
                Phase::SimpleIdLo => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.scratch[1] = src[consumed];
                    consumed += 1;
                    let header = self.header.expect("set in start_body");
                    if header.packet_type == PacketType::Suback {
                        self.phase = Phase::SubackReturnCodes;
                    } else {
                        match self.finish_packet(store, ids, events, now) {
                            Ok(event) => {
                                self.reset_for_next_packet();
                                return (DecodeOutcome::Ready(event), consumed);
                            }
                            Err(e) => return (DecodeOutcome::Err(e), consumed),
                        }
                    }
                }
                Phase::SubackReturnCodes => {
                    if consumed >= src.len() {
                        return (DecodeOutcome::Continue, consumed);
                    }
                    self.suback_codes[self.suback_filled] = src[consumed];
                    consumed += 1;
                    self.suback_filled += 1;
                    if self.suback_filled == self.suback_total {
                        match self.finish_packet(store, ids, events, now) {
                            Ok(event) => {
                                self.reset_for_next_packet();
                                return (DecodeOutcome::Ready(event), consumed);
                            }
                            Err(e) => return (DecodeOutcome::Err(e), consumed),
                        }
                    }
                }
                Phase::NoBody => match self.finish_packet(store, ids, events, now) {
                    Ok(event) => {
                        self.reset_for_next_packet();
                        return (DecodeOutcome::Ready(event), consumed);
                    }
                    Err(e) => return (DecodeOutcome::Err(e), consumed),
                },
            }
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::store::{Command, ConnectCommand, Kind};
    use heapless::Vec as HVec;

    struct FakeEvents {
        topic_buf: [u8; 32],
        topic_len: usize,
        payload_buf: [u8; 32],
        payload_len: usize,
        publish_calls: usize,
        deallocate_calls: usize,
        connect_calls: HVec<(bool, bool), 4>,
        publish_done_calls: HVec<(Option<u16>, bool), 4>,
        subscribe_calls: HVec<u16, 4>,
    }

    impl FakeEvents {
        fn new() -> Self {
            Self {
                topic_buf: [0; 32],
                topic_len: 0,
                payload_buf: [0; 32],
                payload_len: 0,
                publish_calls: 0,
                deallocate_calls: 0,
                connect_calls: HVec::new(),
                publish_done_calls: HVec::new(),
                subscribe_calls: HVec::new(),
            }
        }

        fn topic(&self) -> &[u8] {
            &self.topic_buf[..self.topic_len]
        }

        fn payload(&self) -> &[u8] {
            &self.payload_buf[..self.payload_len]
        }
    }

    impl ClientEvents for FakeEvents {
        fn allocate_topic(&mut self, _len: u16) -> Allocate {
            self.topic_len = 0;
            Allocate::Use
        }

        fn write_topic(&mut self, chunk: &[u8]) -> IoResult<usize> {
            self.topic_buf[self.topic_len..self.topic_len + chunk.len()].copy_from_slice(chunk);
            self.topic_len += chunk.len();
            IoResult::Ready(chunk.len())
        }

        fn allocate_payload(&mut self, _len: u32) -> Allocate {
            self.payload_len = 0;
            Allocate::Use
        }

        fn write_payload(&mut self, chunk: &[u8]) -> IoResult<usize> {
            self.payload_buf[self.payload_len..self.payload_len + chunk.len()].copy_from_slice(chunk);
            self.payload_len += chunk.len();
            IoResult::Ready(chunk.len())
        }

        fn on_publish(&mut self, _qos: QoS, _retain: bool) -> bool {
            self.publish_calls += 1;
            true
        }

        fn on_publish_deallocate(&mut self) {
            self.deallocate_calls += 1;
        }

        fn on_connect(&mut self, succeeded: bool, session_present: bool) {
            self.connect_calls.push((succeeded, session_present)).ok();
        }

        fn on_publish_done(&mut self, packet_id: Option<u16>, succeeded: bool) {
            self.publish_done_calls.push((packet_id, succeeded)).ok();
        }

        fn on_subscribe(&mut self, packet_id: u16, _results: &[SubscribeReturnCode]) {
            self.subscribe_calls.push(packet_id).ok();
        }

        fn on_unsubscribe(&mut self, _packet_id: u16, _succeeded: bool) {}
    }

    fn decode_all<const N: usize, const ID_N: usize>(
        decoder: &mut Decoder,
        store: &mut Store<'_, N>,
        ids: &mut PacketIdSet<ID_N>,
        events: &mut FakeEvents,
        bytes: &[u8],
    ) -> DecodeOutcome {
        let (outcome, n) = decoder.decode(store, ids, events, bytes, Instant::ZERO);
        assert_eq!(n, bytes.len());
        outcome
    }

    #[test]
    fn connack_accepted_pops_connect_and_fires_on_connect() {
        let mut store: Store<'static, 2> = Store::new(0);
        let id = store.next_id();
        store
            .append(
                Kind::Connect,
                None,
                Command::Connect(ConnectCommand {
                    client_id: "a",
                    clean_session: true,
                    keep_alive: 0x0102,
                    will: None,
                    user_name: None,
                    password: None,
                }),
                Instant::ZERO,
            )
            .unwrap();
        store.mark_current(Instant::ZERO);
        let _ = id;

        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        let outcome = decode_all(&mut decoder, &mut store, &mut ids, &mut events, &[0x20, 0x02, 0x00, 0x00]);
        assert_eq!(
            outcome,
            DecodeOutcome::Ready(DecodeEvent::Connack {
                accepted: true,
                session_present: false,
                clean_session: true,
                keep_alive: 0x0102,
            })
        );
        assert_eq!(events.connect_calls.as_slice(), &[(true, false)]);
        assert!(!store.has_current());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn connack_rejected_reports_failure() {
        let mut store: Store<'static, 2> = Store::new(0);
        store
            .append(Kind::Connect, None, Command::Connect(ConnectCommand {
                client_id: "a",
                clean_session: true,
                keep_alive: 0,
                will: None,
                user_name: None,
                password: None,
            }), Instant::ZERO)
            .unwrap();
        store.mark_current(Instant::ZERO);

        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        let outcome = decode_all(&mut decoder, &mut store, &mut ids, &mut events, &[0x20, 0x02, 0x00, 0x01]);
        assert!(matches!(
            outcome,
            DecodeOutcome::Ready(DecodeEvent::Connack { accepted: false, .. })
        ));
        assert_eq!(events.connect_calls.as_slice(), &[(false, false)]);
    }

    #[test]
    fn qos1_publish_inbound_dispatches_and_enqueues_puback() {
        let mut store: Store<'static, 4> = Store::new(0);
        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        let bytes: &[u8] = &[
            0x32, 0x10, 0x00, 0x05, b't', b'o', b'p', b'i', b'c', 0x00, 0x01, b'p', b'a', b'y', b'l', b'o', b'a',
            b'd',
        ];
        let outcome = decode_all(&mut decoder, &mut store, &mut ids, &mut events, bytes);
        assert_eq!(outcome, DecodeOutcome::Ready(DecodeEvent::Other));
        assert_eq!(events.topic(), b"topic");
        assert_eq!(events.payload(), b"payload");
        assert_eq!(events.publish_calls, 1);
        assert_eq!(events.deallocate_calls, 1);

        assert_eq!(store.len(), 1);
        let entry = store.peek().unwrap();
        assert_eq!(entry.kind, Kind::Puback);
        assert_eq!(entry.packet_id, PacketIdentifier::from_u16(1));
    }

    #[test]
    fn qos2_duplicate_publish_fires_on_publish_once_then_pubrel_completes() {
        let mut store: Store<'static, 4> = Store::new(0);
        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        // PUBLISH qos=2 topic="T" id=0x000a, empty payload.
        let publish: &[u8] = &[0x34, 0x05, 0x00, 0x01, b'T', 0x00, 0x0a];

        decode_all(&mut decoder, &mut store, &mut ids, &mut events, publish);
        assert_eq!(events.publish_calls, 1);
        assert!(ids.contains(0x000a));
        assert_eq!(store.len(), 1); // PUBREC queued

        decode_all(&mut decoder, &mut store, &mut ids, &mut events, publish);
        assert_eq!(events.publish_calls, 1, "duplicate must not redeliver");
        assert_eq!(store.len(), 2); // a second PUBREC queued regardless

        let pubrel: &[u8] = &[0x62, 0x02, 0x00, 0x0a];
        decode_all(&mut decoder, &mut store, &mut ids, &mut events, pubrel);
        assert!(!ids.contains(0x000a));
        assert_eq!(store.len(), 3); // PUBCOMP queued alongside the two PUBRECs
    }

    #[test]
    fn pubrec_reclassifies_publish2_into_pubrel() {
        let mut store: Store<'static, 4> = Store::new(0);
        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        let pid = PacketIdentifier::from_u16(1).unwrap();
        store
            .append(
                Kind::Publish2,
                Some(pid),
                Command::Pubrel(pid), // placeholder value; only kind/id matter to pop_marked_by
                Instant::ZERO,
            )
            .unwrap();
        store.mark_current(Instant::ZERO);

        decode_all(&mut decoder, &mut store, &mut ids, &mut events, &[0x50, 0x02, 0x00, 0x01]);

        // The re-queued PUBREL is unsent again (same slot the popped
        // PUBLISH2 entry freed), ready for the encoder to pick up next.
        assert!(store.has_current());
        assert_eq!(store.len(), 1);
        let entry = store.peek().unwrap();
        assert_eq!(entry.kind, Kind::Pubrel);
    }

    #[test]
    fn publish_with_zero_remaining_length_is_rejected() {
        let mut store: Store<'static, 2> = Store::new(0);
        let mut ids: PacketIdSet<4> = PacketIdSet::new();
        let mut events = FakeEvents::new();
        let mut decoder = Decoder::new();

        let outcome = decode_all(&mut decoder, &mut store, &mut ids, &mut events, &[0x30, 0x00]);
        assert_eq!(outcome, DecodeOutcome::Err(DecodeError::PublishInvalidLength));
    }

    #[test]
    fn partial_delivery_byte_by_byte_matches_whole_buffer_delivery() {
        let bytes: &[u8] = &[0x20, 0x02, 0x00, 0x00];

        let mut store_whole: Store<'static, 2> = Store::new(0);
        store_whole
            .append(Kind::Connect, None, Command::Connect(ConnectCommand {
                client_id: "a",
                clean_session: true,
                keep_alive: 0,
                will: None,
                user_name: None,
                password: None,
            }), Instant::ZERO)
            .unwrap();
        store_whole.mark_current(Instant::ZERO);
        let mut ids_whole: PacketIdSet<4> = PacketIdSet::new();
        let mut events_whole = FakeEvents::new();
        let mut decoder_whole = Decoder::new();
        let outcome_whole = decode_all(&mut decoder_whole, &mut store_whole, &mut ids_whole, &mut events_whole, bytes);

        let mut store_split: Store<'static, 2> = Store::new(0);
        store_split
            .append(Kind::Connect, None, Command::Connect(ConnectCommand {
                client_id: "a",
                clean_session: true,
                keep_alive: 0,
                will: None,
                user_name: None,
                password: None,
            }), Instant::ZERO)
            .unwrap();
        store_split.mark_current(Instant::ZERO);
        let mut ids_split: PacketIdSet<4> = PacketIdSet::new();
        let mut events_split = FakeEvents::new();
        let mut decoder_split = Decoder::new();
        let mut last = DecodeOutcome::Continue;
        for &b in bytes {
            let (outcome, n) = decoder_split.decode(&mut store_split, &mut ids_split, &mut events_split, &[b], Instant::ZERO);
            assert_eq!(n, 1);
            last = outcome;
        }

        assert_eq!(outcome_whole, last);
        assert_eq!(events_whole.connect_calls.as_slice(), events_split.connect_calls.as_slice());
    }
}
