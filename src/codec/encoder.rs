//! Turns the next store entry into bytes. Resumable at byte granularity:
//! [`Encoder::encode`] can be called repeatedly with different `dst` slices
//! and picks up exactly where it left off, including mid-string and
//! mid-payload-stream.

use crate::header::{encode_fixed_header, FixedHeader, PacketType};
use crate::io::IoResult;
use crate::store::{Command, ConnectCommand, Kind, PublishCommand, Store};
use crate::types::QoS;

use super::Blocked;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// A recipe step was reached that the current command shape cannot
    /// produce - indicates a bug in this module, not caller misuse.
    Internal,
    /// The outbound application payload stream returned an error.
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeOutcome {
    /// At least one byte was written, or nothing was pending.
    Ready,
    /// Nothing could be produced this call: either no entry is queued, or
    /// progress is suspended on an application payload stream.
    WouldBlock,
    /// `dst` filled before the current entry finished; call again with
    /// more room.
    Continue,
    Err(EncodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prefix,
    ConnectClientId,
    ConnectWillTopic,
    ConnectWillMessage,
    ConnectUserName,
    ConnectPassword,
    PublishTopic,
    PublishPacketId,
    PublishPayload,
    SubscribeTopic(usize),
    SubscribeQos(usize),
    UnsubscribeTopic(usize),
    Done,
}

/// Drives one tx buffer against the current store. Owns no command data
/// itself - only its position within the current entry's recipe.
pub struct Encoder {
    phase: Phase,
    cursor: usize,
    payload_sent: u32,
    scratch: [u8; 16],
    scratch_len: usize,
    closed: bool,
    blocked: Option<Blocked>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Prefix,
            cursor: 0,
            payload_sent: 0,
            scratch: [0; 16],
            scratch_len: 0,
            closed: false,
            blocked: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the encoder closed: no further bytes will ever be produced.
    /// Set once a DISCONNECT has been fully emitted.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The String Reference the encoder is waiting on, valid only right
    /// after `encode` returns `WouldBlock` due to an application stream.
    pub fn blocking_stream(&self) -> Option<Blocked> {
        self.blocked
    }

    /// Encodes as much as possible of the current/next store entries into
    /// `dst`, returning how many bytes were written alongside the outcome.
    /// `now` is only used to stamp an entry that transitions to "awaiting
    /// reply" (its per-entry ack-timeout clock starts here). A QoS-0
    /// PUBLISH has no reply to await - it succeeds the instant its bytes are
    /// fully handed off - so `on_publish0_done` is invoked once per such
    /// entry finished during this call (there may be more than one if `dst`
    /// holds several small entries).
    pub fn encode<'a, const N: usize, F: FnMut()>(
        &mut self,
        store: &mut Store<'a, N>,
        dst: &mut [u8],
        now: crate::clock::Instant,
        mut on_publish0_done: F,
    ) -> (EncodeOutcome, usize) {
        let mut written = 0;

        loop {
            if self.closed {
                return (EncodeOutcome::Ready, written);
            }

            if written == dst.len() {
                return (EncodeOutcome::Continue, written);
            }

            let Some(entry) = store.peek_mut() else {
                self.blocked = None;
                return (
                    if written > 0 {
                        EncodeOutcome::Ready
                    } else {
                        EncodeOutcome::WouldBlock
                    },
                    written,
                );
            };

            if self.cursor == 0 && self.scratch_len == 0 {
                if let Err(e) = self.enter_phase(&entry.value) {
                    return (EncodeOutcome::Err(e), written);
                }
            }

            match self.write_phase(&mut entry.value, &mut dst[written..]) {
                PhaseProgress::Wrote(n) => {
                    written += n;
                }
                PhaseProgress::PhaseDone => {
                    self.advance_phase(&entry.value);
                }
                PhaseProgress::EntryDone => {
                    let kind = entry.kind;
                    if let Command::Publish(p) = &mut entry.value {
                        p.encode_count = p.encode_count.saturating_add(1);
                    }
                    self.finish_entry(store, kind, now, &mut on_publish0_done);
                    self.phase = Phase::Prefix;
                    self.cursor = 0;
                    self.scratch_len = 0;
                    self.payload_sent = 0;
                    self.blocked = None;
                }
                PhaseProgress::WouldBlock(blocked) => {
                    self.blocked = Some(blocked);
                    return (
                        if written > 0 {
                            EncodeOutcome::Ready
                        } else {
                            EncodeOutcome::WouldBlock
                        },
                        written,
                    );
                }
                PhaseProgress::Error(e) => return (EncodeOutcome::Err(e), written),
            }
        }
    }

    /// Builds the scratch buffer (or confirms a non-scratch phase needs no
    /// precomputation) for the phase we're about to start.
    fn enter_phase(&mut self, command: &Command<'_>) -> Result<(), EncodeError> {
        match (self.phase, command) {
            (Phase::Prefix, _) => {
                let remaining_length = remaining_length_of(command);
                let header = prefix_header(command, remaining_length);
                let len = encode_fixed_header(header, &mut self.scratch).ok_or(EncodeError::Internal)?;
                let len = append_prefix_tail(command, &mut self.scratch, len)?;
                self.scratch_len = len;
                Ok(())
            }
            (Phase::PublishPacketId, Command::Publish(p)) => {
                let id = p.packet_id.ok_or(EncodeError::Internal)?;
                self.scratch[0] = (id.get_u16() >> 8) as u8;
                self.scratch[1] = (id.get_u16() & 0xff) as u8;
                self.scratch_len = 2;
                Ok(())
            }
            (Phase::SubscribeQos(_), Command::Subscribe(s)) => {
                let idx = match self.phase {
                    Phase::SubscribeQos(i) => i,
                    _ => unreachable!(),
                };
                let sub = s.subscriptions.get(idx).ok_or(EncodeError::Internal)?;
                self.scratch[0] = sub.requested_qos.into_bits(0);
                self.scratch_len = 1;
                Ok(())
            }
            _ => {
                // Prefixed-string phases need no precomputed scratch; mark
                // non-zero so `encode`'s entry check doesn't re-enter.
                self.scratch_len = usize::MAX;
                Ok(())
            }
        }
    }

    fn write_phase(&mut self, command: &mut Command<'_>, dst: &mut [u8]) -> PhaseProgress {
        if dst.is_empty() {
            return PhaseProgress::Wrote(0);
        }

        match self.phase {
            Phase::Prefix => self.drain_scratch(dst),
            Phase::PublishPacketId | Phase::SubscribeQos(_) => self.drain_scratch(dst),
            Phase::ConnectClientId => match command {
                Command::Connect(c) => self.drain_prefixed(c.client_id.as_bytes(), dst),
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::ConnectWillTopic => match command {
                Command::Connect(c) => match &c.will {
                    Some(w) => self.drain_prefixed(w.topic.as_bytes(), dst),
                    None => PhaseProgress::PhaseDone,
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::ConnectWillMessage => match command {
                Command::Connect(c) => match &c.will {
                    Some(w) => self.drain_prefixed(w.message, dst),
                    None => PhaseProgress::PhaseDone,
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::ConnectUserName => match command {
                Command::Connect(c) => match c.user_name {
                    Some(u) => self.drain_prefixed(u.as_bytes(), dst),
                    None => PhaseProgress::PhaseDone,
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::ConnectPassword => match command {
                Command::Connect(c) => match c.password {
                    Some(p) => self.drain_prefixed(p, dst),
                    None => PhaseProgress::PhaseDone,
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::PublishTopic => match command {
                Command::Publish(p) => self.drain_prefixed(p.topic.as_bytes(), dst),
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::PublishPayload => match command {
                Command::Publish(p) => self.drain_payload(p, dst),
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::SubscribeTopic(idx) => match command {
                Command::Subscribe(s) => match s.subscriptions.get(idx) {
                    Some(sub) => self.drain_prefixed(sub.topic.as_bytes(), dst),
                    None => PhaseProgress::Error(EncodeError::Internal),
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::UnsubscribeTopic(idx) => match command {
                Command::Unsubscribe(u) => match u.topics.get(idx) {
                    Some(topic) => self.drain_prefixed(topic.as_bytes(), dst),
                    None => PhaseProgress::Error(EncodeError::Internal),
                },
                _ => PhaseProgress::Error(EncodeError::Internal),
            },
            Phase::Done => PhaseProgress::EntryDone,
        }
    }

    fn drain_scratch(&mut self, dst: &mut [u8]) -> PhaseProgress {
        let total = self.scratch_len.min(self.scratch.len());
        let mut n = 0;
        while self.cursor < total && n < dst.len() {
            dst[n] = self.scratch[self.cursor];
            self.cursor += 1;
            n += 1;
        }
        if self.cursor >= total {
            PhaseProgress::PhaseDone
        } else if n > 0 {
            PhaseProgress::Wrote(n)
        } else {
            PhaseProgress::Wrote(0)
        }
    }

    fn drain_prefixed(&mut self, bytes: &[u8], dst: &mut [u8]) -> PhaseProgress {
        let total = 2 + bytes.len();
        let mut n = 0;
        while self.cursor < total && n < dst.len() {
            let b = match self.cursor {
                0 => (bytes.len() >> 8) as u8,
                1 => (bytes.len() & 0xff) as u8,
                i => bytes[i - 2],
            };
            dst[n] = b;
            self.cursor += 1;
            n += 1;
        }
        if self.cursor >= total {
            PhaseProgress::PhaseDone
        } else {
            PhaseProgress::Wrote(n)
        }
    }

    fn drain_payload(&mut self, command: &mut PublishCommand<'_>, dst: &mut [u8]) -> PhaseProgress {
        let remaining = command.payload_len.saturating_sub(self.payload_sent);
        if remaining == 0 {
            return PhaseProgress::PhaseDone;
        }
        let want = core::cmp::min(remaining as usize, dst.len());
        if want == 0 {
            return PhaseProgress::Wrote(0);
        }
        match command.payload.read(&mut dst[..want]) {
            IoResult::Ready(n) => {
                self.payload_sent += n as u32;
                PhaseProgress::Wrote(n)
            }
            IoResult::WouldBlock => PhaseProgress::WouldBlock(Blocked::OutboundPayload),
            IoResult::Err(_) => PhaseProgress::Error(EncodeError::String),
        }
    }

    fn advance_phase(&mut self, command: &Command<'_>) {
        self.cursor = 0;
        self.scratch_len = 0;
        self.phase = match (self.phase, command) {
            (Phase::Prefix, Command::Connect(_)) => Phase::ConnectClientId,
            (Phase::Prefix, Command::Publish(_)) => Phase::PublishTopic,
            (Phase::Prefix, Command::Subscribe(_)) => Phase::SubscribeTopic(0),
            (Phase::Prefix, Command::Unsubscribe(_)) => Phase::UnsubscribeTopic(0),
            (
                Phase::Prefix,
                Command::Pubrel(_)
                | Command::Puback(_)
                | Command::Pubrec(_)
                | Command::Pubcomp(_)
                | Command::Pingreq
                | Command::Disconnect,
            ) => Phase::Done,

            (Phase::ConnectClientId, Command::Connect(c)) => {
                if c.will.is_some() {
                    Phase::ConnectWillTopic
                } else if c.user_name.is_some() {
                    Phase::ConnectUserName
                } else if c.password.is_some() {
                    Phase::ConnectPassword
                } else {
                    Phase::Done
                }
            }
            (Phase::ConnectWillTopic, _) => Phase::ConnectWillMessage,
            (Phase::ConnectWillMessage, Command::Connect(c)) => {
                if c.user_name.is_some() {
                    Phase::ConnectUserName
                } else if c.password.is_some() {
                    Phase::ConnectPassword
                } else {
                    Phase::Done
                }
            }
            (Phase::ConnectUserName, Command::Connect(c)) => {
                if c.password.is_some() {
                    Phase::ConnectPassword
                } else {
                    Phase::Done
                }
            }
            (Phase::ConnectPassword, _) => Phase::Done,

            (Phase::PublishTopic, Command::Publish(p)) => {
                if p.qos != QoS::AtMostOnce {
                    Phase::PublishPacketId
                } else {
                    Phase::PublishPayload
                }
            }
            (Phase::PublishPacketId, _) => Phase::PublishPayload,
            (Phase::PublishPayload, _) => Phase::Done,

            (Phase::SubscribeTopic(i), _) => Phase::SubscribeQos(i),
            (Phase::SubscribeQos(i), Command::Subscribe(s)) => {
                if i + 1 < s.subscriptions.len() {
                    Phase::SubscribeTopic(i + 1)
                } else {
                    Phase::Done
                }
            }
            (Phase::UnsubscribeTopic(i), Command::Unsubscribe(u)) => {
                if i + 1 < u.topics.len() {
                    Phase::UnsubscribeTopic(i + 1)
                } else {
                    Phase::Done
                }
            }
            (phase, _) => phase,
        };
    }

    /// Finalizes the just-completed entry per its kind: DISCONNECT, QoS-0
    /// PUBLISH, and the fire-and-forget inbound-PUBLISH replies never await
    /// a reply; everything else moves to "awaiting peer response", stamped
    /// with `now` so its per-entry ack-timeout starts counting from here.
    fn finish_entry<'a, const N: usize>(
        &mut self,
        store: &mut Store<'a, N>,
        kind: Kind,
        now: crate::clock::Instant,
        on_publish0_done: &mut impl FnMut(),
    ) {
        match kind {
            Kind::Disconnect => {
                store.drop_current();
                self.closed = true;
            }
            Kind::Publish0 => {
                store.drop_current();
                on_publish0_done();
            }
            Kind::Puback | Kind::Pubrec | Kind::Pubcomp => {
                store.drop_current();
            }
            _ => {
                store.mark_current(now);
            }
        }
    }
}

enum PhaseProgress {
    Wrote(usize),
    PhaseDone,
    EntryDone,
    WouldBlock(Blocked),
    Error(EncodeError),
}

fn remaining_length_of(command: &Command<'_>) -> u32 {
    match command {
        Command::Connect(c) => {
            let mut len = 10u32 + 2 + c.client_id.len() as u32;
            if let Some(w) = &c.will {
                len += 2 + w.topic.len() as u32;
                len += 2 + w.message.len() as u32;
            }
            if let Some(u) = c.user_name {
                len += 2 + u.len() as u32;
            }
            if let Some(p) = c.password {
                len += 2 + p.len() as u32;
            }
            len
        }
        Command::Publish(p) => {
            let mut len = 2 + p.topic.len() as u32;
            if p.qos != QoS::AtMostOnce {
                len += 2;
            }
            len += p.payload_len;
            len
        }
        Command::Subscribe(s) => {
            let mut len = 2u32;
            for sub in s.subscriptions.iter() {
                len += 2 + sub.topic.len() as u32 + 1;
            }
            len
        }
        Command::Unsubscribe(u) => {
            let mut len = 2u32;
            for topic in u.topics.iter() {
                len += 2 + topic.len() as u32;
            }
            len
        }
        Command::Pubrel(_) | Command::Puback(_) | Command::Pubrec(_) | Command::Pubcomp(_) => 2,
        Command::Pingreq | Command::Disconnect => 0,
    }
}

fn prefix_header(command: &Command<'_>, remaining_length: u32) -> FixedHeader {
    let (packet_type, flags) = match command {
        Command::Connect(_) => (PacketType::Connect, 0),
        Command::Publish(p) => {
            let dup = if p.encode_count > 0 { 1 } else { 0 };
            (
                PacketType::Publish,
                (p.retain as u8) | (p.qos.into_bits(1)) | (dup << 3),
            )
        }
        Command::Subscribe(_) => (PacketType::Subscribe, 0b0010),
        Command::Unsubscribe(_) => (PacketType::Unsubscribe, 0b0010),
        Command::Pubrel(_) => (PacketType::Pubrel, 0b0010),
        Command::Pingreq => (PacketType::Pingreq, 0),
        Command::Disconnect => (PacketType::Disconnect, 0),
        Command::Puback(_) => (PacketType::Puback, 0),
        Command::Pubrec(_) => (PacketType::Pubrec, 0),
        Command::Pubcomp(_) => (PacketType::Pubcomp, 0),
    };
    FixedHeader {
        packet_type,
        flags,
        remaining_length,
    }
}

/// Appends the per-kind fixed tail that follows the fixed header inside the
/// scratch buffer: CONNECT's 10-byte variable header, or a 2-byte packet id
/// for SUBSCRIBE/UNSUBSCRIBE/PUBREL. PUBLISH's packet id is encoded in its
/// own phase since it comes after the topic string on the wire.
fn append_prefix_tail(command: &Command<'_>, scratch: &mut [u8; 16], offset: usize) -> Result<usize, EncodeError> {
    match command {
        Command::Connect(c) => {
            let tail: [u8; 10] = [
                0x00,
                0x04,
                b'M',
                b'Q',
                b'T',
                b'T',
                0x04,
                connect_flags(c),
                (c.keep_alive >> 8) as u8,
                (c.keep_alive & 0xff) as u8,
            ];
            scratch[offset..offset + tail.len()].copy_from_slice(&tail);
            Ok(offset + tail.len())
        }
        Command::Subscribe(s) => write_packet_id(scratch, offset, s.packet_id.get_u16()),
        Command::Unsubscribe(u) => write_packet_id(scratch, offset, u.packet_id.get_u16()),
        Command::Pubrel(id) | Command::Puback(id) | Command::Pubrec(id) | Command::Pubcomp(id) => {
            write_packet_id(scratch, offset, id.get_u16())
        }
        Command::Publish(_) | Command::Pingreq | Command::Disconnect => Ok(offset),
    }
}

fn write_packet_id(scratch: &mut [u8; 16], offset: usize, id: u16) -> Result<usize, EncodeError> {
    if offset + 2 > scratch.len() {
        return Err(EncodeError::Internal);
    }
    scratch[offset] = (id >> 8) as u8;
    scratch[offset + 1] = (id & 0xff) as u8;
    Ok(offset + 2)
}

fn connect_flags(c: &ConnectCommand<'_>) -> u8 {
    let mut flags = 0u8;
    if c.clean_session {
        flags |= 0b0000_0010;
    }
    if let Some(w) = &c.will {
        flags |= 0b0000_0100;
        flags |= w.qos.into_bits(3);
        if w.retain {
            flags |= 0b0010_0000;
        }
    }
    if c.password.is_some() {
        flags |= 0b0100_0000;
    }
    if c.user_name.is_some() {
        flags |= 0b1000_0000;
    }
    flags
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::io::SliceReader;
    use crate::store::{ConnectCommand, Kind, Will};
    use crate::types::PacketIdentifier;

    #[test]
    fn connect_round_trip_matches_wire_bytes() {
        let mut store: Store<'_, 1> = Store::new(10);
        store
            .append(
                Kind::Connect,
                None,
                Command::Connect(ConnectCommand {
                    client_id: "a",
                    clean_session: true,
                    keep_alive: 0x0102,
                    will: Some(Will {
                        topic: "b",
                        message: b"c",
                        qos: QoS::AtMostOnce,
                        retain: false,
                    }),
                    user_name: Some("d"),
                    password: Some(b"e"),
                }),
                crate::clock::Instant::ZERO,
            )
            .unwrap();

        let mut encoder = Encoder::new();
        let mut out = [0u8; 64];
        let mut total = 0;
        loop {
            let (outcome, n) = encoder.encode(&mut store, &mut out[total..], crate::clock::Instant::ZERO, || {});
            total += n;
            match outcome {
                EncodeOutcome::Ready if n == 0 => break,
                EncodeOutcome::WouldBlock => break,
                EncodeOutcome::Err(_) => panic!("encode error"),
                _ => {}
            }
        }

        let expected: [u8; 27] = [
            0x10, 0x19, 0x00, 0x04, 0x4d, 0x51, 0x54, 0x54, 0x04, 0xc6, 0x01, 0x02, 0x00, 0x01,
            0x61, 0x00, 0x01, 0x62, 0x00, 0x01, 0x63, 0x00, 0x01, 0x64, 0x00, 0x01, 0x65,
        ];
        assert_eq!(&out[..total], &expected[..]);
    }

    #[test]
    fn publish_qos1_matches_wire_bytes() {
        let mut store: Store<'_, 1> = Store::new(10);
        let mut reader = SliceReader::new(b"payload");
        store
            .append(
                Kind::Publish1,
                Some(PacketIdentifier::ONE),
                Command::Publish(PublishCommand {
                    topic: "topic",
                    payload: &mut reader,
                    payload_len: 7,
                    qos: QoS::AtLeastOnce,
                    retain: false,
                    packet_id: Some(PacketIdentifier::ONE),
                    encode_count: 0,
                }),
                crate::clock::Instant::ZERO,
            )
            .unwrap();

        let mut encoder = Encoder::new();
        let mut out = [0u8; 32];
        let mut total = 0;
        loop {
            let (outcome, n) = encoder.encode(&mut store, &mut out[total..], crate::clock::Instant::ZERO, || {});
            total += n;
            if matches!(outcome, EncodeOutcome::WouldBlock) || n == 0 {
                break;
            }
        }

        let expected: [u8; 18] = [
            0x32, 0x10, 0x00, 0x05, 0x74, 0x6f, 0x70, 0x69, 0x63, 0x00, 0x01, 0x70, 0x61, 0x79,
            0x6c, 0x6f, 0x61, 0x64,
        ];
        assert_eq!(&out[..total], &expected[..]);
    }

    #[test]
    fn publish_qos0_drops_entry_and_fires_completion_once() {
        let mut store: Store<'_, 1> = Store::new(10);
        let mut reader = SliceReader::new(b"hi");
        store
            .append(
                Kind::Publish0,
                None,
                Command::Publish(PublishCommand {
                    topic: "t",
                    payload: &mut reader,
                    payload_len: 2,
                    qos: QoS::AtMostOnce,
                    retain: false,
                    packet_id: None,
                    encode_count: 0,
                }),
                crate::clock::Instant::ZERO,
            )
            .unwrap();

        let mut encoder = Encoder::new();
        let mut out = [0u8; 32];
        let mut total = 0;
        let mut completions = 0;
        loop {
            let (outcome, n) = encoder.encode(&mut store, &mut out[total..], crate::clock::Instant::ZERO, || {
                completions += 1;
            });
            total += n;
            if matches!(outcome, EncodeOutcome::WouldBlock) || n == 0 {
                break;
            }
        }

        assert_eq!(completions, 1);
        assert!(!store.has_current());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn pubrel_matches_wire_bytes_and_awaits_reply() {
        let mut store: Store<'_, 1> = Store::new(10);
        store
            .append(
                Kind::Pubrel,
                Some(PacketIdentifier::ONE),
                Command::Pubrel(PacketIdentifier::ONE),
                crate::clock::Instant::ZERO,
            )
            .unwrap();

        let mut encoder = Encoder::new();
        let mut out = [0u8; 8];
        let (outcome, n) = encoder.encode(&mut store, &mut out, crate::clock::Instant::ZERO, || {});
        assert_eq!(outcome, EncodeOutcome::Ready);
        assert_eq!(&out[..n], &[0x62, 0x02, 0x00, 0x01]);
        assert!(!store.has_current());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn disconnect_drops_entry_and_closes_encoder() {
        let mut store: Store<'_, 1> = Store::new(10);
        store
            .append(
                Kind::Disconnect,
                None,
                Command::Disconnect,
                crate::clock::Instant::ZERO,
            )
            .unwrap();

        let mut encoder = Encoder::new();
        let mut out = [0u8; 8];
        let (outcome, n) = encoder.encode(&mut store, &mut out, crate::clock::Instant::ZERO, || {});
        assert_eq!(outcome, EncodeOutcome::Ready);
        assert_eq!(&out[..n], &[0xe0, 0x00]);
        assert!(!store.has_current());
        assert!(encoder.is_closed());
    }
}
