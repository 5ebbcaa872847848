/*
 * MIT License
 *
 * Copyright (c) [2022] [Ondrej Babec <ond.babec@gmail.com>]
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! The client state machine: owns both in-flight stores, the wire codec, the
//! buffer pump, and the public command surface. [`Client::run_once`] is the
//! only entry point that moves bytes; everything else just enqueues work for
//! the next call.

pub mod events;
pub mod status;

pub use events::ClientEvents;
pub use status::RunStatus;

use crate::clock::Instant;
use crate::codec::{DecodeEvent, DecodeOutcome, Decoder, EncodeOutcome, Encoder};
use crate::fmt;
use crate::idset::PacketIdSet;
use crate::io::{PayloadReader, Transport};
use crate::pump::{RxBuffer, TxBuffer};
use crate::store::{
    Command, ConnectCommand, Kind, PublishCommand, Store, Subscription, SubscribeCommand,
    UnsubscribeCommand, MAX_SUBSCRIPTIONS,
};
use crate::types::{PacketIdentifier, QoS};

/// Why a command was rejected before ever reaching a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Not valid from the client's current state (e.g. `publish` before
    /// `connect`, or a second `connect` while already connected).
    WrongState,
    /// A PUBLISH topic, or a SUBSCRIBE/UNSUBSCRIBE topic filter, was empty.
    EmptyTopic,
    /// `clean_session` is false but `client_id` is empty - the broker has
    /// nothing to resume a session against.
    EmptyClientId,
    /// A password was given without a user name.
    PasswordWithoutUserName,
    /// SUBSCRIBE/UNSUBSCRIBE was called with no topics.
    EmptyTopicList,
    /// More topics than [`MAX_SUBSCRIPTIONS`] were given in one call.
    TooManySubscriptions,
    /// The current store has no room for another entry.
    StoreFull,
}

impl From<crate::store::StoreFull> for CommandError {
    fn from(_: crate::store::StoreFull) -> Self {
        CommandError::StoreFull
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Connecting,
    Connected,
    Failed,
}

/// Drives one MQTT 3.1.1 session over a caller-supplied [`Transport`],
/// dispatching completions and inbound PUBLISH deliveries through a caller
/// [`ClientEvents`] implementation. Never allocates, never blocks: every
/// suspension point is reported through the [`RunStatus`] that
/// [`run_once`](Self::run_once) returns.
pub struct Client<'a, T, E, const N: usize, const ID_N: usize>
where
    T: Transport,
    E: ClientEvents,
{
    transport: T,
    events: E,
    connect_store: Store<'a, 1>,
    main_store: Store<'a, N>,
    ids: PacketIdSet<ID_N>,
    encoder: Encoder,
    decoder: Decoder,
    rx: RxBuffer<'a>,
    tx: TxBuffer<'a>,
    state: State,
    /// Whether the most recently established session (if any) was clean -
    /// governs whether a reconnect flushes `main_store` or retransmits it.
    prior_session_clean: bool,
}

impl<'a, T, E, const N: usize, const ID_N: usize> Client<'a, T, E, N, ID_N>
where
    T: Transport,
    E: ClientEvents,
{
    pub fn new(
        transport: T,
        events: E,
        rx_buf: &'a mut [u8],
        tx_buf: &'a mut [u8],
        ack_timeout_secs: u16,
    ) -> Self {
        Self {
            transport,
            events,
            connect_store: Store::new(ack_timeout_secs),
            main_store: Store::new(ack_timeout_secs),
            ids: PacketIdSet::new(),
            encoder: Encoder::new(),
            decoder: Decoder::new(),
            rx: RxBuffer::new(rx_buf),
            tx: TxBuffer::new(tx_buf),
            state: State::Initial,
            prior_session_clean: true,
        }
    }

    /// Submits a CONNECT. Only valid from the initial state (or after
    /// [`reset`](Self::reset) following a failure).
    pub fn connect(&mut self, cmd: ConnectCommand<'a>) -> Result<(), CommandError> {
        if self.state != State::Initial {
            return Err(CommandError::WrongState);
        }
        if cmd.client_id.is_empty() && !cmd.clean_session {
            return Err(CommandError::EmptyClientId);
        }
        if cmd.password.is_some() && cmd.user_name.is_none() {
            return Err(CommandError::PasswordWithoutUserName);
        }
        if let Some(will) = cmd.will {
            if will.topic.is_empty() {
                return Err(CommandError::EmptyTopic);
            }
        }

        self.connect_store
            .append(Kind::Connect, None, Command::Connect(cmd), Instant::ZERO)?;
        self.state = State::Connecting;
        fmt::debug!("client: CONNECT queued, awaiting CONNACK");
        Ok(())
    }

    /// Submits a PUBLISH. Returns the packet id assigned for QoS 1/2 (`None`
    /// for QoS 0, which carries none).
    pub fn publish(
        &mut self,
        topic: &'a str,
        payload: &'a mut dyn PayloadReader,
        payload_len: u32,
        qos: QoS,
        retain: bool,
    ) -> Result<Option<PacketIdentifier>, CommandError> {
        if self.state != State::Connected {
            return Err(CommandError::WrongState);
        }
        if topic.is_empty() {
            return Err(CommandError::EmptyTopic);
        }

        let packet_id = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce | QoS::ExactlyOnce => Some(self.main_store.next_id()),
        };
        let kind = match qos {
            QoS::AtMostOnce => Kind::Publish0,
            QoS::AtLeastOnce => Kind::Publish1,
            QoS::ExactlyOnce => Kind::Publish2,
        };
        let command = Command::Publish(PublishCommand {
            topic,
            payload,
            payload_len,
            qos,
            retain,
            packet_id,
            encode_count: 0,
        });
        self.main_store.append(kind, packet_id, command, Instant::ZERO)?;
        Ok(packet_id)
    }

    /// Submits a SUBSCRIBE for one or more topic filters.
    pub fn subscribe(
        &mut self,
        subscriptions: &[Subscription<'a>],
    ) -> Result<PacketIdentifier, CommandError> {
        if self.state != State::Connected {
            return Err(CommandError::WrongState);
        }
        if subscriptions.is_empty() {
            return Err(CommandError::EmptyTopicList);
        }
        if subscriptions.len() > MAX_SUBSCRIPTIONS {
            return Err(CommandError::TooManySubscriptions);
        }
        if subscriptions.iter().any(|s| s.topic.is_empty()) {
            return Err(CommandError::EmptyTopic);
        }

        let packet_id = self.main_store.next_id();
        let mut list = heapless::Vec::new();
        for sub in subscriptions {
            // Length already bounded above; this cannot fail.
            let _ = list.push(*sub);
        }
        let command = Command::Subscribe(SubscribeCommand {
            subscriptions: list,
            packet_id,
        });
        self.main_store
            .append(Kind::Subscribe, Some(packet_id), command, Instant::ZERO)?;
        Ok(packet_id)
    }

    /// Submits an UNSUBSCRIBE for one or more topic filters.
    pub fn unsubscribe(&mut self, topics: &[&'a str]) -> Result<PacketIdentifier, CommandError> {
        if self.state != State::Connected {
            return Err(CommandError::WrongState);
        }
        if topics.is_empty() {
            return Err(CommandError::EmptyTopicList);
        }
        if topics.len() > MAX_SUBSCRIPTIONS {
            return Err(CommandError::TooManySubscriptions);
        }
        if topics.iter().any(|t| t.is_empty()) {
            return Err(CommandError::EmptyTopic);
        }

        let packet_id = self.main_store.next_id();
        let mut list = heapless::Vec::new();
        for topic in topics {
            let _ = list.push(*topic);
        }
        let command = Command::Unsubscribe(UnsubscribeCommand {
            topics: list,
            packet_id,
        });
        self.main_store
            .append(Kind::Unsubscribe, Some(packet_id), command, Instant::ZERO)?;
        Ok(packet_id)
    }

    /// Submits a DISCONNECT. The encoder closes itself once it has been
    /// fully written; no reply is awaited.
    pub fn disconnect(&mut self) -> Result<(), CommandError> {
        if self.state != State::Connected {
            return Err(CommandError::WrongState);
        }
        self.main_store
            .append(Kind::Disconnect, None, Command::Disconnect, Instant::ZERO)?;
        Ok(())
    }

    /// Transitions to the failed state, draining both stores and firing
    /// every pending completion callback with `succeeded=false`. Idempotent:
    /// calling it again once both stores are already empty does nothing.
    pub fn finalize(&mut self) {
        fmt::warn!("client: finalizing, draining pending entries");
        self.state = State::Failed;
        let events = &mut self.events;
        self.connect_store
            .drain(|kind, cmd| Self::fire_failure(events, kind, &cmd));
        self.main_store
            .drain(|kind, cmd| Self::fire_failure(events, kind, &cmd));
        self.encoder.close();
    }

    /// Clears a failed client back to the initial state so `connect` can be
    /// called again. Only permitted once the client has actually failed and
    /// its encoder has been closed (i.e. after `finalize`).
    pub fn reset(&mut self) -> Result<(), CommandError> {
        if self.state != State::Failed || !self.encoder.is_closed() {
            return Err(CommandError::WrongState);
        }
        self.state = State::Initial;
        self.encoder.reset();
        self.decoder.reset();
        self.rx.reset();
        self.tx.reset();
        self.ids.clear();
        Ok(())
    }

    /// Drives one round of I/O: keep-alive bookkeeping, then output, then
    /// input, re-looping a bounded number of times if input processing
    /// queued fresh output and the connection is not write-blocked.
    pub fn run_once(&mut self, now: Instant) -> RunStatus {
        if self.state == State::Failed {
            return RunStatus::ERROR;
        }

        self.check_keep_alive(now);
        if self.state == State::Failed {
            return RunStatus::ERROR;
        }

        let mut status = RunStatus::empty();
        let capacity = self.current_store_capacity().max(1);
        let mut iterations = 0usize;

        loop {
            status |= self.process_output(now);
            if status.is_error() {
                return status;
            }

            let had_unsent = self.current_has_unsent();
            status |= self.process_input(now);
            if status.is_error() {
                return status;
            }
            if status.is_eof() {
                break;
            }

            let has_unsent = self.current_has_unsent();
            iterations += 1;
            if has_unsent && !had_unsent && !status.would_block_conn_wr() && iterations < capacity {
                continue;
            }
            break;
        }

        if self.main_store.is_queueable() {
            status |= RunStatus::QUEUEABLE;
        }
        status
    }

    fn process_output(&mut self, now: Instant) -> RunStatus {
        let mut status = RunStatus::empty();
        let mut touched = false;

        loop {
            let wrote = if self.tx.has_pending() {
                match self.tx.drain(&mut self.transport) {
                    crate::io::IoResult::Ready(0) => false,
                    crate::io::IoResult::Ready(_) => {
                        touched = true;
                        true
                    }
                    crate::io::IoResult::WouldBlock => {
                        status |= RunStatus::WOULD_BLOCK_CONN_WR;
                        false
                    }
                    crate::io::IoResult::Err(_) => {
                        self.finalize();
                        return status | RunStatus::ERROR;
                    }
                }
            } else {
                false
            };

            let encoded = if self.tx.has_room() {
                let dst = self.tx.spare_mut();
                let events = &mut self.events;
                let (outcome, n) = match self.state {
                    State::Connecting => self.encoder.encode(&mut self.connect_store, dst, now, || {}),
                    State::Connected => self.encoder.encode(&mut self.main_store, dst, now, || {
                        events.on_publish_done(None, true);
                    }),
                    State::Initial | State::Failed => (EncodeOutcome::WouldBlock, 0),
                };
                self.tx.commit(n);
                match outcome {
                    EncodeOutcome::Ready | EncodeOutcome::Continue => n > 0,
                    EncodeOutcome::WouldBlock => {
                        if self.encoder.blocking_stream().is_some() {
                            status |= RunStatus::WOULD_BLOCK_DATA_WR;
                        }
                        false
                    }
                    EncodeOutcome::Err(_) => {
                        self.finalize();
                        return status | RunStatus::ERROR;
                    }
                }
            } else {
                false
            };

            if !wrote && !encoded {
                break;
            }
        }

        if touched {
            self.touch_current(now);
        }
        status
    }

    fn process_input(&mut self, now: Instant) -> RunStatus {
        let mut status = RunStatus::empty();
        let mut touched = false;

        loop {
            let read = match self.rx.fill(&mut self.transport) {
                crate::io::IoResult::Ready(0) => {
                    self.handle_eof();
                    return status | RunStatus::EOF;
                }
                crate::io::IoResult::Ready(_) => {
                    touched = true;
                    true
                }
                crate::io::IoResult::WouldBlock => {
                    status |= RunStatus::WOULD_BLOCK_CONN_RD;
                    false
                }
                crate::io::IoResult::Err(_) => {
                    self.finalize();
                    return status | RunStatus::ERROR;
                }
            };

            let decoded = if !self.rx.is_empty() {
                let src = self.rx.as_slice();
                let (outcome, n) = match self.state {
                    State::Connecting => {
                        self.decoder
                            .decode(&mut self.connect_store, &mut self.ids, &mut self.events, src, now)
                    }
                    State::Connected => {
                        self.decoder
                            .decode(&mut self.main_store, &mut self.ids, &mut self.events, src, now)
                    }
                    State::Initial | State::Failed => (DecodeOutcome::Continue, 0),
                };
                self.rx.consume(n);
                match outcome {
                    DecodeOutcome::Ready(event) => {
                        touched = true;
                        self.handle_decode_event(event, now);
                        true
                    }
                    DecodeOutcome::Continue => n > 0,
                    DecodeOutcome::WouldBlock => {
                        status |= RunStatus::WOULD_BLOCK_DATA_RD;
                        false
                    }
                    DecodeOutcome::Err(_) => {
                        self.finalize();
                        return status | RunStatus::ERROR;
                    }
                }
            } else {
                false
            };

            if !read && !decoded {
                break;
            }
        }

        if touched {
            self.touch_current(now);
        }
        status
    }

    fn handle_decode_event(&mut self, event: DecodeEvent, now: Instant) {
        let DecodeEvent::Connack {
            accepted,
            session_present: _,
            clean_session,
            keep_alive,
        } = event
        else {
            return;
        };

        if accepted {
            fmt::debug!("client: CONNACK accepted, keep_alive={}", keep_alive);
            self.main_store.set_keep_alive(keep_alive);
            self.state = State::Connected;
            if self.prior_session_clean || clean_session {
                self.main_store.drain(|_, _| {});
            } else {
                self.main_store.unmark_all();
            }
            if clean_session {
                self.ids.clear();
            }
            self.main_store.touch(now);
            self.prior_session_clean = clean_session;
        } else {
            fmt::warn!("client: CONNACK rejected");
            self.state = State::Initial;
            self.encoder.close();
        }
    }

    /// EOF is not a failure: the connection is simply gone. The client
    /// returns to the initial state so a fresh `connect` can redial, keeping
    /// non-clean-session entries around for retransmission.
    fn handle_eof(&mut self) {
        fmt::debug!("client: EOF, returning to initial state");
        match self.state {
            State::Connecting => {
                let events = &mut self.events;
                self.connect_store
                    .drain(|kind, cmd| Self::fire_failure(events, kind, &cmd));
            }
            State::Connected => {
                self.main_store.unmark_all();
            }
            State::Initial | State::Failed => {}
        }
        self.state = State::Initial;
        self.rx.reset();
        self.tx.reset();
        self.encoder.reset();
        self.decoder.reset();
    }

    /// Checks both the pending-CONNECT ack deadline (while `Connecting`) and
    /// the per-entry ack deadline plus keep-alive idle timer (while
    /// `Connected`) - the only two states with a store entry that can ever
    /// be "awaiting reply".
    fn check_keep_alive(&mut self, now: Instant) {
        match self.state {
            State::Connecting => {
                let report = self.connect_store.get_timeout(now);
                if report.elapsed && report.kind == crate::store::TimeoutKind::EntryDeadline {
                    fmt::error!("client: CONNACK deadline elapsed, failing connection");
                    self.finalize();
                }
            }
            State::Connected => {
                let report = self.main_store.get_timeout(now);
                if !report.elapsed {
                    return;
                }
                match report.kind {
                    crate::store::TimeoutKind::EntryDeadline => {
                        fmt::error!("client: entry deadline elapsed, failing connection");
                        self.finalize();
                    }
                    crate::store::TimeoutKind::KeepAlive => {
                        fmt::debug!("client: keep-alive idle, queuing PINGREQ");
                        if self
                            .main_store
                            .append(Kind::Pingreq, None, Command::Pingreq, now)
                            .is_ok()
                        {
                            self.main_store.touch(now);
                        }
                    }
                    crate::store::TimeoutKind::None => {}
                }
            }
            State::Initial | State::Failed => {}
        }
    }

    fn touch_current(&mut self, now: Instant) {
        match self.state {
            State::Connecting => self.connect_store.touch(now),
            State::Connected => self.main_store.touch(now),
            State::Initial | State::Failed => {}
        }
    }

    fn current_has_unsent(&self) -> bool {
        match self.state {
            State::Connecting => self.connect_store.has_current(),
            State::Connected => self.main_store.has_current(),
            State::Initial | State::Failed => false,
        }
    }

    fn current_store_capacity(&self) -> usize {
        match self.state {
            State::Connecting => self.connect_store.capacity(),
            State::Connected => self.main_store.capacity(),
            State::Initial | State::Failed => 1,
        }
    }

    /// Fires the completion callback appropriate for an entry dropped
    /// without ever succeeding - on `finalize`, or when its CONNACK never
    /// arrives before EOF. Fire-and-forget reply kinds (PUBACK/PUBREC/
    /// PUBCOMP we queued ourselves) have no caller-visible completion.
    fn fire_failure(events: &mut E, kind: Kind, command: &Command<'_>) {
        match kind {
            Kind::Connect => events.on_connect(false, false),
            Kind::Publish0 | Kind::Publish1 | Kind::Publish2 | Kind::Pubrel => {
                let id = command.packet_id().map(|p| p.get_u16());
                events.on_publish_done(id, false);
            }
            Kind::Subscribe => {
                if let Some(id) = command.packet_id() {
                    events.on_subscribe(id.get_u16(), &[]);
                }
            }
            Kind::Unsubscribe => {
                if let Some(id) = command.packet_id() {
                    events.on_unsubscribe(id.get_u16(), false);
                }
            }
            Kind::Pingreq | Kind::Disconnect | Kind::Puback | Kind::Pubrec | Kind::Pubcomp => {}
        }
    }
}
