//! The in-flight store: an ordered queue of pending protocol operations,
//! partitioned into "not yet sent" (`[pos..count)`) and "awaiting peer
//! response" (`[0..pos)`).
//!
//! Two instances exist per client - a capacity-1 `connect_store` that holds
//! the CONNECT while its CONNACK is outstanding, and a capacity-`C`
//! `main_store` used once the session is established - so CONNECT never
//! contends with queued non-clean-session packets for a slot.

mod command;

pub use command::{
    Command, ConnectCommand, PublishCommand, SubscribeCommand, Subscription, UnsubscribeCommand,
    Will, MAX_SUBSCRIPTIONS,
};

use heapless::Vec;

use crate::clock::{Deadline, Instant};
use crate::types::PacketIdentifier;

/// The store-relevant packet kinds (outbound commands). Inbound-only wire
/// types (CONNACK, SUBACK, UNSUBACK, PINGRESP, inbound PUBLISH) never occupy
/// a store slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    Connect,
    Publish0,
    Publish1,
    Publish2,
    Subscribe,
    Unsubscribe,
    Pubrel,
    Pingreq,
    Disconnect,
    Puback,
    Pubrec,
    Pubcomp,
}

pub struct StoreEntry<'a> {
    pub kind: Kind,
    pub packet_id: Option<PacketIdentifier>,
    pub touch_time: Instant,
    pub value: Command<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreFull;

/// Which deadline `get_timeout` is reporting on: the oldest awaiting-reply
/// entry's per-entry timeout takes priority; only once nothing is awaiting
/// reply does whole-store keep-alive inactivity apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutKind {
    /// No deadline is active (nothing awaiting reply and keep-alive is 0).
    None,
    EntryDeadline,
    KeepAlive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeoutReport {
    pub kind: TimeoutKind,
    pub elapsed: bool,
    pub secs: u32,
    pub nsecs: u32,
}

pub struct Store<'a, const N: usize> {
    entries: Vec<StoreEntry<'a>, N>,
    pos: usize,
    next_packet_id: PacketIdentifier,
    keep_alive_secs: u16,
    timeout_secs: u16,
    last_touch: Instant,
}

impl<'a, const N: usize> Store<'a, N> {
    pub fn new(timeout_secs: u16) -> Self {
        Self {
            entries: Vec::new(),
            pos: 0,
            next_packet_id: PacketIdentifier::ONE,
            keep_alive_secs: 0,
            timeout_secs,
            last_touch: Instant::ZERO,
        }
    }

    pub fn set_keep_alive(&mut self, keep_alive_secs: u16) {
        self.keep_alive_secs = keep_alive_secs;
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_queueable(&self) -> bool {
        self.entries.len() < N
    }

    pub fn has_current(&self) -> bool {
        self.pos < self.entries.len()
    }

    /// Returns the next packet identifier and advances the counter,
    /// skipping zero on wraparound.
    pub fn next_id(&mut self) -> PacketIdentifier {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.next();
        id
    }

    pub fn append(
        &mut self,
        kind: Kind,
        packet_id: Option<PacketIdentifier>,
        value: Command<'a>,
        now: Instant,
    ) -> Result<(), StoreFull> {
        self.entries
            .push(StoreEntry {
                kind,
                packet_id,
                touch_time: now,
                value,
            })
            .map_err(|_| StoreFull)
    }

    pub fn peek(&self) -> Option<&StoreEntry<'a>> {
        self.entries.get(self.pos)
    }

    pub fn peek_mut(&mut self) -> Option<&mut StoreEntry<'a>> {
        self.entries.get_mut(self.pos)
    }

    /// Advances `pos` past the peeked entry (it is now sent, awaiting
    /// reply) and refreshes its touch time.
    pub fn mark_current(&mut self, now: Instant) {
        if let Some(entry) = self.entries.get_mut(self.pos) {
            entry.touch_time = now;
            self.pos += 1;
        }
    }

    /// Removes the peeked (unsent) entry outright - used for QoS-0 PUBLISH
    /// and DISCONNECT, whose success means only "bytes handed to the
    /// transport".
    pub fn drop_current(&mut self) -> Option<Command<'a>> {
        if self.pos < self.entries.len() {
            Some(self.entries.remove(self.pos).value)
        } else {
            None
        }
    }

    /// Finds the first entry in `[0..pos)` with a matching kind and packet
    /// id (id is ignored for CONNECT and PINGREQ, which carry none),
    /// removes it and returns its command.
    pub fn pop_marked_by(&mut self, kind: Kind, packet_id: Option<PacketIdentifier>) -> Option<Command<'a>> {
        let index = self.entries[..self.pos].iter().position(|e| {
            e.kind == kind
                && match kind {
                    Kind::Connect | Kind::Pingreq => true,
                    _ => e.packet_id == packet_id,
                }
        })?;
        self.pos -= 1;
        Some(self.entries.remove(index).value)
    }

    /// Removes and returns `entries[0]` regardless of position - used to
    /// flush the queue on failure or reconnect.
    pub fn shift(&mut self) -> Option<(Kind, Command<'a>)> {
        if self.entries.is_empty() {
            return None;
        }
        if self.pos > 0 {
            self.pos -= 1;
        }
        let entry = self.entries.remove(0);
        Some((entry.kind, entry.value))
    }

    /// Resets `pos` to 0 so every entry is unsent again - used after a
    /// session-preserving reconnect so queued packets are retransmitted.
    pub fn unmark_all(&mut self) {
        self.pos = 0;
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_touch = now;
    }

    pub fn last_touch(&self) -> Instant {
        self.last_touch
    }

    pub fn get_timeout(&self, now: Instant) -> TimeoutReport {
        if self.pos > 0 {
            // FIFO order: entries[0] has the oldest touch_time among the
            // awaiting-reply segment, so if it has not expired nothing has.
            let deadline = Deadline::after(self.entries[0].touch_time, self.timeout_secs as u32);
            let remaining = deadline.remaining_until(now);
            return TimeoutReport {
                kind: TimeoutKind::EntryDeadline,
                elapsed: remaining.elapsed,
                secs: remaining.secs,
                nsecs: remaining.nsecs,
            };
        }

        if self.keep_alive_secs != 0 {
            let deadline = Deadline::after(self.last_touch, self.keep_alive_secs as u32);
            let remaining = deadline.remaining_until(now);
            return TimeoutReport {
                kind: TimeoutKind::KeepAlive,
                elapsed: remaining.elapsed,
                secs: remaining.secs,
                nsecs: remaining.nsecs,
            };
        }

        TimeoutReport {
            kind: TimeoutKind::None,
            elapsed: false,
            secs: u32::MAX,
            nsecs: 0,
        }
    }

    /// Drains every entry, invoking `on_drop` with each so the caller can
    /// fire completion callbacks with `succeeded=false`.
    pub fn drain(&mut self, mut on_drop: impl FnMut(Kind, Command<'a>)) {
        while let Some(entry) = self.entries.pop() {
            on_drop(entry.kind, entry.value);
        }
        self.pos = 0;
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    fn store() -> Store<'static, 4> {
        Store::new(10)
    }

    #[test]
    fn append_peek_mark_pop_round_trip() {
        let mut s = store();
        let id = s.next_id();
        s.append(Kind::Publish1, Some(id), Command::Pingreq, Instant::ZERO)
            .unwrap();
        assert!(s.has_current());
        s.mark_current(Instant::new(1, 0));
        assert!(!s.has_current());
        let popped = s.pop_marked_by(Kind::Publish1, Some(id));
        assert!(popped.is_some());
        assert!(!s.has_current());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn drop_current_removes_unsent_entry() {
        let mut s = store();
        s.append(Kind::Publish0, None, Command::Pingreq, Instant::ZERO)
            .unwrap();
        assert!(s.drop_current().is_some());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn shift_flushes_head_regardless_of_position() {
        let mut s = store();
        s.append(Kind::Pingreq, None, Command::Pingreq, Instant::ZERO)
            .unwrap();
        s.append(Kind::Disconnect, None, Command::Disconnect, Instant::ZERO)
            .unwrap();
        s.mark_current(Instant::ZERO);
        let (kind, _) = s.shift().unwrap();
        assert_eq!(kind, Kind::Pingreq);
        assert!(s.has_current());
    }

    #[test]
    fn unmark_all_resets_position() {
        let mut s = store();
        s.append(Kind::Pingreq, None, Command::Pingreq, Instant::ZERO)
            .unwrap();
        s.mark_current(Instant::ZERO);
        assert!(!s.has_current());
        s.unmark_all();
        assert!(s.has_current());
    }

    #[test]
    fn append_fails_at_capacity() {
        let mut s: Store<'static, 1> = Store::new(10);
        s.append(Kind::Pingreq, None, Command::Pingreq, Instant::ZERO)
            .unwrap();
        assert_eq!(
            s.append(Kind::Pingreq, None, Command::Pingreq, Instant::ZERO),
            Err(StoreFull)
        );
    }

    #[test]
    fn get_timeout_prefers_entry_deadline_over_keep_alive() {
        let mut s = store();
        s.set_keep_alive(5);
        s.append(Kind::Pingreq, None, Command::Pingreq, Instant::ZERO)
            .unwrap();
        s.mark_current(Instant::ZERO);
        let report = s.get_timeout(Instant::new(20, 0));
        assert_eq!(report.kind, TimeoutKind::EntryDeadline);
        assert!(report.elapsed);
    }

    #[test]
    fn get_timeout_falls_back_to_keep_alive_when_idle() {
        let mut s = store();
        s.set_keep_alive(5);
        s.touch(Instant::new(10, 0));
        let report = s.get_timeout(Instant::new(16, 0));
        assert_eq!(report.kind, TimeoutKind::KeepAlive);
        assert!(report.elapsed);
    }
}
