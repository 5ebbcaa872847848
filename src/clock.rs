//! Monotonic time and deadline arithmetic.
//!
//! The engine never reads a clock itself; the caller supplies the current
//! time on every call that needs one (`Store::get_timeout`, `Client::run_once`).
//! This mirrors the original reference implementation's `lmqtt_time.c`: a
//! plain `(secs, nsecs)` pair compared with saturating subtraction, no
//! libc `time_t`/`timespec` dependency.

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A monotonic timestamp, expressed as whole seconds plus a sub-second
/// remainder in nanoseconds. `nsecs` is always in `[0, 1_000_000_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant {
    pub secs: u32,
    pub nsecs: u32,
}

impl Instant {
    pub const ZERO: Self = Self { secs: 0, nsecs: 0 };

    pub const fn new(secs: u32, nsecs: u32) -> Self {
        debug_assert!(nsecs < NANOS_PER_SEC, "nsecs out of range");
        Self { secs, nsecs }
    }

    /// Returns `self + whole_seconds`, saturating on overflow.
    pub const fn plus_secs(self, whole_seconds: u32) -> Self {
        Self {
            secs: self.secs.saturating_add(whole_seconds),
            nsecs: self.nsecs,
        }
    }
}

/// The result of comparing a deadline against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Remaining {
    pub secs: u32,
    pub nsecs: u32,
    pub elapsed: bool,
}

impl Remaining {
    const fn zero_elapsed() -> Self {
        Self {
            secs: 0,
            nsecs: 0,
            elapsed: true,
        }
    }
}

/// A deadline that is either disabled (no timeout active) or a concrete
/// instant in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Deadline {
    /// `when == 0` at the call site that produced this: there is no timeout.
    Disabled,
    At(Instant),
}

impl Deadline {
    /// Builds a deadline `whole_seconds` after `touch`. A window of `0`
    /// means "disabled" per spec.
    pub const fn after(touch: Instant, whole_seconds: u32) -> Self {
        if whole_seconds == 0 {
            Self::Disabled
        } else {
            Self::At(touch.plus_secs(whole_seconds))
        }
    }

    /// Time remaining until this deadline, as of `now`. A disabled deadline
    /// never elapses and reports the maximum representable remaining time.
    pub fn remaining_until(self, now: Instant) -> Remaining {
        match self {
            Deadline::Disabled => Remaining {
                secs: u32::MAX,
                nsecs: 0,
                elapsed: false,
            },
            Deadline::At(deadline) => remaining_until(deadline, now),
        }
    }
}

/// Returns the non-negative time remaining until `deadline`, or
/// `elapsed: true` with a zero remainder if `now >= deadline`.
pub fn remaining_until(deadline: Instant, now: Instant) -> Remaining {
    if now.secs > deadline.secs || (now.secs == deadline.secs && now.nsecs >= deadline.nsecs) {
        return Remaining::zero_elapsed();
    }

    let mut secs = deadline.secs - now.secs;
    let nsecs = if deadline.nsecs >= now.nsecs {
        deadline.nsecs - now.nsecs
    } else {
        secs -= 1;
        NANOS_PER_SEC + deadline.nsecs - now.nsecs
    };

    Remaining {
        secs,
        nsecs,
        elapsed: false,
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn remaining_before_deadline() {
        let r = remaining_until(Instant::new(10, 0), Instant::new(4, 500_000_000));
        assert!(!r.elapsed);
        assert_eq!(r.secs, 5);
        assert_eq!(r.nsecs, 500_000_000);
    }

    #[test]
    fn remaining_at_deadline_is_elapsed() {
        let r = remaining_until(Instant::new(10, 0), Instant::new(10, 0));
        assert!(r.elapsed);
        assert_eq!((r.secs, r.nsecs), (0, 0));
    }

    #[test]
    fn remaining_past_deadline_is_elapsed() {
        let r = remaining_until(Instant::new(10, 0), Instant::new(21, 0));
        assert!(r.elapsed);
        assert_eq!((r.secs, r.nsecs), (0, 0));
    }

    #[test]
    fn deadline_disabled_when_window_zero() {
        let d = Deadline::after(Instant::new(10, 0), 0);
        assert_eq!(d, Deadline::Disabled);
        assert!(!d.remaining_until(Instant::new(1_000_000, 0)).elapsed);
    }

    #[test]
    fn deadline_after_adds_whole_seconds() {
        let d = Deadline::after(Instant::new(10, 500), 5);
        assert_eq!(d, Deadline::At(Instant::new(15, 500)));
    }
}
