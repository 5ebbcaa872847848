//! Internal logging and assertion shim.
//!
//! Every component logs through `trace!`/`debug!`/`warn!`/`error!` from this
//! module instead of reaching for `log`/`defmt` directly, so a build with
//! neither feature enabled compiles the call sites away to nothing rather
//! than failing to find the `log`/`defmt` crates.

macro_rules! log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)*);
    };
}

macro_rules! trace {
    ($($arg:tt)*) => { log!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log!(debug, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log!(error, $($arg)*) };
}

pub(crate) use debug;
pub(crate) use error;
pub(crate) use log;
pub(crate) use trace;
pub(crate) use warn;

pub(crate) use core::debug_assert;
pub(crate) use core::unreachable;
