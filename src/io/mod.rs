//! Caller-provided I/O abstractions.
//!
//! Nothing in this crate ever performs a syscall. The host implements
//! [`Transport`] over its socket and [`PayloadReader`]/[`PayloadWriter`] over
//! whatever backs an outbound or inbound application payload (usually a plain
//! byte slice, sometimes a streaming source such as a file).

mod payload;
mod transport;

pub use payload::{PayloadReader, PayloadWriter, SliceReader, SliceWriter};
pub use transport::{IoResult, StreamError, Transport};
