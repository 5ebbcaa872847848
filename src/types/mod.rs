//! Small value types shared across the wire codec and the client.

mod pid;
mod qos;
mod reason_code;

pub use pid::PacketIdentifier;
pub use qos::QoS;
pub use reason_code::{ConnectReturnCode, SubscribeReturnCode};
