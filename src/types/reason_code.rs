//! CONNACK and SUBACK return codes. MQTT 3.1.1 calls these "return codes",
//! not the richer v5 "reason codes" - this engine only needs the handful of
//! 3.1.1 values.

/// CONNACK return code (the single byte following the session-present flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadUsernameOrPassword = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUsernameOrPassword,
            5 => Self::NotAuthorized,
            _ => return None,
        })
    }

    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// SUBACK per-topic return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubscribeReturnCode {
    MaximumQoS0 = 0x00,
    MaximumQoS1 = 0x01,
    MaximumQoS2 = 0x02,
    Failure = 0x80,
}

impl SubscribeReturnCode {
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::MaximumQoS0,
            0x01 => Self::MaximumQoS1,
            0x02 => Self::MaximumQoS2,
            0x80 => Self::Failure,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn connect_return_code_rejects_out_of_range() {
        assert!(ConnectReturnCode::from_u8(6).is_none());
        assert_eq!(ConnectReturnCode::from_u8(0), Some(ConnectReturnCode::Accepted));
    }

    #[test]
    fn subscribe_return_code_rejects_reserved() {
        assert!(SubscribeReturnCode::from_u8(0x03).is_none());
        assert_eq!(
            SubscribeReturnCode::from_u8(0x80),
            Some(SubscribeReturnCode::Failure)
        );
    }
}
