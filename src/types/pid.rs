use core::num::NonZero;

/// A 16-bit packet identifier. Zero is reserved by the protocol for
/// packet kinds that carry no identifier at all, so it is represented as
/// `NonZero<u16>` and can never be constructed as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketIdentifier(NonZero<u16>);

impl PacketIdentifier {
    pub const ONE: Self = Self::new(NonZero::new(1).unwrap());

    pub const fn new(value: NonZero<u16>) -> Self {
        Self(value)
    }

    /// Wraps back to 1 on overflow, since 0 must never be assigned.
    pub fn next(self) -> Self {
        NonZero::new(self.0.get().wrapping_add(1))
            .map(Self)
            .unwrap_or(Self::ONE)
    }

    pub const fn get(self) -> NonZero<u16> {
        self.0
    }

    pub const fn get_u16(self) -> u16 {
        self.get().get()
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        NonZero::new(value).map(Self)
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn next_skips_zero_on_wrap() {
        let max = PacketIdentifier::new(NonZero::new(u16::MAX).unwrap());
        assert_eq!(max.next(), PacketIdentifier::ONE);
    }

    #[test]
    fn from_u16_rejects_zero() {
        assert!(PacketIdentifier::from_u16(0).is_none());
        assert_eq!(
            PacketIdentifier::from_u16(7).map(|p| p.get_u16()),
            Some(7)
        );
    }
}
