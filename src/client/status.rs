use bitflags::bitflags;

bitflags! {
    /// The bitmask `run_once` returns. Combines every suspension/failure
    /// signal the caller needs to decide what to select on next.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RunStatus: u16 {
        const ERROR              = 1 << 0;
        const WOULD_BLOCK_CONN_RD = 1 << 1;
        const WOULD_BLOCK_CONN_WR = 1 << 2;
        const WOULD_BLOCK_DATA_RD = 1 << 3;
        const WOULD_BLOCK_DATA_WR = 1 << 4;
        const EOF                = 1 << 5;
        const QUEUEABLE           = 1 << 6;

        const EOF_RD = Self::EOF.bits() | Self::WOULD_BLOCK_CONN_RD.bits();
        const EOF_WR = Self::EOF.bits() | Self::WOULD_BLOCK_CONN_WR.bits();
    }
}

impl RunStatus {
    pub const fn is_error(self) -> bool {
        self.contains(Self::ERROR)
    }

    pub const fn is_eof(self) -> bool {
        self.contains(Self::EOF)
    }

    pub fn is_eof_rd(self) -> bool {
        self.contains(Self::EOF_RD)
    }

    pub fn is_eof_wr(self) -> bool {
        self.contains(Self::EOF_WR)
    }

    pub fn would_block_conn_rd(self) -> bool {
        self.contains(Self::WOULD_BLOCK_CONN_RD)
    }

    pub fn would_block_conn_wr(self) -> bool {
        self.contains(Self::WOULD_BLOCK_CONN_WR)
    }

    pub fn would_block_data_rd(self) -> bool {
        self.contains(Self::WOULD_BLOCK_DATA_RD)
    }

    pub fn would_block_data_wr(self) -> bool {
        self.contains(Self::WOULD_BLOCK_DATA_WR)
    }

    pub fn is_queueable(self) -> bool {
        self.contains(Self::QUEUEABLE)
    }
}
