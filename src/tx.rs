//! Transmit path.
//!
//! The ordered-set machine picks which ordered set goes on the line next from the GMII transmit
//! signals and `xmit`. The code-group machine turns that ordered set into code-groups and
//! acknowledges each completed ordered set with a one tick `indicate` pulse.

use defmt_or_log::derive_format_or_debug;

pub mod code_group;
pub mod ordered_set;

pub use code_group::{CodeGroupInputs, CodeGroupMachine, State as CodeGroupState};
pub use ordered_set::{OrderedSetInputs, OrderedSetMachine, State as OrderedSetState};

/// GMII `TXD` value signalling carrier extension when sent with `TX_ER` and without `TX_EN`.
pub const CARRIER_EXTEND_TXD: u8 = 0x0f;

/// The ordered set handed from the ordered-set machine to the code-group machine.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub enum OrderedSet {
    /// `/C/`
    Config,
    /// `/I/`
    #[default]
    Idle,
    /// `/S/`
    StartOfPacket,
    /// `/T/`
    EndOfPacket1,
    /// `/R/`
    EndOfPacket2or3,
    /// `/V/`
    ErrorPropagation,
    /// `/D/`
    Data,
    /// `/LI/`
    LowPowerIdle,
}

impl OrderedSet {
    /// `/I/` or `/LI/`, both sent as a comma followed by a disparity-selected data code-group.
    pub fn is_idle(self) -> bool {
        matches!(self, OrderedSet::Idle | OrderedSet::LowPowerIdle)
    }
}

/// The auto-negotiation `xmit` variable.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Xmit {
    Configuration,
    Idle,
    Data,
}

/// GMII transmit signals for one code-group period.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct GmiiTx {
    pub txd: u8,
    pub tx_en: bool,
    pub tx_er: bool,
}

impl GmiiTx {
    /// Inter-frame, nothing to send.
    pub const IDLE: Self = Self {
        txd: 0,
        tx_en: false,
        tx_er: false,
    };

    /// A frame octet.
    pub const fn data(txd: u8) -> Self {
        Self {
            txd,
            tx_en: true,
            tx_er: false,
        }
    }

    /// Carrier extension after a frame.
    pub const fn carrier_extend() -> Self {
        Self {
            txd: CARRIER_EXTEND_TXD,
            tx_en: false,
            tx_er: true,
        }
    }

    /// `VOID(x)`: `/V/` when the MAC signals an error instead of `x`.
    pub fn void(&self, ordered_set: OrderedSet) -> OrderedSet {
        let error = (self.tx_en && self.tx_er)
            || (!self.tx_en && self.tx_er && self.txd != CARRIER_EXTEND_TXD);

        if error {
            OrderedSet::ErrorPropagation
        } else {
            ordered_set
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn void_replaces_errors() {
        let errored = GmiiTx {
            txd: 0x12,
            tx_en: true,
            tx_er: true,
        };
        assert_eq!(errored.void(OrderedSet::Data), OrderedSet::ErrorPropagation);

        let extend_error = GmiiTx {
            txd: 0x1f,
            tx_en: false,
            tx_er: true,
        };
        assert_eq!(
            extend_error.void(OrderedSet::EndOfPacket2or3),
            OrderedSet::ErrorPropagation
        );

        assert_eq!(
            GmiiTx::carrier_extend().void(OrderedSet::EndOfPacket2or3),
            OrderedSet::EndOfPacket2or3
        );
        assert_eq!(GmiiTx::data(0xd5).void(OrderedSet::Data), OrderedSet::Data);
    }
}
