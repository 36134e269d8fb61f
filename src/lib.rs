//! An IEEE 802.3 Clause 36 physical coding sublayer for 1000BASE-X.
//!
//! The PCS sits between a GMII and a ten-bit line. It carries the 8B/10B codec, the transmit
//! ordered-set and code-group state machines and the receive state machine, including the
//! low power idle states of Energy Efficient Ethernet. [`Pcs`] runs all of them in lockstep off
//! a single clock.
//!
//! # Limitations
//!
//! - Code-group alignment and synchronization are left to the caller, who provides
//!   `sync_status` and `rx_even` with each received code-group.
//! - Auto-negotiation is not included, only `xmit` and the configuration register pair.

#![cfg_attr(not(test), no_std)]

use defmt_or_log::derive_format_or_debug;

pub mod code_group;
pub mod codec;
pub mod config;
pub mod pcs;
pub mod rx;
pub mod timer;
pub mod tx;

pub use code_group::{CodeGroup, ControlCode, Disparity};
pub use config::{EeeTimerConfig, PcsConfig};
pub use pcs::{Pcs, PcsInputs, PcsOutputs};
pub use timer::{EeeTimer, TickTimer, Timer};

/// Errors when setting up the PCS.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Fewer clock ticks per code-group than the transmit handshakes need.
    CodeGroupPeriodTooShort(u32),
    /// A timer that would fire the moment it is started.
    ZeroTimerDuration(EeeTimer),
}
