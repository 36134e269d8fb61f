//! Transmit ordered-set state machine.

use super::{GmiiTx, OrderedSet, Xmit};
use defmt_or_log::{debug, derive_format_or_debug, trace};

#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum State {
    TestXmit,
    Configuration,
    Idle,
    XmitData,
    AlignErrStart,
    StartError,
    TxDataError,
    StartOfPacket,
    /// Routes on `TX_EN`/`TX_ER` in the same tick it is entered, so it is never held.
    TxPacket,
    TxData,
    EndOfPacketNoExt,
    Epd2NoExt,
    Epd3,
    EndOfPacketExt,
    ExtendBy1,
    CarrierExtend,
    XmitLowPowerIdle,
}

/// Inputs sampled by the ordered-set machine each tick.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct OrderedSetInputs {
    pub reset: bool,
    pub xmit: Xmit,
    pub gmii: GmiiTx,
    pub assert_lpidle: bool,
    /// `TX_OSET.indicate` from the code-group machine.
    pub indicate: bool,
    /// `tx_even` from the code-group machine.
    pub tx_even: bool,
}

#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct OrderedSetMachine {
    state: State,
    changed: bool,
    tx_o_set: OrderedSet,
    transmitting: bool,
    xmit_change: bool,
    last_xmit: Option<Xmit>,
}

impl OrderedSetMachine {
    pub const fn new() -> Self {
        Self {
            state: State::TestXmit,
            changed: false,
            tx_o_set: OrderedSet::Idle,
            transmitting: false,
            xmit_change: false,
            last_xmit: None,
        }
    }

    /// Compute the machine for the next tick.
    pub fn step(&self, inputs: &OrderedSetInputs) -> Self {
        if inputs.reset {
            let mut fresh = Self::new();
            fresh.changed = self.state != fresh.state;
            return fresh;
        }

        let mut next = *self;
        next.xmit_change |= self.last_xmit.is_some_and(|last| last != inputs.xmit);
        next.last_xmit = Some(inputs.xmit);

        let target = if next.xmit_change && inputs.indicate && !inputs.tx_even {
            debug!("xmit is now {:?}, restarting ordered sets", inputs.xmit);
            Some(State::TestXmit)
        } else {
            self.transition(inputs)
        };

        match target {
            Some(state) => next.enter(state, inputs),
            None => {
                next.changed = false;
                next
            }
        }
    }

    fn transition(&self, inputs: &OrderedSetInputs) -> Option<State> {
        let gmii = &inputs.gmii;

        match self.state {
            State::TestXmit => Some(match inputs.xmit {
                Xmit::Configuration => State::Configuration,
                Xmit::Data if !gmii.tx_en && !gmii.tx_er => State::XmitData,
                Xmit::Idle | Xmit::Data => State::Idle,
            }),
            State::Configuration => None,
            State::Idle => (inputs.xmit == Xmit::Data
                && inputs.indicate
                && !gmii.tx_en
                && !gmii.tx_er)
                .then_some(State::XmitData),
            State::TxPacket => Some(tx_packet(gmii)),
            _ if !inputs.indicate => None,
            State::XmitData => match (gmii.tx_en, gmii.tx_er) {
                (true, false) => Some(State::StartOfPacket),
                (true, true) => Some(State::AlignErrStart),
                (false, _) if inputs.assert_lpidle => Some(State::XmitLowPowerIdle),
                (false, _) => None,
            },
            State::XmitLowPowerIdle => (!inputs.assert_lpidle).then_some(State::XmitData),
            State::AlignErrStart => Some(State::StartError),
            State::StartError => Some(State::TxDataError),
            State::StartOfPacket | State::TxData | State::TxDataError => Some(tx_packet(gmii)),
            State::EndOfPacketNoExt | State::ExtendBy1 => Some(State::Epd2NoExt),
            State::Epd2NoExt if inputs.tx_even => Some(State::Epd3),
            State::Epd2NoExt | State::Epd3 => Some(State::XmitData),
            State::EndOfPacketExt if gmii.tx_er => Some(State::CarrierExtend),
            State::EndOfPacketExt => Some(State::ExtendBy1),
            State::CarrierExtend => Some(match (gmii.tx_en, gmii.tx_er) {
                (false, false) => State::ExtendBy1,
                (true, false) => State::StartOfPacket,
                (true, true) => State::StartError,
                (false, true) => State::CarrierExtend,
            }),
        }
    }

    fn enter(mut self, state: State, inputs: &OrderedSetInputs) -> Self {
        let gmii = &inputs.gmii;

        self.changed = state != self.state;
        if self.changed {
            trace!("Tx ordered set: {:?} -> {:?}", self.state, state);
        }
        self.state = state;

        match state {
            State::TestXmit => {
                self.transmitting = false;
                self.xmit_change = false;
            }
            State::Configuration => self.tx_o_set = OrderedSet::Config,
            State::Idle | State::XmitData | State::AlignErrStart => {
                self.tx_o_set = OrderedSet::Idle
            }
            State::XmitLowPowerIdle => self.tx_o_set = OrderedSet::LowPowerIdle,
            State::StartOfPacket | State::StartError => {
                self.transmitting = true;
                self.tx_o_set = OrderedSet::StartOfPacket;
            }
            State::TxDataError => self.tx_o_set = OrderedSet::ErrorPropagation,
            State::TxPacket => {}
            State::TxData => self.tx_o_set = gmii.void(OrderedSet::Data),
            State::EndOfPacketNoExt => {
                if !inputs.tx_even {
                    self.transmitting = false;
                }
                self.tx_o_set = OrderedSet::EndOfPacket1;
            }
            State::Epd2NoExt => {
                self.transmitting = false;
                self.tx_o_set = OrderedSet::EndOfPacket2or3;
            }
            State::Epd3 => self.tx_o_set = OrderedSet::EndOfPacket2or3,
            State::EndOfPacketExt => self.tx_o_set = gmii.void(OrderedSet::EndOfPacket1),
            State::ExtendBy1 => {
                if !inputs.tx_even {
                    self.transmitting = false;
                }
                self.tx_o_set = OrderedSet::EndOfPacket2or3;
            }
            State::CarrierExtend => self.tx_o_set = gmii.void(OrderedSet::EndOfPacket2or3),
        }

        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The state changed on the last step.
    pub fn state_changed(&self) -> bool {
        self.changed
    }

    /// The ordered set for the code-group machine.
    pub fn tx_o_set(&self) -> OrderedSet {
        self.tx_o_set
    }

    pub fn transmitting(&self) -> bool {
        self.transmitting
    }

    /// A change of `xmit` is waiting for the next odd ordered-set boundary.
    pub fn xmit_change(&self) -> bool {
        self.xmit_change
    }

    /// `COL`, both directions carrying a frame at once.
    pub fn collision(&self, receiving: bool) -> bool {
        self.transmitting && receiving
    }
}

impl Default for OrderedSetMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// `TX_PACKET`
fn tx_packet(gmii: &GmiiTx) -> State {
    match (gmii.tx_en, gmii.tx_er) {
        (true, false) => State::TxData,
        (true, true) => State::TxDataError,
        (false, false) => State::EndOfPacketNoExt,
        (false, true) => State::EndOfPacketExt,
    }
}
