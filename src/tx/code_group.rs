//! Transmit code-group state machine.

use super::OrderedSet;
use crate::{
    code_group::{CodeGroup, ControlCode, Disparity, D16_2, D21_5, D26_4, D2_2, D5_6, D6_5},
    codec::Encoder,
};
use defmt_or_log::{derive_format_or_debug, error, trace, warn};

#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum State {
    GenerateCodeGroups,
    SpecialGo,
    DataGo,
    IdleDisparityTest,
    IdleDisparityWrong,
    IdleDisparityOk,
    IdleI1B,
    IdleI2B,
    ConfigurationC1A,
    ConfigurationC1B,
    ConfigurationC1C,
    ConfigurationC1D,
    ConfigurationC2A,
    ConfigurationC2B,
    ConfigurationC2C,
    ConfigurationC2D,
}

impl State {
    /// States that leave as soon as they have decided where to go.
    fn is_transient(self) -> bool {
        matches!(self, State::GenerateCodeGroups | State::IdleDisparityTest)
    }
}

/// Inputs sampled by the code-group machine each tick.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct CodeGroupInputs {
    pub reset: bool,
    /// The ordered set from the ordered-set machine.
    pub tx_o_set: OrderedSet,
    /// The octet to send for `/D/`.
    pub txd: u8,
    /// Configuration register sent in `/C/`.
    pub tx_config_reg: u16,
    /// One code-group period has elapsed.
    pub cg_timer_done: bool,
}

#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct CodeGroupMachine {
    state: State,
    changed: bool,
    encoder: Encoder,
    code_group: CodeGroup,
    tx_even: bool,
    indicate: bool,
    encode_error: bool,
}

impl CodeGroupMachine {
    pub const fn new() -> Self {
        Self {
            state: State::GenerateCodeGroups,
            changed: false,
            encoder: Encoder::new(),
            code_group: CodeGroup::ZERO,
            tx_even: false,
            indicate: false,
            encode_error: false,
        }
    }

    /// Compute the machine for the next tick.
    pub fn step(&self, inputs: &CodeGroupInputs) -> Self {
        if inputs.reset {
            let mut fresh = Self::new();
            fresh.changed = self.state != fresh.state;
            return fresh;
        }

        let mut next = *self;
        next.indicate = false;
        next.encode_error = false;

        match self.transition(inputs) {
            Some(state) => next.enter(state, inputs),
            None => {
                next.changed = false;
                next
            }
        }
    }

    fn transition(&self, inputs: &CodeGroupInputs) -> Option<State> {
        let same_config = inputs.tx_o_set == OrderedSet::Config;

        let next = match self.state {
            State::GenerateCodeGroups => match inputs.tx_o_set {
                OrderedSet::Config => State::ConfigurationC1A,
                OrderedSet::Idle | OrderedSet::LowPowerIdle => State::IdleDisparityTest,
                OrderedSet::Data => State::DataGo,
                OrderedSet::StartOfPacket
                | OrderedSet::EndOfPacket1
                | OrderedSet::EndOfPacket2or3
                | OrderedSet::ErrorPropagation => State::SpecialGo,
            },
            State::IdleDisparityTest => match self.encoder.disparity() {
                Disparity::Positive => State::IdleDisparityWrong,
                Disparity::Negative => State::IdleDisparityOk,
            },
            _ if !inputs.cg_timer_done => return None,
            State::SpecialGo | State::DataGo | State::IdleI1B | State::IdleI2B => {
                State::GenerateCodeGroups
            }
            State::IdleDisparityWrong => State::IdleI1B,
            State::IdleDisparityOk => State::IdleI2B,
            State::ConfigurationC1A => State::ConfigurationC1B,
            State::ConfigurationC1B => State::ConfigurationC1C,
            State::ConfigurationC1C => State::ConfigurationC1D,
            State::ConfigurationC1D if same_config => State::ConfigurationC2A,
            State::ConfigurationC2A => State::ConfigurationC2B,
            State::ConfigurationC2B => State::ConfigurationC2C,
            State::ConfigurationC2C => State::ConfigurationC2D,
            State::ConfigurationC2D if same_config => State::ConfigurationC1A,
            State::ConfigurationC1D | State::ConfigurationC2D => State::GenerateCodeGroups,
        };

        Some(next)
    }

    fn enter(mut self, state: State, inputs: &CodeGroupInputs) -> Self {
        let previous = self.state;
        self.state = state;

        let [config_low, config_high] = inputs.tx_config_reg.to_le_bytes();

        match state {
            State::GenerateCodeGroups | State::IdleDisparityTest => {}
            State::SpecialGo => match special_code(inputs.tx_o_set) {
                Some(code) => {
                    self.emit(code.octet(), true);
                    self.tx_even = !self.tx_even;
                    self.indicate = true;
                }
                None => self.drop_ordered_set(inputs.tx_o_set),
            },
            State::DataGo => {
                self.emit(inputs.txd, false);
                self.tx_even = !self.tx_even;
                self.indicate = true;
            }
            State::IdleDisparityWrong
            | State::IdleDisparityOk
            | State::ConfigurationC1A
            | State::ConfigurationC2A => {
                self.emit(ControlCode::COMMA.octet(), true);
                self.tx_even = true;
            }
            State::IdleI1B | State::IdleI2B => {
                let octet = match (state, inputs.tx_o_set) {
                    (State::IdleI1B, OrderedSet::Idle) => Some(D5_6),
                    (State::IdleI1B, OrderedSet::LowPowerIdle) => Some(D6_5),
                    (State::IdleI2B, OrderedSet::Idle) => Some(D16_2),
                    (State::IdleI2B, OrderedSet::LowPowerIdle) => Some(D26_4),
                    _ => None,
                };

                match octet {
                    Some(octet) => {
                        self.emit(octet, false);
                        self.tx_even = false;
                        self.indicate = true;
                    }
                    None => self.drop_ordered_set(inputs.tx_o_set),
                }
            }
            State::ConfigurationC1B => {
                self.emit(D21_5, false);
                self.tx_even = false;
            }
            State::ConfigurationC2B => {
                self.emit(D2_2, false);
                self.tx_even = false;
            }
            State::ConfigurationC1C | State::ConfigurationC2C => {
                self.emit(config_low, false);
                self.tx_even = true;
            }
            State::ConfigurationC1D | State::ConfigurationC2D => {
                self.emit(config_high, false);
                self.tx_even = false;
                self.indicate = true;
            }
        }

        self.changed = self.state != previous;
        if self.changed && !self.state.is_transient() {
            trace!(
                "Tx code-group: {:?} -> {:?}, {:?}",
                previous,
                self.state,
                self.code_group
            );
        }

        self
    }

    /// No code-group for this ordered set in the current state, start over.
    fn drop_ordered_set(&mut self, tx_o_set: OrderedSet) {
        warn!("No code-group for {:?} in {:?}", tx_o_set, self.state);
        self.state = State::GenerateCodeGroups;
        self.code_group = CodeGroup::ZERO;
    }

    /// Encode into the output register, advancing the running disparity.
    fn emit(&mut self, octet: u8, is_control: bool) {
        match self.encoder.encode(octet, is_control) {
            Ok(code_group) => self.code_group = code_group,
            Err(e) => {
                error!("Unable to encode in {:?}: {:?}", self.state, e);
                self.code_group = CodeGroup::ZERO;
                self.encode_error = true;
            }
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The state changed on the last step.
    pub fn state_changed(&self) -> bool {
        self.changed
    }

    /// The code-group to put on the line at the next code-group boundary.
    pub fn code_group(&self) -> CodeGroup {
        self.code_group
    }

    /// `tx_even`, the current code-group is in an even position.
    pub fn tx_even(&self) -> bool {
        self.tx_even
    }

    /// `TX_OSET.indicate`, pulsed when the last code-group of an ordered set is generated.
    pub fn indicate(&self) -> bool {
        self.indicate
    }

    /// The last code-group could not be encoded.
    pub fn encode_error(&self) -> bool {
        self.encode_error
    }

    /// Transmit running disparity.
    pub fn disparity(&self) -> Disparity {
        self.encoder.disparity()
    }
}

impl Default for CodeGroupMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn special_code(ordered_set: OrderedSet) -> Option<ControlCode> {
    match ordered_set {
        OrderedSet::StartOfPacket => Some(ControlCode::START_OF_PACKET),
        OrderedSet::EndOfPacket1 => Some(ControlCode::END_OF_PACKET),
        OrderedSet::EndOfPacket2or3 => Some(ControlCode::CARRIER_EXTEND),
        OrderedSet::ErrorPropagation => Some(ControlCode::ERROR_PROPAGATION),
        _ => None,
    }
}
