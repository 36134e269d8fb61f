//! Receive state machine.
//!
//! Received code-groups are decoded on arrival and kept in a three entry window. The machine
//! acts on the oldest code-group once the window is full, so `check_end` sees the code-group
//! being handled together with the two that follow it on the line.
//!
//! A state that does not wait for a code-group decides on the next step against the window it
//! was entered with. When a code-group arrives on that step the pending decision is taken first,
//! so code-groups may arrive on every tick. The window is emptied on entering `QUIET` and
//! `LINK_FAILED`, so nothing received before either is acted on afterwards.

use crate::{
    code_group::{CodeGroup, ControlCode, Disparity},
    codec::Decoder,
    timer::EeeTimerSignals,
    tx::Xmit,
};
use defmt_or_log::{debug, derive_format_or_debug, trace};

pub mod check_end;

pub use check_end::{check_end, CheckEnd, ReceivedCodeGroup, Window};

/// `RXD` for a false carrier.
pub const FALSE_CARRIER_RXD: u8 = 0x0e;
/// `RXD` for the start of a frame, standing in for the `/S/` code-group.
pub const PREAMBLE_RXD: u8 = 0x55;
/// `RXD` for carrier extension.
pub const CARRIER_EXTEND_RXD: u8 = 0x0f;
/// `RXD` for carrier extension with an error.
pub const EXTEND_ERROR_RXD: u8 = 0x1f;
/// `RXD` while the link partner is in low power idle.
pub const LPI_RXD: u8 = 0x01;

/// Saturation value of the 4-bit wake error counter.
pub const WAKE_ERROR_COUNTER_MAX: u8 = 0x0f;

#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum State {
    LinkFailed,
    WaitForK,
    K,
    ConfigB,
    ConfigC,
    ConfigD,
    IdleD,
    Invalid,
    CarrierDetect,
    FalseCarrier,
    StartOfPacket,
    Receive,
    Data,
    DataError,
    EarlyEnd,
    TriRri,
    TrrExtend,
    Epd2CheckEnd,
    PacketBurstRrs,
    ExtendErr,
    EarlyEndExt,
    Sleep,
    StartTqTimer,
    LpIdleD,
    LpiK,
    Quiet,
    Wake,
    Wtf,
    LinkFail,
    WakeDone,
}

impl State {
    /// States that decide on the next step without waiting for a new code-group.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            State::CarrierDetect
                | State::Receive
                | State::Epd2CheckEnd
                | State::Sleep
                | State::StartTqTimer
                | State::LinkFail
        )
    }

    /// `rx_lpi_active`
    pub fn is_low_power(self) -> bool {
        matches!(
            self,
            State::Sleep
                | State::StartTqTimer
                | State::LpIdleD
                | State::LpiK
                | State::Quiet
                | State::Wake
                | State::Wtf
                | State::WakeDone
        )
    }
}

/// `sync_status` from the synchronization process.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Fail,
    Ok,
}

/// `signal_detect` from the PMA.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SignalDetect {
    Fail,
    Ok,
}

/// Receive unit data indication to auto-negotiation.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Rudi {
    /// `RUDI(INVALID)`
    Invalid,
    /// `RUDI(/C/)`, the configuration register was received.
    Config,
    /// `RUDI(/I/)`
    Idle,
}

/// GMII receive signals.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct GmiiRx {
    pub rxd: u8,
    pub rx_dv: bool,
    pub rx_er: bool,
}

/// Inputs sampled by the receive machine each tick.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct RxInputs {
    pub reset: bool,
    /// A code-group arrived this tick.
    pub code_group: Option<CodeGroup>,
    /// `rx_even` for the arriving code-group.
    pub even: bool,
    pub sync_status: SyncStatus,
    pub signal_detect: SignalDetect,
    pub xmit: Xmit,
    /// Done levels of the EEE timers.
    pub timers: EeeTimerSignals,
}

/// `carrier_detect`, the code-group is too far from a comma to be idle.
///
/// The expected comma is the one for the running disparity the code-group arrived with.
pub fn carrier_detect(received: &ReceivedCodeGroup) -> bool {
    let code_group = received.code_group;
    let expected = code_group.distance(CodeGroup::comma(received.disparity));
    let negative = code_group.distance(CodeGroup::COMMA_NEGATIVE);
    let positive = code_group.distance(CodeGroup::COMMA_POSITIVE);

    (2..=9).contains(&expected) || (negative >= 2 && positive >= 2)
}

#[derive(Clone)]
pub struct RxMachine {
    state: State,
    changed: bool,
    decoder: Decoder,
    window: Window,
    gmii: GmiiRx,
    receiving: bool,
    rx_config_reg: u16,
    rudi: Option<Rudi>,
    wake_error_counter: u8,
}

impl RxMachine {
    pub fn new() -> Self {
        Self {
            state: State::LinkFailed,
            changed: false,
            decoder: Decoder::new(),
            window: Window::new(),
            gmii: GmiiRx::default(),
            receiving: false,
            rx_config_reg: 0,
            rudi: None,
            wake_error_counter: 0,
        }
    }

    /// Compute the machine for the next tick.
    pub fn step(&self, inputs: &RxInputs) -> Self {
        if inputs.reset {
            let mut fresh = Self::new();
            fresh.changed = self.state != fresh.state;
            return fresh;
        }

        let mut next = self.clone();
        next.rudi = None;

        let Some(code_group) = inputs.code_group else {
            if let Some(state) = next.transition(inputs, false) {
                next = next.enter(state, inputs);
            }
            next.changed = next.state != self.state;
            return next;
        };

        // Anything entered on the last tick still decides on the window it was entered with.
        while next.state.is_transient() {
            match next.transition(inputs, false) {
                Some(state) => next = next.enter(state, inputs),
                None => break,
            }
        }

        let received = ReceivedCodeGroup::receive(&mut next.decoder, code_group, inputs.even);
        next.window.write(received);
        let sudi = next.window.len() == check_end::WINDOW;

        let target = if inputs.sync_status == SyncStatus::Fail {
            Some(State::LinkFailed)
        } else {
            next.transition(inputs, sudi)
        };

        if let Some(state) = target {
            next = next.enter(state, inputs);
        }
        next.changed = next.state != self.state;
        next
    }

    /// The code-group being handled, the oldest in a full window.
    pub fn current(&self) -> Option<&ReceivedCodeGroup> {
        if self.window.len() < check_end::WINDOW {
            return None;
        }

        self.window.oldest_ordered().next()
    }

    fn transition(&self, inputs: &RxInputs, sudi: bool) -> Option<State> {
        let signal_ok = inputs.signal_detect == SignalDetect::Ok;
        let done = inputs.timers;
        // A comma in an even position arrived on this tick.
        let comma = sudi && self.current().is_some_and(|c| c.is_aligned_comma());

        let next = match self.state {
            State::Sleep => State::StartTqTimer,
            State::StartTqTimer => State::LpIdleD,
            State::LinkFail => State::LinkFailed,

            State::LpIdleD | State::LpiK if !signal_ok => State::Quiet,
            State::LpIdleD if done.quiet => State::LinkFail,
            State::Quiet if signal_ok => State::Wake,
            State::Quiet if done.quiet => State::LinkFail,
            State::Wake if comma && inputs.sync_status == SyncStatus::Ok => State::WakeDone,
            State::Wake if done.wake => State::Wtf,
            State::Wtf if comma => State::WakeDone,
            State::Wtf if done.wake_fault => State::LinkFail,
            State::Quiet | State::Wake | State::Wtf => return None,

            _ => return self.on_code_group(*self.current()?, inputs, sudi),
        };

        Some(next)
    }

    /// Transitions that look at the current code-group.
    fn on_code_group(
        &self,
        current: ReceivedCodeGroup,
        inputs: &RxInputs,
        sudi: bool,
    ) -> Option<State> {
        let data_mode = inputs.xmit == Xmit::Data;

        let next = match self.state {
            State::CarrierDetect if current.is(ControlCode::START_OF_PACKET) => {
                State::StartOfPacket
            }
            State::CarrierDetect => State::FalseCarrier,
            State::Receive => receive(&current, CheckEnd::classify(&self.window)),
            State::Epd2CheckEnd => match CheckEnd::classify(&self.window) {
                CheckEnd::EarlyExtendError => State::TrrExtend,
                CheckEnd::NormalEnd if current.is(ControlCode::CARRIER_EXTEND) => State::TriRri,
                CheckEnd::PacketBurst => State::PacketBurstRrs,
                _ => State::ExtendErr,
            },

            _ if !sudi => return None,

            State::LinkFailed => State::WaitForK,
            State::WaitForK | State::FalseCarrier if current.is_aligned_comma() => State::K,
            State::WaitForK | State::FalseCarrier => return None,
            State::K if current.is_config_data() => State::ConfigB,
            State::K if data_mode && current.is_lpi_data() => State::Sleep,
            State::K if data_mode || current.is_data() => State::IdleD,
            State::K => State::Invalid,
            State::ConfigB if current.is_data() => State::ConfigC,
            State::ConfigC if current.is_data() => State::ConfigD,
            State::ConfigD if current.is_aligned_comma() => State::K,
            State::ConfigB | State::ConfigC | State::ConfigD => State::Invalid,
            State::Invalid if current.is_aligned_comma() => State::K,
            State::Invalid => State::WaitForK,
            State::IdleD if !current.is_comma() && !data_mode => State::Invalid,
            State::IdleD if data_mode && carrier_detect(&current) => State::CarrierDetect,
            State::IdleD => State::K,
            State::StartOfPacket | State::Data | State::DataError => State::Receive,
            State::EarlyEnd if current.is_config_data() => State::ConfigB,
            State::EarlyEnd => State::IdleD,
            State::TriRri if current.is_comma() => State::K,
            State::TriRri => return None,
            State::TrrExtend | State::EarlyEndExt => State::Epd2CheckEnd,
            State::PacketBurstRrs | State::ExtendErr
                if current.is(ControlCode::START_OF_PACKET) =>
            {
                State::StartOfPacket
            }
            State::PacketBurstRrs => return None,
            State::ExtendErr if current.is_aligned_comma() => State::K,
            State::ExtendErr => State::Epd2CheckEnd,
            State::LpIdleD if current.is_aligned_comma() => State::LpiK,
            State::LpIdleD => return None,
            State::LpiK if current.is_lpi_data() => State::LpIdleD,
            State::WakeDone if current.is_lpi_data() => State::Sleep,
            State::LpiK | State::WakeDone => leave_low_power(&current),
            State::Sleep
            | State::StartTqTimer
            | State::LinkFail
            | State::Quiet
            | State::Wake
            | State::Wtf => return None,
        };

        Some(next)
    }

    fn enter(mut self, state: State, inputs: &RxInputs) -> Self {
        let previous = self.state;
        self.changed = state != previous;
        if self.changed {
            trace!("Rx: {:?} -> {:?}", previous, state);
        }
        self.state = state;

        let octet = self.current().map(|c| c.decoded.octet).unwrap_or_default();

        match state {
            State::LinkFailed => {
                self.window = Window::new();
                if inputs.xmit != Xmit::Data {
                    self.rudi = Some(Rudi::Invalid);
                }
                if self.receiving {
                    self.receiving = false;
                    self.gmii.rx_er = true;
                } else {
                    self.gmii.rx_dv = false;
                    self.gmii.rx_er = false;
                }
                if self.changed {
                    debug!("Receive link failed");
                }
            }
            State::WaitForK | State::K | State::ConfigB | State::IdleD | State::TriRri => {
                self.receiving = false;
                self.gmii.rx_dv = false;
                self.gmii.rx_er = false;

                if state == State::IdleD {
                    self.rudi = Some(Rudi::Idle);
                } else if state == State::K && previous == State::ConfigD {
                    trace!("Received configuration {:#06x}", self.rx_config_reg);
                    self.rudi = Some(Rudi::Config);
                }
            }
            State::ConfigC => {
                self.rx_config_reg = (self.rx_config_reg & 0xff00) | u16::from(octet);
            }
            State::ConfigD => {
                self.rx_config_reg = (self.rx_config_reg & 0x00ff) | (u16::from(octet) << 8);
            }
            State::Invalid => {
                if inputs.xmit == Xmit::Configuration {
                    self.rudi = Some(Rudi::Invalid);
                }
                if self.receiving {
                    self.gmii.rx_er = true;
                }
            }
            State::CarrierDetect => self.receiving = true,
            State::FalseCarrier => {
                self.gmii.rx_er = true;
                self.gmii.rxd = FALSE_CARRIER_RXD;
            }
            State::StartOfPacket => {
                self.gmii = GmiiRx {
                    rxd: PREAMBLE_RXD,
                    rx_dv: true,
                    rx_er: false,
                }
            }
            State::Data => {
                self.gmii.rx_er = false;
                self.gmii.rxd = octet;
            }
            State::DataError | State::EarlyEnd | State::EarlyEndExt => self.gmii.rx_er = true,
            State::TrrExtend => {
                self.gmii = GmiiRx {
                    rxd: CARRIER_EXTEND_RXD,
                    rx_dv: false,
                    rx_er: true,
                }
            }
            State::PacketBurstRrs => {
                self.gmii.rx_dv = false;
                self.gmii.rxd = CARRIER_EXTEND_RXD;
            }
            State::ExtendErr => {
                self.gmii.rx_dv = false;
                self.gmii.rxd = EXTEND_ERROR_RXD;
            }
            State::Sleep => {
                self.receiving = false;
                self.gmii = GmiiRx {
                    rxd: LPI_RXD,
                    rx_dv: false,
                    rx_er: true,
                };
            }
            State::Quiet => self.window = Window::new(),
            State::Wtf => {
                self.wake_error_counter = (self.wake_error_counter + 1).min(WAKE_ERROR_COUNTER_MAX);
                debug!("Wake fault, {} so far", self.wake_error_counter);
            }
            State::Receive
            | State::Epd2CheckEnd
            | State::StartTqTimer
            | State::LpIdleD
            | State::LpiK
            | State::Wake
            | State::LinkFail
            | State::WakeDone => {}
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

    pub fn gmii(&self) -> GmiiRx {
        self.gmii
    }

    /// A frame is being received, the carrier sense for `COL`.
    pub fn receiving(&self) -> bool {
        self.receiving
    }

    /// The last configuration register received.
    pub fn rx_config_reg(&self) -> u16 {
        self.rx_config_reg
    }

    /// This tick's RUDI pulse.
    pub fn rudi(&self) -> Option<Rudi> {
        self.rudi
    }

    pub fn rx_lpi_active(&self) -> bool {
        self.state.is_low_power()
    }

    pub fn rx_quiet(&self) -> bool {
        self.state == State::Quiet
    }

    /// Number of failed wakes, saturating at 15.
    pub fn wake_error_counter(&self) -> u8 {
        self.wake_error_counter
    }

    /// Receive running disparity.
    pub fn disparity(&self) -> Disparity {
        self.decoder.disparity()
    }

    /// Start levels of the EEE timers.
    pub fn timer_starts(&self) -> EeeTimerSignals {
        EeeTimerSignals {
            quiet: matches!(
                self.state,
                State::StartTqTimer | State::LpIdleD | State::LpiK | State::Quiet
            ),
            wake: self.state == State::Wake,
            wake_fault: self.state == State::Wtf,
        }
    }
}

impl Default for RxMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "log")]
impl core::fmt::Debug for RxMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxMachine")
            .field("state", &self.state)
            .field("current", &self.current())
            .field("gmii", &self.gmii)
            .field("receiving", &self.receiving)
            .field("rx_config_reg", &self.rx_config_reg)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RxMachine {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "RxMachine {{ state: {}, gmii: {}, receiving: {}, rx_config_reg: {=u16:#x} }}",
            self.state,
            self.gmii,
            self.receiving,
            self.rx_config_reg
        )
    }
}

/// `RECEIVE`, pick the next state from the current code-group and the end patterns.
fn receive(current: &ReceivedCodeGroup, check_end: CheckEnd) -> State {
    match check_end {
        CheckEnd::EarlyEndDataError | CheckEnd::EarlyEndConfigError if current.even => {
            State::EarlyEnd
        }
        CheckEnd::NormalEnd if current.is(ControlCode::END_OF_PACKET) => State::TriRri,
        CheckEnd::ErrorEndExtend => State::TrrExtend,
        CheckEnd::EarlyExtendError => State::EarlyEndExt,
        _ if current.is_data() => State::Data,
        _ => State::DataError,
    }
}

/// The second code-group after a comma when it is not `/LI/`.
fn leave_low_power(current: &ReceivedCodeGroup) -> State {
    if current.is_config_data() {
        State::ConfigB
    } else if current.is_data() {
        State::IdleD
    } else {
        State::Invalid
    }
}
