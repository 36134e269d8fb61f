//! Start/done timer service.
//!
//! A timer counts while its `start` input is held. Once the configured number of ticks has
//! elapsed it holds `done` until `start` is released, which returns it to idle.

use crate::config::EeeTimerConfig;
use defmt_or_log::{derive_format_or_debug, trace, FormatOrDebug};

/// Where a timer is in its start/done cycle.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Done,
}

/// The named timers of the EEE receive path.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum EeeTimer {
    /// `rx_tq_timer`
    Quiet,
    /// `rx_tw_timer`
    Wake,
    /// `rx_wf_timer`
    WakeFault,
}

/// A timer following the start/done contract.
///
/// The debug implementation should identify the timer's current phase.
pub trait Timer: FormatOrDebug {
    /// Advance one tick with the given `start` level.
    fn clock(&mut self, start: bool);

    /// Current phase.
    fn phase(&self) -> TimerPhase;

    /// The timer has fired and `start` is still held.
    fn done(&self) -> bool {
        self.phase() == TimerPhase::Done
    }
}

/// A timer counting clock ticks.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TickTimer {
    duration: u32,
    elapsed: u32,
    phase: TimerPhase,
}

impl TickTimer {
    /// A timer firing after `duration` ticks of `start`.
    pub const fn new(duration: u32) -> Self {
        Self {
            duration,
            elapsed: 0,
            phase: TimerPhase::Idle,
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Ticks counted since `start` was asserted.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

impl Timer for TickTimer {
    fn clock(&mut self, start: bool) {
        if !start {
            self.elapsed = 0;
            self.phase = TimerPhase::Idle;
            return;
        }

        if self.phase == TimerPhase::Done {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(1);
        self.phase = if self.elapsed >= self.duration {
            TimerPhase::Done
        } else {
            TimerPhase::Running
        };
    }

    fn phase(&self) -> TimerPhase {
        self.phase
    }
}

/// One level per EEE timer, used both for the start inputs and the done outputs.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct EeeTimerSignals {
    pub quiet: bool,
    pub wake: bool,
    pub wake_fault: bool,
}

impl EeeTimerSignals {
    pub fn get(&self, timer: EeeTimer) -> bool {
        match timer {
            EeeTimer::Quiet => self.quiet,
            EeeTimer::Wake => self.wake,
            EeeTimer::WakeFault => self.wake_fault,
        }
    }
}

/// The quiet, wake and wake-fault timers owned by the receive path.
#[derive_format_or_debug]
#[derive(Clone)]
pub struct EeeTimers<T: Timer> {
    quiet: T,
    wake: T,
    wake_fault: T,
}

impl EeeTimers<TickTimer> {
    /// Tick-counting timers with the configured durations.
    pub fn new(config: &EeeTimerConfig) -> Self {
        Self::from_timers(
            TickTimer::new(config.quiet),
            TickTimer::new(config.wake),
            TickTimer::new(config.wake_fault),
        )
    }
}

impl<T: Timer> EeeTimers<T> {
    /// Use externally provided timers.
    pub fn from_timers(quiet: T, wake: T, wake_fault: T) -> Self {
        Self {
            quiet,
            wake,
            wake_fault,
        }
    }

    pub fn timer(&self, timer: EeeTimer) -> &T {
        match timer {
            EeeTimer::Quiet => &self.quiet,
            EeeTimer::Wake => &self.wake,
            EeeTimer::WakeFault => &self.wake_fault,
        }
    }

    /// Clock all three timers with their start levels.
    pub fn clock(&mut self, starts: EeeTimerSignals) {
        let before = self.done();

        self.quiet.clock(starts.quiet);
        self.wake.clock(starts.wake);
        self.wake_fault.clock(starts.wake_fault);

        let after = self.done();
        for timer in [EeeTimer::Quiet, EeeTimer::Wake, EeeTimer::WakeFault] {
            if after.get(timer) && !before.get(timer) {
                trace!("{:?} timer expired", timer);
            }
        }
    }

    /// Done levels of all three timers.
    pub fn done(&self) -> EeeTimerSignals {
        EeeTimerSignals {
            quiet: self.quiet.done(),
            wake: self.wake.done(),
            wake_fault: self.wake_fault.done(),
        }
    }
}
