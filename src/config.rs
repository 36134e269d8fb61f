use crate::{timer::EeeTimer, Error};
use defmt_or_log::derive_format_or_debug;

/// Fewest clock ticks per code-group. The transmit handshakes need one tick to emit, one for
/// `indicate` to reach the ordered-set machine and one for the new ordered set to come back.
pub const MIN_CODE_GROUP_TICKS: u32 = 3;

/// Durations of the EEE receive timers, in clock ticks.
///
/// These depend on the clock the PCS runs at and have no default.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct EeeTimerConfig {
    /// Longest time to stay in quiet before the link is considered lost.
    pub quiet: u32,
    /// Time allowed to see a comma after signal detect returns.
    pub wake: u32,
    /// Time allowed to recover after a failed wake.
    pub wake_fault: u32,
}

impl EeeTimerConfig {
    pub fn duration(&self, timer: EeeTimer) -> u32 {
        match timer {
            EeeTimer::Quiet => self.quiet,
            EeeTimer::Wake => self.wake,
            EeeTimer::WakeFault => self.wake_fault,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        for timer in [EeeTimer::Quiet, EeeTimer::Wake, EeeTimer::WakeFault] {
            if self.duration(timer) == 0 {
                return Err(Error::ZeroTimerDuration(timer));
            }
        }

        Ok(())
    }
}

/// PCS configuration.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PcsConfig {
    /// Clock ticks per code-group, the period of the code-group timer.
    pub code_group_ticks: u32,
    pub eee: EeeTimerConfig,
}

impl PcsConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.code_group_ticks < MIN_CODE_GROUP_TICKS {
            return Err(Error::CodeGroupPeriodTooShort(self.code_group_ticks));
        }

        self.eee.validate()
    }
}
