//! The PCS, all four state machines running in lockstep off one clock.
//!
//! Every call to [`Pcs::tick`] steps each machine from the registers committed on the previous
//! tick and then commits all of them together. Signals passed between the machines, such as
//! `indicate`, `tx_even`, `tx_o_set`, `receiving` and the timer done levels, therefore arrive
//! one tick after they are produced.
//!
//! A code-group leaves on the line once every `code_group_ticks` ticks, on the tick the
//! code-group timer completes. The MAC is expected to hold its GMII transmit signals for a full
//! code-group period and present the next octet after each tick that returns a code-group.

use crate::{
    code_group::CodeGroup,
    config::PcsConfig,
    rx::{GmiiRx, Rudi, RxInputs, RxMachine, SignalDetect, SyncStatus},
    timer::{EeeTimerSignals, EeeTimers, TickTimer, Timer},
    tx::{
        CodeGroupInputs, CodeGroupMachine, GmiiTx, OrderedSetInputs, OrderedSetMachine, Xmit,
    },
    Error,
};
use defmt_or_log::{debug, derive_format_or_debug};

/// Inputs for one clock tick.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PcsInputs {
    pub reset: bool,
    /// GMII transmit signals from the MAC.
    pub gmii: GmiiTx,
    /// The MAC asks for low power idle.
    pub assert_lpidle: bool,
    pub xmit: Xmit,
    /// Configuration register to send in `/C/`.
    pub tx_config_reg: u16,
    /// A code-group received this tick.
    pub rx_code_group: Option<CodeGroup>,
    /// `rx_even` for the received code-group.
    pub rx_even: bool,
    pub sync_status: SyncStatus,
    pub signal_detect: SignalDetect,
}

/// Outputs after one clock tick.
#[derive_format_or_debug]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PcsOutputs {
    /// The code-group to put on the line, once per code-group period.
    pub tx_code_group: Option<CodeGroup>,
    /// GMII receive signals to the MAC.
    pub gmii: GmiiRx,
    /// `COL`
    pub col: bool,
    pub rx_config_reg: u16,
    pub rudi: Option<Rudi>,
    pub rx_lpi_active: bool,
    pub rx_quiet: bool,
    pub wake_error_counter: u8,
    /// The code-group sent could not be encoded.
    pub encode_error: bool,
}

/// A 1000BASE-X PCS.
#[derive_format_or_debug]
pub struct Pcs<T: Timer = TickTimer> {
    config: PcsConfig,
    ordered_set: OrderedSetMachine,
    code_group: CodeGroupMachine,
    rx: RxMachine,
    timers: EeeTimers<T>,
    /// Position in the code-group period.
    count: u32,
    /// `TXD` as sampled at the last code-group boundary.
    txd: u8,
}

impl Pcs<TickTimer> {
    /// Create a PCS with tick-counting EEE timers.
    pub fn new(config: PcsConfig) -> Result<Self, Error> {
        Self::with_timers(config, EeeTimers::new(&config.eee))
    }
}

impl<T: Timer> Pcs<T> {
    /// Create a PCS running the EEE receive timers on `timers`.
    ///
    /// The durations in `config.eee` are only validated, the timers bring their own.
    pub fn with_timers(config: PcsConfig, timers: EeeTimers<T>) -> Result<Self, Error> {
        config.validate()?;

        debug!("New PCS with {:?}", config);

        Ok(Self {
            config,
            ordered_set: OrderedSetMachine::new(),
            code_group: CodeGroupMachine::new(),
            rx: RxMachine::new(),
            timers,
            count: 0,
            txd: 0,
        })
    }

    /// Advance one clock tick.
    pub fn tick(&mut self, inputs: &PcsInputs) -> PcsOutputs {
        let cg_timer_done = self.code_group_timer_done();
        // Held on the line for the period that ends on this tick.
        let line = self.code_group.code_group();

        let ordered_set = self.ordered_set.step(&OrderedSetInputs {
            reset: inputs.reset,
            xmit: inputs.xmit,
            gmii: inputs.gmii,
            assert_lpidle: inputs.assert_lpidle,
            indicate: self.code_group.indicate(),
            tx_even: self.code_group.tx_even(),
        });

        let code_group = self.code_group.step(&CodeGroupInputs {
            reset: inputs.reset,
            tx_o_set: self.ordered_set.tx_o_set(),
            txd: self.txd,
            tx_config_reg: inputs.tx_config_reg,
            cg_timer_done,
        });

        let rx = self.rx.step(&RxInputs {
            reset: inputs.reset,
            code_group: inputs.rx_code_group,
            even: inputs.rx_even,
            sync_status: inputs.sync_status,
            signal_detect: inputs.signal_detect,
            xmit: inputs.xmit,
            timers: self.timers.done(),
        });

        self.ordered_set = ordered_set;
        self.code_group = code_group;

        let tx_code_group = if inputs.reset {
            if self.ordered_set.state_changed() {
                debug!("PCS reset");
            }
            self.timers.clock(EeeTimerSignals::default());
            self.count = 0;
            self.txd = 0;
            None
        } else {
            self.timers.clock(self.rx.timer_starts());
            self.count = if cg_timer_done { 0 } else { self.count + 1 };

            // The octet for the next `/D/` is sampled as the period closes.
            if cg_timer_done {
                self.txd = inputs.gmii.txd;
            }
            cg_timer_done.then_some(line)
        };

        self.rx = rx;

        PcsOutputs {
            tx_code_group,
            gmii: self.rx.gmii(),
            col: self.ordered_set.collision(self.rx.receiving()),
            rx_config_reg: self.rx.rx_config_reg(),
            rudi: self.rx.rudi(),
            rx_lpi_active: self.rx.rx_lpi_active(),
            rx_quiet: self.rx.rx_quiet(),
            wake_error_counter: self.rx.wake_error_counter(),
            encode_error: self.code_group.encode_error(),
        }
    }

    /// The code-group timer completes on the next tick.
    pub fn code_group_timer_done(&self) -> bool {
        self.count + 1 == self.config.code_group_ticks
    }

    pub fn config(&self) -> &PcsConfig {
        &self.config
    }

    /// The transmit ordered-set machine.
    pub fn ordered_set(&self) -> &OrderedSetMachine {
        &self.ordered_set
    }

    /// The transmit code-group machine.
    pub fn code_group(&self) -> &CodeGroupMachine {
        &self.code_group
    }

    /// The receive machine.
    pub fn rx(&self) -> &RxMachine {
        &self.rx
    }

    pub fn timers(&self) -> &EeeTimers<T> {
        &self.timers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::EeeTimerConfig,
        rx::{State as RxState, LPI_RXD},
        timer::EeeTimer,
        tx::{CodeGroupState, OrderedSetState},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use simple_logger::SimpleLogger;

    const CONFIG: PcsConfig = PcsConfig {
        code_group_ticks: 3,
        eee: EeeTimerConfig {
            quiet: 1000,
            wake: 30,
            wake_fault: 60,
        },
    };

    /// A PCS with its transmit line looped back into its receiver.
    struct Loopback {
        pcs: Pcs,
        reset: bool,
        xmit: Xmit,
        assert_lpidle: bool,
        tx_config_reg: u16,
        line: Option<CodeGroup>,
        rx_even: bool,
        rudi: Vec<Rudi>,
    }

    impl Loopback {
        fn new(config: PcsConfig, xmit: Xmit) -> Self {
            let _ = SimpleLogger::new().env().init();

            Self {
                pcs: Pcs::new(config).unwrap(),
                reset: false,
                xmit,
                assert_lpidle: false,
                tx_config_reg: 0,
                line: None,
                rx_even: false,
                rudi: Vec::new(),
            }
        }

        fn tick(&mut self, gmii: GmiiTx) -> PcsOutputs {
            let rx_code_group = self.line.take();
            if let Some(cg) = rx_code_group {
                self.rx_even = cg.is_comma() || !self.rx_even;
            }

            let outputs = self.pcs.tick(&PcsInputs {
                reset: self.reset,
                gmii,
                assert_lpidle: self.assert_lpidle,
                xmit: self.xmit,
                tx_config_reg: self.tx_config_reg,
                rx_code_group,
                rx_even: self.rx_even,
                sync_status: SyncStatus::Ok,
                signal_detect: SignalDetect::Ok,
            });

            if let Some(rudi) = outputs.rudi {
                self.rudi.push(rudi);
            }
            self.line = outputs.tx_code_group;

            outputs
        }

        /// Hold `gmii` for one code-group period, returning the outputs of its last tick.
        fn period(&mut self, gmii: GmiiTx) -> PcsOutputs {
            loop {
                let outputs = self.tick(gmii);
                if outputs.tx_code_group.is_some() {
                    return outputs;
                }
            }
        }

        fn idle(&mut self, periods: usize) -> Vec<PcsOutputs> {
            (0..periods).map(|_| self.period(GmiiTx::IDLE)).collect()
        }

        /// Preamble, start of frame delimiter and `payload`.
        fn frame(&mut self, payload: &[u8]) -> Vec<PcsOutputs> {
            let mut octets = vec![0x55; 7];
            octets.push(0xd5);
            octets.extend_from_slice(payload);

            octets
                .into_iter()
                .map(|octet| self.period(GmiiTx::data(octet)))
                .collect()
        }
    }

    fn received(outputs: &[PcsOutputs]) -> Vec<u8> {
        outputs
            .iter()
            .filter(|o| o.gmii.rx_dv)
            .map(|o| o.gmii.rxd)
            .collect()
    }

    fn synchronized(pcs: &Pcs) -> bool {
        matches!(pcs.rx().state(), RxState::K | RxState::IdleD)
    }

    fn frame_round_trip(config: PcsConfig, seed: u64) {
        let mut loopback = Loopback::new(config, Xmit::Data);
        let mut rng = StdRng::seed_from_u64(seed);

        let before = loopback.idle(16);
        assert!(synchronized(&loopback.pcs));
        assert!(before.iter().all(|o| !o.gmii.rx_dv && !o.col));

        for _ in 0..3 {
            let len = rng.gen_range(1..=96);
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

            let mut outputs = loopback.frame(&payload);
            outputs.extend(loopback.idle(12));

            let octets = received(&outputs);
            let sfd = octets.iter().position(|&o| o == 0xd5).unwrap();
            assert!(octets[..sfd].iter().all(|&o| o == 0x55));
            assert_eq!(&octets[sfd + 1..], &payload[..]);

            assert!(outputs.iter().all(|o| !(o.gmii.rx_dv && o.gmii.rx_er)));
            assert!(outputs.iter().all(|o| !o.encode_error));
            assert!(!loopback.pcs.rx().receiving());
            assert!(!loopback.pcs.ordered_set().transmitting());
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let short = PcsConfig {
            code_group_ticks: 2,
            ..CONFIG
        };
        assert_eq!(Pcs::new(short).err(), Some(Error::CodeGroupPeriodTooShort(2)));

        let mut no_wake = CONFIG;
        no_wake.eee.wake = 0;
        assert_eq!(
            Pcs::new(no_wake).err(),
            Some(Error::ZeroTimerDuration(EeeTimer::Wake))
        );
    }

    #[test]
    fn one_code_group_per_period() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Data);

        let sent: Vec<bool> = (0..30)
            .map(|_| loopback.tick(GmiiTx::IDLE).tx_code_group.is_some())
            .collect();

        for (tick, sent) in sent.iter().enumerate() {
            assert_eq!(*sent, tick % 3 == 2, "tick {}", tick);
        }
    }

    #[test]
    fn code_group_leaves_when_the_timer_completes() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Data);

        for _ in 0..30 {
            let held = loopback.pcs.code_group().code_group();
            let done = loopback.pcs.code_group_timer_done();

            let outputs = loopback.tick(GmiiTx::IDLE);
            assert_eq!(outputs.tx_code_group.is_some(), done);
            if done {
                assert_eq!(outputs.tx_code_group, Some(held));
            }
        }
    }

    #[test]
    fn configuration_exchange() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Configuration);
        loopback.tx_config_reg = 0x1234;

        let outputs = loopback.idle(40);

        assert_eq!(loopback.pcs.rx().rx_config_reg(), 0x1234);
        assert_eq!(outputs.last().unwrap().rx_config_reg, 0x1234);
        assert!(loopback.rudi.contains(&Rudi::Config));
        assert!(!loopback.rudi.contains(&Rudi::Invalid));
        assert!(outputs.iter().all(|o| !o.gmii.rx_dv));
        assert_eq!(
            loopback.pcs.ordered_set().state(),
            OrderedSetState::Configuration
        );
    }

    #[test]
    fn frame_loopback() {
        frame_round_trip(CONFIG, 0x8b10b);
    }

    #[test]
    fn frame_loopback_slow_clock() {
        let config = PcsConfig {
            code_group_ticks: 5,
            ..CONFIG
        };
        frame_round_trip(config, 1000);
    }

    #[test]
    fn configuration_then_data() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Configuration);
        loopback.tx_config_reg = 0x01a0;
        loopback.idle(24);
        assert!(loopback.rudi.contains(&Rudi::Config));

        loopback.xmit = Xmit::Data;
        loopback.rudi.clear();
        loopback.idle(16);

        assert_eq!(loopback.pcs.ordered_set().state(), OrderedSetState::XmitData);
        assert!(!loopback.pcs.ordered_set().xmit_change());
        assert!(loopback.rudi.contains(&Rudi::Idle));
        assert!(synchronized(&loopback.pcs));

        let mut outputs = loopback.frame(&[0xde, 0xad, 0xbe, 0xef]);
        outputs.extend(loopback.idle(8));
        assert!(received(&outputs).ends_with(&[0xd5, 0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn low_power_idle_loopback() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Data);
        loopback.idle(16);

        loopback.assert_lpidle = true;
        let outputs = loopback.idle(16);
        let last = outputs.last().unwrap();

        assert_eq!(
            loopback.pcs.ordered_set().state(),
            OrderedSetState::XmitLowPowerIdle
        );
        assert!(last.rx_lpi_active);
        assert!(!last.rx_quiet);
        assert_eq!(
            last.gmii,
            GmiiRx {
                rxd: LPI_RXD,
                rx_dv: false,
                rx_er: true,
            }
        );

        loopback.assert_lpidle = false;
        let outputs = loopback.idle(16);
        let last = outputs.last().unwrap();

        assert_eq!(loopback.pcs.ordered_set().state(), OrderedSetState::XmitData);
        assert!(!last.rx_lpi_active);
        assert!(!last.gmii.rx_dv && !last.gmii.rx_er);
        assert_eq!(last.wake_error_counter, 0);
        assert!(synchronized(&loopback.pcs));
    }

    #[test]
    fn collision_while_looped_back() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Data);
        loopback.idle(16);

        let outputs = loopback.frame(&[0xaa; 32]);
        assert!(outputs.iter().any(|o| o.col));
        assert!(!outputs.first().unwrap().col);

        let outputs = loopback.idle(12);
        assert!(!outputs.last().unwrap().col);
    }

    #[test]
    fn reset_restarts_everything() {
        let mut loopback = Loopback::new(CONFIG, Xmit::Data);
        loopback.idle(16);
        for octet in [0x55; 10] {
            loopback.period(GmiiTx::data(octet));
        }
        assert!(loopback.pcs.rx().receiving());

        loopback.reset = true;
        let outputs = loopback.tick(GmiiTx::IDLE);

        assert_eq!(outputs.tx_code_group, None);
        assert_eq!(outputs.gmii, GmiiRx::default());
        assert!(!outputs.col);
        assert_eq!(loopback.pcs.ordered_set().state(), OrderedSetState::TestXmit);
        assert_eq!(
            loopback.pcs.code_group().state(),
            CodeGroupState::GenerateCodeGroups
        );
        assert_eq!(loopback.pcs.rx().state(), RxState::LinkFailed);
        assert!(loopback.pcs.rx().state_changed());

        loopback.reset = false;
        loopback.idle(16);
        assert!(synchronized(&loopback.pcs));
        assert!(!loopback.pcs.rx().receiving());
    }
}
