//! Power and DMA sequencing.

use std::fmt;

use bit_field::BitField;

use crate::caps::ControllerCaps;
use crate::error::{SeqError, SeqResult};
use crate::mmio::RegisterBank;
use crate::mode::VideoMode;
use crate::platform::{ClockSource, Delay, PowerHook};
use crate::program::{ModeReport, RegisterProgram};
use crate::regs::{contrast, dmacon, irq, powercon, Reg};

/// Controller power state.
///
/// The `Starting`/`Stopping` states exist only inside a transition; a
/// sequencer observed between operations is always `Off` or `Running`
/// (unless a stop sequence timed out, which strands it in `Stopping`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PowerState {
    Off,
    Starting,
    Running,
    Stopping,
}

/// How much quiescence [`Sequencer::stop`] confirms before returning.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopWait {
    /// Poll until the DMA engine reports idle.
    DmaIdle,
    /// Return once the core is down. Suspend/teardown paths that do not
    /// hand the frame buffer to anyone else can skip the DMA drain.
    NoWait,
}

/// Busy-wait budget for the stop/configure synchronization points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// How many times a busy flag is sampled before giving up.
    pub max_polls: u32,
    /// Settle interval between samples, in milliseconds.
    pub interval_ms: u32,
}

impl PollPolicy {
    /// 100 polls of 10 ms: about a second of settle budget, far beyond
    /// the tens of milliseconds healthy hardware needs.
    pub fn new() -> PollPolicy {
        PollPolicy {
            max_polls: 100,
            interval_ms: 10,
        }
    }

    /// Poll (effectively) forever. Only for callers who trust the
    /// silicon to always respond.
    pub fn unbounded() -> PollPolicy {
        PollPolicy {
            max_polls: u32::MAX,
            interval_ms: 10,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> PollPolicy {
        PollPolicy::new()
    }
}

/// Drives one controller instance through configure/start/stop
/// transitions.
///
/// The sequencer is the sole writer of the controller's register window.
/// Every operation takes `&mut self`, so callers are serialized by
/// construction; wrap the sequencer in a mutex to share it across
/// threads. Busy-wait polls block the calling thread for
/// hardware-determined intervals, so latency-sensitive callers should run
/// mode-sets on a worker.
pub struct Sequencer<B, C, D> {
    bank: B,
    clock: C,
    delay: D,
    caps: ControllerCaps,
    poll: PollPolicy,
    state: PowerState,
    saved_contrast: u32,
    power_hook: Option<PowerHook>,
}

impl<B: fmt::Debug, C: fmt::Debug, D: fmt::Debug> fmt::Debug for Sequencer<B, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("bank", &self.bank)
            .field("clock", &self.clock)
            .field("delay", &self.delay)
            .field("caps", &self.caps)
            .field("poll", &self.poll)
            .field("state", &self.state)
            .field("saved_contrast", &self.saved_contrast)
            .field("power_hook", &self.power_hook.is_some())
            .finish()
    }
}

impl<B, C, D> Sequencer<B, C, D>
where
    B: RegisterBank,
    C: ClockSource,
    D: Delay,
{
    pub fn new(bank: B, clock: C, delay: D, caps: ControllerCaps) -> Sequencer<B, C, D> {
        Sequencer {
            bank,
            clock,
            delay,
            caps,
            poll: PollPolicy::default(),
            state: PowerState::Off,
            saved_contrast: 0,
            power_hook: None,
        }
    }

    /// Replace the default poll budget.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Attach an external power rail hook, toggled on suspend/resume.
    pub fn with_power_hook(mut self, hook: PowerHook) -> Self {
        self.power_hook = Some(hook);
        self
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn caps(&self) -> &ControllerCaps {
        &self.caps
    }

    /// The injected register window. Handy for inspection in tests; the
    /// sequencer remains the sole writer.
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable access to the register window, for the surrounding glue
    /// that owns concerns outside this engine (frame base addresses,
    /// palette entries). Serialize such accesses with the sequencer's
    /// own operations.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Give the register window back, consuming the sequencer.
    pub fn into_bank(self) -> B {
        self.bank
    }

    /// Program `mode` into the controller.
    ///
    /// Every interrupt source is masked before the program lands, so a
    /// half-programmed FIFO cannot raise a spurious error; the error
    /// subset is re-armed once the program is in place, and the DMA
    /// engine is given a bounded window to go idle.
    ///
    /// Does not touch the power state: use it with the controller
    /// stopped, or reach for [`Sequencer::set_mode`] for the full
    /// stop/program/start dance.
    pub fn configure(&mut self, mode: &VideoMode) -> SeqResult<ModeReport> {
        let source_khz = self.clock.rate_khz();
        debug!(
            "configuring {}x{} @ {:?} (core clock {} kHz)",
            mode.xres, mode.yres, mode.bpp, source_khz
        );

        self.mask_irqs();

        let (program, report) = RegisterProgram::for_mode(mode, &self.caps, source_khz);
        program.apply(&mut self.bank);

        self.enable_error_irqs();
        self.wait_clear(Reg::DmaCon, dmacon::BUSY, "DMA engine")?;

        debug!("mode set, panel clock {} kHz", report.pixclock_khz);
        Ok(report)
    }

    /// Stop if needed, program `mode`, start again.
    pub fn set_mode(&mut self, mode: &VideoMode) -> SeqResult<ModeReport> {
        if self.state == PowerState::Running {
            self.stop(StopWait::NoWait)?;
        }
        let report = self.configure(mode)?;
        self.start();
        Ok(report)
    }

    /// Power the core up and arm DMA.
    ///
    /// Power ramps asynchronously behind the guard time, but the core
    /// accepts commands immediately, so there is nothing to wait on.
    /// Calling `start` on a running controller is a no-op.
    pub fn start(&mut self) {
        if self.state == PowerState::Running {
            warn!("start() while already running (ignored)");
            return;
        }
        self.state = PowerState::Starting;

        self.bank
            .write(Reg::DmaCon.offset(), *0u32.set_bit(dmacon::EN, true));
        self.bank.write(
            Reg::PowerCon.offset(),
            *0u32
                .set_bits(powercon::GUARDT_OFFSET..=7, self.caps.guard_time)
                .set_bit(powercon::PWR, true),
        );

        self.state = PowerState::Running;
        debug!(
            "controller running (guard time {} frames)",
            self.caps.guard_time
        );
    }

    /// Take the core down.
    ///
    /// The power bit drops first, with the guard time still applied; the
    /// core keeps its busy flag up while it sequences the panel signals
    /// down, and DMA must not be cut until that clears. On
    /// [`SeqError::HardwareTimeout`] the sequencer stays in `Stopping`
    /// and the controller state is indeterminate.
    pub fn stop(&mut self, wait: StopWait) -> SeqResult<()> {
        if self.state == PowerState::Off {
            warn!("stop() while already off (ignored)");
            return Ok(());
        }
        self.state = PowerState::Stopping;

        self.bank.write(
            Reg::PowerCon.offset(),
            *0u32.set_bits(powercon::GUARDT_OFFSET..=7, self.caps.guard_time),
        );
        self.wait_clear(Reg::PowerCon, powercon::BUSY, "controller core")?;

        self.bank.write(Reg::DmaCon.offset(), 0);
        if wait == StopWait::DmaIdle {
            self.wait_clear(Reg::DmaCon, dmacon::BUSY, "DMA engine")?;
        }

        self.state = PowerState::Off;
        debug!("controller stopped");
        Ok(())
    }

    /// Quiesce for suspend, without confirming the DMA drain.
    ///
    /// Interrupt handling is shut off first: the source clock is about to
    /// be gated, and a pending interrupt would otherwise never be
    /// serviced. The contrast value is saved for [`Sequencer::resume`].
    pub fn suspend(&mut self) -> SeqResult<()> {
        self.mask_irqs();

        self.saved_contrast = self.bank.read(Reg::ContrastVal.offset());
        self.bank.write(Reg::ContrastCtr.offset(), 0);

        if let Some(hook) = self.power_hook.as_mut() {
            hook(false);
        }

        self.stop(StopWait::NoWait)
    }

    /// Undo a [`Sequencer::suspend`]: power back up, raise the external
    /// rail, restore contrast, re-arm the error interrupts.
    pub fn resume(&mut self) {
        self.start();

        if let Some(hook) = self.power_hook.as_mut() {
            hook(true);
        }

        self.set_contrast(self.saved_contrast);
        self.enable_error_irqs();
    }

    /// Program the contrast PWM compare value and enable the generator.
    pub fn set_contrast(&mut self, value: u32) {
        self.bank
            .write(Reg::ContrastVal.offset(), value.get_bits(0..=7));
        self.bank.write(
            Reg::ContrastCtr.offset(),
            *0u32
                .set_bits(0..=1, contrast::PS_DIV8)
                .set_bit(contrast::POL_POSITIVE, true)
                .set_bit(contrast::ENA, true),
        );
    }

    /// Mask every controller interrupt source.
    pub fn mask_irqs(&mut self) {
        self.bank.write(Reg::IrqDisable.offset(), !0);
    }

    /// Arm the FIFO underflow, FIFO overwrite, and bus error interrupts.
    pub fn enable_error_irqs(&mut self) {
        self.bank.write(Reg::IrqEnable.offset(), irq::ERRORS);
    }

    /// Pending interrupt conditions.
    pub fn irq_status(&mut self) -> u32 {
        self.bank.read(Reg::IrqStatus.offset())
    }

    /// Acknowledge the given interrupt conditions.
    pub fn ack_irqs(&mut self, bits: u32) {
        self.bank.write(Reg::IrqClear.offset(), bits);
    }

    /// Scanline the controller is currently driving.
    pub fn line_count(&mut self) -> u32 {
        self.bank.read(Reg::Con1.offset()).get_bits(21..=31)
    }

    /// Poll `reg` until `bit` clears, within the configured budget.
    fn wait_clear(&mut self, reg: Reg, bit: usize, what: &'static str) -> SeqResult<()> {
        let mut polls = 0;
        while self.bank.read(reg.offset()).get_bit(bit) {
            polls += 1;
            if polls >= self.poll.max_polls {
                return Err(SeqError::HardwareTimeout {
                    what,
                    polls,
                    interval_ms: self.poll.interval_ms,
                });
            }
            self.delay.delay_ms(self.poll.interval_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::caps::{PanelInterface, Variant};
    use crate::mmio::soft::SoftLcdc;
    use crate::mode::presets;
    use crate::platform::FixedClock;

    /// Polling in tests needs no real settling.
    #[derive(Debug, Default)]
    struct NullDelay;

    impl Delay for NullDelay {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    fn sequencer(bank: SoftLcdc) -> Sequencer<SoftLcdc, FixedClock, NullDelay> {
        let caps = ControllerCaps::new(Variant::Standard, PanelInterface::tft());
        Sequencer::new(bank, FixedClock(133_000), NullDelay, caps)
    }

    #[test]
    fn start_powers_up_and_arms_dma() {
        let mut seq = sequencer(SoftLcdc::new());
        assert_eq!(seq.state(), PowerState::Off);

        seq.start();

        assert_eq!(seq.state(), PowerState::Running);
        let bank = seq.bank();
        assert!(bank.reg(Reg::DmaCon).get_bit(dmacon::EN));
        let power = bank.reg(Reg::PowerCon);
        assert!(power.get_bit(powercon::PWR));
        assert_eq!(power.get_bits(powercon::GUARDT_OFFSET..=7), 1);
    }

    #[test]
    fn double_start_is_a_noop() {
        let mut seq = sequencer(SoftLcdc::new());
        seq.start();
        seq.start();

        assert_eq!(seq.state(), PowerState::Running);
        // no second power-up write mid-guard-time
        assert_eq!(seq.bank().writes_to(Reg::PowerCon).len(), 1);
    }

    #[test]
    fn stop_confirms_quiescence() {
        let mut seq = sequencer(SoftLcdc::with_settle(3));
        seq.start();

        seq.stop(StopWait::DmaIdle).unwrap();

        assert_eq!(seq.state(), PowerState::Off);
        let bank = seq.bank();
        assert!(!bank.power_busy());
        assert!(!bank.dma_busy());
        assert!(!bank.reg(Reg::PowerCon).get_bit(powercon::PWR));
        assert_eq!(bank.reg(Reg::DmaCon), 0);
    }

    #[test]
    fn stop_nowait_skips_the_dma_drain() {
        let mut seq = sequencer(SoftLcdc::with_settle(3));
        seq.start();

        seq.stop(StopWait::NoWait).unwrap();

        // the core is down, but nobody polled the DMA engine idle
        assert_eq!(seq.state(), PowerState::Off);
        assert!(!seq.bank().power_busy());
        assert!(seq.bank().dma_busy());
    }

    #[test]
    fn stop_while_off_is_a_noop() {
        let mut seq = sequencer(SoftLcdc::new());
        seq.stop(StopWait::DmaIdle).unwrap();
        assert_eq!(seq.state(), PowerState::Off);
        assert!(seq.bank().log().is_empty());
    }

    #[test]
    fn stuck_core_times_out() {
        let mut seq = sequencer(SoftLcdc::stuck()).with_poll_policy(PollPolicy {
            max_polls: 5,
            interval_ms: 10,
        });
        seq.start();

        assert_eq!(
            seq.stop(StopWait::DmaIdle),
            Err(SeqError::HardwareTimeout {
                what: "controller core",
                polls: 5,
                interval_ms: 10,
            })
        );
        // stranded mid-transition, by design
        assert_eq!(seq.state(), PowerState::Stopping);
    }

    #[test]
    fn configure_programs_and_arms_error_irqs() {
        let mut seq = sequencer(SoftLcdc::new());
        let report = seq.configure(&presets::QVGA_320X240_60).unwrap();

        // 133 MHz over a factor-2 divider lands at 6.65 MHz for a
        // 6.4 MHz request
        assert_eq!(report.clkval, Some(9));
        assert_eq!(report.pixclock_khz, 6_650);

        let bank = seq.bank();
        assert_eq!(bank.reg(Reg::IrqMask), irq::ERRORS);
        assert_eq!(bank.reg(Reg::FrameCfg), 319 << 21 | 239);
    }

    #[test]
    fn irq_status_reflects_raised_conditions() {
        let mut seq = sequencer(SoftLcdc::new());
        seq.configure(&presets::QVGA_320X240_60).unwrap();

        seq.bank_mut().raise_irq(1 << irq::UNDERFLOW | 1 << irq::LINE);

        // LINE is masked; only the armed error condition shows
        assert_eq!(seq.irq_status(), 1 << irq::UNDERFLOW);
        seq.ack_irqs(1 << irq::UNDERFLOW);
        assert_eq!(seq.irq_status(), 0);
    }

    #[test]
    fn suspend_resume_round_trips_contrast() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let hook_calls = Rc::clone(&calls);

        let mut seq = sequencer(SoftLcdc::new())
            .with_power_hook(Box::new(move |on| hook_calls.borrow_mut().push(on)));
        seq.start();
        seq.set_contrast(0xc8);

        seq.suspend().unwrap();
        assert_eq!(seq.state(), PowerState::Off);
        assert_eq!(seq.bank().reg(Reg::ContrastCtr), 0);
        assert_eq!(*calls.borrow(), vec![false]);

        seq.resume();
        assert_eq!(seq.state(), PowerState::Running);
        assert_eq!(seq.bank().reg(Reg::ContrastVal), 0xc8);
        // PWM back on: divide-by-8 prescale, positive polarity, enabled
        assert_eq!(seq.bank().reg(Reg::ContrastCtr), 0b1111);
        assert_eq!(seq.bank().reg(Reg::IrqMask), irq::ERRORS);
        assert_eq!(*calls.borrow(), vec![false, true]);
    }

    #[test]
    fn set_mode_cycles_power_around_the_program() {
        let mut seq = sequencer(SoftLcdc::new());
        seq.start();

        seq.set_mode(&presets::VGA_640X480_60).unwrap();

        assert_eq!(seq.state(), PowerState::Running);
        // power down for the program, back up after
        let power_writes = seq.bank().writes_to(Reg::PowerCon);
        assert_eq!(power_writes.len(), 3);
        assert!(!power_writes[1].get_bit(powercon::PWR));
        assert!(power_writes[2].get_bit(powercon::PWR));
        assert_eq!(seq.bank().reg(Reg::FrameCfg), 639 << 21 | 479);
    }
}
