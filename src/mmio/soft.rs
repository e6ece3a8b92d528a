//! Software model of the controller register window.

use std::convert::TryFrom;

use bit_field::BitField;

use crate::mmio::{BankAccess, BankAccessKind, RegisterBank};
use crate::regs::{dmacon, powercon, Reg};

/// A software register bank with just enough controller behavior to
/// exercise the sequencer without hardware.
///
/// Settle is modeled in poll counts rather than time: once the power (or
/// DMA enable) bit is dropped, the matching busy flag reads as set for
/// `settle` more reads, then clears. [`SoftLcdc::stuck`] builds a bank
/// whose busy flags never clear, for timeout tests.
///
/// Every access is recorded; [`SoftLcdc::log`] returns the trace.
#[derive(Debug, Default)]
pub struct SoftLcdc {
    dma_frame_cfg: u32,
    dmacon: u32,
    con1: u32,
    con2: u32,
    tim1: u32,
    tim2: u32,
    frame_cfg: u32,
    fifo: u32,
    mval: u32,
    powercon: u32,
    contrast_ctr: u32,
    contrast_val: u32,
    imr: u32,
    pending: u32,

    settle: u32,
    stuck: bool,
    power_settle_left: u32,
    dma_settle_left: u32,

    log: Vec<BankAccess>,
}

impl SoftLcdc {
    /// A bank whose busy flags clear on the first poll.
    pub fn new() -> SoftLcdc {
        SoftLcdc::default()
    }

    /// A bank whose busy flags stay set for `settle` polls after the
    /// corresponding enable bit is dropped.
    pub fn with_settle(settle: u32) -> SoftLcdc {
        SoftLcdc {
            settle,
            ..SoftLcdc::default()
        }
    }

    /// A bank whose busy flags never clear.
    pub fn stuck() -> SoftLcdc {
        SoftLcdc {
            stuck: true,
            ..SoftLcdc::default()
        }
    }

    /// Latch interrupt conditions, as the hardware would.
    pub fn raise_irq(&mut self, bits: u32) {
        self.pending |= bits;
    }

    /// Last value written to `reg` (busy flags not included).
    pub fn reg(&self, reg: Reg) -> u32 {
        match reg {
            Reg::DmaFrameCfg => self.dma_frame_cfg,
            Reg::DmaCon => self.dmacon,
            Reg::Con1 => self.con1,
            Reg::Con2 => self.con2,
            Reg::Tim1 => self.tim1,
            Reg::Tim2 => self.tim2,
            Reg::FrameCfg => self.frame_cfg,
            Reg::Fifo => self.fifo,
            Reg::Mval => self.mval,
            Reg::PowerCon => self.powercon,
            Reg::ContrastCtr => self.contrast_ctr,
            Reg::ContrastVal => self.contrast_val,
            Reg::IrqEnable | Reg::IrqDisable | Reg::IrqMask => self.imr,
            Reg::IrqStatus | Reg::IrqClear => self.pending,
        }
    }

    /// Whether the core still reports its power-down busy flag.
    pub fn power_busy(&self) -> bool {
        self.stuck || self.power_settle_left > 0
    }

    /// Whether the DMA engine still reports busy.
    pub fn dma_busy(&self) -> bool {
        self.stuck || self.dma_settle_left > 0
    }

    /// Full access trace, in order.
    pub fn log(&self) -> &[BankAccess] {
        &self.log
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: Reg) -> Vec<u32> {
        self.log
            .iter()
            .filter(|a| a.kind == BankAccessKind::Write && a.offset == reg.offset())
            .map(|a| a.val)
            .collect()
    }

    fn read_reg(&mut self, reg: Reg) -> u32 {
        match reg {
            Reg::PowerCon => {
                let val = *self.powercon.clone().set_bit(powercon::BUSY, self.power_busy());
                if self.power_settle_left > 0 {
                    self.power_settle_left -= 1;
                }
                val
            }
            Reg::DmaCon => {
                let val = *self.dmacon.clone().set_bit(dmacon::BUSY, self.dma_busy());
                if self.dma_settle_left > 0 {
                    self.dma_settle_left -= 1;
                }
                val
            }
            Reg::IrqMask => self.imr,
            Reg::IrqStatus => self.pending & self.imr,
            Reg::IrqEnable | Reg::IrqDisable | Reg::IrqClear => {
                panic!("read of write-only register {}", reg.name())
            }
            _ => self.reg(reg),
        }
    }

    fn write_reg(&mut self, reg: Reg, val: u32) {
        match reg {
            Reg::DmaFrameCfg => self.dma_frame_cfg = val,
            Reg::DmaCon => {
                if self.dmacon.get_bit(dmacon::EN) && !val.get_bit(dmacon::EN) {
                    self.dma_settle_left = self.settle;
                }
                self.dmacon = val;
            }
            Reg::Con1 => self.con1 = val,
            Reg::Con2 => self.con2 = val,
            Reg::Tim1 => self.tim1 = val,
            Reg::Tim2 => self.tim2 = val,
            Reg::FrameCfg => self.frame_cfg = val,
            Reg::Fifo => self.fifo = val,
            Reg::Mval => self.mval = val,
            Reg::PowerCon => {
                if self.powercon.get_bit(powercon::PWR) && !val.get_bit(powercon::PWR) {
                    self.power_settle_left = self.settle;
                }
                self.powercon = val;
            }
            Reg::ContrastCtr => self.contrast_ctr = val,
            Reg::ContrastVal => self.contrast_val = val,
            Reg::IrqEnable => self.imr |= val,
            Reg::IrqDisable => self.imr &= !val,
            Reg::IrqClear => self.pending &= !val,
            Reg::IrqMask | Reg::IrqStatus => {
                panic!("write to read-only register {}", reg.name())
            }
        }
    }
}

impl RegisterBank for SoftLcdc {
    fn read(&mut self, offset: u32) -> u32 {
        let reg = Reg::try_from(offset)
            .unwrap_or_else(|_| panic!("read of unmapped register {:#06x}", offset));
        let val = self.read_reg(reg);
        self.log.push(BankAccess::read(offset, val));
        val
    }

    fn write(&mut self, offset: u32, val: u32) {
        let reg = Reg::try_from(offset)
            .unwrap_or_else(|_| panic!("write of unmapped register {:#06x}", offset));
        self.write_reg(reg, val);
        self.log.push(BankAccess::write(offset, val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_settles_after_n_polls() {
        let mut bank = SoftLcdc::with_settle(2);
        bank.write(Reg::PowerCon.offset(), 1); // power up
        bank.write(Reg::PowerCon.offset(), 0); // power down, settle starts

        assert!(bank.read(Reg::PowerCon.offset()).get_bit(powercon::BUSY));
        assert!(bank.read(Reg::PowerCon.offset()).get_bit(powercon::BUSY));
        assert!(!bank.read(Reg::PowerCon.offset()).get_bit(powercon::BUSY));
    }

    #[test]
    fn irq_mask_plumbing() {
        let mut bank = SoftLcdc::new();
        bank.write(Reg::IrqEnable.offset(), 0x70);
        bank.write(Reg::IrqDisable.offset(), 0x10);
        assert_eq!(bank.read(Reg::IrqMask.offset()), 0x60);

        bank.raise_irq(0x30);
        // only the enabled condition shows
        assert_eq!(bank.read(Reg::IrqStatus.offset()), 0x20);
        bank.write(Reg::IrqClear.offset(), 0x20);
        assert_eq!(bank.read(Reg::IrqStatus.offset()), 0);
    }

    #[test]
    fn access_trace_records_order() {
        let mut bank = SoftLcdc::new();
        bank.write(Reg::Con1.offset(), 5);
        bank.read(Reg::Con1.offset());
        assert_eq!(
            bank.log(),
            &[
                BankAccess::write(Reg::Con1.offset(), 5),
                BankAccess::read(Reg::Con1.offset(), 5),
            ]
        );
    }
}
