//! Controller register map.
//!
//! The DMA block sits at the bottom of the controller window; the core
//! configuration block starts at `0x800`. Multi-bit
//! field positions are documented next to the code that packs them; the
//! single-bit flags and interrupt masks shared across modules live here.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Register identifiers, valued at their offset into the window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Reg {
    /// Frame size in words + DMA burst length.
    DmaFrameCfg = 0x0018,
    /// DMA enable/reset/busy.
    DmaCon = 0x001c,
    /// Pixel clock divider (or bypass) + line counter.
    Con1 = 0x0800,
    /// Panel wiring, pixel size, sync inversion.
    Con2 = 0x0804,
    /// Vertical timing: sync width, back/front porch.
    Tim1 = 0x0808,
    /// Horizontal timing: sync width, back/front porch.
    Tim2 = 0x080c,
    /// Line length and line count, both zero-based.
    FrameCfg = 0x0810,
    /// Input FIFO threshold.
    Fifo = 0x0814,
    /// STN toggle rate.
    Mval = 0x0818,
    /// Core power control + guard time + busy.
    PowerCon = 0x083c,
    /// Contrast PWM prescaler/polarity/enable.
    ContrastCtr = 0x0840,
    /// Contrast PWM compare value.
    ContrastVal = 0x0844,
    /// Interrupt enable (write 1 to enable).
    IrqEnable = 0x0848,
    /// Interrupt disable (write 1 to disable).
    IrqDisable = 0x084c,
    /// Interrupt mask (read-only).
    IrqMask = 0x0850,
    /// Interrupt status (read-only).
    IrqStatus = 0x0854,
    /// Interrupt clear (write 1 to acknowledge).
    IrqClear = 0x0858,
}

impl Reg {
    /// Offset of the register in the controller window.
    pub fn offset(self) -> u32 {
        self.into()
    }

    /// Human-readable register name, for logs and probing.
    pub fn name(self) -> &'static str {
        match self {
            Reg::DmaFrameCfg => "DMA Frame Configuration",
            Reg::DmaCon => "DMA Control",
            Reg::Con1 => "Control 1",
            Reg::Con2 => "Control 2",
            Reg::Tim1 => "Vertical Timing",
            Reg::Tim2 => "Horizontal Timing",
            Reg::FrameCfg => "Frame Configuration",
            Reg::Fifo => "FIFO Threshold",
            Reg::Mval => "STN Toggle Rate",
            Reg::PowerCon => "Power Control",
            Reg::ContrastCtr => "Contrast PWM Control",
            Reg::ContrastVal => "Contrast PWM Value",
            Reg::IrqEnable => "Interrupt Enable",
            Reg::IrqDisable => "Interrupt Disable",
            Reg::IrqMask => "Interrupt Mask",
            Reg::IrqStatus => "Interrupt Status",
            Reg::IrqClear => "Interrupt Clear",
        }
    }
}

/// `DmaCon` bits.
pub mod dmacon {
    pub const EN: usize = 0;
    pub const RESET: usize = 1;
    pub const BUSY: usize = 2;
}

/// `Con1` bits.
pub mod con1 {
    pub const BYPASS: usize = 0;
}

/// `Con2` flag bits. The multi-bit DISTYPE/IFWIDTH/PIXELSIZE fields are
/// packed where control register 2 is composed.
pub mod con2 {
    pub const INVVD: usize = 8;
    pub const INVFRAME: usize = 9;
    pub const INVLINE: usize = 10;
    pub const INVCLK: usize = 11;
}

/// `PowerCon` bits.
pub mod powercon {
    pub const PWR: usize = 0;
    pub const GUARDT_OFFSET: usize = 1;
    pub const BUSY: usize = 31;
}

/// `ContrastCtr` bits.
pub mod contrast {
    /// Prescaler code: divide the core clock by 8.
    pub const PS_DIV8: u32 = 0b11;
    pub const POL_POSITIVE: usize = 2;
    pub const ENA: usize = 3;
}

/// Interrupt bits, shared across enable/disable/mask/status/clear.
pub mod irq {
    pub const LINE: usize = 0;
    pub const LASTLINE: usize = 1;
    pub const EOF: usize = 2;
    pub const UNDERFLOW: usize = 4;
    pub const OVERWRITE: usize = 5;
    pub const MEMERR: usize = 6;

    /// Error conditions re-armed after configure/resume: FIFO underflow,
    /// FIFO overwrite, bus error.
    pub const ERRORS: u32 = 1 << UNDERFLOW | 1 << OVERWRITE | 1 << MEMERR;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn offsets_round_trip() {
        for reg in &[Reg::DmaFrameCfg, Reg::Con1, Reg::PowerCon, Reg::IrqClear] {
            assert_eq!(Reg::try_from(reg.offset()), Ok(*reg));
        }
        assert!(Reg::try_from(0x0820u32).is_err());
    }

    #[test]
    fn error_mask_value() {
        assert_eq!(irq::ERRORS, 0x70);
    }
}
