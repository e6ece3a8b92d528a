//! Mode-set register program construction.

use bit_field::BitField;

use crate::caps::ControllerCaps;
use crate::mmio::RegisterBank;
use crate::mode::{Polarity, VideoMode};
use crate::regs::{con1, con2, Reg};
use crate::timing::{self, PixelClock};

/// What a mode-set actually achieved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModeReport {
    /// Pixel clock the panel will see, in kHz. Corrected for divider
    /// rounding; never the requested rate.
    pub pixclock_khz: u32,
    /// Programmed divider field; `None` when the divider is bypassed.
    pub clkval: Option<u32>,
    /// Line length, in transfer units.
    pub line_length: u32,
}

/// An ordered batch of register writes for one mode-set.
///
/// Built once per configure, applied front to back, then dropped. The
/// order is fixed, and the whole program lands before the controller is
/// armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProgram {
    writes: Vec<(Reg, u32)>,
}

impl RegisterProgram {
    /// Translate `mode` into register values for a controller described
    /// by `caps`, fed from a `source_khz` core clock.
    ///
    /// # Panics
    ///
    /// Panics on a contract-violating mode (zero resolution, pulse width,
    /// or horizontal porch).
    pub fn for_mode(
        mode: &VideoMode,
        caps: &ControllerCaps,
        source_khz: u32,
    ) -> (RegisterProgram, ModeReport) {
        mode.assert_valid();

        let mut writes = Vec::with_capacity(8);

        // Frame size in words, merged with the burst length encoding.
        let mut frame = mode.xres * mode.yres * mode.bpp.bits() / 32;
        frame.set_bits(24..=30, caps.dma_burst_len - 1);
        writes.push((Reg::DmaFrameCfg, frame));

        // Pixel clock divider, or straight-through when the request is
        // already at (or beyond) what the divider can produce.
        let pixclock = PixelClock::pick(
            source_khz,
            mode.pixclock_khz(),
            caps.variant.pixel_factor(),
        );
        let clkval = match pixclock {
            PixelClock::Bypass => {
                info!("bypassing pixel clock divider");
                writes.push((Reg::Con1, *0u32.set_bit(con1::BYPASS, true)));
                None
            }
            PixelClock::Divided { clkval, actual_khz } => {
                debug!(
                    "programming CLKVAL = {:#04x} ({} kHz)",
                    clkval, actual_khz
                );
                writes.push((Reg::Con1, *0u32.set_bits(12..=20, clkval)));
                Some(clkval)
            }
        };

        // Control register 2: panel wiring, sync inversion, pixel size.
        // The sync outputs idle active-high; active-low requests take the
        // inverted encodings.
        let mut ctrl2 = caps.panel.con2_bits();
        if mode.hsync == Polarity::ActiveLow {
            ctrl2.set_bit(con2::INVLINE, true);
        }
        if mode.vsync == Polarity::ActiveLow {
            ctrl2.set_bit(con2::INVFRAME, true);
        }
        ctrl2.set_bits(5..=7, mode.bpp.pixelsize_code());
        writes.push((Reg::Con2, ctrl2));

        // Vertical timing. The sync width is zero-based; the porches are
        // not.
        writes.push((
            Reg::Tim1,
            *0u32
                .set_bits(16..=21, mode.vsync_len - 1)
                .set_bits(8..=15, mode.upper_margin)
                .set_bits(0..=7, mode.lower_margin),
        ));

        // Horizontal timing, every field zero-based.
        writes.push((
            Reg::Tim2,
            *0u32
                .set_bits(21..=31, mode.right_margin - 1)
                .set_bits(8..=13, mode.hsync_len - 1)
                .set_bits(0..=7, mode.left_margin - 1),
        ));

        // Display size, zero-based in both axes.
        let line_length = timing::line_length(mode.xres, &caps.panel, caps.variant);
        writes.push((
            Reg::FrameCfg,
            *0u32
                .set_bits(21..=31, line_length - 1)
                .set_bits(0..=10, mode.yres - 1),
        ));

        // FIFO threshold, the data sheet's underrun safety margin.
        writes.push((
            Reg::Fifo,
            caps.fifo_size.saturating_sub(2 * caps.dma_burst_len + 3),
        ));

        // Toggle STN mode every frame.
        writes.push((Reg::Mval, 0));

        let report = ModeReport {
            pixclock_khz: pixclock.actual_khz(source_khz),
            clkval,
            line_length,
        };

        (RegisterProgram { writes }, report)
    }

    /// The writes, in application order.
    pub fn writes(&self) -> &[(Reg, u32)] {
        &self.writes
    }

    /// Issue the program against the register window.
    pub fn apply<B: RegisterBank>(&self, bank: &mut B) {
        for &(reg, val) in &self.writes {
            debug!("  * {} = {:#010x}", reg.name(), val);
            bank.write(reg.offset(), val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{
        ControllerCaps, DisplayType, InterfaceWidth, PanelInterface, ScanMode, Variant,
    };
    use crate::mmio::soft::SoftLcdc;
    use crate::mmio::{BankAccess, BankSniffer};
    use crate::mode::{presets, Bpp};
    use crate::timing::khz_to_picos;

    fn tft_caps() -> ControllerCaps {
        ControllerCaps::new(Variant::Standard, PanelInterface::tft())
    }

    fn value_of(program: &RegisterProgram, reg: Reg) -> u32 {
        program
            .writes()
            .iter()
            .find(|&&(r, _)| r == reg)
            .map(|&(_, v)| v)
            .unwrap_or_else(|| panic!("no write to {}", reg.name()))
    }

    #[test]
    fn frame_words_exact_for_every_depth() {
        let depths = [
            Bpp::One,
            Bpp::Two,
            Bpp::Four,
            Bpp::Eight,
            Bpp::Sixteen,
            Bpp::TwentyFour,
            Bpp::ThirtyTwo,
        ];
        for &bpp in &depths {
            let mode = VideoMode {
                bpp,
                ..presets::QVGA_320X240_60
            };
            let (program, _) = RegisterProgram::for_mode(&mode, &tft_caps(), 100_000);
            let frame = value_of(&program, Reg::DmaFrameCfg);
            assert_eq!(
                frame.get_bits(0..=22),
                320 * 240 * bpp.bits() / 32,
                "frame words for {:?}",
                bpp
            );
            // burst length 8, zero-based
            assert_eq!(frame.get_bits(24..=30), 7);
        }
    }

    #[test]
    fn fifo_threshold_formula() {
        for &(fifo_size, burst, expected) in &[
            (512u32, 8u32, 493u32),
            (128, 16, 93),
            (512, 4, 501),
            // minimum geometries saturate instead of wrapping
            (16, 8, 0),
            (4, 1, 0),
        ] {
            let caps = ControllerCaps {
                dma_burst_len: burst,
                fifo_size,
                ..tft_caps()
            };
            let (program, _) =
                RegisterProgram::for_mode(&presets::QVGA_320X240_60, &caps, 100_000);
            assert_eq!(
                value_of(&program, Reg::Fifo),
                expected,
                "fifo {} burst {}",
                fifo_size,
                burst
            );
        }
    }

    #[test]
    fn program_order_is_fixed() {
        let (program, _) = RegisterProgram::for_mode(&presets::VGA_640X480_60, &tft_caps(), 100_000);
        let regs: Vec<Reg> = program.writes().iter().map(|&(r, _)| r).collect();
        assert_eq!(
            regs,
            vec![
                Reg::DmaFrameCfg,
                Reg::Con1,
                Reg::Con2,
                Reg::Tim1,
                Reg::Tim2,
                Reg::FrameCfg,
                Reg::Fifo,
                Reg::Mval,
            ]
        );
    }

    #[test]
    fn zero_based_timing_encodings() {
        let (program, _) = RegisterProgram::for_mode(&presets::VGA_640X480_60, &tft_caps(), 100_000);

        // vsync 2, upper 33, lower 10
        assert_eq!(value_of(&program, Reg::Tim1), 1 << 16 | 33 << 8 | 10);
        // right 16, hsync 96, left 48
        assert_eq!(value_of(&program, Reg::Tim2), 15 << 21 | 95 << 8 | 47);
        // 640x480
        assert_eq!(value_of(&program, Reg::FrameCfg), 639 << 21 | 479);
    }

    #[test]
    fn control2_packs_panel_sync_and_depth() {
        let (program, _) = RegisterProgram::for_mode(&presets::VGA_640X480_60, &tft_caps(), 100_000);
        // TFT/16-bit/single (0x16), both syncs inverted, 16bpp code 4
        assert_eq!(
            value_of(&program, Reg::Con2),
            0x16 | 1 << con2::INVFRAME | 1 << con2::INVLINE | 4 << 5
        );
    }

    #[test]
    fn divided_clock_reports_achieved_rate() {
        let mode = VideoMode {
            pixclock_ps: khz_to_picos(9_000),
            ..presets::QVGA_320X240_60
        };
        let (program, report) = RegisterProgram::for_mode(&mode, &tft_caps(), 133_000);
        assert_eq!(value_of(&program, Reg::Con1), 6 << 12);
        assert_eq!(report.clkval, Some(6));
        assert_eq!(report.pixclock_khz, 9_500);
    }

    #[test]
    fn bypass_sets_the_bypass_bit() {
        // 9 MHz requested from a 6 MHz core: nothing to divide, route the
        // source clock straight through and report it
        let mode = VideoMode {
            pixclock_ps: khz_to_picos(9_000),
            ..presets::QVGA_320X240_60
        };
        let (program, report) = RegisterProgram::for_mode(&mode, &tft_caps(), 6_000);
        assert_eq!(value_of(&program, Reg::Con1), 1);
        assert_eq!(report.clkval, None);
        assert_eq!(report.pixclock_khz, 6_000);
    }

    #[test]
    fn legacy_stn_line_length_lands_in_frame_cfg() {
        let panel = PanelInterface {
            display: DisplayType::StnColor,
            width: InterfaceWidth::Eight,
            scan: ScanMode::Single,
        };
        let caps = ControllerCaps::new(Variant::Legacy, panel);
        let (program, report) =
            RegisterProgram::for_mode(&presets::QVGA_320X240_60, &caps, 100_000);
        assert_eq!(report.line_length, 120);
        assert_eq!(value_of(&program, Reg::FrameCfg).get_bits(21..=31), 119);
    }

    #[test]
    fn apply_hits_the_bank_in_program_order() {
        let (program, _) = RegisterProgram::for_mode(&presets::VGA_640X480_60, &tft_caps(), 100_000);
        let mut bank = SoftLcdc::new();
        let mut seen = Vec::new();
        {
            let mut sniffer = BankSniffer::new(&mut bank, |access| seen.push(access));
            program.apply(&mut sniffer);
        }
        let expected: Vec<BankAccess> = program
            .writes()
            .iter()
            .map(|&(reg, val)| BankAccess::write(reg.offset(), val))
            .collect();
        assert_eq!(seen, expected);
    }
}
