//! Timing derivation: pixel clock divider and line length.

use crate::caps::{DisplayType, InterfaceWidth, PanelInterface, ScanMode, Variant};

/// Convert a pixel clock period in picoseconds to a rate in kHz.
pub fn picos_to_khz(picos: u32) -> u32 {
    1_000_000_000 / picos
}

/// Convert a rate in kHz to a pixel clock period in picoseconds.
pub fn khz_to_picos(khz: u32) -> u32 {
    1_000_000_000 / khz
}

fn div_round_up(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}

/// Outcome of pixel clock divider selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelClock {
    /// The request meets or exceeds what the divider can produce; the
    /// source clock is routed straight through. Not an error: the caller
    /// just gets the full source rate.
    Bypass,
    /// Divider engaged. `clkval` is the raw register field; `actual_khz`
    /// is the rate the panel will really see. Division is inexact, so
    /// callers must report `actual_khz`, never the requested rate.
    Divided { clkval: u32, actual_khz: u32 },
}

impl PixelClock {
    /// Pick a divider for `requested_khz` given the core clock and the
    /// variant's divider granularity.
    pub fn pick(source_khz: u32, requested_khz: u32, pixel_factor: u32) -> PixelClock {
        let divider = div_round_up(source_khz, requested_khz);
        if divider < pixel_factor {
            PixelClock::Bypass
        } else {
            let clkval = divider / pixel_factor - 1;
            PixelClock::Divided {
                clkval,
                actual_khz: source_khz / (pixel_factor * (clkval + 1)),
            }
        }
    }

    /// The rate the panel sees, in kHz.
    pub fn actual_khz(&self, source_khz: u32) -> u32 {
        match *self {
            PixelClock::Bypass => source_khz,
            PixelClock::Divided { actual_khz, .. } => actual_khz,
        }
    }
}

/// Line length in transfer units.
///
/// Later cores take the pixel count directly. The first generation counts
/// STN lines in interface-bus transfers instead: color panels shift three
/// subpixels per pixel, and a 4-bit bus (or an 8-bit bus in dual-scan
/// wiring) moves half as much per transfer. This is a per-generation quirk
/// table, not a formula; getting it wrong shows up as a skewed picture.
pub fn line_length(xres: u32, panel: &PanelInterface, variant: Variant) -> u32 {
    if !variant.narrow_bus_line_length() || panel.display == DisplayType::Tft {
        return xres;
    }

    let mut value = xres;
    if panel.display == DisplayType::StnColor {
        value *= 3;
    }

    let per_transfer = match (panel.width, panel.scan) {
        (InterfaceWidth::Four, _) | (InterfaceWidth::Eight, ScanMode::Dual) => 4,
        _ => 8,
    };
    div_round_up(value, per_transfer)
}
