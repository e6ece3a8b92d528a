//! Video mode descriptors.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::timing::picos_to_khz;

/// Supported pixel depths.
///
/// Raw depth 15 converts to [`Bpp::Sixteen`]: the controller drives both
/// as two-byte pixels. Any other depth fails the conversion, so an
/// unsupported bpp cannot reach the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Bpp {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    #[num_enum(alternatives = [15])]
    Sixteen = 16,
    TwentyFour = 24,
    ThirtyTwo = 32,
}

impl Bpp {
    /// Bits per pixel as a plain number.
    pub fn bits(self) -> u32 {
        u8::from(self) as u32
    }

    /// Code for the control-register-2 pixel size field.
    pub fn pixelsize_code(self) -> u32 {
        match self {
            Bpp::One => 0,
            Bpp::Two => 1,
            Bpp::Four => 2,
            Bpp::Eight => 3,
            Bpp::Sixteen => 4,
            Bpp::TwentyFour => 5,
            Bpp::ThirtyTwo => 6,
        }
    }
}

/// Sync pulse polarity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// A requested video mode.
///
/// Timings follow the framebuffer convention: the pixel clock is a
/// *period* in picoseconds, margins are the back/front porches
/// (left/upper = back, right/lower = front), and sync lengths are pulse
/// widths. Resolution and pixel clock must be non-zero; the sequencer
/// asserts this at configure time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoMode {
    pub xres: u32,
    pub yres: u32,
    pub bpp: Bpp,
    /// Pixel clock period in picoseconds.
    pub pixclock_ps: u32,
    pub hsync: Polarity,
    pub vsync: Polarity,
    /// Horizontal back porch, in pixel clocks.
    pub left_margin: u32,
    /// Horizontal front porch, in pixel clocks.
    pub right_margin: u32,
    /// Vertical back porch, in lines.
    pub upper_margin: u32,
    /// Vertical front porch, in lines.
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
}

impl VideoMode {
    /// Requested pixel clock rate in kHz.
    pub fn pixclock_khz(&self) -> u32 {
        picos_to_khz(self.pixclock_ps)
    }

    /// Panics if the mode violates the caller contract.
    ///
    /// The zero-based register encodings need every decremented field to
    /// be at least 1.
    pub(crate) fn assert_valid(&self) {
        assert!(self.xres > 0 && self.yres > 0, "zero-sized video mode");
        assert!(self.pixclock_ps > 0, "zero pixel clock period");
        assert!(
            self.hsync_len > 0 && self.vsync_len > 0,
            "zero-length sync pulse"
        );
        assert!(
            self.left_margin > 0 && self.right_margin > 0,
            "zero horizontal porch"
        );
    }
}

/// Nominal industry timings, handy for bring-up and tests.
pub mod presets {
    use super::{Bpp, Polarity, VideoMode};

    /// 640x480 @ 60 Hz, 25.175 MHz pixel clock.
    pub const VGA_640X480_60: VideoMode = VideoMode {
        xres: 640,
        yres: 480,
        bpp: Bpp::Sixteen,
        pixclock_ps: 39_722,
        hsync: Polarity::ActiveLow,
        vsync: Polarity::ActiveLow,
        left_margin: 48,
        right_margin: 16,
        upper_margin: 33,
        lower_margin: 10,
        hsync_len: 96,
        vsync_len: 2,
    };

    /// 320x240 @ 60 Hz, 6.4 MHz pixel clock. Typical small-panel timing.
    pub const QVGA_320X240_60: VideoMode = VideoMode {
        xres: 320,
        yres: 240,
        bpp: Bpp::Sixteen,
        pixclock_ps: 156_250,
        hsync: Polarity::ActiveLow,
        vsync: Polarity::ActiveLow,
        left_margin: 38,
        right_margin: 20,
        upper_margin: 15,
        lower_margin: 5,
        hsync_len: 30,
        vsync_len: 3,
    };
}
