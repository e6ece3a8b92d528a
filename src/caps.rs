//! Static description of one controller instance.

use bit_field::BitField;

/// Default DMA burst length, in words.
pub const DEFAULT_DMA_BURST_LEN: u32 = 8;
/// Default input FIFO depth, in words.
pub const DEFAULT_FIFO_SIZE: u32 = 512;

// The FIFO threshold formula must not underflow with the defaults, and the
// burst encoding must fit its 7-bit register field.
const_assert!(DEFAULT_FIFO_SIZE > 2 * DEFAULT_DMA_BURST_LEN + 3);
const_assert!(DEFAULT_DMA_BURST_LEN - 1 <= 0x7f);

/// Controller generation.
///
/// The silicon shipped in three flavors, distinguishable by how the pixel
/// clock divider is fed and how the line length is encoded. Held as plain
/// data rather than a build-time selection, so every flavor is
/// exercisable in one binary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Variant {
    /// First-generation core. STN panels encode the line length in
    /// interface-bus transfers rather than pixels.
    Legacy,
    /// Second-generation core. Line length is the pixel count.
    Standard,
    /// Third-generation core. Divider granularity is halved.
    Modern,
}

impl Variant {
    /// Granularity of the pixel clock divider.
    pub fn pixel_factor(self) -> u32 {
        match self {
            Variant::Modern => 1,
            _ => 2,
        }
    }

    /// Whether STN line lengths are counted in bus transfers.
    pub(crate) fn narrow_bus_line_length(self) -> bool {
        self == Variant::Legacy
    }
}

/// Panel driving technology.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisplayType {
    StnMono,
    StnColor,
    Tft,
}

/// Width of the panel data bus, in bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterfaceWidth {
    Four,
    Eight,
    Sixteen,
}

/// STN scan wiring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanMode {
    Single,
    Dual,
}

/// How the panel is wired to the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PanelInterface {
    pub display: DisplayType,
    pub width: InterfaceWidth,
    pub scan: ScanMode,
}

impl PanelInterface {
    /// A TFT panel on the full-width bus (the common case).
    pub fn tft() -> PanelInterface {
        PanelInterface {
            display: DisplayType::Tft,
            width: InterfaceWidth::Sixteen,
            scan: ScanMode::Single,
        }
    }

    /// Encoding of the panel wiring for control register 2.
    pub(crate) fn con2_bits(&self) -> u32 {
        *0u32
            .set_bits(0..=1, match self.display {
                DisplayType::StnMono => 0,
                DisplayType::StnColor => 1,
                DisplayType::Tft => 2,
            })
            .set_bit(2, self.scan == ScanMode::Single)
            .set_bits(3..=4, match self.width {
                InterfaceWidth::Four => 0,
                InterfaceWidth::Eight => 1,
                InterfaceWidth::Sixteen => 2,
            })
    }
}

/// Immutable per-instance controller description.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ControllerCaps {
    pub variant: Variant,
    pub panel: PanelInterface,
    /// DMA burst length, in words.
    pub dma_burst_len: u32,
    /// Input FIFO depth, in words.
    pub fifo_size: u32,
    /// Guard time applied to power transitions, in frame periods.
    pub guard_time: u32,
}

impl ControllerCaps {
    pub fn new(variant: Variant, panel: PanelInterface) -> ControllerCaps {
        ControllerCaps {
            variant,
            panel,
            dma_burst_len: DEFAULT_DMA_BURST_LEN,
            fifo_size: DEFAULT_FIFO_SIZE,
            guard_time: 1,
        }
    }
}
