//! Crop and output format negotiation.
//!
//! The readout window is constrained to the pixel array and to even
//! boundaries so the Bayer pattern survives cropping. The output format is
//! tied to the window by an integer binning ratio per axis; the only
//! reductions the readout path offers are 2:1 horizontal and 2:1 on both
//! axes.

/// Active pixel array dimensions.
pub const PIXEL_ARRAY_WIDTH: u16 = 1280;
pub const PIXEL_ARRAY_HEIGHT: u16 = 960;

/// Smallest readable window along either axis.
pub const WINDOW_MIN: u16 = 2;

/// Readout window on the pixel array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CropRectangle {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

/// Output frame dimensions after binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputFormat {
    pub width: u16,
    pub height: u16,
}

impl OutputFormat {
    pub(crate) fn matching(crop: CropRectangle) -> Self {
        Self {
            width: crop.width,
            height: crop.height,
        }
    }
}

/// Digital binning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Binning {
    Disabled,
    Horizontal,
    HorizontalAndVertical,
}

impl Binning {
    pub(crate) fn register_value(self) -> u16 {
        match self {
            Binning::Disabled => 0x0000,
            Binning::Horizontal => 0x0011,
            Binning::HorizontalAndVertical => 0x0022,
        }
    }
}

fn align_even(value: u16) -> u16 {
    value & !1
}

fn div_round_closest(num: u16, div: u16) -> u16 {
    (num + div / 2) / div
}

/// Clamps a requested window to the array and aligns every edge down to an
/// even boundary.
pub(crate) fn negotiate_crop(requested: CropRectangle) -> CropRectangle {
    let left = align_even(requested.left).min(PIXEL_ARRAY_WIDTH - WINDOW_MIN);
    let top = align_even(requested.top).min(PIXEL_ARRAY_HEIGHT - WINDOW_MIN);
    let width = align_even(requested.width).clamp(WINDOW_MIN, PIXEL_ARRAY_WIDTH - left);
    let height = align_even(requested.height).clamp(WINDOW_MIN, PIXEL_ARRAY_HEIGHT - top);
    CropRectangle {
        left,
        top,
        width,
        height,
    }
}

/// Negotiates an output format against the active crop.
///
/// The per-axis ratio is the nearest integer to `crop / requested`, clamped
/// to 1 or 2; requests implying other ratios lose precision silently.
/// Vertical-only reduction does not exist in the readout path, so a (1, 2)
/// ratio pair collapses to (1, 1).
pub(crate) fn negotiate_format(
    crop: CropRectangle,
    requested: OutputFormat,
) -> (OutputFormat, Binning) {
    let req_width = align_even(requested.width).clamp(WINDOW_MIN, crop.width);
    let req_height = align_even(requested.height).clamp(WINDOW_MIN, crop.height);

    let h_ratio = div_round_closest(crop.width, req_width).clamp(1, 2);
    let mut v_ratio = div_round_closest(crop.height, req_height).clamp(1, 2);
    if h_ratio == 1 {
        v_ratio = 1;
    }

    let binning = match (h_ratio, v_ratio) {
        (2, 2) => Binning::HorizontalAndVertical,
        (2, 1) => Binning::Horizontal,
        _ => Binning::Disabled,
    };
    let format = OutputFormat {
        width: crop.width / h_ratio,
        height: crop.height / v_ratio,
    };
    (format, binning)
}
