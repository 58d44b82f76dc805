//! Fixed-point gain encoding.
//!
//! Total gain is the product of a column amplifier stage (x1/x2/x4/x8) and
//! a digital coarse/fine multiplier. The digital part is a `xxxxx.yyyyy`
//! fixed-point word: 5 integer bits, 5 fraction bits in 1/32 steps.
//!
//! Requests are expressed in 1/32 steps of total gain, so a request of 32
//! is unity. The encoder picks the highest stage whose threshold the
//! request clears, which keeps the digital remainder small; within a stage
//! the remainder is rounded to the nearest 1/32.
//!
//! The stage thresholds below double per stage. They are configuration
//! data: silicon revisions disagree on the exact crossover points, so a
//! board bring-up should confirm them against its sensor revision.

use arbitrary_int::{u2, u5};
use bitbybit::bitfield;

/// Digital gain word: integer part in bits 9:5, 1/32 fraction in bits 4:0.
#[bitfield(u16, default = 0)]
#[derive(Debug, PartialEq, Eq)]
pub struct GainCode {
    #[bits(5..=9, rw)]
    pub coarse: u5,
    #[bits(0..=4, rw)]
    pub fine: u5,
}

/// Column amplifier control field inside `DIGITAL_TEST`, plus the
/// monochrome operation bit programmed at PLL setup.
#[bitfield(u16, default = 0)]
#[derive(Debug, PartialEq, Eq)]
pub struct DigitalTest {
    #[bits(4..=5, rw)]
    pub col_gain: u2,
    #[bit(7, rw)]
    pub mono_op: bool,
}

/// Column amplifier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnalogStage {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
}

/// Smallest accepted request: unity gain.
pub const GAIN_REQUEST_MIN: u16 = 32;
/// Largest accepted request: x8 column gain at the top of the digital range.
pub const GAIN_REQUEST_MAX: u16 = 2040;

/// Request units per 1.0 of digital gain in stage `X1`; doubles per stage.
const STAGE_UNIT: u16 = 32;

/// A request at or above `STAGE_THRESHOLDS[s]` selects stage `s`.
const STAGE_THRESHOLDS: [u16; 4] = [32, 64, 128, 256];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub request: u16,
}

/// A gain request resolved to its register encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedGain {
    pub stage: AnalogStage,
    pub code: GainCode,
}

impl EncodedGain {
    /// Combined (stage, coarse, fine) word. Ordered the same way as the
    /// effective gain, so it can be compared across stage boundaries.
    pub fn packed(&self) -> u16 {
        ((self.stage as u16) << 10) | self.code.raw_value()
    }
}

/// Encodes a gain request into a stage select plus coarse/fine word.
pub fn encode(request: u16) -> Result<EncodedGain, OutOfRange> {
    if !(GAIN_REQUEST_MIN..=GAIN_REQUEST_MAX).contains(&request) {
        return Err(OutOfRange { request });
    }

    let stage = if request >= STAGE_THRESHOLDS[3] {
        AnalogStage::X8
    } else if request >= STAGE_THRESHOLDS[2] {
        AnalogStage::X4
    } else if request >= STAGE_THRESHOLDS[1] {
        AnalogStage::X2
    } else {
        AnalogStage::X1
    };

    let unit = u32::from(STAGE_UNIT) << stage as u8;
    let request = u32::from(request);
    let mut coarse = request / unit;
    let mut fine = ((request % unit) * 32 + unit / 2) / unit;
    if fine == 32 {
        coarse += 1;
        fine = 0;
    }
    debug_assert!(coarse <= 31);

    Ok(EncodedGain {
        stage,
        code: GainCode::new_with_raw_value(0)
            .with_coarse(u5::new(coarse as u8))
            .with_fine(u5::new(fine as u8)),
    })
}
