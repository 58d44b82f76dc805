//! Static configuration data.

use crate::regs::*;
use crate::table::Directive;

/// Sequencer microcode, loaded through the sequencer data port at stream
/// start. Vendor-provided; do not edit.
pub(crate) const SEQUENCER_PROGRAM: &[u16] = &[
    0x3227, 0x0101, 0x0F25, 0x0808, 0x0227, 0x0101, 0x0837, 0x2700,
    0x0138, 0x2701, 0x013A, 0x2700, 0x0125, 0x0020, 0x3C25, 0x0040,
    0x3427, 0x003F, 0x2500, 0x2037, 0x2540, 0x4036, 0x2500, 0x4031,
    0x2540, 0x403D, 0x6425, 0x2020, 0x3D64, 0x2510, 0x1037, 0x2520,
    0x2010, 0x2510, 0x100F, 0x2708, 0x0802, 0x2540, 0x402D, 0x2608,
    0x280D, 0x1709, 0x2600, 0x2805, 0x26A7, 0x2807, 0x2580, 0x8029,
    0x1705, 0x2500, 0x4027, 0x2222, 0x1616, 0x2726, 0x2617, 0x3626,
    0xA617, 0x0326, 0xA417, 0x1F28, 0x0526, 0x2028, 0x0425, 0x2020,
    0x2700, 0x2625, 0x0000, 0x171E, 0x2500, 0x0425, 0x0020, 0x2117,
    0x121B, 0x1703, 0x2726, 0x2617, 0x2828, 0x0517, 0x1A26, 0x6017,
    0xAE25, 0x0080, 0x2700, 0x2626, 0x1828, 0x002E, 0x2A28, 0x081E,
    0x4127, 0x1010, 0x0214, 0x6060, 0x0A14, 0x6060, 0x0B14, 0x6060,
    0x0C14, 0x6060, 0x0D14, 0x6060, 0x0217, 0x3C14, 0x0060, 0x0A14,
    0x0060, 0x0B14, 0x0060, 0x0C14, 0x0060, 0x0D14, 0x0060, 0x0811,
    0x2500, 0x1027, 0x0010, 0x2F6F, 0x0F3E, 0x2500, 0x0827, 0x0008,
    0x3066, 0x3225, 0x0008, 0x2700, 0x0830, 0x6631, 0x3D64, 0x2508,
    0x083D, 0xFF3D, 0x2A27, 0x083F, 0x2C00,
];

/// Column correction retrigger. The correction must be re-run with the
/// settings in place, which takes a full streaming-bit toggle with settle
/// time on either edge.
pub(crate) const COLUMN_CORRECTION_RETRIGGER: &[Directive] = &[
    Directive::write(RESET, STREAM_OFF),
    Directive::write(COLUMN_CORRECTION, 0x0007),
    Directive::sleep_ms(200),
    Directive::write(RESET, STREAM_ON),
    Directive::sleep_ms(200),
    Directive::write(RESET, STREAM_OFF),
    Directive::sleep_ms(200),
    Directive::write(COLUMN_CORRECTION, 0xE007),
    Directive::sleep_ms(200),
    Directive::End,
];

/// Analog tuning for rev-2 silicon, plus embedded-data disable.
pub(crate) const REV2_TUNING: &[Directive] = &[
    Directive::write(TEST_RAW_MODE, 0x0000),
    Directive::write(RESERVED_30EA, 0x0C00),
    Directive::write(DARK_CTRL, 0x0404),
    Directive::write(DATA_PEDESTAL, 0x012C),
    Directive::write(RESERVED_3180, 0x8000),
    Directive::write(ANALOG_SETTING, 0x00FD),
    Directive::write(ANALOG_SETTING + 2, 0x0FFF),
    Directive::write(ANALOG_SETTING + 4, 0x0003),
    Directive::write(ANALOG_SETTING + 6, 0xF87A),
    Directive::write(ANALOG_SETTING + 8, 0xE075),
    Directive::write(ANALOG_SETTING + 10, 0x077C),
    Directive::write(ANALOG_SETTING + 12, 0xA4EB),
    Directive::write(ANALOG_SETTING + 14, 0xD208),
    Directive::write(FINE_INT_TIME, 0x0000),
    Directive::write(EMBEDDED_DATA_CTRL, 0x1802),
    Directive::End,
];

/// 1280x720 @ 60fps, window centered vertically on the array.
pub(crate) const MODE_1280X720: &[Directive] = &[
    Directive::write(Y_ADDR_START, 0x0078),
    Directive::write(X_ADDR_START, 0x0000),
    Directive::write(Y_ADDR_END, 0x0347),
    Directive::write(X_ADDR_END, 0x04FF),
    Directive::write(LINE_LENGTH_PCK, LLP_RECOMMENDED),
    Directive::write(X_ODD_INC, 0x0001),
    Directive::write(Y_ODD_INC, 0x0001),
    Directive::write(READ_MODE, 0x0000),
    Directive::write(DIGITAL_BINNING, 0x0000),
    Directive::write(READ_SPEED, 0x0010),
    Directive::End,
];

/// Full 1280x960 array @ 60fps.
pub(crate) const MODE_1280X960: &[Directive] = &[
    Directive::write(Y_ADDR_START, 0x0000),
    Directive::write(X_ADDR_START, 0x0000),
    Directive::write(Y_ADDR_END, 0x03BF),
    Directive::write(X_ADDR_END, 0x04FF),
    Directive::write(LINE_LENGTH_PCK, LLP_RECOMMENDED),
    Directive::write(X_ODD_INC, 0x0001),
    Directive::write(Y_ODD_INC, 0x0001),
    Directive::write(READ_MODE, 0x0000),
    Directive::write(DIGITAL_BINNING, 0x0000),
    Directive::write(READ_SPEED, 0x0010),
    Directive::End,
];
