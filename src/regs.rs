//! MT9M021 register map.
//!
//! Registers are 16 bits wide behind 16-bit addresses, both transported
//! big-endian.

/// 7-bit bus address of the sensor.
pub const SENSOR_ADDR: u8 = 0x10;
/// 7-bit bus address of the MIPI serializer bridge.
pub const BRIDGE_ADDR: u8 = 0x0E;

// Identification
pub const CHIP_ID: u16 = 0x3000;
pub const CHIP_ID_VALUE: u16 = 0x2401;

// Control
pub const RESET: u16 = 0x301A;
pub const SEQ_CTRL_PORT: u16 = 0x3088;
pub const SEQ_DATA_PORT: u16 = 0x3086;
pub const TEST_RAW_MODE: u16 = 0x307A;
pub const DARK_CTRL: u16 = 0x3044;
pub const DATA_PEDESTAL: u16 = 0x301E;
pub const COLUMN_CORRECTION: u16 = 0x30D4;

// Clocking
pub const VT_SYS_CLK_DIV: u16 = 0x302A;
pub const VT_PIX_CLK_DIV: u16 = 0x302C;
pub const PRE_PLL_CLK_DIV: u16 = 0x302E;
pub const PLL_MULTIPLIER: u16 = 0x3030;
pub const DIGITAL_TEST: u16 = 0x30B0;

// Frame geometry
pub const Y_ADDR_START: u16 = 0x3002;
pub const X_ADDR_START: u16 = 0x3004;
pub const Y_ADDR_END: u16 = 0x3006;
pub const X_ADDR_END: u16 = 0x3008;
pub const FRAME_LENGTH_LINES: u16 = 0x300A;
pub const FRAME_LENGTH_LINES_CB: u16 = 0x30AA;
pub const LINE_LENGTH_PCK: u16 = 0x300C;
pub const COARSE_INT_TIME: u16 = 0x3012;
pub const FINE_INT_TIME: u16 = 0x3014;
pub const COARSE_INT_TIME_CB: u16 = 0x3016;
pub const FINE_INT_TIME_CB: u16 = 0x3018;
pub const X_ODD_INC: u16 = 0x30A2;
pub const Y_ODD_INC: u16 = 0x30A6;
pub const READ_MODE: u16 = 0x3040;
pub const READ_SPEED: u16 = 0x3028;
pub const DIGITAL_BINNING: u16 = 0x3032;
pub const TEST_PATTERN: u16 = 0x3070;

// Auto exposure
pub const AE_CTRL: u16 = 0x3100;
pub const EMBEDDED_DATA_CTRL: u16 = 0x3064;

// Gain. The `_CB` twins are the companion-context shadow registers.
pub const GLOBAL_GAIN: u16 = 0x305E;
pub const GLOBAL_GAIN_CB: u16 = 0x30C4;

// Tuning registers without a public name in the datasheet.
pub const RESERVED_30EA: u16 = 0x30EA;
pub const RESERVED_3180: u16 = 0x3180;
pub const ANALOG_SETTING: u16 = 0x3ED6;

// RESET control codes. Bit 2 is the streaming bit; the upper byte selects
// the start source.
pub const RESET_CODE: u16 = 0x00D9;
pub const STREAM_OFF: u16 = 0x00D8;
pub const STREAM_ON: u16 = 0x00DC;
pub const MASTER_MODE: u16 = 0x10DC;
pub const TRIGGER_MODE: u16 = 0x19D8;
pub const STREAMING_BIT: u16 = 1 << 2;

pub const LLP_RECOMMENDED: u16 = 1650;
/// Vertical blanking added on top of the window height.
pub const FRAME_BLANKING_LINES: u16 = 37;
pub const COARSE_INT_TIME_DEF: u16 = 0x01C2;
pub const EXPOSURE_MIN: u16 = 1;
pub const EXPOSURE_MAX: u16 = 0x02A0;
pub const FRAME_LENGTH_MAX: u16 = 0x7FFF;
