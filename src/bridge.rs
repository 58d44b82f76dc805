//! MIPI serializer bridge bring-up.
//!
//! The bridge converts the sensor's parallel readout to a CSI-2 stream. Its
//! registers sit behind 16-bit addresses on the same control bus as the
//! sensor; configuration registers are 16 bits wide, the CSI transmitter
//! block takes 32-bit words. All timing constants below were derived once
//! from the bridge datasheet for the supported link rates; nothing is
//! computed at runtime.

use embedded_hal::delay::DelayNs;

use crate::i2c::{write_reg16, write_reg32};
use crate::regs::BRIDGE_ADDR;
use crate::{Interface, IoError};

/// Number of CSI-2 data lanes wired out from the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaneCount {
    One,
    Two,
    Four,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeDirective {
    Write16 { address: u16, value: u16 },
    Write32 { address: u16, value: u32 },
    SleepUs(u32),
}

use BridgeDirective::{SleepUs, Write16, Write32};

// Configuration block (16-bit)
const SYSCTL: u16 = 0x0002;
const CONFCTL: u16 = 0x0004;
const PLLCTL0: u16 = 0x0016;
const PLLCTL1: u16 = 0x0018;
const CLKCTL: u16 = 0x0020;
const WORDCNT: u16 = 0x0022;

// CSI-2 transmitter block (32-bit)
const CLW_DPHYCONTTX: u16 = 0x0140;
const D0W_DPHYCONTTX: u16 = 0x0144;
const STARTCNTRL: u16 = 0x0204;
const LINEINITCNT: u16 = 0x0210;
const LPTXTIMECNT: u16 = 0x0214;
const TCLK_HEADERCNT: u16 = 0x0218;
const TCLK_TRAILCNT: u16 = 0x021C;
const THS_HEADERCNT: u16 = 0x0220;
const TWAKEUP: u16 = 0x0224;
const TCLK_POSTCNT: u16 = 0x0228;
const THS_TRAILCNT: u16 = 0x022C;
const HSTXVREGCNT: u16 = 0x0230;
const HSTXVREGEN: u16 = 0x0234;
const TXOPTIONCNT: u16 = 0x0238;
const CSI_CONFW: u16 = 0x0500;
const CSI_START: u16 = 0x0518;

macro_rules! lane_table {
    (hstxvregen: $vregen:expr, confw: $confw:expr, confctl: $confctl:expr) => {
        &[
            // Soft reset, then PLL up before anything touches the CSI block.
            Write16 {
                address: SYSCTL,
                value: 0x0001,
            },
            SleepUs(10),
            Write16 {
                address: SYSCTL,
                value: 0x0000,
            },
            Write16 {
                address: PLLCTL0,
                value: 0x3057,
            },
            Write16 {
                address: PLLCTL1,
                value: 0x0203,
            },
            SleepUs(10),
            Write16 {
                address: PLLCTL1,
                value: 0x0213,
            },
            Write16 {
                address: CLKCTL,
                value: 0x0001,
            },
            Write16 {
                address: WORDCNT,
                value: 0x0A00,
            },
            // D-PHY lane timing.
            Write32 {
                address: CLW_DPHYCONTTX,
                value: 0x0000_0000,
            },
            Write32 {
                address: D0W_DPHYCONTTX,
                value: 0x0000_0000,
            },
            Write32 {
                address: LINEINITCNT,
                value: 0x0000_1770,
            },
            Write32 {
                address: LPTXTIMECNT,
                value: 0x0000_0005,
            },
            Write32 {
                address: TCLK_HEADERCNT,
                value: 0x0000_2004,
            },
            Write32 {
                address: TCLK_TRAILCNT,
                value: 0x0000_0001,
            },
            Write32 {
                address: THS_HEADERCNT,
                value: 0x0000_0604,
            },
            Write32 {
                address: TWAKEUP,
                value: 0x0000_4882,
            },
            Write32 {
                address: TCLK_POSTCNT,
                value: 0x0000_0008,
            },
            Write32 {
                address: THS_TRAILCNT,
                value: 0x0000_0002,
            },
            Write32 {
                address: HSTXVREGCNT,
                value: 0x0000_0005,
            },
            Write32 {
                address: HSTXVREGEN,
                value: $vregen,
            },
            Write32 {
                address: TXOPTIONCNT,
                value: 0x0000_0001,
            },
            // Start the transmitter, select the lane layout, enable input.
            Write32 {
                address: STARTCNTRL,
                value: 0x0000_0001,
            },
            Write32 {
                address: CSI_START,
                value: 0x0000_0001,
            },
            Write32 {
                address: CSI_CONFW,
                value: $confw,
            },
            Write16 {
                address: CONFCTL,
                value: $confctl,
            },
        ]
    };
}

static ONE_LANE: &[BridgeDirective] = lane_table! {
    hstxvregen: 0x0000_0003,
    confw: 0xA300_8084,
    confctl: 0x8040
};

static TWO_LANE: &[BridgeDirective] = lane_table! {
    hstxvregen: 0x0000_0007,
    confw: 0xA300_8086,
    confctl: 0x8041
};

static FOUR_LANE: &[BridgeDirective] = lane_table! {
    hstxvregen: 0x0000_001F,
    confw: 0xA300_808A,
    confctl: 0x8043
};

/// Applies the configuration table for the given lane layout to the bridge.
pub(crate) fn configure<I: Interface, D: DelayNs>(
    bus: &mut I,
    delay: &mut D,
    lanes: LaneCount,
) -> Result<(), IoError<I::Error>> {
    debug!("bridge: configuring for {} lane(s)", lanes);
    let table = match lanes {
        LaneCount::One => ONE_LANE,
        LaneCount::Two => TWO_LANE,
        LaneCount::Four => FOUR_LANE,
    };
    for directive in table {
        match *directive {
            Write16 { address, value } => write_reg16(bus, BRIDGE_ADDR, address, value)?,
            Write32 { address, value } => write_reg32(bus, BRIDGE_ADDR, address, value)?,
            SleepUs(us) => delay.delay_us(us),
        }
    }
    Ok(())
}
