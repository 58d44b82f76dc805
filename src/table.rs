//! Table-driven register programming.
//!
//! Configuration tables are ordered lists of directives applied strictly in
//! sequence. Later entries assume earlier ones landed, so a failed write
//! aborts the run and the caller restarts from the top if it wants to retry.

use embedded_hal::delay::DelayNs;

use crate::i2c::write_reg16;
use crate::regs;
use crate::{Interface, IoError};

/// One entry of a sensor configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Write `value` to `address`.
    Write { address: u16, value: u16 },
    /// Block for the given number of milliseconds.
    Sleep { ms: u16 },
    /// Terminates the table.
    End,
}

impl Directive {
    pub const fn write(address: u16, value: u16) -> Self {
        Self::Write { address, value }
    }

    pub const fn sleep_ms(ms: u16) -> Self {
        Self::Sleep { ms }
    }
}

/// Applies `table` to the sensor, stopping at the first failed write or at
/// the `End` sentinel, whichever comes first.
pub fn apply<I: Interface, D: DelayNs>(
    bus: &mut I,
    delay: &mut D,
    table: &[Directive],
) -> Result<(), IoError<I::Error>> {
    for directive in table {
        match *directive {
            Directive::Write { address, value } => {
                write_reg16(bus, regs::SENSOR_ADDR, address, value)?
            }
            Directive::Sleep { ms } => delay.delay_ms(u32::from(ms)),
            Directive::End => break,
        }
    }
    Ok(())
}
