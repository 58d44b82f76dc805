use embedded_hal::i2c::I2c;

use crate::{Interface, IoError};

/// Shared two-wire control bus for the sensor/bridge pair.
///
/// Builds the big-endian 16-bit-address framing both devices use on top of
/// a plain `embedded-hal` I2C implementation. Reads use a repeated start.
pub struct CameraBus<B> {
    bus: B,
}

impl<B> CameraBus<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Releases the underlying bus.
    pub fn free(self) -> B {
        self.bus
    }
}

impl<B: I2c> Interface for CameraBus<B> {
    type Error = B::Error;

    fn transfer(&mut self, device: u8, wr: &[u8], rd: &mut [u8]) -> Result<(), B::Error> {
        trace!(
            "CameraBus::transfer(device: {=u8:X}, wr: {=[u8]}, read: {=usize})",
            device,
            wr,
            rd.len()
        );
        if rd.is_empty() {
            self.bus.write(device, wr)
        } else {
            self.bus.write_read(device, wr, rd)
        }
    }
}

pub(crate) fn write_reg16<I: Interface>(
    bus: &mut I,
    device: u8,
    address: u16,
    value: u16,
) -> Result<(), IoError<I::Error>> {
    let a = address.to_be_bytes();
    let v = value.to_be_bytes();
    bus.transfer(device, &[a[0], a[1], v[0], v[1]], &mut [])
        .map_err(|source| IoError { address, source })
}

pub(crate) fn write_reg32<I: Interface>(
    bus: &mut I,
    device: u8,
    address: u16,
    value: u32,
) -> Result<(), IoError<I::Error>> {
    let a = address.to_be_bytes();
    let v = value.to_be_bytes();
    bus.transfer(device, &[a[0], a[1], v[0], v[1], v[2], v[3]], &mut [])
        .map_err(|source| IoError { address, source })
}

pub(crate) fn read_reg16<I: Interface>(
    bus: &mut I,
    device: u8,
    address: u16,
) -> Result<u16, IoError<I::Error>> {
    let mut value = [0; 2];
    bus.transfer(device, &address.to_be_bytes(), &mut value)
        .map_err(|source| IoError { address, source })?;
    Ok(u16::from_be_bytes(value))
}
