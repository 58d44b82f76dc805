//! Shared test doubles for the collaborator traits.

use std::cell::RefCell;
use std::rc::Rc;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::power::{PowerControl, Rail, Supply};
use crate::Interface;

#[derive(Debug, PartialEq, Eq)]
pub struct BusFault;

/// Bus double that records every write and can fail on a chosen register.
/// Reads are served from a scripted response table.
pub struct ScriptedBus {
    pub log: Vec<(u8, Vec<u8>)>,
    fail_at: Option<u16>,
    responses: Vec<(u16, u16)>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            fail_at: None,
            responses: Vec::new(),
        }
    }

    /// Makes every write to `address` fail from now on.
    pub fn fail_at(&mut self, address: u16) {
        self.fail_at = Some(address);
    }

    /// Serves `value` for reads of `address`. Unscripted reads return 0.
    pub fn respond(&mut self, address: u16, value: u16) {
        self.responses.retain(|&(a, _)| a != address);
        self.responses.push((address, value));
    }

    /// All 16-bit register writes that went to `device`, in order.
    pub fn writes16(&self, device: u8) -> Vec<(u16, u16)> {
        self.log
            .iter()
            .filter(|(d, bytes)| *d == device && bytes.len() == 4)
            .map(|(_, bytes)| {
                (
                    u16::from_be_bytes([bytes[0], bytes[1]]),
                    u16::from_be_bytes([bytes[2], bytes[3]]),
                )
            })
            .collect()
    }

    /// The last 32-bit value written to `address` on `device`, if any.
    pub fn write32_to(&self, device: u8, address: u16) -> Option<u32> {
        self.log
            .iter()
            .filter(|(d, bytes)| {
                *d == device
                    && bytes.len() == 6
                    && u16::from_be_bytes([bytes[0], bytes[1]]) == address
            })
            .map(|(_, bytes)| u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]))
            .last()
    }
}

impl Interface for ScriptedBus {
    type Error = BusFault;

    fn transfer(&mut self, device: u8, wr: &[u8], rd: &mut [u8]) -> Result<(), BusFault> {
        let address = u16::from_be_bytes([wr[0], wr[1]]);
        if rd.is_empty() {
            if self.fail_at == Some(address) {
                return Err(BusFault);
            }
            self.log.push((device, wr.to_vec()));
        } else {
            let value = self
                .responses
                .iter()
                .find(|&&(a, _)| a == address)
                .map(|&(_, v)| v)
                .unwrap_or(0);
            rd.copy_from_slice(&value.to_be_bytes());
        }
        Ok(())
    }
}

pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub struct NoopPower;

impl PowerControl for NoopPower {
    type Error = ();

    fn power_on<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), ()> {
        Ok(())
    }

    fn power_off<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), ()> {
        Ok(())
    }
}

pub struct FailingPower;

impl PowerControl for FailingPower {
    type Error = ();

    fn power_on<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), ()> {
        Err(())
    }

    fn power_off<D: DelayNs>(&mut self, _delay: &mut D) -> Result<(), ()> {
        Ok(())
    }
}

/// Ordered event log shared between test doubles.
#[derive(Clone, Default)]
pub struct SharedLog(Rc<RefCell<Vec<String>>>);

impl SharedLog {
    pub fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn take(&self) -> Vec<String> {
        core::mem::take(&mut self.0.borrow_mut())
    }
}

/// Supply double that records switching and can be told to fail to enable.
pub struct TestRail {
    log: SharedLog,
    rail: Rail,
    fail_enable: bool,
}

impl TestRail {
    pub fn new(log: &SharedLog, rail: Rail, fail_enable: bool) -> Self {
        Self {
            log: log.clone(),
            rail,
            fail_enable,
        }
    }
}

impl Supply for TestRail {
    type Error = ();

    fn enable(&mut self) -> Result<(), ()> {
        if self.fail_enable {
            self.log.push(format!("enable {:?} failed", self.rail));
            Err(())
        } else {
            self.log.push(format!("enable {:?}", self.rail));
            Ok(())
        }
    }

    fn disable(&mut self) -> Result<(), ()> {
        self.log.push(format!("disable {:?}", self.rail));
        Ok(())
    }
}

/// Reset line double.
pub struct RecordingPin {
    log: SharedLog,
}

impl RecordingPin {
    pub fn new(log: &SharedLog) -> Self {
        Self { log: log.clone() }
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.push("reset low".into());
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.push("reset high".into());
        Ok(())
    }
}
