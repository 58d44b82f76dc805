//! Supply rail sequencing.
//!
//! The sensor/bridge pair takes three switched supplies which must come up
//! digital core first and go down in the exact reverse order. The reset
//! line is only released once the I/O rail is stable.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

/// One switchable supply feeding the module.
pub trait Supply {
    type Error;

    fn enable(&mut self) -> Result<(), Self::Error>;
    fn disable(&mut self) -> Result<(), Self::Error>;
}

/// Board-level power control.
///
/// [`RailSequencer`] is the stock implementation. Boards that gate module
/// power elsewhere (a load switch behind its own controller, say) implement
/// this themselves and their implementation is used exclusively.
pub trait PowerControl {
    type Error;

    fn power_on<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;
    fn power_off<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error>;
}

/// Supply rails, in enable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rail {
    /// 1.2 V digital core.
    Dvdd,
    /// 2.8 V analog.
    Avdd,
    /// 1.8 V I/O.
    Iovdd,
}

impl Rail {
    /// Settle time after the rail reaches regulation.
    fn settle_us(self) -> u32 {
        match self {
            Rail::Dvdd => 10,
            Rail::Avdd => 10,
            // Power-on reset is generated once core power is stable.
            Rail::Iovdd => 2000,
        }
    }
}

const ENABLE_ORDER: [Rail; 3] = [Rail::Dvdd, Rail::Avdd, Rail::Iovdd];

/// Hold time after releasing the reset line.
const RESET_RELEASE_US: u32 = 1350;

#[derive(Debug)]
pub enum PowerError<S, R> {
    /// A rail failed to switch. Rails enabled earlier in the sequence have
    /// already been rolled back.
    Rail { rail: Rail, source: S },
    /// The reset line could not be driven.
    Reset(R),
}

/// Rail-by-rail power sequencer with a dedicated reset line.
pub struct RailSequencer<S, X> {
    dvdd: S,
    avdd: S,
    iovdd: S,
    reset: X,
}

impl<S: Supply, X: OutputPin> RailSequencer<S, X> {
    /// Takes ownership of the three rails and the active-low reset line.
    /// The reset line is driven low (asserted) immediately.
    pub fn new(dvdd: S, avdd: S, iovdd: S, mut reset: X) -> Result<Self, X::Error> {
        reset.set_low()?;
        Ok(Self {
            dvdd,
            avdd,
            iovdd,
            reset,
        })
    }

    fn rail_mut(&mut self, rail: Rail) -> &mut S {
        match rail {
            Rail::Dvdd => &mut self.dvdd,
            Rail::Avdd => &mut self.avdd,
            Rail::Iovdd => &mut self.iovdd,
        }
    }

    /// Disables already-enabled rails in reverse order after a failure part
    /// way through the enable sequence. Disable failures are not reported;
    /// there is no better recovery available at this point.
    fn roll_back(&mut self, enabled: usize) {
        for &rail in ENABLE_ORDER[..enabled].iter().rev() {
            warn!("rolling back rail {}", rail);
            let _ = self.rail_mut(rail).disable();
        }
    }
}

impl<S: Supply, X: OutputPin> PowerControl for RailSequencer<S, X> {
    type Error = PowerError<S::Error, X::Error>;

    fn power_on<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        debug!("power on");
        for (enabled, &rail) in ENABLE_ORDER.iter().enumerate() {
            if let Err(source) = self.rail_mut(rail).enable() {
                self.roll_back(enabled);
                return Err(PowerError::Rail { rail, source });
            }
            delay.delay_us(rail.settle_us());
        }

        if let Err(e) = self.reset.set_high() {
            self.roll_back(ENABLE_ORDER.len());
            return Err(PowerError::Reset(e));
        }
        delay.delay_us(RESET_RELEASE_US);
        Ok(())
    }

    fn power_off<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        debug!("power off");
        let reset = self.reset.set_low().map_err(PowerError::Reset);
        delay.delay_us(2000);

        // Strict reverse of the enable order. Keep going past a failed
        // rail so the others still come down, then report the first fault.
        let mut first_fault = Ok(());
        for &rail in ENABLE_ORDER.iter().rev() {
            if let Err(source) = self.rail_mut(rail).disable() {
                error!("rail {} failed to disable", rail);
                if first_fault.is_ok() {
                    first_fault = Err(PowerError::Rail { rail, source });
                }
            }
            delay.delay_us(10);
        }
        reset.and(first_fault)
    }
}
