#![cfg_attr(not(test), no_std)]

//! Configuration and power-sequencing driver for the MT9M021 image sensor
//! behind a MIPI serializer bridge.
//!
//! The driver owns the register protocol, the rail/reset power sequence,
//! PLL setup, table-driven mode programming and the stream state machine.
//! Pixel data never passes through here; once streaming is started the
//! sensor pushes frames to the bridge on its own.
//!
//! All I/O is synchronous and blocking. The driver expects to be the only
//! one talking to the device pair and performs no internal locking or
//! retries; callers serialize operations and decide retry policy.

// This must go first so the macros are visible to the other modules.
mod fmt;

pub mod bridge;
pub mod gain;
pub mod geometry;
pub mod i2c;
pub mod pll;
pub mod power;
pub mod regs;
pub mod table;
mod tables;

#[cfg(test)]
mod testutil;

use arbitrary_int::u2;
use embedded_hal::delay::DelayNs;

use bridge::LaneCount;
use gain::DigitalTest;
use geometry::{Binning, CropRectangle, OutputFormat};
use pll::PllDividers;
use power::PowerControl;
use table::Directive;

/// Raw control-bus transactions.
///
/// The single I/O primitive everything in this crate is built on: write
/// `wr` to the 7-bit `device` address, then read `rd.len()` bytes with a
/// repeated start (none for a pure write). Implementations must not retry.
pub trait Interface {
    type Error;

    fn transfer(&mut self, device: u8, wr: &[u8], rd: &mut [u8]) -> Result<(), Self::Error>;
}

/// A register transaction that failed, and where.
#[derive(Debug)]
pub struct IoError<E> {
    /// Register address the transaction addressed.
    pub address: u16,
    pub source: E,
}

#[derive(Debug)]
pub enum Error<E, P> {
    /// Register transaction failed.
    Io(IoError<E>),
    /// Power sequencing failed; rails have been rolled back.
    Power(P),
    /// The operation needs the device powered.
    NotPowered,
    /// Identity check failed after power-on.
    NotReady { found: u16 },
    /// No divider table row for the configured clock pair.
    UnsupportedFrequencyPair { ext_freq: u32, target_freq: u32 },
    /// Gain request outside the documented range.
    GainOutOfRange(gain::OutOfRange),
}

impl<E, P> From<IoError<E>> for Error<E, P> {
    fn from(e: IoError<E>) -> Self {
        Error::Io(e)
    }
}

impl<E, P> From<gain::OutOfRange> for Error<E, P> {
    fn from(e: gain::OutOfRange) -> Self {
        Error::GainOutOfRange(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    Off,
    Configuring,
    On,
}

/// Color filter variant of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Version {
    Color,
    Monochrome,
}

/// How the sensor starts exposing once streaming is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartMode {
    /// Free-running master mode.
    Master,
    /// Each frame is started by the external trigger input.
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExposureMode {
    Manual,
    /// Auto exposure adjusts integration time only.
    ShutterPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum TestPattern {
    Disabled = 0,
    SolidColor = 1,
    ColorBar = 2,
    FadeToGray = 3,
    Walking1s = 256,
}

/// Resolution/timing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// 1280x720 @ 60fps, window centered on the array.
    Hd720p,
    /// Full 1280x960 array.
    Full,
}

impl Mode {
    fn table(self) -> &'static [Directive] {
        match self {
            Mode::Hd720p => tables::MODE_1280X720,
            Mode::Full => tables::MODE_1280X960,
        }
    }

    /// Readout window the mode table programs.
    pub fn window(self) -> CropRectangle {
        match self {
            Mode::Hd720p => CropRectangle {
                left: 0,
                top: 120,
                width: 1280,
                height: 720,
            },
            Mode::Full => CropRectangle {
                left: 0,
                top: 0,
                width: geometry::PIXEL_ARRAY_WIDTH,
                height: geometry::PIXEL_ARRAY_HEIGHT,
            },
        }
    }
}

/// Static device configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input clock frequency in Hz.
    pub ext_freq: u32,
    /// Pixel clock frequency in Hz.
    pub target_freq: u32,
    pub lanes: LaneCount,
    pub version: Version,
    pub start: StartMode,
    pub mode: Mode,
    /// Mirror gain/integration/frame-length writes into the companion
    /// context shadow registers.
    pub write_cb_shadow: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ext_freq: 24_000_000,
            target_freq: 74_250_000,
            lanes: LaneCount::Two,
            version: Version::Color,
            start: StartMode::Master,
            mode: Mode::Hd720p,
            write_cb_shadow: true,
        }
    }
}

/// Control values requested by the host, applied on the next stream start
/// (and immediately when the device is already powered).
#[derive(Debug, Clone, Copy, Default)]
struct Controls {
    gain: Option<u16>,
    exposure: Option<u16>,
    frame_length: Option<u16>,
    exposure_mode: Option<ExposureMode>,
}

/// MT9M021 + MIPI bridge driver.
pub struct Mt9m021<I, D, P> {
    bus: I,
    delay: D,
    power: P,
    config: Config,
    pll: Option<PllDividers>,
    power_state: PowerState,
    stream: StreamState,
    crop: CropRectangle,
    format: OutputFormat,
    binning: Binning,
    controls: Controls,
}

impl<I, D, P> Mt9m021<I, D, P>
where
    I: Interface,
    D: DelayNs,
    P: PowerControl,
{
    /// Creates a new driver instance. No I/O happens until [`power_on`].
    ///
    /// [`power_on`]: Self::power_on
    pub fn new(bus: I, delay: D, power: P, config: Config) -> Self {
        let crop = config.mode.window();
        Self {
            bus,
            delay,
            power,
            config,
            pll: None,
            power_state: PowerState::Off,
            stream: StreamState::Off,
            crop,
            format: OutputFormat::matching(crop),
            binning: Binning::Disabled,
            controls: Controls::default(),
        }
    }

    pub fn power_state(&self) -> PowerState {
        self.power_state
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream
    }

    pub fn crop(&self) -> CropRectangle {
        self.crop
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn write_reg(&mut self, address: u16, value: u16) -> Result<(), Error<I::Error, P::Error>> {
        i2c::write_reg16(&mut self.bus, regs::SENSOR_ADDR, address, value).map_err(Error::Io)
    }

    fn read_reg(&mut self, address: u16) -> Result<u16, Error<I::Error, P::Error>> {
        i2c::read_reg16(&mut self.bus, regs::SENSOR_ADDR, address).map_err(Error::Io)
    }

    fn apply_table(&mut self, table: &[Directive]) -> Result<(), Error<I::Error, P::Error>> {
        table::apply(&mut self.bus, &mut self.delay, table).map_err(Error::Io)
    }

    /// Powers the device pair up: rails in order, reset release, soft
    /// reset, boot wait, identity check. A failure at any point brings the
    /// rails back down before returning.
    pub fn power_on(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state == PowerState::On {
            return Ok(());
        }
        self.power.power_on(&mut self.delay).map_err(Error::Power)?;
        match self.boot() {
            Ok(()) => {
                self.power_state = PowerState::On;
                Ok(())
            }
            Err(e) => {
                // Do not leave a half-initialized device powered.
                let _ = self.power.power_off(&mut self.delay);
                Err(e)
            }
        }
    }

    fn boot(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        self.write_reg(regs::RESET, regs::RESET_CODE)?;
        self.delay.delay_ms(200);
        self.delay.delay_us(1350);

        let mut id = self.read_reg(regs::CHIP_ID)?;
        let mut tries = 0;
        while id != regs::CHIP_ID_VALUE && tries < 5 {
            self.delay.delay_ms(5);
            id = self.read_reg(regs::CHIP_ID)?;
            tries += 1;
        }
        if id != regs::CHIP_ID_VALUE {
            error!("sensor not detected, chip ID read {=u16:X}", id);
            return Err(Error::NotReady { found: id });
        }
        info!("sensor detected, chip ID {=u16:X}", id);
        Ok(())
    }

    /// Powers the device pair down. Streaming state and any in-flight
    /// configuration are discarded. Calling this while already off is a
    /// no-op.
    pub fn power_off(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state == PowerState::Off {
            return Ok(());
        }
        self.stream = StreamState::Off;
        self.power_state = PowerState::Off;
        self.power.power_off(&mut self.delay).map_err(Error::Power)
    }

    /// Configures the bridge and the sensor, applies pending control
    /// values and starts streaming.
    ///
    /// Any failure up to and including the mode programming aborts the
    /// transition and leaves the stream off; control-value failures are
    /// logged and skipped since the mode defaults already programmed are
    /// valid.
    pub fn start_stream(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state != PowerState::On {
            return Err(Error::NotPowered);
        }
        if self.stream == StreamState::On {
            return Ok(());
        }
        self.stream = StreamState::Configuring;
        match self.configure_and_start() {
            Ok(()) => {
                debug!("streaming started");
                self.stream = StreamState::On;
                Ok(())
            }
            Err(e) => {
                self.stream = StreamState::Off;
                Err(e)
            }
        }
    }

    fn configure_and_start(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        bridge::configure(&mut self.bus, &mut self.delay, self.config.lanes).map_err(Error::Io)?;

        self.load_sequencer()?;
        self.apply_table(tables::COLUMN_CORRECTION_RETRIGGER)?;
        self.apply_table(tables::REV2_TUNING)?;
        self.program_pll()?;

        self.apply_table(self.config.mode.table())?;
        self.apply_geometry()?;

        self.apply_controls();

        let code = match self.config.start {
            StartMode::Master => regs::MASTER_MODE,
            StartMode::Triggered => regs::TRIGGER_MODE,
        };
        self.write_reg(regs::RESET, code)
    }

    /// Stops streaming. The stream is treated as stopped even if the write
    /// fails; the error is still reported.
    pub fn stop_stream(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state != PowerState::On {
            self.stream = StreamState::Off;
            return Ok(());
        }
        self.stream = StreamState::Off;
        self.write_reg(regs::RESET, regs::STREAM_OFF)
    }

    fn load_sequencer(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        self.write_reg(regs::SEQ_CTRL_PORT, 0x8000)?;
        for &word in tables::SEQUENCER_PROGRAM {
            self.write_reg(regs::SEQ_DATA_PORT, word)?;
        }
        Ok(())
    }

    fn program_pll(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        let divs = self.resolve_pll()?;
        debug!(
            "pll: m={=u16} n={=u16} p1={=u16} p2={=u16}",
            divs.m, divs.n, divs.p1, divs.p2
        );
        self.write_reg(regs::VT_SYS_CLK_DIV, divs.p1)?;
        self.write_reg(regs::VT_PIX_CLK_DIV, divs.p2)?;
        self.write_reg(regs::PRE_PLL_CLK_DIV, divs.n)?;
        self.write_reg(regs::PLL_MULTIPLIER, divs.m)?;

        let digital_test = DigitalTest::new_with_raw_value(0)
            .with_mono_op(self.config.version == Version::Monochrome);
        self.write_reg(regs::DIGITAL_TEST, digital_test.raw_value())?;
        self.delay.delay_ms(100);
        Ok(())
    }

    /// Divider lookup happens once; the result is pinned for the lifetime
    /// of the instance since the clock pair cannot change.
    fn resolve_pll(&mut self) -> Result<PllDividers, Error<I::Error, P::Error>> {
        if let Some(divs) = self.pll {
            return Ok(divs);
        }
        let divs = pll::resolve(self.config.ext_freq, self.config.target_freq).ok_or(
            Error::UnsupportedFrequencyPair {
                ext_freq: self.config.ext_freq,
                target_freq: self.config.target_freq,
            },
        )?;
        self.pll = Some(divs);
        Ok(divs)
    }

    fn apply_geometry(&mut self) -> Result<(), Error<I::Error, P::Error>> {
        debug!(
            "window {=u16}x{=u16}+{=u16}+{=u16}, binning {}",
            self.crop.width, self.crop.height, self.crop.left, self.crop.top, self.binning
        );
        self.write_reg(regs::DIGITAL_BINNING, self.binning.register_value())?;
        self.write_reg(regs::Y_ADDR_START, self.crop.top)?;
        self.write_reg(regs::X_ADDR_START, self.crop.left)?;
        self.write_reg(regs::Y_ADDR_END, self.crop.top + self.crop.height - 1)?;
        self.write_reg(regs::X_ADDR_END, self.crop.left + self.crop.width - 1)?;
        self.write_reg(
            regs::FRAME_LENGTH_LINES,
            self.crop.height + regs::FRAME_BLANKING_LINES,
        )?;
        self.write_reg(regs::LINE_LENGTH_PCK, regs::LLP_RECOMMENDED)?;
        self.write_reg(regs::COARSE_INT_TIME, regs::COARSE_INT_TIME_DEF)?;
        self.write_reg(regs::X_ODD_INC, 0x0001)?;
        self.write_reg(regs::Y_ODD_INC, 0x0001)
    }

    /// Applies pending control values during stream start. Failures here
    /// are non-fatal: the mode table already left valid defaults behind.
    fn apply_controls(&mut self) {
        if let Some(request) = self.controls.gain {
            if self.write_gain(request).is_err() {
                warn!("gain override failed, keeping mode default");
            }
        }
        if let Some(lines) = self.controls.exposure {
            if self.write_exposure(lines).is_err() {
                warn!("exposure override failed, keeping mode default");
            }
        }
        if let Some(lines) = self.controls.frame_length {
            if self.write_frame_length(lines).is_err() {
                warn!("frame length override failed, keeping mode default");
            }
        }
        if let Some(mode) = self.controls.exposure_mode {
            if self.write_exposure_mode(mode).is_err() {
                warn!("exposure mode override failed, keeping manual exposure");
            }
        }
    }

    /// Negotiates a readout window. The request is clamped to the array
    /// and aligned down to even coordinates; the negotiated window is
    /// returned. A window size change resets the output format to match
    /// 1:1, forcing the caller to renegotiate the format.
    pub fn set_crop(&mut self, requested: CropRectangle) -> CropRectangle {
        let crop = geometry::negotiate_crop(requested);
        if crop.width != self.crop.width || crop.height != self.crop.height {
            self.format = OutputFormat::matching(crop);
            self.binning = Binning::Disabled;
        }
        self.crop = crop;
        crop
    }

    /// Negotiates the output format against the active crop and derives
    /// the binning mode. Returns the format actually achievable.
    pub fn set_format(&mut self, requested: OutputFormat) -> OutputFormat {
        let (format, binning) = geometry::negotiate_format(self.crop, requested);
        self.format = format;
        self.binning = binning;
        format
    }

    /// Requests a gain, in 1/32 steps of total gain (32 = unity). Applied
    /// immediately when powered, and re-applied on stream start.
    pub fn set_gain(&mut self, request: u16) -> Result<(), Error<I::Error, P::Error>> {
        gain::encode(request)?;
        self.controls.gain = Some(request);
        if self.power_state == PowerState::On {
            self.write_gain(request)?;
        }
        Ok(())
    }

    /// Requests a coarse integration time in lines, clamped to the
    /// documented range.
    pub fn set_exposure(&mut self, lines: u16) -> Result<(), Error<I::Error, P::Error>> {
        let lines = lines.clamp(regs::EXPOSURE_MIN, regs::EXPOSURE_MAX);
        self.controls.exposure = Some(lines);
        if self.power_state == PowerState::On {
            self.write_exposure(lines)?;
        }
        Ok(())
    }

    /// Requests a frame length in lines.
    pub fn set_frame_length(&mut self, lines: u16) -> Result<(), Error<I::Error, P::Error>> {
        let lines = lines.min(regs::FRAME_LENGTH_MAX);
        self.controls.frame_length = Some(lines);
        if self.power_state == PowerState::On {
            self.write_frame_length(lines)?;
        }
        Ok(())
    }

    /// Selects the exposure mode. Applied immediately when powered (with
    /// the streaming bit parked around the write, as the sensor requires),
    /// and re-applied on stream start.
    pub fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<(), Error<I::Error, P::Error>> {
        self.controls.exposure_mode = Some(mode);
        if self.power_state == PowerState::On {
            self.write_exposure_mode(mode)?;
        }
        Ok(())
    }

    /// Selects a pixel test pattern. Requires the device to be powered.
    pub fn set_test_pattern(&mut self, pattern: TestPattern) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state != PowerState::On {
            return Err(Error::NotPowered);
        }
        self.write_reg(regs::TEST_PATTERN, pattern as u16)
    }

    /// Mirrors the readout horizontally and/or vertically. Requires the
    /// device to be powered.
    pub fn set_flip(&mut self, horizontal: bool, vertical: bool) -> Result<(), Error<I::Error, P::Error>> {
        if self.power_state != PowerState::On {
            return Err(Error::NotPowered);
        }
        let mut read_mode = self.read_reg(regs::READ_MODE)?;
        read_mode = read_mode & !0xC000
            | if horizontal { 0x4000 } else { 0 }
            | if vertical { 0x8000 } else { 0 };
        self.write_reg(regs::READ_MODE, read_mode)
    }

    fn write_gain(&mut self, request: u16) -> Result<(), Error<I::Error, P::Error>> {
        let encoded = gain::encode(request)?;
        // Stage select first, then the coarse/fine word; the caller may
        // not assume anything landed unless both writes succeed.
        let digital_test = self.read_reg(regs::DIGITAL_TEST)?;
        let digital_test = DigitalTest::new_with_raw_value(digital_test)
            .with_col_gain(u2::new(encoded.stage as u8));
        self.write_reg(regs::DIGITAL_TEST, digital_test.raw_value())?;
        self.write_reg(regs::GLOBAL_GAIN, encoded.code.raw_value())?;
        if self.config.write_cb_shadow {
            self.write_reg(regs::GLOBAL_GAIN_CB, encoded.code.raw_value())?;
        }
        Ok(())
    }

    fn write_exposure(&mut self, lines: u16) -> Result<(), Error<I::Error, P::Error>> {
        self.write_reg(regs::COARSE_INT_TIME, lines)?;
        if self.config.write_cb_shadow {
            self.write_reg(regs::COARSE_INT_TIME_CB, lines)?;
        }
        Ok(())
    }

    fn write_frame_length(&mut self, lines: u16) -> Result<(), Error<I::Error, P::Error>> {
        self.write_reg(regs::FRAME_LENGTH_LINES, lines)?;
        if self.config.write_cb_shadow {
            self.write_reg(regs::FRAME_LENGTH_LINES_CB, lines)?;
        }
        Ok(())
    }

    fn write_exposure_mode(&mut self, mode: ExposureMode) -> Result<(), Error<I::Error, P::Error>> {
        // The AE configuration only latches while the readout is parked.
        let streaming = self.is_streaming()?;
        if streaming {
            self.write_reg(regs::RESET, regs::STREAM_OFF)?;
        }
        let (embedded_data, ae_ctrl) = match mode {
            ExposureMode::Manual => (0x1802, 0x0000),
            ExposureMode::ShutterPriority => (0x1982, 0x0013),
        };
        self.write_reg(regs::EMBEDDED_DATA_CTRL, embedded_data)?;
        self.write_reg(regs::AE_CTRL, ae_ctrl)?;
        if streaming {
            self.write_reg(regs::RESET, regs::STREAM_ON)?;
        }
        Ok(())
    }

    /// Reads the streaming bit back from the sensor itself.
    fn is_streaming(&mut self) -> Result<bool, Error<I::Error, P::Error>> {
        Ok(self.read_reg(regs::RESET)? & regs::STREAMING_BIT != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingPower, NoopDelay, NoopPower, ScriptedBus};

    fn driver(
        bus: ScriptedBus,
    ) -> Mt9m021<ScriptedBus, NoopDelay, NoopPower> {
        Mt9m021::new(bus, NoopDelay, NoopPower, Config::default())
    }

    fn powered(mut bus: ScriptedBus) -> Mt9m021<ScriptedBus, NoopDelay, NoopPower> {
        bus.respond(regs::CHIP_ID, regs::CHIP_ID_VALUE);
        let mut dev = driver(bus);
        dev.power_on().unwrap();
        dev
    }

    #[test]
    fn power_on_soft_resets_and_checks_identity() {
        let mut dev = powered(ScriptedBus::new());
        assert_eq!(dev.power_state(), PowerState::On);
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [(regs::RESET, regs::RESET_CODE)]
        );
        // Idempotent.
        dev.bus.log.clear();
        dev.power_on().unwrap();
        assert!(dev.bus.log.is_empty());
    }

    #[test]
    fn power_on_with_wrong_identity_powers_back_off() {
        let mut bus = ScriptedBus::new();
        bus.respond(regs::CHIP_ID, 0xBEEF);
        let mut dev = driver(bus);
        let err = dev.power_on().unwrap_err();
        assert!(matches!(err, Error::NotReady { found: 0xBEEF }));
        assert_eq!(dev.power_state(), PowerState::Off);
    }

    #[test]
    fn power_on_propagates_rail_failures() {
        let mut dev = Mt9m021::new(
            ScriptedBus::new(),
            NoopDelay,
            FailingPower,
            Config::default(),
        );
        assert!(matches!(dev.power_on(), Err(Error::Power(()))));
        assert_eq!(dev.power_state(), PowerState::Off);
        // Nothing must have touched the bus.
        assert!(dev.bus.log.is_empty());
    }

    #[test]
    fn start_stream_requires_power() {
        let mut dev = driver(ScriptedBus::new());
        assert!(matches!(dev.start_stream(), Err(Error::NotPowered)));
        assert_eq!(dev.stream_state(), StreamState::Off);
        assert!(dev.bus.log.is_empty());
    }

    #[test]
    fn start_stream_configures_bridge_then_sensor_then_starts() {
        let mut dev = powered(ScriptedBus::new());
        dev.bus.log.clear();
        dev.start_stream().unwrap();
        assert_eq!(dev.stream_state(), StreamState::On);

        // The bridge is configured before the first sensor write.
        let first_sensor = dev
            .bus
            .log
            .iter()
            .position(|(device, _)| *device == regs::SENSOR_ADDR)
            .unwrap();
        assert!(dev.bus.log[..first_sensor]
            .iter()
            .all(|(device, _)| *device == regs::BRIDGE_ADDR));
        assert!(first_sensor > 0);

        let sensor = dev.bus.writes16(regs::SENSOR_ADDR);
        // Sequencer load comes first.
        assert_eq!(sensor[0], (regs::SEQ_CTRL_PORT, 0x8000));
        assert_eq!(sensor[1].0, regs::SEQ_DATA_PORT);
        // Master mode start code is the final write.
        assert_eq!(*sensor.last().unwrap(), (regs::RESET, regs::MASTER_MODE));
        // PLL dividers for the default 24 MHz -> 74.25 MHz pair.
        assert!(sensor.contains(&(regs::PLL_MULTIPLIER, 99)));
        assert!(sensor.contains(&(regs::PRE_PLL_CLK_DIV, 4)));
    }

    #[test]
    fn start_stream_failure_leaves_the_stream_off() {
        let mut dev = powered(ScriptedBus::new());
        dev.bus.fail_at(regs::PLL_MULTIPLIER);
        let err = dev.start_stream().unwrap_err();
        assert!(matches!(err, Error::Io(IoError { address, .. }) if address == regs::PLL_MULTIPLIER));
        assert_eq!(dev.stream_state(), StreamState::Off);
        // The start code must not have been written.
        assert!(!dev
            .bus
            .writes16(regs::SENSOR_ADDR)
            .contains(&(regs::RESET, regs::MASTER_MODE)));
    }

    #[test]
    fn unsupported_clock_pair_aborts_stream_start() {
        let mut bus = ScriptedBus::new();
        bus.respond(regs::CHIP_ID, regs::CHIP_ID_VALUE);
        let mut dev = Mt9m021::new(
            bus,
            NoopDelay,
            NoopPower,
            Config {
                ext_freq: 25_000_000,
                ..Config::default()
            },
        );
        dev.power_on().unwrap();
        assert!(matches!(
            dev.start_stream(),
            Err(Error::UnsupportedFrequencyPair {
                ext_freq: 25_000_000,
                ..
            })
        ));
        assert_eq!(dev.stream_state(), StreamState::Off);
    }

    #[test]
    fn control_override_failures_do_not_abort_stream_start() {
        let mut dev = powered(ScriptedBus::new());
        dev.set_gain(64).unwrap();
        dev.bus.log.clear();
        dev.bus.fail_at(regs::GLOBAL_GAIN);
        dev.start_stream().unwrap();
        assert_eq!(dev.stream_state(), StreamState::On);
        assert_eq!(
            *dev.bus.writes16(regs::SENSOR_ADDR).last().unwrap(),
            (regs::RESET, regs::MASTER_MODE)
        );
    }

    #[test]
    fn stop_stream_writes_the_stop_code_and_lands_off() {
        let mut dev = powered(ScriptedBus::new());
        dev.start_stream().unwrap();
        dev.bus.log.clear();
        dev.stop_stream().unwrap();
        assert_eq!(dev.stream_state(), StreamState::Off);
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [(regs::RESET, regs::STREAM_OFF)]
        );

        // Even a failing stop leaves the stream logically off.
        let mut dev = powered(ScriptedBus::new());
        dev.start_stream().unwrap();
        dev.bus.fail_at(regs::RESET);
        assert!(dev.stop_stream().is_err());
        assert_eq!(dev.stream_state(), StreamState::Off);
    }

    #[test]
    fn power_off_forces_the_stream_off() {
        let mut dev = powered(ScriptedBus::new());
        dev.start_stream().unwrap();
        dev.power_off().unwrap();
        assert_eq!(dev.power_state(), PowerState::Off);
        assert_eq!(dev.stream_state(), StreamState::Off);
        // Idempotent.
        dev.power_off().unwrap();
    }

    #[test]
    fn triggered_start_uses_the_trigger_code() {
        let mut bus = ScriptedBus::new();
        bus.respond(regs::CHIP_ID, regs::CHIP_ID_VALUE);
        let mut dev = Mt9m021::new(
            bus,
            NoopDelay,
            NoopPower,
            Config {
                start: StartMode::Triggered,
                ..Config::default()
            },
        );
        dev.power_on().unwrap();
        dev.start_stream().unwrap();
        assert_eq!(
            *dev.bus.writes16(regs::SENSOR_ADDR).last().unwrap(),
            (regs::RESET, regs::TRIGGER_MODE)
        );
    }

    #[test]
    fn gain_writes_stage_before_code_and_mirrors_the_shadow() {
        let mut dev = powered(ScriptedBus::new());
        dev.bus.log.clear();
        dev.set_gain(48).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [
                (regs::DIGITAL_TEST, 0x0000),
                (regs::GLOBAL_GAIN, 0x0030),
                (regs::GLOBAL_GAIN_CB, 0x0030),
            ]
        );

        // Stage 2 request: the column gain field lands in DIGITAL_TEST.
        dev.bus.log.clear();
        dev.set_gain(128).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR)[0],
            (regs::DIGITAL_TEST, 0x0020),
        );
    }

    #[test]
    fn gain_outside_the_documented_range_is_rejected() {
        let mut dev = driver(ScriptedBus::new());
        assert!(matches!(
            dev.set_gain(10_000),
            Err(Error::GainOutOfRange(_))
        ));
        // Nothing stored, nothing applied at start.
        assert!(dev.controls.gain.is_none());
    }

    #[test]
    fn controls_set_while_off_are_applied_at_stream_start() {
        let mut bus = ScriptedBus::new();
        bus.respond(regs::CHIP_ID, regs::CHIP_ID_VALUE);
        let mut dev = driver(bus);
        dev.set_exposure(0x0200).unwrap();
        dev.set_frame_length(0x0400).unwrap();
        assert!(dev.bus.log.is_empty());

        dev.power_on().unwrap();
        dev.start_stream().unwrap();
        let sensor = dev.bus.writes16(regs::SENSOR_ADDR);
        assert!(sensor.contains(&(regs::COARSE_INT_TIME, 0x0200)));
        assert!(sensor.contains(&(regs::COARSE_INT_TIME_CB, 0x0200)));
        assert!(sensor.contains(&(regs::FRAME_LENGTH_LINES, 0x0400)));
        assert!(sensor.contains(&(regs::FRAME_LENGTH_LINES_CB, 0x0400)));
    }

    #[test]
    fn cb_shadow_writes_can_be_disabled() {
        let mut bus = ScriptedBus::new();
        bus.respond(regs::CHIP_ID, regs::CHIP_ID_VALUE);
        let mut dev = Mt9m021::new(
            bus,
            NoopDelay,
            NoopPower,
            Config {
                write_cb_shadow: false,
                ..Config::default()
            },
        );
        dev.power_on().unwrap();
        dev.bus.log.clear();
        dev.set_exposure(0x0200).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [(regs::COARSE_INT_TIME, 0x0200)]
        );
    }

    #[test]
    fn crop_negotiation_resets_the_format_on_size_change() {
        let mut dev = driver(ScriptedBus::new());
        let crop = dev.set_crop(CropRectangle {
            left: 3,
            top: 5,
            width: 101,
            height: 51,
        });
        assert_eq!(
            crop,
            CropRectangle {
                left: 2,
                top: 4,
                width: 100,
                height: 50,
            }
        );
        assert_eq!(
            dev.format(),
            OutputFormat {
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn format_survives_renegotiating_the_same_crop() {
        let mut dev = driver(ScriptedBus::new());
        let crop = dev.set_crop(CropRectangle {
            left: 0,
            top: 0,
            width: 640,
            height: 480,
        });
        let format = dev.set_format(OutputFormat {
            width: 330,
            height: 250,
        });
        assert_eq!(
            format,
            OutputFormat {
                width: 320,
                height: 240
            }
        );
        // Same rectangle again: the format must be preserved.
        dev.set_crop(crop);
        assert_eq!(dev.format(), format);
    }

    #[test]
    fn negotiated_binning_reaches_the_binning_register() {
        let mut dev = powered(ScriptedBus::new());
        dev.set_crop(CropRectangle {
            left: 0,
            top: 0,
            width: 1280,
            height: 960,
        });
        dev.set_format(OutputFormat {
            width: 640,
            height: 480,
        });
        dev.start_stream().unwrap();
        let sensor = dev.bus.writes16(regs::SENSOR_ADDR);
        let binning_writes: Vec<u16> = sensor
            .iter()
            .filter(|(address, _)| *address == regs::DIGITAL_BINNING)
            .map(|&(_, value)| value)
            .collect();
        // The geometry pass runs after the mode table, so its value wins.
        assert_eq!(binning_writes.last(), Some(&0x0022));
        assert!(sensor.contains(&(regs::Y_ADDR_END, 959)));
        assert!(sensor.contains(&(regs::FRAME_LENGTH_LINES, 960 + 37)));
    }

    #[test]
    fn exposure_mode_parks_the_readout_while_streaming() {
        let mut dev = powered(ScriptedBus::new());
        dev.start_stream().unwrap();
        // The sensor reports the streaming bit set.
        dev.bus.respond(regs::RESET, regs::STREAM_ON);
        dev.bus.log.clear();
        dev.set_exposure_mode(ExposureMode::ShutterPriority).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [
                (regs::RESET, regs::STREAM_OFF),
                (regs::EMBEDDED_DATA_CTRL, 0x1982),
                (regs::AE_CTRL, 0x0013),
                (regs::RESET, regs::STREAM_ON),
            ]
        );
    }

    #[test]
    fn test_pattern_and_flip_require_power() {
        let mut dev = driver(ScriptedBus::new());
        assert!(matches!(
            dev.set_test_pattern(TestPattern::ColorBar),
            Err(Error::NotPowered)
        ));
        assert!(matches!(dev.set_flip(true, false), Err(Error::NotPowered)));

        let mut dev = powered(ScriptedBus::new());
        dev.bus.log.clear();
        dev.set_test_pattern(TestPattern::Walking1s).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [(regs::TEST_PATTERN, 256)]
        );

        dev.bus.log.clear();
        dev.set_flip(true, true).unwrap();
        assert_eq!(
            dev.bus.writes16(regs::SENSOR_ADDR),
            [(regs::READ_MODE, 0xC000)]
        );
    }
}
