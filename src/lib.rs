//! Driver for the Cubic PM2005/PM2105 I2C particulate matter sensors.
//!
//! An external scheduler calls [`Pm2x05::tick`] with a millisecond
//! timestamp; the driver decides whether to poll, talks to the sensor
//! over the `embedded-hal` I2C traits, validates the response frame and
//! publishes PM1.0/PM2.5 concentrations to the attached sinks.

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("features \"defmt\" and \"log\" are mutually exclusive");

#[macro_use]
mod fmt;

mod bus;
mod config;
mod duty_cycle;
mod frame;
mod variant;

pub use bus::BusError;
pub use config::{Config, ConfigError, DEFAULT_ADDRESS, MIN_UPDATE_INTERVAL_MS};
pub use frame::{FrameError, Situation};
pub use variant::{Capabilities, Channel, Variant};

use bus::Bus;
use duty_cycle::{Decision, DutyCycle, PowerState};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use frame::{decode_measurement, encode_command, Command, RESPONSE_FRAME_SIZE};

/// Milliseconds the sensor needs between a wake command and the first
/// measurement request.
pub const WAKE_SETTLE_MS: u32 = 200;

/// Receives validated readings, one value per enabled channel, in µg/m³.
pub trait Sink {
    fn publish(&mut self, ug_per_m3: u16);
}

/// Concentrations published by one successful poll. A channel is `None`
/// when it is disabled in the configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub pm1_0: Option<u16>,
    pub pm2_5: Option<u16>,
}

/// Failures of a single poll. The cadence deadline has already advanced
/// when one of these is returned; the next due tick retries naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("bus transaction failed: {0}")]
    Bus(#[from] BusError),
    #[error("invalid response frame: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error("measurement not ready: {0}")]
    NotReady(Situation),
}

pub struct Pm2x05<'s, I2C> {
    bus: Bus<I2C>,
    variant: Variant,
    pm1_0_enabled: bool,
    pm2_5_enabled: bool,
    duty: DutyCycle,
    pm1_0_sink: Option<&'s mut dyn Sink>,
    pm2_5_sink: Option<&'s mut dyn Sink>,
}

impl<'s, I2C: I2c> Pm2x05<'s, I2C> {
    ///
    /// Creates a driver over an I2C bus. Fails if the configuration
    /// violates the variant's capabilities or the family's limits.
    ///
    pub fn new(i2c: I2C, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let capabilities = config.variant.capabilities();
        Ok(Self {
            bus: Bus::new(i2c, config.address),
            variant: config.variant,
            pm1_0_enabled: config.pm1_0,
            pm2_5_enabled: config.pm2_5,
            duty: DutyCycle::new(config.update_interval_ms, capabilities.sleep_wake),
            pm1_0_sink: None,
            pm2_5_sink: None,
        })
    }

    pub fn set_pm1_0_sink(&mut self, sink: &'s mut dyn Sink) {
        self.pm1_0_sink = Some(sink);
    }

    pub fn set_pm2_5_sink(&mut self, sink: &'s mut dyn Sink) {
        self.pm2_5_sink = Some(sink);
    }

    ///
    /// Drives the duty cycle. Call at any cadence with a monotonic
    /// millisecond timestamp; the driver re-derives due-ness from the
    /// clock. Returns `Ok(None)` when no poll was due, `Ok(Some(_))`
    /// after a successful poll, and the failure of the attempted poll
    /// otherwise.
    ///
    pub fn tick<D: DelayNs>(&mut self, now_ms: u32, delay: &mut D) -> Result<Option<Readings>, Error> {
        let wake_first = match self.duty.decide(now_ms) {
            Decision::Skip => return Ok(None),
            Decision::Poll { wake_first } => wake_first,
        };

        if wake_first {
            if let Err(e) = self.bus.write(&encode_command(Command::Wake)) {
                // The wake never reached the sensor; it is still in low
                // power mode and the next due poll must wake it again.
                self.duty.finish(PowerState::Asleep);
                return Err(e.into());
            }
            self.duty.wake_issued();
            delay.delay_ms(WAKE_SETTLE_MS);
        }

        match self.read_measurement() {
            Ok(readings) => {
                let power = self.try_sleep();
                self.duty.finish(power);
                Ok(Some(readings))
            }
            Err(e) => {
                self.duty.finish(PowerState::Awake);
                Err(e)
            }
        }
    }

    /// One measurement exchange: request, read back, decode, publish.
    fn read_measurement(&mut self) -> Result<Readings, Error> {
        self.bus.write(&encode_command(Command::Measure))?;

        let mut buffer = [0u8; RESPONSE_FRAME_SIZE];
        self.bus.read(&mut buffer)?;

        let frame = decode_measurement(self.variant, &buffer)?;
        if frame.situation != Situation::Completed {
            debug!("measurement not ready: {}", frame.situation);
            return Err(Error::NotReady(frame.situation));
        }

        debug!("PM1.0 {} µg/m³, PM2.5 {} µg/m³", frame.pm1_0, frame.pm2_5);

        let capabilities = self.variant.capabilities();
        let mut readings = Readings::default();
        if self.pm1_0_enabled && capabilities.supports(Channel::Pm1_0) {
            readings.pm1_0 = Some(frame.pm1_0);
            if let Some(sink) = self.pm1_0_sink.as_mut() {
                sink.publish(frame.pm1_0);
            }
        }
        if self.pm2_5_enabled && capabilities.supports(Channel::Pm2_5) {
            readings.pm2_5 = Some(frame.pm2_5);
            if let Some(sink) = self.pm2_5_sink.as_mut() {
                sink.publish(frame.pm2_5);
            }
        }

        Ok(readings)
    }

    /// Puts the sensor back into low power mode when the duty cycle asks
    /// for it. A failed sleep keeps the reading; the sensor merely stays
    /// awake until the next poll.
    fn try_sleep(&mut self) -> PowerState {
        if !self.duty.sleep_after_poll() {
            return PowerState::Awake;
        }
        match self.bus.write(&encode_command(Command::Sleep)) {
            Ok(()) => PowerState::Asleep,
            Err(e) => {
                warn!("failed to put sensor to sleep: {}", e);
                PowerState::Awake
            }
        }
    }

    ///
    /// Releases the underlying I2C bus.
    ///
    pub fn release(self) -> I2C {
        self.bus.release()
    }
}
