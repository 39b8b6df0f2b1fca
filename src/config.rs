use crate::variant::{Channel, Variant};

/// Factory-default bus address of the family.
pub const DEFAULT_ADDRESS: u8 = 0x28;

/// Shortest nonzero update interval the sensor tolerates.
pub const MIN_UPDATE_INTERVAL_MS: u32 = 30_000;

/// Rejected configurations. Surfaced by [`Config::validate`] before a
/// driver exists; none of these can occur at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("{variant} does not provide a {channel} channel")]
    UnsupportedChannel { variant: Variant, channel: Channel },
    #[error("update interval of {0} ms is below the 30 s minimum")]
    UpdateIntervalTooShort(u32),
    #[error("{0:#04x} is not a 7-bit bus address")]
    InvalidAddress(u8),
}

/// Typed driver configuration, as a host configuration layer would
/// produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub variant: Variant,
    pub address: u8,
    /// Milliseconds between polls; 0 polls on every tick.
    pub update_interval_ms: u32,
    pub pm1_0: bool,
    pub pm2_5: bool,
}

impl Config {
    /// Defaults: factory bus address, no throttling, both channels on.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            address: DEFAULT_ADDRESS,
            update_interval_ms: 0,
            pm1_0: true,
            pm2_5: true,
        }
    }

    pub fn address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn update_interval_ms(mut self, millis: u32) -> Self {
        self.update_interval_ms = millis;
        self
    }

    pub fn pm1_0(mut self, enabled: bool) -> Self {
        self.pm1_0 = enabled;
        self
    }

    pub fn pm2_5(mut self, enabled: bool) -> Self {
        self.pm2_5 = enabled;
        self
    }

    /// Checks the configuration against the variant's capability row and
    /// the family's limits. Called by the driver constructor; public so a
    /// host layer can validate before committing a bus.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > 0x7f {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.update_interval_ms != 0 && self.update_interval_ms < MIN_UPDATE_INTERVAL_MS {
            return Err(ConfigError::UpdateIntervalTooShort(self.update_interval_ms));
        }

        let capabilities = self.variant.capabilities();
        for (enabled, channel) in [(self.pm1_0, Channel::Pm1_0), (self.pm2_5, Channel::Pm2_5)] {
            if enabled && !capabilities.supports(channel) {
                return Err(ConfigError::UnsupportedChannel {
                    variant: self.variant,
                    channel,
                });
            }
        }

        Ok(())
    }
}
