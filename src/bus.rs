use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// Transport failures, folded into the classes the driver cares about.
///
/// The underlying HAL supplies its own timeout; timeouts and other
/// unclassified failures surface as [`BusError::Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    #[error("device did not acknowledge")]
    NoAcknowledge,
    #[error("bus busy or arbitration lost")]
    Contention,
    #[error("transport error")]
    Transport,
}

impl BusError {
    fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::NoAcknowledge,
            ErrorKind::ArbitrationLoss | ErrorKind::Bus => BusError::Contention,
            _ => BusError::Transport,
        }
    }
}

/// One addressed endpoint on the two-wire bus.
///
/// Adds no protocol logic and no retries; each call is a single blocking
/// round trip bounded by the transport's own timeout.
pub(crate) struct Bus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Bus<I2C> {
    pub(crate) fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c
            .write(self.address, bytes)
            .map_err(|e| BusError::from_kind(e.kind()))
    }

    pub(crate) fn read(&mut self, buffer: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .read(self.address, buffer)
            .map_err(|e| BusError::from_kind(e.kind()))
    }

    pub(crate) fn release(self) -> I2C {
        self.i2c
    }
}
