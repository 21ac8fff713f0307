use std::time::Duration;

use tokio_serial::{DataBits, Parity, StopBits};

use crate::{DEFAULT_BAUDRATE, DEFAULT_TTY};

/// Default time to wait for a complete response line.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a write may take before the port is considered stuck.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default line terminator for outgoing and incoming lines.
pub const DEFAULT_TERMINATOR: &str = "\n";

/// Settings used to open a serial connection.
///
/// A configuration is fixed once the port is open. To change it, close the
/// device and open it again with the new settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub data_bits: DataBits,
    pub timeout: Duration,
    pub write_timeout: Duration,
    pub terminator: String,
}

impl DeviceConfig {
    pub fn new(port: impl AsRef<str>, baud_rate: u32) -> Self {
        Self {
            port: port.as_ref().to_string(),
            baud_rate,
            ..Self::default()
        }
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn terminator(mut self, terminator: impl AsRef<str>) -> Self {
        self.terminator = terminator.as_ref().to_string();
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_TTY.to_string(),
            baud_rate: DEFAULT_BAUDRATE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            data_bits: DataBits::Eight,
            timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            terminator: DEFAULT_TERMINATOR.to_string(),
        }
    }
}
