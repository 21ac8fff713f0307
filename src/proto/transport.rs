use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{FlowControl, SerialPortBuilderExt, SerialPortInfo};

use super::config::DeviceConfig;

/// Byte-level port a [`SerialDevice`](super::device::SerialDevice) talks through.
pub trait Port: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Port for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Opens ports for a device. Every call returns a fresh, exclusively owned handle.
pub trait Transport {
    fn open(&self, config: &DeviceConfig) -> tokio_serial::Result<Box<dyn Port>>;
}

/// Real serial ports via `tokio-serial`. Requires a running tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    fn open(&self, config: &DeviceConfig) -> tokio_serial::Result<Box<dyn Port>> {
        let port = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .data_bits(config.data_bits)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open_native_async()?;
        debug!(
            "Opened {} at {} baud ({:?}, {:?}, {:?})",
            config.port, config.baud_rate, config.data_bits, config.parity, config.stop_bits
        );
        Ok(Box::new(port))
    }
}

/// Lists serial ports known to the operating system.
pub fn available_ports() -> tokio_serial::Result<Vec<SerialPortInfo>> {
    let ports = tokio_serial::available_ports()?;
    for p in &ports {
        info!("Found serial port {} ({:?})", p.port_name, p.port_type);
    }
    Ok(ports)
}
