use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::io;
use tokio_util::codec::{Decoder, Framed};

use super::codec::LineCodec;
use super::config::DeviceConfig;
use super::transport::{Port, SerialTransport, Transport};
use super::{ProtoError, Result};

struct Connection {
    config: DeviceConfig,
    stream: Framed<Box<dyn Port>, LineCodec>,
}

/// A generic line-oriented serial device.
///
/// The device owns at most one connection. Commands are written with the
/// configured terminator appended, responses are read one line at a time
/// and bounded by the configured timeout. Nothing is retried.
pub struct SerialDevice<T: Transport = SerialTransport> {
    config: DeviceConfig,
    transport: T,
    connection: Option<Connection>,
}

impl SerialDevice<SerialTransport> {
    /// Creates a closed device for a real serial port.
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_transport(config, SerialTransport)
    }
}

impl<T: Transport> SerialDevice<T> {
    pub fn with_transport(config: DeviceConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            connection: None,
        }
    }

    /// Configuration used by [`open`](Self::open), or of the open connection.
    pub fn config(&self) -> &DeviceConfig {
        match &self.connection {
            Some(conn) => &conn.config,
            None => &self.config,
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the port with the configuration given at construction.
    pub fn open(&mut self) -> Result<()> {
        let config = self.config.clone();
        self.open_with(config)
    }

    /// Opens the port with `config`.
    ///
    /// Opening an already open device is a no-op if the configuration is
    /// identical and an [`AlreadyOpen`](ProtoError::AlreadyOpen) error otherwise.
    pub fn open_with(&mut self, config: DeviceConfig) -> Result<()> {
        if let Some(conn) = &self.connection {
            if conn.config == config {
                debug!("{} is already open", config.port);
                return Ok(());
            }
            return Err(ProtoError::AlreadyOpen {
                port: conn.config.port.clone(),
            });
        }

        info!("Opening serial port {}", config.port);
        let port = self
            .transport
            .open(&config)
            .map_err(|source| ProtoError::Connection {
                port: config.port.clone(),
                source,
            })?;
        let stream = LineCodec::new(config.terminator.as_bytes()).framed(port);
        self.config = config.clone();
        self.connection = Some(Connection { config, stream });
        Ok(())
    }

    /// Releases the port. Does nothing if the device is closed.
    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            info!("Closing serial port {}", conn.config.port);
        }
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.connection.as_mut().ok_or(ProtoError::NotConnected)
    }

    /// Writes `command` followed by the line terminator.
    ///
    /// A port that accepts no data within the write timeout fails with
    /// [`Write`](ProtoError::Write).
    pub async fn send(&mut self, command: impl AsRef<str>) -> Result<()> {
        let conn = self.connection()?;
        let command = command.as_ref();
        let write_timeout = conn.config.write_timeout;
        debug!("{} <- {:?}", conn.config.port, command);
        match tokio::time::timeout(write_timeout, conn.stream.send(command.to_string())).await {
            Ok(res) => res.map_err(ProtoError::Write),
            Err(_elapsed) => {
                warn!("{}: write timeout after {:?}", conn.config.port, write_timeout);
                Err(ProtoError::Write(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("write not completed within {:?}", write_timeout),
                )))
            }
        }
    }

    /// Waits for one complete line and returns it without its terminator.
    pub async fn read(&mut self) -> Result<String> {
        let conn = self.connection()?;
        let timeout = conn.config.timeout;
        match tokio::time::timeout(timeout, conn.stream.next()).await {
            Ok(Some(Ok(Ok(line)))) => {
                debug!("{} -> {:?}", conn.config.port, line);
                Ok(line)
            }
            Ok(Some(Ok(Err(bad_line)))) => {
                warn!("{}: discarded response: {}", conn.config.port, bad_line);
                Err(ProtoError::Parse(bad_line.to_string()))
            }
            Ok(Some(Err(ioerr))) => Err(ioerr.into()),
            Ok(None) => Err(ProtoError::Abort),
            Err(_elapsed) => {
                warn!("{}: read timeout after {:?}", conn.config.port, timeout);
                Err(ProtoError::Timeout(timeout))
            }
        }
    }

    /// Sends `command` and reads one response line.
    pub async fn query(&mut self, command: impl AsRef<str>) -> Result<String> {
        self.send(command).await?;
        self.read().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::proto::fake::FakeTransport;

    fn config() -> DeviceConfig {
        DeviceConfig::new("/dev/ttyFAKE0", 19200).timeout(Duration::from_millis(100))
    }

    fn device(transport: &FakeTransport) -> SerialDevice<FakeTransport> {
        SerialDevice::with_transport(config(), transport.clone())
    }

    #[tokio::test]
    async fn new_device_is_closed() {
        let dev = device(&FakeTransport::echo());
        assert!(!dev.is_open());
    }

    #[tokio::test]
    async fn open_close_reopen() {
        let transport = FakeTransport::echo();
        let mut dev = device(&transport);
        dev.open().unwrap();
        assert!(dev.is_open());
        dev.close();
        assert!(!dev.is_open());
        assert_eq!(transport.live(), 0);
        dev.open().unwrap();
        assert!(dev.is_open());
        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.live(), 1);
    }

    #[tokio::test]
    async fn dropping_device_releases_port() {
        let transport = FakeTransport::echo();
        {
            let mut dev = device(&transport);
            dev.open().unwrap();
            assert_eq!(transport.live(), 1);
        }
        assert_eq!(transport.live(), 0);
    }

    #[tokio::test]
    async fn reopen_with_same_config_is_noop() {
        let transport = FakeTransport::echo();
        let mut dev = device(&transport);
        dev.open().unwrap();
        dev.open_with(config()).unwrap();
        assert!(dev.is_open());
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test]
    async fn reopen_with_other_config_fails() {
        let transport = FakeTransport::echo();
        let mut dev = device(&transport);
        dev.open().unwrap();
        let other = config().timeout(Duration::from_secs(1));
        assert!(matches!(
            dev.open_with(other),
            Err(ProtoError::AlreadyOpen { .. })
        ));
        assert_eq!(dev.config().timeout, Duration::from_millis(100));
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test]
    async fn absent_port_is_connection_error() {
        let mut dev = device(&FakeTransport::absent());
        match dev.open() {
            Err(ProtoError::Connection { port, source }) => {
                assert_eq!(port, "/dev/ttyFAKE0");
                assert_eq!(source.kind(), tokio_serial::ErrorKind::NoDevice);
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
        assert!(!dev.is_open());
    }

    #[tokio::test]
    async fn close_twice() {
        let transport = FakeTransport::echo();
        let mut dev = device(&transport);
        dev.open().unwrap();
        dev.close();
        dev.close();
        assert!(!dev.is_open());
        assert_eq!(transport.live(), 0);
    }

    #[tokio::test]
    async fn closed_device_does_no_io() {
        let transport = FakeTransport::echo();
        let mut dev = device(&transport);
        assert!(matches!(dev.send("PING").await, Err(ProtoError::NotConnected)));
        assert!(matches!(dev.read().await, Err(ProtoError::NotConnected)));
        assert!(matches!(
            dev.query("PING").await,
            Err(ProtoError::NotConnected)
        ));
        assert_eq!(transport.opens(), 0);
        assert!(transport.written().is_empty());

        dev.open().unwrap();
        dev.close();
        assert!(matches!(dev.send("PING").await, Err(ProtoError::NotConnected)));
        assert!(transport.written().is_empty());
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let mut dev = device(&FakeTransport::echo());
        dev.open().unwrap();
        assert_eq!(dev.query("PING").await.unwrap(), "PING");
    }

    #[tokio::test]
    async fn query_equals_send_then_read() {
        let queried = FakeTransport::scripted("+1.0E+00\n");
        let mut dev = device(&queried);
        dev.open().unwrap();
        let a = dev.query("READ?").await.unwrap();

        let split = FakeTransport::scripted("+1.0E+00\n");
        let mut dev = device(&split);
        dev.open().unwrap();
        dev.send("READ?").await.unwrap();
        let b = dev.read().await.unwrap();

        assert_eq!(a, b);
        assert_eq!(queried.written(), split.written());
        assert_eq!(queried.written(), "READ?\n");
    }

    #[tokio::test]
    async fn send_appends_terminator() {
        let transport = FakeTransport::silent();
        let mut dev = SerialDevice::with_transport(config().terminator("\r\n"), transport.clone());
        dev.open().unwrap();
        dev.send("*IDN?").await.unwrap();
        dev.send("").await.unwrap();
        assert_eq!(transport.written(), "*IDN?\r\n\r\n");
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let mut dev = device(&FakeTransport::silent());
        dev.open().unwrap();
        let start = Instant::now();
        let res = dev.query("*IDN?").await;
        assert!(matches!(res, Err(ProtoError::Timeout(t)) if t == Duration::from_millis(100)));
        assert!(start.elapsed() < Duration::from_secs(2));
        // Still usable afterwards.
        assert!(dev.is_open());
    }

    #[tokio::test]
    async fn broken_write_is_write_error() {
        let mut dev = device(&FakeTransport::broken_write());
        dev.open().unwrap();
        assert!(matches!(dev.send("*RST").await, Err(ProtoError::Write(_))));
    }

    #[tokio::test]
    async fn closed_stream_aborts() {
        let mut dev = device(&FakeTransport::eof());
        dev.open().unwrap();
        assert!(matches!(dev.read().await, Err(ProtoError::Abort)));
    }

    #[tokio::test]
    async fn overlong_line_is_parse_error() {
        let reply = format!("{}\n", "9".repeat(1200));
        let mut dev = device(&FakeTransport::scripted(&reply));
        dev.open().unwrap();
        assert!(matches!(dev.read().await, Err(ProtoError::Parse(_))));
    }

    #[tokio::test]
    async fn bad_line_does_not_break_following_reads() {
        let reply = format!("{}\n+1.0E+00\n", "9".repeat(1200));
        let mut dev = device(&FakeTransport::scripted(&reply));
        dev.open().unwrap();
        assert!(matches!(dev.read().await, Err(ProtoError::Parse(_))));
        assert_eq!(dev.read().await.unwrap(), "+1.0E+00");
        assert!(matches!(dev.read().await, Err(ProtoError::Timeout(_))));

        let mut dev = device(&FakeTransport::scripted_bytes(b"\xff\n+1.0E+00\n"));
        dev.open().unwrap();
        assert!(matches!(dev.read().await, Err(ProtoError::Parse(_))));
        assert_eq!(dev.read().await.unwrap(), "+1.0E+00");
        assert!(dev.is_open());
    }

    #[tokio::test]
    async fn stalled_write_times_out() {
        let transport = FakeTransport::stalled_write();
        let mut dev = SerialDevice::with_transport(
            config().write_timeout(Duration::from_millis(100)),
            transport.clone(),
        );
        dev.open().unwrap();
        let start = Instant::now();
        match dev.send("*RST").await {
            Err(ProtoError::Write(err)) => assert_eq!(err.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            dev.query("*IDN?").await,
            Err(ProtoError::Write(_))
        ));
    }
}
