use log::debug;

use crate::proto::{
    command::{Command, Function, ResponseShape},
    config::DeviceConfig,
    device::SerialDevice,
    response::{parse_reading, Ident, SystemError},
    transport::{SerialTransport, Transport},
    Result,
};

/// Reply of the 8845A in native mode, as shipped.
pub const GOOD_ID_RESPONSE: &str = "FLUKE,8845A,9344019,09/29/06-16:59";

/// Fluke 8845A digital multimeter.
///
/// Every method issues exactly one command. Arguments are checked before
/// anything is written to the port, and no instrument state is cached:
/// each reading reflects what the meter currently reports.
pub struct Multimeter<T: Transport = SerialTransport> {
    dev: SerialDevice<T>,
}

impl Multimeter<SerialTransport> {
    /// Opens the serial port described by `config`.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        Self::with_transport(config, SerialTransport)
    }
}

impl<T: Transport> Multimeter<T> {
    pub fn with_transport(config: DeviceConfig, transport: T) -> Result<Self> {
        let mut dev = SerialDevice::with_transport(config, transport);
        dev.open()?;
        Ok(Self { dev })
    }

    /// Access to the underlying line device.
    pub fn device(&mut self) -> &mut SerialDevice<T> {
        &mut self.dev
    }

    /// Reopens the port after [`close`](Self::close). No-op if already open.
    pub fn open(&mut self) -> Result<()> {
        self.dev.open()
    }

    pub fn close(&mut self) {
        self.dev.close();
    }

    async fn execute(&mut self, cmd: Command) -> Result<()> {
        debug_assert_eq!(cmd.shape(), ResponseShape::None);
        debug!("Executing {}", cmd);
        self.dev.send(cmd.to_string()).await
    }

    async fn execute_query(&mut self, cmd: Command) -> Result<String> {
        debug_assert_ne!(cmd.shape(), ResponseShape::None);
        debug!("Executing {}", cmd);
        self.dev.query(cmd.to_string()).await
    }

    pub async fn ident(&mut self) -> Result<Ident> {
        self.execute_query(Command::Id).await?.parse()
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.execute(Command::Reset).await
    }

    pub async fn clear_errors(&mut self) -> Result<()> {
        self.execute(Command::ClearStatus).await
    }

    /// Pops the oldest entry of the error queue.
    pub async fn errors(&mut self) -> Result<SystemError> {
        self.execute_query(Command::SystemError).await?.parse()
    }

    /// Locks the front panel and puts the meter under remote control.
    pub async fn remote(&mut self) -> Result<()> {
        self.execute(Command::Remote).await
    }

    pub async fn local(&mut self) -> Result<()> {
        self.execute(Command::Local).await
    }

    /// Selects `function` with a fixed `range`.
    pub async fn set_range(&mut self, range: f64, function: Function) -> Result<()> {
        let range = function.validate_range(range)?;
        self.execute(Command::Configure(function, Some(range))).await
    }

    /// Selects `function` with autoranging.
    pub async fn configure(&mut self, function: Function) -> Result<()> {
        self.execute(Command::Configure(function, None)).await
    }

    /// Function currently selected on the primary display.
    pub async fn function(&mut self) -> Result<Function> {
        let reply = self.execute_query(Command::GetFunction).await?;
        Function::from_reply(&reply)
    }

    /// Configures and triggers a single measurement.
    ///
    /// Overloaded inputs read as [`OVERLOAD`](crate::proto::response::OVERLOAD).
    pub async fn measure(&mut self, function: Function, range: Option<f64>) -> Result<f64> {
        let range = match range {
            Some(r) => Some(function.validate_range(r)?),
            None => None,
        };
        let reply = self.execute_query(Command::Measure(function, range)).await?;
        parse_reading(&reply)
    }

    pub async fn measure_dc_voltage(&mut self) -> Result<f64> {
        self.measure(Function::DcVoltage, None).await
    }

    pub async fn measure_dc_voltage_range(&mut self, range: f64) -> Result<f64> {
        self.measure(Function::DcVoltage, Some(range)).await
    }

    /// Triggers a reading with the current configuration.
    pub async fn read_value(&mut self) -> Result<f64> {
        let reply = self.execute_query(Command::Read).await?;
        parse_reading(&reply)
    }

    /// Sends a command verbatim and returns the raw response line.
    pub async fn query_raw(&mut self, cmd: impl AsRef<str>) -> Result<String> {
        self.execute_query(Command::Raw(cmd.as_ref().to_string()))
            .await
    }

    /// Sends a command verbatim without waiting for a response.
    pub async fn send_raw(&mut self, cmd: impl AsRef<str>) -> Result<()> {
        self.dev.send(cmd).await
    }
}
