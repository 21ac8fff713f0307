//!
//! This library provides line-oriented communication with serial instruments
//! and a command set for the Fluke 8845A digital multimeter.
//!
//! <br>
//!
//! # Details
//!
//! - The meter must run in its native 8845A mode (not Fluke 45 emulation)
//!   with the RS-232 port set to "computer" mode.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use f8845ctrl::{DeviceConfig, Multimeter};
//!   #[tokio::main]
//!   async fn main() -> f8845ctrl::Result<()> {
//!       let mut dmm = Multimeter::new(DeviceConfig::new("/dev/ttyUSB0", 19200))?;
//!       eprintln!("Connected to: {}\n", dmm.ident().await?.model);
//!       println!("{} V DC", dmm.measure_dc_voltage().await?);
//!       Ok(())
//!   }
//!   ```
//!
//! - Any other line-oriented instrument can be driven through
//!   [`SerialDevice`](proto::device::SerialDevice) directly.
//!
//! # Supported devices
//!
//!  * Fluke 8845A
//!  * Fluke 8846A
//!

pub mod device;
pub mod proto;

pub use device::Multimeter;
pub use proto::command::Function;
pub use proto::config::DeviceConfig;
pub use proto::device::SerialDevice;
pub use proto::{ProtoError, Result};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default Baudrate for Fluke 8845A and 8846A.
pub const DEFAULT_BAUDRATE: u32 = 19200;
