use std::{io, time::Duration};

pub mod codec;
pub mod command;
pub mod config;
pub mod device;
pub mod response;
pub mod transport;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("Can't open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("Serial port is not open")]
    NotConnected,

    #[error("Serial port {port} is already open with a different configuration")]
    AlreadyOpen { port: String },

    #[error("No response within {:?}", _0)]
    Timeout(Duration),

    #[error("Can't write to the serial port: {:?}", _0)]
    Write(#[source] io::Error),

    #[error("I/O error: {:?}", _0)]
    Io(#[from] io::Error),

    #[error("Invalid argument: {}", _0)]
    InvalidArgument(String),

    #[error("Unexpected response: {}", _0)]
    Parse(String),

    #[error("Connection was closed")]
    Abort,
}

pub type Result<T> = std::result::Result<T, ProtoError>;
