use std::str::FromStr;

use super::ProtoError;

/// Value the meter reports when its display reads "OL".
pub const OVERLOAD: f64 = 9.9e37;

pub fn is_overload(value: f64) -> bool {
    value.abs() >= OVERLOAD
}

/// Parses a numeric reading such as `+1.234500E+00`.
pub fn parse_reading(line: &str) -> Result<f64, ProtoError> {
    let line = line.trim();
    line.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProtoError::Parse(format!("Expected a number, got {:?}", line)))
}

/// Identification returned by `*IDN?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl Ident {
    /// `false` if the meter runs in Fluke 45 emulation mode.
    pub fn is_native_mode(&self) -> bool {
        self.model == "8845A" || self.model == "8846A"
    }
}

impl FromStr for Ident {
    type Err = ProtoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let values: Vec<&str> = value.split(',').map(str::trim).collect();
        if values.len() == 4 {
            Ok(Self {
                manufacturer: String::from(values[0]),
                model: String::from(values[1]),
                serial: String::from(values[2]),
                firmware: String::from(values[3]),
            })
        } else {
            Err(ProtoError::Parse(format!(
                "Invalid data for ID response: {}",
                value
            )))
        }
    }
}

/// One entry of the instrument's error queue, e.g. `+0,"No error"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemError {
    pub code: i32,
    pub message: String,
}

impl SystemError {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl FromStr for SystemError {
    type Err = ProtoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtoError::Parse(format!("Invalid data for SYST:ERR? response: {}", value));
        let (code, message) = value.split_once(',').ok_or_else(invalid)?;
        let code = code.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self {
            code,
            message: message.trim().trim_matches('"').to_string(),
        })
    }
}
