use std::fmt;
use std::str::FromStr;

use super::ProtoError;

/// Measurement functions of the 8845A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    DcVoltage,
    AcVoltage,
    DcCurrent,
    AcCurrent,
    Resistance,
    FourWireResistance,
    Frequency,
    Period,
    Continuity,
    Diode,
}

const DC_VOLTAGE_RANGES: &[f64] = &[0.1, 1.0, 10.0, 100.0, 1000.0];
const AC_VOLTAGE_RANGES: &[f64] = &[0.1, 1.0, 10.0, 100.0, 750.0];
const CURRENT_RANGES: &[f64] = &[100e-6, 1e-3, 10e-3, 100e-3, 400e-3, 1.0, 3.0, 10.0];
const RESISTANCE_RANGES: &[f64] = &[10.0, 100.0, 1e3, 10e3, 100e3, 1e6, 10e6, 100e6];

impl Function {
    pub const ALL: [Function; 10] = [
        Function::DcVoltage,
        Function::AcVoltage,
        Function::DcCurrent,
        Function::AcCurrent,
        Function::Resistance,
        Function::FourWireResistance,
        Function::Frequency,
        Function::Period,
        Function::Continuity,
        Function::Diode,
    ];

    /// SCPI mnemonic used in `CONF` and `MEAS` commands.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Function::DcVoltage => "VOLT:DC",
            Function::AcVoltage => "VOLT:AC",
            Function::DcCurrent => "CURR:DC",
            Function::AcCurrent => "CURR:AC",
            Function::Resistance => "RES",
            Function::FourWireResistance => "FRES",
            Function::Frequency => "FREQ",
            Function::Period => "PER",
            Function::Continuity => "CONT",
            Function::Diode => "DIOD",
        }
    }

    /// Name accepted on the command line, e.g. `DC_VOLTAGE`.
    pub fn name(&self) -> &'static str {
        match self {
            Function::DcVoltage => "DC_VOLTAGE",
            Function::AcVoltage => "AC_VOLTAGE",
            Function::DcCurrent => "DC_CURRENT",
            Function::AcCurrent => "AC_CURRENT",
            Function::Resistance => "RESISTANCE",
            Function::FourWireResistance => "4W_RESISTANCE",
            Function::Frequency => "FREQUENCY",
            Function::Period => "PERIOD",
            Function::Continuity => "CONTINUITY",
            Function::Diode => "DIODE",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Function::DcVoltage | Function::AcVoltage | Function::Diode => "V",
            Function::DcCurrent | Function::AcCurrent => "A",
            Function::Resistance | Function::FourWireResistance | Function::Continuity => "Ohm",
            Function::Frequency => "Hz",
            Function::Period => "s",
        }
    }

    /// Fixed ranges the instrument accepts for this function. Empty if the
    /// function has no selectable range.
    pub fn ranges(&self) -> &'static [f64] {
        match self {
            Function::DcVoltage => DC_VOLTAGE_RANGES,
            Function::AcVoltage => AC_VOLTAGE_RANGES,
            Function::DcCurrent | Function::AcCurrent => CURRENT_RANGES,
            Function::Resistance | Function::FourWireResistance => RESISTANCE_RANGES,
            Function::Frequency | Function::Period | Function::Continuity | Function::Diode => &[],
        }
    }

    /// Maps `range` onto one of the accepted ranges.
    pub fn validate_range(&self, range: f64) -> Result<f64, ProtoError> {
        self.ranges()
            .iter()
            .copied()
            .find(|r| (range - r).abs() <= r * 1e-9)
            .ok_or_else(|| {
                if self.ranges().is_empty() {
                    ProtoError::InvalidArgument(format!("{} has no selectable range", self.name()))
                } else {
                    ProtoError::InvalidArgument(format!(
                        "{} is not a valid range for {} (expected one of {:?})",
                        range,
                        self.name(),
                        self.ranges()
                    ))
                }
            })
    }

    /// Parses the reply to `FUNC1?`, e.g. `"VOLT"` or `"CURR:AC"`.
    pub fn from_reply(reply: &str) -> Result<Function, ProtoError> {
        let reply = reply.trim().trim_matches('"').to_uppercase();
        let f = match reply.as_str() {
            "VOLT" | "VOLT:DC" => Function::DcVoltage,
            "VOLT:AC" => Function::AcVoltage,
            "CURR" | "CURR:DC" => Function::DcCurrent,
            "CURR:AC" => Function::AcCurrent,
            "RES" => Function::Resistance,
            "FRES" => Function::FourWireResistance,
            "FREQ" => Function::Frequency,
            "PER" => Function::Period,
            "CONT" => Function::Continuity,
            "DIOD" => Function::Diode,
            _ => return Err(ProtoError::Parse(format!("Unknown function: {:?}", reply))),
        };
        Ok(f)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Function {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_uppercase();
        Function::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| ProtoError::InvalidArgument(format!("Unknown function: {}", s)))
    }
}

/// What a command answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    None,
    Value,
    List,
}

/// Commands understood by the 8845A in its native SCPI mode.
///
/// Ranges carried by commands must have been validated with
/// [`Function::validate_range`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Id,
    Reset,
    ClearStatus,
    SystemError,
    Remote,
    Local,
    Configure(Function, Option<f64>),
    GetFunction,
    Measure(Function, Option<f64>),
    Read,
    Raw(String),
}

impl Command {
    pub fn shape(&self) -> ResponseShape {
        match self {
            Command::Reset
            | Command::ClearStatus
            | Command::Remote
            | Command::Local
            | Command::Configure(_, _) => ResponseShape::None,
            Command::SystemError => ResponseShape::List,
            Command::Id
            | Command::GetFunction
            | Command::Measure(_, _)
            | Command::Read
            | Command::Raw(_) => ResponseShape::Value,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Id => write!(f, "*IDN?"),
            Command::Reset => write!(f, "*RST"),
            Command::ClearStatus => write!(f, "*CLS"),
            Command::SystemError => write!(f, "SYST:ERR?"),
            Command::Remote => write!(f, "SYST:REM"),
            Command::Local => write!(f, "SYST:LOC"),
            Command::Configure(func, None) => write!(f, "CONF:{}", func.mnemonic()),
            Command::Configure(func, Some(range)) => {
                write!(f, "CONF:{} {}", func.mnemonic(), range)
            }
            Command::GetFunction => write!(f, "FUNC1?"),
            Command::Measure(func, None) => write!(f, "MEAS:{}?", func.mnemonic()),
            Command::Measure(func, Some(range)) => {
                write!(f, "MEAS:{}? {}", func.mnemonic(), range)
            }
            Command::Read => write!(f, "READ?"),
            Command::Raw(cmd) => f.write_str(cmd),
        }
    }
}
