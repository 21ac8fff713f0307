#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser};
use std::io::ErrorKind;
use std::process::exit;
use std::time::Duration;

use f8845ctrl::device::GOOD_ID_RESPONSE;
use f8845ctrl::proto::response::is_overload;
use f8845ctrl::proto::transport::available_ports;
use f8845ctrl::{
    DeviceConfig, Function, Multimeter, ProtoError, Result, DEFAULT_BAUDRATE, DEFAULT_TTY,
};

const DEFAULT_TIMEOUT_SECS: &str = "5";

#[tokio::main]
async fn main() {
    let matches = command!() // requires `cargo` feature
        .arg(
            arg!(
                -p --device <PORT> "Serial port of the meter"
            )
            .default_value(DEFAULT_TTY)
            .required(false),
        )
        .arg(arg!(
            -d --debug ... "Turn debugging information on"
        ))
        .arg(
            arg!(
                -b --baudrate <BAUDRATE> "Baudrate"
            )
            .default_value(DEFAULT_BAUDRATE.to_string())
            .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(
                -t --timeout <SECONDS> "Time to wait for a response"
            )
            .default_value(DEFAULT_TIMEOUT_SECS)
            .value_parser(value_parser!(f64)),
        )
        .subcommand(clap::Command::new("ports").about("List serial ports"))
        .subcommand(clap::Command::new("ident").about("Device identification"))
        .subcommand(clap::Command::new("errors").about("Read the error queue"))
        .subcommand(clap::Command::new("clear").about("Clear status and error queue"))
        .subcommand(clap::Command::new("reset").about("Reset device"))
        .subcommand(clap::Command::new("remote").about("Enter remote mode"))
        .subcommand(clap::Command::new("local").about("Return to front panel control"))
        .subcommand(clap::Command::new("function").about("Currently selected function"))
        .subcommand(
            clap::Command::new("configure")
                .about("Select function and range")
                .arg(arg!(<function> "Measurement function").value_parser(value_parser!(Function)))
                .arg(arg!([range] "Fixed range, autorange if omitted").value_parser(value_parser!(f64))),
        )
        .subcommand(
            clap::Command::new("measure")
                .alias("mea")
                .about("Take a single measurement")
                .arg(
                    arg!([function] "Measurement function")
                        .value_parser(value_parser!(Function))
                        .default_value("DC_VOLTAGE"),
                )
                .arg(arg!([range] "Fixed range, autorange if omitted").value_parser(value_parser!(f64))),
        )
        .subcommand(clap::Command::new("read").about("Trigger a reading with the current setup"))
        .subcommand(
            clap::Command::new("query")
                .about("Send a raw command and print the response")
                .arg(arg!(<command> "Command line")),
        )
        .subcommand(
            clap::Command::new("send")
                .about("Send a raw command")
                .arg(arg!(<command> "Command line")),
        )
        .subcommand_required(true)
        .get_matches();

    init_logging(matches.get_count("debug"));

    let port = matches
        .get_one::<String>("device")
        .cloned()
        .unwrap_or_else(|| DEFAULT_TTY.to_string());

    if let Err(e) = handle_args(&matches, &port).await {
        match e {
            ProtoError::Connection { source, .. } => {
                if source.kind() == tokio_serial::ErrorKind::NoDevice
                    || matches!(source.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                {
                    eprintln!("{}: File not found", port);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", source, port);
                }
            }
            ProtoError::Io(err) | ProtoError::Write(err) => {
                eprintln!("I/O Error: {} [device: {}]", err, port);
            }
            ProtoError::Timeout(t) => {
                eprintln!("Device did not respond within {:?}, is it connected and in remote mode?", t);
            }
            ProtoError::InvalidArgument(msg) => {
                eprintln!("{}", msg);
            }
            ProtoError::Parse(msg) => {
                eprintln!("Received an unexpected response from device, aborting!: {}", msg);
            }
            ProtoError::NotConnected | ProtoError::AlreadyOpen { .. } | ProtoError::Abort => {
                eprintln!("Failed to communicate with device, aborting!");
            }
        }
        exit(-1);
    }
}

fn init_logging(level: u8) {
    let filter = match level {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

async fn handle_args(matches: &clap::ArgMatches, port: &str) -> Result<()> {
    if let Some(("ports", _)) = matches.subcommand() {
        let ports = available_ports().map_err(|source| ProtoError::Connection {
            port: port.to_string(),
            source,
        })?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for p in ports {
            println!("{}", p.port_name);
        }
        return Ok(());
    }

    let baud_rate = matches
        .get_one::<u32>("baudrate")
        .copied()
        .unwrap_or(DEFAULT_BAUDRATE);
    let timeout = matches.get_one::<f64>("timeout").copied().unwrap_or(5.0);
    if !timeout.is_finite() || timeout <= 0.0 {
        return Err(ProtoError::InvalidArgument(format!(
            "Invalid timeout: {}",
            timeout
        )));
    }

    let config = DeviceConfig::new(port, baud_rate).timeout(Duration::from_secs_f64(timeout));
    let mut dmm = Multimeter::new(config)?;

    eprintln!("Connected to: {}\n", port);

    match matches.subcommand() {
        // Device ID
        Some(("ident", _)) => {
            let ident = dmm.ident().await?;
            println!("Manufacturer: {}", ident.manufacturer);
            println!("Model: {}", ident.model);
            println!("Serial: {}", ident.serial);
            println!("Firmware: {}", ident.firmware);
            if !ident.is_native_mode() {
                eprintln!(
                    "The meter is in the wrong mode (Fluke {} emulation), expected {}",
                    ident.model, GOOD_ID_RESPONSE
                );
            }
        }
        // Error queue
        Some(("errors", _)) => loop {
            let err = dmm.errors().await?;
            if err.is_ok() {
                println!("No error");
                break;
            }
            println!("{:+}: {}", err.code, err.message);
        },
        Some(("clear", _)) => {
            dmm.clear_errors().await?;
            println!("OK");
        }
        Some(("reset", _)) => {
            dmm.reset().await?;
            println!("OK");
        }
        Some(("remote", _)) => {
            dmm.remote().await?;
            println!("OK");
        }
        Some(("local", _)) => {
            dmm.local().await?;
            println!("OK");
        }
        Some(("function", _)) => {
            let function = dmm.function().await?;
            println!("Function: {}", function);
        }
        Some(("configure", args)) => {
            if let Some(function) = args.get_one::<Function>("function") {
                match args.get_one::<f64>("range") {
                    Some(range) => dmm.set_range(*range, *function).await?,
                    None => dmm.configure(*function).await?,
                }
                println!("OK");
            }
        }
        Some(("measure", args)) => {
            let function = args
                .get_one::<Function>("function")
                .copied()
                .unwrap_or(Function::DcVoltage);
            let range = args.get_one::<f64>("range").copied();
            dmm.remote().await?;
            let value = dmm.measure(function, range).await?;
            print_reading(value, function.unit());
        }
        Some(("read", _)) => {
            let value = dmm.read_value().await?;
            print_reading(value, "");
        }
        Some(("query", args)) => {
            if let Some(cmd) = args.get_one::<String>("command") {
                println!("{}", dmm.query_raw(cmd).await?);
            }
        }
        Some(("send", args)) => {
            if let Some(cmd) = args.get_one::<String>("command") {
                dmm.send_raw(cmd).await?;
                println!("OK");
            }
        }
        _ => {
            eprintln!("Unknown command");
        }
    }

    dmm.close();
    Ok(())
}

fn print_reading(value: f64, unit: &str) {
    if is_overload(value) {
        println!("OL {}", unit);
    } else {
        println!("{} {}", value, unit);
    }
}
