use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use visca_bus::{BusConfig, BusController, Inquiry};
use visca_frame::DeviceAddress;
use visca_transport::SerialTransport;

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod clear;
pub mod enumerate;
pub mod inquire;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assign addresses along the daisy chain and report the device count.
    Enumerate(EnumerateArgs),
    /// Flush the command buffers of every device.
    Clear,
    /// Send one raw message and print the reply.
    Send(SendArgs),
    /// Query a device.
    Inquire(InquireArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Where and how to reach the bus.
#[derive(Debug, Clone)]
pub struct BusOptions {
    pub port: PathBuf,
    pub read_timeout: Duration,
}

impl BusOptions {
    pub fn open(&self, config: BusConfig) -> CliResult<BusController<SerialTransport>> {
        let transport = SerialTransport::open(&self.port)
            .map_err(|err| transport_error("open failed", err))?;
        Ok(BusController::with_config(
            transport,
            BusConfig {
                read_timeout: self.read_timeout,
                ..config
            },
        ))
    }
}

pub fn run(command: Command, bus: &BusOptions, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Enumerate(args) => enumerate::run(args, bus, format),
        Command::Clear => clear::run(bus),
        Command::Send(args) => send::run(args, bus, format),
        Command::Inquire(args) => inquire::run(args, bus, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EnumerateArgs {
    /// Address given to the first device on the chain.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=7))]
    pub first_address: u8,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Target device address.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(u8).range(1..=7),
          required_unless_present = "broadcast", conflicts_with = "broadcast")]
    pub device: Option<u8>,
    /// Send to every device instead of one.
    #[arg(long)]
    pub broadcast: bool,
    /// Message bytes in hex, without header and terminator (e.g. "01 04 00 02").
    #[arg(long)]
    pub hex: String,
    /// Wait for the command to complete after it is acknowledged.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for completion when --wait is set (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct InquireArgs {
    /// Target device address.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(u8).range(1..=7))]
    pub device: u8,
    /// What to ask.
    pub what: InquiryKind,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InquiryKind {
    Power,
    Zoom,
    Version,
    CameraId,
    VideoSystem,
    PanTilt,
}

impl InquiryKind {
    pub fn inquiry(self) -> Inquiry {
        match self {
            InquiryKind::Power => Inquiry::Power,
            InquiryKind::Zoom => Inquiry::ZoomPosition,
            InquiryKind::Version => Inquiry::Version,
            InquiryKind::CameraId => Inquiry::CameraId,
            InquiryKind::VideoSystem => Inquiry::VideoSystem,
            InquiryKind::PanTilt => Inquiry::PanTiltPosition,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InquiryKind::Power => "power",
            InquiryKind::Zoom => "zoom",
            InquiryKind::Version => "version",
            InquiryKind::CameraId => "camera-id",
            InquiryKind::VideoSystem => "video-system",
            InquiryKind::PanTilt => "pan-tilt",
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn device_address(id: u8) -> CliResult<DeviceAddress> {
    DeviceAddress::new(id).map_err(|err| CliError::new(USAGE, format!("--device: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
