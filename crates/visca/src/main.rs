mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{BusOptions, Command};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "visca", version, about = "VISCA bus control CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Serial device the bus is attached to.
    #[arg(
        long,
        value_name = "PATH",
        env = "VISCA_PORT",
        default_value = "/dev/ttyUSB0",
        global = true
    )]
    port: PathBuf,

    /// How long to wait for each reply byte (e.g. 2s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "2s", global = true)]
    read_timeout: String,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::parse_duration(&cli.read_timeout).and_then(|read_timeout| {
        let bus = BusOptions {
            port: cli.port,
            read_timeout,
        };
        cmd::run(cli.command, &bus, format)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
