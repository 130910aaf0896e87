use std::fmt;
use std::io;

use visca_bus::BusError;
use visca_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { path, source } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn bus_error(context: &str, err: BusError) -> CliError {
    match err {
        BusError::Transport(err) => transport_error(context, err),
        BusError::TransportUnavailable => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        BusError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        BusError::PayloadTooLarge { .. } | BusError::InvalidArgument(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        BusError::ProtocolFraming(_)
        | BusError::InvalidEncoding
        | BusError::Protocol(_)
        | BusError::DuplicateAck { .. }
        | BusError::UnexpectedCompletion { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        BusError::Device { .. } | BusError::NetworkChange | BusError::NoDevices => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use visca_frame::DeviceError;

    use super::*;

    #[test]
    fn bus_errors_map_to_exit_codes() {
        let cases = [
            (BusError::Timeout(Duration::from_secs(1)), TIMEOUT),
            (BusError::TransportUnavailable, TRANSPORT_ERROR),
            (BusError::InvalidArgument("x".into()), USAGE),
            (BusError::ProtocolFraming("x".into()), DATA_INVALID),
            (BusError::NoDevices, FAILURE),
            (
                BusError::Device {
                    device: 1,
                    error: DeviceError::SyntaxError,
                },
                FAILURE,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(bus_error("ctx", err).code, code);
        }
    }

    #[test]
    fn open_failure_names_the_port() {
        let err = transport_error(
            "open failed",
            TransportError::Open {
                path: PathBuf::from("/dev/ttyUSB9"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.contains("/dev/ttyUSB9"));

        let err = transport_error(
            "open failed",
            TransportError::Open {
                path: PathBuf::from("/dev/ttyS0"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
