use std::time::Duration;

use visca_frame::{DeviceError, FrameError};
use visca_transport::TransportError;

/// Errors that can occur in bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// A received byte sequence was not a well-formed frame.
    #[error("protocol framing error: {0}")]
    ProtocolFraming(String),

    /// A nibble-packed integer had a nonzero high nibble.
    #[error("invalid nibble encoding")]
    InvalidEncoding,

    /// The message does not fit in a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A well-formed reply had an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A device answered with an error reply.
    #[error("device {device} error: {error}")]
    Device { device: u8, error: DeviceError },

    /// The bus topology changed. Re-run enumeration before continuing.
    #[error("network change reported, bus must be re-enumerated")]
    NetworkChange,

    /// A device acknowledged a socket that is still running.
    #[error("duplicate ACK for device {device} socket {socket}")]
    DuplicateAck { device: u8, socket: u8 },

    /// A completion arrived for a socket that was never acknowledged.
    ///
    /// The controller logs and drops this; it never reaches callers.
    #[error("completion without ACK for device {device} socket {socket}")]
    UnexpectedCompletion { device: u8, socket: u8 },

    /// Nothing (or not the awaited completion) arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Address assignment found nobody on the bus.
    #[error("no devices on the bus")]
    NoDevices,

    /// A caller-supplied value is out of range or of the wrong kind.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport is closed or the device went away.
    #[error("transport unavailable")]
    TransportUnavailable,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl BusError {
    /// True for anomalies the controller absorbs instead of failing the call.
    pub fn is_locally_recovered(&self) -> bool {
        matches!(self, BusError::UnexpectedCompletion { .. })
    }
}

impl From<TransportError> for BusError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable => BusError::TransportUnavailable,
            other => BusError::Transport(other),
        }
    }
}

impl From<FrameError> for BusError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Framing(msg) => BusError::ProtocolFraming(msg),
            FrameError::InvalidEncoding => BusError::InvalidEncoding,
            FrameError::PayloadTooLarge { size, max } => BusError::PayloadTooLarge { size, max },
            FrameError::InvalidArgument(msg) => BusError::InvalidArgument(msg),
            FrameError::Device { sender, error } => BusError::Device {
                device: sender,
                error,
            },
            FrameError::NetworkChange => BusError::NetworkChange,
            FrameError::Transport(err) => err.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BusError>;
