use crate::device_error::DeviceError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte sequence is not a well-formed frame.
    #[error("protocol framing error: {0}")]
    Framing(String),

    /// A nibble-packed integer had a nonzero high nibble.
    #[error("invalid nibble encoding")]
    InvalidEncoding,

    /// The message does not fit in a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A caller-supplied value is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A device answered with an error reply.
    #[error("device {sender} error: {error}")]
    Device { sender: u8, error: DeviceError },

    /// The bus topology changed; addresses must be reassigned.
    #[error("network change reported, bus must be re-enumerated")]
    NetworkChange,

    /// An error from the underlying transport.
    #[error("frame transport error: {0}")]
    Transport(#[from] visca_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
