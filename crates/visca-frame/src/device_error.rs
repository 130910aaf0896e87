/// Structured form of a device error reply (`y0 6s cc FF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The message could not be parsed by the device.
    #[error("syntax error")]
    SyntaxError,
    /// The device cannot queue another command.
    #[error("command buffer full")]
    CommandBufferFull,
    /// The command in `socket` was canceled.
    #[error("command canceled on socket {socket}")]
    CommandCanceled { socket: u8 },
    /// The referenced socket does not exist or is idle.
    #[error("invalid socket {socket}")]
    InvalidSocket { socket: u8 },
    /// The command cannot run in the device's current state.
    #[error("command not currently executable on socket {socket}")]
    CommandNotExecutable { socket: u8 },
    /// Any code not covered above.
    #[error("code=0x{code:02x} socket={socket}")]
    Unknown { code: u8, socket: u8 },
}

impl DeviceError {
    /// Raw error code byte.
    pub fn code(&self) -> u8 {
        match self {
            DeviceError::SyntaxError => 0x02,
            DeviceError::CommandBufferFull => 0x03,
            DeviceError::CommandCanceled { .. } => 0x04,
            DeviceError::InvalidSocket { .. } => 0x05,
            DeviceError::CommandNotExecutable { .. } => 0x41,
            DeviceError::Unknown { code, .. } => *code,
        }
    }

    /// Socket the error refers to. Syntax and buffer errors always report 0.
    pub fn socket(&self) -> u8 {
        match self {
            DeviceError::SyntaxError | DeviceError::CommandBufferFull => 0,
            DeviceError::CommandCanceled { socket }
            | DeviceError::InvalidSocket { socket }
            | DeviceError::CommandNotExecutable { socket }
            | DeviceError::Unknown { socket, .. } => *socket,
        }
    }
}

/// Map the socket nibble and code byte of an error reply.
///
/// Syntax error and buffer full are only recognised on socket 0; on any other
/// socket those codes fall through to [`DeviceError::Unknown`].
pub fn decode_device_error(socket: u8, code: u8) -> DeviceError {
    match (code, socket) {
        (0x02, 0) => DeviceError::SyntaxError,
        (0x03, 0) => DeviceError::CommandBufferFull,
        (0x04, socket) => DeviceError::CommandCanceled { socket },
        (0x05, socket) => DeviceError::InvalidSocket { socket },
        (0x41, socket) => DeviceError::CommandNotExecutable { socket },
        (code, socket) => DeviceError::Unknown { code, socket },
    }
}
