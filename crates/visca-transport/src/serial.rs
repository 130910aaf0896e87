use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::BusTransport;

/// Line settings for a VISCA serial port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: PathBuf,
    /// Baud rate. VISCA devices default to 9600.
    pub baud_rate: u32,
    /// Initial read timeout. Overridden per byte by [`BusTransport::read_byte`].
    pub timeout: Duration,
}

impl SerialConfig {
    /// Default VISCA line speed.
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    /// Settings for `path` with the default line speed.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Longest timeout handed to the driver, the millisecond range of `poll(2)`.
const MAX_PORT_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

fn port_timeout(timeout: Duration) -> Duration {
    timeout.min(MAX_PORT_TIMEOUT)
}

/// Serial port transport (8N1, no flow control).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: PathBuf,
    timeout: Duration,
}

impl SerialTransport {
    /// Open the device with the default VISCA line settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(&SerialConfig::new(path))
    }

    /// Open the device with explicit settings.
    ///
    /// Input already buffered by the driver is discarded so the first
    /// exchange does not pick up garbage from before we were attached.
    pub fn open_with_config(config: &SerialConfig) -> Result<Self> {
        let path_str = config.path.to_string_lossy().into_owned();
        let port = serialport::new(path_str, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(port_timeout(config.timeout))
            .open()
            .map_err(|e| TransportError::Open {
                path: config.path.clone(),
                source: e.into(),
            })?;

        port.clear(ClearBuffer::Input).map_err(|e| TransportError::Open {
            path: config.path.clone(),
            source: e.into(),
        })?;

        info!(path = ?config.path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            path: config.path.clone(),
            timeout: port_timeout(config.timeout),
        })
    }

    fn apply_timeout(&mut self, timeout: Duration) -> Result<()> {
        let timeout = port_timeout(timeout);
        if timeout != self.timeout {
            self.port
                .set_timeout(timeout)
                .map_err(|e| TransportError::from_io(e.into()))?;
            self.timeout = timeout;
        }
        Ok(())
    }
}

impl BusTransport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes).map_err(TransportError::from_io)?;
        self.port.flush().map_err(TransportError::from_io)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.apply_timeout(timeout)?;

        let mut buf = [0u8; 1];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }

    fn bytes_pending(&mut self) -> Result<bool> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| TransportError::from_io(e.into()))?;
        if pending > 0 {
            debug!(path = ?self.path, pending, "unread bytes waiting on serial port");
        }
        Ok(pending > 0)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish()
    }
}
