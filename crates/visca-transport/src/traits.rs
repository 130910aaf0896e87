use std::time::Duration;

use crate::error::Result;

/// A half-duplex byte pipe to a VISCA bus.
///
/// Implementations own the physical link. The controller holds exactly one
/// transport and never shares it, so methods take `&mut self`.
pub trait BusTransport: Send {
    /// Write every byte of `bytes` to the bus.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read a single byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time (or the stream ended).
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Returns true if unread bytes are waiting in the input buffer.
    fn bytes_pending(&mut self) -> Result<bool>;
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn bytes_pending(&mut self) -> Result<bool> {
        (**self).bytes_pending()
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn bytes_pending(&mut self) -> Result<bool> {
        (**self).bytes_pending()
    }
}
