//! Bus-wide housekeeping: address assignment and interface clear.

use tracing::info;
use visca_frame::BROADCAST_HEADER;
use visca_transport::BusTransport;

use crate::bus::BusController;
use crate::error::{BusError, Result};

/// Broadcast opcode that assigns consecutive addresses along the daisy chain.
pub const ADDRESS_SET: u8 = 0x30;

/// Broadcast payload that flushes every device's command buffers.
pub const IF_CLEAR_ALL: [u8; 3] = [0x01, 0x00, 0x01];

/// The only acceptable reply to [`IF_CLEAR_ALL`].
pub const IF_CLEAR_ALL_REPLY: [u8; 5] = [0x88, 0x01, 0x00, 0x01, 0xFF];

impl<T: BusTransport> BusController<T> {
    /// Assign addresses starting at [`BusConfig::first_address`](crate::BusConfig)
    /// and return how many devices answered.
    ///
    /// Every device takes the address it receives, increments it and passes
    /// the message on; the last one broadcasts the next free address back.
    /// Tracked sockets are forgotten once the new numbering is in place.
    pub fn enumerate_bus(&self) -> Result<u8> {
        let first = self.config().first_address;
        let reply = self.broadcast(&[ADDRESS_SET, first])?;
        let raw = reply.as_bytes();

        if raw.len() != 4 || raw[0] != BROADCAST_HEADER || raw[1] != ADDRESS_SET {
            return Err(BusError::Protocol(format!(
                "unexpected address set reply: {reply}"
            )));
        }

        let next = raw[2];
        let count = next.checked_sub(first).ok_or_else(|| {
            BusError::Protocol(format!(
                "address set returned {next}, below first address {first}"
            ))
        })?;
        if count == 0 {
            return Err(BusError::NoDevices);
        }

        self.reset_sockets();
        info!(count, first, "bus enumerated");
        Ok(count)
    }

    /// Broadcast an interface clear and confirm the echo.
    pub fn clear_all_interfaces(&self) -> Result<()> {
        let reply = self.broadcast(&IF_CLEAR_ALL)?;
        if reply.as_bytes() != IF_CLEAR_ALL_REPLY.as_slice() {
            return Err(BusError::Protocol(format!(
                "unexpected interface clear reply: {reply}"
            )));
        }

        self.reset_sockets();
        info!("interfaces cleared");
        Ok(())
    }
}
