use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};
use visca_frame::{FrameError, FrameReader, FrameWriter, MessageType, ParsedReply, Recipient};
use visca_transport::BusTransport;

use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::session::{SessionTable, SocketKey, SocketStatus};

/// Owns a VISCA bus and runs exchanges on it.
///
/// Every public operation takes the bus lock for its full duration, including
/// [`wait_for_completion`](Self::wait_for_completion): while one caller waits
/// for a completion, other exchanges queue behind it. Replies therefore always
/// belong to the exchange that is reading them.
pub struct BusController<T> {
    inner: Mutex<BusInner<T>>,
    config: BusConfig,
}

struct BusInner<T> {
    transport: T,
    session: SessionTable,
}

impl<T: BusTransport> BusController<T> {
    /// Take ownership of `transport` with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, BusConfig::default())
    }

    /// Take ownership of `transport` with explicit configuration.
    pub fn with_config(transport: T, config: BusConfig) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                transport,
                session: SessionTable::new(),
            }),
            config,
        }
    }

    /// Current controller configuration.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Send `payload` to `recipient` and return the single reply.
    ///
    /// A frame left over from an earlier exchange is read (and fed to the
    /// socket table) before writing. ACK and Completion replies update the
    /// socket table before they are returned.
    pub fn exchange(&self, recipient: Recipient, payload: &[u8]) -> Result<ParsedReply> {
        let read_timeout = self.config.read_timeout;
        let mut guard = self.lock();
        let BusInner { transport, session } = &mut *guard;

        if transport.bytes_pending()? {
            debug!("reading stale frame before write");
            if let Some(stale) = receive(transport, session, read_timeout)? {
                debug!(frame = %stale, "ignored stale frame");
            }
        }

        FrameWriter::new(&mut *transport).send(recipient, payload)?;

        let reply = receive(transport, session, read_timeout)?
            .ok_or(BusError::Timeout(read_timeout))?;
        debug!(%recipient, reply = %reply, "exchange complete");
        Ok(reply)
    }

    /// Send `payload` to every device.
    pub fn broadcast(&self, payload: &[u8]) -> Result<ParsedReply> {
        self.exchange(Recipient::Broadcast, payload)
    }

    /// Block until the command acknowledged by `ack` completes.
    ///
    /// `ack` must be the 3-byte ACK reply returned by [`exchange`](Self::exchange).
    /// Frames read while waiting are routed like any other reply, so a device
    /// error or network change ends the wait with that error.
    pub fn wait_for_completion(&self, ack: &ParsedReply, timeout: Duration) -> Result<()> {
        if ack.wire_size() != 3 || ack.message_type != MessageType::Ack {
            return Err(BusError::InvalidArgument(format!(
                "wait_for_completion expects an ACK reply, got {ack}"
            )));
        }

        let key = SocketKey::new(ack.sender, ack.socket);
        let read_timeout = self.config.read_timeout;
        let mut guard = self.lock();
        let BusInner { transport, session } = &mut *guard;

        session.consume_completion(key, timeout, |table, remaining| {
            receive(&mut *transport, table, remaining.min(read_timeout)).map(|_| ())
        })?;
        debug!(device = key.device, socket = key.socket, "command completed");
        Ok(())
    }

    /// State of a socket as currently tracked.
    pub fn socket_status(&self, device: u8, socket: u8) -> Option<SocketStatus> {
        self.lock().session.status(SocketKey::new(device, socket))
    }

    /// Forget every tracked socket.
    pub fn reset_sockets(&self) {
        self.lock().session.clear();
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .transport
    }

    fn lock(&self) -> MutexGuard<'_, BusInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for BusController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Read at most one frame and route it through the socket table.
fn receive<T: BusTransport>(
    transport: &mut T,
    session: &mut SessionTable,
    timeout: Duration,
) -> Result<Option<ParsedReply>> {
    let reply = match FrameReader::with_timeout(transport, timeout).read_frame() {
        Ok(Some(reply)) => reply,
        Ok(None) => return Ok(None),
        Err(FrameError::Device { sender, error }) => {
            if error.socket() != 0 {
                session.release(SocketKey::new(sender, error.socket()));
            }
            return Err(BusError::Device {
                device: sender,
                error,
            });
        }
        Err(err) => return Err(err.into()),
    };

    match session.observe(&reply) {
        Ok(()) => {}
        Err(err) if err.is_locally_recovered() => warn!(%err, "ignoring reply"),
        Err(err) => return Err(err),
    }
    Ok(Some(reply))
}
