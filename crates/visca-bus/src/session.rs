//! Per-socket command lifecycle.
//!
//! A command sent to a device is acknowledged into one of its sockets (1-15)
//! and later reported complete on the same socket. The table remembers, per
//! `(device, socket)`, which of those two steps has been observed:
//!
//! ```text
//! Idle ──ACK──▶ Outstanding ──Completion──▶ Completed ──consume──▶ Idle
//! ```
//!
//! Socket 0 carries inquiry and broadcast replies and is never tracked.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use visca_frame::{MessageType, ParsedReply};

use crate::error::{BusError, Result};

/// Identity of one command slot on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketKey {
    /// Bus id of the device that owns the socket.
    pub device: u8,
    /// Socket number (1-15).
    pub socket: u8,
}

impl SocketKey {
    pub fn new(device: u8, socket: u8) -> Self {
        Self { device, socket }
    }
}

/// Lifecycle state of a tracked socket. Idle sockets have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    /// Acknowledged, completion not seen yet.
    Outstanding,
    /// Completion seen, not yet consumed by a waiter.
    Completed,
}

/// Map from socket identity to lifecycle state.
#[derive(Debug, Default)]
pub struct SessionTable {
    sockets: HashMap<SocketKey, SocketStatus>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `key`, `None` when idle.
    pub fn status(&self, key: SocketKey) -> Option<SocketStatus> {
        self.sockets.get(&key).copied()
    }

    /// Number of tracked sockets.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Feed a received reply. Only ACK and Completion on sockets 1-15 matter.
    pub fn observe(&mut self, reply: &ParsedReply) -> Result<()> {
        if reply.socket == 0 {
            return Ok(());
        }
        let key = SocketKey::new(reply.sender, reply.socket);
        match reply.message_type {
            MessageType::Ack => self.on_ack(key),
            MessageType::Completion => self.on_completion(key),
            _ => Ok(()),
        }
    }

    /// Record an acknowledgment.
    pub fn on_ack(&mut self, key: SocketKey) -> Result<()> {
        match self.status(key) {
            Some(SocketStatus::Outstanding) => {
                return Err(BusError::DuplicateAck {
                    device: key.device,
                    socket: key.socket,
                });
            }
            Some(SocketStatus::Completed) => {
                warn!(
                    device = key.device,
                    socket = key.socket,
                    "ACK for a socket whose earlier completion was never consumed; discarding it"
                );
            }
            None => {}
        }
        debug!(device = key.device, socket = key.socket, "socket outstanding");
        self.sockets.insert(key, SocketStatus::Outstanding);
        Ok(())
    }

    /// Record a completion.
    ///
    /// A completion without a preceding ACK yields
    /// [`BusError::UnexpectedCompletion`] and leaves the table untouched.
    pub fn on_completion(&mut self, key: SocketKey) -> Result<()> {
        match self.status(key) {
            Some(SocketStatus::Outstanding) => {
                debug!(device = key.device, socket = key.socket, "socket completed");
                self.sockets.insert(key, SocketStatus::Completed);
                Ok(())
            }
            _ => Err(BusError::UnexpectedCompletion {
                device: key.device,
                socket: key.socket,
            }),
        }
    }

    /// Remove `key` if its completion has been seen.
    pub fn take_completed(&mut self, key: SocketKey) -> bool {
        if self.status(key) == Some(SocketStatus::Completed) {
            self.sockets.remove(&key);
            true
        } else {
            false
        }
    }

    /// Forget `key` regardless of state, e.g. after the device canceled it.
    pub fn release(&mut self, key: SocketKey) -> Option<SocketStatus> {
        self.sockets.remove(&key)
    }

    /// Forget every socket.
    pub fn clear(&mut self) {
        self.sockets.clear();
    }

    /// Block until `key` completes, then return it to idle.
    ///
    /// `pump` is called with the remaining time whenever the completion has
    /// not been seen yet; it must receive at most one frame and feed it back
    /// into the table it is handed.
    pub fn consume_completion<F>(
        &mut self,
        key: SocketKey,
        timeout: Duration,
        mut pump: F,
    ) -> Result<()>
    where
        F: FnMut(&mut SessionTable, Duration) -> Result<()>,
    {
        if self.status(key).is_none() {
            return Err(BusError::InvalidArgument(format!(
                "no command outstanding on device {} socket {}",
                key.device, key.socket
            )));
        }

        // A timeout too large to add to the clock means no deadline at all.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.take_completed(key) {
                return Ok(());
            }
            if self.status(key).is_none() {
                return Err(BusError::Protocol(format!(
                    "device {} socket {} released while waiting for completion",
                    key.device, key.socket
                )));
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(BusError::Timeout(timeout));
                    }
                    deadline - now
                }
                None => Duration::MAX,
            };
            pump(self, remaining)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use visca_frame::decode_frame;

    use super::*;

    const KEY: SocketKey = SocketKey {
        device: 1,
        socket: 1,
    };

    #[test]
    fn ack_then_completion_then_consume() {
        let mut table = SessionTable::new();

        table.observe(&decode_frame(&[0x90, 0x41, 0xFF]).unwrap()).unwrap();
        assert_eq!(table.status(KEY), Some(SocketStatus::Outstanding));

        table.observe(&decode_frame(&[0x90, 0x51, 0xFF]).unwrap()).unwrap();
        assert_eq!(table.status(KEY), Some(SocketStatus::Completed));

        table
            .consume_completion(KEY, Duration::from_millis(50), |_, _| {
                panic!("completion already recorded, no read expected")
            })
            .unwrap();
        assert_eq!(table.status(KEY), None);
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_ack_fails() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();
        let err = table.on_ack(KEY).unwrap_err();
        assert!(matches!(
            err,
            BusError::DuplicateAck {
                device: 1,
                socket: 1
            }
        ));
        assert_eq!(table.status(KEY), Some(SocketStatus::Outstanding));
    }

    #[test]
    fn ack_over_stale_completion_is_recovered() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();
        table.on_completion(KEY).unwrap();

        table.on_ack(KEY).unwrap();
        assert_eq!(table.status(KEY), Some(SocketStatus::Outstanding));
    }

    #[test]
    fn unmatched_completion_leaves_table_untouched() {
        let mut table = SessionTable::new();
        let err = table.on_completion(KEY).unwrap_err();
        assert!(err.is_locally_recovered());
        assert!(table.is_empty());

        table.on_ack(KEY).unwrap();
        table.on_completion(KEY).unwrap();
        let err = table.on_completion(KEY).unwrap_err();
        assert!(matches!(err, BusError::UnexpectedCompletion { .. }));
        assert_eq!(table.status(KEY), Some(SocketStatus::Completed));
    }

    #[test]
    fn socket_zero_is_never_tracked() {
        let mut table = SessionTable::new();
        table.observe(&decode_frame(&[0x90, 0x40, 0xFF]).unwrap()).unwrap();
        table.observe(&decode_frame(&[0x90, 0x50, 0x02, 0xFF]).unwrap()).unwrap();
        table.observe(&decode_frame(&[0x90, 0x50, 0xFF]).unwrap()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn keys_are_per_device() {
        let mut table = SessionTable::new();
        table.on_ack(SocketKey::new(1, 1)).unwrap();
        table.on_ack(SocketKey::new(2, 1)).unwrap();
        table.on_completion(SocketKey::new(2, 1)).unwrap();

        assert_eq!(
            table.status(SocketKey::new(1, 1)),
            Some(SocketStatus::Outstanding)
        );
        assert_eq!(
            table.status(SocketKey::new(2, 1)),
            Some(SocketStatus::Completed)
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn consume_pumps_until_completion() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();

        let mut calls = 0;
        table
            .consume_completion(KEY, Duration::from_secs(1), |table, remaining| {
                calls += 1;
                assert!(remaining <= Duration::from_secs(1));
                if calls == 3 {
                    table.on_completion(KEY)?;
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, 3);
        assert!(table.is_empty());
    }

    #[test]
    fn consume_times_out() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();

        let timeout = Duration::from_millis(30);
        let err = table
            .consume_completion(KEY, timeout, |_, remaining| {
                std::thread::sleep(remaining.min(Duration::from_millis(5)));
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, BusError::Timeout(t) if t == timeout));
        assert_eq!(table.status(KEY), Some(SocketStatus::Outstanding));
    }

    #[test]
    fn consume_accepts_unbounded_timeout() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();
        table.on_completion(KEY).unwrap();
        table
            .consume_completion(KEY, Duration::MAX, |_, _| {
                panic!("completion already recorded, no read expected")
            })
            .unwrap();
        assert!(table.is_empty());

        table.on_ack(KEY).unwrap();
        let mut pumped = None;
        table
            .consume_completion(KEY, Duration::MAX, |table, remaining| {
                pumped = Some(remaining);
                table.on_completion(KEY)
            })
            .unwrap();
        assert_eq!(pumped, Some(Duration::MAX));
        assert!(table.is_empty());
    }

    #[test]
    fn consume_rejects_idle_key() {
        let mut table = SessionTable::new();
        let err = table
            .consume_completion(KEY, Duration::from_millis(10), |_, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, BusError::InvalidArgument(_)));
    }

    #[test]
    fn consume_propagates_pump_errors() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();
        let err = table
            .consume_completion(KEY, Duration::from_secs(1), |_, _| {
                Err(BusError::NetworkChange)
            })
            .unwrap_err();
        assert!(matches!(err, BusError::NetworkChange));
    }

    #[test]
    fn consume_reports_released_socket() {
        let mut table = SessionTable::new();
        table.on_ack(KEY).unwrap();
        let err = table
            .consume_completion(KEY, Duration::from_secs(1), |table, _| {
                table.release(KEY);
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, BusError::Protocol(_)));
    }
}
