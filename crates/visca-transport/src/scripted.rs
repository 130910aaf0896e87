use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::BusTransport;

/// One observable interaction with a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// A complete write issued by the controller.
    Write(Vec<u8>),
    /// A single byte handed to the controller.
    Read(u8),
}

#[derive(Default)]
struct ScriptState {
    incoming: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    events: Vec<ScriptEvent>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<ScriptState>,
    ready: Condvar,
}

/// In-memory simulated bus.
///
/// Clones share the same state, so a test can keep one handle to feed
/// device traffic while the controller owns another.
///
/// - [`push_incoming`](Self::push_incoming) queues bytes that are readable immediately
///   (unsolicited traffic, e.g. a completion arriving later).
/// - [`push_reply`](Self::push_reply) queues a reply that becomes readable only after
///   the next write, the way a device answers a request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    shared: Arc<Shared>,
}

impl ScriptedTransport {
    /// Create an empty bus with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes that are readable right away.
    pub fn push_incoming(&self, bytes: &[u8]) {
        let mut state = self.lock();
        state.incoming.extend(bytes.iter().copied());
        self.shared.ready.notify_all();
    }

    /// Queue a reply released into the input stream on the next write.
    pub fn push_reply(&self, bytes: &[u8]) {
        self.lock().replies.push_back(bytes.to_vec());
    }

    /// Ordered log of every write and byte read so far.
    pub fn events(&self) -> Vec<ScriptEvent> {
        self.lock().events.clone()
    }

    /// Every frame the controller wrote, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                ScriptEvent::Write(bytes) => Some(bytes.clone()),
                ScriptEvent::Read(_) => None,
            })
            .collect()
    }

    /// Number of bytes queued and not yet read.
    pub fn unread_len(&self) -> usize {
        self.lock().incoming.len()
    }

    /// Simulate the device going away. Subsequent calls fail with
    /// [`TransportError::Unavailable`].
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusTransport for ScriptedTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Unavailable);
        }
        state.events.push(ScriptEvent::Write(bytes.to_vec()));
        if let Some(reply) = state.replies.pop_front() {
            trace!(len = reply.len(), "releasing scripted reply");
            state.incoming.extend(reply);
        }
        self.shared.ready.notify_all();
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(TransportError::Unavailable);
            }
            if let Some(byte) = state.incoming.pop_front() {
                state.events.push(ScriptEvent::Read(byte));
                return Ok(Some(byte));
            }
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    self.shared
                        .ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .shared
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn bytes_pending(&mut self) -> Result<bool> {
        let state = self.lock();
        if state.closed {
            return Err(TransportError::Unavailable);
        }
        Ok(!state.incoming.is_empty())
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ScriptedTransport")
            .field("unread", &state.incoming.len())
            .field("queued_replies", &state.replies.len())
            .field("closed", &state.closed)
            .finish()
    }
}
