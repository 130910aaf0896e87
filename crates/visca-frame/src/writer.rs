use bytes::BytesMut;
use tracing::trace;
use visca_transport::BusTransport;

use crate::codec::{describe, encode_exchange, hex, Recipient, MAX_FRAME_LEN};
use crate::error::Result;

/// Writes complete frames to a [`BusTransport`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: BusTransport> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Encode and send a message to `recipient`.
    pub fn send(&mut self, recipient: Recipient, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_exchange(recipient, payload, &mut self.buf)?;

        trace!(frame = %hex(&self.buf), decoded = %describe(&self.buf), "sent");
        self.inner.write_all(&self.buf)?;
        Ok(())
    }
}
