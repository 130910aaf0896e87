use std::time::Duration;

use bytes::BytesMut;
use tracing::{trace, warn};
use visca_transport::BusTransport;

use crate::codec::{decode_frame, describe, hex, ParsedReply, MAX_FRAME_LEN, TERMINATOR};
use crate::error::Result;

/// Reads complete frames from a [`BusTransport`].
///
/// A frame ends at the first terminator or after [`MAX_FRAME_LEN`] bytes,
/// whichever comes first.
pub struct FrameReader<T> {
    inner: T,
    read_timeout: Duration,
}

impl<T: BusTransport> FrameReader<T> {
    /// Create a new frame reader with an explicit per-byte read timeout.
    pub fn with_timeout(inner: T, read_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// Returns `Ok(None)` when no byte arrives within the read timeout.
    pub fn read_frame(&mut self) -> Result<Option<ParsedReply>> {
        self.read_frame_within(self.read_timeout)
    }

    /// Read the next frame, waiting at most `timeout` for each byte.
    ///
    /// A frame cut short by a timeout is still handed to the decoder, which
    /// rejects it as unterminated.
    pub fn read_frame_within(&mut self, timeout: Duration) -> Result<Option<ParsedReply>> {
        let mut buf = BytesMut::with_capacity(MAX_FRAME_LEN);

        while buf.len() < MAX_FRAME_LEN {
            match self.inner.read_byte(timeout)? {
                Some(byte) => {
                    buf.extend_from_slice(&[byte]);
                    if byte == TERMINATOR {
                        break;
                    }
                }
                None if buf.is_empty() => return Ok(None),
                None => {
                    warn!(received = buf.len(), "timeout waiting for complete reply");
                    break;
                }
            }
        }

        trace!(frame = %hex(&buf), decoded = %describe(&buf), "recv");
        decode_frame(&buf).map(Some)
    }
}
