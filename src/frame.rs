//! gRPC wire framing: the five-byte message header and an incremental,
//! resumable frame decoder.
//!
//! Each message on the wire is `[1 byte compressed flag][4 bytes
//! big-endian length N][N bytes payload]`. Messages are not aligned with
//! transport read boundaries, so the decoder must be resumable across
//! arbitrarily small chunks, down to a single byte per read.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Bytes occupied by the compressed flag plus the length prefix.
pub const FRAME_HEADER_LEN: usize = 5;

/// Default cap on a single message payload (4 MiB), aligned with the
/// gRPC default maximum receive size.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Wire-level framing errors. Any of these fails the call with an
/// INTERNAL status carrying the error text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The compressed flag byte was neither 0 nor 1.
    #[error("invalid compressed flag {0:#04x}")]
    InvalidCompressedFlag(u8),
    /// The declared payload length exceeds the configured maximum.
    #[error("frame of {size} bytes exceeds maximum message size {max}")]
    Oversized {
        size: usize,
        max: usize,
    },
}

/// One complete frame: the compressed flag and the exact payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireFrame {
    pub compressed: bool,
    pub payload: Bytes,
}

/// Incremental frame decoder owning its accumulation buffer.
///
/// Created fresh per call and owned exclusively by that call's task.
/// After a completed frame, the buffer's unconsumed tail is the leftover
/// belonging to the next frame; it is re-examined by the next
/// [`try_next`](Self::try_next) before any new chunk is fed.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_message_size: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new(max_message_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_message_size,
        }
    }

    /// Append a chunk of body bytes to the accumulation buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Attempt to decode one complete frame from the buffered bytes.
    ///
    /// Returns `Ok(None)` when more bytes are needed; partially
    /// accumulated input is retained and the decoder must be re-invoked
    /// after the next [`feed`](Self::feed), not re-initialized.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the buffered bytes cannot form a valid
    /// frame.
    pub fn try_next(&mut self) -> Result<Option<WireFrame>, FrameError> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let compressed = match self.buf[0] {
            0 => false,
            1 => true,
            other => return Err(FrameError::InvalidCompressedFlag(other)),
        };
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        if len > self.max_message_size {
            return Err(FrameError::Oversized {
                size: len,
                max: self.max_message_size,
            });
        }
        if self.buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }
        self.buf.advance(FRAME_HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();
        Ok(Some(WireFrame { compressed, payload }))
    }

    /// True when no undecoded bytes remain buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of buffered bytes not yet consumed by a completed frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Append one framed message to `dst`.
///
/// # Errors
///
/// Returns [`FrameError::Oversized`] if the payload length does not fit
/// the four-byte length prefix.
pub fn encode_frame(payload: &[u8], compressed: bool, dst: &mut BytesMut) -> Result<(), FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::Oversized {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(FRAME_HEADER_LEN + payload.len());
    dst.put_u8(u8::from(compressed));
    dst.put_u32(len);
    dst.extend_from_slice(payload);
    Ok(())
}
