//! The per-call loop feeding request-body chunks to the frame decoder,
//! and the helpers that turn frames into typed messages and back.

use bytes::{Bytes, BytesMut};
use log::debug;

use crate::{
    codec::MessageCodec,
    compression::Compressor,
    frame::{FrameDecoder, WireFrame, encode_frame},
    status::Status,
    transport::ChunkSource,
};

pub(crate) const EARLY_BODY_END: &str = "early end of request body";

/// Drives a [`FrameDecoder`] against a pull-based chunk source for the
/// lifetime of one call.
///
/// Leftover bytes from a completed frame stay in the decoder and are
/// re-examined before any new chunk is pulled, so concatenated frames
/// arriving in one chunk are never lost or duplicated.
pub struct MessagePump<'a> {
    source: &'a mut dyn ChunkSource,
    decoder: FrameDecoder,
    exhausted: bool,
}

impl<'a> MessagePump<'a> {
    #[must_use]
    pub fn new(source: &'a mut dyn ChunkSource, max_message_size: usize) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(max_message_size),
            exhausted: false,
        }
    }

    /// Decode the next frame, pulling chunks as needed.
    ///
    /// `Ok(None)` means the body ended cleanly at a frame boundary; a
    /// client-stream body legitimately ends this way.
    ///
    /// # Errors
    ///
    /// Returns INTERNAL if the accumulated bytes are malformed or the
    /// body ends mid-frame.
    pub async fn next_frame(&mut self) -> Result<Option<WireFrame>, Status> {
        loop {
            match self.decoder.try_next() {
                Ok(Some(frame)) => {
                    debug!(
                        "decoded frame: {} payload bytes, {} leftover",
                        frame.payload.len(),
                        self.decoder.buffered()
                    );
                    return Ok(Some(frame));
                }
                Ok(None) => {}
                Err(err) => return Err(Status::internal(err.to_string())),
            }
            if self.exhausted {
                return if self.decoder.is_empty() {
                    Ok(None)
                } else {
                    Err(Status::internal(EARLY_BODY_END))
                };
            }
            let chunk = self.source.next_chunk().await?;
            if chunk.is_empty() {
                self.exhausted = true;
            } else {
                self.decoder.feed(&chunk);
            }
        }
    }

    /// Decode exactly one frame; a body ending before a complete frame is
    /// an error.
    ///
    /// # Errors
    ///
    /// As [`next_frame`](Self::next_frame), plus INTERNAL when the body
    /// is exhausted before a frame completes.
    pub async fn expect_frame(&mut self) -> Result<WireFrame, Status> {
        self.next_frame()
            .await?
            .ok_or_else(|| Status::internal(EARLY_BODY_END))
    }

    /// True when previously pulled bytes remain undecoded.
    #[must_use]
    pub fn has_leftover(&self) -> bool {
        !self.decoder.is_empty()
    }
}

/// Turn a wire frame into a typed message via the call's compression
/// selector and the RPC's message codec.
///
/// # Errors
///
/// Returns INTERNAL on decompression or codec failure, or when a
/// compressed frame arrives on a call negotiated as identity.
pub fn open_frame<T>(
    frame: &WireFrame,
    compressor: &dyn Compressor,
    codec: &dyn MessageCodec<T>,
) -> Result<T, Status> {
    let payload = if frame.compressed {
        if compressor.is_identity() {
            return Err(Status::internal(
                "compressed frame on a call with identity encoding",
            ));
        }
        Bytes::from(
            compressor
                .decompress(&frame.payload)
                .map_err(|err| Status::internal(format!("failed to decompress message: {err}")))?,
        )
    } else {
        frame.payload.clone()
    };
    codec
        .decode_one(&payload)
        .map_err(|err| Status::internal(format!("failed to decode message: {err}")))
}

/// Encode, optionally compress, and frame one outbound message.
///
/// # Errors
///
/// Returns INTERNAL on codec, compression, or framing failure.
pub fn seal_frame<T>(
    value: &T,
    compressor: &dyn Compressor,
    codec: &dyn MessageCodec<T>,
) -> Result<Bytes, Status> {
    let payload = codec
        .encode_one(value)
        .map_err(|err| Status::internal(format!("failed to encode message: {err}")))?;
    let mut dst = BytesMut::new();
    let framed = if compressor.is_identity() {
        encode_frame(&payload, false, &mut dst)
    } else {
        let packed = compressor
            .compress(&payload)
            .map_err(|err| Status::internal(format!("failed to compress message: {err}")))?;
        encode_frame(&packed, true, &mut dst)
    };
    framed.map_err(|err| Status::internal(err.to_string()))?;
    Ok(dst.freeze())
}
