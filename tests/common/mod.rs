//! Shared in-memory transport doubles and wire helpers for the
//! integration tests.

#![allow(dead_code)]

use std::{collections::VecDeque, io};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use grpcwire::{
    BincodeCodec, ChunkSource, Compressor, FrameDecoder, MessageCodec, ResponseSink, Status,
    frame::{DEFAULT_MAX_MESSAGE_SIZE, encode_frame},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    pub text: String,
}

impl EchoRequest {
    pub fn new(text: &str) -> Self {
        Self { text: text.into() }
    }
}

/// Request body replaying a fixed list of chunks, then signalling
/// end-of-body with empty chunks.
pub struct ScriptedBody {
    chunks: VecDeque<Bytes>,
}

impl ScriptedBody {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn whole(bytes: impl Into<Bytes>) -> Self {
        Self::new(vec![bytes.into()])
    }

    /// Split `bytes` into chunks of at most `chunk_size` bytes.
    pub fn split(bytes: &[u8], chunk_size: usize) -> Self {
        Self::new(bytes.chunks(chunk_size).map(Bytes::copy_from_slice).collect())
    }
}

#[async_trait]
impl ChunkSource for ScriptedBody {
    async fn next_chunk(&mut self) -> io::Result<Bytes> {
        Ok(self.chunks.pop_front().unwrap_or_else(Bytes::new))
    }
}

/// Response sink recording writes, flushes, and the trailer status.
#[derive(Default)]
pub struct RecordingSink {
    pub written: Vec<Bytes>,
    pub flushes: usize,
    pub trailers: Option<Status>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All written bytes concatenated, as a client would observe them.
    pub fn body(&self) -> Vec<u8> {
        self.written.iter().flat_map(|b| b.iter().copied()).collect()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn write(&mut self, bytes: Bytes) -> io::Result<()> {
        self.written.push(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn send_trailers(&mut self, status: &Status) {
        self.trailers = Some(status.clone());
    }
}

/// Frame one bincode-encoded message, optionally compressed.
pub fn frame_message<T>(value: &T, compressor: Option<&dyn Compressor>) -> Bytes
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let payload = BincodeCodec::<T>::new().encode_one(value).expect("encode");
    let mut dst = BytesMut::new();
    match compressor {
        Some(codec) if !codec.is_identity() => {
            let packed = codec.compress(&payload).expect("compress");
            encode_frame(&packed, true, &mut dst).expect("frame");
        }
        _ => encode_frame(&payload, false, &mut dst).expect("frame"),
    }
    dst.freeze()
}

/// Decode every frame of a response body back into typed messages.
pub fn decode_messages<T>(body: &[u8], compressor: &dyn Compressor) -> Vec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    let codec = BincodeCodec::<T>::new();
    let mut decoder = FrameDecoder::new(DEFAULT_MAX_MESSAGE_SIZE);
    decoder.feed(body);
    let mut out = Vec::new();
    while let Some(frame) = decoder.try_next().expect("well-formed response frame") {
        let payload = if frame.compressed {
            Bytes::from(compressor.decompress(&frame.payload).expect("decompress"))
        } else {
            frame.payload.clone()
        };
        out.push(codec.decode_one(&payload).expect("decode"));
    }
    assert!(decoder.is_empty(), "trailing bytes in response body");
    out
}
