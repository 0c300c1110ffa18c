//! Interfaces the HTTP/2 transport supplies per call, and the gRPC
//! response metadata it is expected to emit.
//!
//! The engine never touches sockets. Each accepted request hands the
//! call one [`ChunkSource`] for the request body and one [`ResponseSink`]
//! for the response body and trailers; concurrency across calls is the
//! transport's concern.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;

use crate::status::Status;

/// Content type declared on every gRPC response.
pub const CONTENT_TYPE_GRPC: &str = "application/grpc";
/// Trailer carrying the integer status code.
pub const GRPC_STATUS: &str = "grpc-status";
/// Trailer carrying the status message.
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Pull-based source of request-body bytes.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next available chunk of the request body.
    ///
    /// An empty chunk signals end-of-body. Implementations may block
    /// awaiting transport I/O but must eventually return.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails while reading the body.
    async fn next_chunk(&mut self) -> io::Result<Bytes>;
}

/// Push-based sink for response-body bytes plus the trailer channel.
#[async_trait]
pub trait ResponseSink: Send {
    /// Queue response bytes for transmission. May block on backpressure.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the write.
    async fn write(&mut self, bytes: Bytes) -> io::Result<()>;

    /// Force queued response bytes out immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to flush.
    async fn flush(&mut self) -> io::Result<()>;

    /// Record the terminal status for trailer emission. Non-blocking;
    /// invoked by the engine with the reporter's final value.
    fn send_trailers(&mut self, status: &Status);
}

/// HTTP-level response metadata for a dispatched request.
///
/// The body-level status lives in the trailers; the HTTP status only
/// distinguishes recognized paths from unknown ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    pub http_status: u16,
    pub content_type: Option<&'static str>,
    /// Names announced in the `trailer` response header.
    pub trailer_names: &'static [&'static str],
}

impl ResponseHead {
    /// Metadata for a recognized gRPC path.
    #[must_use]
    pub const fn grpc() -> Self {
        Self {
            http_status: 200,
            content_type: Some(CONTENT_TYPE_GRPC),
            trailer_names: &[GRPC_STATUS, GRPC_MESSAGE],
        }
    }

    /// Metadata for an unrecognized path.
    #[must_use]
    pub const fn not_found() -> Self {
        Self {
            http_status: 404,
            content_type: None,
            trailer_names: &[],
        }
    }
}
