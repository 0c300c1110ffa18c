//! Server-side gRPC protocol engine over a pluggable HTTP/2 transport.
//!
//! This crate turns raw, chunked request bodies into typed protocol
//! messages, dispatches them to unary, server-streaming, or
//! client-streaming handlers, and turns handler outputs back into
//! framed, optionally compressed wire bytes plus a terminal status
//! trailer. The transport, message codecs, and compression codecs are
//! collaborators supplied by the embedder.

pub mod codec;
pub mod compression;
pub mod frame;
pub mod pump;
pub mod registry;
pub mod rpc;
pub mod status;
pub mod transport;

pub use codec::{BincodeCodec, BoxError, MessageCodec};
pub use compression::{Compressor, Gzip, Identity, select_compressor};
pub use frame::{DEFAULT_MAX_MESSAGE_SIZE, FRAME_HEADER_LEN, FrameDecoder, FrameError, WireFrame};
pub use pump::MessagePump;
pub use registry::{Dispatch, Engine, EngineBuilder, Registry, RpcIdentity};
pub use rpc::{ClientStreamHandler, ResponseStream, ServerStreamHandler, UnaryHandler};
pub use status::{Code, Status, StatusReporter};
pub use transport::{
    CONTENT_TYPE_GRPC, ChunkSource, GRPC_MESSAGE, GRPC_STATUS, ResponseHead, ResponseSink,
};
