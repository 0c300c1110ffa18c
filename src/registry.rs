//! Service registration, path dispatch, and the engine composing the
//! per-call pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::{
    codec::MessageCodec,
    compression::Compressor,
    frame::DEFAULT_MAX_MESSAGE_SIZE,
    rpc::{
        CallParts, ClientStreamHandler, ServerStreamHandler, UnaryHandler, serve_client_streaming,
        serve_server_streaming, serve_unary,
    },
    status::StatusReporter,
    transport::{ChunkSource, ResponseHead, ResponseSink},
};

/// Immutable (service, method) pair used as a routing and
/// codec-selection key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcIdentity {
    service: String,
    method: String,
}

impl RpcIdentity {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Wire path this RPC is addressed by.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Type-erased per-call driver stored behind a registered path.
#[async_trait]
trait CallHandler: Send + Sync {
    async fn handle(
        &self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ResponseSink,
        reporter: &StatusReporter,
        max_message_size: usize,
    );
}

struct UnaryRoute<Req, Resp> {
    compressor: Arc<dyn Compressor>,
    req_codec: Arc<dyn MessageCodec<Req>>,
    resp_codec: Arc<dyn MessageCodec<Resp>>,
    handler: Arc<dyn UnaryHandler<Req, Resp>>,
}

#[async_trait]
impl<Req, Resp> CallHandler for UnaryRoute<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn handle(
        &self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ResponseSink,
        reporter: &StatusReporter,
        max_message_size: usize,
    ) {
        let parts = CallParts {
            source,
            sink,
            compressor: &*self.compressor,
            max_message_size,
        };
        serve_unary(
            parts,
            reporter,
            &*self.req_codec,
            &*self.resp_codec,
            &*self.handler,
        )
        .await;
    }
}

struct ServerStreamRoute<Req, Resp> {
    compressor: Arc<dyn Compressor>,
    req_codec: Arc<dyn MessageCodec<Req>>,
    resp_codec: Arc<dyn MessageCodec<Resp>>,
    handler: Arc<dyn ServerStreamHandler<Req, Resp>>,
}

#[async_trait]
impl<Req, Resp> CallHandler for ServerStreamRoute<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn handle(
        &self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ResponseSink,
        reporter: &StatusReporter,
        max_message_size: usize,
    ) {
        let parts = CallParts {
            source,
            sink,
            compressor: &*self.compressor,
            max_message_size,
        };
        serve_server_streaming(
            parts,
            reporter,
            &*self.req_codec,
            &*self.resp_codec,
            &*self.handler,
        )
        .await;
    }
}

struct ClientStreamRoute<Req> {
    compressor: Arc<dyn Compressor>,
    req_codec: Arc<dyn MessageCodec<Req>>,
    handler: Arc<dyn ClientStreamHandler<Req>>,
}

#[async_trait]
impl<Req> CallHandler for ClientStreamRoute<Req>
where
    Req: Send + 'static,
{
    async fn handle(
        &self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ResponseSink,
        reporter: &StatusReporter,
        max_message_size: usize,
    ) {
        let parts = CallParts {
            source,
            sink,
            compressor: &*self.compressor,
            max_message_size,
        };
        serve_client_streaming(parts, reporter, &*self.req_codec, &*self.handler).await;
    }
}

struct Registration {
    path: String,
    call: Box<dyn CallHandler>,
}

/// Ordered list of (path, handler) registrations.
///
/// Lookup is a linear scan in registration order; the first match wins.
/// Registrations are immutable once added and consulted read-only per
/// incoming request.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unary RPC.
    #[must_use]
    pub fn unary<Req, Resp>(
        mut self,
        identity: &RpcIdentity,
        compressor: Arc<dyn Compressor>,
        req_codec: Arc<dyn MessageCodec<Req>>,
        resp_codec: Arc<dyn MessageCodec<Resp>>,
        handler: Arc<dyn UnaryHandler<Req, Resp>>,
    ) -> Self
    where
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        self.entries.push(Registration {
            path: identity.path(),
            call: Box::new(UnaryRoute {
                compressor,
                req_codec,
                resp_codec,
                handler,
            }),
        });
        self
    }

    /// Register a server-streaming RPC.
    #[must_use]
    pub fn server_streaming<Req, Resp>(
        mut self,
        identity: &RpcIdentity,
        compressor: Arc<dyn Compressor>,
        req_codec: Arc<dyn MessageCodec<Req>>,
        resp_codec: Arc<dyn MessageCodec<Resp>>,
        handler: Arc<dyn ServerStreamHandler<Req, Resp>>,
    ) -> Self
    where
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        self.entries.push(Registration {
            path: identity.path(),
            call: Box::new(ServerStreamRoute {
                compressor,
                req_codec,
                resp_codec,
                handler,
            }),
        });
        self
    }

    /// Register a client-streaming RPC.
    #[must_use]
    pub fn client_streaming<Req>(
        mut self,
        identity: &RpcIdentity,
        compressor: Arc<dyn Compressor>,
        req_codec: Arc<dyn MessageCodec<Req>>,
        handler: Arc<dyn ClientStreamHandler<Req>>,
    ) -> Self
    where
        Req: Send + 'static,
    {
        self.entries.push(Registration {
            path: identity.path(),
            call: Box::new(ClientStreamRoute {
                compressor,
                req_codec,
                handler,
            }),
        });
        self
    }

    fn find(&self, path: &str) -> Option<&Registration> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of dispatching one request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A registered handler ran; trailers carry the call status.
    Handled,
    /// No registration matched; no handler was invoked.
    NotFound,
}

impl Dispatch {
    /// HTTP-level metadata the transport should emit for this outcome.
    #[must_use]
    pub const fn response_head(self) -> ResponseHead {
        match self {
            Self::Handled => ResponseHead::grpc(),
            Self::NotFound => ResponseHead::not_found(),
        }
    }
}

/// Protocol engine: a registry plus the per-call plumbing.
pub struct Engine {
    registry: Registry,
    max_recv_message_size: usize,
}

impl Engine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            registry: Registry::new(),
            max_recv_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Serve one call end to end.
    ///
    /// Unknown paths return [`Dispatch::NotFound`] without invoking any
    /// handler. For recognized paths the call runs to completion or
    /// failure, and the reporter's final status is handed to the sink's
    /// trailer operation exactly once.
    pub async fn serve(
        &self,
        path: &str,
        source: &mut dyn ChunkSource,
        sink: &mut dyn ResponseSink,
    ) -> Dispatch {
        let Some(entry) = self.registry.find(path) else {
            debug!("no handler registered for {path}");
            return Dispatch::NotFound;
        };
        let reporter = StatusReporter::new();
        entry
            .call
            .handle(source, sink, &reporter, self.max_recv_message_size)
            .await;
        sink.send_trailers(&reporter.final_status());
        Dispatch::Handled
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    registry: Registry,
    max_recv_message_size: usize,
}

impl EngineBuilder {
    /// Replace the service registry.
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Cap the declared length of a single inbound message. Defaults to
    /// [`DEFAULT_MAX_MESSAGE_SIZE`].
    #[must_use]
    pub fn max_recv_message_size(mut self, limit: usize) -> Self {
        self.max_recv_message_size = limit;
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        Engine {
            registry: self.registry,
            max_recv_message_size: self.max_recv_message_size,
        }
    }
}
