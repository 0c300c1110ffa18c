//! The three RPC call shapes and the adapters that drive them.
//!
//! Every call moves through receiving, invoking, replying, and
//! finalizing. The shapes share the receive mechanics of
//! [`MessagePump`]; they differ in how often user code runs and in what
//! happens after a decoded message. Failures from any stage unwind as a
//! [`Status`] to a single catch point per call, which feeds the
//! [`StatusReporter`]; no further writes are attempted after a failure.

use std::{future::Future, pin::Pin};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use log::{debug, warn};

use crate::{
    codec::MessageCodec,
    compression::Compressor,
    pump::{MessagePump, open_frame, seal_frame},
    status::{Status, StatusReporter},
    transport::{ChunkSource, ResponseSink},
};

/// Pull source of server-streaming outputs; `None` signals exhaustion.
pub type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

/// One request message in, one response message out.
#[async_trait]
pub trait UnaryHandler<Req, Resp>: Send + Sync {
    async fn call(&self, request: Req) -> Result<Resp, Status>;
}

/// One request message in, a pull source of response messages out.
#[async_trait]
pub trait ServerStreamHandler<Req, Resp>: Send + Sync {
    async fn call(&self, request: Req) -> Result<ResponseStream<Resp>, Status>;
}

/// Invoked once per decoded request message, in wire order. The handler
/// owns any accumulation and reply side effects; the adapter frames no
/// response on its behalf.
#[async_trait]
pub trait ClientStreamHandler<Req>: Send + Sync {
    async fn on_message(&self, message: Req) -> Result<(), Status>;
}

#[async_trait]
impl<Req, Resp, F, Fut> UnaryHandler<Req, Resp> for F
where
    Req: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, Status>> + Send,
{
    async fn call(&self, request: Req) -> Result<Resp, Status> {
        (self)(request).await
    }
}

#[async_trait]
impl<Req, Resp, F, Fut> ServerStreamHandler<Req, Resp> for F
where
    Req: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseStream<Resp>, Status>> + Send,
{
    async fn call(&self, request: Req) -> Result<ResponseStream<Resp>, Status> {
        (self)(request).await
    }
}

#[async_trait]
impl<Req, F, Fut> ClientStreamHandler<Req> for F
where
    Req: Send + 'static,
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Status>> + Send,
{
    async fn on_message(&self, message: Req) -> Result<(), Status> {
        (self)(message).await
    }
}

/// Shared per-call collaborators handed down from the registry.
pub(crate) struct CallParts<'a> {
    pub source: &'a mut dyn ChunkSource,
    pub sink: &'a mut dyn ResponseSink,
    pub compressor: &'a dyn Compressor,
    pub max_message_size: usize,
}

fn finalize(reporter: &StatusReporter, outcome: Result<(), Status>) {
    match outcome {
        Ok(()) => reporter.set(Status::ok()),
        Err(status) => {
            warn!("call failed: {status}");
            reporter.set(status);
        }
    }
}

/// Decode the single request message of a unary or server-streaming call.
async fn recv_single<Req>(
    pump: &mut MessagePump<'_>,
    compressor: &dyn Compressor,
    codec: &dyn MessageCodec<Req>,
) -> Result<Req, Status> {
    let frame = pump.expect_frame().await?;
    if pump.has_leftover() {
        return Err(Status::internal("unexpected trailing data"));
    }
    open_frame(&frame, compressor, codec)
}

pub(crate) async fn serve_unary<Req, Resp>(
    parts: CallParts<'_>,
    reporter: &StatusReporter,
    req_codec: &dyn MessageCodec<Req>,
    resp_codec: &dyn MessageCodec<Resp>,
    handler: &dyn UnaryHandler<Req, Resp>,
) where
    Req: Send,
    Resp: Send,
{
    let CallParts {
        source,
        sink,
        compressor,
        max_message_size,
    } = parts;
    let outcome: Result<(), Status> = async {
        let mut pump = MessagePump::new(source, max_message_size);
        let request = recv_single(&mut pump, compressor, req_codec).await?;
        let response = handler.call(request).await?;
        let bytes = seal_frame(&response, compressor, resp_codec)?;
        sink.write(bytes).await?;
        sink.flush().await?;
        Ok(())
    }
    .await;
    finalize(reporter, outcome);
}

pub(crate) async fn serve_server_streaming<Req, Resp>(
    parts: CallParts<'_>,
    reporter: &StatusReporter,
    req_codec: &dyn MessageCodec<Req>,
    resp_codec: &dyn MessageCodec<Resp>,
    handler: &dyn ServerStreamHandler<Req, Resp>,
) where
    Req: Send,
    Resp: Send,
{
    let CallParts {
        source,
        sink,
        compressor,
        max_message_size,
    } = parts;
    let outcome: Result<(), Status> = async {
        let mut pump = MessagePump::new(source, max_message_size);
        let request = recv_single(&mut pump, compressor, req_codec).await?;
        let mut outputs = handler.call(request).await?;
        let mut sent = 0usize;
        while let Some(item) = outputs.next().await {
            let value = item?;
            let bytes = seal_frame(&value, compressor, resp_codec)?;
            sink.write(bytes).await?;
            sink.flush().await?;
            sent += 1;
        }
        debug!("server stream exhausted after {sent} messages");
        Ok(())
    }
    .await;
    finalize(reporter, outcome);
}

pub(crate) async fn serve_client_streaming<Req>(
    parts: CallParts<'_>,
    reporter: &StatusReporter,
    req_codec: &dyn MessageCodec<Req>,
    handler: &dyn ClientStreamHandler<Req>,
) where
    Req: Send,
{
    let CallParts {
        source,
        compressor,
        max_message_size,
        ..
    } = parts;
    let outcome: Result<(), Status> = async {
        let mut pump = MessagePump::new(source, max_message_size);
        let mut received = 0usize;
        while let Some(frame) = pump.next_frame().await? {
            let message = open_frame(&frame, compressor, req_codec)?;
            handler.on_message(message).await?;
            received += 1;
        }
        debug!("client stream ended after {received} messages");
        Ok(())
    }
    .await;
    finalize(reporter, outcome);
}
