//! End-to-end unary call behaviour.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{EchoReply, EchoRequest, RecordingSink, ScriptedBody, decode_messages, frame_message};
use grpcwire::{
    BincodeCodec, Code, Dispatch, Engine, Gzip, Identity, MessageCodec, Registry, RpcIdentity,
    Status, UnaryHandler, frame::DEFAULT_MAX_MESSAGE_SIZE,
};

fn codecs() -> (
    Arc<dyn MessageCodec<EchoRequest>>,
    Arc<dyn MessageCodec<EchoReply>>,
) {
    (
        Arc::new(BincodeCodec::<EchoRequest>::new()),
        Arc::new(BincodeCodec::<EchoReply>::new()),
    )
}

fn uppercase_handler() -> Arc<dyn UnaryHandler<EchoRequest, EchoReply>> {
    Arc::new(|request: EchoRequest| async move {
        Ok(EchoReply {
            text: request.text.to_uppercase(),
        })
    })
}

fn echo_engine(compressor: Arc<dyn grpcwire::Compressor>) -> Engine {
    let (req_codec, resp_codec) = codecs();
    let registry = Registry::new().unary(
        &RpcIdentity::new("test.Echo", "Say"),
        compressor,
        req_codec,
        resp_codec,
        uppercase_handler(),
    );
    Engine::builder().registry(registry).build()
}

#[tokio::test]
async fn round_trip() {
    let engine = echo_engine(Arc::new(Identity));
    let mut body = ScriptedBody::whole(frame_message(&EchoRequest::new("hello"), None));
    let mut sink = RecordingSink::new();

    let outcome = engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(sink.written.len(), 1);
    assert!(sink.flushes >= 1);
    let replies: Vec<EchoReply> = decode_messages(&sink.body(), &Identity);
    assert_eq!(replies, vec![EchoReply { text: "HELLO".into() }]);
    assert_eq!(sink.trailers.expect("trailers").code(), Code::Ok);
}

#[tokio::test]
async fn chunk_boundaries_do_not_change_the_outcome() {
    let request = frame_message(&EchoRequest::new("boundary"), None);
    let bodies = vec![
        ScriptedBody::split(&request, 1),
        ScriptedBody::split(&request, 7),
        ScriptedBody::whole(request.clone()),
    ];

    for mut body in bodies {
        let engine = echo_engine(Arc::new(Identity));
        let mut sink = RecordingSink::new();
        engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

        let replies: Vec<EchoReply> = decode_messages(&sink.body(), &Identity);
        assert_eq!(
            replies,
            vec![EchoReply {
                text: "BOUNDARY".into()
            }]
        );
        assert_eq!(sink.trailers.expect("trailers").code(), Code::Ok);
    }
}

#[tokio::test]
async fn truncated_body_reports_early_end() {
    let request = frame_message(&EchoRequest::new("cut"), None);
    let truncated = request.slice(..request.len() - 1);

    let engine = echo_engine(Arc::new(Identity));
    let mut body = ScriptedBody::whole(truncated);
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    let status = sink.trailers.expect("trailers");
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "early end of request body");
    assert!(sink.written.is_empty());
}

#[tokio::test]
async fn declared_length_longer_than_body_is_internal() {
    // Header claims 10 payload bytes; only 3 follow before end of body.
    let mut bytes = vec![0u8];
    bytes.extend_from_slice(&10u32.to_be_bytes());
    bytes.extend_from_slice(&[1, 2, 3]);

    let engine = echo_engine(Arc::new(Identity));
    let mut body = ScriptedBody::whole(Bytes::from(bytes));
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    assert_eq!(sink.trailers.expect("trailers").code(), Code::Internal);
}

#[tokio::test]
async fn trailing_data_after_the_request_is_internal() {
    let mut bytes = frame_message(&EchoRequest::new("one"), None).to_vec();
    bytes.extend_from_slice(&frame_message(&EchoRequest::new("two"), None));

    let engine = echo_engine(Arc::new(Identity));
    let mut body = ScriptedBody::whole(Bytes::from(bytes));
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    let status = sink.trailers.expect("trailers");
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.message(), "unexpected trailing data");
    assert!(sink.written.is_empty());
}

#[tokio::test]
async fn handler_status_reaches_the_trailers() {
    let (req_codec, resp_codec) = codecs();
    let failing: Arc<dyn UnaryHandler<EchoRequest, EchoReply>> =
        Arc::new(|_request: EchoRequest| async move {
            Err::<EchoReply, _>(Status::new(Code::InvalidArgument, "text must not be empty"))
        });
    let registry = Registry::new().unary(
        &RpcIdentity::new("test.Echo", "Say"),
        Arc::new(Identity),
        req_codec,
        resp_codec,
        failing,
    );
    let engine = Engine::builder().registry(registry).build();

    let mut body = ScriptedBody::whole(frame_message(&EchoRequest::new(""), None));
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    let status = sink.trailers.expect("trailers");
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "text must not be empty");
    assert!(sink.written.is_empty());
}

#[tokio::test]
async fn gzip_call_round_trips() {
    let gzip = Gzip::new(DEFAULT_MAX_MESSAGE_SIZE);
    let engine = echo_engine(Arc::new(gzip));
    let request = frame_message(&EchoRequest::new("packed"), Some(&gzip));
    let mut body = ScriptedBody::split(&request, 3);
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    // The response frame is compressed as well.
    assert_eq!(sink.written[0][0], 1);
    let replies: Vec<EchoReply> = decode_messages(&sink.body(), &gzip);
    assert_eq!(replies, vec![EchoReply { text: "PACKED".into() }]);
    assert_eq!(sink.trailers.expect("trailers").code(), Code::Ok);
}

#[tokio::test]
async fn oversized_declared_length_is_internal() {
    let mut bytes = vec![0u8];
    bytes.extend_from_slice(&64u32.to_be_bytes());
    bytes.extend_from_slice(&[0; 64]);

    let (req_codec, resp_codec) = codecs();
    let registry = Registry::new().unary(
        &RpcIdentity::new("test.Echo", "Say"),
        Arc::new(Identity),
        req_codec,
        resp_codec,
        uppercase_handler(),
    );
    let engine = Engine::builder()
        .registry(registry)
        .max_recv_message_size(16)
        .build();

    let mut body = ScriptedBody::whole(Bytes::from(bytes));
    let mut sink = RecordingSink::new();
    engine.serve("/test.Echo/Say", &mut body, &mut sink).await;

    let status = sink.trailers.expect("trailers");
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("exceeds maximum message size"));
}
