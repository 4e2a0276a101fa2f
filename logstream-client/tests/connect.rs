//! End-to-end tests of the Connect transport against a local HTTP/2 server.

mod common;

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use common::{events, init_tracing};
use futures::StreamExt;
use http::{HeaderMap, Request, Response, StatusCode, header};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use logstream_client::{
    AppendToStreamOptions, Client, ClientBuilder, ClientError, CurrentRevision, ExpectedRevision,
    ReadState, ReadStreamOptions,
};
use logstream_core::proto::server_features::{SupportedMethod, SupportedMethods};
use logstream_core::proto::streams::read_req::options::StreamOption;
use logstream_core::proto::streams::read_resp::{self, ReadEvent, read_event::RecordedEvent};
use logstream_core::proto::streams::{append_req, append_resp, batch_append_resp};
use logstream_core::proto::{
    AllStreamPosition, AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, ReadReq, ReadResp,
    STREAMS_SERVICE, StreamIdentifier,
};
use logstream_core::{Envelope, encode_envelope, envelope_flags, split_envelope};
use parking_lot::Mutex;
use prost::Message;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

type Body = BoxBody<Bytes, Infallible>;

const PROTO: &str = "application/proto";
const CONNECT_PROTO: &str = "application/connect+proto";

/// Paths and headers of every request the server received.
#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<(String, HeaderMap)>>,
}

impl Recorded {
    fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    fn headers(&self, method: &str) -> HeaderMap {
        self.requests
            .lock()
            .iter()
            .find(|(path, _)| path.ends_with(method))
            .map(|(_, headers)| headers.clone())
            .unwrap_or_default()
    }
}

fn end_stream(json: &str) -> Bytes {
    let mut frame = BytesMut::with_capacity(5 + json.len());
    frame.put_u8(envelope_flags::END_STREAM);
    frame.put_u32(json.len() as u32);
    frame.extend_from_slice(json.as_bytes());
    frame.freeze()
}

fn decode_frames<M: Message + Default>(body: &[u8]) -> Vec<M> {
    let mut buffer = BytesMut::from(body);
    let mut messages = Vec::new();
    while let Ok(Some(envelope)) = split_envelope(&mut buffer) {
        if let Envelope::Message(payload) = envelope {
            messages.push(M::decode(payload).unwrap());
        }
    }
    messages
}

fn full(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Full::new(body.into()).boxed())
        .unwrap()
}

fn streaming(frames: Vec<Bytes>) -> Response<Body> {
    let mut body = BytesMut::new();
    for frame in frames {
        body.extend_from_slice(&frame);
    }
    full(StatusCode::OK, CONNECT_PROTO, body.freeze())
}

fn recorded_event(stream: &str, revision: u64) -> ReadResp {
    ReadResp {
        content: Some(read_resp::Content::Event(ReadEvent {
            event: Some(RecordedEvent {
                id: Some(uuid::Uuid::new_v4().into()),
                stream_identifier: Some(StreamIdentifier::from_name(stream)),
                stream_revision: revision,
                prepare_position: revision,
                commit_position: revision,
                metadata: HashMap::from([
                    ("type".to_string(), format!("event-{revision}")),
                    ("content-type".to_string(), "application/octet-stream".to_string()),
                ]),
                custom_metadata: Bytes::new(),
                data: Bytes::from_static(b"payload"),
            }),
            link: None,
            position: None,
        })),
    }
}

fn read(body: &[u8]) -> Response<Body> {
    let request = decode_frames::<ReadReq>(body).remove(0);
    let stream = match request.options.and_then(|o| o.stream_option) {
        Some(StreamOption::Stream(options)) => options
            .stream_identifier
            .map(|id| id.name())
            .unwrap_or_default(),
        _ => String::new(),
    };

    match stream.as_str() {
        "missing" => streaming(vec![
            encode_envelope(&ReadResp {
                content: Some(read_resp::Content::StreamNotFound(read_resp::StreamNotFound {
                    stream_identifier: Some(StreamIdentifier::from_name("missing")),
                })),
            }),
            end_stream("{}"),
        ]),
        "gone" => streaming(vec![end_stream(
            r#"{"error":{"code":"not_found","message":"stream deleted"},"metadata":{"exception":["stream-deleted"],"stream-name":["gone"]}}"#,
        )]),
        stream => streaming(vec![
            encode_envelope(&recorded_event(stream, 0)),
            encode_envelope(&recorded_event(stream, 1)),
            end_stream("{}"),
        ]),
    }
}

fn append(body: &[u8]) -> Response<Body> {
    let proposed = decode_frames::<AppendReq>(body)
        .into_iter()
        .filter(|r| matches!(r.content, Some(append_req::Content::ProposedMessage(_))))
        .count() as u64;
    let response = AppendResp {
        result: Some(append_resp::Result::Success(append_resp::Success {
            current_revision_option: Some(
                append_resp::success::CurrentRevisionOption::CurrentRevision(proposed - 1),
            ),
            position_option: Some(append_resp::success::PositionOption::Position(
                append_resp::Position {
                    commit_position: 10,
                    prepare_position: 10,
                },
            )),
        })),
    };
    streaming(vec![encode_envelope(&response), end_stream("{}")])
}

/// Answers each batch append once its final chunk has arrived, while the
/// request side stays open.
fn batch_append(mut body: Incoming) -> Response<Body> {
    let (frames, rx) = mpsc::channel::<Result<Frame<Bytes>, Infallible>>(8);
    tokio::spawn(async move {
        let mut buffer = BytesMut::new();
        let mut revisions: HashMap<String, u64> = HashMap::new();
        let mut counts: HashMap<uuid::Uuid, (String, u64)> = HashMap::new();

        while let Some(Ok(frame)) = body.frame().await {
            let Ok(data) = frame.into_data() else {
                continue;
            };
            buffer.extend_from_slice(&data);
            while let Ok(Some(Envelope::Message(payload))) = split_envelope(&mut buffer) {
                let chunk = BatchAppendReq::decode(payload).unwrap();
                let wire_id = chunk.correlation_id.clone().unwrap();
                let id = uuid::Uuid::try_from(wire_id.clone()).unwrap();

                let entry = counts.entry(id).or_default();
                if let Some(options) = &chunk.options {
                    entry.0 = options
                        .stream_identifier
                        .as_ref()
                        .map(StreamIdentifier::name)
                        .unwrap_or_default();
                }
                entry.1 += chunk.proposed_messages.len() as u64;
                if !chunk.is_final {
                    continue;
                }

                let Some((stream, count)) = counts.remove(&id) else {
                    continue;
                };
                let revision = match revisions.get(&stream) {
                    Some(current) => current + count,
                    None => count - 1,
                };
                revisions.insert(stream, revision);

                let response = BatchAppendResp {
                    correlation_id: Some(wire_id),
                    result: Some(batch_append_resp::Result::Success(
                        batch_append_resp::Success {
                            current_revision_option: Some(
                                batch_append_resp::success::CurrentRevisionOption::CurrentRevision(
                                    revision,
                                ),
                            ),
                            position_option: Some(
                                batch_append_resp::success::PositionOption::Position(
                                    AllStreamPosition {
                                        commit_position: revision,
                                        prepare_position: revision,
                                    },
                                ),
                            ),
                        },
                    )),
                    stream_identifier: None,
                    expected_stream_position: None,
                };
                if frames
                    .send(Ok(Frame::data(encode_envelope(&response))))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
        let _ = frames.send(Ok(Frame::data(end_stream("{}")))).await;
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONNECT_PROTO)
        .body(BodyExt::boxed(StreamBody::new(ReceiverStream::new(rx))))
        .unwrap()
}

async fn handle(
    request: Request<Incoming>,
    recorded: Arc<Recorded>,
    supported: Option<SupportedMethods>,
) -> Result<Response<Body>, Infallible> {
    let path = request.uri().path().to_string();
    recorded
        .requests
        .lock()
        .push((path.clone(), request.headers().clone()));

    if path.ends_with("/BatchAppend") {
        return Ok(batch_append(request.into_body()));
    }

    let body = request
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    let response = match path.rsplit('/').next().unwrap_or_default() {
        "GetSupportedMethods" => match &supported {
            Some(methods) => full(StatusCode::OK, PROTO, methods.encode_to_vec()),
            None => full(
                StatusCode::NOT_IMPLEMENTED,
                "application/json",
                r#"{"code":"unimplemented","message":"server features"}"#,
            ),
        },
        "Read" => read(&body),
        "Append" => append(&body),
        _ => full(
            StatusCode::NOT_FOUND,
            "application/json",
            r#"{"code":"unimplemented"}"#,
        ),
    };
    Ok(response)
}

/// Start a server and return its base URL.
async fn serve(supported: Option<SupportedMethods>) -> (String, Arc<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Recorded::default());

    let state = recorded.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = state.clone();
            let supported = supported.clone();
            tokio::spawn(async move {
                let service = service_fn(move |request| {
                    handle(request, state.clone(), supported.clone())
                });
                let _ = hyper::server::conn::http2::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (format!("http://{addr}"), recorded)
}

fn with_batch_append() -> SupportedMethods {
    SupportedMethods {
        methods: vec![
            SupportedMethod {
                method_name: "read".into(),
                service_name: STREAMS_SERVICE.to_lowercase(),
                features: vec![],
            },
            SupportedMethod {
                method_name: "batchappend".into(),
                service_name: STREAMS_SERVICE.to_lowercase(),
                features: vec![],
            },
        ],
        event_store_server_version: "24.10.0".into(),
    }
}

fn client(url: &str) -> Client {
    ClientBuilder::new(url)
        .default_deadline(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn legacy_server_append_uses_single_call() {
    init_tracing();
    let (url, recorded) = serve(None).await;

    let result = client(&url)
        .append_to_stream(
            "orders-1",
            &AppendToStreamOptions::new().expected_revision(ExpectedRevision::NoStream),
            events(2),
        )
        .await
        .unwrap();
    assert_eq!(result.next_revision(), Some(CurrentRevision::Current(1)));

    let paths = recorded.paths();
    assert_eq!(
        paths,
        vec![
            "/event_store.client.server_features.ServerFeatures/GetSupportedMethods",
            "/event_store.client.streams.Streams/Append",
        ]
    );

    let headers = recorded.headers("/Append");
    assert_eq!(headers[header::CONTENT_TYPE], CONNECT_PROTO);
    assert_eq!(headers["connect-protocol-version"], "1");
    assert_eq!(headers["connect-timeout-ms"], "2000");
    assert_eq!(headers["requires-leader"], "false");
    assert_eq!(
        recorded.headers("/GetSupportedMethods")[header::CONTENT_TYPE],
        PROTO
    );
}

#[tokio::test]
async fn batch_append_over_http2() {
    init_tracing();
    let (url, recorded) = serve(Some(with_batch_append())).await;
    let client = ClientBuilder::new(&url).max_append_size(16).build().unwrap();

    let first = client
        .append_to_stream("orders-1", &AppendToStreamOptions::new(), events(3))
        .await
        .unwrap();
    assert_eq!(first.next_revision(), Some(CurrentRevision::Current(2)));

    let second = client
        .append_to_stream("orders-1", &AppendToStreamOptions::new(), events(2))
        .await
        .unwrap();
    assert_eq!(second.next_revision(), Some(CurrentRevision::Current(4)));

    let batch_calls = recorded
        .paths()
        .iter()
        .filter(|path| path.ends_with("/BatchAppend"))
        .count();
    assert_eq!(batch_calls, 1);
}

#[tokio::test]
async fn read_over_http2() {
    init_tracing();
    let (url, _) = serve(None).await;
    let client = client(&url);

    let read = client.read_stream("orders-1", &ReadStreamOptions::new());
    assert_eq!(read.read_state().await.unwrap(), ReadState::Ok);
    let types: Vec<String> = read
        .events()
        .unwrap()
        .map(|event| event.unwrap().original_event().event_type.clone())
        .collect()
        .await;
    assert_eq!(types, vec!["event-0", "event-1"]);

    let missing = client.read_stream("missing", &ReadStreamOptions::new());
    assert_eq!(
        missing.read_state().await.unwrap(),
        ReadState::StreamNotFound
    );
}

#[tokio::test]
async fn end_stream_error_is_classified() {
    init_tracing();
    let (url, _) = serve(None).await;

    let read = client(&url).read_stream("gone", &ReadStreamOptions::new());
    let mut events = read.events().unwrap();

    assert!(matches!(
        events.next().await,
        Some(Err(ClientError::StreamDeleted(stream))) if stream == "gone"
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let read = client(&url).read_stream("orders-1", &ReadStreamOptions::new());
    assert!(matches!(
        read.read_state().await,
        Err(ClientError::Transport(_))
    ));
}
