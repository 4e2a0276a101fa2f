//! Connect protocol transport over HTTP/2 cleartext.
//!
//! All payloads are protobuf. Unary calls use `application/proto`; the
//! streams RPCs use `application/connect+proto` with envelope framing.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt};
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use logstream_core::proto::server_features::SupportedMethods;
use logstream_core::proto::{
    AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, Empty, ReadReq, ReadResp,
    SERVER_FEATURES_SERVICE, STREAMS_SERVICE,
};
use logstream_core::Code;
use prost::Message;
use tokio::sync::{OnceCell, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use super::body::RequestBody;
use super::{Channel, Connection, ConnectionProvider, DuplexCall, MessageStream, ServerCapabilities};
use crate::config::duration_to_timeout_header;
use crate::error_parser::{ExceptionTable, parse_error_body};
use crate::frame::FrameDecoder;
use crate::{CallOptions, ClientError};

const CONNECT_PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";
const CONNECT_PROTOCOL_VERSION: &str = "1";
const CONNECT_TIMEOUT_HEADER: &str = "connect-timeout-ms";
const REQUIRES_LEADER_HEADER: &str = "requires-leader";

const UNARY_CONTENT_TYPE: &str = "application/proto";
const STREAMING_CONTENT_TYPE: &str = "application/connect+proto";

/// Requests queued on the request side of a batch append call before
/// callers wait for HTTP/2 flow control.
const DUPLEX_BUFFER: usize = 1;

type HyperClient = Client<HttpConnector, RequestBody>;

/// A [`Channel`] speaking Connect to one endpoint.
#[derive(Clone)]
pub struct ConnectChannel {
    inner: Arc<Inner>,
}

struct Inner {
    client: HyperClient,
    base_url: String,
    exceptions: ExceptionTable,
}

impl std::fmt::Debug for ConnectChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectChannel")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ConnectChannel {
    /// Create a channel for `base_url` (e.g. `http://localhost:2113`).
    ///
    /// Connections are HTTP/2 only, which bidirectional streaming requires
    /// over cleartext.
    pub fn new(base_url: impl Into<String>, exceptions: ExceptionTable) -> Self {
        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        builder.http2_only(true);

        let base_url: String = base_url.into();
        ConnectChannel {
            inner: Arc::new(Inner {
                client: builder.build_http(),
                base_url: base_url.trim_end_matches('/').to_string(),
                exceptions,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Ask the server which methods it supports. A server without the
    /// server features service is a legacy server without batch append.
    async fn discover(&self) -> Result<Connection, ClientError> {
        let supported = self
            .inner
            .clone()
            .unary::<Empty, SupportedMethods>(
                SERVER_FEATURES_SERVICE,
                "GetSupportedMethods",
                Empty {},
                CallOptions::default(),
            )
            .await;

        let capabilities = match supported {
            Ok(methods) => ServerCapabilities {
                batch_append: methods.supports(STREAMS_SERVICE, "BatchAppend"),
                server_version: Some(methods.event_store_server_version)
                    .filter(|version| !version.is_empty()),
            },
            Err(e) if e.code() == Code::Unimplemented => {
                debug!(base_url = %self.inner.base_url, "server features unavailable, assuming legacy server");
                ServerCapabilities::default()
            }
            Err(e) => return Err(e),
        };
        debug!(
            batch_append = capabilities.batch_append,
            server_version = ?capabilities.server_version,
            "resolved server capabilities"
        );

        Ok(Connection {
            channel: Arc::new(self.clone()),
            capabilities,
        })
    }
}

impl Inner {
    fn build_request(
        &self,
        service: &str,
        method: &str,
        content_type: &'static str,
        options: &CallOptions,
        body: RequestBody,
    ) -> Result<Request<RequestBody>, ClientError> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/{}/{}", self.base_url, service, method))
            .header(header::CONTENT_TYPE, content_type)
            .header(CONNECT_PROTOCOL_VERSION_HEADER, CONNECT_PROTOCOL_VERSION)
            .header(
                REQUIRES_LEADER_HEADER,
                if options.requires_leader { "true" } else { "false" },
            );

        if let Some(timeout_ms) = options.deadline.and_then(duration_to_timeout_header) {
            builder = builder.header(CONNECT_TIMEOUT_HEADER, timeout_ms);
        }

        builder
            .body(body)
            .map_err(|e| ClientError::Encode(format!("invalid request: {e}")))
    }

    /// Send a request and wait for the response head, bounded by the
    /// deadline when one is set.
    async fn send(
        &self,
        request: Request<RequestBody>,
        deadline: Option<Duration>,
    ) -> Result<Response<Incoming>, ClientError> {
        let response = self.client.request(request);
        let result = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, response)
                .await
                .map_err(|_| ClientError::new(Code::DeadlineExceeded, "deadline exceeded"))?,
            None => response.await,
        };
        result.map_err(|e| ClientError::Transport(format!("request failed: {e}")))
    }

    /// Turn a non-200 response into a classified error.
    async fn error_response(&self, response: Response<Incoming>) -> ClientError {
        let (parts, body) = response.into_parts();
        match body.collect().await {
            Ok(collected) => self.exceptions.classify(parse_error_body(
                parts.status,
                &parts.headers,
                &collected.to_bytes(),
            )),
            Err(e) => ClientError::Transport(format!("failed to read error response body: {e}")),
        }
    }

    async fn unary<Req, Res>(
        self: Arc<Self>,
        service: &'static str,
        method: &'static str,
        request: Req,
        options: CallOptions,
    ) -> Result<Res, ClientError>
    where
        Req: Message,
        Res: Message + Default,
    {
        let body = RequestBody::unary(&request);
        let request = self.build_request(service, method, UNARY_CONTENT_TYPE, &options, body)?;
        let response = self.send(request, options.deadline).await?;

        if response.status() != StatusCode::OK {
            return Err(self.error_response(response).await);
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read response body: {e}")))?
            .to_bytes();
        Ok(Res::decode(bytes)?)
    }

    async fn streaming<Res>(
        self: Arc<Self>,
        method: &'static str,
        body: RequestBody,
        options: CallOptions,
    ) -> Result<MessageStream<Res>, ClientError>
    where
        Res: Message + Default + 'static,
    {
        let request =
            self.build_request(STREAMS_SERVICE, method, STREAMING_CONTENT_TYPE, &options, body)?;
        let response = self.send(request, options.deadline).await?;

        if response.status() != StatusCode::OK {
            return Err(self.error_response(response).await);
        }

        let bytes = Box::pin(
            response
                .into_body()
                .into_data_stream()
                .map_err(|e| ClientError::Transport(format!("stream error: {e}"))),
        );
        Ok(FrameDecoder::<_, Res>::new(bytes, self.exceptions.clone()).boxed())
    }
}

impl Channel for ConnectChannel {
    fn read(
        &self,
        request: ReadReq,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<MessageStream<ReadResp>, ClientError>> {
        let span = info_span!(
            "rpc.call",
            rpc.method = "Read",
            rpc.type = "server_stream",
            otel.kind = "client",
        );
        let body = RequestBody::envelopes([&request]);
        Box::pin(
            self.inner
                .clone()
                .streaming::<ReadResp>("Read", body, options.clone())
                .instrument(span),
        )
    }

    fn append(
        &self,
        requests: Vec<AppendReq>,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<AppendResp, ClientError>> {
        let span = info_span!(
            "rpc.call",
            rpc.method = "Append",
            rpc.type = "client_stream",
            otel.kind = "client",
        );
        let body = RequestBody::envelopes(&requests);
        let inner = self.inner.clone();
        let options = options.clone();

        Box::pin(
            async move {
                let mut responses = inner.streaming::<AppendResp>("Append", body, options).await?;
                let response = responses.next().await.ok_or_else(|| {
                    ClientError::Protocol("append call ended without a response".into())
                })??;
                // Drain the end-stream frame so server errors still surface.
                if let Some(Err(e)) = responses.next().await {
                    return Err(e);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }

    fn batch_append(
        &self,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<DuplexCall<BatchAppendReq, BatchAppendResp>, ClientError>> {
        let span = info_span!(
            "rpc.call",
            rpc.method = "BatchAppend",
            rpc.type = "bidi_stream",
            otel.kind = "client",
        );
        let (requests, rx) = mpsc::channel::<BatchAppendReq>(DUPLEX_BUFFER);
        let body = RequestBody::duplex(rx);

        // The call is opened when the response side is first polled; the
        // server may hold its response head until the first request arrives.
        let opened = self
            .inner
            .clone()
            .streaming::<BatchAppendResp>("BatchAppend", body, options.clone())
            .instrument(span);
        let responses = futures::stream::once(opened)
            .map(|opened| match opened {
                Ok(responses) => responses,
                Err(e) => futures::stream::once(futures::future::ready(Err(e))).boxed(),
            })
            .flatten()
            .boxed();

        Box::pin(futures::future::ready(Ok(DuplexCall {
            requests,
            responses,
        })))
    }
}

/// A [`ConnectionProvider`] over a [`ConnectChannel`].
///
/// Capabilities are discovered on first use and cached; a failed discovery
/// is retried by the next caller.
#[derive(Clone, Debug)]
pub struct ConnectProvider {
    channel: ConnectChannel,
    connection: Arc<OnceCell<Connection>>,
}

impl ConnectProvider {
    pub fn new(channel: ConnectChannel) -> Self {
        ConnectProvider {
            channel,
            connection: Arc::new(OnceCell::new()),
        }
    }
}

impl ConnectionProvider for ConnectProvider {
    fn resolve(
        &self,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Connection, ClientError>> {
        let this = self.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            tokio::select! {
                _ = cancel.cancelled() => Err(ClientError::Cancelled),
                connection = this.connection.get_or_try_init(|| this.channel.discover()) => {
                    connection.cloned()
                }
            }
        })
    }
}
