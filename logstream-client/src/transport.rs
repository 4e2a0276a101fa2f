//! Transport seam.
//!
//! The client never talks HTTP directly. It asks a [`ConnectionProvider`]
//! for a [`Connection`], which pairs a [`Channel`] (the three streams RPCs)
//! with the capabilities the server negotiated. [`ConnectProvider`] is the
//! built-in implementation: Connect over HTTP/2 cleartext using hyper.
//!
//! Tests and embedders can supply their own [`Channel`].

mod body;
mod connect;

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use logstream_core::proto::{AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, ReadReq, ReadResp};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{CallOptions, ClientError};

pub use body::RequestBody;
pub use connect::{ConnectChannel, ConnectProvider};

/// A stream of decoded response messages.
pub type MessageStream<T> = BoxStream<'static, Result<T, ClientError>>;

/// The two halves of a bidirectional call.
///
/// Dropping `requests` ends the request side of the call.
pub struct DuplexCall<Req, Res> {
    pub requests: mpsc::Sender<Req>,
    pub responses: MessageStream<Res>,
}

/// What the server supports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerCapabilities {
    pub batch_append: bool,
    pub server_version: Option<String>,
}

/// A usable call handle plus the capabilities of the server behind it.
#[derive(Clone)]
pub struct Connection {
    pub channel: Arc<dyn Channel>,
    pub capabilities: ServerCapabilities,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// The streams service RPCs.
pub trait Channel: Send + Sync + 'static {
    /// Server-streaming `Read`.
    fn read(
        &self,
        request: ReadReq,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<MessageStream<ReadResp>, ClientError>>;

    /// Client-streaming `Append`: one options message followed by one
    /// message per event.
    fn append(
        &self,
        requests: Vec<AppendReq>,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<AppendResp, ClientError>>;

    /// Bidirectional `BatchAppend`.
    fn batch_append(
        &self,
        options: &CallOptions,
    ) -> BoxFuture<'static, Result<DuplexCall<BatchAppendReq, BatchAppendResp>, ClientError>>;
}

/// Resolves a [`Connection`].
pub trait ConnectionProvider: Send + Sync + 'static {
    fn resolve(&self, cancel: &CancellationToken)
    -> BoxFuture<'static, Result<Connection, ClientError>>;
}

/// A fixed connection resolves to itself.
impl ConnectionProvider for Connection {
    fn resolve(
        &self,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Connection, ClientError>> {
        let result = if cancel.is_cancelled() {
            Err(ClientError::Cancelled)
        } else {
            Ok(self.clone())
        };
        Box::pin(futures::future::ready(result))
    }
}
