//! Streaming read pipeline.
//!
//! A [`ReadStream`] owns one server-streamed `Read` call. A background pump
//! translates responses into [`StreamMessage`]s and hands them over a
//! queue of capacity one, so the network side only advances as fast as the
//! consumer. Facts the server reports up front (read state, first and last
//! positions) are available on the handle without consuming the messages.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, Shared};
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use logstream_core::proto::ReadReq;
use logstream_core::proto::streams::read_req::options::StreamOption;
use logstream_core::{Position, ResolvedEvent, StreamMessage};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, info_span};

use crate::transport::ConnectionProvider;
use crate::{CallOptions, ClientError};

/// Name used for the whole log in errors and logs.
pub const ALL_STREAM: &str = "$all";

type MessageResult = Result<StreamMessage, ClientError>;
type StateFuture = Shared<BoxFuture<'static, Result<ReadState, ClientError>>>;

/// Stream of events of a read, see [`ReadStream::events`].
pub type Events = BoxStream<'static, Result<ResolvedEvent, ClientError>>;

/// What kind of call a pipeline wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// A bounded read of one stream. The read state comes from the first
    /// server message.
    Stream,
    /// A bounded read of the whole log.
    All,
    /// A live subscription, to a stream or to the whole log.
    Subscription,
}

impl ReadMode {
    fn as_str(&self) -> &'static str {
        match self {
            ReadMode::Stream => "stream",
            ReadMode::All => "all",
            ReadMode::Subscription => "subscription",
        }
    }
}

/// Whether the stream being read exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Ok,
    StreamNotFound,
}

#[derive(Debug, Default, Clone, Copy)]
struct ReadFacts {
    first_stream_position: Option<u64>,
    last_stream_position: Option<u64>,
    last_all_stream_position: Option<Position>,
}

/// Handle onto a running read.
///
/// Dropping the handle, and every [`Messages`] taken from it, cancels the
/// call.
pub struct ReadStream {
    stream_name: String,
    receiver: Mutex<Option<mpsc::Receiver<MessageResult>>>,
    state: StateFuture,
    facts: Arc<Mutex<ReadFacts>>,
    cancel: CancellationToken,
    guard: Arc<DropGuard>,
}

impl std::fmt::Debug for ReadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadStream")
            .field("stream_name", &self.stream_name)
            .field("facts", &*self.facts.lock())
            .finish_non_exhaustive()
    }
}

impl ReadStream {
    /// Start the pump for `request` on the current runtime.
    ///
    /// The pipeline is cancelled when the token in `options` fires.
    pub fn start(
        provider: Arc<dyn ConnectionProvider>,
        request: ReadReq,
        mode: ReadMode,
        options: &CallOptions,
    ) -> Self {
        let stream_name = stream_name(&request);
        let cancel = options.child_token();
        let (tx, rx) = mpsc::channel(1);
        let (state_tx, state_rx) = oneshot::channel();
        let facts = Arc::new(Mutex::new(ReadFacts::default()));

        let pump = Pump {
            tx,
            state: Some(state_tx),
            facts: facts.clone(),
            mode,
        };
        let span = info_span!("read.pump", read.mode = mode.as_str(), stream = %stream_name);
        tokio::spawn(
            pump.run(provider, request, options.clone(), cancel.clone())
                .instrument(span),
        );

        let state: BoxFuture<'static, Result<ReadState, ClientError>> =
            Box::pin(async move {
                match state_rx.await {
                    Ok(state) => state,
                    Err(_) => Err(ClientError::Cancelled),
                }
            });

        ReadStream {
            stream_name,
            receiver: Mutex::new(Some(rx)),
            state: state.shared(),
            guard: Arc::new(cancel.clone().drop_guard()),
            facts,
            cancel,
        }
    }

    /// The name of the stream being read, or `$all`.
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Whether the stream exists. Resolves as soon as the server has
    /// answered, whether or not the messages are being consumed.
    pub async fn read_state(&self) -> Result<ReadState, ClientError> {
        self.state.clone().await
    }

    pub fn first_stream_position(&self) -> Option<u64> {
        self.facts.lock().first_stream_position
    }

    pub fn last_stream_position(&self) -> Option<u64> {
        self.facts.lock().last_stream_position
    }

    pub fn last_all_stream_position(&self) -> Option<Position> {
        self.facts.lock().last_all_stream_position
    }

    /// Take the message view. Only the first call succeeds; later calls,
    /// and [`events`](Self::events) after this one, fail with
    /// [`ClientError::AlreadyConsumed`].
    pub fn messages(&self) -> Result<Messages, ClientError> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(ClientError::AlreadyConsumed)?;
        let cancel = self.cancel.clone();

        let inner = futures::stream::unfold(Some(receiver), move |receiver| {
            let cancel = cancel.clone();
            async move {
                let mut receiver = receiver?;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Some((Err(ClientError::Cancelled), None)),
                    item = receiver.recv() => item.map(|item| (item, Some(receiver))),
                }
            }
        })
        .boxed();

        Ok(Messages {
            inner,
            _guard: self.guard.clone(),
        })
    }

    /// Take the events-only view. A missing stream surfaces as
    /// [`ClientError::StreamNotFound`].
    pub fn events(&self) -> Result<Events, ClientError> {
        let stream_name = self.stream_name.clone();
        let events = self.messages()?.filter_map(move |message| {
            let result = match message {
                Ok(StreamMessage::Event(event)) => Some(Ok(event)),
                Ok(StreamMessage::NotFound) => {
                    Some(Err(ClientError::StreamNotFound(stream_name.clone())))
                }
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(result)
        });
        Ok(events.boxed())
    }

    /// Stop the read.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The message view of a [`ReadStream`].
///
/// After cancellation the stream yields one [`ClientError::Cancelled`] and
/// ends.
pub struct Messages {
    inner: BoxStream<'static, MessageResult>,
    _guard: Arc<DropGuard>,
}

impl Stream for Messages {
    type Item = MessageResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

fn stream_name(request: &ReadReq) -> String {
    let stream = request
        .options
        .as_ref()
        .and_then(|options| options.stream_option.as_ref());
    match stream {
        Some(StreamOption::Stream(options)) => options
            .stream_identifier
            .as_ref()
            .map(|identifier| identifier.name())
            .unwrap_or_default(),
        _ => ALL_STREAM.to_string(),
    }
}

struct Pump {
    tx: mpsc::Sender<MessageResult>,
    state: Option<oneshot::Sender<Result<ReadState, ClientError>>>,
    facts: Arc<Mutex<ReadFacts>>,
    mode: ReadMode,
}

impl Pump {
    async fn run(
        mut self,
        provider: Arc<dyn ConnectionProvider>,
        request: ReadReq,
        options: CallOptions,
        cancel: CancellationToken,
    ) {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            outcome = self.forward(provider, request, &options, &cancel) => outcome,
        };

        match outcome {
            Ok(()) => debug!("read completed"),
            Err(ClientError::Cancelled) => {
                debug!("read cancelled");
                self.resolve(Err(ClientError::Cancelled));
            }
            Err(e) => {
                debug!(error = %e, "read failed");
                self.resolve(Err(e.clone()));
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = self.tx.send(Err(e)) => {}
                }
            }
        }
    }

    async fn forward(
        &mut self,
        provider: Arc<dyn ConnectionProvider>,
        request: ReadReq,
        options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let connection = provider.resolve(cancel).await?;
        let mut responses = connection.channel.read(request, options).await?;

        if self.mode != ReadMode::Stream {
            self.resolve(Ok(ReadState::Ok));
        }

        while let Some(response) = responses.next().await {
            let message = StreamMessage::try_from(response?)?;
            self.record(&message);

            if self.state.is_some() {
                if matches!(message, StreamMessage::NotFound) {
                    self.resolve(Ok(ReadState::StreamNotFound));
                    return self.emit(message).await;
                }
                self.resolve(Ok(ReadState::Ok));
                self.emit(StreamMessage::Ok).await?;
            }
            self.emit(message).await?;
        }

        if self.state.is_some() {
            self.resolve(Ok(ReadState::Ok));
            self.emit(StreamMessage::Ok).await?;
        }
        Ok(())
    }

    fn resolve(&mut self, state: Result<ReadState, ClientError>) {
        if let Some(tx) = self.state.take() {
            let _ = tx.send(state);
        }
    }

    fn record(&self, message: &StreamMessage) {
        let mut facts = self.facts.lock();
        match message {
            StreamMessage::FirstStreamPosition(revision) => {
                facts.first_stream_position = Some(*revision)
            }
            StreamMessage::LastStreamPosition(revision) => {
                facts.last_stream_position = Some(*revision)
            }
            StreamMessage::LastAllStreamPosition(position) => {
                facts.last_all_stream_position = Some(*position)
            }
            _ => {}
        }
    }

    async fn emit(&self, message: StreamMessage) -> Result<(), ClientError> {
        self.tx
            .send(Ok(message))
            .await
            .map_err(|_| ClientError::Cancelled)
    }
}
