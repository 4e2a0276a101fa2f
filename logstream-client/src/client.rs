//! The client facade.

use std::sync::Arc;

use logstream_core::{EventData, WriteResult};
use tracing::{Instrument, info_span};

use crate::batch::BatchAppender;
use crate::builder::ClientSettings;
use crate::options::{
    AppendToStreamOptions, ReadAllOptions, ReadStreamOptions, SubscribeToAllOptions,
    SubscribeToStreamOptions,
};
use crate::read::{ReadMode, ReadStream};
use crate::request;
use crate::subscription::{BoxError, DropReason, Subscription, SubscriptionHandler};
use crate::transport::ConnectionProvider;
use crate::ClientError;

/// Client for an event log database.
///
/// Cloning is cheap; clones share the connection and the batch append
/// stream.
///
/// # Example
///
/// ```ignore
/// use logstream_client::{AppendToStreamOptions, ClientBuilder, EventData, ExpectedRevision};
///
/// let client = ClientBuilder::new("http://localhost:2113").build()?;
/// let result = client
///     .append_to_stream(
///         "orders-1",
///         &AppendToStreamOptions::new().expected_revision(ExpectedRevision::NoStream),
///         [EventData::json("OrderPlaced", &order)?],
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    provider: Arc<dyn ConnectionProvider>,
    settings: ClientSettings,
    appender: BatchAppender,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn new(provider: Arc<dyn ConnectionProvider>, settings: ClientSettings) -> Self {
        let appender = BatchAppender::new(provider.clone(), &settings);
        Client {
            inner: Arc::new(ClientInner {
                provider,
                settings,
                appender,
            }),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// Append `events` to `stream`, in order, if the stream is at the
    /// expected revision.
    ///
    /// A revision mismatch is returned as [`WriteResult::Conflict`] unless
    /// throw-on-conflict is configured, in which case it is
    /// [`ClientError::WrongExpectedVersion`]. A conflicting append writes
    /// nothing.
    pub async fn append_to_stream<I>(
        &self,
        stream: impl AsRef<str>,
        options: &AppendToStreamOptions,
        events: I,
    ) -> Result<WriteResult, ClientError>
    where
        I: IntoIterator<Item = EventData>,
    {
        let stream = stream.as_ref();
        let call = options
            .call
            .clone()
            .with_default_deadline(self.inner.settings.default_deadline);
        let events: Vec<EventData> = events.into_iter().collect();

        let span = info_span!(
            "append_to_stream",
            stream,
            events = events.len(),
            expected = %options.expected_revision,
        );
        let result = self
            .inner
            .appender
            .append(stream, options.expected_revision, events, &call)
            .instrument(span)
            .await?;

        let throw = options
            .throw_on_conflict
            .unwrap_or(self.inner.settings.throw_on_append_failure);
        match result {
            WriteResult::Conflict {
                stream,
                expected,
                actual,
            } if throw => Err(ClientError::WrongExpectedVersion {
                stream,
                expected,
                current: actual,
            }),
            result => Ok(result),
        }
    }

    /// Read events from one stream.
    ///
    /// The read starts immediately on the current tokio runtime. Use
    /// [`ReadStream::read_state`] to learn whether the stream exists.
    pub fn read_stream(&self, stream: impl AsRef<str>, options: &ReadStreamOptions) -> ReadStream {
        let request = request::read_stream_request(stream.as_ref(), options);
        let call = options
            .call
            .clone()
            .with_default_deadline(self.inner.settings.default_deadline);
        ReadStream::start(self.inner.provider.clone(), request, ReadMode::Stream, &call)
    }

    /// Read events from the whole log.
    pub fn read_all(&self, options: &ReadAllOptions) -> ReadStream {
        let request = request::read_all_request(options);
        let call = options
            .call
            .clone()
            .with_default_deadline(self.inner.settings.default_deadline);
        ReadStream::start(self.inner.provider.clone(), request, ReadMode::All, &call)
    }

    /// Subscribe to one stream.
    ///
    /// Resolves once the server has confirmed the subscription. Events are
    /// then handed to `handler` until the subscription is dropped, at which
    /// point `on_dropped` is called once.
    ///
    /// Subscriptions are long-lived; the client's default deadline does not
    /// apply to them.
    pub async fn subscribe_to_stream<H, D>(
        &self,
        stream: impl AsRef<str>,
        options: &SubscribeToStreamOptions,
        handler: H,
        on_dropped: D,
    ) -> Result<Subscription, ClientError>
    where
        H: SubscriptionHandler,
        D: FnOnce(DropReason, Option<BoxError>) + Send + 'static,
    {
        let request = request::subscribe_to_stream_request(stream.as_ref(), options);
        Subscription::start(
            self.inner.provider.clone(),
            request,
            &options.call,
            handler,
            on_dropped,
        )
        .await
    }

    /// Subscribe to the whole log, optionally filtered.
    pub async fn subscribe_to_all<H, D>(
        &self,
        options: &SubscribeToAllOptions,
        handler: H,
        on_dropped: D,
    ) -> Result<Subscription, ClientError>
    where
        H: SubscriptionHandler,
        D: FnOnce(DropReason, Option<BoxError>) + Send + 'static,
    {
        let request = request::subscribe_to_all_request(options);
        Subscription::start(
            self.inner.provider.clone(),
            request,
            &options.call,
            handler,
            on_dropped,
        )
        .await
    }
}
