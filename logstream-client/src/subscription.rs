//! Catch-up subscriptions.
//!
//! A subscription is a [`ReadStream`] in subscription mode plus a single
//! dispatch task. The first server message must confirm the subscription;
//! after that every event is handed to the [`SubscriptionHandler`], one at
//! a time, in server order.
//!
//! A subscription ends exactly once. The drop callback receives the
//! [`DropReason`] and, when there was one, the error that caused it.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{FutureExt, StreamExt};
use logstream_core::proto::ReadReq;
use logstream_core::{Position, ResolvedEvent, StreamMessage};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use crate::read::{Messages, ReadMode, ReadStream};
use crate::transport::ConnectionProvider;
use crate::{CallOptions, ClientError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type DropCallback = Box<dyn FnOnce(DropReason, Option<BoxError>) + Send>;

/// Why a subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Disposed by the caller, or the handler asked to stop.
    Disposed,
    /// The handler failed.
    SubscriberError,
    /// Reading from the server failed, or the server ended the subscription.
    ServerError,
}

/// Error returned by a [`SubscriptionHandler`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Stop the subscription as if it had been disposed.
    #[error("handler cancelled the subscription")]
    Cancelled,
    #[error(transparent)]
    Failed(BoxError),
}

impl HandlerError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        HandlerError::Failed(error.into())
    }
}

/// Receives the events of a subscription.
///
/// Calls are never concurrent: the next message is only read once the
/// previous call has completed.
///
/// Any `FnMut(ResolvedEvent) -> impl Future<Output = Result<(), HandlerError>>`
/// is a handler that ignores checkpoints.
pub trait SubscriptionHandler: Send + 'static {
    fn event_appeared(
        &mut self,
        event: ResolvedEvent,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;

    /// Called as a filtered subscription to the whole log advances past
    /// events that do not match.
    fn checkpoint_reached(
        &mut self,
        position: Position,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        let _ = position;
        async { Ok(()) }
    }
}

impl<F, Fut> SubscriptionHandler for F
where
    F: FnMut(ResolvedEvent) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    fn event_appeared(
        &mut self,
        event: ResolvedEvent,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        self(event)
    }
}

struct Lifecycle {
    dropped: AtomicBool,
    on_dropped: Mutex<Option<DropCallback>>,
    read: ReadStream,
}

impl Lifecycle {
    /// End the subscription. Only the first call has any effect.
    fn drop_once(&self, reason: DropReason, error: Option<BoxError>) {
        if self.dropped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.read.cancel();
        match &error {
            Some(error) => debug!(?reason, %error, "subscription dropped"),
            None => debug!(?reason, "subscription dropped"),
        }

        let callback = self.on_dropped.lock().take();
        if let Some(callback) = callback {
            callback(reason, error);
        }
    }
}

/// Handle onto a running subscription.
///
/// Dropping the handle disposes the subscription.
pub struct Subscription {
    id: String,
    lifecycle: Arc<Lifecycle>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("dropped", &self.is_dropped())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Open a subscription and wait for the server to confirm it.
    ///
    /// Fails if anything other than a confirmation arrives first. On
    /// success the dispatch task is running.
    pub(crate) async fn start<H, D>(
        provider: Arc<dyn ConnectionProvider>,
        request: ReadReq,
        options: &CallOptions,
        handler: H,
        on_dropped: D,
    ) -> Result<Self, ClientError>
    where
        H: SubscriptionHandler,
        D: FnOnce(DropReason, Option<BoxError>) + Send + 'static,
    {
        let read = ReadStream::start(provider, request, ReadMode::Subscription, options);
        let mut messages = read.messages()?;

        let id = match messages.next().await {
            Some(Ok(StreamMessage::SubscriptionConfirmation(id))) => id,
            Some(Ok(other)) => {
                return Err(ClientError::Protocol(format!(
                    "expected a subscription confirmation, got {other:?}"
                )));
            }
            Some(Err(e)) => return Err(e),
            None => {
                return Err(ClientError::Protocol(
                    "subscription ended before it was confirmed".into(),
                ));
            }
        };
        debug!(subscription.id = %id, stream = read.stream_name(), "subscription confirmed");

        let span = info_span!("subscription", subscription.id = %id, stream = read.stream_name());
        let cancel = read.cancellation();
        let lifecycle = Arc::new(Lifecycle {
            dropped: AtomicBool::new(false),
            on_dropped: Mutex::new(Some(Box::new(on_dropped))),
            read,
        });

        let task = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => lifecycle.drop_once(DropReason::Disposed, None),
                    _ = dispatch(messages, handler, &lifecycle) => {}
                }
            }
            .instrument(span)
        });

        Ok(Subscription {
            id,
            lifecycle,
            task: Some(task),
        })
    }

    /// The server-assigned subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_dropped(&self) -> bool {
        self.lifecycle.dropped.load(Ordering::Acquire)
    }

    /// Stop the subscription. The drop callback fires with
    /// [`DropReason::Disposed`] unless the subscription had already ended.
    pub fn dispose(&self) {
        self.lifecycle.drop_once(DropReason::Disposed, None);
    }

    /// Wait for the dispatch task to finish.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "subscription task did not complete");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn dispatch<H: SubscriptionHandler>(
    mut messages: Messages,
    mut handler: H,
    lifecycle: &Lifecycle,
) {
    loop {
        let message = match messages.next().await {
            Some(Ok(message)) => message,
            Some(Err(ClientError::Cancelled)) => {
                return lifecycle.drop_once(DropReason::Disposed, None);
            }
            Some(Err(e)) => {
                return lifecycle.drop_once(DropReason::ServerError, Some(Box::new(e)));
            }
            None => {
                let error = ClientError::Protocol("server ended the subscription".into());
                return lifecycle.drop_once(DropReason::ServerError, Some(Box::new(error)));
            }
        };

        let outcome = match message {
            StreamMessage::Event(event) => {
                guarded(async { handler.event_appeared(event).await }).await
            }
            StreamMessage::Checkpoint(position) => {
                guarded(async { handler.checkpoint_reached(position).await }).await
            }
            StreamMessage::CaughtUp => {
                debug!("caught up");
                Ok(())
            }
            StreamMessage::FellBehind => {
                debug!("fell behind");
                Ok(())
            }
            other => {
                debug!(message = ?other, "ignoring subscription message");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => {}
            Err(HandlerError::Cancelled) => {
                return lifecycle.drop_once(DropReason::Disposed, None);
            }
            Err(HandlerError::Failed(error)) => {
                return lifecycle.drop_once(DropReason::SubscriberError, Some(error));
            }
        }
    }
}

/// Run one handler call, turning a panic into a handler failure.
async fn guarded<F>(call: F) -> Result<(), HandlerError>
where
    F: Future<Output = Result<(), HandlerError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            Err(HandlerError::failed(format!(
                "subscription handler panicked: {message}"
            )))
        }
    }
}
