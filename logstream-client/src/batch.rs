//! Batch append multiplexer.
//!
//! Concurrent appends share one bidirectional `BatchAppend` call. Each
//! append is tagged with a fresh correlation id, split into chunks, and
//! pushed onto a bounded queue that a send loop drains onto the call. A
//! receive loop matches responses back to the waiting callers.
//!
//! One call together with its queue and pending map is an epoch. When the
//! call fails, every pending append fails with the same error and the epoch
//! is retired; the next append after the backoff delay opens a new one.
//! Servers without batch append get single `Append` calls instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::StreamExt;
use logstream_core::proto::streams::batch_append_resp;
use logstream_core::proto::{self, BatchAppendReq, BatchAppendResp};
use logstream_core::{Code, EventData, ExpectedRevision, WriteResult};
use parking_lot::Mutex;
use prost::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::builder::ClientSettings;
use crate::config::ExponentialBackoff;
use crate::error_parser::{ExceptionTable, batch_status_error};
use crate::request::{append_requests, batch_chunks};
use crate::transport::{Connection, ConnectionProvider, DuplexCall};
use crate::{CallOptions, ClientError};

const WRONG_EXPECTED_VERSION_TYPE: &str = "WrongExpectedVersion";

type Completion = oneshot::Sender<Result<WriteResult, ClientError>>;

struct Pending {
    stream: String,
    expected: ExpectedRevision,
    completion: Completion,
}

struct Failure {
    error: ClientError,
    at: Instant,
}

/// One batch append call, its request queue and its pending appends.
struct Epoch {
    generation: u64,
    queue: mpsc::Sender<BatchAppendReq>,
    pending: Mutex<HashMap<Uuid, Pending>>,
    failure: OnceLock<Failure>,
    succeeded: AtomicBool,
    backoff: Arc<Mutex<ExponentialBackoff>>,
    exceptions: ExceptionTable,
}

impl Epoch {
    fn closed_error(&self) -> ClientError {
        self.failure
            .get()
            .map(|failure| failure.error.clone())
            .unwrap_or_else(|| ClientError::Transport("batch append stream closed".into()))
    }

    /// Mark the epoch failed and fail every pending append. Only the first
    /// failure counts.
    fn fail(&self, error: ClientError) {
        let failure = Failure {
            error: error.clone(),
            at: Instant::now(),
        };
        if self.failure.set(failure).is_err() {
            return;
        }

        let pending: Vec<Pending> = self.pending.lock().drain().map(|(_, p)| p).collect();
        warn!(
            generation = self.generation,
            pending = pending.len(),
            %error,
            "batch append stream failed"
        );
        for pending in pending {
            let _ = pending.completion.send(Err(error.clone()));
        }
    }

    fn complete(&self, response: BatchAppendResp) {
        let correlation_id = match response.correlation_id.map(Uuid::try_from) {
            Some(Ok(id)) => id,
            _ => {
                warn!("batch append response without a usable correlation id");
                return;
            }
        };
        let Some(pending) = self.pending.lock().remove(&correlation_id) else {
            warn!(%correlation_id, "batch append response for an unknown correlation id");
            return;
        };

        let result = self.outcome(&pending, response.result);
        if result.is_ok() && !self.succeeded.swap(true, Ordering::AcqRel) {
            self.backoff.lock().reset();
        }
        let _ = pending.completion.send(result);
    }

    fn outcome(
        &self,
        pending: &Pending,
        result: Option<batch_append_resp::Result>,
    ) -> Result<WriteResult, ClientError> {
        match result {
            Some(batch_append_resp::Result::Success(success)) => {
                Ok(WriteResult::from_batch_success(success)?)
            }
            Some(batch_append_resp::Result::Error(status)) => {
                let conflict = status
                    .details
                    .as_ref()
                    .filter(|detail| detail.type_url.ends_with(WRONG_EXPECTED_VERSION_TYPE));
                if let Some(detail) = conflict {
                    let detail = proto::WrongExpectedVersion::decode(detail.value.as_slice())?;
                    return Ok(WriteResult::from_wrong_expected_version(
                        &pending.stream,
                        pending.expected,
                        detail,
                    ));
                }
                Err(self
                    .exceptions
                    .classify(batch_status_error(&pending.stream, status)))
            }
            None => Err(ClientError::Protocol(
                "batch append response without a result".into(),
            )),
        }
    }

    async fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        events: Vec<EventData>,
        max_append_size: usize,
        options: &CallOptions,
        cancel: &CancellationToken,
    ) -> Result<WriteResult, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let correlation_id = Uuid::new_v4();
        let chunks = batch_chunks(
            stream,
            expected,
            events,
            correlation_id,
            max_append_size,
            options.deadline,
        );
        let (completion, result) = oneshot::channel();

        self.pending.lock().insert(
            correlation_id,
            Pending {
                stream: stream.to_string(),
                expected,
                completion,
            },
        );
        if let Some(failure) = self.failure.get() {
            self.pending.lock().remove(&correlation_id);
            return Err(failure.error.clone());
        }

        // An unfinished send queues nothing, so cancelling before the final
        // chunk is queued writes nothing. After that the server may still
        // commit the append even though the caller sees `Cancelled`.
        let exchange = async {
            for chunk in chunks {
                if self.queue.send(chunk).await.is_err() {
                    return Err(self.closed_error());
                }
            }
            match result.await {
                Ok(result) => result,
                Err(_) => Err(self.closed_error()),
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            outcome = within(options.deadline, exchange) => outcome,
        };
        if outcome.is_err() {
            self.pending.lock().remove(&correlation_id);
        }
        outcome
    }
}

async fn within<F>(deadline: Option<Duration>, exchange: F) -> Result<WriteResult, ClientError>
where
    F: Future<Output = Result<WriteResult, ClientError>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, exchange)
            .await
            .unwrap_or_else(|_| Err(ClientError::new(Code::DeadlineExceeded, "append deadline exceeded"))),
        None => exchange.await,
    }
}

/// Runs the send and receive loops of an epoch until either fails.
async fn supervise(
    epoch: Arc<Epoch>,
    call: DuplexCall<BatchAppendReq, BatchAppendResp>,
    mut queue: mpsc::Receiver<BatchAppendReq>,
    shutdown: CancellationToken,
) {
    let DuplexCall {
        requests,
        mut responses,
    } = call;

    let send = async {
        while let Some(request) = queue.recv().await {
            if requests.send(request).await.is_err() {
                return ClientError::Transport("batch append request stream closed".into());
            }
        }
        ClientError::Cancelled
    };
    let receive = async {
        loop {
            match responses.next().await {
                Some(Ok(response)) => epoch.complete(response),
                Some(Err(e)) => return e,
                None => {
                    return ClientError::new(
                        Code::Unavailable,
                        "batch append stream closed by the server",
                    );
                }
            }
        }
    };

    let error = tokio::select! {
        _ = shutdown.cancelled() => ClientError::Cancelled,
        error = send => error,
        error = receive => error,
    };
    // Record the failure first so blocked senders see the real cause.
    epoch.fail(error);
    queue.close();
}

enum Route {
    Batch(Arc<Epoch>),
    Single(Connection),
}

#[derive(Default)]
struct Slot {
    epoch: Option<Arc<Epoch>>,
    generation: u64,
    /// Why the last epoch could not be used, and when a new one may be
    /// opened.
    retry: Option<(ClientError, Instant)>,
}

/// Routes appends onto a shared batch append call, replacing the call when
/// it fails.
pub(crate) struct BatchAppender {
    provider: Arc<dyn ConnectionProvider>,
    max_append_size: usize,
    queue_capacity: usize,
    exceptions: ExceptionTable,
    backoff: Arc<Mutex<ExponentialBackoff>>,
    slot: tokio::sync::Mutex<Slot>,
    unsupported: AtomicBool,
    shutdown: CancellationToken,
}

impl Drop for BatchAppender {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl BatchAppender {
    pub(crate) fn new(provider: Arc<dyn ConnectionProvider>, settings: &ClientSettings) -> Self {
        BatchAppender {
            provider,
            max_append_size: settings.max_append_size,
            queue_capacity: settings.request_queue_capacity.max(1),
            exceptions: settings.exceptions.clone(),
            backoff: Arc::new(Mutex::new(settings.batch_append_backoff.backoff())),
            slot: tokio::sync::Mutex::new(Slot::default()),
            unsupported: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) async fn append(
        &self,
        stream: &str,
        expected: ExpectedRevision,
        events: Vec<EventData>,
        options: &CallOptions,
    ) -> Result<WriteResult, ClientError> {
        let cancel = options.child_token();
        match self.route(&cancel).await? {
            Route::Batch(epoch) => {
                epoch
                    .append(
                        stream,
                        expected,
                        events,
                        self.max_append_size,
                        options,
                        &cancel,
                    )
                    .await
            }
            Route::Single(connection) => {
                let requests = append_requests(stream, expected, events);
                let response = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    response = connection.channel.append(requests, options) => response?,
                };
                Ok(WriteResult::from_append_response(stream, expected, response)?)
            }
        }
    }

    async fn route(&self, cancel: &CancellationToken) -> Result<Route, ClientError> {
        if self.unsupported.load(Ordering::Acquire) {
            return Ok(Route::Single(self.resolve(cancel).await?));
        }
        if let Some(route) = self.current(&mut *self.lock_slot(cancel).await?) {
            return route;
        }

        // Resolve without holding the slot; callers only need it to swap
        // in a new epoch.
        let connection = self.resolve(cancel).await?;
        if !connection.capabilities.batch_append {
            debug!("server does not support batch append, using single appends");
            self.unsupported.store(true, Ordering::Release);
            return Ok(Route::Single(connection));
        }

        let mut guard = self.lock_slot(cancel).await?;
        let slot = &mut *guard;
        // Another caller may have opened an epoch while we resolved.
        if let Some(route) = self.current(slot) {
            return route;
        }

        let generation = slot.generation + 1;
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            opened = self.open(&connection, generation) => opened,
        };
        match opened {
            Ok(epoch) => {
                slot.generation = generation;
                slot.epoch = Some(epoch.clone());
                slot.retry = None;
                Ok(Route::Batch(epoch))
            }
            Err(e) => {
                let delay = self.backoff.lock().next_delay();
                slot.retry = Some((e.clone(), Instant::now() + delay));
                Err(e)
            }
        }
    }

    /// The route through the live epoch, or the error to report while a
    /// replacement is held back. `None` means a new epoch should be opened.
    fn current(&self, slot: &mut Slot) -> Option<Result<Route, ClientError>> {
        let failed = match &slot.epoch {
            Some(epoch) => match epoch.failure.get() {
                None => return Some(Ok(Route::Batch(epoch.clone()))),
                Some(failure) => Some((epoch.generation, failure.error.clone(), failure.at)),
            },
            None => None,
        };
        if let Some((generation, error, failed_at)) = failed {
            let delay = self.backoff.lock().next_delay();
            debug!(generation, ?delay, "retiring failed batch append stream");
            slot.retry = Some((error, failed_at + delay));
            slot.epoch = None;
        }
        match &slot.retry {
            Some((error, at)) if Instant::now() < *at => Some(Err(error.clone())),
            _ => None,
        }
    }

    async fn lock_slot(
        &self,
        cancel: &CancellationToken,
    ) -> Result<tokio::sync::MutexGuard<'_, Slot>, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            guard = self.slot.lock() => Ok(guard),
        }
    }

    async fn resolve(&self, cancel: &CancellationToken) -> Result<Connection, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            connection = self.provider.resolve(cancel) => connection,
        }
    }

    async fn open(&self, connection: &Connection, generation: u64) -> Result<Arc<Epoch>, ClientError> {
        let call = connection.channel.batch_append(&CallOptions::new()).await?;
        let (queue, requests) = mpsc::channel(self.queue_capacity);
        let epoch = Arc::new(Epoch {
            generation,
            queue,
            pending: Mutex::new(HashMap::new()),
            failure: OnceLock::new(),
            succeeded: AtomicBool::new(false),
            backoff: self.backoff.clone(),
            exceptions: self.exceptions.clone(),
        });

        debug!(generation, "opened batch append stream");
        tokio::spawn(
            supervise(epoch.clone(), call, requests, self.shutdown.child_token())
                .instrument(info_span!("batch_append", generation)),
        );
        Ok(epoch)
    }
}
