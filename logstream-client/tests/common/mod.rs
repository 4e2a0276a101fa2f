//! In-memory event log server used by the integration tests.
//!
//! Implements the streams RPCs against a single ordered log: reads (with
//! subscriptions and stream name prefix filters), legacy appends and
//! multiplexed batch appends. Batch append streams can be severed to
//! exercise recovery.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{StreamExt, stream};
use logstream_client::transport::{
    Channel, Connection, ConnectionProvider, DuplexCall, MessageStream, ServerCapabilities,
};
use logstream_client::{CallOptions, Client, ClientBuilder, ClientError, EventData};
use logstream_core::proto::streams::read_req::options::{
    AllOptions, CountOption, FilterOption, ReadDirection, StreamOption, StreamOptions,
    all_options::AllOption, filter_options::Filter, stream_options::RevisionOption,
};
use logstream_core::proto::streams::read_resp::{self, ReadEvent, read_event};
use logstream_core::proto::streams::{
    append_req, append_resp, batch_append_req, batch_append_resp,
};
use logstream_core::proto::{
    self, AllStreamPosition, AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, ReadReq,
    ReadResp, Status, StreamIdentifier,
};
use logstream_core::{Code, ExpectedRevision};
use parking_lot::Mutex;
use prost::Message;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

pub const SERVER_VERSION: &str = "24.10.0";

const WRONG_EXPECTED_VERSION_TYPE_URL: &str =
    "type.googleapis.com/event_store.client.WrongExpectedVersion";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `count` small binary events with distinct payloads.
pub fn events(count: usize) -> Vec<EventData> {
    (0..count)
        .map(|i| EventData::binary(format!("event-{i}"), format!("payload-{i}").into_bytes()))
        .collect()
}

#[derive(Clone, Debug)]
struct Stored {
    stream: String,
    revision: u64,
    position: u64,
    id: proto::Uuid,
    metadata: HashMap<String, String>,
    custom_metadata: Bytes,
    data: Bytes,
}

impl Stored {
    fn to_response(&self, with_position: bool) -> ReadResp {
        ReadResp {
            content: Some(read_resp::Content::Event(ReadEvent {
                event: Some(read_event::RecordedEvent {
                    id: Some(self.id.clone()),
                    stream_identifier: Some(StreamIdentifier::from_name(&self.stream)),
                    stream_revision: self.revision,
                    prepare_position: self.position,
                    commit_position: self.position,
                    metadata: self.metadata.clone(),
                    custom_metadata: self.custom_metadata.clone(),
                    data: self.data.clone(),
                }),
                link: None,
                position: Some(if with_position {
                    read_event::Position::CommitPosition(self.position)
                } else {
                    read_event::Position::NoPosition(())
                }),
            })),
        }
    }
}

struct Proposed {
    id: Option<proto::Uuid>,
    metadata: HashMap<String, String>,
    custom_metadata: Bytes,
    data: Bytes,
}

impl From<append_req::ProposedMessage> for Proposed {
    fn from(m: append_req::ProposedMessage) -> Self {
        Proposed {
            id: m.id,
            metadata: m.metadata,
            custom_metadata: m.custom_metadata,
            data: m.data,
        }
    }
}

impl From<batch_append_req::ProposedMessage> for Proposed {
    fn from(m: batch_append_req::ProposedMessage) -> Self {
        Proposed {
            id: m.id,
            metadata: m.metadata,
            custom_metadata: m.custom_metadata,
            data: m.data,
        }
    }
}

/// Where an accepted append left the stream.
struct Appended {
    revision: Option<u64>,
    position: Option<u64>,
}

#[derive(Default)]
struct Log {
    events: Vec<Stored>,
    revisions: HashMap<String, u64>,
}

impl Log {
    /// Append atomically, or report the current revision on a mismatch.
    fn append(
        &mut self,
        stream: &str,
        expected: ExpectedRevision,
        proposed: Vec<Proposed>,
        live: &broadcast::Sender<Stored>,
    ) -> Result<Appended, Option<u64>> {
        let current = self.revisions.get(stream).copied();
        let accepted = match expected {
            ExpectedRevision::Any => true,
            ExpectedRevision::NoStream => current.is_none(),
            ExpectedRevision::StreamExists => current.is_some(),
            ExpectedRevision::Exact(revision) => current == Some(revision),
        };
        if !accepted {
            return Err(current);
        }

        let mut appended = Appended {
            revision: current,
            position: None,
        };
        for event in proposed {
            let revision = appended.revision.map_or(0, |r| r + 1);
            let position = self.events.len() as u64;
            let stored = Stored {
                stream: stream.to_string(),
                revision,
                position,
                id: event
                    .id
                    .unwrap_or_else(|| proto::Uuid::from(uuid::Uuid::new_v4())),
                metadata: event.metadata,
                custom_metadata: event.custom_metadata,
                data: event.data,
            };
            self.events.push(stored.clone());
            let _ = live.send(stored);
            appended.revision = Some(revision);
            appended.position = Some(position);
        }
        if let Some(revision) = appended.revision {
            self.revisions.insert(stream.to_string(), revision);
        }
        Ok(appended)
    }
}

struct State {
    log: Mutex<Log>,
    live: broadcast::Sender<Stored>,
    batch_append: bool,
    batch_calls: AtomicUsize,
    batch_chunks: AtomicUsize,
    legacy_appends: AtomicUsize,
    open_batches: Mutex<Vec<mpsc::Sender<Result<BatchAppendResp, ClientError>>>>,
}

/// What a read asks for, decoded from its options.
enum Target {
    Stream {
        name: String,
        start: Option<RevisionOption>,
    },
    All {
        start: Option<AllOption>,
        prefixes: Option<Vec<String>>,
    },
}

impl Target {
    fn matches(&self, event: &Stored) -> bool {
        match self {
            Target::Stream { name, .. } => &event.stream == name,
            Target::All { prefixes, .. } => prefixes.as_ref().is_none_or(|prefixes| {
                prefixes.iter().any(|prefix| event.stream.starts_with(prefix))
            }),
        }
    }
}

#[derive(Clone)]
pub struct InMemoryServer {
    state: Arc<State>,
}

impl InMemoryServer {
    /// A server that supports batch append.
    pub fn new() -> Self {
        Self::with_batch_append(true)
    }

    /// A server that only has the single-call append.
    pub fn legacy() -> Self {
        Self::with_batch_append(false)
    }

    fn with_batch_append(batch_append: bool) -> Self {
        let (live, _) = broadcast::channel(1024);
        InMemoryServer {
            state: Arc::new(State {
                log: Mutex::new(Log::default()),
                live,
                batch_append,
                batch_calls: AtomicUsize::new(0),
                batch_chunks: AtomicUsize::new(0),
                legacy_appends: AtomicUsize::new(0),
                open_batches: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn provider(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(Connection {
            channel: Arc::new(self.clone()),
            capabilities: ServerCapabilities {
                batch_append: self.state.batch_append,
                server_version: Some(SERVER_VERSION.to_string()),
            },
        })
    }

    pub fn client(&self) -> Client {
        self.connect(ClientBuilder::new("http://in-memory"))
    }

    pub fn connect(&self, builder: ClientBuilder) -> Client {
        builder
            .build_with_provider(self.provider())
            .expect("valid client settings")
    }

    /// Number of batch append calls opened so far.
    pub fn batch_calls(&self) -> usize {
        self.state.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of batch append requests received so far.
    pub fn batch_chunks(&self) -> usize {
        self.state.batch_chunks.load(Ordering::SeqCst)
    }

    pub fn legacy_appends(&self) -> usize {
        self.state.legacy_appends.load(Ordering::SeqCst)
    }

    /// Fail every open batch append call with a transport error.
    pub fn sever_batch_streams(&self) {
        for responses in self.state.open_batches.lock().drain(..) {
            let _ = responses.try_send(Err(ClientError::Transport("connection reset".into())));
        }
    }

    fn read_stream(&self, request: ReadReq) -> Result<MessageStream<ReadResp>, ClientError> {
        let options = request
            .options
            .ok_or_else(|| ClientError::new(Code::InvalidArgument, "read without options"))?;
        let backwards = options.read_direction == ReadDirection::Backwards as i32;

        let target = match options.stream_option {
            Some(StreamOption::Stream(StreamOptions {
                stream_identifier,
                revision_option,
            })) => Target::Stream {
                name: stream_identifier.map(|id| id.name()).unwrap_or_default(),
                start: revision_option,
            },
            Some(StreamOption::All(AllOptions { all_option })) => Target::All {
                start: all_option,
                prefixes: match options.filter_option {
                    Some(FilterOption::Filter(filter)) => match filter.filter {
                        Some(Filter::StreamIdentifier(expression)) => Some(expression.prefix),
                        _ => None,
                    },
                    _ => None,
                },
            },
            None => {
                return Err(ClientError::new(
                    Code::InvalidArgument,
                    "read without a stream option",
                ));
            }
        };

        match options.count_option {
            Some(CountOption::Subscription(_)) => Ok(self.subscribe(target)),
            Some(CountOption::Count(count)) => Ok(self.read_once(target, backwards, count)),
            None => Err(ClientError::new(Code::InvalidArgument, "read without a count")),
        }
    }

    fn read_once(&self, target: Target, backwards: bool, count: u64) -> MessageStream<ReadResp> {
        let log = self.state.log.lock();
        let mut selected: Vec<&Stored> = log.events.iter().filter(|e| target.matches(e)).collect();

        let with_position = matches!(target, Target::All { .. });
        if let Target::Stream { name, start } = &target {
            if !log.revisions.contains_key(name) {
                let not_found = ReadResp {
                    content: Some(read_resp::Content::StreamNotFound(
                        read_resp::StreamNotFound {
                            stream_identifier: Some(StreamIdentifier::from_name(name)),
                        },
                    )),
                };
                return stream::iter([Ok(not_found)]).boxed();
            }
            selected.retain(|e| match (start, backwards) {
                (Some(RevisionOption::Revision(r)), false) => e.revision >= *r,
                (Some(RevisionOption::Revision(r)), true) => e.revision <= *r,
                (Some(RevisionOption::End(())), false) => false,
                (Some(RevisionOption::Start(())), true) => e.revision == 0,
                _ => true,
            });
        }
        if let Target::All { start, .. } = &target {
            selected.retain(|e| match (start, backwards) {
                (Some(AllOption::Position(p)), false) => e.position >= p.commit_position,
                (Some(AllOption::Position(p)), true) => e.position <= p.commit_position,
                (Some(AllOption::End(())), false) => false,
                (Some(AllOption::Start(())), true) => e.position == 0,
                _ => true,
            });
        }
        if backwards {
            selected.reverse();
        }

        let responses: Vec<Result<ReadResp, ClientError>> = selected
            .into_iter()
            .take(count as usize)
            .map(|e| Ok(e.to_response(with_position)))
            .collect();
        stream::iter(responses).boxed()
    }

    /// Confirm, replay history after the start point, report caught up, then
    /// follow live appends.
    fn subscribe(&self, target: Target) -> MessageStream<ReadResp> {
        let (history, receiver, last_position) = {
            let log = self.state.log.lock();
            let history: Vec<Stored> = log
                .events
                .iter()
                .filter(|e| target.matches(e))
                .filter(|e| match &target {
                    Target::Stream { start, .. } => match start {
                        Some(RevisionOption::Revision(r)) => e.revision > *r,
                        Some(RevisionOption::End(())) => false,
                        _ => true,
                    },
                    Target::All { start, .. } => match start {
                        Some(AllOption::Position(p)) => e.position > p.commit_position,
                        Some(AllOption::End(())) => false,
                        _ => true,
                    },
                })
                .cloned()
                .collect();
            let last_position = log.events.last().map(|e| e.position);
            (history, self.state.live.subscribe(), last_position)
        };

        let with_position = matches!(target, Target::All { .. });
        let filtered = matches!(target, Target::All { prefixes: Some(_), .. });

        let mut head: Vec<Result<ReadResp, ClientError>> = vec![Ok(ReadResp {
            content: Some(read_resp::Content::Confirmation(
                read_resp::SubscriptionConfirmation {
                    subscription_id: uuid::Uuid::new_v4().to_string(),
                },
            )),
        })];
        head.extend(history.iter().map(|e| Ok(e.to_response(with_position))));
        if let (true, Some(position)) = (filtered, last_position) {
            head.push(Ok(ReadResp {
                content: Some(read_resp::Content::Checkpoint(read_resp::Checkpoint {
                    commit_position: position,
                    prepare_position: position,
                })),
            }));
        }
        head.push(Ok(ReadResp {
            content: Some(read_resp::Content::CaughtUp(read_resp::CaughtUp {})),
        }));

        let live = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .filter(move |e| futures::future::ready(target.matches(e)))
        .map(move |e| Ok(e.to_response(with_position)));

        stream::iter(head).chain(live).boxed()
    }

    fn append_once(&self, requests: Vec<AppendReq>) -> Result<AppendResp, ClientError> {
        use append_req::options::ExpectedStreamRevision;
        use append_resp::success::{CurrentRevisionOption, PositionOption};
        use append_resp::wrong_expected_version::{
            CurrentRevisionOption as Actual, ExpectedRevisionOption,
        };

        self.state.legacy_appends.fetch_add(1, Ordering::SeqCst);
        let mut requests = requests.into_iter();
        let Some(append_req::Content::Options(options)) =
            requests.next().and_then(|request| request.content)
        else {
            return Err(ClientError::new(
                Code::InvalidArgument,
                "append must start with options",
            ));
        };
        let proposed: Vec<Proposed> = requests
            .filter_map(|request| match request.content {
                Some(append_req::Content::ProposedMessage(message)) => Some(Proposed::from(message)),
                _ => None,
            })
            .collect();

        let stream = options
            .stream_identifier
            .as_ref()
            .map(StreamIdentifier::name)
            .unwrap_or_default();
        let expected = match options.expected_stream_revision {
            Some(ExpectedStreamRevision::Revision(r)) => ExpectedRevision::Exact(r),
            Some(ExpectedStreamRevision::NoStream(())) => ExpectedRevision::NoStream,
            Some(ExpectedStreamRevision::StreamExists(())) => ExpectedRevision::StreamExists,
            Some(ExpectedStreamRevision::Any(())) | None => ExpectedRevision::Any,
        };

        let outcome = self
            .state
            .log
            .lock()
            .append(&stream, expected, proposed, &self.state.live);
        let result = match outcome {
            Ok(appended) => append_resp::Result::Success(append_resp::Success {
                current_revision_option: Some(match appended.revision {
                    Some(r) => CurrentRevisionOption::CurrentRevision(r),
                    None => CurrentRevisionOption::NoStream(()),
                }),
                position_option: Some(match appended.position {
                    Some(p) => PositionOption::Position(append_resp::Position {
                        commit_position: p,
                        prepare_position: p,
                    }),
                    None => PositionOption::NoPosition(()),
                }),
            }),
            Err(current) => {
                append_resp::Result::WrongExpectedVersion(append_resp::WrongExpectedVersion {
                    current_revision_option: Some(match current {
                        Some(r) => Actual::CurrentRevision(r),
                        None => Actual::CurrentNoStream(()),
                    }),
                    expected_revision_option: Some(match expected {
                        ExpectedRevision::Exact(r) => ExpectedRevisionOption::ExpectedRevision(r),
                        ExpectedRevision::Any => ExpectedRevisionOption::ExpectedAny(()),
                        ExpectedRevision::NoStream => ExpectedRevisionOption::ExpectedNoStream(()),
                        ExpectedRevision::StreamExists => {
                            ExpectedRevisionOption::ExpectedStreamExists(())
                        }
                    }),
                })
            }
        };
        Ok(AppendResp {
            result: Some(result),
        })
    }

    fn complete_batch(
        &self,
        correlation_id: proto::Uuid,
        options: batch_append_req::Options,
        proposed: Vec<Proposed>,
    ) -> BatchAppendResp {
        use batch_append_req::options::ExpectedStreamPosition;
        use batch_append_resp::success::{CurrentRevisionOption, PositionOption};
        use proto::shared::wrong_expected_version::{
            CurrentStreamRevisionOption, ExpectedStreamPositionOption,
        };

        let stream = options
            .stream_identifier
            .as_ref()
            .map(StreamIdentifier::name)
            .unwrap_or_default();
        let expected = match options.expected_stream_position {
            Some(ExpectedStreamPosition::StreamPosition(r)) => ExpectedRevision::Exact(r),
            Some(ExpectedStreamPosition::NoStream(())) => ExpectedRevision::NoStream,
            Some(ExpectedStreamPosition::StreamExists(())) => ExpectedRevision::StreamExists,
            Some(ExpectedStreamPosition::Any(())) | None => ExpectedRevision::Any,
        };

        let outcome = self
            .state
            .log
            .lock()
            .append(&stream, expected, proposed, &self.state.live);
        let result = match outcome {
            Ok(appended) => batch_append_resp::Result::Success(batch_append_resp::Success {
                current_revision_option: Some(match appended.revision {
                    Some(r) => CurrentRevisionOption::CurrentRevision(r),
                    None => CurrentRevisionOption::NoStream(()),
                }),
                position_option: Some(match appended.position {
                    Some(p) => PositionOption::Position(AllStreamPosition {
                        commit_position: p,
                        prepare_position: p,
                    }),
                    None => PositionOption::NoPosition(()),
                }),
            }),
            Err(current) => {
                let detail = proto::WrongExpectedVersion {
                    current_stream_revision_option: Some(match current {
                        Some(r) => CurrentStreamRevisionOption::CurrentStreamRevision(r),
                        None => CurrentStreamRevisionOption::CurrentNoStream(()),
                    }),
                    expected_stream_position_option: Some(match expected {
                        ExpectedRevision::Exact(r) => {
                            ExpectedStreamPositionOption::ExpectedStreamPosition(r)
                        }
                        ExpectedRevision::Any => ExpectedStreamPositionOption::ExpectedAny(()),
                        ExpectedRevision::NoStream => {
                            ExpectedStreamPositionOption::ExpectedNoStream(())
                        }
                        ExpectedRevision::StreamExists => {
                            ExpectedStreamPositionOption::ExpectedStreamExists(())
                        }
                    }),
                };
                batch_append_resp::Result::Error(Status {
                    code: Code::FailedPrecondition as i32,
                    message: format!("wrong expected version for stream {stream}"),
                    details: Some(prost_types::Any {
                        type_url: WRONG_EXPECTED_VERSION_TYPE_URL.to_string(),
                        value: detail.encode_to_vec(),
                    }),
                })
            }
        };

        BatchAppendResp {
            correlation_id: Some(correlation_id),
            result: Some(result),
            stream_identifier: options.stream_identifier,
            expected_stream_position: None,
        }
    }

    fn open_batch(&self) -> DuplexCall<BatchAppendReq, BatchAppendResp> {
        self.state.batch_calls.fetch_add(1, Ordering::SeqCst);
        let (requests, mut incoming) = mpsc::channel::<BatchAppendReq>(16);
        let (outgoing, responses) = mpsc::channel(16);
        self.state.open_batches.lock().push(outgoing.clone());

        let server = self.clone();
        tokio::spawn(async move {
            let mut partial: HashMap<uuid::Uuid, (Option<batch_append_req::Options>, Vec<Proposed>)> =
                HashMap::new();
            while let Some(chunk) = incoming.recv().await {
                server.state.batch_chunks.fetch_add(1, Ordering::SeqCst);
                let Some(wire_id) = chunk.correlation_id else {
                    continue;
                };
                let Ok(id) = uuid::Uuid::try_from(wire_id.clone()) else {
                    continue;
                };

                let entry = partial.entry(id).or_default();
                if chunk.options.is_some() {
                    entry.0 = chunk.options;
                }
                entry
                    .1
                    .extend(chunk.proposed_messages.into_iter().map(Proposed::from));
                if !chunk.is_final {
                    continue;
                }

                let Some((options, proposed)) = partial.remove(&id) else {
                    continue;
                };
                let response =
                    server.complete_batch(wire_id, options.unwrap_or_default(), proposed);
                if outgoing.send(Ok(response)).await.is_err() {
                    break;
                }
            }
        });

        DuplexCall {
            requests,
            responses: ReceiverStream::new(responses).boxed(),
        }
    }
}

impl Channel for InMemoryServer {
    fn read(
        &self,
        request: ReadReq,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<MessageStream<ReadResp>, ClientError>> {
        Box::pin(futures::future::ready(self.read_stream(request)))
    }

    fn append(
        &self,
        requests: Vec<AppendReq>,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<AppendResp, ClientError>> {
        Box::pin(futures::future::ready(self.append_once(requests)))
    }

    fn batch_append(
        &self,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<DuplexCall<BatchAppendReq, BatchAppendResp>, ClientError>> {
        let result = if self.state.batch_append {
            Ok(self.open_batch())
        } else {
            Err(ClientError::new(Code::Unimplemented, "BatchAppend"))
        };
        Box::pin(futures::future::ready(result))
    }
}
