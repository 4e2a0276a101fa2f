//! Per-operation options.
//!
//! Every options type embeds a [`CallOptions`] for the deadline, leader
//! requirement and cancellation token of the call.

use logstream_core::{Direction, ExpectedRevision, Position, StreamPosition, SubscriptionStart};

use crate::CallOptions;

/// Options for [`Client::append_to_stream`](crate::Client::append_to_stream).
#[derive(Debug, Clone)]
pub struct AppendToStreamOptions {
    pub(crate) expected_revision: ExpectedRevision,
    pub(crate) throw_on_conflict: Option<bool>,
    pub(crate) call: CallOptions,
}

impl Default for AppendToStreamOptions {
    fn default() -> Self {
        Self {
            expected_revision: ExpectedRevision::Any,
            throw_on_conflict: None,
            call: CallOptions::default(),
        }
    }
}

impl AppendToStreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The revision the stream must be at for the append to succeed.
    /// Defaults to [`ExpectedRevision::Any`].
    pub fn expected_revision(mut self, expected: ExpectedRevision) -> Self {
        self.expected_revision = expected;
        self
    }

    /// Return conflicts as [`ClientError::WrongExpectedVersion`](crate::ClientError::WrongExpectedVersion)
    /// instead of [`WriteResult::Conflict`](logstream_core::WriteResult::Conflict).
    /// Overrides the client-wide setting.
    pub fn throw_on_conflict(mut self, throw: bool) -> Self {
        self.throw_on_conflict = Some(throw);
        self
    }

    pub fn call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// Options for [`Client::read_stream`](crate::Client::read_stream).
#[derive(Debug, Clone)]
pub struct ReadStreamOptions {
    pub(crate) direction: Direction,
    pub(crate) start: StreamPosition<u64>,
    pub(crate) max_count: u64,
    pub(crate) resolve_links: bool,
    pub(crate) call: CallOptions,
}

impl Default for ReadStreamOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Forwards,
            start: StreamPosition::Start,
            max_count: u64::MAX,
            resolve_links: false,
            call: CallOptions::default(),
        }
    }
}

impl ReadStreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwards(mut self) -> Self {
        self.direction = Direction::Forwards;
        self
    }

    pub fn backwards(mut self) -> Self {
        self.direction = Direction::Backwards;
        self
    }

    pub fn position(mut self, start: StreamPosition<u64>) -> Self {
        self.start = start;
        self
    }

    pub fn max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn resolve_links(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    pub fn call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// Options for [`Client::read_all`](crate::Client::read_all).
#[derive(Debug, Clone)]
pub struct ReadAllOptions {
    pub(crate) direction: Direction,
    pub(crate) start: StreamPosition<Position>,
    pub(crate) max_count: u64,
    pub(crate) resolve_links: bool,
    pub(crate) filter: Option<SubscriptionFilter>,
    pub(crate) call: CallOptions,
}

impl Default for ReadAllOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Forwards,
            start: StreamPosition::Start,
            max_count: u64::MAX,
            resolve_links: false,
            filter: None,
            call: CallOptions::default(),
        }
    }
}

impl ReadAllOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwards(mut self) -> Self {
        self.direction = Direction::Forwards;
        self
    }

    pub fn backwards(mut self) -> Self {
        self.direction = Direction::Backwards;
        self
    }

    pub fn position(mut self, start: StreamPosition<Position>) -> Self {
        self.start = start;
        self
    }

    pub fn max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn resolve_links(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    /// Only return events matching `filter`.
    pub fn filter(mut self, filter: SubscriptionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// Options for [`Client::subscribe_to_stream`](crate::Client::subscribe_to_stream).
#[derive(Debug, Clone)]
pub struct SubscribeToStreamOptions {
    pub(crate) start: SubscriptionStart<u64>,
    pub(crate) resolve_links: bool,
    pub(crate) call: CallOptions,
}

impl Default for SubscribeToStreamOptions {
    fn default() -> Self {
        Self {
            start: SubscriptionStart::Start,
            resolve_links: false,
            call: CallOptions::default(),
        }
    }
}

impl SubscribeToStreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_from(mut self, start: SubscriptionStart<u64>) -> Self {
        self.start = start;
        self
    }

    pub fn resolve_links(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    pub fn call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// Options for [`Client::subscribe_to_all`](crate::Client::subscribe_to_all).
#[derive(Debug, Clone)]
pub struct SubscribeToAllOptions {
    pub(crate) start: SubscriptionStart<Position>,
    pub(crate) resolve_links: bool,
    pub(crate) filter: Option<SubscriptionFilter>,
    pub(crate) call: CallOptions,
}

impl Default for SubscribeToAllOptions {
    fn default() -> Self {
        Self {
            start: SubscriptionStart::Start,
            resolve_links: false,
            filter: None,
            call: CallOptions::default(),
        }
    }
}

impl SubscribeToAllOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_from(mut self, start: SubscriptionStart<Position>) -> Self {
        self.start = start;
        self
    }

    pub fn resolve_links(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    /// Only deliver events matching `filter`. Checkpoints are delivered as
    /// the server advances through non-matching events.
    pub fn filter(mut self, filter: SubscriptionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// What a [`SubscriptionFilter`] matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    StreamName,
    EventType,
}

/// A server-side filter over the whole log.
///
/// A filter matches either by prefixes or by a regular expression; when
/// prefixes are given the regex is ignored by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub(crate) target: FilterTarget,
    pub(crate) prefixes: Vec<String>,
    pub(crate) regex: Option<String>,
    pub(crate) max_search_window: Option<u32>,
    pub(crate) checkpoint_interval_multiplier: u32,
}

impl SubscriptionFilter {
    fn new(target: FilterTarget) -> Self {
        Self {
            target,
            prefixes: Vec::new(),
            regex: None,
            max_search_window: None,
            checkpoint_interval_multiplier: 1,
        }
    }

    pub fn on_stream_name() -> Self {
        Self::new(FilterTarget::StreamName)
    }

    pub fn on_event_type() -> Self {
        Self::new(FilterTarget::EventType)
    }

    /// Match event types that do not start with `$`.
    pub fn exclude_system_events() -> Self {
        Self::on_event_type().regex(r"^[^\$].*")
    }

    pub fn add_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    /// How many events the server examines before sending a checkpoint.
    pub fn max_search_window(mut self, window: u32) -> Self {
        self.max_search_window = Some(window);
        self
    }

    pub fn checkpoint_interval_multiplier(mut self, multiplier: u32) -> Self {
        self.checkpoint_interval_multiplier = multiplier;
        self
    }

    pub fn target(&self) -> FilterTarget {
        self.target
    }
}
