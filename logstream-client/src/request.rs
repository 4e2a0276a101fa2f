//! Mapping of operation options onto wire requests.
//!
//! Everything here is pure: the same inputs always produce the same
//! messages, which is what lets chunking and filters be tested without a
//! server.

use std::time::Duration;

use logstream_core::proto::streams::read_req::options::{
    self as read_options, AllOptions, ControlOption, CountOption, FilterOption, FilterOptions,
    ReadDirection, StreamOption, StreamOptions, SubscriptionOptions, UuidOption,
    all_options::AllOption, filter_options, stream_options::RevisionOption, uuid_option,
};
use logstream_core::proto::streams::{append_req, batch_append_req, read_req};
use logstream_core::proto::{AppendReq, BatchAppendReq, ReadReq, StreamIdentifier};
use logstream_core::{
    Direction, EventData, ExpectedRevision, Position, StreamPosition, SubscriptionStart,
};
use uuid::Uuid;

use crate::options::{
    FilterTarget, ReadAllOptions, ReadStreamOptions, SubscribeToAllOptions,
    SubscribeToStreamOptions, SubscriptionFilter,
};

/// Wire compatibility level announced in every read request.
const READ_COMPATIBILITY: u32 = 1;

fn base_options(stream_option: StreamOption, resolve_links: bool) -> read_req::Options {
    read_req::Options {
        stream_option: Some(stream_option),
        read_direction: ReadDirection::Forwards as i32,
        resolve_links,
        count_option: Some(CountOption::Subscription(SubscriptionOptions {})),
        filter_option: Some(FilterOption::NoFilter(())),
        uuid_option: Some(UuidOption {
            content: Some(uuid_option::Content::Structured(())),
        }),
        control_option: Some(ControlOption {
            compatibility: READ_COMPATIBILITY,
        }),
    }
}

fn stream_option(stream: &str, revision: RevisionOption) -> StreamOption {
    StreamOption::Stream(StreamOptions {
        stream_identifier: Some(StreamIdentifier::from_name(stream)),
        revision_option: Some(revision),
    })
}

fn all_position(position: Position) -> AllOption {
    AllOption::Position(read_options::Position {
        commit_position: position.commit(),
        prepare_position: position.prepare(),
    })
}

fn direction(direction: Direction) -> i32 {
    match direction {
        Direction::Forwards => ReadDirection::Forwards as i32,
        Direction::Backwards => ReadDirection::Backwards as i32,
    }
}

fn filter_option(filter: Option<&SubscriptionFilter>) -> FilterOption {
    let Some(filter) = filter else {
        return FilterOption::NoFilter(());
    };

    let expression = filter_options::Expression {
        regex: filter.regex.clone().unwrap_or_default(),
        prefix: filter.prefixes.clone(),
    };
    let window = match filter.max_search_window {
        Some(max) => filter_options::Window::Max(max),
        None => filter_options::Window::Count(()),
    };

    FilterOption::Filter(FilterOptions {
        filter: Some(match filter.target {
            FilterTarget::StreamName => filter_options::Filter::StreamIdentifier(expression),
            FilterTarget::EventType => filter_options::Filter::EventType(expression),
        }),
        window: Some(window),
        checkpoint_interval_multiplier: filter.checkpoint_interval_multiplier,
    })
}

pub(crate) fn read_stream_request(stream: &str, options: &ReadStreamOptions) -> ReadReq {
    let revision = match options.start {
        StreamPosition::Start => RevisionOption::Start(()),
        StreamPosition::End => RevisionOption::End(()),
        StreamPosition::Position(revision) => RevisionOption::Revision(revision),
    };

    let mut wire = base_options(stream_option(stream, revision), options.resolve_links);
    wire.read_direction = direction(options.direction);
    wire.count_option = Some(CountOption::Count(options.max_count));
    ReadReq {
        options: Some(wire),
    }
}

pub(crate) fn read_all_request(options: &ReadAllOptions) -> ReadReq {
    let all_option = match options.start {
        StreamPosition::Start => AllOption::Start(()),
        StreamPosition::End => AllOption::End(()),
        StreamPosition::Position(position) => all_position(position),
    };

    let mut wire = base_options(
        StreamOption::All(AllOptions {
            all_option: Some(all_option),
        }),
        options.resolve_links,
    );
    wire.read_direction = direction(options.direction);
    wire.count_option = Some(CountOption::Count(options.max_count));
    wire.filter_option = Some(filter_option(options.filter.as_ref()));
    ReadReq {
        options: Some(wire),
    }
}

pub(crate) fn subscribe_to_stream_request(
    stream: &str,
    options: &SubscribeToStreamOptions,
) -> ReadReq {
    let revision = match options.start {
        SubscriptionStart::Start => RevisionOption::Start(()),
        SubscriptionStart::End => RevisionOption::End(()),
        SubscriptionStart::After(revision) => RevisionOption::Revision(revision),
    };

    ReadReq {
        options: Some(base_options(
            stream_option(stream, revision),
            options.resolve_links,
        )),
    }
}

pub(crate) fn subscribe_to_all_request(options: &SubscribeToAllOptions) -> ReadReq {
    let all_option = match options.start {
        SubscriptionStart::Start => AllOption::Start(()),
        SubscriptionStart::End => AllOption::End(()),
        SubscriptionStart::After(position) => all_position(position),
    };

    let mut wire = base_options(
        StreamOption::All(AllOptions {
            all_option: Some(all_option),
        }),
        options.resolve_links,
    );
    wire.filter_option = Some(filter_option(options.filter.as_ref()));
    ReadReq {
        options: Some(wire),
    }
}

/// The request stream of a single-call append: options, then one message
/// per event.
pub(crate) fn append_requests(
    stream: &str,
    expected: ExpectedRevision,
    events: Vec<EventData>,
) -> Vec<AppendReq> {
    use append_req::options::ExpectedStreamRevision;

    let expected_stream_revision = match expected {
        ExpectedRevision::Exact(revision) => ExpectedStreamRevision::Revision(revision),
        ExpectedRevision::Any => ExpectedStreamRevision::Any(()),
        ExpectedRevision::NoStream => ExpectedStreamRevision::NoStream(()),
        ExpectedRevision::StreamExists => ExpectedStreamRevision::StreamExists(()),
    };

    let mut requests = Vec::with_capacity(events.len() + 1);
    requests.push(AppendReq {
        content: Some(append_req::Content::Options(append_req::Options {
            stream_identifier: Some(StreamIdentifier::from_name(stream)),
            expected_stream_revision: Some(expected_stream_revision),
        })),
    });
    requests.extend(events.into_iter().map(|event| AppendReq {
        content: Some(append_req::Content::ProposedMessage(event.into())),
    }));
    requests
}

/// Split one logical append into batch append chunks of at most
/// `max_bytes` of event payload each.
///
/// An event larger than `max_bytes` travels alone in its own chunk. Only
/// the first chunk carries the options and only the last is final; an
/// append without events is a single chunk that is both.
pub(crate) fn batch_chunks(
    stream: &str,
    expected: ExpectedRevision,
    events: Vec<EventData>,
    correlation_id: Uuid,
    max_bytes: usize,
    deadline: Option<Duration>,
) -> Vec<BatchAppendReq> {
    use batch_append_req::options::{DeadlineOption, ExpectedStreamPosition};

    let mut groups: Vec<Vec<batch_append_req::ProposedMessage>> = Vec::new();
    let mut current = Vec::new();
    let mut current_size = 0usize;
    for event in events {
        let size = event.size();
        if !current.is_empty() && current_size + size > max_bytes {
            groups.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(event.into());
    }
    if !current.is_empty() || groups.is_empty() {
        groups.push(current);
    }

    let expected_stream_position = match expected {
        ExpectedRevision::Exact(revision) => ExpectedStreamPosition::StreamPosition(revision),
        ExpectedRevision::Any => ExpectedStreamPosition::Any(()),
        ExpectedRevision::NoStream => ExpectedStreamPosition::NoStream(()),
        ExpectedRevision::StreamExists => ExpectedStreamPosition::StreamExists(()),
    };
    let mut options = Some(batch_append_req::Options {
        stream_identifier: Some(StreamIdentifier::from_name(stream)),
        expected_stream_position: Some(expected_stream_position),
        deadline_option: deadline.map(|deadline| {
            DeadlineOption::Deadline(prost_types::Duration {
                seconds: deadline.as_secs() as i64,
                nanos: deadline.subsec_nanos() as i32,
            })
        }),
    });

    let last = groups.len() - 1;
    groups
        .into_iter()
        .enumerate()
        .map(|(index, proposed_messages)| BatchAppendReq {
            correlation_id: Some(correlation_id.into()),
            options: options.take(),
            proposed_messages,
            is_final: index == last,
        })
        .collect()
}
