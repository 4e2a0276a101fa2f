//! Recorded events, proposed events and append outcomes.

use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::position::{CurrentRevision, ExpectedRevision, Position};
use crate::proto;
use crate::proto::streams::{append_req, append_resp, batch_append_req, batch_append_resp};
use crate::proto::streams::read_resp::read_event::RecordedEvent;

/// Metadata key carrying the event type.
pub const METADATA_TYPE: &str = "type";
/// Metadata key carrying the payload content type.
pub const METADATA_CONTENT_TYPE: &str = "content-type";
/// Metadata key carrying the server-assigned creation time.
pub const METADATA_CREATED: &str = "created";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// An event as stored by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub stream_id: String,
    pub id: Uuid,
    pub event_type: String,
    pub content_type: String,
    pub revision: u64,
    pub position: Position,
    /// Creation time in 100ns ticks since the Unix epoch, when reported.
    pub created: Option<i64>,
    pub custom_metadata: Bytes,
    pub data: Bytes,
}

impl EventRecord {
    /// Whether the payload is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type == CONTENT_TYPE_JSON
    }

    /// Deserialize a JSON payload.
    pub fn as_json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.data)
    }
}

impl TryFrom<RecordedEvent> for EventRecord {
    type Error = ConversionError;

    fn try_from(mut wire: RecordedEvent) -> Result<Self, Self::Error> {
        let id: Uuid = wire
            .id
            .take()
            .ok_or(ConversionError::MissingField("event.id"))?
            .try_into()?;
        let stream_id = wire
            .stream_identifier
            .as_ref()
            .map(proto::StreamIdentifier::name)
            .ok_or(ConversionError::MissingField("event.stream_identifier"))?;
        let position = Position::new(wire.commit_position, wire.prepare_position)?;

        let event_type = wire.metadata.remove(METADATA_TYPE).unwrap_or_default();
        let content_type = wire
            .metadata
            .remove(METADATA_CONTENT_TYPE)
            .unwrap_or_else(|| CONTENT_TYPE_BINARY.to_string());
        let created = wire
            .metadata
            .get(METADATA_CREATED)
            .and_then(|ticks| ticks.parse().ok());

        Ok(EventRecord {
            stream_id,
            id,
            event_type,
            content_type,
            revision: wire.stream_revision,
            position,
            created,
            custom_metadata: wire.custom_metadata,
            data: wire.data,
        })
    }
}

/// A read event together with the link that pointed to it, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub event: EventRecord,
    pub link: Option<EventRecord>,
    /// Position of the event in the global log, when the read reports one.
    pub commit_position: Option<u64>,
}

impl ResolvedEvent {
    /// The record that was actually read: the link if present, otherwise
    /// the event itself.
    pub fn original_event(&self) -> &EventRecord {
        self.link.as_ref().unwrap_or(&self.event)
    }

    pub fn original_stream_id(&self) -> &str {
        &self.original_event().stream_id
    }

    pub fn original_revision(&self) -> u64 {
        self.original_event().revision
    }

    pub fn is_resolved(&self) -> bool {
        self.link.is_some()
    }
}

impl TryFrom<proto::streams::read_resp::ReadEvent> for ResolvedEvent {
    type Error = ConversionError;

    fn try_from(wire: proto::streams::read_resp::ReadEvent) -> Result<Self, Self::Error> {
        use proto::streams::read_resp::read_event::Position as WirePosition;

        let event: EventRecord = wire
            .event
            .ok_or(ConversionError::MissingField("read_event.event"))?
            .try_into()?;
        let link = wire.link.map(EventRecord::try_from).transpose()?;
        let commit_position = match wire.position {
            Some(WirePosition::CommitPosition(commit)) => Some(commit),
            Some(WirePosition::NoPosition(())) | None => None,
        };

        Ok(ResolvedEvent {
            event,
            link,
            commit_position,
        })
    }
}

/// An event proposed for appending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    pub id: Uuid,
    pub event_type: String,
    pub content_type: String,
    pub data: Bytes,
    pub custom_metadata: Bytes,
}

impl EventData {
    /// An event with an opaque binary payload.
    pub fn binary(event_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        EventData {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            content_type: CONTENT_TYPE_BINARY.to_string(),
            data: data.into(),
            custom_metadata: Bytes::new(),
        }
    }

    /// An event whose payload is `payload` serialized as JSON.
    pub fn json<T: serde::Serialize + ?Sized>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        let data = serde_json::to_vec(payload)?;
        Ok(EventData {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            data: Bytes::from(data),
            custom_metadata: Bytes::new(),
        })
    }

    /// Use a caller-chosen id, making retries of the same append idempotent.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.custom_metadata = metadata.into();
        self
    }

    /// Bytes counted against the append size limit.
    pub fn size(&self) -> usize {
        self.data.len() + self.custom_metadata.len()
    }

    fn wire_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (METADATA_TYPE.to_string(), self.event_type.clone()),
            (METADATA_CONTENT_TYPE.to_string(), self.content_type.clone()),
        ])
    }
}

impl From<EventData> for append_req::ProposedMessage {
    fn from(event: EventData) -> Self {
        append_req::ProposedMessage {
            id: Some(event.id.into()),
            metadata: event.wire_metadata(),
            custom_metadata: event.custom_metadata,
            data: event.data,
        }
    }
}

impl From<EventData> for batch_append_req::ProposedMessage {
    fn from(event: EventData) -> Self {
        batch_append_req::ProposedMessage {
            id: Some(event.id.into()),
            metadata: event.wire_metadata(),
            custom_metadata: event.custom_metadata,
            data: event.data,
        }
    }
}

/// The outcome of an append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteResult {
    Success {
        next_revision: CurrentRevision,
        position: Option<Position>,
    },
    Conflict {
        stream: String,
        expected: ExpectedRevision,
        actual: CurrentRevision,
    },
}

impl WriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Success { .. })
    }

    /// The stream's revision after a successful append.
    pub fn next_revision(&self) -> Option<CurrentRevision> {
        match self {
            WriteResult::Success { next_revision, .. } => Some(*next_revision),
            WriteResult::Conflict { .. } => None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            WriteResult::Success { position, .. } => *position,
            WriteResult::Conflict { .. } => None,
        }
    }

    /// Interpret a single-call append response.
    pub fn from_append_response(
        stream: &str,
        expected: ExpectedRevision,
        response: proto::AppendResp,
    ) -> Result<Self, ConversionError> {
        use append_resp::success::{CurrentRevisionOption, PositionOption};
        use append_resp::wrong_expected_version::CurrentRevisionOption as Actual;

        match response.result {
            Some(append_resp::Result::Success(success)) => {
                let next_revision = match success.current_revision_option {
                    Some(CurrentRevisionOption::CurrentRevision(revision)) => {
                        CurrentRevision::Current(revision)
                    }
                    Some(CurrentRevisionOption::NoStream(())) | None => CurrentRevision::NoStream,
                };
                let position = match success.position_option {
                    Some(PositionOption::Position(p)) => {
                        Some(Position::new(p.commit_position, p.prepare_position)?)
                    }
                    Some(PositionOption::NoPosition(())) | None => None,
                };
                Ok(WriteResult::Success {
                    next_revision,
                    position,
                })
            }
            Some(append_resp::Result::WrongExpectedVersion(wrong)) => {
                let actual = match wrong.current_revision_option {
                    Some(Actual::CurrentRevision(revision)) => CurrentRevision::Current(revision),
                    Some(Actual::CurrentNoStream(())) | None => CurrentRevision::NoStream,
                };
                Ok(WriteResult::Conflict {
                    stream: stream.to_string(),
                    expected,
                    actual,
                })
            }
            None => Err(ConversionError::MissingField("append_resp.result")),
        }
    }

    /// Interpret a successful batch append result.
    pub fn from_batch_success(success: batch_append_resp::Success) -> Result<Self, ConversionError> {
        use batch_append_resp::success::{CurrentRevisionOption, PositionOption};

        let next_revision = match success.current_revision_option {
            Some(CurrentRevisionOption::CurrentRevision(revision)) => {
                CurrentRevision::Current(revision)
            }
            Some(CurrentRevisionOption::NoStream(())) | None => CurrentRevision::NoStream,
        };
        let position = match success.position_option {
            Some(PositionOption::Position(p)) => {
                Some(Position::new(p.commit_position, p.prepare_position)?)
            }
            Some(PositionOption::NoPosition(())) | None => None,
        };
        Ok(WriteResult::Success {
            next_revision,
            position,
        })
    }

    /// Interpret the `WrongExpectedVersion` detail of a batch append error.
    pub fn from_wrong_expected_version(
        stream: &str,
        expected: ExpectedRevision,
        detail: proto::WrongExpectedVersion,
    ) -> Self {
        use proto::shared::wrong_expected_version::CurrentStreamRevisionOption;

        let actual = match detail.current_stream_revision_option {
            Some(CurrentStreamRevisionOption::CurrentStreamRevision(revision)) => {
                CurrentRevision::Current(revision)
            }
            Some(CurrentStreamRevisionOption::CurrentNoStream(())) | None => {
                CurrentRevision::NoStream
            }
        };
        WriteResult::Conflict {
            stream: stream.to_string(),
            expected,
            actual,
        }
    }
}
