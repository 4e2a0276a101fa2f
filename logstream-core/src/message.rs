use crate::error::ConversionError;
use crate::event::ResolvedEvent;
use crate::position::Position;
use crate::proto;
use crate::proto::streams::read_resp::Content;

/// One message of a read or subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Event(ResolvedEvent),
    /// The stream being read does not exist.
    NotFound,
    /// The stream being read exists. Emitted ahead of the first server
    /// message of a stream read.
    Ok,
    FirstStreamPosition(u64),
    LastStreamPosition(u64),
    LastAllStreamPosition(Position),
    SubscriptionConfirmation(String),
    Checkpoint(Position),
    CaughtUp,
    FellBehind,
    /// A message this client does not understand.
    Unknown,
}

impl StreamMessage {
    pub fn as_event(&self) -> Option<&ResolvedEvent> {
        match self {
            StreamMessage::Event(event) => Some(event),
            _ => None,
        }
    }
}

impl TryFrom<proto::ReadResp> for StreamMessage {
    type Error = ConversionError;

    fn try_from(response: proto::ReadResp) -> Result<Self, Self::Error> {
        let Some(content) = response.content else {
            return Ok(StreamMessage::Unknown);
        };

        Ok(match content {
            Content::Event(event) => StreamMessage::Event(event.try_into()?),
            Content::Confirmation(confirmation) => {
                StreamMessage::SubscriptionConfirmation(confirmation.subscription_id)
            }
            Content::Checkpoint(checkpoint) => StreamMessage::Checkpoint(Position::new(
                checkpoint.commit_position,
                checkpoint.prepare_position,
            )?),
            Content::StreamNotFound(_) => StreamMessage::NotFound,
            Content::FirstStreamPosition(revision) => StreamMessage::FirstStreamPosition(revision),
            Content::LastStreamPosition(revision) => StreamMessage::LastStreamPosition(revision),
            Content::LastAllStreamPosition(position) => StreamMessage::LastAllStreamPosition(
                Position::new(position.commit_position, position.prepare_position)?,
            ),
            Content::CaughtUp(_) => StreamMessage::CaughtUp,
            Content::FellBehind(_) => StreamMessage::FellBehind,
        })
    }
}
