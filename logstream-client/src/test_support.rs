//! Scripted transport for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use logstream_core::proto::streams::read_resp::{self, ReadEvent, read_event::RecordedEvent};
use logstream_core::proto::{
    self, AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, ReadReq, ReadResp,
};
use logstream_core::{Code, Position};

use crate::transport::{
    Channel, Connection, ConnectionProvider, DuplexCall, MessageStream, ServerCapabilities,
};
use crate::{CallOptions, ClientError};

/// Replays a fixed response script for every read.
pub(crate) struct ScriptedChannel {
    pub script: Vec<Result<ReadResp, ClientError>>,
    /// Keep the response stream open after the script.
    pub hold_open: bool,
}

impl Channel for ScriptedChannel {
    fn read(
        &self,
        _request: ReadReq,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<MessageStream<ReadResp>, ClientError>> {
        let script = futures::stream::iter(self.script.clone());
        let stream = if self.hold_open {
            script.chain(futures::stream::pending()).boxed()
        } else {
            script.boxed()
        };
        Box::pin(futures::future::ready(Ok(stream)))
    }

    fn append(
        &self,
        _requests: Vec<AppendReq>,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<AppendResp, ClientError>> {
        Box::pin(futures::future::ready(Err(ClientError::new(
            Code::Unimplemented,
            "append",
        ))))
    }

    fn batch_append(
        &self,
        _options: &CallOptions,
    ) -> BoxFuture<'static, Result<DuplexCall<BatchAppendReq, BatchAppendResp>, ClientError>> {
        Box::pin(futures::future::ready(Err(ClientError::new(
            Code::Unimplemented,
            "batch append",
        ))))
    }
}

pub(crate) fn scripted(
    script: Vec<Result<ReadResp, ClientError>>,
    hold_open: bool,
) -> Arc<dyn ConnectionProvider> {
    Arc::new(Connection {
        channel: Arc::new(ScriptedChannel { script, hold_open }),
        capabilities: ServerCapabilities::default(),
    })
}

pub(crate) fn content(content: read_resp::Content) -> Result<ReadResp, ClientError> {
    Ok(ReadResp {
        content: Some(content),
    })
}

pub(crate) fn event(stream: &str, revision: u64) -> Result<ReadResp, ClientError> {
    content(read_resp::Content::Event(ReadEvent {
        event: Some(RecordedEvent {
            id: Some(uuid::Uuid::new_v4().into()),
            stream_identifier: Some(proto::StreamIdentifier::from_name(stream)),
            stream_revision: revision,
            prepare_position: revision,
            commit_position: revision,
            metadata: HashMap::from([
                ("type".to_string(), "placed".to_string()),
                (
                    "content-type".to_string(),
                    "application/octet-stream".to_string(),
                ),
            ]),
            custom_metadata: Default::default(),
            data: Default::default(),
        }),
        link: None,
        position: None,
    }))
}

pub(crate) fn not_found(stream: &str) -> Result<ReadResp, ClientError> {
    content(read_resp::Content::StreamNotFound(read_resp::StreamNotFound {
        stream_identifier: Some(proto::StreamIdentifier::from_name(stream)),
    }))
}

pub(crate) fn confirmation(id: &str) -> Result<ReadResp, ClientError> {
    content(read_resp::Content::Confirmation(
        read_resp::SubscriptionConfirmation {
            subscription_id: id.to_string(),
        },
    ))
}

pub(crate) fn checkpoint(position: Position) -> Result<ReadResp, ClientError> {
    content(read_resp::Content::Checkpoint(read_resp::Checkpoint {
        commit_position: position.commit(),
        prepare_position: position.prepare(),
    }))
}
