//! Client error types.
//!
//! This module provides [`ClientError`], the error type of every client
//! operation.

use logstream_core::{Code, ConversionError, CurrentRevision, EnvelopeError, ExpectedRevision};

/// Client error variants.
///
/// Server-reported failures that belong to a known category (see
/// [`ExceptionTable`](crate::ExceptionTable)) get their own variant. Anything
/// else the server reports is a [`ClientError::Status`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// A status error reported by the server.
    #[error("{code}: {message}")]
    Status { code: Code, message: String },

    /// An append's expected revision did not match the stream.
    #[error(
        "wrong expected version on stream {stream}: expected {expected}, current {current}"
    )]
    WrongExpectedVersion {
        stream: String,
        expected: ExpectedRevision,
        current: CurrentRevision,
    },

    #[error("stream {0} not found")]
    StreamNotFound(String),

    #[error("stream {0} is deleted")]
    StreamDeleted(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("maximum append size exceeded")]
    MaximumAppendSizeExceeded,

    /// The operation requires a leader and the node is not one.
    #[error("not leader: {0}")]
    NotLeader(String),

    /// Transport-level error (connection failed, timeout, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// Message encoding error.
    #[error("encode error: {0}")]
    Encode(String),

    /// Message decoding error.
    #[error("decode error: {0}")]
    Decode(String),

    /// Protocol error (malformed frames, unexpected messages, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The message view of a read was already taken.
    #[error("read messages have already been consumed")]
    AlreadyConsumed,
}

impl ClientError {
    /// Create a new status error with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        ClientError::Status {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    ///
    /// For variants other than `Status`:
    /// - Transport and `NotLeader`: `Unavailable`
    /// - Encode/Decode: `Internal`
    /// - Protocol: `InvalidArgument`
    pub fn code(&self) -> Code {
        match self {
            ClientError::Status { code, .. } => *code,
            ClientError::WrongExpectedVersion { .. } | ClientError::StreamDeleted(_) => {
                Code::FailedPrecondition
            }
            ClientError::StreamNotFound(_) => Code::NotFound,
            ClientError::AccessDenied(_) => Code::PermissionDenied,
            ClientError::NotAuthenticated(_) => Code::Unauthenticated,
            ClientError::MaximumAppendSizeExceeded => Code::InvalidArgument,
            ClientError::NotLeader(_) | ClientError::Transport(_) => Code::Unavailable,
            ClientError::Encode(_) | ClientError::Decode(_) => Code::Internal,
            ClientError::Protocol(_) => Code::InvalidArgument,
            ClientError::Cancelled => Code::Canceled,
            ClientError::AlreadyConsumed => Code::FailedPrecondition,
        }
    }

    /// Returns whether this error indicates a transient condition that may
    /// be resolved by retrying.
    ///
    /// This is a convenience wrapper for [`Code::is_retryable()`].
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

impl From<ConversionError> for ClientError {
    fn from(err: ConversionError) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<prost::DecodeError> for ClientError {
    fn from(err: prost::DecodeError) -> Self {
        ClientError::Decode(err.to_string())
    }
}
