//! Server error parsing and classification.
//!
//! The server reports failures in two places: the JSON body of a failed
//! unary response, and the end-stream envelope of a streaming response. Both
//! carry a Connect code, a message, and metadata. The `exception` metadata
//! key names the server's error category, which the [`ExceptionTable`] maps
//! onto a [`ClientError`] variant.

use std::collections::HashMap;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use logstream_core::proto::Status;
use logstream_core::{Code, CurrentRevision, ExpectedRevision};
use serde::Deserialize;

use crate::ClientError;

/// Metadata key naming the server error category.
pub const EXCEPTION_KEY: &str = "exception";

const STREAM_NAME_KEY: &str = "stream-name";
const EXPECTED_VERSION_KEY: &str = "expected-version";
const ACTUAL_VERSION_KEY: &str = "actual-version";
const LEADER_HOST_KEY: &str = "leader-endpoint-host";
const LEADER_PORT_KEY: &str = "leader-endpoint-port";

/// Local error categories a server exception can map to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    NotAuthenticated,
    StreamDeleted,
    StreamNotFound,
    MaximumAppendSizeExceeded,
    NotLeader,
    WrongExpectedVersion,
}

/// Immutable lookup from server exception names to [`ErrorKind`]s.
///
/// Cloning is cheap. [`ExceptionTable::with_entry`] returns a new table and
/// leaves the original untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionTable {
    entries: Arc<HashMap<String, ErrorKind>>,
}

impl Default for ExceptionTable {
    fn default() -> Self {
        ExceptionTable::new([
            ("access-denied", ErrorKind::AccessDenied),
            ("not-authenticated", ErrorKind::NotAuthenticated),
            ("stream-deleted", ErrorKind::StreamDeleted),
            ("stream-not-found", ErrorKind::StreamNotFound),
            (
                "maximum-append-size-exceeded",
                ErrorKind::MaximumAppendSizeExceeded,
            ),
            ("not-leader", ErrorKind::NotLeader),
            ("wrong-expected-version", ErrorKind::WrongExpectedVersion),
        ])
    }
}

impl ExceptionTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ErrorKind)>,
        S: Into<String>,
    {
        ExceptionTable {
            entries: Arc::new(
                entries
                    .into_iter()
                    .map(|(name, kind)| (name.into(), kind))
                    .collect(),
            ),
        }
    }

    /// A table that maps nothing; every server error becomes a status error.
    pub fn empty() -> Self {
        ExceptionTable::new(std::iter::empty::<(String, ErrorKind)>())
    }

    /// A copy of this table with `name` mapped to `kind`.
    pub fn with_entry(&self, name: impl Into<String>, kind: ErrorKind) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(name.into(), kind);
        ExceptionTable {
            entries: Arc::new(entries),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ErrorKind> {
        self.entries.get(name).copied()
    }

    /// Turn a server-reported error into a [`ClientError`].
    pub(crate) fn classify(&self, error: ServerError) -> ClientError {
        let ServerError {
            code,
            message,
            metadata,
        } = error;
        let stream = || {
            metadata
                .get(STREAM_NAME_KEY)
                .cloned()
                .unwrap_or_else(|| message.clone())
        };

        let kind = metadata
            .get(EXCEPTION_KEY)
            .and_then(|name| self.lookup(name));

        match kind {
            Some(ErrorKind::AccessDenied) => ClientError::AccessDenied(message),
            Some(ErrorKind::NotAuthenticated) => ClientError::NotAuthenticated(message),
            Some(ErrorKind::StreamDeleted) => ClientError::StreamDeleted(stream()),
            Some(ErrorKind::StreamNotFound) => ClientError::StreamNotFound(stream()),
            Some(ErrorKind::MaximumAppendSizeExceeded) => ClientError::MaximumAppendSizeExceeded,
            Some(ErrorKind::NotLeader) => {
                let leader = match (metadata.get(LEADER_HOST_KEY), metadata.get(LEADER_PORT_KEY)) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    _ => message,
                };
                ClientError::NotLeader(leader)
            }
            Some(ErrorKind::WrongExpectedVersion) => ClientError::WrongExpectedVersion {
                stream: stream(),
                expected: metadata
                    .get(EXPECTED_VERSION_KEY)
                    .map(|v| parse_expected_version(v))
                    .unwrap_or(ExpectedRevision::Any),
                current: metadata
                    .get(ACTUAL_VERSION_KEY)
                    .map(|v| parse_actual_version(v))
                    .unwrap_or(CurrentRevision::NoStream),
            },
            None => match code {
                Code::PermissionDenied => ClientError::AccessDenied(message),
                Code::Unauthenticated => ClientError::NotAuthenticated(message),
                _ => ClientError::Status { code, message },
            },
        }
    }
}

/// An error reported by the server, before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ServerError {
    pub code: Code,
    pub message: String,
    pub metadata: HashMap<String, String>,
}

/// JSON structure for Connect error objects.
#[derive(Deserialize)]
struct ErrorJson {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

/// JSON structure of the end-stream envelope payload.
#[derive(Deserialize)]
struct EndStreamJson {
    #[serde(default)]
    error: Option<ErrorJson>,
    #[serde(default)]
    metadata: HashMap<String, Vec<String>>,
}

/// Parse an end-stream payload. Returns `Ok(None)` when the stream ended
/// successfully.
pub(crate) fn parse_end_stream(payload: &[u8]) -> Result<Option<ServerError>, ClientError> {
    if payload.is_empty() {
        return Ok(None);
    }

    let end: EndStreamJson = serde_json::from_slice(payload)
        .map_err(|e| ClientError::Protocol(format!("invalid end-stream message: {e}")))?;

    Ok(end.error.map(|error| ServerError {
        code: error.code.parse().unwrap_or(Code::Unknown),
        message: error.message.unwrap_or_default(),
        metadata: end
            .metadata
            .into_iter()
            .filter_map(|(key, values)| {
                let first = values.into_iter().next()?;
                Some((key.to_ascii_lowercase(), first))
            })
            .collect(),
    }))
}

/// Parse a failed unary or stream-opening response.
///
/// If the body is not a Connect error document, the code is derived from
/// the HTTP status.
pub(crate) fn parse_error_body(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ServerError {
    let metadata = metadata_from_headers(headers);

    match serde_json::from_slice::<ErrorJson>(body) {
        Ok(error) => ServerError {
            code: error
                .code
                .parse()
                .unwrap_or_else(|_| http_status_to_code(status)),
            message: error.message.unwrap_or_default(),
            metadata,
        },
        Err(_) => {
            let message = std::str::from_utf8(body)
                .ok()
                .filter(|text| !text.is_empty())
                .or_else(|| status.canonical_reason())
                .unwrap_or("unknown error")
                .to_string();
            ServerError {
                code: http_status_to_code(status),
                message,
                metadata,
            }
        }
    }
}

/// Collect response headers as error metadata. Connect sends unary trailers
/// as `trailer-` prefixed headers.
fn metadata_from_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str();
            let key = name.strip_prefix("trailer-").unwrap_or(name);
            Some((key.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

/// Turn the status of a failed batch append into a server error.
///
/// The detail's type name (`...StreamDeleted`) becomes the exception name
/// (`stream-deleted`).
pub(crate) fn batch_status_error(stream: &str, status: Status) -> ServerError {
    let mut metadata = HashMap::from([(STREAM_NAME_KEY.to_string(), stream.to_string())]);
    if let Some(detail) = &status.details {
        if let Some(name) = detail.type_url.rsplit(['.', '/']).next() {
            metadata.insert(EXCEPTION_KEY.to_string(), exception_name(name));
        }
    }
    ServerError {
        code: Code::from_i32(status.code),
        message: status.message,
        metadata,
    }
}

fn exception_name(type_name: &str) -> String {
    let mut name = String::with_capacity(type_name.len() + 4);
    for (i, c) in type_name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                name.push('-');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// Map HTTP status code to Connect error code.
///
/// This is used as a fallback when the response body doesn't contain
/// a valid Connect error JSON.
pub(crate) fn http_status_to_code(status: StatusCode) -> Code {
    match status.as_u16() {
        200 => Code::Ok,
        400 => Code::InvalidArgument,
        401 => Code::Unauthenticated,
        403 => Code::PermissionDenied,
        404 => Code::Unimplemented,
        408 => Code::DeadlineExceeded,
        409 => Code::AlreadyExists,
        412 => Code::FailedPrecondition,
        416 => Code::OutOfRange,
        429 => Code::ResourceExhausted,
        499 => Code::Canceled,
        500 => Code::Internal,
        501 => Code::Unimplemented,
        502..=504 => Code::Unavailable,
        _ => Code::Unknown,
    }
}

fn parse_expected_version(value: &str) -> ExpectedRevision {
    match value.parse::<i64>() {
        Ok(revision) if revision >= 0 => ExpectedRevision::Exact(revision as u64),
        Ok(-1) => ExpectedRevision::NoStream,
        Ok(-4) => ExpectedRevision::StreamExists,
        _ => ExpectedRevision::Any,
    }
}

fn parse_actual_version(value: &str) -> CurrentRevision {
    match value.parse::<i64>() {
        Ok(revision) if revision >= 0 => CurrentRevision::Current(revision as u64),
        _ => CurrentRevision::NoStream,
    }
}
