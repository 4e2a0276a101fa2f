//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::config::BackoffPolicy;
use crate::error_parser::ExceptionTable;
use crate::transport::{ConnectChannel, ConnectProvider, ConnectionProvider};

/// Default upper bound on the event bytes carried by one batch append chunk.
pub const DEFAULT_MAX_APPEND_SIZE: usize = 1024 * 1024;

/// Default capacity of the shared batch append request queue, in chunks.
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 64;

/// Resolved client configuration.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub(crate) endpoint: Option<String>,
    pub(crate) default_deadline: Option<Duration>,
    pub(crate) max_append_size: usize,
    pub(crate) request_queue_capacity: usize,
    pub(crate) throw_on_append_failure: bool,
    pub(crate) batch_append_backoff: BackoffPolicy,
    pub(crate) exceptions: ExceptionTable,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            default_deadline: None,
            max_append_size: DEFAULT_MAX_APPEND_SIZE,
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
            throw_on_append_failure: false,
            batch_append_backoff: BackoffPolicy::default(),
            exceptions: ExceptionTable::default(),
        }
    }
}

impl ClientSettings {
    /// The server endpoint, when the client was built with the Connect
    /// transport.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn default_deadline(&self) -> Option<Duration> {
        self.default_deadline
    }

    pub fn max_append_size(&self) -> usize {
        self.max_append_size
    }

    pub fn request_queue_capacity(&self) -> usize {
        self.request_queue_capacity
    }

    pub fn throw_on_append_failure(&self) -> bool {
        self.throw_on_append_failure
    }

    pub fn batch_append_backoff(&self) -> &BackoffPolicy {
        &self.batch_append_backoff
    }

    pub fn exceptions(&self) -> &ExceptionTable {
        &self.exceptions
    }
}

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use logstream_client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new("http://localhost:2113")
///     .default_deadline(Duration::from_secs(10))
///     .throw_on_append_failure(true)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    endpoint: String,
    settings: ClientSettings,
}

impl ClientBuilder {
    /// Create a builder for the server at `endpoint`, e.g.
    /// `http://localhost:2113`.
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into(),
            settings: ClientSettings::default(),
        }
    }

    /// Deadline applied to every call that does not set its own.
    ///
    /// The deadline is propagated to the server via the `Connect-Timeout-Ms`
    /// header. The maximum supported value is about 115 days; larger values
    /// are treated as no deadline.
    pub fn default_deadline(mut self, deadline: Duration) -> Self {
        self.settings.default_deadline = Some(deadline);
        self
    }

    /// Upper bound on the event bytes (payload plus custom metadata) sent in
    /// one batch append chunk. Larger appends are split.
    pub fn max_append_size(mut self, bytes: usize) -> Self {
        self.settings.max_append_size = bytes;
        self
    }

    /// Capacity of the batch append request queue shared by all concurrent
    /// appends, in chunks.
    pub fn request_queue_capacity(mut self, capacity: usize) -> Self {
        self.settings.request_queue_capacity = capacity;
        self
    }

    /// Return append conflicts as
    /// [`ClientError::WrongExpectedVersion`](crate::ClientError::WrongExpectedVersion).
    pub fn throw_on_append_failure(mut self, throw: bool) -> Self {
        self.settings.throw_on_append_failure = throw;
        self
    }

    /// Delays between replacements of a failed batch append stream.
    pub fn batch_append_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.settings.batch_append_backoff = policy;
        self
    }

    /// How server exception names map onto [`ClientError`](crate::ClientError)
    /// variants.
    pub fn exception_table(mut self, table: ExceptionTable) -> Self {
        self.settings.exceptions = table;
        self
    }

    fn validate(&self) -> Result<(), ClientBuildError> {
        if self.settings.max_append_size == 0 {
            return Err(ClientBuildError::InvalidSettings(
                "max_append_size must be greater than zero",
            ));
        }
        if self.settings.request_queue_capacity == 0 {
            return Err(ClientBuildError::InvalidSettings(
                "request_queue_capacity must be greater than zero",
            ));
        }
        self.settings
            .batch_append_backoff
            .validate()
            .map_err(ClientBuildError::InvalidSettings)
    }

    /// Build a client speaking Connect over HTTP/2 cleartext.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an `http://` URL or a setting
    /// is out of range.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        self.validate()?;

        let uri: http::Uri = self
            .endpoint
            .parse()
            .map_err(|e| ClientBuildError::InvalidEndpoint(format!("{}: {e}", self.endpoint)))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(scheme) => return Err(ClientBuildError::UnsupportedScheme(scheme.to_string())),
            None => {
                return Err(ClientBuildError::InvalidEndpoint(format!(
                    "{}: missing scheme",
                    self.endpoint
                )));
            }
        }

        let channel = ConnectChannel::new(self.endpoint.clone(), self.settings.exceptions.clone());
        let mut settings = self.settings;
        settings.endpoint = Some(channel.base_url().to_string());
        Ok(Client::new(Arc::new(ConnectProvider::new(channel)), settings))
    }

    /// Build a client on top of a caller-supplied transport. The endpoint
    /// is ignored.
    pub fn build_with_provider(
        self,
        provider: Arc<dyn ConnectionProvider>,
    ) -> Result<Client, ClientBuildError> {
        self.validate()?;
        Ok(Client::new(provider, self.settings))
    }
}

/// Error type for client building failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),

    /// Only cleartext HTTP/2 is supported.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),
}
