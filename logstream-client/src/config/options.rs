//! Call options for per-request configuration.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Options shared by every operation.
///
/// # Example
///
/// ```ignore
/// use logstream_client::CallOptions;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let cancel = CancellationToken::new();
/// let options = CallOptions::new()
///     .deadline(Duration::from_secs(5))
///     .requires_leader(true)
///     .cancellation(cancel.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// If set, overrides the client's default deadline.
    pub(crate) deadline: Option<Duration>,
    pub(crate) requires_leader: bool,
    pub(crate) cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline for this call.
    ///
    /// The deadline is propagated to the server via the `Connect-Timeout-Ms`
    /// header, and for batch appends through the request options as well.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Require the call to be served by the cluster leader.
    pub fn requires_leader(mut self, requires_leader: bool) -> Self {
        self.requires_leader = requires_leader;
        self
    }

    /// Cancel the call when `token` fires.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn get_deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn get_requires_leader(&self) -> bool {
        self.requires_leader
    }

    /// A token scoped to this call: a child of the caller's token, or a
    /// fresh one when none was given.
    pub(crate) fn child_token(&self) -> CancellationToken {
        self.cancel
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default()
    }

    /// Fill in the deadline from the client default when none was set.
    pub(crate) fn with_default_deadline(mut self, default: Option<Duration>) -> Self {
        if self.deadline.is_none() {
            self.deadline = default;
        }
        self
    }
}

/// Maximum timeout value in milliseconds (10 digits = 9,999,999,999 ms ≈ 115 days).
/// Values larger than this are treated as "no timeout" per Connect protocol spec.
pub(crate) const MAX_TIMEOUT_MS: u128 = 9_999_999_999;

/// Convert a Duration to the Connect-Timeout-Ms header value.
///
/// Returns None if the timeout is too large (> 10 digits) or zero.
pub(crate) fn duration_to_timeout_header(duration: Duration) -> Option<String> {
    let millis = duration.as_millis();
    if millis == 0 || millis > MAX_TIMEOUT_MS {
        return None;
    }
    Some(millis.to_string())
}
