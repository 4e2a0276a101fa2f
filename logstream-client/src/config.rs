//! Configuration modules for the client.
//!
//! This module contains request-level configuration:
//! - [`CallOptions`]: Per-call deadline, leader requirement and cancellation
//! - [`BackoffPolicy`]: Exponential backoff for batch append stream replacement

mod backoff;
mod options;

pub use backoff::{defaults, BackoffPolicy, ExponentialBackoff};
pub use options::CallOptions;
pub(crate) use options::duration_to_timeout_header;
