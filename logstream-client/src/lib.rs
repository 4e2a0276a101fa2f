//! Client for an append-only event log database.
//!
//! This crate talks to the server's streams service over the Connect
//! protocol (protobuf over HTTP/2). It provides:
//!
//! - Appends under optimistic concurrency, multiplexed over one shared
//!   batch append stream when the server supports it
//! - Reads of one stream or of the whole log, forwards or backwards
//! - Catch-up subscriptions to one stream or to the whole log, with
//!   server-side filters
//!
//! ## Example
//!
//! ```ignore
//! use logstream_client::{
//!     AppendToStreamOptions, ClientBuilder, EventData, ExpectedRevision, ReadStreamOptions,
//! };
//! use futures::StreamExt;
//!
//! let client = ClientBuilder::new("http://localhost:2113").build()?;
//!
//! let result = client
//!     .append_to_stream(
//!         "orders-1",
//!         &AppendToStreamOptions::new().expected_revision(ExpectedRevision::NoStream),
//!         [EventData::json("OrderPlaced", &order)?],
//!     )
//!     .await?;
//!
//! let read = client.read_stream("orders-1", &ReadStreamOptions::new());
//! let mut events = read.events()?;
//! while let Some(event) = events.next().await {
//!     let event = event?;
//!     println!("{} @ {}", event.original_event().event_type, event.original_revision());
//! }
//! ```
//!
//! ## Subscriptions
//!
//! ```ignore
//! use logstream_client::{HandlerError, ResolvedEvent, SubscribeToAllOptions, SubscriptionFilter};
//!
//! let subscription = client
//!     .subscribe_to_all(
//!         &SubscribeToAllOptions::new().filter(SubscriptionFilter::exclude_system_events()),
//!         |event: ResolvedEvent| async move {
//!             project(&event).await.map_err(HandlerError::failed)
//!         },
//!         |reason, error| tracing::warn!(?reason, ?error, "subscription dropped"),
//!     )
//!     .await?;
//!
//! // Later
//! subscription.dispose();
//! ```
//!
//! ## Cancellation
//!
//! Every operation takes [`CallOptions`] carrying an optional
//! [`CancellationToken`](tokio_util::sync::CancellationToken). Cancelling
//! the token stops the call: reads yield [`ClientError::Cancelled`] once and
//! end, subscriptions drop with [`DropReason::Disposed`], and appends
//! return [`ClientError::Cancelled`].
//!
//! ## Custom transports
//!
//! [`ClientBuilder::build_with_provider`] accepts any
//! [`ConnectionProvider`](transport::ConnectionProvider), which is how tests
//! run the client against an in-memory server.

mod batch;
mod builder;
mod client;
pub mod config;
mod error;
mod error_parser;
mod frame;
mod options;
pub mod read;
mod request;
pub mod subscription;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use builder::{
    ClientBuildError, ClientBuilder, ClientSettings, DEFAULT_MAX_APPEND_SIZE,
    DEFAULT_REQUEST_QUEUE_CAPACITY,
};
pub use client::Client;
pub use config::{BackoffPolicy, CallOptions, ExponentialBackoff};
pub use error::ClientError;
pub use error_parser::{ErrorKind, ExceptionTable, EXCEPTION_KEY};
pub use frame::FrameDecoder;
pub use options::{
    AppendToStreamOptions, FilterTarget, ReadAllOptions, ReadStreamOptions,
    SubscribeToAllOptions, SubscribeToStreamOptions, SubscriptionFilter,
};
pub use read::{Events, Messages, ReadMode, ReadState, ReadStream};
pub use subscription::{BoxError, DropReason, HandlerError, Subscription, SubscriptionHandler};

// Re-export the data model
pub use logstream_core::{
    CurrentRevision, Direction, EventData, EventRecord, ExpectedRevision, Position,
    ResolvedEvent, StreamMessage, StreamPosition, SubscriptionStart, WriteResult,
};

// Re-export commonly used external types
pub use bytes::Bytes;
pub use tokio_util::sync::CancellationToken;
