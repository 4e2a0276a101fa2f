//! Core protocol types for the logstream client.
//!
//! This crate holds everything that does not depend on a runtime or a
//! transport: status codes, Connect envelope framing, the protobuf wire
//! messages of the event log database, and the domain data model with its
//! wire conversions.
//!
//! ## Modules
//!
//! - [`error`]: Status codes and conversion errors
//! - [`envelope`]: Streaming envelope framing functions
//! - [`proto`]: Wire messages
//! - Data model: [`Position`], [`EventRecord`], [`ResolvedEvent`],
//!   [`EventData`], [`WriteResult`], [`StreamMessage`]

mod envelope;
mod error;
mod event;
mod message;
mod position;
pub mod proto;

pub use envelope::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use position::*;
