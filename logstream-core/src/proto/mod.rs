//! Protobuf wire messages.
//!
//! Message layouts follow the server's `.proto` definitions; only the
//! services used by the client are present.

pub mod server_features;
pub mod shared;
pub mod streams;

pub use shared::{AllStreamPosition, Empty, Status, StreamIdentifier, Uuid, WrongExpectedVersion};
pub use streams::{AppendReq, AppendResp, BatchAppendReq, BatchAppendResp, ReadReq, ReadResp};

/// Fully qualified streams service name.
pub const STREAMS_SERVICE: &str = "event_store.client.streams.Streams";

/// Fully qualified server features service name.
pub const SERVER_FEATURES_SERVICE: &str = "event_store.client.server_features.ServerFeatures";

impl From<uuid::Uuid> for Uuid {
    fn from(id: uuid::Uuid) -> Self {
        let bits = id.as_u128();
        Uuid {
            value: Some(shared::uuid::Value::Structured(shared::uuid::Structured {
                most_significant_bits: (bits >> 64) as i64,
                least_significant_bits: bits as i64,
            })),
        }
    }
}

impl TryFrom<Uuid> for uuid::Uuid {
    type Error = crate::ConversionError;

    fn try_from(id: Uuid) -> Result<Self, Self::Error> {
        match id.value {
            Some(shared::uuid::Value::Structured(s)) => {
                let high = (s.most_significant_bits as u64 as u128) << 64;
                let low = s.least_significant_bits as u64 as u128;
                Ok(uuid::Uuid::from_u128(high | low))
            }
            Some(shared::uuid::Value::String(s)) => uuid::Uuid::parse_str(&s)
                .map_err(|e| crate::ConversionError::InvalidUuid(e.to_string())),
            None => Err(crate::ConversionError::MissingField("uuid.value")),
        }
    }
}

impl StreamIdentifier {
    /// Build an identifier from a stream name.
    pub fn from_name(name: &str) -> Self {
        StreamIdentifier {
            stream_name: name.as_bytes().to_vec(),
        }
    }

    /// The stream name, replacing invalid UTF-8.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.stream_name).into_owned()
    }
}
