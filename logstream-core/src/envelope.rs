//! Connect streaming envelope framing.
//!
//! Streaming calls carry one protobuf message per envelope:
//!
//! ```text
//! [flags:1][length:4][payload:length]
//! ```
//!
//! The server closes every streaming response with an end-stream envelope
//! whose payload is a JSON document holding the call's error and trailers.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EnvelopeError;

/// Connect streaming envelope flags.
pub mod envelope_flags {
    /// Regular message.
    pub const MESSAGE: u8 = 0x00;
    /// Compressed message (never negotiated by this client).
    pub const COMPRESSED: u8 = 0x01;
    /// End of stream.
    pub const END_STREAM: u8 = 0x02;
}

/// Envelope header size (flags + length).
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// A complete envelope split from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A message payload.
    Message(Bytes),
    /// The end-stream payload (JSON).
    EndStream(Bytes),
}

/// Wrap a payload in a message envelope.
pub fn wrap_envelope(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    frame.put_u8(envelope_flags::MESSAGE);
    frame.put_u32(payload.len() as u32);
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Encode a protobuf message into a message envelope.
pub fn encode_envelope<M: prost::Message>(message: &M) -> Bytes {
    wrap_envelope(&message.encode_to_vec())
}

/// Parse an envelope header.
///
/// Returns `(flags, length)`.
pub fn parse_envelope_header(data: &[u8]) -> Result<(u8, u32), EnvelopeError> {
    if data.len() < ENVELOPE_HEADER_SIZE {
        return Err(EnvelopeError::IncompleteHeader {
            expected: ENVELOPE_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let flags = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);

    Ok((flags, length))
}

/// Split the next complete envelope off the front of `buffer`.
///
/// Returns `Ok(None)` when more bytes are needed.
pub fn split_envelope(buffer: &mut BytesMut) -> Result<Option<Envelope>, EnvelopeError> {
    if buffer.len() < ENVELOPE_HEADER_SIZE {
        return Ok(None);
    }

    let (flags, length) = parse_envelope_header(buffer)?;
    if flags != envelope_flags::MESSAGE && flags != envelope_flags::END_STREAM {
        return Err(EnvelopeError::InvalidFlags(flags));
    }

    let frame_size = ENVELOPE_HEADER_SIZE + length as usize;
    if buffer.len() < frame_size {
        return Ok(None);
    }

    let mut frame = buffer.split_to(frame_size);
    let payload = frame.split_off(ENVELOPE_HEADER_SIZE).freeze();

    Ok(Some(if flags == envelope_flags::END_STREAM {
        Envelope::EndStream(payload)
    } else {
        Envelope::Message(payload)
    }))
}
