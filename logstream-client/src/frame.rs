//! Connect streaming response decoding.
//!
//! [`FrameDecoder`] parses envelopes from a response byte stream and yields
//! decoded protobuf messages. Request bodies are built in
//! [`transport::RequestBody`](crate::transport::RequestBody).

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use logstream_core::{Code, Envelope, split_envelope};
use prost::Message;

use crate::ClientError;
use crate::error_parser::{ExceptionTable, parse_end_stream};

/// Stream adapter that decodes Connect envelopes.
///
/// Message envelopes are decoded as `T`. The end-stream envelope terminates
/// the stream; if it carries an error, that error (classified through the
/// [`ExceptionTable`]) is yielded as the final item.
pub struct FrameDecoder<S, T> {
    stream: S,
    /// Buffer for incomplete frames.
    buffer: BytesMut,
    exceptions: ExceptionTable,
    /// Whether the stream has finished (received EndStream or error).
    finished: bool,
    _marker: PhantomData<T>,
}

impl<S, T> FrameDecoder<S, T> {
    pub fn new(stream: S, exceptions: ExceptionTable) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            exceptions,
            finished: false,
            _marker: PhantomData,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<S, T> Unpin for FrameDecoder<S, T> where S: Unpin {}

impl<S, T> Stream for FrameDecoder<S, T>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Unpin,
    T: Message + Default,
{
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match split_envelope(&mut this.buffer) {
                Ok(Some(Envelope::Message(payload))) => {
                    let decoded = T::decode(payload).map_err(|e| {
                        ClientError::Decode(format!("protobuf decoding failed: {e}"))
                    });
                    if decoded.is_err() {
                        this.finished = true;
                    }
                    return Poll::Ready(Some(decoded));
                }
                Ok(Some(Envelope::EndStream(payload))) => {
                    this.finished = true;
                    return match parse_end_stream(&payload) {
                        Ok(None) => Poll::Ready(None),
                        Ok(Some(error)) => {
                            Poll::Ready(Some(Err(this.exceptions.classify(error))))
                        }
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
                Ok(None) => {
                    // Need more data
                }
                Err(e) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if !this.buffer.is_empty() {
                        return Poll::Ready(Some(Err(ClientError::new(
                            Code::DataLoss,
                            format!(
                                "stream ended with {} bytes of incomplete data",
                                this.buffer.len()
                            ),
                        ))));
                    }
                    return Poll::Ready(Some(Err(ClientError::Protocol(
                        "stream ended without EndStream frame".into(),
                    ))));
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}
