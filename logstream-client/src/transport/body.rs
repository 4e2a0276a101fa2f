//! Request bodies for the Connect transport.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use logstream_core::encode_envelope;
use prost::Message;
use tokio::sync::mpsc;

/// Where a duplex body gets its next envelope from.
trait EnvelopeSource: Send + Unpin {
    fn poll_envelope(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>>;
}

impl<M: Message + Send + 'static> EnvelopeSource for mpsc::Receiver<M> {
    fn poll_envelope(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.poll_recv(cx)
            .map(|message| message.map(|message| encode_envelope(&message)))
    }
}

enum Kind {
    Complete(Option<Bytes>),
    Duplex(Box<dyn EnvelopeSource>),
}

/// The body of one Connect request.
///
/// Unary and client-streaming calls know their whole body up front. The
/// duplex `BatchAppend` body owns the receiving end of the request queue
/// and envelopes each message when hyper asks for the next frame, so HTTP/2
/// flow control pushes back on the queue. It ends once every sender is
/// dropped.
pub struct RequestBody {
    kind: Kind,
}

impl RequestBody {
    /// A unary body: the bare encoded message.
    pub fn unary<M: Message>(message: &M) -> Self {
        Self::complete(Bytes::from(message.encode_to_vec()))
    }

    /// A streaming body sent in one go, one envelope per message.
    pub fn envelopes<'a, M, I>(messages: I) -> Self
    where
        M: Message + 'a,
        I: IntoIterator<Item = &'a M>,
    {
        let mut frames = BytesMut::new();
        for message in messages {
            frames.extend_from_slice(&encode_envelope(message));
        }
        Self::complete(frames.freeze())
    }

    /// A body fed from `messages` for as long as a sender is alive.
    pub fn duplex<M: Message + Send + 'static>(messages: mpsc::Receiver<M>) -> Self {
        RequestBody {
            kind: Kind::Duplex(Box::new(messages)),
        }
    }

    fn complete(bytes: Bytes) -> Self {
        RequestBody {
            kind: Kind::Complete(Some(bytes).filter(|bytes| !bytes.is_empty())),
        }
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        let next = match &mut self.get_mut().kind {
            Kind::Complete(bytes) => Poll::Ready(bytes.take()),
            Kind::Duplex(source) => source.poll_envelope(cx),
        };
        next.map(|bytes| bytes.map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Complete(bytes) => bytes.is_none(),
            Kind::Duplex(_) => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Complete(bytes) => {
                SizeHint::with_exact(bytes.as_ref().map_or(0, |bytes| bytes.len() as u64))
            }
            Kind::Duplex(_) => SizeHint::default(),
        }
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Complete(bytes) => f
                .debug_struct("RequestBody")
                .field("len", &bytes.as_ref().map_or(0, Bytes::len))
                .finish(),
            Kind::Duplex(_) => f.write_str("RequestBody(duplex)"),
        }
    }
}
