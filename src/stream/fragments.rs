use super::session::{StreamSession, StreamState};
use crate::error::StreamError;
use bytes::Bytes;
use futures::{ready, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Lazy, finite sequence of decoded text fragments read from a byte stream.
///
/// Fragments are yielded as soon as a chunk decodes, so everything read
/// before a transport error has already reached the caller when the error
/// is surfaced. After the error, or after end of stream, it yields `None`.
/// Dropping it drops the underlying connection.
pub struct FragmentStream {
    bytes: ByteStream,
    session: StreamSession,
}

impl FragmentStream {
    pub fn new<S, E>(bytes: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<StreamError>,
    {
        Self {
            bytes: Box::pin(bytes.map(|chunk| chunk.map_err(Into::into))),
            session: StreamSession::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.session.state()
    }

    /// All text decoded so far
    pub fn text(&self) -> &str {
        self.session.text()
    }
}

impl Stream for FragmentStream {
    type Item = Result<String, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.session.is_terminal() {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.bytes.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let text = this.session.on_bytes(&chunk);
                    if !text.is_empty() {
                        return Poll::Ready(Some(Ok(text)));
                    }
                }
                Some(Err(e)) => {
                    this.session.fail();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    let tail = this.session.complete();
                    return Poll::Ready(if tail.is_empty() { None } else { Some(Ok(tail)) });
                }
            }
        }
    }
}
