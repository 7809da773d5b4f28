//! Response body types supporting buffered, streaming and empty modes.
//!
//! [`ResponseBody`] is the body type of every response the server produces:
//!
//! - **Buffered**: small generated payloads such as error pages and directory listings.
//! - **Streaming**: object contents, pulled from the store chunk by chunk.
//! - **Empty**: `HEAD` responses, `304 Not Modified`, redirects.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bucketsite_core::store::ObjectStream;
use bytes::Bytes;
use futures::Stream;
use http_body_util::Full;

/// HTTP response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Default)]
pub enum ResponseBody {
    /// Buffered body for generated content.
    Buffered(Full<Bytes>),
    /// Object bytes streamed from the store. Dropping the body drops the
    /// stream, which ends the store read.
    Streaming {
        /// The object byte stream.
        stream: ObjectStream,
        /// Bytes not yet yielded.
        remaining: u64,
    },
    /// Empty body.
    #[default]
    Empty,
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(full) => f.debug_tuple("Buffered").field(full).finish(),
            Self::Streaming { remaining, .. } => f
                .debug_struct("Streaming")
                .field("remaining", remaining)
                .finish_non_exhaustive(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl ResponseBody {
    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a streaming body that yields exactly `len` bytes.
    #[must_use]
    pub fn from_stream(stream: ObjectStream, len: u64) -> Self {
        Self::Streaming {
            stream,
            remaining: len,
        }
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming { stream, remaining } => match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    *remaining = remaining.saturating_sub(chunk.len() as u64);
                    Poll::Ready(Some(Ok(http_body::Frame::data(chunk))))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming { remaining, .. } => *remaining == 0,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming { remaining, .. } => http_body::SizeHint::with_exact(*remaining),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
