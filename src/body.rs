//! # Body Module
//!
//! The byte-stream body type used by every request and response in the
//! pipeline. `Body` boxes any [`http_body::Body`] producing `Bytes` chunks,
//! so handlers, middleware and the transport all speak the same type while
//! streaming transforms (compression, decompression) stay pull-based with
//! backpressure.

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::{Frame, SizeHint};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Empty, Full, StreamBody};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::BoxError;

/// The request/response body type of the pipeline.
///
/// A `Body` is an opaque, boxed byte stream with a size hint. The size hint
/// distinguishes bodies whose exact length is known (buffered payloads) from
/// bounded and unbounded streams; the compression layer and the
/// `Content-Length` normalization in [`Route`](crate::routing::Route) rely on
/// that distinction.
pub struct Body(UnsyncBoxBody<Bytes, BoxError>);

impl Body {
    /// Box an arbitrary [`http_body::Body`] into the pipeline body type.
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(Into::into).boxed_unsync())
    }

    /// An empty body with an exact size hint of zero.
    pub fn empty() -> Self {
        Self::new(Empty::new())
    }

    /// A body backed by a stream of byte chunks.
    ///
    /// The resulting body has an unbounded size hint: consumers that need an
    /// exact length (for example `Content-Length` insertion) will not find
    /// one here.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self::new(StreamBody::new(stream.map_ok(Frame::data)))
    }

    /// Drain the body into a single `Bytes` buffer.
    pub async fn collect_bytes(self) -> Result<Bytes, BoxError> {
        Ok(BodyExt::collect(self).await?.to_bytes())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().0).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Self::new(Full::new(Bytes::from_static(value.as_bytes())))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::new(Full::new(Bytes::from(value)))
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::new(Full::new(value))
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::new(Full::new(Bytes::from(value)))
    }
}

impl From<&'static [u8]> for Body {
    fn from(value: &'static [u8]) -> Self {
        Self::new(Full::new(Bytes::from_static(value)))
    }
}
