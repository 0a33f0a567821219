//! Response compression negotiated from `Accept-Encoding`.
//!
//! The layer inspects the request's `Accept-Encoding`, calls the inner
//! service, and compresses the response body with the selected algorithm
//! unless the response is already encoded, carries a `Content-Range`, or
//! the configured predicate declines it. Compressed responses drop their
//! `Content-Length`, gain a `Content-Encoding`, and have `accept-encoding`
//! appended to `Vary`.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::error::BoxError;
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

mod body;
pub(crate) mod encoding;

pub use self::body::{CompressedBody, DecompressedBody};
pub use self::encoding::Encoding;

pub(crate) use self::encoding::AcceptedEncodings;

/// Quality/speed trade-off applied to every algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    Fastest,
    #[default]
    Default,
    Best,
    /// An algorithm-specific numeric level, clamped to each codec's range.
    Precise(i32),
}

impl CompressionLevel {
    pub(crate) fn gzip(self) -> u32 {
        match self {
            CompressionLevel::Fastest => 1,
            CompressionLevel::Default => 6,
            CompressionLevel::Best => 9,
            CompressionLevel::Precise(level) => level.clamp(0, 9) as u32,
        }
    }

    pub(crate) fn brotli(self) -> u32 {
        match self {
            CompressionLevel::Fastest => 1,
            CompressionLevel::Default => 4,
            CompressionLevel::Best => 11,
            CompressionLevel::Precise(level) => level.clamp(0, 11) as u32,
        }
    }

    pub(crate) fn zstd(self) -> i32 {
        match self {
            CompressionLevel::Fastest => 1,
            CompressionLevel::Default => 3,
            CompressionLevel::Best => 19,
            CompressionLevel::Precise(level) => level.clamp(1, 21),
        }
    }
}

/// Decides whether a particular response is worth compressing.
pub trait Predicate: Send + Sync + 'static {
    fn should_compress(&self, response: &Response) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Response) -> bool + Send + Sync + 'static,
{
    fn should_compress(&self, response: &Response) -> bool {
        self(response)
    }
}

/// Default policy: skip gRPC, images other than SVG, server-sent event
/// streams, and bodies whose exact size is below a threshold. Bodies of
/// unknown total size are compressed.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPredicate {
    min_size: u64,
}

impl Default for DefaultPredicate {
    fn default() -> Self {
        Self { min_size: 32 }
    }
}

impl DefaultPredicate {
    pub fn min_size(min_size: u64) -> Self {
        Self { min_size }
    }
}

impl Predicate for DefaultPredicate {
    fn should_compress(&self, response: &Response) -> bool {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("application/grpc") {
            return false;
        }
        if content_type.starts_with("image/") && !content_type.starts_with("image/svg+xml") {
            return false;
        }
        if content_type.starts_with("text/event-stream") {
            return false;
        }

        match response.body().size_hint().exact() {
            Some(size) => size >= self.min_size,
            None => true,
        }
    }
}

/// Layer that applies [`CompressionService`] around a service.
#[derive(Clone)]
pub struct CompressionLayer {
    accepted: AcceptedEncodings,
    level: CompressionLevel,
    predicate: Arc<dyn Predicate>,
}

impl Default for CompressionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionLayer {
    pub fn new() -> Self {
        Self {
            accepted: AcceptedEncodings::default(),
            level: CompressionLevel::Default,
            predicate: Arc::new(DefaultPredicate::default()),
        }
    }

    pub fn gzip(mut self, enable: bool) -> Self {
        self.accepted.gzip = enable;
        self
    }

    pub fn deflate(mut self, enable: bool) -> Self {
        self.accepted.deflate = enable;
        self
    }

    pub fn br(mut self, enable: bool) -> Self {
        self.accepted.brotli = enable;
        self
    }

    pub fn zstd(mut self, enable: bool) -> Self {
        self.accepted.zstd = enable;
        self
    }

    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Replace the default skip policy.
    pub fn compress_when<P>(mut self, predicate: P) -> Self
    where
        P: Predicate,
    {
        self.predicate = Arc::new(predicate);
        self
    }
}

impl Layer for CompressionLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        Arc::new(CompressionService {
            inner,
            accepted: self.accepted,
            level: self.level,
            predicate: Arc::clone(&self.predicate),
        })
    }
}

/// Service produced by [`CompressionLayer`].
pub struct CompressionService {
    inner: ArcService,
    accepted: AcceptedEncodings,
    level: CompressionLevel,
    predicate: Arc<dyn Predicate>,
}

#[async_trait]
impl Service for CompressionService {
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        let selected = encoding::preferred_encoding(req.headers(), self.accepted);

        let mut response = self.inner.call(req).await?;

        let encoding = match selected {
            Some(encoding) if encoding != Encoding::Identity => encoding,
            _ => return Ok(response),
        };
        if response.headers().contains_key(CONTENT_ENCODING)
            || response.headers().contains_key(CONTENT_RANGE)
        {
            return Ok(response);
        }
        if !self.predicate.should_compress(&response) {
            return Ok(response);
        }

        let (mut parts, plain) = response.into_parts();
        let compressed = CompressedBody::new(plain, encoding, self.level)?;

        parts.headers.remove(CONTENT_LENGTH);
        parts.headers.remove(ACCEPT_RANGES);
        parts
            .headers
            .insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.token()));
        append_vary(&mut parts.headers, "accept-encoding");

        response = Response::from_parts(parts, Body::new(compressed));
        Ok(response)
    }
}

/// Append a member to `Vary`, skipping it when already present
/// (case-insensitively) in any existing `Vary` header.
pub(crate) fn append_vary(headers: &mut HeaderMap, member: &'static str) {
    let already_present = headers
        .get_all(http::header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|existing| existing.trim().eq_ignore_ascii_case(member));
    if !already_present {
        headers.append(http::header::VARY, HeaderValue::from_static(member));
    }
}
