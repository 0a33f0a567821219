//! Request body decompression driven by `Content-Encoding`.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderValue, StatusCode};

use crate::body::Body;
use crate::error::BoxError;
use crate::layer::Layer;
use crate::middleware::compression::encoding::{AcceptedEncodings, Encoding};
use crate::middleware::compression::DecompressedBody;
use crate::service::{ArcService, Request, Response, Service};

/// Layer that decodes compressed request bodies before the inner service
/// sees them.
///
/// Requests with an unsupported `Content-Encoding` are rejected with
/// `415 Unsupported Media Type` carrying an `Accept-Encoding` header that
/// lists the codings this layer can decode. Setting
/// [`pass_through_unaccepted`](Self::pass_through_unaccepted) forwards
/// such requests unchanged instead.
#[derive(Clone, Default)]
pub struct DecompressionLayer {
    accepted: AcceptedEncodings,
    pass_through: bool,
}

impl DecompressionLayer {
    pub fn new() -> Self {
        Self::default()
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

    /// Forward requests with unsupported codings instead of rejecting them.
    pub fn pass_through_unaccepted(mut self, enable: bool) -> Self {
        self.pass_through = enable;
        self
    }
}

impl Layer for DecompressionLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        Arc::new(DecompressionService {
            inner,
            accepted: self.accepted,
            pass_through: self.pass_through,
        })
    }
}

/// Service produced by [`DecompressionLayer`].
pub struct DecompressionService {
    inner: ArcService,
    accepted: AcceptedEncodings,
    pass_through: bool,
}

#[async_trait]
impl Service for DecompressionService {
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        let token = match req.headers().get(CONTENT_ENCODING) {
            Some(value) => match value.to_str() {
                Ok(token) => token.trim().to_ascii_lowercase(),
                Err(_) => return self.reject_or_forward(req).await,
            },
            None => return self.inner.call(req).await,
        };

        if token == "identity" {
            return self.inner.call(req).await;
        }

        let encoding = match Encoding::parse(&token, self.accepted) {
            Some(encoding) => encoding,
            None => return self.reject_or_forward(req).await,
        };

        let (mut parts, encoded) = req.into_parts();
        // The decoded length is unknown until the stream completes.
        parts.headers.remove(CONTENT_ENCODING);
        parts.headers.remove(CONTENT_LENGTH);
        let decoded = DecompressedBody::new(encoded, encoding)?;

        self.inner
            .call(Request::from_parts(parts, Body::new(decoded)))
            .await
    }
}

impl DecompressionService {
    async fn reject_or_forward(&self, req: Request) -> Result<Response, BoxError> {
        if self.pass_through {
            return self.inner.call(req).await;
        }
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        let supported = self.accepted.tokens().join(", ");
        if let Ok(value) = HeaderValue::from_str(&supported) {
            response.headers_mut().insert(ACCEPT_ENCODING, value);
        }
        Ok(response)
    }
}
