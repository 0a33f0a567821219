//! Per-request timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tracing::warn;

use crate::body::Body;
use crate::error::BoxError;
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

/// Layer that bounds how long the inner service may take to produce a
/// response. Expired requests turn into `408 Request Timeout`.
#[derive(Clone)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Layer for TimeoutLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        Arc::new(Timeout {
            inner,
            timeout: self.timeout,
        })
    }
}

pub struct Timeout {
    inner: ArcService,
    timeout: Duration,
}

#[async_trait]
impl Service for Timeout {
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        match tokio::time::timeout(self.timeout, self.inner.call(req)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%method, %path, timeout = ?self.timeout, "request timed out");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
                Ok(response)
            }
        }
    }
}
