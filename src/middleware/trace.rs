//! Request/response logging.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::BoxError;
use crate::extension::RequestId;
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

/// Layer that logs one line per completed request with method, path,
/// status, and latency. Server errors log at `warn`.
#[derive(Clone, Default)]
pub struct TraceLayer;

impl TraceLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Layer for TraceLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        Arc::new(Trace { inner })
    }
}

pub struct Trace {
    inner: ArcService,
}

#[async_trait]
impl Service for Trace {
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        debug!(%method, %path, %request_id, "request received");
        let start = Instant::now();
        let result = self.inner.call(req).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() {
                    warn!(%method, %path, %status, ?elapsed, %request_id, "request completed");
                } else {
                    info!(%method, %path, %status, ?elapsed, %request_id, "request completed");
                }
            }
            Err(error) => {
                warn!(%method, %path, %error, ?elapsed, %request_id, "request failed");
            }
        }

        result
    }
}
