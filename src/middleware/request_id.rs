//! Request id assignment and propagation.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use uuid::Uuid;

use crate::error::BoxError;
use crate::extension::RequestId;
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that ensures every request carries an id.
///
/// An incoming `x-request-id` header is kept; otherwise a v4 UUID is
/// generated. The id is stored as a [`RequestId`] extension and copied
/// onto the response header.
#[derive(Clone, Default)]
pub struct SetRequestIdLayer;

impl SetRequestIdLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Layer for SetRequestIdLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        Arc::new(SetRequestId { inner })
    }
}

pub struct SetRequestId {
    inner: ArcService,
}

#[async_trait]
impl Service for SetRequestId {
    async fn call(&self, mut req: Request) -> Result<Response, BoxError> {
        let id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Ok(value) = HeaderValue::from_str(&id) {
            req.headers_mut().insert(X_REQUEST_ID, value.clone());
            req.extensions_mut().insert(RequestId(id));

            let mut response = self.inner.call(req).await?;
            response.headers_mut().insert(X_REQUEST_ID, value);
            Ok(response)
        } else {
            self.inner.call(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::service_fn;

    #[tokio::test]
    async fn generates_an_id_when_absent() {
        let svc = SetRequestIdLayer::new().wrap(Arc::new(service_fn(|req: Request| async move {
            let id = req.extensions().get::<RequestId>().expect("id extension");
            assert!(Uuid::parse_str(&id.0).is_ok());
            Ok(Response::new(Body::empty()))
        })));

        let response = svc.call(Request::new(Body::empty())).await.unwrap();
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn keeps_an_existing_id() {
        let svc = SetRequestIdLayer::new().wrap(Arc::new(service_fn(|req: Request| async move {
            assert_eq!(
                req.extensions().get::<RequestId>().map(|id| id.0.as_str()),
                Some("abc-123")
            );
            Ok(Response::new(Body::empty()))
        })));

        let mut req = Request::new(Body::empty());
        req.headers_mut()
            .insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        let response = svc.call(req).await.unwrap();
        assert_eq!(
            response.headers().get(X_REQUEST_ID).unwrap(),
            HeaderValue::from_static("abc-123")
        );
    }
}
