//! Terminal adaptation between a pluggable service and strict HTTP
//! semantics.
//!
//! A [`Route`] owns the fully-layered service chain for one endpoint and is
//! the mandatory catch boundary: whatever the chain returns as `Err` is
//! resolved into a response by the active error handler, so a misbehaving
//! handler can never short-circuit upper middleware or crash the process.
//! On top-level invocations it also normalizes the response against the
//! request method: `Content-Length` insertion, HEAD body discard, and the
//! CONNECT success rules.

use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderValue, Method};
use http_body::Body as _;
use std::sync::Arc;

use crate::body::Body;
use crate::error::{BoxError, DefaultErrorHandler, ErrorContext, ErrorHandler};
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

/// Marker consumed by the outermost [`Route`] on the request path.
///
/// The top-level router inserts it once per request; the first route to see
/// it removes it and performs response normalization. Re-invocations by
/// nested routing find it absent and skip normalization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NormalizeGuard;

/// A service plus mandatory error isolation and HTTP-semantic normalization.
///
/// Immutable after construction: [`Route::layer`] returns a *new* route
/// wrapping the old one, it never mutates in place.
#[derive(Clone)]
pub struct Route {
    service: ArcService,
}

impl Route {
    /// Wrap a terminal service.
    pub fn new<S>(service: S) -> Self
    where
        S: Service + 'static,
    {
        Self {
            service: Arc::new(service),
        }
    }

    pub(crate) fn from_arc(service: ArcService) -> Self {
        Self { service }
    }

    /// Return a new route running `layer` around this one.
    ///
    /// The existing error boundary stays inside the new layer, and the new
    /// route adds its own boundary outside of it, so an error thrown by the
    /// layer itself is still isolated.
    pub fn layer(self, layer: &dyn Layer) -> Route {
        Route::from_arc(layer.wrap(Arc::new(self)))
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").finish_non_exhaustive()
    }
}

#[async_trait]
impl Service for Route {
    async fn call(&self, mut req: Request) -> Result<Response, BoxError> {
        let top_level = req.extensions_mut().remove::<NormalizeGuard>().is_some();
        let method = req.method().clone();
        let handler = req.extensions().get::<ErrorContext>().cloned();

        let mut response = match self.service.call(req).await {
            Ok(response) => response,
            Err(error) => match handler {
                Some(ErrorContext(handler)) => handler.handle_error(error),
                None => DefaultErrorHandler.handle_error(error),
            },
        };

        if top_level {
            normalize_response(&method, &mut response);
        }
        Ok(response)
    }
}

/// Apply the method-dependent response rules of HTTP.
///
/// - A successful CONNECT response carries no `Content-Length`, no
///   `Transfer-Encoding` and no body; a violating response is corrected and
///   the violation reported, not propagated as a request failure.
/// - `Content-Length` is inserted when absent and the body length is exact.
/// - HEAD responses keep status and headers but lose the body.
fn normalize_response(method: &Method, response: &mut Response) {
    if *method == Method::CONNECT && response.status().is_success() {
        let has_framing = response.headers().contains_key(CONTENT_LENGTH)
            || response.headers().contains_key(TRANSFER_ENCODING)
            || response.body().size_hint().lower() != 0;
        if has_framing {
            tracing::error!("response to CONNECT with a body or framing headers, emptying it");
            response.headers_mut().remove(CONTENT_LENGTH);
            response.headers_mut().remove(TRANSFER_ENCODING);
            *response.body_mut() = Body::empty();
        }
        return;
    }

    if !response.headers().contains_key(CONTENT_LENGTH) {
        if let Some(size) = response.body().size_hint().exact() {
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(size));
        }
    }

    if *method == Method::HEAD {
        *response.body_mut() = Body::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::service_fn;
    use http::StatusCode;

    fn top_level_request(method: Method, uri: &str) -> Request {
        let mut req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(NormalizeGuard);
        req
    }

    #[tokio::test]
    async fn inserts_content_length_for_exact_bodies() {
        let route = Route::new(service_fn(|_req| async {
            Ok(Response::new(Body::from("hello")))
        }));
        let response = route
            .call(top_level_request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(CONTENT_LENGTH),
            Some(&HeaderValue::from_static("5"))
        );
    }

    #[tokio::test]
    async fn keeps_existing_content_length() {
        let route = Route::new(service_fn(|_req| async {
            let mut response = Response::new(Body::from("hello"));
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from_static("99"));
            Ok(response)
        }));
        let response = route
            .call(top_level_request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(CONTENT_LENGTH),
            Some(&HeaderValue::from_static("99"))
        );
    }

    #[tokio::test]
    async fn head_discards_body_but_keeps_headers() {
        let route = Route::new(service_fn(|_req| async {
            let mut response = Response::new(Body::from("payload"));
            response
                .headers_mut()
                .insert("x-marker", HeaderValue::from_static("kept"));
            Ok(response)
        }));
        let response = route
            .call(top_level_request(Method::HEAD, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-marker"),
            Some(&HeaderValue::from_static("kept"))
        );
        let bytes = response.into_body().collect_bytes().await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn connect_success_is_stripped_of_body_and_framing() {
        let route = Route::new(service_fn(|_req| async {
            let mut response = Response::new(Body::from("should not be here"));
            response
                .headers_mut()
                .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            Ok(response)
        }));
        let response = route
            .call(top_level_request(Method::CONNECT, "example.com:443"))
            .await
            .unwrap();
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert!(!response.headers().contains_key(TRANSFER_ENCODING));
        let bytes = response.into_body().collect_bytes().await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn errors_become_responses_not_failures() {
        let route = Route::new(service_fn(|_req| async {
            Err::<Response, _>("boom".into())
        }));
        let response = route
            .call(top_level_request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn nested_invocation_skips_normalization() {
        let route = Route::new(service_fn(|_req| async {
            Ok(Response::new(Body::from("hello")))
        }));
        // No NormalizeGuard: this models a re-invocation by nested routing.
        let req = http::Request::builder()
            .method(Method::HEAD)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = route.call(req).await.unwrap();
        let bytes = response.into_body().collect_bytes().await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
