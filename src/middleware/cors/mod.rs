//! Cross-origin resource sharing layer.
//!
//! Policy for each CORS response header lives in its own value object so
//! the layer itself is a thin builder over them. Preflight `OPTIONS`
//! requests are answered directly without calling the inner service; other
//! requests run the inner service concurrently with the allow-origin
//! decision and have the CORS headers merged into the inner response.
//!
//! Combinations the CORS protocol forbids — credentials together with any
//! wildcard policy — are rejected with a panic when the layer is applied,
//! not silently at request time.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderValue, ORIGIN, VARY};
use http::{HeaderMap, Method, StatusCode};

use crate::body::Body;
use crate::error::BoxError;
use crate::layer::Layer;
use crate::service::{ArcService, Request, Response, Service};

mod allow_credentials;
mod allow_headers;
mod allow_methods;
mod allow_origin;
mod allow_private_network;
mod expose_headers;
mod max_age;
mod vary;

pub use self::allow_credentials::AllowCredentials;
pub use self::allow_headers::AllowHeaders;
pub use self::allow_methods::AllowMethods;
pub use self::allow_origin::AllowOrigin;
pub use self::allow_private_network::AllowPrivateNetwork;
pub use self::expose_headers::ExposeHeaders;
pub use self::max_age::MaxAge;
pub use self::vary::Vary;

const WILDCARD: HeaderValue = HeaderValue::from_static("*");

fn separated_by_commas<I>(mut values: I) -> Option<HeaderValue>
where
    I: Iterator<Item = HeaderValue>,
{
    let first = values.next()?;
    let mut joined = first.as_bytes().to_vec();
    for value in values {
        joined.extend_from_slice(b",");
        joined.extend_from_slice(value.as_bytes());
    }
    Some(HeaderValue::from_bytes(&joined).expect("joined header values are valid"))
}

/// Layer that answers preflight requests and decorates responses with CORS
/// headers.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct CorsLayer {
    allow_credentials: AllowCredentials,
    allow_headers: AllowHeaders,
    allow_methods: AllowMethods,
    allow_origin: AllowOrigin,
    allow_private_network: AllowPrivateNetwork,
    expose_headers: ExposeHeaders,
    max_age: MaxAge,
    vary: Vary,
}

impl CorsLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A permissive policy: wildcard origin, methods, and headers.
    ///
    /// Incompatible with credentials.
    pub fn permissive() -> Self {
        Self::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(AllowMethods::any())
            .allow_headers(AllowHeaders::any())
            .expose_headers(ExposeHeaders::any())
    }

    /// The most permissive policy that still works with credentials:
    /// every request's origin, method, and headers are echoed back.
    pub fn very_permissive() -> Self {
        Self::new()
            .allow_origin(AllowOrigin::predicate(|_, _| true))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    pub fn allow_credentials<T>(mut self, allow: T) -> Self
    where
        T: Into<AllowCredentials>,
    {
        self.allow_credentials = allow.into();
        self
    }

    pub fn allow_headers<T>(mut self, headers: T) -> Self
    where
        T: Into<AllowHeaders>,
    {
        self.allow_headers = headers.into();
        self
    }

    pub fn allow_methods<T>(mut self, methods: T) -> Self
    where
        T: Into<AllowMethods>,
    {
        self.allow_methods = methods.into();
        self
    }

    pub fn allow_origin<T>(mut self, origin: T) -> Self
    where
        T: Into<AllowOrigin>,
    {
        self.allow_origin = origin.into();
        self
    }

    pub fn allow_private_network<T>(mut self, allow: T) -> Self
    where
        T: Into<AllowPrivateNetwork>,
    {
        self.allow_private_network = allow.into();
        self
    }

    pub fn expose_headers<T>(mut self, headers: T) -> Self
    where
        T: Into<ExposeHeaders>,
    {
        self.expose_headers = headers.into();
        self
    }

    pub fn max_age<T>(mut self, max_age: T) -> Self
    where
        T: Into<MaxAge>,
    {
        self.max_age = max_age.into();
        self
    }

    pub fn vary<T>(mut self, vary: T) -> Self
    where
        T: Into<Vary>,
    {
        self.vary = vary.into();
        self
    }
}

impl Layer for CorsLayer {
    fn wrap(&self, inner: ArcService) -> ArcService {
        if self.allow_credentials.is_true() {
            assert!(
                !self.allow_origin.is_wildcard(),
                "invalid CORS configuration: cannot combine `Access-Control-Allow-Credentials: true` \
                 with `Access-Control-Allow-Origin: *`"
            );
            assert!(
                !self.allow_methods.is_wildcard(),
                "invalid CORS configuration: cannot combine `Access-Control-Allow-Credentials: true` \
                 with `Access-Control-Allow-Methods: *`"
            );
            assert!(
                !self.allow_headers.is_wildcard(),
                "invalid CORS configuration: cannot combine `Access-Control-Allow-Credentials: true` \
                 with `Access-Control-Allow-Headers: *`"
            );
            assert!(
                !self.expose_headers.is_wildcard(),
                "invalid CORS configuration: cannot combine `Access-Control-Allow-Credentials: true` \
                 with `Access-Control-Expose-Headers: *`"
            );
        }

        Arc::new(CorsService {
            inner,
            layer: self.clone(),
        })
    }
}

/// Service produced by [`CorsLayer`].
pub struct CorsService {
    inner: ArcService,
    layer: CorsLayer,
}

#[async_trait]
impl Service for CorsService {
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        let (parts, body) = req.into_parts();
        let origin = parts.headers.get(ORIGIN).cloned();

        let mut headers = HeaderMap::new();
        headers.extend(
            self.layer
                .allow_credentials
                .to_header(origin.as_ref(), &parts),
        );
        headers.extend(
            self.layer
                .allow_private_network
                .to_header(origin.as_ref(), &parts),
        );
        for value in self.layer.vary.values() {
            headers.append(VARY, value);
        }

        if parts.method == Method::OPTIONS {
            headers.extend(
                self.layer
                    .allow_origin
                    .to_header(origin.as_ref(), &parts)
                    .await,
            );
            headers.extend(self.layer.allow_methods.to_header(&parts));
            headers.extend(self.layer.allow_headers.to_header(&parts));
            headers.extend(self.layer.max_age.to_header(origin.as_ref(), &parts));

            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::OK;
            *response.headers_mut() = headers;
            return Ok(response);
        }

        // Run the origin decision concurrently with the inner service.
        let req = Request::from_parts(parts.clone(), body);
        let (result, origin_header) = futures::join!(
            self.inner.call(req),
            self.layer.allow_origin.to_header(origin.as_ref(), &parts),
        );
        let mut response = result?;
        headers.extend(origin_header);
        // Expose-headers only makes sense on actual responses, never on the
        // preflight answer.
        headers.extend(self.layer.expose_headers.to_header());

        let response_headers = response.headers_mut();
        // Vary members accumulate instead of replacing what the inner
        // service set.
        for (name, value) in headers.drain() {
            match name {
                Some(name) if name == VARY => {
                    response_headers.append(VARY, value);
                }
                Some(name) => {
                    response_headers.insert(name, value);
                }
                // Continuation value of the preceding VARY entry.
                None => {
                    response_headers.append(VARY, value);
                }
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_fn;
    use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
    };
    use std::time::Duration;

    fn ok_service() -> ArcService {
        Arc::new(service_fn(|_req| async {
            Ok(Response::new(Body::from("hello")))
        }))
    }

    fn preflight(origin: &'static str) -> Request {
        let mut req = Request::new(Body::empty());
        *req.method_mut() = Method::OPTIONS;
        req.headers_mut()
            .insert(ORIGIN, HeaderValue::from_static(origin));
        req.headers_mut().insert(
            http::header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("GET"),
        );
        req
    }

    #[tokio::test]
    async fn preflight_short_circuits_the_inner_service() {
        let svc = CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods([Method::GET])
            .max_age(Duration::from_secs(60))
            .wrap(Arc::new(service_fn(|_req| async {
                panic!("inner service must not run for preflight")
            })));

        let response = svc.call(preflight("https://example.com")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(
            response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "GET"
        );
        assert_eq!(response.headers().get(ACCESS_CONTROL_MAX_AGE).unwrap(), "60");
        assert!(response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());
    }

    #[tokio::test]
    async fn non_preflight_responses_carry_the_origin_header() {
        let svc = CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
                "https://example.com",
            )))
            .wrap(ok_service());

        let mut req = Request::new(Body::empty());
        req.headers_mut()
            .insert(ORIGIN, HeaderValue::from_static("https://example.com"));
        let response = svc.call(req).await.unwrap();
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn unlisted_origins_get_no_allow_origin() {
        let svc = CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
                "https://example.com",
            )))
            .wrap(ok_service());

        let mut req = Request::new(Body::empty());
        req.headers_mut()
            .insert(ORIGIN, HeaderValue::from_static("https://evil.example"));
        let response = svc.call(req).await.unwrap();
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn async_predicate_runs_alongside_the_inner_service() {
        let svc = CorsLayer::new()
            .allow_origin(AllowOrigin::async_predicate(|origin, _parts| async move {
                tokio::task::yield_now().await;
                origin.as_bytes().ends_with(b".example.com")
            }))
            .wrap(ok_service());

        let mut req = Request::new(Body::empty());
        req.headers_mut()
            .insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
        let response = svc.call(req).await.unwrap();
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn vary_members_accumulate_with_the_inner_response() {
        let svc = CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .wrap(Arc::new(service_fn(|_req| async {
                let mut response = Response::new(Body::empty());
                response
                    .headers_mut()
                    .insert(VARY, HeaderValue::from_static("accept-encoding"));
                Ok(response)
            })));

        let response = svc.call(Request::new(Body::empty())).await.unwrap();
        let members: Vec<_> = response
            .headers()
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(members.contains(&"accept-encoding"));
        assert!(members.contains(&"origin"));
        assert!(members.contains(&"access-control-request-method"));
        assert!(members.contains(&"access-control-request-headers"));
    }

    #[test]
    #[should_panic = "Access-Control-Allow-Origin: *"]
    fn credentials_with_wildcard_origin_panics() {
        let _ = CorsLayer::new()
            .allow_credentials(true)
            .allow_origin(AllowOrigin::any())
            .wrap(ok_service());
    }

    #[test]
    #[should_panic = "Access-Control-Allow-Methods: *"]
    fn credentials_with_wildcard_methods_panics() {
        let _ = CorsLayer::new()
            .allow_credentials(true)
            .allow_methods(AllowMethods::any())
            .wrap(ok_service());
    }

    #[test]
    #[should_panic = "Access-Control-Allow-Headers: *"]
    fn credentials_with_wildcard_headers_panics() {
        let _ = CorsLayer::new()
            .allow_credentials(true)
            .allow_headers(AllowHeaders::any())
            .wrap(ok_service());
    }

    #[test]
    #[should_panic = "Access-Control-Expose-Headers: *"]
    fn credentials_with_wildcard_expose_headers_panics() {
        let _ = CorsLayer::new()
            .allow_credentials(true)
            .expose_headers(ExposeHeaders::any())
            .wrap(ok_service());
    }
}
