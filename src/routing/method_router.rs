//! Per-method dispatch for one path pattern.
//!
//! A [`MethodRouter`] maps HTTP methods to [`Route`]s and carries an
//! optional per-path "method not allowed" fallback. Matching a path but not
//! a method is deliberately distinguishable from not matching a path at all:
//! the former resolves to the per-path fallback when registered, and only
//! otherwise to the router-global fallback.

use http::Method;

use crate::error::BoxError;
use crate::layer::Layer;
use crate::routing::route::Route;
use crate::service::{Request, Response, Service};

/// Method-to-route dispatch table for a single path pattern.
///
/// Built with the free verb functions ([`get`], [`post`], …) and chained:
///
/// ```no_run
/// use weft::routing::{get, post};
/// use weft::{service_fn, Body, Response};
///
/// let method_router = get(service_fn(|_req| async { Ok(Response::new(Body::empty())) }))
///     .post(service_fn(|_req| async { Ok(Response::new(Body::empty())) }));
/// ```
///
/// Immutable once built into a router; [`MethodRouter::layer`] returns a new
/// instance with every registered route re-layered.
#[derive(Clone, Default)]
pub struct MethodRouter {
    routes: Vec<(Method, Route)>,
    any: Option<Route>,
    not_allowed: Option<Route>,
}

macro_rules! chained_verb {
    ($name:ident, $method:ident) => {
        /// Register a service for the corresponding HTTP method.
        pub fn $name<S>(self, service: S) -> Self
        where
            S: Service + 'static,
        {
            self.on(Method::$method, service)
        }
    };
}

macro_rules! top_level_verb {
    ($name:ident, $method:ident) => {
        /// Start a [`MethodRouter`] handling the corresponding HTTP method.
        pub fn $name<S>(service: S) -> MethodRouter
        where
            S: Service + 'static,
        {
            MethodRouter::new().on(Method::$method, service)
        }
    };
}

impl MethodRouter {
    /// An empty dispatch table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service for `method`, replacing any previous registration.
    pub fn on<S>(mut self, method: Method, service: S) -> Self
    where
        S: Service + 'static,
    {
        let route = Route::new(service);
        match self.routes.iter_mut().find(|(m, _)| *m == method) {
            Some((_, existing)) => *existing = route,
            None => self.routes.push((method, route)),
        }
        self
    }

    chained_verb!(get, GET);
    chained_verb!(post, POST);
    chained_verb!(put, PUT);
    chained_verb!(delete, DELETE);
    chained_verb!(patch, PATCH);
    chained_verb!(head, HEAD);
    chained_verb!(options, OPTIONS);
    chained_verb!(trace, TRACE);
    chained_verb!(connect, CONNECT);

    /// Register a service invoked for any method without its own route.
    pub fn any<S>(mut self, service: S) -> Self
    where
        S: Service + 'static,
    {
        self.any = Some(Route::new(service));
        self
    }

    /// Register the per-path "method not allowed" fallback.
    pub fn method_not_allowed<S>(mut self, service: S) -> Self
    where
        S: Service + 'static,
    {
        self.not_allowed = Some(Route::new(service));
        self
    }

    /// Return a new instance with every registered route re-layered.
    pub fn layer(self, layer: &dyn Layer) -> Self {
        Self {
            routes: self
                .routes
                .into_iter()
                .map(|(method, route)| (method, route.layer(layer)))
                .collect(),
            any: self.any.map(|route| route.layer(layer)),
            not_allowed: self.not_allowed.map(|route| route.layer(layer)),
        }
    }

    /// Resolve the route for `method`.
    ///
    /// HEAD falls through to a registered GET route (the route boundary
    /// discards the body), then to the catch-all registration.
    fn find(&self, method: &Method) -> Option<&Route> {
        if let Some((_, route)) = self.routes.iter().find(|(m, _)| m == method) {
            return Some(route);
        }
        if *method == Method::HEAD {
            if let Some((_, route)) = self.routes.iter().find(|(m, _)| *m == Method::GET) {
                return Some(route);
            }
        }
        self.any.as_ref()
    }

    /// Dispatch by method, resolving misses through the per-path fallback
    /// and then through the router-global one.
    pub(crate) async fn dispatch(
        &self,
        req: Request,
        global_fallback: &Route,
    ) -> Result<Response, BoxError> {
        match self.find(req.method()) {
            Some(route) => route.call(req).await,
            None => match &self.not_allowed {
                Some(route) => route.call(req).await,
                None => global_fallback.call(req).await,
            },
        }
    }
}

impl std::fmt::Debug for MethodRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRouter")
            .field(
                "methods",
                &self.routes.iter().map(|(m, _)| m).collect::<Vec<_>>(),
            )
            .field("method_not_allowed", &self.not_allowed.is_some())
            .finish()
    }
}

top_level_verb!(get, GET);
top_level_verb!(post, POST);
top_level_verb!(put, PUT);
top_level_verb!(delete, DELETE);
top_level_verb!(patch, PATCH);
top_level_verb!(head, HEAD);
top_level_verb!(options, OPTIONS);
top_level_verb!(trace, TRACE);
top_level_verb!(connect, CONNECT);

/// Start a [`MethodRouter`] handling every method.
pub fn any<S>(service: S) -> MethodRouter
where
    S: Service + 'static,
{
    MethodRouter::new().any(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::service::service_fn;
    use http::StatusCode;

    fn answering(status: StatusCode) -> impl Service + 'static {
        service_fn(move |_req| async move {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = status;
            Ok(response)
        })
    }

    fn not_found_fallback() -> Route {
        Route::new(answering(StatusCode::NOT_FOUND))
    }

    fn request(method: Method) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn dispatches_by_exact_method() {
        let router = get(answering(StatusCode::OK)).post(answering(StatusCode::CREATED));
        let fallback = not_found_fallback();

        let response = router.dispatch(request(Method::GET), &fallback).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.dispatch(request(Method::POST), &fallback).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn head_falls_through_to_get() {
        let router = get(answering(StatusCode::OK));
        let fallback = not_found_fallback();
        let response = router
            .dispatch(request(Method::HEAD), &fallback)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn method_miss_uses_per_path_fallback_when_registered() {
        let router =
            get(answering(StatusCode::OK)).method_not_allowed(answering(StatusCode::METHOD_NOT_ALLOWED));
        let fallback = not_found_fallback();
        let response = router
            .dispatch(request(Method::DELETE), &fallback)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn method_miss_uses_global_fallback_otherwise() {
        let router = get(answering(StatusCode::OK));
        let fallback = not_found_fallback();
        let response = router
            .dispatch(request(Method::DELETE), &fallback)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn any_catches_unregistered_methods() {
        let router = get(answering(StatusCode::OK)).any(answering(StatusCode::ACCEPTED));
        let fallback = not_found_fallback();
        let response = router
            .dispatch(request(Method::PATCH), &fallback)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
