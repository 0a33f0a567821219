//! # Routing Module
//!
//! Path and method dispatch for the pipeline. A [`Router`] is the top-level
//! entry point: it owns the route table, the global fallback, and the error
//! handler, and establishes the per-request context (original URI, error
//! handler, normalization marker) before delegating.
//!
//! ```no_run
//! use weft::routing::{get, Router};
//! use weft::{service_fn, Body, Response};
//!
//! let app = Router::new()
//!     .route("/users/:id", get(service_fn(|_req| async {
//!         Ok(Response::new(Body::from("user")))
//!     })))
//!     .unwrap();
//! ```

mod method_router;
mod path_router;
mod route;
mod strip_prefix;

pub use method_router::{
    any, connect, delete, get, head, options, patch, post, put, trace, MethodRouter,
};
pub use route::Route;

pub(crate) use route::NormalizeGuard;

use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;

use crate::body::Body;
use crate::error::{BoxError, DefaultErrorHandler, Error, ErrorContext, ErrorHandler};
use crate::extension::OriginalUri;
use crate::layer::Layer;
use crate::routing::path_router::{Endpoint, PathRouter};
use crate::routing::strip_prefix::StripPrefix;
use crate::service::{Request, Response, Service};

/// The global fallback, distinguishing the library-provided 404 from a
/// user-supplied route so that global layers re-wrap a still-default
/// fallback the same way they re-wrap everything else.
enum Fallback {
    Default(Route),
    Service(Route),
}

impl Fallback {
    fn route(&self) -> &Route {
        match self {
            Fallback::Default(route) | Fallback::Service(route) => route,
        }
    }

    fn layer(self, layer: &dyn Layer) -> Self {
        match self {
            Fallback::Default(route) => Fallback::Default(route.layer(layer)),
            Fallback::Service(route) => Fallback::Service(route.layer(layer)),
        }
    }
}

/// The top-level request router.
///
/// Built once at startup and immutable afterwards; every builder method
/// consumes and returns the router. Pattern registration reports conflicts
/// and malformed patterns as [`Error`]s at construction time.
pub struct Router {
    path_router: PathRouter,
    fallback: Fallback,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// An empty router answering `404 Not Found` to everything.
    pub fn new() -> Self {
        Self {
            path_router: PathRouter::new(),
            fallback: Fallback::Default(Route::new(NotFound)),
            error_handler: Arc::new(DefaultErrorHandler),
        }
    }

    /// Register per-method dispatch at a path pattern.
    pub fn route(mut self, pattern: &str, method_router: MethodRouter) -> Result<Self, Error> {
        self.path_router
            .route(pattern, Endpoint::MethodRouter(method_router))?;
        Ok(self)
    }

    /// Register an opaque service at a path pattern, bypassing method
    /// dispatch.
    pub fn route_service<S>(mut self, pattern: &str, service: S) -> Result<Self, Error>
    where
        S: Service + 'static,
    {
        self.path_router
            .route(pattern, Endpoint::Route(Route::new(service)))?;
        Ok(self)
    }

    /// Mount another router under a path prefix.
    ///
    /// The sub-router's patterns are merged into this router's table with
    /// the prefix prepended, so specificity and fallback resolution stay
    /// global. A custom fallback on the nested router is discarded; the
    /// outer router's fallback answers for unmatched paths under the mount.
    pub fn nest(mut self, prefix: &str, router: Router) -> Result<Self, Error> {
        self.path_router.nest(prefix, router.path_router)?;
        Ok(self)
    }

    /// Mount an opaque service under a path prefix.
    ///
    /// The matched prefix is stripped from the request path before the
    /// service is invoked, so a mounted sub-application sees paths relative
    /// to its mount point.
    pub fn nest_service<S>(mut self, prefix: &str, service: S) -> Result<Self, Error>
    where
        S: Service + 'static,
    {
        let stripped = Route::from_arc(Arc::new(StripPrefix::new(Arc::new(service), prefix)));
        self.path_router.nest_service(prefix, stripped)?;
        Ok(self)
    }

    /// Replace the global fallback invoked when no path matches.
    pub fn fallback<S>(mut self, service: S) -> Self
    where
        S: Service + 'static,
    {
        self.fallback = Fallback::Service(Route::new(service));
        self
    }

    /// Replace the error handler carried to every route in the tree.
    pub fn with_error_handler<H>(mut self, handler: H) -> Self
    where
        H: ErrorHandler + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Apply a layer around every registered route and the fallback.
    ///
    /// Each call wraps everything registered so far, so a later layer ends
    /// up outside an earlier one. Register routes before layering them.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer + 'static,
    {
        self.path_router = self.path_router.layer(&layer);
        self.fallback = self.fallback.layer(&layer);
        self
    }
}

#[async_trait]
impl Service for Router {
    async fn call(&self, mut req: Request) -> Result<Response, BoxError> {
        // Record the pre-routing URI before any prefix stripping; nested
        // routers find it already present and leave it alone.
        if req.extensions().get::<OriginalUri>().is_none() {
            let uri = req.uri().clone();
            req.extensions_mut().insert(OriginalUri(uri));
        }
        // The error context and normalization marker are established only at
        // the outermost router, so re-invocations through nested mounts
        // resolve errors the same way and normalize exactly once.
        if req.extensions().get::<ErrorContext>().is_none() {
            req.extensions_mut()
                .insert(ErrorContext(self.error_handler.clone()));
            req.extensions_mut().insert(NormalizeGuard);
        }

        match self
            .path_router
            .dispatch(req, self.fallback.route())
            .await
        {
            Ok(result) => result,
            // No route matched: the request comes back and resolves through
            // the global fallback instead of surfacing as an error.
            Err(req) => self.fallback.route().call(req).await,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

/// The library-provided 404 fallback.
#[derive(Debug, Clone, Copy)]
struct NotFound;

#[async_trait]
impl Service for NotFound {
    async fn call(&self, _req: Request) -> Result<Response, BoxError> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_FOUND;
        Ok(response)
    }
}

/// Convenience service answering a fixed status, useful as a fallback or
/// method-not-allowed handler.
#[derive(Debug, Clone, Copy)]
pub struct StatusService(pub StatusCode);

#[async_trait]
impl Service for StatusService {
    async fn call(&self, _req: Request) -> Result<Response, BoxError> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = self.0;
        Ok(response)
    }
}
