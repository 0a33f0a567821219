//! # Service Module
//!
//! The atomic unit of the pipeline: a [`Service`] turns a request into a
//! response or fails. Services have no identity beyond behavior — routers,
//! layers and handlers are all services, composed through `Arc<dyn Service>`
//! trait objects so a route table can hold heterogeneous endpoints.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::body::Body;
use crate::error::BoxError;

/// The request type flowing through the pipeline.
pub type Request = http::Request<Body>;

/// The response type flowing through the pipeline.
pub type Response = http::Response<Body>;

/// An asynchronous request → response unit.
///
/// Implementations take `&self` and are shared behind `Arc`, so a service
/// must not rely on exclusive access for per-request state; anything request
/// scoped belongs in the request itself (body, extensions).
#[async_trait]
pub trait Service: Send + Sync {
    /// Process one request.
    async fn call(&self, req: Request) -> Result<Response, BoxError>;
}

/// A shared, type-erased service.
pub type ArcService = Arc<dyn Service>;

#[async_trait]
impl<S> Service for Arc<S>
where
    S: Service + ?Sized,
{
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        (**self).call(req).await
    }
}

/// Adapt an async function or closure into a [`Service`].
///
/// ```no_run
/// use weft::{service_fn, Body, Response};
///
/// let hello = service_fn(|_req| async {
///     Ok(Response::new(Body::from("hello")))
/// });
/// ```
pub fn service_fn<F, Fut>(f: F) -> ServiceFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    ServiceFn { f }
}

/// A [`Service`] backed by a function, returned by [`service_fn`].
#[derive(Clone, Copy)]
pub struct ServiceFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    async fn call(&self, req: Request) -> Result<Response, BoxError> {
        (self.f)(req).await
    }
}

impl<F> std::fmt::Debug for ServiceFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFn").finish_non_exhaustive()
    }
}
