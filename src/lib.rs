//! An async HTTP service toolkit: composable services and layers, a
//! path/method router, and middleware for compression, decompression,
//! CORS, request ids, tracing, and timeouts, served over hyper.
//!
//! Handlers implement [`Service`]; middleware implements [`Layer`] and
//! wraps services from the outside in. [`Router`] dispatches on path
//! patterns (`/users/:id`, trailing `*` wildcards) and methods, supports
//! nesting under prefixes, and isolates handler errors through an
//! [`ErrorHandler`] so connections always receive a response.
//!
//! ```no_run
//! use weft::routing::{get, Router};
//! use weft::server::{Server, ServerConfig};
//! use weft::{service_fn, Body, CorsLayer, Response};
//!
//! # async fn run() -> Result<(), weft::Error> {
//! let router = Router::new()
//!     .route("/health", get(service_fn(|_req| async {
//!         Ok(Response::new(Body::from("ok")))
//!     })))?
//!     .layer(CorsLayer::permissive());
//!
//! let server = Server::new(ServerConfig::default(), router);
//! server.serve(tokio_util::sync::CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod error;
pub mod extension;
pub mod layer;
pub mod middleware;
pub mod routing;
pub mod server;
pub mod service;

pub use body::Body;
pub use error::{BoxError, DefaultErrorHandler, Error, ErrorHandler, HttpError};
pub use extension::{ClientIp, OriginalUri, PathParams, RequestId};
pub use layer::{compose, layer_fn, Identity, Layer, Stack};
pub use middleware::{
    CompressionLayer, CompressionLevel, CorsLayer, DecompressionLayer, SetRequestIdLayer,
    TimeoutLayer, TraceLayer,
};
pub use routing::Router;
pub use service::{service_fn, ArcService, Request, Response, Service};
