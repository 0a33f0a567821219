//! # Error Handling Module
//!
//! Two kinds of failure flow through the pipeline and they are kept apart
//! deliberately:
//!
//! - **Construction-time errors** ([`Error`]): route conflicts, invalid path
//!   patterns, bad configuration. These are raised while the router is being
//!   assembled at startup and never reach a client.
//! - **Request-path errors** ([`BoxError`]): anything a handler or middleware
//!   returns as `Err`. These are resolved into responses by the active
//!   [`ErrorHandler`], which is total — it can never fail itself.
//!
//! [`HttpError`] is the response-convertible error type: a status code plus
//! an optional message that knows how to render itself. The default handler
//! downcasts to it; anything else is opaque and becomes a logged `500`.

use http::StatusCode;
use std::fmt;
use std::sync::Arc;

use crate::body::Body;
use crate::service::Response;

/// Boxed error type carried along the request path.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while assembling a router or loading configuration.
///
/// All of these are startup-time failures: they indicate a bug in how the
/// application is wired, not a problem with an individual request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path pattern was registered twice.
    #[error("route conflict: `{pattern}` is already registered")]
    RouteConflict {
        /// The offending path pattern.
        pattern: String,
    },

    /// A path pattern is malformed.
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPathPattern {
        /// The offending path pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A nest prefix is malformed.
    #[error("invalid nest prefix `{prefix}`: {reason}")]
    InvalidNestPrefix {
        /// The offending mount prefix.
        prefix: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// I/O failure while binding or reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A response-convertible error: a status code with an optional message.
///
/// Returning `Err(HttpError::new(StatusCode::NOT_FOUND).into())` from a
/// handler produces a response with that status instead of an opaque `500`.
/// Client-status (`4xx`) conversions are not logged by the default handler.
#[derive(Debug, Clone)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    /// An error rendering as the given status with an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
        }
    }

    /// Attach a message, rendered as the response body.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Shorthand for a `404 Not Found` error.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Shorthand for a `400 Bad Request` error.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// The status this error renders as.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Render the error as a response.
    pub fn to_response(&self) -> Response {
        let body = match &self.message {
            Some(message) => Body::from(message.clone()),
            None => Body::empty(),
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        response
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for HttpError {}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

/// Resolves request-path errors into responses.
///
/// Handlers are total: they return a response for every error and must not
/// panic. One handler is installed per router and carried to every route in
/// the tree through the request's error context, so nested routes resolve
/// errors identically without the handler being threaded through each call.
pub trait ErrorHandler: Send + Sync {
    /// Convert an error into the response sent to the client.
    fn handle_error(&self, error: BoxError) -> Response;
}

/// The library-provided error handler.
///
/// Response-convertible errors ([`HttpError`]) render themselves and are
/// logged only when the resulting status is a server error. Opaque errors are
/// always logged and become an empty `500 Internal Server Error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(&self, error: BoxError) -> Response {
        match error.downcast::<HttpError>() {
            Ok(http_error) => {
                let response = http_error.to_response();
                if response.status().is_server_error() {
                    tracing::error!(status = %response.status(), error = %http_error, "handler failed");
                }
                response
            }
            Err(error) => {
                tracing::error!(error = %error, "handler failed");
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

/// Request-scoped error-handler context.
///
/// Installed into request extensions by the top-level router so that any
/// route, however deeply nested, resolves errors through the same handler.
#[derive(Clone)]
pub(crate) struct ErrorContext(pub(crate) Arc<dyn ErrorHandler>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_renders_status_and_message() {
        let error = HttpError::new(StatusCode::IM_A_TEAPOT).with_message("short and stout");
        let response = error.to_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn default_handler_uses_convertible_status() {
        let error: BoxError = Box::new(HttpError::not_found());
        let response = DefaultErrorHandler.handle_error(error);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn default_handler_maps_opaque_errors_to_500() {
        let error: BoxError = "something broke".into();
        let response = DefaultErrorHandler.handle_error(error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
