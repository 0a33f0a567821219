//! # Extension Types
//!
//! Typed values carried per request through [`http::Extensions`], the
//! side-channel that lets layers hand metadata to each other without sharing
//! a schema. Keys are the Rust types themselves, so two distinct types never
//! collide even if they render identically — declaring a new token is
//! declaring a new type.

use http::Uri;
use std::fmt;
use std::net::IpAddr;

/// The request URI as seen by the top-level router, before any
/// prefix-stripping or rewriting layer touched it.
///
/// Inserted once per request; nested routers leave an existing value alone.
#[derive(Debug, Clone)]
pub struct OriginalUri(pub Uri);

/// Values captured from the matched path pattern.
///
/// Named captures (`:name`) are stored under their name, a trailing wildcard
/// under `"*"`. Values are percent-decoded.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Look up a named capture.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The wildcard tail, if the matched pattern ended in `*`.
    pub fn wildcard(&self) -> Option<&str> {
        self.get("*")
    }

    /// Iterate over all captures in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Whether the matched pattern captured anything.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }
}

/// The request identifier assigned by
/// [`SetRequestIdLayer`](crate::middleware::SetRequestIdLayer).
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The client address resolved by the server front-end.
///
/// When the proxy-trust flag is enabled this is taken from
/// `X-Forwarded-For`, otherwise it is the peer address of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);
