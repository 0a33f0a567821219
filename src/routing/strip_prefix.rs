//! Prefix stripping for opaque nested mounts.
//!
//! When a service is mounted at a prefix, the matched prefix is removed from
//! the request path before delegating, so the mounted service sees paths
//! relative to its mount point. The walk is pairwise over segments: a
//! capture segment in the prefix matches any path segment, a literal must
//! match exactly; if the prefix is exhausted the remainder becomes the new
//! path; if the path is exhausted first, or a literal differs, there is no
//! match.

use async_trait::async_trait;
use http::Uri;

use crate::error::{BoxError, HttpError};
use crate::service::{ArcService, Request, Response, Service};

pub(crate) struct StripPrefix {
    inner: ArcService,
    prefix: String,
}

impl StripPrefix {
    pub(crate) fn new(inner: ArcService, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_owned(),
        }
    }
}

#[async_trait]
impl Service for StripPrefix {
    async fn call(&self, mut req: Request) -> Result<Response, BoxError> {
        match strip_prefix(req.uri(), &self.prefix) {
            Some(new_uri) => {
                *req.uri_mut() = new_uri;
                self.inner.call(req).await
            }
            // The surrounding route table only dispatches here for paths
            // under the mount, so a failed strip means the request does not
            // actually belong to the mounted service.
            None => Err(HttpError::not_found().into()),
        }
    }
}

/// Strip `prefix` from the path of `uri`, keeping the query string.
///
/// Returns `None` when the prefix does not match.
fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let mut remaining = uri.path();

    for prefix_segment in prefix.split('/').filter(|s| !s.is_empty()) {
        // Each path segment is introduced by a slash; running out of path
        // while prefix segments remain means no match.
        let rest = remaining.strip_prefix('/')?;
        let (path_segment, tail) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        if path_segment.is_empty() {
            return None;
        }
        let is_capture = prefix_segment.starts_with(':');
        if !is_capture && prefix_segment != path_segment {
            return None;
        }
        remaining = tail;
    }

    let new_path = if remaining.is_empty() { "/" } else { remaining };
    let path_and_query = match uri.query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_owned(),
    };

    let mut parts = http::uri::Parts::default();
    parts.scheme = uri.scheme().cloned();
    parts.authority = uri.authority().cloned();
    parts.path_and_query = path_and_query.parse().ok();
    Uri::from_parts(parts).ok()
}
