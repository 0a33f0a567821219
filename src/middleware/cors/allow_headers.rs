use std::fmt;

use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS};
use http::request::Parts;

use super::{separated_by_commas, WILDCARD};

/// Holds the `Access-Control-Allow-Headers` policy.
#[derive(Clone, Default)]
#[must_use]
pub struct AllowHeaders(HeadersInner);

#[derive(Clone, Default)]
enum HeadersInner {
    #[default]
    None,
    Exact(HeaderValue),
    MirrorRequest,
}

impl AllowHeaders {
    /// Allow any header by sending the `*` wildcard.
    pub fn any() -> Self {
        Self(HeadersInner::Exact(WILDCARD.clone()))
    }

    /// Allow a fixed list of headers, advertised comma-separated.
    pub fn list<I>(headers: I) -> Self
    where
        I: IntoIterator<Item = HeaderName>,
    {
        let joined =
            separated_by_commas(headers.into_iter().map(|name| HeaderValue::from(name)));
        match joined {
            Some(value) => Self(HeadersInner::Exact(value)),
            None => Self(HeadersInner::None),
        }
    }

    /// Echo the headers named by `Access-Control-Request-Headers`.
    pub fn mirror_request() -> Self {
        Self(HeadersInner::MirrorRequest)
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(&self.0, HeadersInner::Exact(value) if value == WILDCARD)
    }

    pub(crate) fn to_header(&self, parts: &Parts) -> Option<(HeaderName, HeaderValue)> {
        let value = match &self.0 {
            HeadersInner::None => return None,
            HeadersInner::Exact(value) => value.clone(),
            HeadersInner::MirrorRequest => parts
                .headers
                .get(http::header::ACCESS_CONTROL_REQUEST_HEADERS)?
                .clone(),
        };
        Some((ACCESS_CONTROL_ALLOW_HEADERS, value))
    }
}

impl fmt::Debug for AllowHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            HeadersInner::None => f.debug_tuple("None").finish(),
            HeadersInner::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            HeadersInner::MirrorRequest => f.debug_tuple("MirrorRequest").finish(),
        }
    }
}

impl<const N: usize> From<[HeaderName; N]> for AllowHeaders {
    fn from(headers: [HeaderName; N]) -> Self {
        Self::list(headers)
    }
}

impl From<Vec<HeaderName>> for AllowHeaders {
    fn from(headers: Vec<HeaderName>) -> Self {
        Self::list(headers)
    }
}
