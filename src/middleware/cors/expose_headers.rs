use std::fmt;

use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_EXPOSE_HEADERS};

use super::{separated_by_commas, WILDCARD};

/// Holds the `Access-Control-Expose-Headers` policy.
#[derive(Clone, Default)]
#[must_use]
pub struct ExposeHeaders(ExposeInner);

#[derive(Clone, Default)]
enum ExposeInner {
    #[default]
    None,
    Exact(HeaderValue),
}

impl ExposeHeaders {
    /// Expose any header by sending the `*` wildcard.
    pub fn any() -> Self {
        Self(ExposeInner::Exact(WILDCARD.clone()))
    }

    /// Expose a fixed list of headers, advertised comma-separated.
    pub fn list<I>(headers: I) -> Self
    where
        I: IntoIterator<Item = HeaderName>,
    {
        let joined = separated_by_commas(headers.into_iter().map(HeaderValue::from));
        match joined {
            Some(value) => Self(ExposeInner::Exact(value)),
            None => Self(ExposeInner::None),
        }
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(&self.0, ExposeInner::Exact(value) if value == WILDCARD)
    }

    pub(crate) fn to_header(&self) -> Option<(HeaderName, HeaderValue)> {
        match &self.0 {
            ExposeInner::None => None,
            ExposeInner::Exact(value) => Some((ACCESS_CONTROL_EXPOSE_HEADERS, value.clone())),
        }
    }
}

impl fmt::Debug for ExposeHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ExposeInner::None => f.debug_tuple("None").finish(),
            ExposeInner::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
        }
    }
}

impl<const N: usize> From<[HeaderName; N]> for ExposeHeaders {
    fn from(headers: [HeaderName; N]) -> Self {
        Self::list(headers)
    }
}

impl From<Vec<HeaderName>> for ExposeHeaders {
    fn from(headers: Vec<HeaderName>) -> Self {
        Self::list(headers)
    }
}
