use std::fmt;

use http::header::{
    HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
};

/// Holds the `Vary` members the layer appends to every response.
///
/// The default set names the three request headers CORS decisions depend
/// on, so caches key on them.
#[derive(Clone)]
#[must_use]
pub struct Vary(Vec<HeaderValue>);

impl Default for Vary {
    fn default() -> Self {
        Self::list([
            ORIGIN.as_str().parse().unwrap(),
            ACCESS_CONTROL_REQUEST_METHOD.as_str().parse().unwrap(),
            ACCESS_CONTROL_REQUEST_HEADERS.as_str().parse().unwrap(),
        ])
    }
}

impl Vary {
    pub fn list<I>(members: I) -> Self
    where
        I: IntoIterator<Item = HeaderValue>,
    {
        Self(members.into_iter().collect())
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = HeaderValue> + '_ {
        self.0.iter().cloned()
    }
}

impl fmt::Debug for Vary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Vary").field(&self.0).finish()
    }
}

impl<const N: usize> From<[HeaderValue; N]> for Vary {
    fn from(members: [HeaderValue; N]) -> Self {
        Self::list(members)
    }
}

impl From<Vec<HeaderValue>> for Vary {
    fn from(members: Vec<HeaderValue>) -> Self {
        Self::list(members)
    }
}
