use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_MAX_AGE};
use http::request::Parts;

/// Holds the `Access-Control-Max-Age` policy, sent on preflight responses
/// only.
#[derive(Clone, Default)]
#[must_use]
pub struct MaxAge(MaxAgeInner);

type DynamicMaxAge = Arc<dyn Fn(&HeaderValue, &Parts) -> Duration + Send + Sync + 'static>;

#[derive(Clone, Default)]
enum MaxAgeInner {
    #[default]
    None,
    Exact(HeaderValue),
    Dynamic(DynamicMaxAge),
}

impl MaxAge {
    /// Cache preflight results for a fixed duration, rounded down to whole
    /// seconds.
    pub fn exact(max_age: Duration) -> Self {
        Self(MaxAgeInner::Exact(max_age.as_secs().into()))
    }

    /// Compute the cache duration per request from the origin and request
    /// parts.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&HeaderValue, &Parts) -> Duration + Send + Sync + 'static,
    {
        Self(MaxAgeInner::Dynamic(Arc::new(f)))
    }

    pub(crate) fn to_header(
        &self,
        origin: Option<&HeaderValue>,
        parts: &Parts,
    ) -> Option<(HeaderName, HeaderValue)> {
        let value = match &self.0 {
            MaxAgeInner::None => return None,
            MaxAgeInner::Exact(value) => value.clone(),
            MaxAgeInner::Dynamic(f) => f(origin?, parts).as_secs().into(),
        };
        Some((ACCESS_CONTROL_MAX_AGE, value))
    }
}

impl fmt::Debug for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            MaxAgeInner::None => f.debug_tuple("None").finish(),
            MaxAgeInner::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            MaxAgeInner::Dynamic(_) => f.debug_tuple("Dynamic").finish(),
        }
    }
}

impl From<Duration> for MaxAge {
    fn from(max_age: Duration) -> Self {
        Self::exact(max_age)
    }
}
