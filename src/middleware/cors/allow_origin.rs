use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use http::request::Parts;

use super::WILDCARD;

/// Holds the `Access-Control-Allow-Origin` policy.
#[derive(Clone, Default)]
#[must_use]
pub struct AllowOrigin(OriginInner);

type OriginPredicate = Arc<dyn Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static>;
type AsyncOriginPredicate =
    Arc<dyn Fn(HeaderValue, Parts) -> BoxFuture<'static, bool> + Send + Sync + 'static>;

#[derive(Clone, Default)]
enum OriginInner {
    #[default]
    None,
    Any,
    List(Vec<HeaderValue>),
    Predicate(OriginPredicate),
    AsyncPredicate(AsyncOriginPredicate),
}

impl AllowOrigin {
    /// Allow any origin by sending the `*` wildcard.
    pub fn any() -> Self {
        Self(OriginInner::Any)
    }

    /// Allow a single exact origin, echoed as-is.
    pub fn exact(origin: HeaderValue) -> Self {
        Self(OriginInner::List(vec![origin]))
    }

    /// Allow any origin from a fixed list; the request's origin is echoed
    /// back when it matches.
    pub fn list<I>(origins: I) -> Self
    where
        I: IntoIterator<Item = HeaderValue>,
    {
        let origins: Vec<_> = origins.into_iter().collect();
        if origins.iter().any(|o| o == WILDCARD) {
            panic!("wildcard origin (`*`) cannot be passed to `AllowOrigin::list`, use `AllowOrigin::any` instead");
        }
        Self(OriginInner::List(origins))
    }

    /// Decide per request with a synchronous predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static,
    {
        Self(OriginInner::Predicate(Arc::new(f)))
    }

    /// Decide per request with an async predicate; the inner service runs
    /// concurrently with it.
    pub fn async_predicate<F, Fut>(f: F) -> Self
    where
        F: Fn(HeaderValue, Parts) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        Self(OriginInner::AsyncPredicate(Arc::new(move |origin, parts| {
            Box::pin(f(origin, parts))
        })))
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(self.0, OriginInner::Any)
    }

    pub(crate) async fn to_header(
        &self,
        origin: Option<&HeaderValue>,
        parts: &Parts,
    ) -> Option<(HeaderName, HeaderValue)> {
        let value = match &self.0 {
            OriginInner::None => return None,
            OriginInner::Any => WILDCARD.clone(),
            OriginInner::List(origins) => {
                let origin = origin?;
                origins.iter().find(|o| *o == origin)?.clone()
            }
            OriginInner::Predicate(allow) => {
                let origin = origin?;
                allow(origin, parts).then(|| origin.clone())?
            }
            OriginInner::AsyncPredicate(allow) => {
                let origin = origin?.clone();
                allow(origin.clone(), parts.clone()).await.then_some(origin)?
            }
        };
        Some((ACCESS_CONTROL_ALLOW_ORIGIN, value))
    }
}

impl fmt::Debug for AllowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            OriginInner::None => f.debug_tuple("None").finish(),
            OriginInner::Any => f.debug_tuple("Any").finish(),
            OriginInner::List(origins) => f.debug_tuple("List").field(origins).finish(),
            OriginInner::Predicate(_) => f.debug_tuple("Predicate").finish(),
            OriginInner::AsyncPredicate(_) => f.debug_tuple("AsyncPredicate").finish(),
        }
    }
}

impl From<HeaderValue> for AllowOrigin {
    fn from(origin: HeaderValue) -> Self {
        Self::exact(origin)
    }
}

impl<const N: usize> From<[HeaderValue; N]> for AllowOrigin {
    fn from(origins: [HeaderValue; N]) -> Self {
        Self::list(origins)
    }
}

impl From<Vec<HeaderValue>> for AllowOrigin {
    fn from(origins: Vec<HeaderValue>) -> Self {
        Self::list(origins)
    }
}
