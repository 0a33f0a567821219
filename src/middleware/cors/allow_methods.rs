use std::fmt;

use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_METHODS};
use http::request::Parts;
use http::Method;

use super::{separated_by_commas, WILDCARD};

/// Holds the `Access-Control-Allow-Methods` policy.
#[derive(Clone, Default)]
#[must_use]
pub struct AllowMethods(MethodsInner);

#[derive(Clone, Default)]
enum MethodsInner {
    #[default]
    None,
    Exact(HeaderValue),
    MirrorRequest,
}

impl AllowMethods {
    /// Allow any method by sending the `*` wildcard.
    pub fn any() -> Self {
        Self(MethodsInner::Exact(WILDCARD.clone()))
    }

    /// Allow a single method.
    pub fn exact(method: Method) -> Self {
        Self(MethodsInner::Exact(
            HeaderValue::from_str(method.as_str()).unwrap(),
        ))
    }

    /// Allow a fixed list of methods, advertised comma-separated.
    pub fn list<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let joined = separated_by_commas(
            methods
                .into_iter()
                .map(|m| HeaderValue::from_str(m.as_str()).unwrap()),
        );
        match joined {
            Some(value) => Self(MethodsInner::Exact(value)),
            None => Self(MethodsInner::None),
        }
    }

    /// Echo the method named by `Access-Control-Request-Method`.
    pub fn mirror_request() -> Self {
        Self(MethodsInner::MirrorRequest)
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(&self.0, MethodsInner::Exact(value) if value == WILDCARD)
    }

    pub(crate) fn to_header(&self, parts: &Parts) -> Option<(HeaderName, HeaderValue)> {
        let value = match &self.0 {
            MethodsInner::None => return None,
            MethodsInner::Exact(value) => value.clone(),
            MethodsInner::MirrorRequest => parts
                .headers
                .get(http::header::ACCESS_CONTROL_REQUEST_METHOD)?
                .clone(),
        };
        Some((ACCESS_CONTROL_ALLOW_METHODS, value))
    }
}

impl fmt::Debug for AllowMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            MethodsInner::None => f.debug_tuple("None").finish(),
            MethodsInner::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            MethodsInner::MirrorRequest => f.debug_tuple("MirrorRequest").finish(),
        }
    }
}

impl From<Method> for AllowMethods {
    fn from(method: Method) -> Self {
        Self::exact(method)
    }
}

impl<const N: usize> From<[Method; N]> for AllowMethods {
    fn from(methods: [Method; N]) -> Self {
        Self::list(methods)
    }
}

impl From<Vec<Method>> for AllowMethods {
    fn from(methods: Vec<Method>) -> Self {
        Self::list(methods)
    }
}
