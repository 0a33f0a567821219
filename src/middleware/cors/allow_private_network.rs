use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::request::Parts;

/// Holds the `Access-Control-Allow-Private-Network` policy.
///
/// The allow header is only sent in reply to a request carrying
/// `Access-Control-Request-Private-Network: true`.
#[derive(Clone, Default)]
#[must_use]
pub struct AllowPrivateNetwork(PrivateNetworkInner);

type PrivateNetworkPredicate = Arc<dyn Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static>;

#[derive(Clone, Default)]
enum PrivateNetworkInner {
    #[default]
    No,
    Yes,
    Predicate(PrivateNetworkPredicate),
}

const REQUEST_PRIVATE_NETWORK: HeaderName =
    HeaderName::from_static("access-control-request-private-network");
const ALLOW_PRIVATE_NETWORK: HeaderName =
    HeaderName::from_static("access-control-allow-private-network");

impl AllowPrivateNetwork {
    /// Always allow private network access.
    pub fn yes() -> Self {
        Self(PrivateNetworkInner::Yes)
    }

    /// Decide per request from the origin and request parts.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static,
    {
        Self(PrivateNetworkInner::Predicate(Arc::new(f)))
    }

    pub(crate) fn to_header(
        &self,
        origin: Option<&HeaderValue>,
        parts: &Parts,
    ) -> Option<(HeaderName, HeaderValue)> {
        if parts.headers.get(REQUEST_PRIVATE_NETWORK)
            != Some(&HeaderValue::from_static("true"))
        {
            return None;
        }
        let allowed = match &self.0 {
            PrivateNetworkInner::No => false,
            PrivateNetworkInner::Yes => true,
            PrivateNetworkInner::Predicate(allow) => allow(origin?, parts),
        };
        allowed.then(|| (ALLOW_PRIVATE_NETWORK, HeaderValue::from_static("true")))
    }
}

impl fmt::Debug for AllowPrivateNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            PrivateNetworkInner::No => f.debug_tuple("No").finish(),
            PrivateNetworkInner::Yes => f.debug_tuple("Yes").finish(),
            PrivateNetworkInner::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

impl From<bool> for AllowPrivateNetwork {
    fn from(allow: bool) -> Self {
        if allow {
            Self::yes()
        } else {
            Self::default()
        }
    }
}
