use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS};
use http::request::Parts;

/// Holds the `Access-Control-Allow-Credentials` policy.
///
/// The header is boolean — it is either `true` or absent, never any other
/// value.
#[derive(Clone, Default)]
#[must_use]
pub struct AllowCredentials(CredentialsInner);

type CredentialsPredicate = Arc<dyn Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static>;

#[derive(Clone, Default)]
enum CredentialsInner {
    #[default]
    No,
    Yes,
    Predicate(CredentialsPredicate),
}

impl AllowCredentials {
    /// Always allow credentials.
    pub fn yes() -> Self {
        Self(CredentialsInner::Yes)
    }

    /// Decide per request from the origin and request parts.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&HeaderValue, &Parts) -> bool + Send + Sync + 'static,
    {
        Self(CredentialsInner::Predicate(Arc::new(f)))
    }

    /// Whether credentials are unconditionally allowed. Predicates cannot
    /// be evaluated without a request and report `false` here.
    pub(crate) fn is_true(&self) -> bool {
        matches!(self.0, CredentialsInner::Yes)
    }

    pub(crate) fn to_header(
        &self,
        origin: Option<&HeaderValue>,
        parts: &Parts,
    ) -> Option<(HeaderName, HeaderValue)> {
        let allowed = match &self.0 {
            CredentialsInner::No => false,
            CredentialsInner::Yes => true,
            CredentialsInner::Predicate(allow) => allow(origin?, parts),
        };
        allowed.then(|| {
            (
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            )
        })
    }
}

impl fmt::Debug for AllowCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            CredentialsInner::No => f.debug_tuple("No").finish(),
            CredentialsInner::Yes => f.debug_tuple("Yes").finish(),
            CredentialsInner::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

impl From<bool> for AllowCredentials {
    fn from(allow: bool) -> Self {
        if allow {
            Self::yes()
        } else {
            Self::default()
        }
    }
}
