//! Path-pattern dispatch over a radix tree.
//!
//! Patterns are segment sequences: literals, named captures (`:name`), and a
//! trailing wildcard (`*`). The table is backed by a [`matchit`] radix tree,
//! which gives the literal > capture > wildcard specificity ordering
//! independent of insertion order; registering the same pattern twice is a
//! construction-time error.

use matchit::Router as RadixRouter;

use crate::error::{BoxError, Error};
use crate::extension::PathParams;
use crate::layer::Layer;
use crate::routing::method_router::MethodRouter;
use crate::routing::route::Route;
use crate::service::{Request, Response, Service};

/// Reserved capture name used to register a trailing `*` with the tree.
const WILDCARD_PARAM: &str = "__weft_wildcard";

/// What a path pattern resolves to: per-method dispatch, or an opaque
/// service such as a mounted sub-router.
#[derive(Clone)]
pub(crate) enum Endpoint {
    MethodRouter(MethodRouter),
    Route(Route),
}

impl Endpoint {
    fn layer(self, layer: &dyn Layer) -> Self {
        match self {
            Endpoint::MethodRouter(method_router) => {
                Endpoint::MethodRouter(method_router.layer(layer))
            }
            Endpoint::Route(route) => Endpoint::Route(route.layer(layer)),
        }
    }
}

/// Ordered mapping from path pattern to [`Endpoint`].
#[derive(Default)]
pub(crate) struct PathRouter {
    node: RadixRouter<usize>,
    routes: Vec<(String, Endpoint)>,
}

impl PathRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` at `pattern`.
    pub(crate) fn route(&mut self, pattern: &str, endpoint: Endpoint) -> Result<(), Error> {
        let translated = translate_pattern(pattern)?;
        let index = self.routes.len();
        self.node
            .insert(&translated, index)
            .map_err(|_| Error::RouteConflict {
                pattern: pattern.to_owned(),
            })?;
        self.routes.push((pattern.to_owned(), endpoint));
        Ok(())
    }

    /// Merge another router's patterns under `prefix`.
    pub(crate) fn nest(&mut self, prefix: &str, other: PathRouter) -> Result<(), Error> {
        validate_prefix(prefix)?;
        for (pattern, endpoint) in other.routes {
            let full = join_paths(prefix, &pattern);
            self.route(&full, endpoint)?;
        }
        Ok(())
    }

    /// Mount an already-stripped opaque service at `prefix` and everything
    /// below it.
    pub(crate) fn nest_service(&mut self, prefix: &str, route: Route) -> Result<(), Error> {
        validate_prefix(prefix)?;
        self.route(prefix, Endpoint::Route(route.clone()))?;
        let tail = format!("{}/*", prefix.trim_end_matches('/'));
        self.route(&tail, Endpoint::Route(route))?;
        Ok(())
    }

    /// Rebuild with every endpoint re-layered.
    pub(crate) fn layer(self, layer: &dyn Layer) -> Self {
        Self {
            node: self.node,
            routes: self
                .routes
                .into_iter()
                .map(|(pattern, endpoint)| (pattern, endpoint.layer(layer)))
                .collect(),
        }
    }

    /// Route a request, or hand it back when no pattern matches.
    ///
    /// The `Err` arm is the internal "no route matched" signal: it carries
    /// the untouched request so the caller can fall through to its own
    /// fallback instead of treating the miss as an application error.
    pub(crate) async fn dispatch(
        &self,
        mut req: Request,
        global_fallback: &Route,
    ) -> Result<Result<Response, BoxError>, Request> {
        let path = req.uri().path().to_owned();
        let index = match self.node.at(&path) {
            Ok(matched) => {
                let mut params = PathParams::default();
                for (name, value) in matched.params.iter() {
                    let name = if name == WILDCARD_PARAM { "*" } else { name };
                    let value = match urlencoding::decode(value) {
                        Ok(decoded) => decoded.into_owned(),
                        Err(_) => value.to_owned(),
                    };
                    params.insert(name, value);
                }
                req.extensions_mut().insert(params);
                *matched.value
            }
            Err(_) => return Err(req),
        };

        let (_, endpoint) = &self.routes[index];
        Ok(match endpoint {
            Endpoint::MethodRouter(method_router) => {
                method_router.dispatch(req, global_fallback).await
            }
            Endpoint::Route(route) => route.call(req).await,
        })
    }
}

/// Translate the public pattern syntax into the radix tree's node syntax:
/// `:name` becomes `{name}` and a trailing `*` becomes a named catch-all.
fn translate_pattern(pattern: &str) -> Result<String, Error> {
    let invalid = |reason| Error::InvalidPathPattern {
        pattern: pattern.to_owned(),
        reason,
    };

    if !pattern.starts_with('/') {
        return Err(invalid("patterns must start with `/`"));
    }
    if pattern == "/" {
        return Ok("/".to_owned());
    }

    let segments: Vec<&str> = pattern[1..].split('/').collect();
    let mut translated = String::new();
    for (position, segment) in segments.iter().enumerate() {
        let last = position + 1 == segments.len();
        translated.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if name.is_empty() {
                return Err(invalid("captures need a name after `:`"));
            }
            if !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(invalid("capture names may only contain alphanumerics, `_` and `-`"));
            }
            translated.push('{');
            translated.push_str(name);
            translated.push('}');
        } else if *segment == "*" {
            if !last {
                return Err(invalid("wildcard `*` is only allowed as the final segment"));
            }
            translated.push_str("{*");
            translated.push_str(WILDCARD_PARAM);
            translated.push('}');
        } else if segment.contains([':', '*', '{', '}']) {
            return Err(invalid("`:` and `*` may only introduce whole segments"));
        } else {
            translated.push_str(segment);
        }
    }
    Ok(translated)
}

fn validate_prefix(prefix: &str) -> Result<(), Error> {
    let invalid = |reason| Error::InvalidNestPrefix {
        prefix: prefix.to_owned(),
        reason,
    };
    if !prefix.starts_with('/') {
        return Err(invalid("prefixes must start with `/`"));
    }
    if prefix.split('/').any(|segment| segment == "*") {
        return Err(invalid("prefixes cannot contain wildcards"));
    }
    Ok(())
}

/// Join a mount prefix with a nested pattern.
fn join_paths(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if pattern == "/" {
        if prefix.is_empty() {
            "/".to_owned()
        } else {
            prefix.to_owned()
        }
    } else {
        format!("{prefix}{pattern}")
    }
}
