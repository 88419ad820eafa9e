//! REST resources, provider filters and their registrations.

use std::fmt;
use std::sync::Arc;

use axum::Router;

/// A REST resource mounted under the dispatcher.
pub trait RestResource: Send + Sync {
    /// Registration name.
    fn name(&self) -> &str;

    /// Mount path relative to the dispatcher mapping, e.g. `/ping`.
    fn path(&self) -> &str;

    /// Routes served under [`RestResource::path`].
    fn routes(&self) -> Router;
}

/// A filter applied around every resource route.
pub trait RestProvider: Send + Sync {
    /// Registration name; providers are applied in name order.
    fn name(&self) -> &str;

    /// Wrap the combined resource router, typically with a layer.
    fn apply(&self, router: Router) -> Router;
}

/// Named factory for a resource or provider instance.
pub struct RestClass<T: ?Sized> {
    name: String,
    factory: Arc<dyn Fn() -> Arc<T> + Send + Sync>,
}

/// Registration of a [`RestResource`].
pub type ResourceClass = RestClass<dyn RestResource>;

/// Registration of a [`RestProvider`].
pub type ProviderClass = RestClass<dyn RestProvider>;

impl<T: ?Sized + 'static> RestClass<T> {
    /// Registration that builds a fresh instance with `factory`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Registration that always hands out `instance`.
    pub fn instance(name: impl Into<String>, instance: Arc<T>) -> Self
    where
        T: Send + Sync,
    {
        Self::new(name, move || Arc::clone(&instance))
    }

    /// Registration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build an instance.
    #[must_use]
    pub fn instantiate(&self) -> Arc<T> {
        (self.factory)()
    }
}

impl<T: ?Sized> Clone for RestClass<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: ?Sized> fmt::Debug for RestClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
