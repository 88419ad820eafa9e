//! Deployment descriptor model.
//!
//! # Design
//! - Providers build [`DeploymentInfo`] fragments; the merge step folds them
//!   into one [`DeploymentDescriptor`] keyed by entry name.
//! - Every descriptor entry remembers the provider that contributed it so
//!   re-applying a provider is recognisable.
//! - Entries are kept in ordered maps, so iteration order depends on names only.

use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::Extensions;
use axum::response::Response;

use crate::container::ServletContext;

/// Error a servlet may return from [`Servlet::init`].
pub type ServletError = Box<dyn Error + Send + Sync>;

/// Opaque context attribute value, read back with [`ServletContext::attribute`].
pub type Attribute = Arc<dyn Any + Send + Sync>;

/// Request handler registered under one or more URL patterns.
pub trait Servlet: Send + Sync {
    /// Build the router serving this servlet's requests.
    ///
    /// Requests reach the router with the context path and the servlet's
    /// prefix mapping removed from the URI path.
    ///
    /// # Errors
    ///
    /// Returns an error when the servlet cannot be initialised, for example
    /// because a required context attribute is missing.
    fn init(&self, context: &ServletContext) -> Result<Router, ServletError>;
}

impl Servlet for Router {
    fn init(&self, _context: &ServletContext) -> Result<Router, ServletError> {
        Ok(self.clone())
    }
}

/// Callbacks around every request entering the deployment.
pub trait RequestListener: Send + Sync {
    /// Called before the request is dispatched to a servlet.
    fn request_initialized(&self, _request: &mut Request) {}

    /// Called after the servlet produced its response.
    ///
    /// `extensions` holds the request extensions plus those attached to the
    /// response, including the [`crate::ServletPath`] of the dispatch.
    fn request_destroyed(&self, _extensions: &Extensions, _response: &mut Response) {}
}

/// Kind of descriptor entry, used in conflict reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    /// A servlet.
    Servlet,
    /// A request listener.
    Listener,
    /// A context attribute.
    Attribute,
}

impl EntryKind {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Servlet => "servlet",
            Self::Listener => "listener",
            Self::Attribute => "attribute",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named servlet with its URL mappings.
#[derive(Clone)]
pub struct ServletInfo {
    name: String,
    servlet: Arc<dyn Servlet>,
    mappings: Vec<String>,
    async_supported: bool,
    load_on_startup: Option<u32>,
}

impl ServletInfo {
    /// Servlet with no mappings, synchronous and lazily loaded.
    pub fn new(name: impl Into<String>, servlet: Arc<dyn Servlet>) -> Self {
        Self {
            name: name.into(),
            servlet,
            mappings: Vec::new(),
            async_supported: false,
            load_on_startup: None,
        }
    }

    /// Add one URL pattern.
    #[must_use]
    pub fn with_mapping(mut self, pattern: impl Into<String>) -> Self {
        self.mappings.push(pattern.into());
        self
    }

    /// Add several URL patterns.
    #[must_use]
    pub fn with_mappings<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappings.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Mark the servlet as async-capable.
    #[must_use]
    pub const fn with_async_supported(mut self, async_supported: bool) -> Self {
        self.async_supported = async_supported;
        self
    }

    /// Initialise eagerly, ordered by `order` among eager servlets.
    #[must_use]
    pub const fn with_load_on_startup(mut self, order: u32) -> Self {
        self.load_on_startup = Some(order);
        self
    }

    /// Servlet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The servlet implementation.
    #[must_use]
    pub fn servlet(&self) -> &Arc<dyn Servlet> {
        &self.servlet
    }

    /// Declared URL patterns.
    #[must_use]
    pub fn mappings(&self) -> &[String] {
        &self.mappings
    }

    /// Whether the servlet is async-capable.
    #[must_use]
    pub const fn is_async_supported(&self) -> bool {
        self.async_supported
    }

    /// Eager load order, `None` for lazily loaded servlets.
    #[must_use]
    pub const fn load_on_startup(&self) -> Option<u32> {
        self.load_on_startup
    }
}

impl fmt::Debug for ServletInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServletInfo")
            .field("name", &self.name)
            .field("mappings", &self.mappings)
            .field("async_supported", &self.async_supported)
            .field("load_on_startup", &self.load_on_startup)
            .finish_non_exhaustive()
    }
}

/// A named request listener.
#[derive(Clone)]
pub struct ListenerInfo {
    name: String,
    listener: Arc<dyn RequestListener>,
}

impl ListenerInfo {
    /// Wrap a listener under `name`.
    pub fn new(name: impl Into<String>, listener: Arc<dyn RequestListener>) -> Self {
        Self {
            name: name.into(),
            listener,
        }
    }

    /// Listener name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The listener implementation.
    #[must_use]
    pub fn listener(&self) -> &Arc<dyn RequestListener> {
        &self.listener
    }
}

impl fmt::Debug for ListenerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerInfo")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Entries contributed by a single provider.
#[derive(Clone, Default)]
pub struct DeploymentInfo {
    pub(crate) servlets: Vec<ServletInfo>,
    pub(crate) listeners: Vec<ListenerInfo>,
    pub(crate) attributes: Vec<(String, Attribute)>,
}

impl DeploymentInfo {
    /// Empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute a servlet.
    #[must_use]
    pub fn with_servlet(mut self, servlet: ServletInfo) -> Self {
        self.add_servlet(servlet);
        self
    }

    /// Contribute a listener.
    #[must_use]
    pub fn with_listener(mut self, listener: ListenerInfo) -> Self {
        self.add_listener(listener);
        self
    }

    /// Contribute a context attribute.
    #[must_use]
    pub fn with_attribute<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.add_attribute(name, value);
        self
    }

    /// Contribute a servlet.
    pub fn add_servlet(&mut self, servlet: ServletInfo) {
        self.servlets.push(servlet);
    }

    /// Contribute a listener.
    pub fn add_listener(&mut self, listener: ListenerInfo) {
        self.listeners.push(listener);
    }

    /// Contribute a context attribute.
    pub fn add_attribute<T>(&mut self, name: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.attributes.push((name.into(), Arc::new(value)));
    }

    /// Contributed servlets.
    #[must_use]
    pub fn servlets(&self) -> &[ServletInfo] {
        &self.servlets
    }

    /// Contributed listeners.
    #[must_use]
    pub fn listeners(&self) -> &[ListenerInfo] {
        &self.listeners
    }

    /// Names of the contributed attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    /// Whether the fragment contributes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servlets.is_empty() && self.listeners.is_empty() && self.attributes.is_empty()
    }
}

impl fmt::Debug for DeploymentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentInfo")
            .field("servlets", &self.servlets)
            .field("listeners", &self.listeners)
            .field("attributes", &self.attribute_names().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct Contributed<T> {
    pub(crate) origin: String,
    pub(crate) entry: T,
}

/// Everything one deployment serves.
#[derive(Clone)]
pub struct DeploymentDescriptor {
    context_path: String,
    deployment_name: String,
    pub(crate) servlets: BTreeMap<String, Contributed<ServletInfo>>,
    pub(crate) listeners: BTreeMap<String, Contributed<ListenerInfo>>,
    pub(crate) attributes: BTreeMap<String, Contributed<Attribute>>,
}

impl DeploymentDescriptor {
    /// Empty descriptor for `deployment_name` served under `context_path`.
    pub fn new(context_path: impl Into<String>, deployment_name: impl Into<String>) -> Self {
        Self {
            context_path: context_path.into(),
            deployment_name: deployment_name.into(),
            servlets: BTreeMap::new(),
            listeners: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Context path every mapping is served under.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Deployment name.
    #[must_use]
    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    /// Servlets in name order.
    pub fn servlets(&self) -> impl Iterator<Item = &ServletInfo> {
        self.servlets.values().map(|contributed| &contributed.entry)
    }

    /// Look up a servlet by name.
    #[must_use]
    pub fn servlet(&self, name: &str) -> Option<&ServletInfo> {
        self.servlets.get(name).map(|contributed| &contributed.entry)
    }

    /// Listeners in name order; this is also their invocation order.
    pub fn listeners(&self) -> impl Iterator<Item = &ListenerInfo> {
        self.listeners.values().map(|contributed| &contributed.entry)
    }

    /// Context attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .map(|(name, contributed)| (name.as_str(), &contributed.entry))
    }

    /// Provider that contributed the named entry.
    #[must_use]
    pub fn origin(&self, kind: EntryKind, name: &str) -> Option<&str> {
        match kind {
            EntryKind::Servlet => self.servlets.get(name).map(|c| c.origin.as_str()),
            EntryKind::Listener => self.listeners.get(name).map(|c| c.origin.as_str()),
            EntryKind::Attribute => self.attributes.get(name).map(|c| c.origin.as_str()),
        }
    }

    /// Entry names per kind, for comparisons and logs.
    #[must_use]
    pub fn entry_names(&self) -> BTreeMap<EntryKind, Vec<&str>> {
        BTreeMap::from([
            (
                EntryKind::Servlet,
                self.servlets.keys().map(String::as_str).collect(),
            ),
            (
                EntryKind::Listener,
                self.listeners.keys().map(String::as_str).collect(),
            ),
            (
                EntryKind::Attribute,
                self.attributes.keys().map(String::as_str).collect(),
            ),
        ])
    }
}

impl fmt::Debug for DeploymentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentDescriptor")
            .field("context_path", &self.context_path)
            .field("deployment_name", &self.deployment_name)
            .field("entries", &self.entry_names())
            .finish()
    }
}
