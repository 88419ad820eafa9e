#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! REST deployments for Propulsor.
//!
//! [`RestDeploymentProvider`] contributes one dispatcher servlet, a
//! request-scope listener and the [`RestDeployment`] metadata the dispatcher
//! reads when it initialises.
//!
//! Layout: `resource.rs` (resource/provider traits and classes), `config.rs`
//! (application settings), `dispatcher.rs` (the servlet), `scope.rs`
//! (per-request scope), `provider.rs` (the deployment provider).

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod resource;
pub mod scope;

pub use config::{DEFAULT_APPLICATION_NAME, DEFAULT_REST_MAPPING, RestAppConfig};
pub use dispatcher::RestDispatcher;
pub use error::RestError;
pub use provider::{
    REST_DEPLOYMENT_ATTRIBUTE, REST_PROVIDER_PREFIX, REST_SCOPE_LISTENER, REST_SERVLET_NAME,
    RestDeployment, RestDeploymentProvider,
};
pub use resource::{ProviderClass, ResourceClass, RestClass, RestProvider, RestResource};
pub use scope::{RequestScope, RequestScopeListener};
