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

//! Servlet-style HTTP deployments for Propulsor.
//!
//! A deployment is described by a [`DeploymentDescriptor`] (servlets, request
//! listeners, context attributes) assembled from [`DeploymentProvider`]
//! contributions, turned into an axum router by the [`ServletContainer`], and
//! served by the [`HttpDeployer`].
//!
//! Layout: `descriptor.rs` (model), `provider.rs` (contribution traits),
//! `merge.rs` (provider merge), `mapping.rs` (URL patterns),
//! `listeners.rs` (request listener middleware), `container.rs` (descriptor to
//! router), `server.rs` (bound listener), `deployer.rs` (start/stop state
//! machine).

pub mod container;
pub mod deployer;
pub mod descriptor;
pub mod error;
pub mod listeners;
pub mod mapping;
pub mod merge;
pub mod provider;
pub mod server;

pub use container::{DeploymentManager, ServletContainer, ServletContext, ServletPath};
pub use deployer::{DeployState, Deployer, HttpDeployer};
pub use descriptor::{
    Attribute, DeploymentDescriptor, DeploymentInfo, EntryKind, ListenerInfo, RequestListener,
    Servlet, ServletError, ServletInfo,
};
pub use error::{DeployError, DeployResult};
pub use listeners::{RequestListenerLayer, RequestListenerService};
pub use mapping::{MappingTable, UrlPattern};
pub use merge::merge_from_providers;
pub use provider::{DeploymentDefaultsProvider, DeploymentProvider};
pub use server::ServerHandle;
