//! HTTP deployer: merge providers, start the container, bind the listener.
//!
//! # Design
//! - States: `NotStarted -> Starting -> Running | FailedToStart`, and
//!   `Running -> Stopped`. `Stopped` and `FailedToStart` may deploy again.
//! - Any failure while starting is reported as a failed [`BootStatus`] with
//!   [`ERR_CANT_LISTEN`]; nothing is retried.
//! - `deploy`/`stop` take `&mut self`; callers serialise them.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use propulsor_boot::{BootOptions, BootStatus, ERR_CANT_LISTEN, ListenerOptions};
use tracing::{debug, error, info, warn};

use crate::container::ServletContainer;
use crate::descriptor::DeploymentDescriptor;
use crate::error::DeployResult;
use crate::merge::merge_from_providers;
use crate::provider::{DeploymentDefaultsProvider, DeploymentProvider};
use crate::server::ServerHandle;

/// Lifecycle state of an [`HttpDeployer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    /// `deploy` was never called.
    NotStarted,
    /// A deploy attempt is in progress.
    Starting,
    /// The listener is bound and serving.
    Running,
    /// The last deploy attempt failed.
    FailedToStart,
    /// The server was stopped.
    Stopped,
}

impl DeployState {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::FailedToStart => "failed_to_start",
            Self::Stopped => "stopped",
        }
    }
}

/// Something that can serve a deployment for the configured boot options.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Start serving; the status reports success or the failure cause.
    async fn deploy(&mut self, options: &dyn BootOptions) -> BootStatus;

    /// Stop serving; a no-op unless running.
    async fn stop(&mut self);

    /// Bound address while running.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Deploys provider contributions on an embedded axum server.
pub struct HttpDeployer {
    providers: Vec<Arc<dyn DeploymentProvider>>,
    defaults: Option<Arc<dyn DeploymentDefaultsProvider>>,
    container: ServletContainer,
    state: DeployState,
    server: Option<ServerHandle>,
}

impl HttpDeployer {
    /// Deployer over `providers`, applied in the given order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn DeploymentProvider>>) -> Self {
        Self {
            providers,
            defaults: None,
            container: ServletContainer::new(),
            state: DeployState::NotStarted,
            server: None,
        }
    }

    /// Seed every deployment with `defaults` before the providers.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Arc<dyn DeploymentDefaultsProvider>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DeployState {
        self.state
    }

    /// Merged descriptor of the last deployment named `deployment_name`.
    #[must_use]
    pub fn deployment(&self, deployment_name: &str) -> Option<&DeploymentDescriptor> {
        self.container.deployment(deployment_name)
    }

    fn transition(&mut self, next: DeployState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "deploy state changed");
        self.state = next;
    }

    async fn start(&mut self, listener: &ListenerOptions) -> DeployResult<ServerHandle> {
        let mut descriptor =
            DeploymentDescriptor::new(&listener.context_path, &listener.deployment_name);
        merge_from_providers(&mut descriptor, self.defaults.as_deref(), &self.providers)?;

        let mut manager = self.container.add_deployment(descriptor);
        manager.deploy()?;
        let router = manager.start()?;
        ServerHandle::bind(&listener.bind, listener.port, router).await
    }
}

#[async_trait]
impl Deployer for HttpDeployer {
    async fn deploy(&mut self, options: &dyn BootOptions) -> BootStatus {
        if self.state == DeployState::Running {
            warn!("deploy requested while running; stopping the current server first");
            self.stop().await;
        }

        let listener = options.listener_options().unwrap_or_default();
        self.transition(DeployState::Starting);
        info!(
            deployment = %listener.deployment_name,
            context_path = %listener.context_path,
            bind = %listener.bind,
            port = listener.port,
            providers = self.providers.len(),
            "starting http deployment"
        );

        match self.start(&listener).await {
            Ok(server) => {
                let port = server.local_addr().port();
                self.server = Some(server);
                self.transition(DeployState::Running);
                println!("Listening on {}:{port}", listener.bind);
                info!(bind = %listener.bind, port, "http deployment running");
                BootStatus::Success
            }
            Err(err) => {
                self.transition(DeployState::FailedToStart);
                error!(error = %err, detail = ?err, "http deployment failed to start");
                BootStatus::failed(ERR_CANT_LISTEN, err)
            }
        }
    }

    async fn stop(&mut self) {
        if self.state != DeployState::Running {
            return;
        }
        if let Some(server) = self.server.take()
            && let Err(err) = server.stop().await
        {
            warn!(error = %err, "http server stopped with an error");
        }
        self.transition(DeployState::Stopped);
        info!("http deployment stopped");
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::local_addr)
    }
}

impl std::fmt::Debug for HttpDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDeployer")
            .field("providers", &self.providers.len())
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_labels_are_stable() {
        let labels: Vec<&str> = [
            DeployState::NotStarted,
            DeployState::Starting,
            DeployState::Running,
            DeployState::FailedToStart,
            DeployState::Stopped,
        ]
        .into_iter()
        .map(DeployState::as_str)
        .collect();
        assert_eq!(
            labels,
            vec!["not_started", "starting", "running", "failed_to_start", "stopped"]
        );
    }

    #[tokio::test]
    async fn stop_before_deploy_keeps_not_started() {
        let mut deployer = HttpDeployer::new(Vec::new());
        deployer.stop().await;
        assert_eq!(deployer.state(), DeployState::NotStarted);
        assert_eq!(deployer.local_addr(), None);
        assert!(format!("{deployer:?}").contains("NotStarted"));
    }
}
