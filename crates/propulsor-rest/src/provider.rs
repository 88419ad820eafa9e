//! The REST deployment provider.

use std::collections::BTreeSet;
use std::sync::Arc;

use propulsor_deploy::{DeploymentInfo, DeploymentProvider, ListenerInfo, ServletInfo};
use tracing::debug;

use crate::config::RestAppConfig;
use crate::dispatcher::RestDispatcher;
use crate::resource::{ProviderClass, ResourceClass, RestClass, RestProvider, RestResource};
use crate::scope::RequestScopeListener;

/// Context attribute holding the [`RestDeployment`].
pub const REST_DEPLOYMENT_ATTRIBUTE: &str = "propulsor.rest.deployment";

/// Name of the dispatcher servlet.
pub const REST_SERVLET_NAME: &str = "REST";

/// Name of the request-scope listener.
pub const REST_SCOPE_LISTENER: &str = "RequestScopeListener";

/// Prefix of the provider name; the application name follows it.
pub const REST_PROVIDER_PREFIX: &str = "rest";

/// Metadata the dispatcher reads when it initialises.
#[derive(Debug, Clone)]
pub struct RestDeployment {
    application_name: String,
    resources: Vec<ResourceClass>,
    providers: Vec<ProviderClass>,
}

impl RestDeployment {
    /// Application name.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Registered resources.
    #[must_use]
    pub fn resources(&self) -> &[ResourceClass] {
        &self.resources
    }

    /// Registered providers.
    #[must_use]
    pub fn providers(&self) -> &[ProviderClass] {
        &self.providers
    }
}

/// Contributes the REST dispatcher, its scope listener and its metadata.
#[derive(Debug, Clone)]
pub struct RestDeploymentProvider {
    name: String,
    config: RestAppConfig,
    resources: Vec<ResourceClass>,
    providers: Vec<ProviderClass>,
}

impl RestDeploymentProvider {
    /// Provider over resource and provider registrations, named
    /// `rest:<application-name>`.
    #[must_use]
    pub fn new(
        resources: Vec<ResourceClass>,
        providers: Vec<ProviderClass>,
        config: RestAppConfig,
    ) -> Self {
        Self {
            name: format!("{REST_PROVIDER_PREFIX}:{}", config.application_name),
            config,
            resources,
            providers,
        }
    }

    /// Provider over already-built instances, registered under their own names.
    #[must_use]
    pub fn from_instances(
        resources: Vec<Arc<dyn RestResource>>,
        providers: Vec<Arc<dyn RestProvider>>,
        config: RestAppConfig,
    ) -> Self {
        let resources = resources
            .into_iter()
            .map(|resource| RestClass::instance(resource.name().to_string(), resource))
            .collect();
        let providers = providers
            .into_iter()
            .map(|provider| RestClass::instance(provider.name().to_string(), provider))
            .collect();
        Self::new(resources, providers, config)
    }

    /// Replace the provider name used as the origin of every contributed entry.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Application settings.
    #[must_use]
    pub const fn config(&self) -> &RestAppConfig {
        &self.config
    }

    /// Names of every registered resource and provider.
    #[must_use]
    pub fn classes(&self) -> BTreeSet<String> {
        self.resources
            .iter()
            .map(RestClass::name)
            .chain(self.providers.iter().map(RestClass::name))
            .map(str::to_string)
            .collect()
    }

    fn rest_deployment(&self) -> RestDeployment {
        RestDeployment {
            application_name: self.config.application_name.clone(),
            resources: self.resources.clone(),
            providers: self.providers.clone(),
        }
    }
}

impl DeploymentProvider for RestDeploymentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn deployment_info(&self, context_path: &str, deployment_name: &str) -> DeploymentInfo {
        debug!(
            context_path,
            deployment = deployment_name,
            application = %self.config.application_name,
            mappings = ?self.config.mappings,
            classes = ?self.classes(),
            "contributing rest deployment"
        );
        DeploymentInfo::new()
            .with_servlet(
                ServletInfo::new(REST_SERVLET_NAME, Arc::new(RestDispatcher))
                    .with_mappings(self.config.mappings.iter().cloned())
                    .with_async_supported(true)
                    .with_load_on_startup(1),
            )
            .with_listener(ListenerInfo::new(
                REST_SCOPE_LISTENER,
                Arc::new(RequestScopeListener),
            ))
            .with_attribute(REST_DEPLOYMENT_ATTRIBUTE, self.rest_deployment())
    }
}
