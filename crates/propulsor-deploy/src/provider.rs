//! Contribution traits implemented by deployment providers.

use crate::descriptor::DeploymentInfo;

/// Contributes servlets, listeners and context attributes to a deployment.
pub trait DeploymentProvider: Send + Sync {
    /// Stable provider name, recorded as the origin of every contributed entry.
    ///
    /// Names must be unique among the providers of one deployment.
    fn name(&self) -> &str;

    /// Entries this provider contributes to the deployment served under
    /// `context_path` as `deployment_name`.
    fn deployment_info(&self, context_path: &str, deployment_name: &str) -> DeploymentInfo;
}

/// Seeds baseline entries before any [`DeploymentProvider`] is applied.
pub trait DeploymentDefaultsProvider: Send + Sync {
    /// Origin name recorded for the seeded entries.
    fn name(&self) -> &str {
        "defaults"
    }

    /// Add baseline entries to `info`.
    fn set_defaults(&self, info: &mut DeploymentInfo, context_path: &str, deployment_name: &str);
}
