//! HTTP listener selection for deployers.

use serde::Serialize;

use crate::error::{BootError, BootResult};
use crate::options::BootOptions;

/// Context path, deployment name and bind address a deployer should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerOptions {
    /// Path prefix every servlet mapping is served under.
    pub context_path: String,
    /// Name of the deployment, used in logs.
    pub deployment_name: String,
    /// Host or address to bind.
    pub bind: String,
    /// TCP port to bind; `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            context_path: "/".to_string(),
            deployment_name: "ROOT".to_string(),
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ListenerOptions {
    /// Read listener options from resolved boot properties under `prefix`.
    ///
    /// Keys: `{prefix}.context-path`, `{prefix}.deployment-name`,
    /// `{prefix}.bind`, `{prefix}.port`. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an interpolation error for unresolvable values and
    /// [`BootError::InvalidOption`] for a port that is not a `u16`.
    pub fn from_boot_options<O>(options: &O, prefix: &str) -> BootResult<Self>
    where
        O: BootOptions + ?Sized,
    {
        let lookup = |name: &str| -> BootResult<Option<String>> {
            let raw = options
                .boot_properties()
                .and_then(|properties| properties.get(&format!("{prefix}.{name}")));
            options.resolve(raw)
        };

        let mut listener = Self::default();
        if let Some(context_path) = lookup("context-path")? {
            listener.context_path = context_path;
        }
        if let Some(deployment_name) = lookup("deployment-name")? {
            listener.deployment_name = deployment_name;
        }
        if let Some(bind) = lookup("bind")? {
            listener.bind = bind;
        }
        if let Some(port) = lookup("port")? {
            listener.port = port
                .trim()
                .parse()
                .map_err(|_| BootError::InvalidOption {
                    property: format!("{prefix}.port"),
                    value: port.clone(),
                    reason: "not_a_port",
                })?;
        }
        Ok(listener)
    }
}
