//! REST application settings.

use propulsor_boot::{BootOptions, BootResult};
use serde::Serialize;

/// Application name used when none is configured.
pub const DEFAULT_APPLICATION_NAME: &str = "propulsor";

/// Dispatcher mapping used when none is configured.
pub const DEFAULT_REST_MAPPING: &str = "/api/*";

/// Settings of the REST application behind the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestAppConfig {
    /// Application name reported in the deployment metadata.
    pub application_name: String,
    /// URL patterns the dispatcher servlet is mapped to.
    pub mappings: Vec<String>,
}

impl Default for RestAppConfig {
    fn default() -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            mappings: vec![DEFAULT_REST_MAPPING.to_string()],
        }
    }
}

impl RestAppConfig {
    /// Read `{prefix}.application-name` and `{prefix}.mappings` (comma
    /// separated) from resolved boot properties. Missing or blank keys keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns an interpolation error for unresolvable values.
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

        let mut config = Self::default();
        if let Some(application_name) = lookup("application-name")? {
            config.application_name = application_name.trim().to_string();
        }
        if let Some(mappings) = lookup("mappings")? {
            let mappings: Vec<String> = mappings
                .split(',')
                .map(str::trim)
                .filter(|mapping| !mapping.is_empty())
                .map(str::to_string)
                .collect();
            if !mappings.is_empty() {
                config.mappings = mappings;
            }
        }
        Ok(config)
    }
}
