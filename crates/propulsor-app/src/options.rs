//! Boot options of the Propulsor application.

use propulsor_boot::{BootOptions, BootResult, BootState, ListenerOptions, SystemProperties};
use propulsor_rest::RestAppConfig;

use crate::resources::Settings;

/// Property naming the home directory.
pub const HOME_PROPERTY: &str = "propulsor.home";
/// Property naming the config file.
pub const CONFIG_PROPERTY: &str = "propulsor.config";
/// Environment variable that may point at the home directory.
pub const HOME_ENVAR: &str = "PROPULSOR_HOME";
/// Boot-defaults prefix of the HTTP listener settings.
pub const LISTENER_PREFIX: &str = "propulsor.http";
/// Boot-defaults prefix of the REST application settings.
pub const REST_PREFIX: &str = "propulsor.rest";

/// Boot options with HTTP listener and REST settings.
#[derive(Debug, Default)]
pub struct AppBootOptions {
    state: BootState,
    listener: Option<ListenerOptions>,
    rest: RestAppConfig,
}

impl AppBootOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with an explicit home directory.
    #[must_use]
    pub fn with_home_dir(home_dir: impl Into<String>) -> Self {
        Self {
            state: BootState::with_home_dir(home_dir),
            ..Self::default()
        }
    }

    /// REST application settings.
    #[must_use]
    pub const fn rest(&self) -> &RestAppConfig {
        &self.rest
    }

    /// Effective listener and REST settings; listener defaults apply until
    /// loaded.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            listener: self.listener.clone().unwrap_or_default(),
            rest: self.rest.clone(),
        }
    }
}

impl BootOptions for AppBootOptions {
    fn home_system_property(&self) -> &str {
        HOME_PROPERTY
    }

    fn config_system_property(&self) -> &str {
        CONFIG_PROPERTY
    }

    fn home_envar(&self) -> &str {
        HOME_ENVAR
    }

    fn state(&self) -> &BootState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BootState {
        &mut self.state
    }

    fn load_application_options(&mut self) -> BootResult<()> {
        let listener = ListenerOptions::from_boot_options(&*self, LISTENER_PREFIX)?;
        let rest = RestAppConfig::from_boot_options(&*self, REST_PREFIX)?;
        self.listener = Some(listener);
        self.rest = rest;
        Ok(())
    }

    fn set_application_system_properties(&self, properties: &mut SystemProperties) {
        if let Some(listener) = &self.listener {
            properties.set(format!("{LISTENER_PREFIX}.bind"), listener.bind.clone());
            properties.set(format!("{LISTENER_PREFIX}.port"), listener.port.to_string());
            properties.set(
                format!("{LISTENER_PREFIX}.context-path"),
                listener.context_path.clone(),
            );
        }
        properties.set(
            format!("{REST_PREFIX}.application-name"),
            self.rest.application_name.clone(),
        );
    }

    fn listener_options(&self) -> Option<ListenerOptions> {
        self.listener.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fs;

    #[test]
    fn listener_is_unset_until_loaded() {
        let options = AppBootOptions::with_home_dir("/h");
        assert_eq!(options.listener_options(), None);
        assert_eq!(options.config().as_deref(), Some("/h/.propulsor.home/etc/main.conf"));
    }

    #[test]
    fn load_reads_listener_and_rest_settings() -> Result<(), Box<dyn Error>> {
        let home = tempfile::tempdir()?;
        let defaults = home.path().join("boot.properties");
        fs::write(
            &defaults,
            "propulsor.http.port=9000\npropulsor.http.context-path=/svc\npropulsor.rest.mappings=/rest/*\n",
        )?;

        let mut options = AppBootOptions::new();
        options.load(Some(&defaults), home.path().to_str())?;

        let listener = options.listener_options().ok_or("listener not loaded")?;
        assert_eq!(listener.port, 9000);
        assert_eq!(listener.context_path, "/svc");
        assert_eq!(options.rest().mappings, vec!["/rest/*"]);
        assert_eq!(options.settings().listener, listener);

        let properties = options.system_properties()?;
        assert_eq!(properties.get("propulsor.http.port"), Some("9000"));
        assert_eq!(properties.get(HOME_PROPERTY), home.path().to_str());
        Ok(())
    }
}
