//! The [`BootOptions`] trait: argument parsing, home/config resolution and
//! boot-defaults interpolation.
//!
//! # Design
//! - Applications implement the three key accessors and expose a [`BootState`];
//!   everything else is provided.
//! - Hooks (`load_application_options`, `set_application_system_properties`)
//!   default to no-ops.
//! - The interpolator is memoized in the state and reused across `resolve` calls.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::iter;
use std::path::Path;

use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::args::{BootArgs, print_usage};
use crate::error::{BootError, BootResult};
use crate::interpolate::{EnvValueSource, Interpolator, ValueSource};
use crate::listener::ListenerOptions;
use crate::properties::Properties;
use crate::system::SystemProperties;

/// Well-known resource name of the boot-defaults file.
pub const BOOT_DEFAULTS_PROP: &str = "boot.properties";

const PROGRAM_NAME: &str = "propulsor";

/// Mutable boot state shared by every [`BootOptions`] implementation.
#[derive(Debug, Default)]
pub struct BootState {
    help: bool,
    config: Option<String>,
    home_dir: Option<String>,
    boot_properties: Option<Properties>,
    interpolator: OnceCell<Interpolator>,
}

impl BootState {
    /// Empty state: no explicit home dir, config or boot properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with an explicit home directory.
    #[must_use]
    pub fn with_home_dir(home_dir: impl Into<String>) -> Self {
        Self {
            home_dir: Some(home_dir.into()),
            ..Self::default()
        }
    }
}

/// Boot-time options of an application.
///
/// Implementations name the process-wide keys for the home directory and the
/// config file and may extend loading and property publication through the
/// hook methods.
pub trait BootOptions: Send + Sync {
    /// System property key holding the home directory.
    fn home_system_property(&self) -> &str;

    /// System property key holding the config file path.
    fn config_system_property(&self) -> &str;

    /// Environment variable that may point at the home directory.
    fn home_envar(&self) -> &str;

    /// Shared boot state.
    fn state(&self) -> &BootState;

    /// Shared boot state, mutably.
    fn state_mut(&mut self) -> &mut BootState;

    /// Hook invoked at the end of [`BootOptions::load`].
    ///
    /// # Errors
    ///
    /// Implementations report option values that fail to resolve.
    fn load_application_options(&mut self) -> BootResult<()> {
        Ok(())
    }

    /// Hook invoked while building system properties.
    fn set_application_system_properties(&self, _properties: &mut SystemProperties) {}

    /// Listener settings for HTTP deployers; `None` selects the defaults.
    fn listener_options(&self) -> Option<ListenerOptions> {
        None
    }

    /// Whether the help flag was given.
    fn is_help(&self) -> bool {
        self.state().help
    }

    /// Set the help flag.
    fn set_help(&mut self, help: bool) {
        self.state_mut().help = help;
    }

    /// Boot properties loaded by [`BootOptions::load`], if any.
    fn boot_properties(&self) -> Option<&Properties> {
        self.state().boot_properties.as_ref()
    }

    /// Home directory: the explicit value, else `<user-home>/.<home-property>`.
    ///
    /// `None` only when no explicit value is set and the user home is unknown.
    fn home_dir(&self) -> Option<String> {
        if let Some(home_dir) = &self.state().home_dir {
            return Some(home_dir.clone());
        }
        dirs::home_dir().map(|user_home| {
            user_home
                .join(format!(".{}", self.home_system_property()))
                .to_string_lossy()
                .into_owned()
        })
    }

    /// Set an explicit home directory.
    fn set_home_dir(&mut self, home_dir: String) {
        self.state_mut().home_dir = Some(home_dir);
    }

    /// Config path: the explicit value, else
    /// `<home-dir>/.<home-property>/etc/main.conf`.
    fn config(&self) -> Option<String> {
        if let Some(config) = &self.state().config {
            return Some(config.clone());
        }
        self.home_dir().map(|home_dir| {
            Path::new(&home_dir)
                .join(format!(".{}", self.home_system_property()))
                .join("etc")
                .join("main.conf")
                .to_string_lossy()
                .into_owned()
        })
    }

    /// Set or clear an explicit config path.
    fn set_config(&mut self, config: Option<String>) {
        self.state_mut().config = config;
    }

    /// Expand `${}` expressions in `value`.
    ///
    /// Blank input yields `None`. Before any boot properties or home directory
    /// are known the value is returned unchanged. Otherwise expressions resolve
    /// against the home directory (bound to [`BootOptions::home_system_property`]),
    /// the boot properties, and `env.*` environment lookups, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::Interpolation`] for undefined or cyclic references.
    fn resolve(&self, value: Option<&str>) -> BootResult<Option<String>> {
        let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
            return Ok(None);
        };

        let state = self.state();
        if state.boot_properties.is_none() && state.home_dir.is_none() {
            return Ok(Some(value.to_string()));
        }

        let interpolation_error = |source| BootError::Interpolation {
            value: value.to_string(),
            source,
        };
        let interpolator = state
            .interpolator
            .get_or_try_init(Interpolator::new)
            .map_err(interpolation_error)?;

        let mut home = BTreeMap::new();
        if let Some(home_dir) = self.home_dir() {
            home.insert(self.home_system_property().to_string(), home_dir);
        }
        let empty = Properties::default();
        let properties = state.boot_properties.as_ref().unwrap_or(&empty);
        let sources: [&dyn ValueSource; 3] = [&home, properties, &EnvValueSource];

        interpolator
            .interpolate(value, &sources)
            .map(Some)
            .map_err(interpolation_error)
    }

    /// Parse command-line arguments (without the program name).
    ///
    /// Returns `false` when the help flag was given; usage has then been
    /// written to standard error and the caller must not start.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::ArgumentParse`] for malformed flags.
    fn parse_args<I, T>(&mut self, args: I) -> BootResult<bool>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
        Self: Sized,
    {
        let argv = iter::once(OsString::from(PROGRAM_NAME)).chain(args.into_iter().map(Into::into));
        let parsed =
            BootArgs::try_parse_from(argv).map_err(|source| BootError::ArgumentParse { source })?;
        self.apply_args(parsed);

        if self.is_help() {
            print_usage(None);
            return Ok(false);
        }
        Ok(true)
    }

    /// Copy parsed flags into the state.
    fn apply_args(&mut self, args: BootArgs) {
        let state = self.state_mut();
        state.help = args.help;
        if let Some(config) = args.config {
            state.config = Some(config);
        }
    }

    /// Load boot defaults and the home directory, then run the application hook.
    ///
    /// A missing boot-defaults file leaves the property bag empty. Every loaded
    /// value must interpolate.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::Io`] when an existing file cannot be read and
    /// [`BootError::Interpolation`] when a value references an undefined key.
    fn load(&mut self, boot_defaults: Option<&Path>, home: Option<&str>) -> BootResult<()> {
        let properties = match boot_defaults {
            Some(path) if path.exists() => Properties::read(path)?,
            Some(path) => {
                debug!(path = %path.display(), "boot defaults not found");
                Properties::default()
            }
            None => Properties::default(),
        };

        let values: Vec<String> = properties.iter().map(|(_, value)| value.to_string()).collect();
        let state = self.state_mut();
        if let Some(home) = home {
            state.home_dir = Some(home.to_string());
        }
        state.boot_properties = Some(properties);

        for value in &values {
            self.resolve(Some(value))?;
        }
        debug!(properties = values.len(), "boot defaults loaded");

        self.load_application_options()
    }

    /// Build the system properties this application publishes.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::InvariantViolation`] when the home directory or
    /// config path cannot be resolved.
    fn system_properties(&self) -> BootResult<SystemProperties> {
        let home_dir = self.home_dir().ok_or_else(|| BootError::InvariantViolation {
            property: self.home_system_property().to_string(),
            reason: "home_dir_not_specified",
        })?;
        let config = self.config().ok_or_else(|| BootError::InvariantViolation {
            property: self.config_system_property().to_string(),
            reason: "config_not_specified",
        })?;

        let mut properties = SystemProperties::default();
        properties.set(self.home_system_property(), home_dir);
        properties.set(self.config_system_property(), config);
        self.set_application_system_properties(&mut properties);
        Ok(properties)
    }

    /// Publish the system properties process-wide.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::InvariantViolation`] for unresolved required paths
    /// and [`BootError::PropertiesAlreadyInstalled`] on a second call.
    fn set_system_properties(&self) -> BootResult<&'static SystemProperties> {
        self.system_properties()?.install()
    }
}
