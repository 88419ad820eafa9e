//! The boot sequence: parse, load, publish, deploy, wait, shut down.
//!
//! # Design
//! - Each boot step maps its failure to a fixed exit code carried in a
//!   [`BootStatus`]; nothing after a failed step runs.
//! - The deployer is built from the loaded options, so provider settings read
//!   from boot defaults are honoured.
//! - Shutdown actions run in registration order before the deployer stops.

use std::env;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use propulsor_boot::{
    BOOT_DEFAULTS_PROP, BootOptions, BootStatus, ERR_INIT, ERR_LOAD_BOOT_OPTIONS, ERR_PARSE_ARGS,
    ShutdownAction, print_usage,
};
use propulsor_deploy::{Deployer, HttpDeployer};
use propulsor_rest::RestDeploymentProvider;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::options::AppBootOptions;
use crate::resources::{HealthDefaults, builtin_providers, builtin_resources};

/// Builds the deployer once options are loaded.
pub type DeployerFactory<O> = Box<dyn Fn(&O) -> Box<dyn Deployer> + Send + Sync>;

/// Result of [`Booter::boot`].
#[derive(Debug)]
pub enum BootOutcome {
    /// Help was requested; usage has been printed.
    Help,
    /// The deployment is serving.
    Running,
    /// A boot step failed.
    Failed(BootStatus),
}

impl BootOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Help | Self::Running => 0,
            Self::Failed(status) => status.exit_code(),
        }
    }
}

/// Drives one application from raw arguments to a running deployment.
pub struct Booter<O: BootOptions> {
    options: O,
    deployer_factory: DeployerFactory<O>,
    deployer: Option<Box<dyn Deployer>>,
    shutdown_actions: Vec<Arc<dyn ShutdownAction>>,
    home: Option<String>,
    boot_defaults: Option<PathBuf>,
}

impl<O: BootOptions> Booter<O> {
    /// Booter for `options`, deploying with the deployer `deployer_factory` builds.
    pub fn new(options: O, deployer_factory: DeployerFactory<O>) -> Self {
        Self {
            options,
            deployer_factory,
            deployer: None,
            shutdown_actions: Vec::new(),
            home: None,
            boot_defaults: None,
        }
    }

    /// Use `home` instead of the home environment variable.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Read boot defaults from `path` instead of `<home>/etc/boot.properties`.
    #[must_use]
    pub fn with_boot_defaults(mut self, path: impl Into<PathBuf>) -> Self {
        self.boot_defaults = Some(path.into());
        self
    }

    /// Run `action` on shutdown, after previously registered actions.
    #[must_use]
    pub fn with_shutdown_action(mut self, action: Arc<dyn ShutdownAction>) -> Self {
        self.shutdown_actions.push(action);
        self
    }

    /// The boot options.
    pub const fn options(&self) -> &O {
        &self.options
    }

    /// Address the deployment listens on while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.deployer.as_ref().and_then(|deployer| deployer.local_addr())
    }

    /// Parse `args`, load boot defaults, publish system properties and deploy.
    pub async fn boot<I, T>(&mut self, args: I) -> BootOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        match self.options.parse_args(args) {
            Ok(true) => {}
            Ok(false) => return BootOutcome::Help,
            Err(err) => {
                print_usage(Some(&err));
                return BootOutcome::Failed(BootStatus::failed(ERR_PARSE_ARGS, err));
            }
        }

        let home = self
            .home
            .clone()
            .or_else(|| env::var(self.options.home_envar()).ok());
        let boot_defaults = self.boot_defaults.clone().or_else(|| {
            home.as_deref()
                .map(|home| Path::new(home).join("etc").join(BOOT_DEFAULTS_PROP))
        });
        if let Err(err) = self.options.load(boot_defaults.as_deref(), home.as_deref()) {
            error!(error = %err, detail = ?err, "failed to load boot options");
            return BootOutcome::Failed(BootStatus::failed(ERR_LOAD_BOOT_OPTIONS, err));
        }

        match self.options.set_system_properties() {
            Ok(properties) => info!(count = properties.len(), "system properties published"),
            Err(err) => {
                error!(error = %err, detail = ?err, "failed to publish system properties");
                return BootOutcome::Failed(BootStatus::failed(ERR_INIT, err));
            }
        }

        let mut deployer = (self.deployer_factory)(&self.options);
        let status = deployer.deploy(&self.options).await;
        self.deployer = Some(deployer);
        if status.is_success() {
            BootOutcome::Running
        } else {
            BootOutcome::Failed(status)
        }
    }

    /// Run shutdown actions, then stop the deployer.
    ///
    /// # Errors
    ///
    /// Returns the first [`AppError::Shutdown`]; every action and the deployer
    /// stop still run.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        let mut first_error = None;
        for action in &self.shutdown_actions {
            match action.shutdown() {
                Ok(()) => info!(action = action.name(), "shutdown action completed"),
                Err(source) => {
                    warn!(action = action.name(), error = %source, "shutdown action failed");
                    if first_error.is_none() {
                        first_error = Some(AppError::Shutdown {
                            action: action.name().to_string(),
                            source,
                        });
                    }
                }
            }
        }
        if let Some(deployer) = self.deployer.as_mut() {
            deployer.stop().await;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Boot, wait for Ctrl-C or SIGTERM, then shut down.
    pub async fn run<I, T>(mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        match self.boot(args).await {
            BootOutcome::Running => {}
            outcome => {
                self.stop_quietly().await;
                return ExitCode::from(outcome.exit_code());
            }
        }

        if let Err(err) = shutdown_signal().await {
            error!(error = %err, "shutdown signal listener failed");
        }
        info!("shutdown requested");
        match self.shutdown().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %err, detail = ?err, "shutdown completed with errors");
                ExitCode::FAILURE
            }
        }
    }

    async fn stop_quietly(&mut self) {
        if let Some(deployer) = self.deployer.as_mut() {
            deployer.stop().await;
        }
    }
}

impl<O: BootOptions> std::fmt::Debug for Booter<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Booter")
            .field("home", &self.home)
            .field("boot_defaults", &self.boot_defaults)
            .field("shutdown_actions", &self.shutdown_actions.len())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

/// Booter wired with the built-in REST resources and health defaults.
#[must_use]
pub fn app_booter(options: AppBootOptions) -> Booter<AppBootOptions> {
    Booter::new(
        options,
        Box::new(|options: &AppBootOptions| {
            let rest = RestDeploymentProvider::from_instances(
                builtin_resources(options.settings()),
                builtin_providers(),
                options.rest().clone(),
            );
            Box::new(
                HttpDeployer::new(vec![Arc::new(rest)]).with_defaults(Arc::new(HealthDefaults)),
            ) as Box<dyn Deployer>
        }),
    )
}

#[cfg(unix)]
async fn shutdown_signal() -> AppResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).map_err(|source| AppError::Signal { source })?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map_err(|source| AppError::Signal { source }),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> AppResult<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Signal { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use propulsor_boot::{BootError, ShutdownError};
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ShutdownAction for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn shutdown(&self) -> Result<(), ShutdownError> {
            if let Ok(mut log) = self.log.lock() {
                log.push(self.name);
            }
            if self.fail {
                return Err("action failed".into());
            }
            Ok(())
        }
    }

    fn booter() -> Booter<AppBootOptions> {
        app_booter(AppBootOptions::new()).with_home("/nonexistent/propulsor")
    }

    #[tokio::test]
    async fn help_short_circuits_boot() {
        let mut booter = booter();
        let outcome = booter.boot(["--help"]).await;
        assert!(matches!(outcome, BootOutcome::Help));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(booter.local_addr(), None);
    }

    #[tokio::test]
    async fn parse_errors_exit_with_parse_code() {
        let mut booter = booter();
        let outcome = booter.boot(["--bogus"]).await;
        assert_eq!(outcome.exit_code(), u8::try_from(ERR_PARSE_ARGS).unwrap_or(0));
        match outcome {
            BootOutcome::Failed(status) => assert!(matches!(
                status.cause().and_then(|c| c.downcast_ref::<BootError>()),
                Some(BootError::ArgumentParse { .. })
            )),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_errors_exit_with_load_code() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let defaults = dir.path().join("boot.properties");
        std::fs::write(&defaults, "broken=${undefined.key}\n")?;

        let mut booter = booter().with_boot_defaults(&defaults);
        let outcome = booter.boot(Vec::<String>::new()).await;
        assert_eq!(
            outcome.exit_code(),
            u8::try_from(ERR_LOAD_BOOT_OPTIONS).unwrap_or(0)
        );
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_runs_every_action_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let action = |name, fail| {
            Arc::new(Recording {
                name,
                fail,
                log: Arc::clone(&log),
            }) as Arc<dyn ShutdownAction>
        };
        let mut booter = booter()
            .with_shutdown_action(action("first", false))
            .with_shutdown_action(action("second", true))
            .with_shutdown_action(action("third", false));

        let result = booter.shutdown().await;
        assert!(matches!(
            result,
            Err(AppError::Shutdown { ref action, .. }) if action == "second"
        ));
        let log = log.lock().map(|log| log.clone()).unwrap_or_default();
        assert_eq!(log, vec!["first", "second", "third"]);
    }
}
