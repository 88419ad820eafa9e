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

//! Propulsor application composition root.
//!
//! Layout: `options.rs` (application boot options), `resources.rs` (built-in
//! REST resources and deployment defaults), `booter.rs` (boot sequence and
//! shutdown), `error.rs` (application errors).

pub mod booter;
pub mod error;
pub mod options;
pub mod resources;

pub use booter::{BootOutcome, Booter, DeployerFactory, app_booter};
pub use error::{AppError, AppResult};
pub use options::AppBootOptions;
pub use resources::{Settings, SettingsResource};

use std::process::ExitCode;

use propulsor_telemetry::{LogFormat, LoggingConfig, init_logging, log_format_from_value};

/// Environment variable selecting `json` or `pretty` log output.
pub const LOG_FORMAT_ENVAR: &str = "PROPULSOR_LOG_FORMAT";

/// Install logging, then boot the application with the process arguments and
/// serve until a shutdown signal arrives.
pub async fn run_app() -> ExitCode {
    let format = log_format_from_value(std::env::var(LOG_FORMAT_ENVAR).ok().as_deref())
        .unwrap_or_else(LogFormat::infer);
    let logging = LoggingConfig {
        format,
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        let err = AppError::telemetry("telemetry.init", err);
        eprintln!("{err}: {err:?}");
    }
    app_booter(AppBootOptions::new())
        .run(std::env::args_os().skip(1))
        .await
}
