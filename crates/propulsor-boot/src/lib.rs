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

//! Boot-time option handling for Propulsor applications.
//!
//! Layout: `options.rs` (the [`BootOptions`] trait and its state), `args.rs`
//! (command-line flags and usage), `properties.rs` (boot-defaults file),
//! `interpolate.rs` (`${}` expansion), `system.rs` (process-wide properties),
//! `listener.rs` (HTTP listener selection), `status.rs` (deploy outcome),
//! `lifecycle.rs` (shutdown hooks).

pub mod args;
pub mod error;
pub mod interpolate;
pub mod lifecycle;
pub mod listener;
pub mod options;
pub mod properties;
pub mod status;
pub mod system;

pub use args::{BootArgs, DEFAULT_USAGE_WIDTH, print_usage, render_usage, usage_width};
pub use error::{BootError, BootResult};
pub use interpolate::{EnvValueSource, InterpolationError, Interpolator, ValueSource};
pub use lifecycle::{ShutdownAction, ShutdownError};
pub use listener::ListenerOptions;
pub use options::{BOOT_DEFAULTS_PROP, BootOptions, BootState};
pub use properties::Properties;
pub use status::{BootStatus, ERR_CANT_LISTEN, ERR_INIT, ERR_LOAD_BOOT_OPTIONS, ERR_PARSE_ARGS};
pub use system::{SystemProperties, installed_system_properties, system_property};
