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

//! Telemetry primitives shared across the Propulsor workspace.
//!
//! Layout: `init.rs` (subscriber installation), `layers.rs` (HTTP request-id and
//! trace layers), `error.rs` (telemetry error type).

pub mod error;
pub mod init;
pub mod layers;

pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging,
    log_format_from_value,
};
pub use layers::{
    HttpTraceLayer, RecordResponse, RequestSpan, http_trace_layer, propagate_request_id_layer,
    set_request_id_layer,
};
