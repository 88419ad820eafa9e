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

//! Binary entrypoint that boots Propulsor and serves until shutdown.

use std::process::ExitCode;

use propulsor_app::run_app;

/// Boots the application and returns its exit status.
#[tokio::main]
async fn main() -> ExitCode {
    run_app().await
}
