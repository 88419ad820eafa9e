//! Error types for deployment assembly and serving.

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

use crate::descriptor::{EntryKind, ServletError};

/// Result alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Primary error type for deployments.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Two providers contributed an entry with the same name.
    #[error("deployment entry contributed twice")]
    Conflict {
        /// Kind of the conflicting entry.
        kind: EntryKind,
        /// Entry name.
        name: String,
        /// Provider that contributed the entry first.
        existing: String,
        /// Provider whose contribution was rejected.
        provider: String,
    },
    /// Two providers in one merge share a name.
    #[error("deployment provider name used more than once")]
    DuplicateProvider {
        /// Shared provider name.
        provider: String,
    },
    /// A servlet declared a URL pattern that cannot be mapped.
    #[error("invalid servlet url pattern")]
    InvalidMapping {
        /// Servlet declaring the pattern.
        servlet: String,
        /// Offending pattern.
        pattern: String,
    },
    /// Two servlets declared the same URL pattern.
    #[error("url pattern mapped to more than one servlet")]
    DuplicateMapping {
        /// Pattern declared twice.
        pattern: String,
        /// Servlet that declared the pattern first.
        first: String,
        /// Servlet whose declaration was rejected.
        second: String,
    },
    /// The context path is not an absolute, wildcard-free path.
    #[error("invalid context path")]
    InvalidContextPath {
        /// Offending context path.
        context_path: String,
    },
    /// A servlet failed to initialise.
    #[error("servlet failed to initialise")]
    ServletInit {
        /// Servlet name.
        servlet: String,
        /// Error raised by the servlet.
        source: ServletError,
    },
    /// A router was requested before the deployment was deployed.
    #[error("deployment has not been deployed")]
    NotDeployed {
        /// Deployment name.
        deployment: String,
    },
    /// The listener could not bind its address.
    #[error("failed to bind http listener")]
    Bind {
        /// Requested `host:port`.
        address: String,
        /// Source IO error.
        source: io::Error,
    },
    /// The server terminated with an IO error.
    #[error("http server terminated with an error")]
    Serve {
        /// Source IO error.
        source: io::Error,
    },
    /// The server task panicked or was cancelled.
    #[error("http server task failed")]
    ServerTask {
        /// Source join error.
        source: JoinError,
    },
}
