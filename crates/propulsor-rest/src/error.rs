//! Errors raised while building the REST dispatcher.

use thiserror::Error;

/// Primary error type for REST deployments.
#[derive(Debug, Error)]
pub enum RestError {
    /// The deployment metadata attribute is missing from the context.
    #[error("rest deployment metadata missing")]
    MissingDeployment {
        /// Attribute name that was looked up.
        attribute: &'static str,
    },
    /// A resource path is not absolute or contains wildcards.
    #[error("invalid rest resource path")]
    InvalidResourcePath {
        /// Resource name.
        resource: String,
        /// Offending path.
        path: String,
    },
    /// Two resources share a path, or one path is nested inside another.
    #[error("rest resource paths overlap")]
    OverlappingResourcePath {
        /// Resource registered first.
        first: String,
        /// Resource whose path was rejected.
        second: String,
        /// Rejected path.
        path: String,
    },
}
