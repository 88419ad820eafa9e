//! # Design
//!
//! - Centralize errors raised by the boot sequence outside of `BootStatus`.
//! - Keep error messages constant while carrying context fields for debugging.

use std::io;

use propulsor_boot::ShutdownError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Telemetry could not be initialised.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: propulsor_telemetry::TelemetryError,
    },
    /// Waiting for a shutdown signal failed.
    #[error("failed to listen for shutdown signals")]
    Signal {
        /// Source IO error.
        source: io::Error,
    },
    /// A shutdown action reported an error.
    #[error("shutdown action failed")]
    Shutdown {
        /// Name of the failing action.
        action: String,
        /// Source error returned by the action.
        source: ShutdownError,
    },
}

impl AppError {
    pub(crate) const fn telemetry(
        operation: &'static str,
        source: propulsor_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn app_error_messages_are_constant() {
        let shutdown = AppError::Shutdown {
            action: "flush".to_string(),
            source: "disk full".into(),
        };
        assert_eq!(shutdown.to_string(), "shutdown action failed");
        assert!(shutdown.source().is_some());

        let signal = AppError::Signal {
            source: io::Error::other("no signals"),
        };
        assert_eq!(signal.to_string(), "failed to listen for shutdown signals");
    }
}
