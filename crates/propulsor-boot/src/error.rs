//! Error types for boot option handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::interpolate::InterpolationError;

/// Result alias for boot operations.
pub type BootResult<T> = Result<T, BootError>;

/// Primary error type for boot option handling.
#[derive(Debug, Error)]
pub enum BootError {
    /// Command-line arguments were malformed.
    #[error("failed to parse command-line arguments")]
    ArgumentParse {
        /// Parser error describing the offending flag.
        source: clap::Error,
    },
    /// The boot-defaults file exists but could not be read.
    #[error("failed to read boot defaults")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// A configuration value could not be interpolated.
    #[error("failed to interpolate configuration value")]
    Interpolation {
        /// Raw value that was being expanded.
        value: String,
        /// Source interpolation error.
        source: InterpolationError,
    },
    /// A required boot property could not be resolved.
    ///
    /// This indicates a programming or packaging error; callers halt the boot.
    #[error("required boot property is not specified")]
    InvariantViolation {
        /// Property key that was missing.
        property: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// System properties were installed more than once.
    #[error("system properties are already installed")]
    PropertiesAlreadyInstalled,
    /// A boot option held a value of the wrong shape.
    #[error("invalid boot option")]
    InvalidOption {
        /// Property key of the offending option.
        property: String,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn boot_error_messages_are_constant() {
        let io = BootError::Io {
            path: PathBuf::from("boot.properties"),
            source: io::Error::other("denied"),
        };
        assert_eq!(io.to_string(), "failed to read boot defaults");
        assert!(io.source().is_some());

        let invariant = BootError::InvariantViolation {
            property: "app.home".to_string(),
            reason: "home_dir_unresolved",
        };
        assert_eq!(invariant.to_string(), "required boot property is not specified");
        assert!(invariant.source().is_none());

        let interpolation = BootError::Interpolation {
            value: "${missing}".to_string(),
            source: InterpolationError::Undefined {
                expression: "missing".to_string(),
            },
        };
        assert!(interpolation.source().is_some());
    }
}
