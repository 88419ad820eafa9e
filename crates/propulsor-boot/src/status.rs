//! Outcome of a deploy attempt.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boot options could not be loaded.
pub const ERR_LOAD_BOOT_OPTIONS: i32 = 1;
/// Command-line arguments could not be parsed.
pub const ERR_PARSE_ARGS: i32 = 2;
/// Process-wide initialisation failed.
pub const ERR_INIT: i32 = 3;
/// The HTTP listener could not be started.
pub const ERR_CANT_LISTEN: i32 = 4;

/// Shared error attached to a failed status.
pub type StatusCause = Arc<dyn Error + Send + Sync + 'static>;

/// Success or failure of a deploy attempt; immutable once created.
#[derive(Clone)]
pub enum BootStatus {
    /// The server is listening.
    Success,
    /// Starting failed with an error code and the causing error.
    Failed {
        /// One of the `ERR_*` codes.
        code: i32,
        /// Underlying error.
        cause: StatusCause,
    },
}

impl BootStatus {
    /// Build a failed status from any error.
    #[must_use]
    pub fn failed(code: i32, cause: impl Error + Send + Sync + 'static) -> Self {
        Self::Failed {
            code,
            cause: Arc::new(cause),
        }
    }

    /// Whether the deploy attempt succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Error code of a failed attempt.
    #[must_use]
    pub const fn error_code(&self) -> Option<i32> {
        match self {
            Self::Success => None,
            Self::Failed { code, .. } => Some(*code),
        }
    }

    /// Causing error of a failed attempt.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Success => None,
            Self::Failed { cause, .. } => Some(cause.as_ref()),
        }
    }

    /// Process exit code for this status (`0` on success).
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error_code()
            .map_or(0, |code| u8::try_from(code).unwrap_or(u8::MAX))
    }
}

impl fmt::Debug for BootStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => formatter.write_str("Success"),
            Self::Failed { code, cause } => formatter
                .debug_struct("Failed")
                .field("code", code)
                .field("cause", &cause.to_string())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn success_has_no_code_or_cause() {
        let status = BootStatus::Success;
        assert!(status.is_success());
        assert_eq!(status.error_code(), None);
        assert!(status.cause().is_none());
        assert_eq!(status.exit_code(), 0);
    }

    #[test]
    fn failure_carries_code_and_cause() {
        let status = BootStatus::failed(ERR_CANT_LISTEN, io::Error::other("busy"));
        assert!(!status.is_success());
        assert_eq!(status.error_code(), Some(ERR_CANT_LISTEN));
        assert_eq!(status.cause().map(ToString::to_string).as_deref(), Some("busy"));
        assert_eq!(status.exit_code(), 4);
        assert!(format!("{status:?}").contains("busy"));
    }
}
