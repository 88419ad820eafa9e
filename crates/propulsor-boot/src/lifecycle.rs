//! Shutdown hooks run while the application is stopping.

use std::error::Error;

/// Error reported by a shutdown action.
pub type ShutdownError = Box<dyn Error + Send + Sync + 'static>;

/// Stops some service or subsystem when the application shuts down.
pub trait ShutdownAction: Send + Sync {
    /// Name used in shutdown logs.
    fn name(&self) -> &str;

    /// Stop the service.
    ///
    /// # Errors
    ///
    /// Returns an error when the service could not be stopped cleanly; the
    /// remaining actions still run.
    fn shutdown(&self) -> Result<(), ShutdownError>;
}
