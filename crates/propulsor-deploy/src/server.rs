//! A bound HTTP listener serving one router.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

/// Running server: bound address, shutdown trigger and serve task.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Bind `bind:port` and start serving `router` on a spawned task.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Bind`] when the address cannot be bound.
    pub async fn bind(bind: &str, port: u16, router: Router) -> DeployResult<Self> {
        let bind_error = |source| DeployError::Bind {
            address: format!("{bind}:{port}"),
            source,
        };
        let listener = TcpListener::bind((bind, port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    // A dropped sender also stops the server.
                    let _ = signal.await;
                })
                .await
        });
        debug!(%local_addr, "http listener bound");

        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Trigger graceful shutdown and wait until the listener is released.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Serve`] when the server ended with an IO error and
    /// [`DeployError::ServerTask`] when its task panicked.
    pub async fn stop(mut self) -> DeployResult<()> {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            debug!(local_addr = %self.local_addr, "server already stopped");
        }
        let outcome = self
            .task
            .await
            .map_err(|source| DeployError::ServerTask { source })?;
        outcome.map_err(|source| DeployError::Serve { source })?;
        info!(local_addr = %self.local_addr, "http listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::error::Error;

    #[tokio::test]
    async fn bind_serves_and_stop_releases_port() -> Result<(), Box<dyn Error>> {
        let router = Router::new().route("/", get(|| async { "up" }));
        let handle = ServerHandle::bind("127.0.0.1", 0, router.clone()).await?;
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);

        let busy = ServerHandle::bind("127.0.0.1", addr.port(), router.clone()).await;
        assert!(matches!(busy, Err(DeployError::Bind { .. })));

        handle.stop().await?;
        let again = ServerHandle::bind("127.0.0.1", addr.port(), router).await?;
        again.stop().await?;
        Ok(())
    }
}
