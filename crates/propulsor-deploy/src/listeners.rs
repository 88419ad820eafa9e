//! Middleware invoking request listeners around every request.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};

use crate::descriptor::RequestListener;

/// Wraps services so every listener sees each request and its response.
///
/// `request_initialized` runs in listener order before the inner service;
/// `request_destroyed` runs in reverse order on the response. Listeners see
/// the request extensions together with any the handler attached to the
/// response.
#[derive(Clone)]
pub struct RequestListenerLayer {
    listeners: Arc<[Arc<dyn RequestListener>]>,
}

impl RequestListenerLayer {
    /// Layer invoking `listeners` in the given order.
    #[must_use]
    pub const fn new(listeners: Arc<[Arc<dyn RequestListener>]>) -> Self {
        Self { listeners }
    }
}

impl<S> Layer<S> for RequestListenerLayer {
    type Service = RequestListenerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestListenerService {
            inner,
            listeners: Arc::clone(&self.listeners),
        }
    }
}

/// Service produced by [`RequestListenerLayer`].
#[derive(Clone)]
pub struct RequestListenerService<S> {
    inner: S,
    listeners: Arc<[Arc<dyn RequestListener>]>,
}

impl<S> Service<Request> for RequestListenerService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        for listener in self.listeners.iter() {
            listener.request_initialized(&mut request);
        }
        let extensions = request.extensions().clone();
        let listeners = Arc::clone(&self.listeners);
        let fut = self.inner.call(request);

        Box::pin(async move {
            let mut response = fut.await?;
            let mut extensions = extensions;
            extensions.extend(response.extensions().clone());
            for listener in listeners.iter().rev() {
                listener.request_destroyed(&extensions, &mut response);
            }
            Ok(response)
        })
    }
}
