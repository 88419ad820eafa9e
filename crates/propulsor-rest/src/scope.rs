//! Per-request scope opened and closed around every request.

use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::Extensions;
use axum::response::Response;
use propulsor_deploy::RequestListener;
use tracing::debug;
use uuid::Uuid;

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Request-scoped state, available to handlers as an `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    request_id: String,
    started: Instant,
}

impl RequestScope {
    /// Scope for `request_id` starting now.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            started: Instant::now(),
        }
    }

    /// Request id from `x-request-id`, or a generated one.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Time since the scope opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Opens a [`RequestScope`] for each request and closes it on the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestScopeListener;

impl RequestListener for RequestScopeListener {
    fn request_initialized(&self, request: &mut Request) {
        let request_id = request
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        request.extensions_mut().insert(RequestScope::new(request_id));
    }

    fn request_destroyed(&self, extensions: &Extensions, response: &mut Response) {
        if let Some(scope) = extensions.get::<RequestScope>() {
            debug!(
                request_id = scope.request_id(),
                status = response.status().as_u16(),
                elapsed_ms = u64::try_from(scope.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request scope closed"
            );
        }
    }
}
