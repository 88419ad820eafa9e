//! Built-in REST resources, provider filter and deployment defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::SERVER;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use propulsor_boot::{ListenerOptions, installed_system_properties};
use propulsor_deploy::{DeploymentDefaultsProvider, DeploymentInfo, ServletInfo};
use propulsor_rest::{RestAppConfig, RestProvider, RestResource};
use propulsor_telemetry::build_sha;
use serde::Serialize;

const SERVER_HEADER: &str = concat!("propulsor/", env!("CARGO_PKG_VERSION"));

/// `GET {mapping}/ping` answers `pong`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingResource;

impl RestResource for PingResource {
    fn name(&self) -> &str {
        "ping"
    }

    fn path(&self) -> &str {
        "/ping"
    }

    fn routes(&self) -> Router {
        Router::new().route("/", get(|| async { "pong" }))
    }
}

/// `GET {mapping}/system/properties` returns the installed system properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPropertiesResource;

impl RestResource for SystemPropertiesResource {
    fn name(&self) -> &str {
        "system-properties"
    }

    fn path(&self) -> &str {
        "/system/properties"
    }

    fn routes(&self) -> Router {
        Router::new().route("/", get(system_properties))
    }
}

async fn system_properties() -> Json<BTreeMap<String, String>> {
    let properties = installed_system_properties()
        .map(|properties| {
            properties
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
        .unwrap_or_default();
    Json(properties)
}

/// Effective HTTP listener and REST settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Listener the deployment is served on.
    pub listener: ListenerOptions,
    /// REST application behind the dispatcher.
    pub rest: RestAppConfig,
}

/// `GET {mapping}/system/settings` returns the loaded [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsResource {
    settings: Settings,
}

impl SettingsResource {
    /// Resource reporting `settings`.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl RestResource for SettingsResource {
    fn name(&self) -> &str {
        "system-settings"
    }

    fn path(&self) -> &str {
        "/system/settings"
    }

    fn routes(&self) -> Router {
        let settings = self.settings.clone();
        Router::new().route("/", get(move || async move { Json(settings) }))
    }
}

/// Adds a `server` header to every REST response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerHeaderProvider;

impl RestProvider for ServerHeaderProvider {
    fn name(&self) -> &str {
        "server-header"
    }

    fn apply(&self, router: Router) -> Router {
        router.layer(middleware::from_fn(server_header))
    }
}

async fn server_header(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(SERVER, HeaderValue::from_static(SERVER_HEADER));
    response
}

/// Body of the `/health` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    /// Always `ok` while the listener serves requests.
    pub status: &'static str,
    /// Build identifier.
    pub build: &'static str,
}

/// Seeds every deployment with an exact-mapped `/health` servlet.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthDefaults;

impl DeploymentDefaultsProvider for HealthDefaults {
    fn set_defaults(&self, info: &mut DeploymentInfo, _context_path: &str, _deployment_name: &str) {
        let router = Router::new().route(
            "/",
            get(|| async {
                Json(Health {
                    status: "ok",
                    build: build_sha(),
                })
            }),
        );
        info.add_servlet(ServletInfo::new("health", Arc::new(router)).with_mapping("/health"));
    }
}

/// Resources registered by the application.
#[must_use]
pub fn builtin_resources(settings: Settings) -> Vec<Arc<dyn RestResource>> {
    vec![
        Arc::new(PingResource),
        Arc::new(SystemPropertiesResource),
        Arc::new(SettingsResource::new(settings)),
    ]
}

/// Providers registered by the application.
#[must_use]
pub fn builtin_providers() -> Vec<Arc<dyn RestProvider>> {
    vec![Arc::new(ServerHeaderProvider)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use std::error::Error;
    use tower::ServiceExt;

    async fn get_text(router: Router, uri: &str) -> Result<(Response, String), Box<dyn Error>> {
        let response = router
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await?;
        Ok((
            Response::from_parts(parts, Body::empty()),
            String::from_utf8(bytes.to_vec())?,
        ))
    }

    #[tokio::test]
    async fn ping_answers_pong_with_server_header() -> Result<(), Box<dyn Error>> {
        let router = ServerHeaderProvider.apply(Router::new().nest("/ping", PingResource.routes()));
        let (response, body) = get_text(router, "/ping").await?;
        assert_eq!(body, "pong");
        assert_eq!(
            response.headers().get(SERVER).map(HeaderValue::as_bytes),
            Some(SERVER_HEADER.as_bytes())
        );
        Ok(())
    }

    #[tokio::test]
    async fn system_properties_default_to_empty_object() -> Result<(), Box<dyn Error>> {
        let (_, body) = get_text(SystemPropertiesResource.routes(), "/").await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        assert!(value.is_object());
        Ok(())
    }

    #[test]
    fn health_defaults_contribute_exact_servlet() {
        let mut info = DeploymentInfo::new();
        HealthDefaults.set_defaults(&mut info, "/", "ROOT");
        assert_eq!(info.servlets()[0].name(), "health");
        assert_eq!(info.servlets()[0].mappings(), ["/health"]);
        assert_eq!(HealthDefaults.name(), "defaults");
    }

    #[test]
    fn builtin_registrations_have_distinct_names() {
        let names: Vec<String> = builtin_resources(settings())
            .iter()
            .map(|resource| resource.name().to_string())
            .chain(builtin_providers().iter().map(|p| p.name().to_string()))
            .collect();
        assert_eq!(
            names,
            vec!["ping", "system-properties", "system-settings", "server-header"]
        );
    }

    fn settings() -> Settings {
        Settings {
            listener: ListenerOptions::default(),
            rest: RestAppConfig::default(),
        }
    }

    #[tokio::test]
    async fn settings_resource_reports_listener_and_rest() -> Result<(), Box<dyn Error>> {
        let (_, body) = get_text(SettingsResource::new(settings()).routes(), "/").await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        assert_eq!(value["listener"]["port"], 8080);
        assert_eq!(value["listener"]["context_path"], "/");
        assert_eq!(value["rest"]["application_name"], "propulsor");
        assert_eq!(value["rest"]["mappings"][0], "/api/*");
        Ok(())
    }
}
