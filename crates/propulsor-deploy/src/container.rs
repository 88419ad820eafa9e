//! Turning a merged descriptor into a request handler.
//!
//! # Design
//! - [`ServletContainer`] registers descriptors and hands out a
//!   [`DeploymentManager`] per deployment.
//! - `deploy()` validates the context path and URL mappings and initialises
//!   servlets: eager ones in `load_on_startup` order, then the rest by name.
//! - `start()` yields one axum [`Router`] whose fallback dispatches through
//!   the mapping table; listeners, request ids and tracing wrap it.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use propulsor_telemetry::{http_trace_layer, propagate_request_id_layer, set_request_id_layer};
use tower::{ServiceBuilder, ServiceExt};
use tracing::{debug, info, warn};

use crate::descriptor::{Attribute, DeploymentDescriptor, RequestListener, ServletInfo};
use crate::error::{DeployError, DeployResult};
use crate::listeners::RequestListenerLayer;
use crate::mapping::MappingTable;

/// Deployment-wide state visible to servlets during initialisation.
#[derive(Clone)]
pub struct ServletContext {
    context_path: String,
    deployment_name: String,
    attributes: BTreeMap<String, Attribute>,
}

impl ServletContext {
    fn from_descriptor(descriptor: &DeploymentDescriptor, context_path: String) -> Self {
        Self {
            context_path,
            deployment_name: descriptor.deployment_name().to_string(),
            attributes: descriptor
                .attributes()
                .map(|(name, value)| (name.to_string(), Arc::clone(value)))
                .collect(),
        }
    }

    /// Normalised context path.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Deployment name.
    #[must_use]
    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    /// Typed context attribute; `None` when absent or of another type.
    #[must_use]
    pub fn attribute<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.attributes
            .get(name)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Names of all context attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ServletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServletContext")
            .field("context_path", &self.context_path)
            .field("deployment_name", &self.deployment_name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Request and response extension describing how a request was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServletPath {
    /// Servlet that served the request.
    pub servlet: String,
    /// Request path as received, before the context path was removed.
    pub request_path: String,
}

/// Registry of deployments known to this process.
#[derive(Debug, Default)]
pub struct ServletContainer {
    deployments: BTreeMap<String, Arc<DeploymentDescriptor>>,
}

impl ServletContainer {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor`, replacing any deployment of the same name.
    pub fn add_deployment(&mut self, descriptor: DeploymentDescriptor) -> DeploymentManager {
        let descriptor = Arc::new(descriptor);
        self.deployments.insert(
            descriptor.deployment_name().to_string(),
            Arc::clone(&descriptor),
        );
        DeploymentManager {
            descriptor,
            deployed: None,
        }
    }

    /// Registered descriptor named `deployment_name`.
    #[must_use]
    pub fn deployment(&self, deployment_name: &str) -> Option<&DeploymentDescriptor> {
        self.deployments.get(deployment_name).map(AsRef::as_ref)
    }
}

struct Dispatch {
    context_path: String,
    mappings: MappingTable,
    routers: BTreeMap<String, Router>,
}

impl Dispatch {
    fn within_context<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.context_path == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.context_path.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Lifecycle of one registered deployment.
pub struct DeploymentManager {
    descriptor: Arc<DeploymentDescriptor>,
    deployed: Option<Arc<Dispatch>>,
}

impl DeploymentManager {
    /// The managed descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &DeploymentDescriptor {
        &self.descriptor
    }

    /// Whether [`DeploymentManager::deploy`] has succeeded.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        self.deployed.is_some()
    }

    /// Validate mappings and initialise every servlet.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidContextPath`], [`DeployError::InvalidMapping`],
    /// [`DeployError::DuplicateMapping`] or [`DeployError::ServletInit`].
    pub fn deploy(&mut self) -> DeployResult<()> {
        let descriptor = &self.descriptor;
        let context_path = normalize_context_path(descriptor.context_path())?;
        let context = ServletContext::from_descriptor(descriptor, context_path.clone());

        let mut mappings = MappingTable::default();
        for servlet in descriptor.servlets() {
            for pattern in servlet.mappings() {
                mappings.insert(servlet.name(), pattern)?;
            }
        }

        let mut ordered: Vec<&ServletInfo> = descriptor.servlets().collect();
        ordered.sort_by_key(|servlet| servlet.load_on_startup().map_or((1, 0), |order| (0, order)));

        let mut routers = BTreeMap::new();
        for servlet in ordered {
            let router = servlet
                .servlet()
                .init(&context)
                .map_err(|source| DeployError::ServletInit {
                    servlet: servlet.name().to_string(),
                    source,
                })?;
            debug!(
                servlet = servlet.name(),
                mappings = ?servlet.mappings(),
                async_supported = servlet.is_async_supported(),
                "servlet initialised"
            );
            routers.insert(servlet.name().to_string(), router);
        }

        info!(
            deployment = descriptor.deployment_name(),
            context_path = %context_path,
            servlets = routers.len(),
            mappings = mappings.len(),
            "deployment deployed"
        );
        self.deployed = Some(Arc::new(Dispatch {
            context_path,
            mappings,
            routers,
        }));
        Ok(())
    }

    /// Request handler for the deployed servlets.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NotDeployed`] before a successful
    /// [`DeploymentManager::deploy`].
    pub fn start(&self) -> DeployResult<Router> {
        let dispatch = self
            .deployed
            .clone()
            .ok_or_else(|| DeployError::NotDeployed {
                deployment: self.descriptor.deployment_name().to_string(),
            })?;
        let listeners: Arc<[Arc<dyn RequestListener>]> = self
            .descriptor
            .listeners()
            .map(|listener| Arc::clone(listener.listener()))
            .collect();

        Ok(Router::new()
            .fallback(dispatch_request)
            .with_state(dispatch)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(http_trace_layer())
                    .layer(propagate_request_id_layer())
                    .layer(RequestListenerLayer::new(listeners)),
            ))
    }
}

impl std::fmt::Debug for DeploymentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentManager")
            .field("descriptor", &self.descriptor)
            .field("deployed", &self.is_deployed())
            .finish()
    }
}

fn normalize_context_path(context_path: &str) -> DeployResult<String> {
    let trimmed = context_path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Ok("/".to_string());
    }
    if !trimmed.starts_with('/') || trimmed.contains(['*', '?', '#']) {
        return Err(DeployError::InvalidContextPath {
            context_path: context_path.to_string(),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn dispatch_request(State(dispatch): State<Arc<Dispatch>>, mut request: Request) -> Response {
    let request_path = request.uri().path().to_string();
    let Some((servlet, forwarded)) = dispatch
        .within_context(&request_path)
        .and_then(|path| dispatch.mappings.resolve(path))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(router) = dispatch.routers.get(servlet).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match with_path(request.uri(), &forwarded) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(err) => {
            warn!(error = %err, path = %request_path, "failed to rewrite request path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    }
    let servlet_path = ServletPath {
        servlet: servlet.to_string(),
        request_path,
    };
    request.extensions_mut().insert(servlet_path.clone());

    let mut response = match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    response.extensions_mut().insert(servlet_path);
    response
}

fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DeploymentInfo, ListenerInfo, Servlet, ServletError};
    use crate::merge::merge_from_providers;
    use crate::provider::DeploymentProvider;
    use axum::body::{Body, to_bytes};
    use axum::routing::get;
    use std::error::Error;
    use std::sync::Mutex;

    struct Greeting;

    impl Servlet for Greeting {
        fn init(&self, context: &ServletContext) -> Result<Router, ServletError> {
            let greeting = context
                .attribute::<String>("greeting")
                .ok_or("greeting attribute missing")?;
            Ok(Router::new()
                .route("/hello", get(move || async move { greeting.to_string() }))
                .route("/", get(|| async { "root" }))
                .route("/echo", get(|uri: Uri| async move { uri.to_string() })))
        }
    }

    struct Tracker {
        order: Arc<Mutex<Vec<String>>>,
        name: &'static str,
    }

    impl Servlet for Tracker {
        fn init(&self, _context: &ServletContext) -> Result<Router, ServletError> {
            if let Ok(mut order) = self.order.lock() {
                order.push(self.name.to_string());
            }
            Ok(Router::new().route("/", get(|| async { "tracked" })))
        }
    }

    struct Provider {
        info: DeploymentInfo,
    }

    impl DeploymentProvider for Provider {
        fn name(&self) -> &str {
            "test"
        }

        fn deployment_info(&self, _context_path: &str, _deployment_name: &str) -> DeploymentInfo {
            self.info.clone()
        }
    }

    struct Stamp;

    impl RequestListener for Stamp {
        fn request_destroyed(&self, extensions: &axum::http::Extensions, response: &mut Response) {
            if let Some(path) = extensions.get::<ServletPath>()
                && let Ok(value) = path.servlet.parse()
            {
                response.headers_mut().insert("x-servlet", value);
            }
        }
    }

    fn descriptor(context_path: &str, info: DeploymentInfo) -> DeployResult<DeploymentDescriptor> {
        let mut descriptor = DeploymentDescriptor::new(context_path, "test");
        let provider: Arc<dyn DeploymentProvider> = Arc::new(Provider { info });
        merge_from_providers(&mut descriptor, None, &[provider])?;
        Ok(descriptor)
    }

    fn greeting_info() -> DeploymentInfo {
        DeploymentInfo::new()
            .with_servlet(
                ServletInfo::new("greeting", Arc::new(Greeting))
                    .with_mapping("/greet/*")
                    .with_load_on_startup(1),
            )
            .with_attribute("greeting", "hi".to_string())
    }

    async fn get_body(router: &Router, uri: &str) -> Result<(StatusCode, String), Box<dyn Error>> {
        let response = router
            .clone()
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, String::from_utf8(body.to_vec())?))
    }

    #[tokio::test]
    async fn requests_dispatch_under_context_path() -> Result<(), Box<dyn Error>> {
        let mut container = ServletContainer::new();
        let mut manager = container.add_deployment(descriptor("/app/", greeting_info())?);
        manager.deploy()?;
        let router = manager.start()?;

        assert_eq!(
            get_body(&router, "/app/greet/hello").await?,
            (StatusCode::OK, "hi".to_string())
        );
        assert_eq!(
            get_body(&router, "/app/greet").await?,
            (StatusCode::OK, "root".to_string())
        );
        assert_eq!(
            get_body(&router, "/app/greet/echo?x=1").await?,
            (StatusCode::OK, "/echo?x=1".to_string())
        );
        assert_eq!(get_body(&router, "/greet/hello").await?.0, StatusCode::NOT_FOUND);
        assert_eq!(get_body(&router, "/app/other").await?.0, StatusCode::NOT_FOUND);
        assert!(container.deployment("test").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn listeners_see_servlet_path() -> Result<(), Box<dyn Error>> {
        let info = greeting_info().with_listener(ListenerInfo::new("stamp", Arc::new(Stamp)));
        let mut manager = ServletContainer::new().add_deployment(descriptor("/", info)?);
        manager.deploy()?;
        let response = manager
            .start()?
            .oneshot(axum::http::Request::builder().uri("/greet/hello").body(Body::empty())?)
            .await?;
        assert_eq!(
            response.headers().get("x-servlet").map(|v| v.as_bytes()),
            Some(b"greeting".as_slice())
        );
        assert_eq!(
            response
                .extensions()
                .get::<ServletPath>()
                .map(|path| path.request_path.as_str()),
            Some("/greet/hello")
        );
        assert!(response.headers().contains_key("x-request-id"));
        Ok(())
    }

    #[test]
    fn missing_attribute_fails_servlet_init() -> Result<(), Box<dyn Error>> {
        let info = DeploymentInfo::new()
            .with_servlet(ServletInfo::new("greeting", Arc::new(Greeting)).with_mapping("/*"));
        let mut manager = ServletContainer::new().add_deployment(descriptor("/", info)?);
        let err = manager.deploy().expect_err("init should fail");
        assert!(matches!(err, DeployError::ServletInit { ref servlet, .. } if servlet == "greeting"));
        assert!(!manager.is_deployed());
        assert!(matches!(manager.start(), Err(DeployError::NotDeployed { .. })));
        Ok(())
    }

    #[test]
    fn eager_servlets_initialise_first_in_order() -> Result<(), Box<dyn Error>> {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracker = |name: &'static str| {
            Arc::new(Tracker {
                order: Arc::clone(&order),
                name,
            })
        };
        let info = DeploymentInfo::new()
            .with_servlet(ServletInfo::new("a-lazy", tracker("a-lazy")).with_mapping("/a/*"))
            .with_servlet(
                ServletInfo::new("b-second", tracker("b-second"))
                    .with_mapping("/b/*")
                    .with_load_on_startup(2),
            )
            .with_servlet(
                ServletInfo::new("c-first", tracker("c-first"))
                    .with_mapping("/c/*")
                    .with_load_on_startup(1),
            );
        let mut manager = ServletContainer::new().add_deployment(descriptor("/", info)?);
        manager.deploy()?;

        let order = order.lock().map_err(|_| "order poisoned")?.clone();
        assert_eq!(order, vec!["c-first", "b-second", "a-lazy"]);
        Ok(())
    }

    #[test]
    fn invalid_context_paths_are_rejected() {
        assert_eq!(normalize_context_path("").ok().as_deref(), Some("/"));
        assert_eq!(normalize_context_path("/api/").ok().as_deref(), Some("/api"));
        assert!(matches!(
            normalize_context_path("api"),
            Err(DeployError::InvalidContextPath { .. })
        ));
        assert!(matches!(
            normalize_context_path("/a*"),
            Err(DeployError::InvalidContextPath { .. })
        ));
    }

    #[test]
    fn overlapping_mappings_fail_deploy() -> Result<(), Box<dyn Error>> {
        let info = DeploymentInfo::new()
            .with_servlet(ServletInfo::new("one", Arc::new(Router::new())).with_mapping("/x/*"))
            .with_servlet(ServletInfo::new("two", Arc::new(Router::new())).with_mapping("/x/*"));
        let mut manager = ServletContainer::new().add_deployment(descriptor("/", info)?);
        assert!(matches!(
            manager.deploy(),
            Err(DeployError::DuplicateMapping { .. })
        ));
        Ok(())
    }
}
