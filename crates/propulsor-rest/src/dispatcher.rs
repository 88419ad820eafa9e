//! The dispatcher servlet routing into REST resources.
//!
//! Resources are mounted at their paths in name order; providers then wrap the
//! combined router in name order, so the last provider is outermost.

use std::collections::BTreeMap;

use axum::Router;
use propulsor_deploy::{Servlet, ServletContext, ServletError};
use tracing::debug;

use crate::error::RestError;
use crate::provider::{REST_DEPLOYMENT_ATTRIBUTE, RestDeployment};

/// Servlet serving every resource of the [`RestDeployment`] attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestDispatcher;

impl RestDispatcher {
    /// Build the dispatcher router for `deployment`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidResourcePath`] for relative or wildcard paths
    /// and [`RestError::OverlappingResourcePath`] when paths collide or nest.
    pub fn router(deployment: &RestDeployment) -> Result<Router, RestError> {
        let mut mounted: BTreeMap<String, String> = BTreeMap::new();
        let mut resources: Vec<_> = deployment.resources().iter().collect();
        resources.sort_by(|a, b| a.name().cmp(b.name()));

        let mut router = Router::new();
        for class in resources {
            let resource = class.instantiate();
            let path = normalize_resource_path(class.name(), resource.path())?;
            if let Some((existing, first)) = mounted
                .iter()
                .find(|(existing, _)| overlaps(existing, &path))
            {
                debug!(existing = %existing, path = %path, "rest resource path rejected");
                return Err(RestError::OverlappingResourcePath {
                    first: first.clone(),
                    second: class.name().to_string(),
                    path,
                });
            }

            router = if path == "/" {
                router.merge(resource.routes())
            } else {
                router.nest(&path, resource.routes())
            };
            debug!(resource = class.name(), path = %path, "rest resource mounted");
            mounted.insert(path, class.name().to_string());
        }

        let mut providers: Vec<_> = deployment.providers().iter().collect();
        providers.sort_by(|a, b| a.name().cmp(b.name()));
        for class in providers {
            router = class.instantiate().apply(router);
            debug!(provider = class.name(), "rest provider applied");
        }
        Ok(router)
    }
}

impl Servlet for RestDispatcher {
    fn init(&self, context: &ServletContext) -> Result<Router, ServletError> {
        let deployment = context
            .attribute::<RestDeployment>(REST_DEPLOYMENT_ATTRIBUTE)
            .ok_or(RestError::MissingDeployment {
                attribute: REST_DEPLOYMENT_ATTRIBUTE,
            })?;
        let router = Self::router(&deployment)?;
        debug!(
            application = deployment.application_name(),
            resources = deployment.resources().len(),
            providers = deployment.providers().len(),
            "rest dispatcher initialised"
        );
        Ok(router)
    }
}

fn normalize_resource_path(resource: &str, path: &str) -> Result<String, RestError> {
    let trimmed = path.trim();
    if !trimmed.starts_with('/') || trimmed.contains(['*', '{', '}', '?', '#']) {
        return Err(RestError::InvalidResourcePath {
            resource: resource.to_string(),
            path: path.to_string(),
        });
    }
    let normalized = trimmed.trim_end_matches('/');
    Ok(if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized.to_string()
    })
}

fn overlaps(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        outer == "/"
            || inner == outer
            || inner
                .strip_prefix(outer)
                .is_some_and(|rest| rest.starts_with('/'))
    };
    nested(a, b) || nested(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths_are_normalised() -> Result<(), RestError> {
        assert_eq!(normalize_resource_path("r", "/ping/")?, "/ping");
        assert_eq!(normalize_resource_path("r", "/")?, "/");
        assert!(matches!(
            normalize_resource_path("r", "ping"),
            Err(RestError::InvalidResourcePath { .. })
        ));
        assert!(matches!(
            normalize_resource_path("r", "/users/{id}"),
            Err(RestError::InvalidResourcePath { .. })
        ));
        Ok(())
    }

    #[test]
    fn overlap_detects_equal_and_nested_paths() {
        assert!(overlaps("/a", "/a"));
        assert!(overlaps("/a", "/a/b"));
        assert!(overlaps("/a/b", "/a"));
        assert!(overlaps("/", "/a"));
        assert!(!overlaps("/a", "/ab"));
        assert!(!overlaps("/a", "/b"));
    }
}
