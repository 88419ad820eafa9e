//! Folding provider contributions into one descriptor.
//!
//! The defaults provider is applied first, then every provider in slice order.
//! Provider names identify origins and must be unique within one merge.
//! Entry names are unique per kind: a name already contributed by a different
//! provider is rejected with [`DeployError::Conflict`], while a provider
//! re-contributing its own entry leaves the descriptor unchanged. With no
//! conflicts the result does not depend on provider order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::{Contributed, DeploymentDescriptor, DeploymentInfo, EntryKind};
use crate::error::{DeployError, DeployResult};
use crate::provider::{DeploymentDefaultsProvider, DeploymentProvider};

/// Apply `defaults` and then every provider to `descriptor`.
///
/// A rejected fragment leaves the descriptor as it was before that fragment.
///
/// # Errors
///
/// Returns [`DeployError::DuplicateProvider`] before anything is applied when
/// two providers (the defaults provider included) share a name, and
/// [`DeployError::Conflict`] when two providers contribute an entry of the same
/// kind and name, or when one fragment names an entry twice.
pub fn merge_from_providers(
    descriptor: &mut DeploymentDescriptor,
    defaults: Option<&dyn DeploymentDefaultsProvider>,
    providers: &[Arc<dyn DeploymentProvider>],
) -> DeployResult<()> {
    let mut names = BTreeSet::new();
    let provider_names = defaults
        .map(|defaults| defaults.name())
        .into_iter()
        .chain(providers.iter().map(|provider| provider.name()));
    for name in provider_names {
        if !names.insert(name) {
            return Err(DeployError::DuplicateProvider {
                provider: name.to_string(),
            });
        }
    }

    if let Some(defaults) = defaults {
        let mut info = DeploymentInfo::new();
        defaults.set_defaults(
            &mut info,
            descriptor.context_path(),
            descriptor.deployment_name(),
        );
        apply(descriptor, defaults.name(), info)?;
    }

    for provider in providers {
        let info = provider.deployment_info(descriptor.context_path(), descriptor.deployment_name());
        apply(descriptor, provider.name(), info)?;
    }

    debug!(
        deployment = descriptor.deployment_name(),
        providers = providers.len(),
        "deployment providers merged"
    );
    Ok(())
}

fn apply(
    descriptor: &mut DeploymentDescriptor,
    origin: &str,
    info: DeploymentInfo,
) -> DeployResult<()> {
    let DeploymentInfo {
        servlets,
        listeners,
        attributes,
    } = info;

    check(
        &descriptor.servlets,
        EntryKind::Servlet,
        origin,
        servlets.iter().map(|servlet| servlet.name()),
    )?;
    check(
        &descriptor.listeners,
        EntryKind::Listener,
        origin,
        listeners.iter().map(|listener| listener.name()),
    )?;
    check(
        &descriptor.attributes,
        EntryKind::Attribute,
        origin,
        attributes.iter().map(|(name, _)| name.as_str()),
    )?;

    for servlet in servlets {
        let name = servlet.name().to_string();
        insert(&mut descriptor.servlets, name, origin, servlet);
    }
    for listener in listeners {
        let name = listener.name().to_string();
        insert(&mut descriptor.listeners, name, origin, listener);
    }
    for (name, value) in attributes {
        insert(&mut descriptor.attributes, name, origin, value);
    }
    Ok(())
}

fn check<'a, T>(
    existing: &BTreeMap<String, Contributed<T>>,
    kind: EntryKind,
    origin: &str,
    names: impl Iterator<Item = &'a str>,
) -> DeployResult<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        let conflict = |existing: &str| DeployError::Conflict {
            kind,
            name: name.to_string(),
            existing: existing.to_string(),
            provider: origin.to_string(),
        };
        if !seen.insert(name) {
            return Err(conflict(origin));
        }
        if let Some(contributed) = existing.get(name)
            && contributed.origin != origin
        {
            return Err(conflict(&contributed.origin));
        }
    }
    Ok(())
}

fn insert<T>(entries: &mut BTreeMap<String, Contributed<T>>, name: String, origin: &str, entry: T) {
    entries.entry(name).or_insert_with(|| Contributed {
        origin: origin.to_string(),
        entry,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ListenerInfo, RequestListener, ServletInfo};
    use axum::Router;

    struct Scope;

    impl RequestListener for Scope {}

    struct Fragment {
        name: &'static str,
        servlet: &'static str,
        listener: Option<&'static str>,
        attribute: Option<&'static str>,
    }

    impl DeploymentProvider for Fragment {
        fn name(&self) -> &str {
            self.name
        }

        fn deployment_info(&self, _context_path: &str, _deployment_name: &str) -> DeploymentInfo {
            let mut info = DeploymentInfo::new().with_servlet(
                ServletInfo::new(self.servlet, Arc::new(Router::new()))
                    .with_mapping(format!("/{}/*", self.servlet)),
            );
            if let Some(listener) = self.listener {
                info.add_listener(ListenerInfo::new(listener, Arc::new(Scope)));
            }
            if let Some(attribute) = self.attribute {
                info.add_attribute(attribute, self.name.to_string());
            }
            info
        }
    }

    struct Defaults;

    impl DeploymentDefaultsProvider for Defaults {
        fn set_defaults(&self, info: &mut DeploymentInfo, _context_path: &str, _name: &str) {
            info.add_servlet(ServletInfo::new("default", Arc::new(Router::new())).with_mapping("/"));
        }
    }

    fn fragment(
        name: &'static str,
        servlet: &'static str,
        listener: Option<&'static str>,
        attribute: Option<&'static str>,
    ) -> Arc<dyn DeploymentProvider> {
        Arc::new(Fragment {
            name,
            servlet,
            listener,
            attribute,
        })
    }

    #[test]
    fn merge_is_order_independent() -> DeployResult<()> {
        let a = fragment("a", "alpha", Some("scope-a"), Some("meta-a"));
        let b = fragment("b", "beta", Some("scope-b"), None);
        let c = fragment("c", "gamma", None, Some("meta-c"));

        let mut forward = DeploymentDescriptor::new("/", "ROOT");
        merge_from_providers(&mut forward, Some(&Defaults), &[a.clone(), b.clone(), c.clone()])?;
        let mut reverse = DeploymentDescriptor::new("/", "ROOT");
        merge_from_providers(&mut reverse, Some(&Defaults), &[c, b, a])?;

        assert_eq!(forward.entry_names(), reverse.entry_names());
        assert_eq!(
            forward.entry_names()[&EntryKind::Servlet],
            vec!["alpha", "beta", "default", "gamma"]
        );
        assert_eq!(forward.origin(EntryKind::Servlet, "default"), Some("defaults"));
        assert_eq!(forward.origin(EntryKind::Attribute, "meta-c"), Some("c"));
        Ok(())
    }

    #[test]
    fn duplicate_names_across_providers_conflict() {
        let first = fragment("first", "shared", None, None);
        let second = fragment("second", "shared", None, None);
        let mut descriptor = DeploymentDescriptor::new("/", "ROOT");

        let err = merge_from_providers(&mut descriptor, None, &[first, second])
            .expect_err("duplicate servlet should conflict");
        match err {
            DeployError::Conflict {
                kind,
                name,
                existing,
                provider,
            } => {
                assert_eq!(kind, EntryKind::Servlet);
                assert_eq!(name, "shared");
                assert_eq!(existing, "first");
                assert_eq!(provider, "second");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(descriptor.origin(EntryKind::Servlet, "shared"), Some("first"));
    }

    #[test]
    fn conflict_with_defaults_is_rejected() {
        let provider = fragment("rest", "default", None, None);
        let mut descriptor = DeploymentDescriptor::new("/", "ROOT");
        let err = merge_from_providers(&mut descriptor, Some(&Defaults), &[provider])
            .expect_err("default servlet name should conflict");
        assert!(matches!(err, DeployError::Conflict { ref existing, .. } if existing == "defaults"));
    }

    fn owned_names(descriptor: &DeploymentDescriptor) -> BTreeMap<EntryKind, Vec<String>> {
        descriptor
            .entry_names()
            .into_iter()
            .map(|(kind, names)| (kind, names.into_iter().map(str::to_string).collect()))
            .collect()
    }

    #[test]
    fn reapplying_a_provider_is_a_no_op() -> DeployResult<()> {
        let provider = fragment("rest", "api", Some("scope"), Some("meta"));
        let mut descriptor = DeploymentDescriptor::new("/", "ROOT");
        merge_from_providers(&mut descriptor, None, &[provider.clone()])?;
        let before = owned_names(&descriptor);

        merge_from_providers(&mut descriptor, None, &[provider])?;
        assert_eq!(before, owned_names(&descriptor));
        Ok(())
    }

    #[test]
    fn duplicate_provider_names_are_rejected_before_merging() {
        let first = fragment("api", "v1", None, None);
        let second = fragment("api", "v2", None, None);
        let mut descriptor = DeploymentDescriptor::new("/", "ROOT");

        let err = merge_from_providers(&mut descriptor, Some(&Defaults), &[first, second])
            .expect_err("shared provider name should be rejected");
        assert!(matches!(err, DeployError::DuplicateProvider { ref provider } if provider == "api"));
        assert!(descriptor.servlets().next().is_none());

        let shadowing = fragment("defaults", "other", None, None);
        assert!(matches!(
            merge_from_providers(&mut descriptor, Some(&Defaults), &[shadowing]),
            Err(DeployError::DuplicateProvider { .. })
        ));
    }

    #[test]
    fn rejected_fragment_leaves_descriptor_untouched() {
        let first = fragment("first", "alpha", Some("scope"), None);
        let second = fragment("second", "beta", Some("scope"), Some("meta"));
        let mut descriptor = DeploymentDescriptor::new("/", "ROOT");

        assert!(merge_from_providers(&mut descriptor, None, &[first, second]).is_err());
        assert!(descriptor.servlet("beta").is_none());
        assert_eq!(descriptor.origin(EntryKind::Attribute, "meta"), None);
    }
}
