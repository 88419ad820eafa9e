//! Process-wide system properties.
//!
//! Properties are installed exactly once during boot and are read-only for the
//! rest of the process. A second installation is rejected rather than merged.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::error::{BootError, BootResult};

static SYSTEM_PROPERTIES: OnceCell<SystemProperties> = OnceCell::new();

/// Key/value settings published for downstream consumers at boot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemProperties {
    entries: BTreeMap<String, String>,
}

impl SystemProperties {
    /// Insert or replace a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no properties are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Publish these properties process-wide.
    ///
    /// # Errors
    ///
    /// Returns [`BootError::PropertiesAlreadyInstalled`] if properties were
    /// installed earlier in the process.
    pub fn install(self) -> BootResult<&'static Self> {
        let count = self.len();
        SYSTEM_PROPERTIES
            .set(self)
            .map_err(|_| BootError::PropertiesAlreadyInstalled)?;
        info!(count, "system properties installed");
        SYSTEM_PROPERTIES
            .get()
            .ok_or(BootError::PropertiesAlreadyInstalled)
    }
}

/// The installed system properties, if boot has published them.
#[must_use]
pub fn installed_system_properties() -> Option<&'static SystemProperties> {
    SYSTEM_PROPERTIES.get()
}

/// Look up an installed system property.
#[must_use]
pub fn system_property(key: &str) -> Option<&'static str> {
    installed_system_properties().and_then(|properties| properties.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_track_entries() {
        let mut properties = SystemProperties::default();
        assert!(properties.is_empty());
        assert_eq!(properties.set("a", "1"), None);
        assert_eq!(properties.set("a", "2").as_deref(), Some("1"));
        assert_eq!(properties.get("a"), Some("2"));
        assert_eq!(properties.iter().collect::<Vec<_>>(), vec![("a", "2")]);
    }

    #[test]
    fn install_is_one_shot() -> Result<(), BootError> {
        let mut first = SystemProperties::default();
        first.set("system.test.key", "first");
        let installed = first.install()?;
        assert_eq!(installed.get("system.test.key"), Some("first"));
        assert_eq!(system_property("system.test.key"), Some("first"));

        let mut second = SystemProperties::default();
        second.set("system.test.key", "second");
        assert!(matches!(
            second.install(),
            Err(BootError::PropertiesAlreadyInstalled)
        ));
        assert_eq!(system_property("system.test.key"), Some("first"));
        Ok(())
    }
}
