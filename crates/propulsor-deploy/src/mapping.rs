//! Servlet URL patterns and request-path resolution.
//!
//! Patterns follow servlet conventions: `/exact`, `/prefix/*`, `*.ext`, and
//! the default mapping `/` (or `/*`). A path resolves to the exact match,
//! then the longest matching prefix, then the extension, then the default.

use std::fmt;

use crate::error::{DeployError, DeployResult};

/// A parsed servlet URL pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Matches one path.
    Exact(String),
    /// Matches a path segment prefix; stored without the trailing `/*`.
    Prefix(String),
    /// Matches paths whose last segment ends in `.ext`; stored without the dot.
    Extension(String),
    /// Matches everything no other pattern matched.
    Default,
}

impl UrlPattern {
    /// Parse a pattern declared by `servlet`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidMapping`] for empty patterns, relative
    /// paths, and wildcards outside the supported positions.
    pub fn parse(servlet: &str, pattern: &str) -> DeployResult<Self> {
        let invalid = || DeployError::InvalidMapping {
            servlet: servlet.to_string(),
            pattern: pattern.to_string(),
        };

        if pattern == "/" || pattern == "/*" {
            return Ok(Self::Default);
        }
        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.is_empty() || extension.contains(['/', '*', '.']) {
                return Err(invalid());
            }
            return Ok(Self::Extension(extension.to_string()));
        }
        if !pattern.starts_with('/') {
            return Err(invalid());
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid());
            }
            return Ok(Self::Prefix(prefix.to_string()));
        }
        if pattern.contains('*') {
            return Err(invalid());
        }
        Ok(Self::Exact(pattern.to_string()))
    }

    /// Path forwarded to the servlet when `path` matches, `None` otherwise.
    ///
    /// Prefix matches forward the remainder after the prefix; exact matches
    /// forward `/`; extension and default matches forward the full path.
    #[must_use]
    pub fn forward(&self, path: &str) -> Option<String> {
        match self {
            Self::Exact(exact) => (exact == path).then(|| "/".to_string()),
            Self::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                if rest.is_empty() {
                    Some("/".to_string())
                } else if rest.starts_with('/') {
                    Some(rest.to_string())
                } else {
                    None
                }
            }
            Self::Extension(extension) => {
                let last = path.rsplit('/').next().unwrap_or(path);
                last.strip_suffix(extension.as_str())
                    .and_then(|stem| stem.strip_suffix('.'))
                    .map(|_| path.to_string())
            }
            Self::Default => Some(path.to_string()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Exact(_) => 0,
            Self::Prefix(_) => 1,
            Self::Extension(_) => 2,
            Self::Default => 3,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(exact) => f.write_str(exact),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Extension(extension) => write!(f, "*.{extension}"),
            Self::Default => f.write_str("/"),
        }
    }
}

/// Resolves request paths to servlet names.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<(UrlPattern, String)>,
}

impl MappingTable {
    /// Register `pattern` for `servlet`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidMapping`] for malformed patterns and
    /// [`DeployError::DuplicateMapping`] when another servlet already claims
    /// an equivalent pattern.
    pub fn insert(&mut self, servlet: &str, pattern: &str) -> DeployResult<()> {
        let parsed = UrlPattern::parse(servlet, pattern)?;
        if let Some((_, first)) = self.entries.iter().find(|(existing, _)| *existing == parsed) {
            if first == servlet {
                return Ok(());
            }
            return Err(DeployError::DuplicateMapping {
                pattern: parsed.to_string(),
                first: first.clone(),
                second: servlet.to_string(),
            });
        }
        self.entries.push((parsed, servlet.to_string()));
        Ok(())
    }

    /// Servlet serving `path` and the path to forward to it.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<(&str, String)> {
        self.entries
            .iter()
            .filter_map(|(pattern, servlet)| {
                pattern
                    .forward(path)
                    .map(|forwarded| (pattern, servlet.as_str(), forwarded))
            })
            .min_by_key(|(pattern, _, _)| {
                let prefix_len = match pattern {
                    UrlPattern::Prefix(prefix) => prefix.len(),
                    _ => 0,
                };
                (pattern.rank(), usize::MAX - prefix_len)
            })
            .map(|(_, servlet, forwarded)| (servlet, forwarded))
    }

    /// Registered patterns with their servlets.
    pub fn iter(&self) -> impl Iterator<Item = (&UrlPattern, &str)> {
        self.entries
            .iter()
            .map(|(pattern, servlet)| (pattern, servlet.as_str()))
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pattern is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_parse_by_shape() -> DeployResult<()> {
        assert_eq!(UrlPattern::parse("s", "/")?, UrlPattern::Default);
        assert_eq!(UrlPattern::parse("s", "/*")?, UrlPattern::Default);
        assert_eq!(
            UrlPattern::parse("s", "/api/*")?,
            UrlPattern::Prefix("/api".to_string())
        );
        assert_eq!(
            UrlPattern::parse("s", "*.json")?,
            UrlPattern::Extension("json".to_string())
        );
        assert_eq!(
            UrlPattern::parse("s", "/status")?,
            UrlPattern::Exact("/status".to_string())
        );
        Ok(())
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for pattern in ["", "api/*", "/a*/b", "/api/*/x", "*.", "*.a/b", "*"] {
            assert!(
                matches!(
                    UrlPattern::parse("s", pattern),
                    Err(DeployError::InvalidMapping { .. })
                ),
                "pattern {pattern:?} should be rejected"
            );
        }
    }

    #[test]
    fn prefix_forwards_remainder() {
        let pattern = UrlPattern::Prefix("/api".to_string());
        assert_eq!(pattern.forward("/api").as_deref(), Some("/"));
        assert_eq!(pattern.forward("/api/ping").as_deref(), Some("/ping"));
        assert_eq!(pattern.forward("/apiary"), None);
        assert_eq!(pattern.forward("/other"), None);
    }

    #[test]
    fn resolution_prefers_exact_then_longest_prefix() -> DeployResult<()> {
        let mut table = MappingTable::default();
        table.insert("default", "/")?;
        table.insert("api", "/api/*")?;
        table.insert("admin", "/api/admin/*")?;
        table.insert("status", "/api/status")?;
        table.insert("json", "*.json")?;

        assert_eq!(table.resolve("/api/status"), Some(("status", "/".to_string())));
        assert_eq!(
            table.resolve("/api/admin/users"),
            Some(("admin", "/users".to_string()))
        );
        assert_eq!(table.resolve("/api/ping"), Some(("api", "/ping".to_string())));
        assert_eq!(
            table.resolve("/data/file.json"),
            Some(("json", "/data/file.json".to_string()))
        );
        assert_eq!(table.resolve("/index.html"), Some(("default", "/index.html".to_string())));
        Ok(())
    }

    #[test]
    fn unmatched_paths_resolve_to_none_without_default() -> DeployResult<()> {
        let mut table = MappingTable::default();
        table.insert("api", "/api/*")?;
        assert_eq!(table.resolve("/elsewhere"), None);
        Ok(())
    }

    #[test]
    fn duplicate_patterns_across_servlets_are_rejected() -> DeployResult<()> {
        let mut table = MappingTable::default();
        table.insert("a", "/api/*")?;
        table.insert("a", "/api/*")?;
        assert_eq!(table.len(), 1);

        let err = table
            .insert("b", "/api/*")
            .expect_err("second servlet should be rejected");
        assert!(matches!(
            err,
            DeployError::DuplicateMapping { ref first, ref second, .. } if first == "a" && second == "b"
        ));
        Ok(())
    }
}
