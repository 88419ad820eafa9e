//! `${key}` interpolation over pluggable value sources.
//!
//! # Design
//! - The expression pattern is compiled once per [`Interpolator`]; callers keep
//!   the interpolator around and supply the value source per call.
//! - Resolved values are expanded recursively. A key that refers back to itself
//!   (directly or through other keys) is reported as a cycle.
//! - Keys prefixed with `env.` are conventionally answered by [`EnvValueSource`].

use std::collections::BTreeMap;
use std::env;

use regex::Regex;
use thiserror::Error;

const EXPRESSION_PATTERN: &str = r"\$\{([^}]+)\}";
const ENV_PREFIX: &str = "env.";

/// Errors raised while expanding an expression.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// The expression referenced a key no source could answer.
    #[error("undefined variable `{expression}`")]
    Undefined {
        /// Key inside the `${}` expression.
        expression: String,
    },
    /// Expansion referred back to a key already being expanded.
    #[error("interpolation cycle detected: {}", chain.join(" -> "))]
    Cycle {
        /// Keys visited, ending with the repeated key.
        chain: Vec<String>,
    },
    /// The expression pattern failed to compile.
    #[error("invalid interpolation pattern")]
    Pattern {
        /// Source regex error.
        source: regex::Error,
    },
}

/// Source of values for `${key}` expressions.
pub trait ValueSource {
    /// Look up the raw (unexpanded) value for `key`.
    fn value(&self, key: &str) -> Option<String>;
}

impl ValueSource for BTreeMap<String, String> {
    fn value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<S: ValueSource + ?Sized> ValueSource for &S {
    fn value(&self, key: &str) -> Option<String> {
        (**self).value(key)
    }
}

/// Answers `env.NAME` keys from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvValueSource;

impl ValueSource for EnvValueSource {
    fn value(&self, key: &str) -> Option<String> {
        key.strip_prefix(ENV_PREFIX)
            .and_then(|name| env::var(name).ok())
    }
}

/// Expands `${key}` expressions found in a string.
#[derive(Debug, Clone)]
pub struct Interpolator {
    pattern: Regex,
}

impl Interpolator {
    /// Build an interpolator with the standard `${}` expression syntax.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::Pattern`] if the expression pattern fails to compile.
    pub fn new() -> Result<Self, InterpolationError> {
        let pattern =
            Regex::new(EXPRESSION_PATTERN).map_err(|source| InterpolationError::Pattern { source })?;
        Ok(Self { pattern })
    }

    /// Expand every expression in `value` against `sources`, consulted in order.
    ///
    /// # Errors
    ///
    /// Returns an error when an expression is undefined or expansion cycles.
    pub fn interpolate(
        &self,
        value: &str,
        sources: &[&dyn ValueSource],
    ) -> Result<String, InterpolationError> {
        let mut visiting = Vec::new();
        self.expand(value, sources, &mut visiting)
    }

    fn expand(
        &self,
        value: &str,
        sources: &[&dyn ValueSource],
        visiting: &mut Vec<String>,
    ) -> Result<String, InterpolationError> {
        let mut expanded = String::with_capacity(value.len());
        let mut last = 0;

        for captures in self.pattern.captures_iter(value) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            expanded.push_str(&value[last..whole.start()]);
            last = whole.end();

            let key = key.as_str().trim();
            if visiting.iter().any(|seen| seen == key) {
                let mut chain = visiting.clone();
                chain.push(key.to_string());
                return Err(InterpolationError::Cycle { chain });
            }

            let raw = sources
                .iter()
                .find_map(|source| source.value(key))
                .ok_or_else(|| InterpolationError::Undefined {
                    expression: key.to_string(),
                })?;

            visiting.push(key.to_string());
            let resolved = self.expand(&raw, sources, visiting)?;
            visiting.pop();
            expanded.push_str(&resolved);
        }

        expanded.push_str(&value[last..]);
        Ok(expanded)
    }
}
