//! Middleware catalog.
//!
//! Middleware applied to the whole application is referenced by name and
//! resolved here. Nothing outside the catalog can be applied, and names
//! are never evaluated as code.

use tracing::debug;

use crate::error::{OptimizeError, Result};

/// Every middleware name the optimizer accepts.
pub const BUILTIN: &[&str] = &[
    "logger",
    "cors",
    "etag",
    "compress",
    "basic-auth",
    "bearer-auth",
    "csrf",
    "secure-headers",
    "jwt",
    "body-limit",
    "timeout",
    "timing",
    "request-id",
    "trailing-slash",
    "cache",
    "pretty-json",
    "ip-restriction",
    "method-override",
    "language",
    "context-storage",
];

/// Resolves middleware names against a fixed list.
#[derive(Debug, Clone, Copy)]
pub struct MiddlewareCatalog {
    names: &'static [&'static str],
}

impl Default for MiddlewareCatalog {
    fn default() -> Self {
        Self { names: BUILTIN }
    }
}

impl MiddlewareCatalog {
    /// Returns true if `name` is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name)
    }

    /// Resolves names in order, normalizing `camelCase` and `snake_case`
    /// spellings to the catalog's kebab-case.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::UnknownMiddleware`] for the first name that
    /// is not in the catalog.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&'static str>> {
        names
            .iter()
            .map(|name| {
                let normalized = normalize(name.as_ref());
                let found = self
                    .names
                    .iter()
                    .copied()
                    .find(|known| *known == normalized)
                    .ok_or_else(|| OptimizeError::UnknownMiddleware(name.as_ref().to_string()))?;
                debug!(middleware = found, "Resolved middleware");
                Ok(found)
            })
            .collect()
    }
}

fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.trim().char_indices() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}
