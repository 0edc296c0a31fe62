//! Declarative route manifests.
//!
//! A manifest lists an application's routes in declaration order:
//!
//! ```json
//! {
//!   "use": ["logger", "cors"],
//!   "routes": [
//!     { "method": "GET", "path": "/", "handler": "index" },
//!     { "method": "GET", "path": "/users/:id", "handler": "showUser", "middleware": ["auth"] },
//!     { "mount": "/api", "routes": [
//!       { "method": "ALL", "path": "/health", "handler": "health" }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Handler and middleware names are interned into one table, in order of
//! first appearance, and routes refer to them by index. Application-wide
//! middleware (`use`) must come from the [`MiddlewareCatalog`].

use std::path::{Path, PathBuf};

use oxide_route_compiler::{HandlerChain, Method, RouteRegistry, RouteSource};
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::MiddlewareCatalog;
use crate::error::{OptimizeError, Result};

/// A parsed manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Application-wide middleware, by catalog name.
    #[serde(default, rename = "use")]
    pub middleware: Vec<String>,
    /// Routes and mounts in declaration order.
    #[serde(default)]
    pub routes: Vec<ManifestEntry>,
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    /// A sub-application mounted under a prefix.
    Mount {
        /// Static path prefix.
        mount: String,
        /// The sub-application's routes.
        #[serde(default)]
        routes: Vec<ManifestEntry>,
    },
    /// A single route.
    Route {
        /// HTTP method, `GET` when omitted.
        #[serde(default = "default_method")]
        method: Method,
        /// Path pattern.
        path: String,
        /// Handler name.
        handler: String,
        /// Route-level middleware names, run before the handler.
        #[serde(default)]
        middleware: Vec<String>,
    },
}

const fn default_method() -> Method {
    Method::Get
}

impl Manifest {
    /// Parses manifest text; `path` is used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Json`] if the text is not a valid manifest.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| OptimizeError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Io`] if the file cannot be read, or
    /// [`OptimizeError::Json`] if it is not a valid manifest.
    pub async fn read(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(path, &text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Route {
        method: Method,
        path: String,
        chain: HandlerChain,
    },
    Mount {
        prefix: String,
        entries: Vec<Resolved>,
    },
}

/// Routes from one or more manifests, ready to replay.
#[derive(Debug, Clone, Default)]
pub struct ManifestSource {
    names: Vec<String>,
    entries: Vec<Resolved>,
    files: Vec<PathBuf>,
}

impl ManifestSource {
    /// Loads manifests in order and merges them into one source.
    ///
    /// `global_use` is applied before every route of every manifest,
    /// ahead of each manifest's own `use` list.
    ///
    /// # Errors
    ///
    /// Fails if a manifest cannot be read or parsed, or names middleware
    /// missing from the catalog.
    pub async fn load(
        paths: &[PathBuf],
        global_use: &[String],
        catalog: &MiddlewareCatalog,
    ) -> Result<Self> {
        let mut manifests = Vec::with_capacity(paths.len());
        for path in paths {
            debug!(path = %path.display(), "Reading manifest");
            manifests.push(Manifest::read(path).await?);
        }
        let mut source = Self::from_manifests(&manifests, global_use, catalog)?;
        source.files = paths.to_vec();
        info!(
            manifests = paths.len(),
            routes = source.route_count(),
            names = source.names.len(),
            "Loaded route manifests"
        );
        Ok(source)
    }

    /// Merges already parsed manifests.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::UnknownMiddleware`] for a `use` name
    /// missing from the catalog.
    pub fn from_manifests(
        manifests: &[Manifest],
        global_use: &[String],
        catalog: &MiddlewareCatalog,
    ) -> Result<Self> {
        let mut source = Self::default();
        let global: Vec<usize> = catalog
            .resolve(global_use)?
            .into_iter()
            .map(|name| source.intern(name))
            .collect();

        for manifest in manifests {
            let mut prefix = global.clone();
            for name in catalog.resolve(&manifest.middleware)? {
                prefix.push(source.intern(name));
            }
            let entries = source.resolve_entries(&manifest.routes, &prefix);
            source.entries.extend(entries);
        }
        Ok(source)
    }

    /// Interned handler and middleware names; chain indices point here.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Manifest files this source was loaded from.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Renders a chain as names, e.g. `logger > auth > showUser`.
    #[must_use]
    pub fn describe_chain(&self, chain: &[usize]) -> String {
        chain
            .iter()
            .map(|&i| self.names.get(i).map_or("?", String::as_str))
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Number of routes, counting mounted ones.
    #[must_use]
    pub fn route_count(&self) -> usize {
        fn count(entries: &[Resolved]) -> usize {
            entries
                .iter()
                .map(|entry| match entry {
                    Resolved::Route { .. } => 1,
                    Resolved::Mount { entries, .. } => count(entries),
                })
                .sum()
        }
        count(&self.entries)
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(index) = self.names.iter().position(|n| n == name) {
            return index;
        }
        self.names.push(name.to_string());
        self.names.len() - 1
    }

    fn resolve_entries(&mut self, entries: &[ManifestEntry], prefix: &[usize]) -> Vec<Resolved> {
        entries
            .iter()
            .map(|entry| match entry {
                ManifestEntry::Route {
                    method,
                    path,
                    handler,
                    middleware,
                } => {
                    let mut chain_middleware = prefix.to_vec();
                    for name in middleware {
                        chain_middleware.push(self.intern(name));
                    }
                    let handler = self.intern(handler);
                    Resolved::Route {
                        method: *method,
                        path: path.clone(),
                        chain: HandlerChain::new(handler).with_middleware(chain_middleware),
                    }
                }
                ManifestEntry::Mount { mount, routes } => Resolved::Mount {
                    prefix: mount.clone(),
                    entries: self.resolve_entries(routes, prefix),
                },
            })
            .collect()
    }
}

impl RouteSource for ManifestSource {
    fn replay(&self, registry: &mut RouteRegistry) -> oxide_route_compiler::Result<()> {
        replay_entries(&self.entries, registry)
    }
}

fn replay_entries(
    entries: &[Resolved],
    registry: &mut RouteRegistry,
) -> oxide_route_compiler::Result<()> {
    for entry in entries {
        match entry {
            Resolved::Route {
                method,
                path,
                chain,
            } => registry.register(*method, path, chain.clone())?,
            Resolved::Mount { prefix, entries } => {
                let mut sub = RouteRegistry::new();
                replay_entries(entries, &mut sub)?;
                registry.mount(prefix, &sub.finalize()?)?;
            }
        }
    }
    Ok(())
}
