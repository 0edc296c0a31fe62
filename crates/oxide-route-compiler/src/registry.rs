//! Route registration.
//!
//! Routes are replayed into a [`RouteRegistry`] in the order the
//! application declares them, then frozen into a [`Registry`]. Order is
//! significant: when two routes match the same request, the one
//! registered first wins, and every matcher built from the registry must
//! preserve that.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{CompileError, Result};
use crate::method::Method;
use crate::pattern::{parse_pattern, Pattern};

/// Middleware and handler references for a route, as handler indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerChain {
    /// Middleware run before the handler, in order.
    pub middleware: Vec<usize>,
    /// The handler itself.
    pub handler: usize,
}

impl HandlerChain {
    /// Creates a chain with a handler and no middleware.
    #[must_use]
    pub const fn new(handler: usize) -> Self {
        Self {
            middleware: Vec::new(),
            handler,
        }
    }

    /// Appends middleware to run before the handler.
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl IntoIterator<Item = usize>) -> Self {
        self.middleware.extend(middleware);
        self
    }

    /// Middleware followed by the handler.
    #[must_use]
    pub fn flatten(&self) -> Vec<usize> {
        let mut chain = self.middleware.clone();
        chain.push(self.handler);
        chain
    }
}

/// A single route definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method, or `All`.
    pub method: Method,
    /// Path pattern.
    pub pattern: Pattern,
    /// Handler chain.
    pub chain: HandlerChain,
}

/// A frozen, ordered list of routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    routes: Vec<Route>,
}

impl Registry {
    /// Returns the routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Produces an application's routes.
///
/// The compiler only relies on the order in which a source replays its
/// routes, never on how it discovered them.
pub trait RouteSource {
    /// Registers every route, in declaration order.
    ///
    /// # Errors
    ///
    /// Propagates registration failures such as invalid patterns.
    fn replay(&self, registry: &mut RouteRegistry) -> Result<()>;
}

impl RouteSource for Registry {
    fn replay(&self, registry: &mut RouteRegistry) -> Result<()> {
        for route in &self.routes {
            registry.register_pattern(route.method, route.pattern.clone(), route.chain.clone())?;
        }
        Ok(())
    }
}

impl<F> RouteSource for F
where
    F: Fn(&mut RouteRegistry) -> Result<()>,
{
    fn replay(&self, registry: &mut RouteRegistry) -> Result<()> {
        self(registry)
    }
}

/// Collects routes until [`finalize`](Self::finalize) is called.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    /// Registered routes.
    routes: Vec<Route>,
    /// Parsed patterns by source text.
    cache: HashMap<String, Pattern>,
    /// Set once `finalize` has run.
    frozen: bool,
}

impl RouteRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and appends a route.
    ///
    /// Duplicates are kept; the first registered wins at match time.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::RegistryFrozen`] after finalize, or
    /// [`CompileError::InvalidPattern`] for malformed paths.
    pub fn register(&mut self, method: Method, path: &str, chain: HandlerChain) -> Result<()> {
        self.ensure_open()?;
        let pattern = self.parse_cached(path)?;
        self.register_pattern(method, pattern, chain)
    }

    /// Appends a route with an already parsed pattern.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::RegistryFrozen`] after finalize.
    pub fn register_pattern(
        &mut self,
        method: Method,
        pattern: Pattern,
        chain: HandlerChain,
    ) -> Result<()> {
        self.ensure_open()?;
        debug!(
            index = self.routes.len(),
            method = %method,
            pattern = %pattern,
            "Registered route"
        );
        self.routes.push(Route {
            method,
            pattern,
            chain,
        });
        Ok(())
    }

    /// Mounts a sub-application's routes under `prefix`.
    ///
    /// The sub-application's routes are appended in their own order, each
    /// pattern prefixed with the segments of `prefix`.
    ///
    /// # Errors
    ///
    /// Fails when frozen, when `prefix` is invalid, or when it ends in a
    /// wildcard.
    pub fn mount(&mut self, prefix: &str, app: &Registry) -> Result<()> {
        self.ensure_open()?;
        let prefix = self.parse_cached(prefix)?;
        for route in &app.routes {
            let pattern = route.pattern.prefixed(&prefix)?;
            self.register_pattern(route.method, pattern, route.chain.clone())?;
        }
        Ok(())
    }

    /// Replays a route source into this registry.
    ///
    /// # Errors
    ///
    /// Propagates the source's registration errors.
    pub fn replay(&mut self, source: &dyn RouteSource) -> Result<()> {
        self.ensure_open()?;
        source.replay(self)
    }

    /// Freezes the registry and returns its routes.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::RegistryFrozen`] when called twice.
    pub fn finalize(&mut self) -> Result<Registry> {
        self.ensure_open()?;
        self.frozen = true;
        self.cache.clear();
        Ok(Registry {
            routes: std::mem::take(&mut self.routes),
        })
    }

    /// Returns true once finalized.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of routes registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.frozen {
            Err(CompileError::RegistryFrozen)
        } else {
            Ok(())
        }
    }

    fn parse_cached(&mut self, path: &str) -> Result<Pattern> {
        if let Some(pattern) = self.cache.get(path) {
            return Ok(pattern.clone());
        }
        let pattern = parse_pattern(path)?;
        self.cache.insert(path.to_string(), pattern.clone());
        Ok(pattern)
    }
}
