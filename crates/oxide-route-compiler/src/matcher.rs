//! Lookup results and the reference matcher.
//!
//! Every matcher shape in this crate answers the same question through
//! [`Matcher`]: given a method and a path, which registered route serves
//! it, with which handler chain and parameters. [`DirectMatcher`] answers
//! it by trying every route in registration order; the compiled shapes
//! must agree with it.

use crate::method::Method;
use crate::registry::Registry;

/// Path parameters extracted from a matched path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    params: Vec<(String, String)>,
}

impl Params {
    /// Creates new empty path params.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Appends a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push((key.into(), value.into()));
    }

    /// Gets the first value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// The route selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Registration index of the winning route.
    pub route: usize,
    /// Middleware followed by the handler.
    pub chain: Vec<usize>,
    /// Extracted parameters.
    pub params: Params,
}

/// Anything that can resolve a request to a route.
pub trait Matcher {
    /// Returns the first-registered route serving `method` and `path`.
    fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch>;
}

/// Matches by trying each route in registration order.
///
/// This is the behavior of registering routes directly, without any
/// precompilation.
#[derive(Debug, Clone, Copy)]
pub struct DirectMatcher<'a> {
    registry: &'a Registry,
}

impl<'a> DirectMatcher<'a> {
    /// Creates a matcher over a finalized registry.
    #[must_use]
    pub const fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }
}

impl Matcher for DirectMatcher<'_> {
    fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch> {
        self.registry
            .routes()
            .iter()
            .enumerate()
            .filter(|(_, route)| route.method.accepts(method))
            .find_map(|(index, route)| {
                route.pattern.match_path(path).map(|params| RouteMatch {
                    route: index,
                    chain: route.chain.flatten(),
                    params,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HandlerChain, RouteRegistry};

    #[test]
    fn test_params_keep_order_and_duplicates() {
        let mut params = Params::new();
        params.insert("a", "1");
        params.insert("b", "2");
        params.insert("a", "3");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("a"), Some("1"));
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("a", "3")]);
    }

    #[test]
    fn test_direct_matcher_first_registered_wins() {
        let mut registry = RouteRegistry::new();
        registry
            .register(Method::Get, "/users/:id", HandlerChain::new(0))
            .unwrap();
        registry
            .register(Method::Get, "/users/me", HandlerChain::new(1))
            .unwrap();
        registry
            .register(Method::All, "/users/me", HandlerChain::new(2))
            .unwrap();
        let registry = registry.finalize().unwrap();
        let matcher = DirectMatcher::new(&registry);

        let found = matcher.lookup(Method::Get, "/users/me").unwrap();
        assert_eq!(found.route, 0);
        assert_eq!(found.params.get("id"), Some("me"));

        let found = matcher.lookup(Method::Post, "/users/me").unwrap();
        assert_eq!(found.route, 2);
        assert!(matcher.lookup(Method::Post, "/users/42").is_none());
    }
}
