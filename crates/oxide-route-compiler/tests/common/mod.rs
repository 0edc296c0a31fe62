#![allow(dead_code)]

use oxide_route_compiler::fallback;
use oxide_route_compiler::{
    compile, Compilation, CompilerOptions, DirectMatcher, FallbackKind, HandlerChain, Matcher,
    Method, PreparedMatcher, Registry, RouteRegistry, RuntimeVersion,
};

/// Methods exercised by the equivalence checks.
pub const METHODS: [Method; 5] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Delete,
    Method::Head,
];

/// Builds a registry where each route's handler is its position.
pub fn registry(routes: &[(Method, &str)]) -> Registry {
    let mut registry = RouteRegistry::new();
    for (i, (method, path)) in routes.iter().enumerate() {
        registry
            .register(*method, path, HandlerChain::new(i))
            .unwrap_or_else(|e| panic!("Failed to register {path}: {e}"));
    }
    registry.finalize().unwrap()
}

/// Compiles a registry for the current runtime with default options.
pub fn compile_registry(registry: &Registry) -> Compilation {
    compile(registry, RuntimeVersion::current(), CompilerOptions::default())
        .unwrap_or_else(|e| panic!("Failed to compile: {e}"))
}

/// Compiles a registry and loads the resulting literal back.
pub fn prepared(registry: &Registry) -> PreparedMatcher {
    let compilation = compile_registry(registry);
    let literal = compilation
        .artifact
        .literal()
        .expect("Expected a prepared literal");
    PreparedMatcher::from_literal(literal).unwrap()
}

/// Asserts that every matcher built from `registry` resolves each
/// request exactly like direct registration.
pub fn assert_equivalent(registry: &Registry, paths: &[&str]) {
    let direct = DirectMatcher::new(registry);
    let tree = fallback::build(registry, FallbackKind::Structural).unwrap();
    let prepared = prepared(registry);

    for method in METHODS {
        for path in paths {
            let expected = direct.lookup(method, path);
            assert_eq!(
                prepared.lookup(method, path),
                expected,
                "Prepared matcher differs for {method} {path}"
            );
            assert_eq!(
                tree.lookup(method, path),
                expected,
                "Fallback matcher differs for {method} {path}"
            );
        }
    }
}

/// Asserts that the fallback tree agrees with direct registration.
pub fn assert_fallback_equivalent(registry: &Registry, paths: &[&str]) {
    let direct = DirectMatcher::new(registry);
    let tree = fallback::build(registry, FallbackKind::Structural).unwrap();
    for method in METHODS {
        for path in paths {
            assert_eq!(
                tree.lookup(method, path),
                direct.lookup(method, path),
                "Fallback matcher differs for {method} {path}"
            );
        }
    }
}
