//! # oxide-route-compiler
//!
//! Ahead-of-time compiler for HTTP route tables.
//!
//! An application's routes are replayed into a registry, classified, and
//! compiled into the cheapest matcher that still routes every request
//! exactly as direct registration would:
//!
//! - **Combined**: routes are merged into a few anchored regular
//!   expressions with index tables and serialized as a literal that a
//!   runtime loads without any per-route work.
//! - **Fallback**: when a pattern cannot be merged safely, or the runtime
//!   cannot load prepared literals, the artifact tells the consumer to
//!   build its general matcher as usual.
//!
//! ## Quick Start
//!
//! ```
//! use oxide_route_compiler::prelude::*;
//!
//! let compilation = Compiler::default()
//!     .start()
//!     .register(Method::Get, "/", HandlerChain::new(0))?
//!     .register(Method::Get, "/users/:id", HandlerChain::new(1))?
//!     .finalize()?
//!     .build()?
//!     .serialize()?
//!     .finish();
//!
//! assert_eq!(compilation.artifact.strategy, Strategy::Combined);
//! # Ok::<(), oxide_route_compiler::CompileError>(())
//! ```
//!
//! ## Path Patterns
//!
//! | Syntax         | Segment                  |
//! |----------------|--------------------------|
//! | `users`        | static text              |
//! | `:id`          | capture of one segment   |
//! | `:id{[0-9]+}`  | constrained capture      |
//! | `*`            | wildcard, last only      |
//!
//! ## Loading a literal
//!
//! ```
//! use oxide_route_compiler::prelude::*;
//!
//! let source = |registry: &mut RouteRegistry| -> oxide_route_compiler::Result<()> {
//!     registry.register(Method::Get, "/posts/:slug", HandlerChain::new(0))
//! };
//! let compilation = compile(&source, RuntimeVersion::current(), CompilerOptions::default())?;
//! let literal = compilation.artifact.literal().unwrap_or_default();
//!
//! let matcher = PreparedMatcher::from_literal(literal)?;
//! let found = matcher.lookup(Method::Get, "/posts/hello").unwrap();
//! assert_eq!(found.params.get("slug"), Some("hello"));
//! # Ok::<(), oxide_route_compiler::CompileError>(())
//! ```

pub mod classify;
pub mod combined;
pub mod compiler;
pub mod error;
pub mod fallback;
pub mod matcher;
pub mod method;
pub mod options;
pub mod pattern;
pub mod registry;
pub mod runtime;
pub mod serialize;
pub mod version;

pub use classify::{check_pattern, classify, Classification, FallbackKind, Strategy};
pub use combined::CombinedMatcher;
pub use compiler::{compile, Compilation, CompiledMatcher, Compiler};
pub use error::{CompileError, Result};
pub use fallback::FallbackMatcher;
pub use matcher::{DirectMatcher, Matcher, Params, RouteMatch};
pub use method::Method;
pub use options::CompilerOptions;
pub use pattern::{parse_pattern, Pattern, Segment};
pub use registry::{HandlerChain, Registry, Route, RouteRegistry, RouteSource};
pub use runtime::PreparedMatcher;
pub use serialize::{serialize, ArtifactBody, CallSite, Flavor, LiteralArtifact};
pub use version::{RuntimeVersion, PREPARED_FORM_VERSION};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        compile, parse_pattern, CompileError, Compiler, CompilerOptions, Flavor, HandlerChain,
        Matcher, Method, PreparedMatcher, RouteRegistry, RouteSource, RuntimeVersion, Strategy,
    };
}
