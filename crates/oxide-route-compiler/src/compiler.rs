//! End-to-end compilation pipeline using the typestate pattern.
//!
//! Each stage consumes the previous one, so the pipeline cannot be driven
//! out of order:
//!
//! ```text
//! Idle -> Registering -> Classified -> Built -> Serialized -> finish()
//! ```
//!
//! A failure in any stage returns the error and drops the pipeline; no
//! artifact exists until [`Compiler::serialize`] succeeds.

use tracing::{debug, info};

use crate::classify::{classify, Classification, FallbackKind, Strategy};
use crate::combined::{self, CombinedMatcher};
use crate::error::Result;
use crate::fallback::{self, FallbackMatcher};
use crate::method::Method;
use crate::options::CompilerOptions;
use crate::registry::{HandlerChain, Registry, RouteRegistry, RouteSource};
use crate::serialize::{serialize, LiteralArtifact};
use crate::version::RuntimeVersion;

/// The matcher built for a registry. Exactly one shape per registry.
#[derive(Debug)]
pub enum CompiledMatcher {
    /// Merged regular expressions with index tables.
    Combined(CombinedMatcher),
    /// Prefix tree built by plain insertion.
    Fallback(FallbackMatcher),
}

impl CompiledMatcher {
    /// The strategy this matcher implements.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::Combined(_) => Strategy::Combined,
            Self::Fallback(_) => Strategy::Fallback,
        }
    }
}

// Stage markers

/// Stage: nothing registered yet.
#[derive(Debug)]
pub struct Idle;

/// Stage: routes are being replayed.
#[derive(Debug)]
pub struct Registering {
    registry: RouteRegistry,
}

/// Stage: the registry is frozen and a strategy chosen.
#[derive(Debug)]
pub struct Classified {
    registry: Registry,
    classification: Classification,
}

/// Stage: the matcher for the chosen strategy exists.
#[derive(Debug)]
pub struct Built {
    registry: Registry,
    classification: Classification,
    matcher: CompiledMatcher,
}

/// Stage: the literal artifact exists.
#[derive(Debug)]
pub struct Serialized {
    registry: Registry,
    classification: Classification,
    matcher: CompiledMatcher,
    artifact: LiteralArtifact,
}

/// Everything a finished compilation produced.
#[derive(Debug)]
pub struct Compilation {
    /// The frozen routes.
    pub registry: Registry,
    /// Strategy and downgrade diagnostics.
    pub classification: Classification,
    /// The built matcher.
    pub matcher: CompiledMatcher,
    /// The embeddable artifact.
    pub artifact: LiteralArtifact,
}

/// Route compiler for one application.
#[derive(Debug)]
pub struct Compiler<S> {
    runtime: RuntimeVersion,
    options: CompilerOptions,
    stage: S,
}

impl<S> Compiler<S> {
    /// Runtime version the artifact targets.
    #[must_use]
    pub const fn runtime(&self) -> &RuntimeVersion {
        &self.runtime
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn advance<T>(self, stage: T) -> Compiler<T> {
        Compiler {
            runtime: self.runtime,
            options: self.options,
            stage,
        }
    }
}

impl Compiler<Idle> {
    /// Creates a compiler targeting `runtime`.
    #[must_use]
    pub const fn new(runtime: RuntimeVersion, options: CompilerOptions) -> Self {
        Self {
            runtime,
            options,
            stage: Idle,
        }
    }

    /// Opens the registry.
    #[must_use]
    pub fn start(self) -> Compiler<Registering> {
        debug!(runtime = %self.runtime, "Compiler: registering");
        self.advance(Registering {
            registry: RouteRegistry::new(),
        })
    }
}

impl Default for Compiler<Idle> {
    fn default() -> Self {
        Self::new(RuntimeVersion::current(), CompilerOptions::default())
    }
}

impl Compiler<Registering> {
    /// Registers one route.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidPattern`](crate::CompileError::InvalidPattern)
    /// for malformed paths.
    pub fn register(mut self, method: Method, path: &str, chain: HandlerChain) -> Result<Self> {
        self.stage.registry.register(method, path, chain)?;
        Ok(self)
    }

    /// Replays every route of a source.
    ///
    /// # Errors
    ///
    /// Propagates the source's registration errors.
    pub fn replay(mut self, source: &dyn RouteSource) -> Result<Self> {
        self.stage.registry.replay(source)?;
        Ok(self)
    }

    /// Mounts a sub-application under `prefix`.
    ///
    /// # Errors
    ///
    /// Fails when `prefix` is not a valid static prefix.
    pub fn mount(mut self, prefix: &str, app: &Registry) -> Result<Self> {
        self.stage.registry.mount(prefix, app)?;
        Ok(self)
    }

    /// Number of routes registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stage.registry.len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stage.registry.is_empty()
    }

    /// Freezes the registry and classifies it.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::RegistryFrozen`](crate::CompileError::RegistryFrozen)
    /// if the registry was already finalized.
    pub fn finalize(mut self) -> Result<Compiler<Classified>> {
        let registry = self.stage.registry.finalize()?;
        let classification = classify(&registry, &self.runtime, &self.options);
        debug!(
            routes = registry.len(),
            strategy = %classification.strategy,
            "Compiler: classified"
        );
        Ok(self.advance(Classified {
            registry,
            classification,
        }))
    }
}

impl Compiler<Classified> {
    /// The classification result.
    #[must_use]
    pub const fn classification(&self) -> &Classification {
        &self.stage.classification
    }

    /// The frozen registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.stage.registry
    }

    /// Builds the matcher for the chosen strategy.
    ///
    /// # Errors
    ///
    /// Returns an error when a built expression fails its own group-count
    /// check or does not compile.
    pub fn build(self) -> Result<Compiler<Built>> {
        let Classified {
            registry,
            classification,
        } = &self.stage;

        let matcher = match classification.fallback {
            None => CompiledMatcher::Combined(combined::build(registry, &self.options)?),
            Some(kind) => CompiledMatcher::Fallback(fallback::build(registry, kind)?),
        };

        match &matcher {
            CompiledMatcher::Combined(m) => debug!(
                methods = m.methods.len(),
                expressions = m.expression_count(),
                "Compiler: built combined matcher"
            ),
            CompiledMatcher::Fallback(m) => debug!(
                nodes = m.node_count(),
                runtime_combined = m.kind() == FallbackKind::RuntimeCombined,
                "Compiler: built fallback matcher"
            ),
        }

        let Classified {
            registry,
            classification,
        } = self.stage;
        Ok(Compiler {
            runtime: self.runtime,
            options: self.options,
            stage: Built {
                registry,
                classification,
                matcher,
            },
        })
    }
}

impl Compiler<Built> {
    /// The built matcher.
    #[must_use]
    pub const fn matcher(&self) -> &CompiledMatcher {
        &self.stage.matcher
    }

    /// Serializes the matcher.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnsupportedRuntime`](crate::CompileError::UnsupportedRuntime)
    /// when a combined matcher cannot be loaded by the target runtime.
    pub fn serialize(self) -> Result<Compiler<Serialized>> {
        let artifact = serialize(&self.stage.matcher, &self.runtime, &self.options)?;
        let Built {
            registry,
            classification,
            matcher,
        } = self.stage;
        Ok(Compiler {
            runtime: self.runtime,
            options: self.options,
            stage: Serialized {
                registry,
                classification,
                matcher,
                artifact,
            },
        })
    }
}

impl Compiler<Serialized> {
    /// The artifact.
    #[must_use]
    pub const fn artifact(&self) -> &LiteralArtifact {
        &self.stage.artifact
    }

    /// Ends the pipeline.
    #[must_use]
    pub fn finish(self) -> Compilation {
        let Serialized {
            registry,
            classification,
            matcher,
            artifact,
        } = self.stage;
        info!(
            strategy = %artifact.strategy,
            routes = registry.len(),
            "Compilation finished"
        );
        Compilation {
            registry,
            classification,
            matcher,
            artifact,
        }
    }
}

/// Runs the whole pipeline over a route source.
///
/// # Errors
///
/// Returns the first hard failure: an invalid pattern, or an internal
/// invariant breach while building.
pub fn compile(
    source: &dyn RouteSource,
    runtime: RuntimeVersion,
    options: CompilerOptions,
) -> Result<Compilation> {
    Ok(Compiler::new(runtime, options)
        .start()
        .replay(source)?
        .finalize()?
        .build()?
        .serialize()?
        .finish())
}
