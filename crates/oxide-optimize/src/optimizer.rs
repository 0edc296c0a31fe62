//! Drives one optimize run: load routes, compile, write the artifact.

use std::path::PathBuf;

use oxide_route_compiler::{
    check_pattern, compile, CompileError, CompilerOptions, Flavor, Method, RouteRegistry,
    RuntimeVersion, Strategy,
};
use tracing::{info, warn};

use crate::catalog::MiddlewareCatalog;
use crate::entry::{discover_entries, flavor_for, resolve_outfile};
use crate::error::Result;
use crate::manifest::ManifestSource;
use crate::writer::{splice, template, write_atomic};

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    /// Directory relative paths are resolved against.
    pub root: PathBuf,
    /// Manifests to load; discovered when empty.
    pub entries: Vec<PathBuf>,
    /// Output file; derived from `target` when absent.
    pub outfile: Option<PathBuf>,
    /// Source whose call site is replaced; a built-in template otherwise.
    pub target: Option<PathBuf>,
    /// Application-wide middleware, by catalog name.
    pub middleware: Vec<String>,
    /// Runtime the artifact is generated for.
    pub runtime: RuntimeVersion,
    /// Compiler options.
    pub options: CompilerOptions,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: Vec::new(),
            outfile: None,
            target: None,
            middleware: Vec::new(),
            runtime: RuntimeVersion::current(),
            options: CompilerOptions::default(),
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct OptimizeReport {
    /// Written file.
    pub outfile: PathBuf,
    /// Flavor of the written file.
    pub flavor: Flavor,
    /// Strategy of the artifact.
    pub strategy: Strategy,
    /// Number of routes compiled.
    pub routes: usize,
    /// Reasons the combined form was not used.
    pub downgrades: Vec<String>,
}

/// One line of the route listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRow {
    /// Registration index.
    pub index: usize,
    /// Method.
    pub method: Method,
    /// Canonical pattern text.
    pub path: String,
    /// Chain rendered by name.
    pub chain: String,
    /// Why the route cannot be combined, if it cannot.
    pub ineligible: Option<String>,
}

/// Loads the manifests named by `config`.
///
/// # Errors
///
/// Fails when no entry can be found, a manifest is invalid, or a
/// middleware name is unknown.
pub async fn load_source(config: &OptimizeConfig) -> Result<ManifestSource> {
    let entries = discover_entries(&config.root, &config.entries).await?;
    ManifestSource::load(&entries, &config.middleware, &MiddlewareCatalog::default()).await
}

/// Runs the whole optimization and writes the artifact.
///
/// Nothing is written unless every step before the write succeeds.
///
/// # Errors
///
/// Fails on any load, compile, splice or write error.
pub async fn optimize(config: &OptimizeConfig) -> Result<OptimizeReport> {
    let outfile = resolve_outfile(
        &config.root,
        config.outfile.as_deref(),
        config.target.as_deref(),
    );
    let flavor = flavor_for(&outfile)?;

    let source = load_source(config).await?;
    let compilation = compile(&source, config.runtime, config.options.clone())?;

    let base = match &config.target {
        Some(target) => tokio::fs::read_to_string(config.root.join(target)).await?,
        None => template(&config.options.call_site, flavor),
    };
    let contents = splice(&base, &compilation.artifact, flavor)?;
    write_atomic(&outfile, &contents).await?;

    let downgrades: Vec<String> = compilation
        .classification
        .downgrades
        .iter()
        .map(ToString::to_string)
        .collect();
    for reason in &downgrades {
        warn!(reason = %reason, "Combined form not used");
    }
    info!(
        outfile = %outfile.display(),
        strategy = %compilation.artifact.strategy,
        routes = compilation.registry.len(),
        "Optimized router written"
    );

    Ok(OptimizeReport {
        outfile,
        flavor,
        strategy: compilation.artifact.strategy,
        routes: compilation.registry.len(),
        downgrades,
    })
}

/// Lists every route with its chain and eligibility.
///
/// # Errors
///
/// Returns an error if a route pattern is invalid.
pub fn describe_routes(source: &ManifestSource) -> Result<Vec<RouteRow>> {
    let mut registry = RouteRegistry::new();
    registry.replay(source)?;
    let registry = registry.finalize()?;

    Ok(registry
        .routes()
        .iter()
        .enumerate()
        .map(|(index, route)| RouteRow {
            index,
            method: route.method,
            path: route.pattern.to_string(),
            chain: source.describe_chain(&route.chain.flatten()),
            ineligible: check_pattern(&route.pattern)
                .err()
                .map(|e: CompileError| e.to_string()),
        })
        .collect())
}
