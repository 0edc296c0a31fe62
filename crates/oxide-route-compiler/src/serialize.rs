//! Literal serialization.
//!
//! A combined matcher is written out as a JSON literal holding the
//! expressions and their index tables, plus the one construction call
//! that loads it. A fallback matcher has nothing worth embedding; its
//! artifact is a marker telling the consumer to build its general matcher
//! and register routes as usual.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{check_runtime, FallbackKind, Strategy};
use crate::combined::{CombinedMatcher, MethodGroup};
use crate::compiler::CompiledMatcher;
use crate::error::Result;
use crate::method::Method;
use crate::options::CompilerOptions;
use crate::version::RuntimeVersion;

/// Binding that holds the prepared literal in generated code.
pub const PARAMS_BINDING: &str = "routerParams";
/// Constructor that loads a prepared literal.
pub const PREPARED_CONSTRUCTOR: &str = "PreparedMatcher";
/// Constructor of the runtime's combined matcher, built at start-up.
pub const COMBINED_CONSTRUCTOR: &str = "RegExpMatcher";
/// Constructor of the runtime's prefix-tree matcher.
pub const TRIE_CONSTRUCTOR: &str = "TrieMatcher";

/// Serialized shape of a prepared literal.
#[derive(Serialize)]
struct LiteralRef<'a> {
    runtime: &'a RuntimeVersion,
    methods: &'a BTreeMap<Method, MethodGroup>,
}

/// A prepared literal as read back by the runtime.
#[derive(Debug, Deserialize)]
pub(crate) struct PreparedLiteral {
    /// Oldest runtime able to load this literal.
    pub runtime: RuntimeVersion,
    /// Method groups.
    pub methods: BTreeMap<Method, MethodGroup>,
}

/// Source dialect of the file the artifact is spliced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Keeps a type-cast annotation on the prepared construction.
    TypeScript,
    /// Plain construction, no annotation.
    JavaScript,
}

impl Flavor {
    /// Picks the flavor for a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    /// Canonical extension for generated files.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TypeScript => "ts",
            Self::JavaScript => "js",
        }
    }
}

/// Where the matcher is constructed in the consumer's source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// The assignment target, e.g. `this.router`.
    pub target: String,
}

/// What the artifact tells the consumer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBody {
    /// Load the embedded literal directly.
    Prepared {
        /// The JSON literal.
        literal: String,
    },
    /// Construct a general matcher and register routes as usual.
    Rebuild {
        /// Which general matcher to construct.
        kind: FallbackKind,
    },
}

/// The serialized, directly embeddable form of a compiled matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralArtifact {
    /// Strategy the artifact was produced with.
    pub strategy: Strategy,
    /// Literal or rebuild marker.
    pub body: ArtifactBody,
    /// Insertion point for the artifact writer.
    pub call_site: CallSite,
}

impl LiteralArtifact {
    /// The embedded literal, for prepared artifacts.
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match &self.body {
            ArtifactBody::Prepared { literal } => Some(literal),
            ArtifactBody::Rebuild { .. } => None,
        }
    }

    /// Name of the constructor the generated code calls.
    #[must_use]
    pub const fn constructor(&self) -> &'static str {
        match &self.body {
            ArtifactBody::Prepared { .. } => PREPARED_CONSTRUCTOR,
            ArtifactBody::Rebuild {
                kind: FallbackKind::RuntimeCombined,
            } => COMBINED_CONSTRUCTOR,
            ArtifactBody::Rebuild {
                kind: FallbackKind::Structural,
            } => TRIE_CONSTRUCTOR,
        }
    }

    /// Declaration to place before the call site, if any.
    #[must_use]
    pub fn preamble(&self) -> Option<String> {
        self.literal()
            .map(|literal| format!("const {PARAMS_BINDING} = {literal};"))
    }

    /// Replacement for the construction statement, without a trailing
    /// semicolon.
    #[must_use]
    pub fn statement(&self, flavor: Flavor) -> String {
        let target = &self.call_site.target;
        match (&self.body, flavor) {
            (ArtifactBody::Prepared { .. }, Flavor::TypeScript) => format!(
                "{target} = new {PREPARED_CONSTRUCTOR}({PARAMS_BINDING}) as unknown as typeof {target}"
            ),
            (ArtifactBody::Prepared { .. }, Flavor::JavaScript) => {
                format!("{target} = new {PREPARED_CONSTRUCTOR}({PARAMS_BINDING})")
            }
            (ArtifactBody::Rebuild { .. }, _) => {
                format!("{target} = new {}()", self.constructor())
            }
        }
    }

    /// Preamble and statement as one block of text.
    #[must_use]
    pub fn render(&self, flavor: Flavor) -> String {
        match self.preamble() {
            Some(preamble) => format!("{preamble}\n{}", self.statement(flavor)),
            None => self.statement(flavor),
        }
    }
}

impl fmt::Display for LiteralArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Flavor::JavaScript))
    }
}

/// Serializes a compiled matcher.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedRuntime`](crate::CompileError::UnsupportedRuntime)
/// before emitting anything when a combined matcher is to be written for
/// a runtime older than `options.minimum_runtime`, and
/// [`CompileError::Literal`](crate::CompileError::Literal) if encoding fails.
pub fn serialize(
    matcher: &CompiledMatcher,
    runtime: &RuntimeVersion,
    options: &CompilerOptions,
) -> Result<LiteralArtifact> {
    let call_site = CallSite {
        target: options.call_site.clone(),
    };

    let artifact = match matcher {
        CompiledMatcher::Combined(combined) => {
            check_runtime(runtime, &options.minimum_runtime)?;
            LiteralArtifact {
                strategy: Strategy::Combined,
                body: ArtifactBody::Prepared {
                    literal: encode(combined, &options.minimum_runtime)?,
                },
                call_site,
            }
        }
        CompiledMatcher::Fallback(fallback) => LiteralArtifact {
            strategy: Strategy::Fallback,
            body: ArtifactBody::Rebuild {
                kind: fallback.kind(),
            },
            call_site,
        },
    };

    debug!(
        strategy = %artifact.strategy,
        constructor = artifact.constructor(),
        bytes = artifact.literal().map_or(0, str::len),
        "Serialized matcher"
    );
    Ok(artifact)
}

fn encode(matcher: &CombinedMatcher, runtime: &RuntimeVersion) -> Result<String> {
    Ok(serde_json::to_string(&LiteralRef {
        runtime,
        methods: &matcher.methods,
    })?)
}
