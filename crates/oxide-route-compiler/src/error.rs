//! Error types for route compilation.

use thiserror::Error;

/// Errors raised while parsing, classifying, building or serializing routes.
///
/// Only some of these abort a compilation. `AmbiguousGroup`,
/// `UnsupportedSegment` and `UnsupportedRuntime` found during
/// classification are recorded as downgrade reasons and force the
/// fallback strategy instead.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed path syntax.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The registry was already finalized.
    #[error("route registry is frozen; no registration is allowed after finalize")]
    RegistryFrozen,

    /// The installed matching runtime predates the prepared literal form.
    #[error("matching runtime {found} is older than {minimum}, which introduced the prepared form")]
    UnsupportedRuntime {
        /// Version reported by the caller.
        found: String,
        /// Minimum version exposing the prepared form.
        minimum: String,
    },

    /// A constraint would desynchronize capture-group indexing.
    #[error("constraint in '{pattern}' cannot be combined: {reason}")]
    AmbiguousGroup {
        /// The offending pattern text.
        pattern: String,
        /// Which construct caused the ambiguity.
        reason: String,
    },

    /// A segment layout the combined form cannot express.
    #[error("pattern '{pattern}' cannot be combined: {reason}")]
    UnsupportedSegment {
        /// The offending pattern text.
        pattern: String,
        /// Which segment is unsupported.
        reason: String,
    },

    /// A runtime version string could not be parsed.
    #[error("invalid runtime version: {0}")]
    InvalidVersion(String),

    /// A combined expression failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A prepared literal could not be decoded.
    #[error("malformed literal: {0}")]
    Literal(#[from] serde_json::Error),
}

impl CompileError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn ambiguous_group(pattern: &str, reason: impl Into<String>) -> Self {
        Self::AmbiguousGroup {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that only downgrade the compilation to
    /// the fallback strategy.
    #[must_use]
    pub const fn is_downgrade(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousGroup { .. }
                | Self::UnsupportedSegment { .. }
                | Self::UnsupportedRuntime { .. }
        )
    }
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
