//! Error types for the optimize command.

use std::path::PathBuf;

use oxide_route_compiler::CompileError;

/// Errors that can occur while optimizing an application's routes.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    /// IO error (reading manifests or sources, writing the artifact).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a route manifest.
    #[error("Failed to parse manifest '{path}': {source}")]
    Json {
        /// Path to the manifest.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// Route compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// An explicitly named entry does not exist.
    #[error("Entry not found: {0}")]
    EntryNotFound(PathBuf),

    /// No entry was given and none of the default locations exist.
    #[error("No entry given and no routes.json or src/routes.json found")]
    NoEntry,

    /// The target source has no matcher construction to replace.
    #[error("Call site '{target} = ...' not found in target source")]
    CallSiteNotFound {
        /// Assignment target that was searched for.
        target: String,
    },

    /// The output extension maps to no known source flavor.
    #[error("Unsupported output file: {0}")]
    UnsupportedOutput(PathBuf),

    /// A middleware name is not in the catalog.
    #[error("Unknown middleware: {0}")]
    UnknownMiddleware(String),
}

/// Result type for optimize operations.
pub type Result<T> = std::result::Result<T, OptimizeError>;
