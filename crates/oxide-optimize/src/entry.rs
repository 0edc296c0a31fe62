//! Entry discovery and output path resolution.

use std::path::{Path, PathBuf};

use oxide_route_compiler::Flavor;
use tracing::debug;

use crate::error::{OptimizeError, Result};

/// Manifests looked for, in order, when no entry is given.
pub const DEFAULT_ENTRIES: &[&str] = &["routes.json", "src/routes.json"];

/// Stem of the generated file when no outfile is given.
pub const OUTPUT_STEM: &str = "router-optimized";

/// Resolves the manifests to load.
///
/// Explicit entries are taken relative to `root` and must exist. With no
/// explicit entry, the first existing default location is used.
///
/// # Errors
///
/// Returns [`OptimizeError::EntryNotFound`] for a missing explicit entry
/// and [`OptimizeError::NoEntry`] when no default location exists.
pub async fn discover_entries(root: &Path, explicit: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        let mut entries = Vec::with_capacity(explicit.len());
        for entry in explicit {
            let path = root.join(entry);
            if !tokio::fs::try_exists(&path).await? {
                return Err(OptimizeError::EntryNotFound(path));
            }
            entries.push(path);
        }
        return Ok(entries);
    }

    for candidate in DEFAULT_ENTRIES {
        let path = root.join(candidate);
        if tokio::fs::try_exists(&path).await? {
            debug!(entry = %path.display(), "Discovered entry");
            return Ok(vec![path]);
        }
    }
    Err(OptimizeError::NoEntry)
}

/// Picks the output file.
///
/// `outfile` wins. Otherwise the artifact lands next to `target`, or in
/// `<root>/src` without a target, as `router-optimized.<ext>` where the
/// extension is `js` only for a JavaScript target.
#[must_use]
pub fn resolve_outfile(root: &Path, outfile: Option<&Path>, target: Option<&Path>) -> PathBuf {
    if let Some(outfile) = outfile {
        return root.join(outfile);
    }

    let javascript = target
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .and_then(Flavor::from_extension)
        == Some(Flavor::JavaScript);
    let extension = if javascript {
        Flavor::JavaScript.extension()
    } else {
        Flavor::TypeScript.extension()
    };

    let dir = match target.map(|t| root.join(t)) {
        Some(target) => target
            .parent()
            .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
        None => root.join("src"),
    };
    dir.join(format!("{OUTPUT_STEM}.{extension}"))
}

/// Source flavor for an output path.
///
/// # Errors
///
/// Returns [`OptimizeError::UnsupportedOutput`] when the extension is not
/// a TypeScript or JavaScript one.
pub fn flavor_for(path: &Path) -> Result<Flavor> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Flavor::from_extension)
        .ok_or_else(|| OptimizeError::UnsupportedOutput(path.to_path_buf()))
}
