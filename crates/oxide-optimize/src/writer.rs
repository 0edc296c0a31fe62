//! Artifact writer.
//!
//! Replaces the matcher construction in a source file with the rendered
//! artifact and writes the result. The construction is found as the first
//! assignment `<target> = ...`; it ends at a `;` or at the end of a line,
//! outside any brackets or string literal.

use std::ops::Range;
use std::path::{Path, PathBuf};

use oxide_route_compiler::{Flavor, LiteralArtifact};
use regex::Regex;
use tracing::debug;

use crate::error::{OptimizeError, Result};

/// First line of generated files.
pub const GENERATED_HEADER: &str = "// Generated by oxide-optimize. Do not edit.";

/// Location of a construction statement in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteSpan {
    /// Byte range of the statement, terminator included.
    pub statement: Range<usize>,
    /// Byte offset of the start of the statement's line.
    pub line_start: usize,
    /// Leading whitespace of that line.
    pub indent: String,
    /// Whether the statement ended with `;`.
    pub terminated: bool,
}

/// Finds the first assignment to `target`.
///
/// # Errors
///
/// Returns [`OptimizeError::CallSiteNotFound`] when there is none.
pub fn find_call_site(source: &str, target: &str) -> Result<CallSiteSpan> {
    let not_found = || OptimizeError::CallSiteNotFound {
        target: target.to_string(),
    };
    let pattern = Regex::new(&format!(
        r"(?m)(?:^|[^\w.$])({})\s*=",
        regex::escape(target)
    ))
    .map_err(oxide_route_compiler::CompileError::from)?;

    for caps in pattern.captures_iter(source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Skip comparisons and arrows.
        if matches!(source.as_bytes().get(whole.end()), Some(b'=' | b'>')) {
            continue;
        }

        let start = name.start();
        let (end, terminated) = statement_end(source, whole.end());
        let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
        let indent: String = source[line_start..start]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        return Ok(CallSiteSpan {
            statement: start..end,
            line_start,
            indent,
            terminated,
        });
    }
    Err(not_found())
}

/// Scans an assigned expression starting at `from`.
fn statement_end(source: &str, from: usize) -> (usize, bool) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut seen_value = false;

    for (offset, c) in source[from..].char_indices() {
        let at = from + offset;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                if depth == 0 {
                    // Closing a block the statement lives in.
                    return (at, false);
                }
                depth -= 1;
            }
            ';' if depth == 0 => return (at + 1, true),
            '\n' if depth == 0 && seen_value => return (at, false),
            _ => {}
        }
        if !c.is_whitespace() {
            seen_value = true;
        }
    }
    (source.len(), false)
}

/// Splices the artifact into `source` at its call site.
///
/// # Errors
///
/// Returns [`OptimizeError::CallSiteNotFound`] when `source` does not
/// assign the artifact's call-site target.
pub fn splice(source: &str, artifact: &LiteralArtifact, flavor: Flavor) -> Result<String> {
    let span = find_call_site(source, &artifact.call_site.target)?;
    let mut statement = artifact.statement(flavor);
    if span.terminated {
        statement.push(';');
    }

    let mut out = String::with_capacity(source.len() + statement.len() + 64);
    out.push_str(&source[..span.line_start]);
    if let Some(preamble) = artifact.preamble() {
        out.push_str(&span.indent);
        out.push_str(&preamble);
        out.push('\n');
    }
    out.push_str(&source[span.line_start..span.statement.start]);
    out.push_str(&statement);
    out.push_str(&source[span.statement.end..]);

    debug!(
        target = %artifact.call_site.target,
        at = span.statement.start,
        replaced = span.statement.len(),
        "Spliced artifact"
    );
    Ok(out)
}

/// Module written when there is no target source to splice into.
///
/// A `this.`-prefixed target gets a class whose constructor holds the
/// call site; any other target is assigned at module level.
#[must_use]
pub fn template(target: &str, flavor: Flavor) -> String {
    let Some(field) = target.strip_prefix("this.") else {
        return format!("{GENERATED_HEADER}\n\n{target} = undefined\n");
    };

    let declaration = if flavor == Flavor::TypeScript && !field.contains('.') {
        format!("  {field}: unknown\n\n")
    } else {
        String::new()
    };
    format!(
        "{GENERATED_HEADER}\n\nexport class OptimizedRouter {{\n{declaration}  constructor() {{\n    {target} = undefined\n  }}\n}}\n"
    )
}

/// Writes `contents` to `path` through a sibling temporary file.
///
/// Parent directories are created. On failure the destination is left
/// untouched.
///
/// # Errors
///
/// Returns [`OptimizeError::Io`] if writing or renaming fails.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    tokio::fs::create_dir_all(&dir).await?;

    let name = path
        .file_name()
        .map_or_else(|| "artifact".into(), |n| n.to_string_lossy().into_owned());
    let temp = dir.join(format!(".{name}.tmp"));

    tokio::fs::write(&temp, contents).await?;
    if let Err(err) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err.into());
    }
    debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_route_compiler::{ArtifactBody, CallSite, FallbackKind, Strategy};

    fn prepared() -> LiteralArtifact {
        LiteralArtifact {
            strategy: Strategy::Combined,
            body: ArtifactBody::Prepared {
                literal: r#"{"runtime":"0.1.0","methods":{}}"#.to_string(),
            },
            call_site: CallSite {
                target: "this.router".to_string(),
            },
        }
    }

    fn trie() -> LiteralArtifact {
        LiteralArtifact {
            strategy: Strategy::Fallback,
            body: ArtifactBody::Rebuild {
                kind: FallbackKind::Structural,
            },
            call_site: CallSite {
                target: "this.router".to_string(),
            },
        }
    }

    const SOURCE: &str = "class App {\n  constructor(options = {}) {\n    this.router = options.router ?? new SmartRouter({\n      routers: [new RegExpRouter(), new TrieRouter()],\n    })\n    this.getPath = options.getPath\n  }\n}\n";

    #[test]
    fn test_find_multiline_call_site() {
        let span = find_call_site(SOURCE, "this.router").unwrap();
        assert_eq!(span.indent, "    ");
        assert!(!span.terminated);
        assert!(SOURCE[span.statement.clone()].starts_with("this.router = options.router"));
        assert!(SOURCE[span.statement.clone()].ends_with("})"));
    }

    #[test]
    fn test_splice_prepared_typescript() {
        let out = splice(SOURCE, &prepared(), Flavor::TypeScript).unwrap();
        assert!(out.contains(
            "    const routerParams = {\"runtime\":\"0.1.0\",\"methods\":{}};\n    this.router = new PreparedMatcher(routerParams) as unknown as typeof this.router\n    this.getPath"
        ));
        assert!(!out.contains("SmartRouter"));
    }

    #[test]
    fn test_splice_keeps_semicolon() {
        let source = "let x = 1;\nthis.router = new RegExpRouter(); // keep\n";
        let out = splice(source, &trie(), Flavor::JavaScript).unwrap();
        assert_eq!(out, "let x = 1;\nthis.router = new TrieMatcher(); // keep\n");
    }

    #[test]
    fn test_comparisons_are_not_call_sites() {
        let source = "if (this.router == null) {}\nconst same = this.router === other\n";
        assert!(matches!(
            find_call_site(source, "this.router"),
            Err(OptimizeError::CallSiteNotFound { .. })
        ));
        // A longer member name is a different target.
        assert!(find_call_site("this.routerX = 1", "this.router").is_err());
        assert!(find_call_site("that.router = 1", "router").is_err());
    }

    #[test]
    fn test_strings_do_not_end_statement() {
        let source = "this.router = make(\"a;b\", ')')\nnext()\n";
        let span = find_call_site(source, "this.router").unwrap();
        assert_eq!(&source[span.statement], "this.router = make(\"a;b\", ')')");
    }

    #[test]
    fn test_template_round_trip() {
        let ts = template("this.router", Flavor::TypeScript);
        assert!(ts.starts_with(GENERATED_HEADER));
        assert!(ts.contains("  router: unknown\n"));
        let out = splice(&ts, &prepared(), Flavor::TypeScript).unwrap();
        assert!(out.contains(
            "    this.router = new PreparedMatcher(routerParams) as unknown as typeof this.router\n  }"
        ));

        let js = template("app.matcher", Flavor::JavaScript);
        assert_eq!(js, format!("{GENERATED_HEADER}\n\napp.matcher = undefined\n"));
    }

    #[tokio::test]
    async fn test_write_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.ts");
        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");
        assert!(!dir.path().join("nested/.out.ts.tmp").exists());
    }
}
