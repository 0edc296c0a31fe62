//! Strategy classification.
//!
//! Decides whether a whole registry can be compiled into combined
//! expressions. The decision is global: one ineligible route sends every
//! route to the fallback matcher, since the two shapes cannot share one
//! artifact without re-adding the dispatch work the combined form saves.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use tracing::{info, warn};

use crate::error::{CompileError, Result};
use crate::options::CompilerOptions;
use crate::pattern::{Pattern, Segment};
use crate::registry::Registry;
use crate::version::RuntimeVersion;

/// The matcher shape chosen for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Merged regular expressions with index tables.
    Combined,
    /// General structural matcher.
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Combined => f.write_str("combined"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Why the fallback strategy was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackKind {
    /// At least one pattern cannot be combined; use the prefix tree.
    Structural,
    /// Every pattern could be combined, but the runtime cannot load a
    /// prepared literal. The runtime may still combine at start-up.
    RuntimeCombined,
}

/// Outcome of [`classify`].
#[derive(Debug)]
pub struct Classification {
    /// The chosen strategy.
    pub strategy: Strategy,
    /// Set when `strategy` is [`Strategy::Fallback`].
    pub fallback: Option<FallbackKind>,
    /// Every reason that forced the fallback, in discovery order.
    pub downgrades: Vec<CompileError>,
}

impl Classification {
    /// Returns true for the combined strategy.
    #[must_use]
    pub fn is_combined(&self) -> bool {
        self.strategy == Strategy::Combined
    }
}

/// Classifies a registry for the given runtime.
#[must_use]
pub fn classify(
    registry: &Registry,
    runtime: &RuntimeVersion,
    options: &CompilerOptions,
) -> Classification {
    let mut downgrades = Vec::new();

    for (index, route) in registry.routes().iter().enumerate() {
        if let Err(err) = check_pattern(&route.pattern) {
            warn!(
                route = index,
                pattern = %route.pattern,
                reason = %err,
                "Route requires the fallback matcher"
            );
            downgrades.push(err);
        }
    }
    let structural = !downgrades.is_empty();

    if let Err(err) = check_runtime(runtime, &options.minimum_runtime) {
        warn!(reason = %err, "Runtime cannot load prepared matchers");
        downgrades.push(err);
    }

    let (strategy, fallback) = if downgrades.is_empty() {
        (Strategy::Combined, None)
    } else if structural {
        (Strategy::Fallback, Some(FallbackKind::Structural))
    } else {
        (Strategy::Fallback, Some(FallbackKind::RuntimeCombined))
    };

    info!(
        strategy = %strategy,
        routes = registry.len(),
        downgrades = downgrades.len(),
        "Classified route table"
    );

    Classification {
        strategy,
        fallback,
        downgrades,
    }
}

/// Checks that a pattern can take part in a combined expression.
///
/// # Errors
///
/// Returns [`CompileError::AmbiguousGroup`] when a constraint contains
/// top-level alternation or its own capturing groups, and
/// [`CompileError::UnsupportedSegment`] when a wildcard is combined with
/// other dynamic segments.
pub fn check_pattern(pattern: &Pattern) -> Result<()> {
    let source = pattern.to_string();

    for segment in pattern.segments() {
        if let Segment::ConstrainedCapture { constraint, .. } = segment {
            scan_constraint(constraint)
                .map_err(|reason| CompileError::ambiguous_group(&source, reason))?;
        }
    }

    let has_wildcard = pattern.segments().contains(&Segment::Wildcard);
    if has_wildcard && pattern.capture_count() > 0 {
        return Err(CompileError::UnsupportedSegment {
            pattern: source,
            reason: "a wildcard must be the only dynamic segment".to_string(),
        });
    }

    let extra = pattern.group_count() - pattern.capture_count();
    if extra > 0 {
        return Err(CompileError::ambiguous_group(
            &source,
            format!("constraints add {extra} capture group(s)"),
        ));
    }
    Ok(())
}

/// Checks that the runtime can load prepared literals.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedRuntime`] when `runtime` is older
/// than `minimum`.
pub fn check_runtime(runtime: &RuntimeVersion, minimum: &RuntimeVersion) -> Result<()> {
    if runtime.supports(minimum) {
        Ok(())
    } else {
        Err(CompileError::UnsupportedRuntime {
            found: runtime.to_string(),
            minimum: minimum.to_string(),
        })
    }
}

/// Scans constraint syntax for constructs that shift group numbering.
fn scan_constraint(constraint: &str) -> std::result::Result<(), String> {
    let mut chars = constraint.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => skip_class(&mut chars),
            '(' => {
                if chars.peek() != Some(&'?') {
                    return Err("nested capturing group".to_string());
                }
                chars.next();
                if matches!(chars.peek(), Some('P' | '<')) {
                    return Err("nested named capturing group".to_string());
                }
                depth += 1;
            }
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => return Err("top-level alternation".to_string()),
            _ => {}
        }
    }
    Ok(())
}

/// Skips a bracketed class, the opening `[` already consumed.
fn skip_class(chars: &mut Peekable<Chars<'_>>) {
    if chars.peek() == Some(&'^') {
        chars.next();
    }
    // A leading `]` is a literal member.
    if chars.peek() == Some(&']') {
        chars.next();
    }
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => skip_class(chars),
            ']' => return,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::pattern::parse_pattern;
    use crate::registry::{HandlerChain, RouteRegistry};

    fn registry(paths: &[&str]) -> Registry {
        let mut registry = RouteRegistry::new();
        for (i, path) in paths.iter().enumerate() {
            registry
                .register(Method::Get, path, HandlerChain::new(i))
                .unwrap();
        }
        registry.finalize().unwrap()
    }

    fn eligible(path: &str) -> bool {
        check_pattern(&parse_pattern(path).unwrap()).is_ok()
    }

    #[test]
    fn test_eligible_patterns() {
        assert!(eligible("/"));
        assert!(eligible("/users/:id"));
        assert!(eligible("/users/:id{[0-9]+}"));
        assert!(eligible("/x/:v{(?:a|b)c}"));
        assert!(eligible("/x/:v{(?i)abc}"));
        assert!(eligible("/x/:v{[(|)]+}"));
        assert!(eligible(r"/x/:v{\(a\|b\)}"));
        assert!(eligible("/x/:v{[[:alpha:]|]+}"));
        assert!(eligible("/static/*"));
        assert!(eligible("/a/b/*"));
    }

    #[test]
    fn test_ineligible_patterns() {
        assert!(!eligible("/foo/:capture{ba(r|z)}"));
        assert!(!eligible("/foo/:v{a|b}"));
        assert!(!eligible("/foo/:v{(?P<inner>a)}"));
        assert!(!eligible("/foo/:v{(?<inner>a)}"));
        assert!(!eligible("/users/:id/*"));
        assert!(!eligible("/users/:id{[0-9]+}/*"));
    }

    #[test]
    fn test_alternation_reason() {
        let err = check_pattern(&parse_pattern("/foo/:v{a|b}").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::AmbiguousGroup { ref reason, .. } if reason.contains("alternation")
        ));
    }

    #[test]
    fn test_single_root_is_combined() {
        let classification = classify(
            &registry(&["/"]),
            &RuntimeVersion::current(),
            &CompilerOptions::default(),
        );
        assert_eq!(classification.strategy, Strategy::Combined);
        assert!(classification.downgrades.is_empty());
        assert_eq!(classification.fallback, None);
    }

    #[test]
    fn test_one_bad_route_forces_fallback() {
        let classification = classify(
            &registry(&["/", "/users/:id", "/foo/:capture{ba(r|z)}"]),
            &RuntimeVersion::current(),
            &CompilerOptions::default(),
        );
        assert_eq!(classification.strategy, Strategy::Fallback);
        assert_eq!(classification.fallback, Some(FallbackKind::Structural));
        assert_eq!(classification.downgrades.len(), 1);
        assert!(classification.downgrades[0].is_downgrade());
    }

    #[test]
    fn test_nested_alternation_is_fallback_regardless_of_runtime() {
        for runtime in [RuntimeVersion::new(0, 0, 1), RuntimeVersion::new(9, 0, 0)] {
            let classification = classify(
                &registry(&["/foo/:capture{ba(r|z)}"]),
                &runtime,
                &CompilerOptions::default(),
            );
            assert_eq!(classification.strategy, Strategy::Fallback);
            assert_eq!(classification.fallback, Some(FallbackKind::Structural));
        }
    }

    #[test]
    fn test_old_runtime_forces_fallback() {
        let options =
            CompilerOptions::default().with_minimum_runtime(RuntimeVersion::new(4, 9, 11));
        let classification = classify(
            &registry(&["/"]),
            &RuntimeVersion::new(4, 9, 10),
            &options,
        );
        assert_eq!(classification.strategy, Strategy::Fallback);
        assert_eq!(classification.fallback, Some(FallbackKind::RuntimeCombined));
        assert!(matches!(
            classification.downgrades[0],
            CompileError::UnsupportedRuntime { .. }
        ));
    }

    #[test]
    fn test_empty_registry_is_combined() {
        let classification = classify(
            &Registry::default(),
            &RuntimeVersion::current(),
            &CompilerOptions::default(),
        );
        assert!(classification.is_combined());
    }
}
