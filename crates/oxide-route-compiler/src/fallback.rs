//! Prefix-tree fallback matcher.
//!
//! Used whenever the combined form is unsafe or unavailable. Routes are
//! inserted one by one with no combination; lookup explores static
//! children before dynamic ones and picks the earliest-registered route
//! among every candidate that satisfies its own constraints.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::classify::FallbackKind;
use crate::error::{CompileError, Result};
use crate::matcher::{Matcher, RouteMatch};
use crate::method::Method;
use crate::pattern::{split_path, Pattern, Segment};
use crate::registry::{Registry, Route};

/// A compiled capture constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Parameter name as registered.
    pub name: String,
    /// Constraint source text.
    pub source: String,
    regex: Regex,
}

impl Constraint {
    fn new(pattern: &str, name: &str, source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            CompileError::invalid_pattern(pattern, format!("constraint does not compile: {e}"))
        })?;
        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            regex,
        })
    }

    fn accepts(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// A route stored at a terminal node.
#[derive(Debug, Clone)]
struct Entry {
    method: Method,
    route: usize,
    chain: Vec<usize>,
    /// Binds parameters once the tree has reached this entry.
    pattern: Pattern,
}

impl Entry {
    fn to_match(&self, method: Method, path: &str) -> Option<RouteMatch> {
        if !self.method.accepts(method) {
            return None;
        }
        let params = self.pattern.match_path(path)?;
        Some(RouteMatch {
            route: self.route,
            chain: self.chain.clone(),
            params,
        })
    }
}

/// The single constrained-capture slot of a node.
#[derive(Debug, Default)]
struct ConstrainedSlot {
    /// Every `(name, constraint)` registered at this position.
    constraints: Vec<Constraint>,
    node: Node,
}

#[derive(Debug, Default)]
struct Node {
    statics: BTreeMap<String, Node>,
    capture: Option<Box<Node>>,
    constrained: Option<Box<ConstrainedSlot>>,
    /// Routes ending in a wildcard at this position.
    wildcard: Vec<Entry>,
    /// Routes ending exactly here.
    entries: Vec<Entry>,
}

impl Node {
    fn count(&self) -> usize {
        1 + self.statics.values().map(Self::count).sum::<usize>()
            + self.capture.as_ref().map_or(0, |n| n.count())
            + self.constrained.as_ref().map_or(0, |s| s.node.count())
    }

    fn collect(
        &self,
        method: Method,
        path: &str,
        segments: &[&str],
        best: &mut Option<RouteMatch>,
    ) {
        if segments.is_empty() {
            offer(&self.entries, method, path, best);
        }
        offer(&self.wildcard, method, path, best);

        let Some((head, rest)) = segments.split_first() else {
            return;
        };

        if let Some(child) = self.statics.get(*head) {
            child.collect(method, path, rest, best);
        }

        if let Some(child) = &self.capture {
            if !head.is_empty() {
                child.collect(method, path, rest, best);
            }
        }

        if let Some(slot) = &self.constrained {
            // A constraint may span several segments, e.g. `:path{.+}`.
            for taken in 1..=segments.len() {
                let value = segments[..taken].join("/");
                if slot.constraints.iter().any(|c| c.accepts(&value)) {
                    slot.node.collect(method, path, &segments[taken..], best);
                }
            }
        }
    }
}

fn offer(entries: &[Entry], method: Method, path: &str, best: &mut Option<RouteMatch>) {
    for entry in entries {
        if best.as_ref().is_some_and(|b| b.route <= entry.route) {
            continue;
        }
        if let Some(found) = entry.to_match(method, path) {
            *best = Some(found);
        }
    }
}

/// General structural matcher built by plain incremental insertion.
#[derive(Debug)]
pub struct FallbackMatcher {
    root: Node,
    kind: FallbackKind,
    routes: usize,
}

impl FallbackMatcher {
    /// Why this matcher was chosen.
    #[must_use]
    pub const fn kind(&self) -> FallbackKind {
        self.kind
    }

    /// Number of routes inserted.
    #[must_use]
    pub const fn route_count(&self) -> usize {
        self.routes
    }

    /// Number of tree nodes, the root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    fn insert(&mut self, index: usize, route: &Route) -> Result<()> {
        let source = route.pattern.to_string();
        let mut node = &mut self.root;
        let entry = Entry {
            method: route.method,
            route: index,
            chain: route.chain.flatten(),
            pattern: route.pattern.clone(),
        };

        for segment in route.pattern.segments() {
            match segment {
                Segment::Static(text) => {
                    node = node.statics.entry(text.clone()).or_default();
                }
                Segment::Capture(_) => {
                    node = &mut **node.capture.get_or_insert_with(Box::default);
                }
                Segment::ConstrainedCapture { name, constraint } => {
                    let constraint = Constraint::new(&source, name, constraint)?;
                    let slot = node.constrained.get_or_insert_with(Box::default);
                    if !slot
                        .constraints
                        .iter()
                        .any(|c| c.name == constraint.name && c.source == constraint.source)
                    {
                        slot.constraints.push(constraint);
                    }
                    node = &mut slot.node;
                }
                Segment::Wildcard => {
                    node.wildcard.push(entry);
                    return Ok(());
                }
            }
        }

        node.entries.push(entry);
        Ok(())
    }
}

impl Matcher for FallbackMatcher {
    fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let segments = split_path(path)?;
        let mut best = None;
        self.root.collect(method, path, &segments, &mut best);
        best
    }
}

/// Builds the prefix tree for a registry.
///
/// # Errors
///
/// Returns [`CompileError::InvalidPattern`] if a constraint fails to
/// compile, which parsing normally rules out.
pub fn build(registry: &Registry, kind: FallbackKind) -> Result<FallbackMatcher> {
    let mut matcher = FallbackMatcher {
        root: Node::default(),
        kind,
        routes: 0,
    };
    for (index, route) in registry.routes().iter().enumerate() {
        matcher.insert(index, route)?;
        matcher.routes += 1;
    }
    debug!(
        routes = matcher.routes,
        nodes = matcher.node_count(),
        "Built fallback tree"
    );
    Ok(matcher)
}
