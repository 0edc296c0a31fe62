//! Combined-expression builder.
//!
//! Routes of one method are merged into alternations of the form
//! `^(?:<route-a>$()|<route-b>$())`. Every alternative ends in an empty
//! marker group; the marker that participates in a match identifies the
//! route, and the capture groups preceding it within the same
//! alternative carry its parameters. Group numbers come from a single
//! counter per expression, so they are unique and stable.
//!
//! The output is the literal-ready state consumed by the serializer and
//! by [`PreparedMatcher`](crate::runtime::PreparedMatcher).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, Result};
use crate::method::Method;
use crate::options::CompilerOptions;
use crate::pattern::SegmentKind;
use crate::registry::{Registry, Route};

/// Binds a capture group to a parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBinding {
    /// Capture group index within the expression.
    pub group: usize,
    /// Parameter name.
    pub name: String,
}

/// Binds an alternative's marker group to the route it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerBinding {
    /// Marker group index within the expression.
    pub group: usize,
    /// Registration index of the route.
    pub route: usize,
    /// Middleware followed by the handler.
    pub chain: Vec<usize>,
}

/// One merged regular expression with its index tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedExpression {
    /// Anchored expression text.
    pub source: String,
    /// Parameter bindings, in ascending group order.
    pub params: Vec<ParamBinding>,
    /// Route bindings, in registration order.
    pub handlers: Vec<HandlerBinding>,
}

impl CombinedExpression {
    /// Number of capture groups, markers included.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.params.len() + self.handlers.len()
    }

    /// Registration index of the earliest route in this expression.
    #[must_use]
    pub fn first_route(&self) -> Option<usize> {
        self.handlers.first().map(|h| h.route)
    }
}

/// A fully static path resolved without running any expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEntry {
    /// Registration index of the route.
    pub route: usize,
    /// Middleware followed by the handler.
    pub chain: Vec<usize>,
}

/// Everything needed to match requests of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodGroup {
    /// Expressions ordered by the registration index of their first route.
    pub expressions: Vec<CombinedExpression>,
    /// Static paths no earlier route can intercept.
    pub statics: BTreeMap<String, StaticEntry>,
}

/// Combined matcher for a whole registry.
///
/// Holds one group per method used by the registry. `ALL` routes are
/// replicated into every other group and also form a group of their own,
/// used for methods that have no group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedMatcher {
    /// Groups keyed by method.
    pub methods: BTreeMap<Method, MethodGroup>,
}

impl CombinedMatcher {
    /// Total number of combined expressions.
    #[must_use]
    pub fn expression_count(&self) -> usize {
        self.methods.values().map(|g| g.expressions.len()).sum()
    }

    /// Returns true when the matcher matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Builds the combined matcher for a registry classified as combined.
///
/// # Errors
///
/// Returns [`CompileError::AmbiguousGroup`] if a built expression does
/// not have the group count its tables assume, and
/// [`CompileError::Regex`] if it does not compile.
pub fn build(registry: &Registry, options: &CompilerOptions) -> Result<CombinedMatcher> {
    let used: BTreeSet<Method> = registry.routes().iter().map(|r| r.method).collect();

    let mut methods = BTreeMap::new();
    for method in used {
        let members: Vec<(usize, &Route)> = registry
            .routes()
            .iter()
            .enumerate()
            .filter(|(_, route)| route.method == method || route.method == Method::All)
            .collect();
        let group = build_group(&members, options.max_groups_per_expression)?;
        debug!(
            method = %method,
            routes = members.len(),
            expressions = group.expressions.len(),
            statics = group.statics.len(),
            "Built method group"
        );
        methods.insert(method, group);
    }

    Ok(CombinedMatcher { methods })
}

/// An expression under construction.
struct Draft {
    alternatives: Vec<String>,
    params: Vec<ParamBinding>,
    handlers: Vec<HandlerBinding>,
    groups: usize,
}

impl Draft {
    const fn new() -> Self {
        Self {
            alternatives: Vec::new(),
            params: Vec::new(),
            handlers: Vec::new(),
            groups: 0,
        }
    }

    fn push(&mut self, index: usize, route: &Route) {
        let mut alternative = String::new();
        for segment in route.pattern.segments() {
            alternative.push_str(&segment.expression());
            if let Some(name) = segment.param_name() {
                self.groups += 1;
                self.params.push(ParamBinding {
                    group: self.groups,
                    name: name.to_string(),
                });
            }
        }
        alternative.push_str("$()");
        self.groups += 1;
        self.handlers.push(HandlerBinding {
            group: self.groups,
            route: index,
            chain: route.chain.flatten(),
        });
        self.alternatives.push(alternative);
    }

    fn finish(self) -> Result<CombinedExpression> {
        let source = format!("^(?:{})", self.alternatives.join("|"));
        let compiled = Regex::new(&source)?;
        if compiled.captures_len() - 1 != self.groups {
            return Err(CompileError::ambiguous_group(
                &source,
                format!(
                    "expected {} capture groups, found {}",
                    self.groups,
                    compiled.captures_len() - 1
                ),
            ));
        }
        Ok(CombinedExpression {
            source,
            params: self.params,
            handlers: self.handlers,
        })
    }
}

fn build_group(members: &[(usize, &Route)], limit: usize) -> Result<MethodGroup> {
    // Drafts are created in member order, so they are already sorted by
    // the registration index of their first route.
    let mut drafts: Vec<Draft> = Vec::new();
    let mut open: HashMap<Vec<SegmentKind>, usize> = HashMap::new();

    for &(index, route) in members {
        let needed = route.pattern.capture_count() + 1;
        let shape = route.pattern.shape();
        let slot = match open.get(&shape) {
            Some(&slot) if drafts[slot].groups + needed <= limit => slot,
            _ => {
                drafts.push(Draft::new());
                open.insert(shape, drafts.len() - 1);
                drafts.len() - 1
            }
        };
        drafts[slot].push(index, route);
    }

    let expressions = drafts
        .into_iter()
        .map(Draft::finish)
        .collect::<Result<Vec<_>>>()?;

    Ok(MethodGroup {
        expressions,
        statics: static_entries(members),
    })
}

fn static_entries(members: &[(usize, &Route)]) -> BTreeMap<String, StaticEntry> {
    let mut statics = BTreeMap::new();
    for (position, &(index, route)) in members.iter().enumerate() {
        let Some(path) = route.pattern.static_path() else {
            continue;
        };
        if statics.contains_key(&path) {
            continue;
        }
        let shadowed = members[..position]
            .iter()
            .any(|(_, earlier)| earlier.pattern.match_path(&path).is_some());
        if !shadowed {
            statics.insert(
                path,
                StaticEntry {
                    route: index,
                    chain: route.chain.flatten(),
                },
            );
        }
    }
    statics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HandlerChain, RouteRegistry};

    fn registry(routes: &[(Method, &str)]) -> Registry {
        let mut registry = RouteRegistry::new();
        for (i, (method, path)) in routes.iter().enumerate() {
            registry
                .register(*method, path, HandlerChain::new(i))
                .unwrap();
        }
        registry.finalize().unwrap()
    }

    #[test]
    fn test_empty_registry_has_no_groups() {
        let matcher = build(&Registry::default(), &CompilerOptions::default()).unwrap();
        assert!(matcher.is_empty());
        assert_eq!(matcher.expression_count(), 0);
    }

    #[test]
    fn test_root_expression() {
        let matcher = build(&registry(&[(Method::Get, "/")]), &CompilerOptions::default()).unwrap();
        let group = &matcher.methods[&Method::Get];
        assert_eq!(group.expressions.len(), 1);

        let expression = &group.expressions[0];
        assert_eq!(expression.source, "^(?:/$())");
        assert!(expression.params.is_empty());
        assert_eq!(
            expression.handlers,
            vec![HandlerBinding {
                group: 1,
                route: 0,
                chain: vec![0],
            }]
        );
        assert_eq!(group.statics["/"].route, 0);
    }

    #[test]
    fn test_same_shape_shares_expression() {
        let matcher = build(
            &registry(&[(Method::Get, "/app1"), (Method::Get, "/app2")]),
            &CompilerOptions::default(),
        )
        .unwrap();
        let group = &matcher.methods[&Method::Get];
        assert_eq!(group.expressions.len(), 1);
        let handlers = &group.expressions[0].handlers;
        assert_eq!(handlers[0].group, 1);
        assert_eq!(handlers[0].chain, vec![0]);
        assert_eq!(handlers[1].group, 2);
        assert_eq!(handlers[1].chain, vec![1]);
    }

    #[test]
    fn test_group_indices_increase_across_alternatives() {
        let matcher = build(
            &registry(&[(Method::Get, "/users/:id"), (Method::Get, "/posts/:slug")]),
            &CompilerOptions::default(),
        )
        .unwrap();
        let expression = &matcher.methods[&Method::Get].expressions[0];
        assert_eq!(
            expression.source,
            "^(?:/users/([^/]+)$()|/posts/([^/]+)$())"
        );
        let params: Vec<(usize, &str)> = expression
            .params
            .iter()
            .map(|p| (p.group, p.name.as_str()))
            .collect();
        assert_eq!(params, vec![(1, "id"), (3, "slug")]);
        let markers: Vec<usize> = expression.handlers.iter().map(|h| h.group).collect();
        assert_eq!(markers, vec![2, 4]);
    }

    #[test]
    fn test_shape_families_ordered_by_first_registration() {
        let matcher = build(
            &registry(&[
                (Method::Get, "/users/:id"),
                (Method::Get, "/about"),
                (Method::Get, "/posts/:id"),
            ]),
            &CompilerOptions::default(),
        )
        .unwrap();
        let group = &matcher.methods[&Method::Get];
        let firsts: Vec<Option<usize>> = group
            .expressions
            .iter()
            .map(CombinedExpression::first_route)
            .collect();
        assert_eq!(firsts, vec![Some(0), Some(1)]);
        assert_eq!(group.expressions[0].handlers.len(), 2);
    }

    #[test]
    fn test_group_limit_starts_new_expression() {
        let options = CompilerOptions::default().with_group_limit(4);
        let matcher = build(
            &registry(&[
                (Method::Get, "/a/:x"),
                (Method::Get, "/b/:x"),
                (Method::Get, "/c/:x"),
            ]),
            &options,
        )
        .unwrap();
        let group = &matcher.methods[&Method::Get];
        assert_eq!(group.expressions.len(), 2);
        assert!(group.expressions.iter().all(|e| e.group_count() <= 4));
        assert_eq!(group.expressions[1].first_route(), Some(2));
    }

    #[test]
    fn test_all_routes_are_replicated() {
        let matcher = build(
            &registry(&[
                (Method::Get, "/a"),
                (Method::All, "/b"),
                (Method::Post, "/c"),
            ]),
            &CompilerOptions::default(),
        )
        .unwrap();
        let methods: Vec<Method> = matcher.methods.keys().copied().collect();
        assert_eq!(methods, vec![Method::Get, Method::Post, Method::All]);

        let get_routes: Vec<usize> = matcher.methods[&Method::Get].expressions[0]
            .handlers
            .iter()
            .map(|h| h.route)
            .collect();
        assert_eq!(get_routes, vec![0, 1]);
        let post_routes: Vec<usize> = matcher.methods[&Method::Post].expressions[0]
            .handlers
            .iter()
            .map(|h| h.route)
            .collect();
        assert_eq!(post_routes, vec![1, 2]);
        assert_eq!(matcher.methods[&Method::All].expressions[0].handlers.len(), 1);
    }

    #[test]
    fn test_duplicates_keep_distinct_slots() {
        let matcher = build(
            &registry(&[(Method::Get, "/same"), (Method::Get, "/same")]),
            &CompilerOptions::default(),
        )
        .unwrap();
        let group = &matcher.methods[&Method::Get];
        assert_eq!(group.expressions[0].handlers.len(), 2);
        assert_eq!(group.statics["/same"].route, 0);
    }

    #[test]
    fn test_shadowed_static_is_not_in_static_map() {
        let matcher = build(
            &registry(&[(Method::Get, "/users/:id"), (Method::Get, "/users/me")]),
            &CompilerOptions::default(),
        )
        .unwrap();
        assert!(matcher.methods[&Method::Get].statics.is_empty());
    }
}
