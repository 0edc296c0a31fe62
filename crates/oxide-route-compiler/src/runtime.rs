//! Loading and matching prepared literals.
//!
//! Rehydration compiles each combined expression once and keeps the index
//! tables as they are, so start-up cost grows with the literal's size and
//! not with the number of routes originally registered.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::classify::check_runtime;
use crate::combined::{CombinedExpression, CombinedMatcher, StaticEntry};
use crate::error::Result;
use crate::matcher::{Matcher, Params, RouteMatch};
use crate::method::Method;
use crate::serialize::PreparedLiteral;
use crate::version::RuntimeVersion;

#[derive(Debug)]
struct PreparedExpression {
    regex: Regex,
    table: CombinedExpression,
}

#[derive(Debug)]
struct PreparedGroup {
    expressions: Vec<PreparedExpression>,
    statics: HashMap<String, StaticEntry>,
}

/// A combined matcher ready to serve lookups.
#[derive(Debug)]
pub struct PreparedMatcher {
    methods: BTreeMap<Method, PreparedGroup>,
}

impl PreparedMatcher {
    /// Prepares a freshly built combined matcher.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Regex`](crate::CompileError::Regex) if an
    /// expression does not compile.
    pub fn new(matcher: &CombinedMatcher) -> Result<Self> {
        let mut methods = BTreeMap::new();
        for (method, group) in &matcher.methods {
            let expressions = group
                .expressions
                .iter()
                .map(|table| -> Result<PreparedExpression> {
                    Ok(PreparedExpression {
                        regex: Regex::new(&table.source)?,
                        table: table.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let statics = group
                .statics
                .iter()
                .map(|(path, entry)| (path.clone(), entry.clone()))
                .collect();
            methods.insert(
                *method,
                PreparedGroup {
                    expressions,
                    statics,
                },
            );
        }
        Ok(Self { methods })
    }

    /// Rehydrates a serialized prepared literal.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Literal`](crate::CompileError::Literal)
    /// for malformed text,
    /// [`CompileError::UnsupportedRuntime`](crate::CompileError::UnsupportedRuntime)
    /// when the literal needs a newer runtime than this one, and
    /// [`CompileError::Regex`](crate::CompileError::Regex) for an
    /// expression that does not compile.
    pub fn from_literal(literal: &str) -> Result<Self> {
        let literal: PreparedLiteral = serde_json::from_str(literal)?;
        check_runtime(&RuntimeVersion::current(), &literal.runtime)?;
        Self::new(&CombinedMatcher {
            methods: literal.methods,
        })
    }
}

impl Matcher for PreparedMatcher {
    fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let group = self
            .methods
            .get(&method)
            .or_else(|| self.methods.get(&Method::All))?;

        if let Some(entry) = group.statics.get(path) {
            return Some(RouteMatch {
                route: entry.route,
                chain: entry.chain.clone(),
                params: Params::new(),
            });
        }

        let mut best: Option<RouteMatch> = None;
        for expression in &group.expressions {
            // Expressions are sorted by their earliest route; once that
            // exceeds the best match nothing later can win.
            if let (Some(found), Some(first)) = (&best, expression.table.first_route()) {
                if first > found.route {
                    break;
                }
            }
            let Some(caps) = expression.regex.captures(path) else {
                continue;
            };
            let Some(binding) = expression
                .table
                .handlers
                .iter()
                .find(|h| caps.get(h.group).is_some())
            else {
                continue;
            };
            if best.as_ref().is_some_and(|b| b.route <= binding.route) {
                continue;
            }

            let mut params = Params::new();
            for param in &expression.table.params {
                if let Some(value) = caps.get(param.group) {
                    params.insert(param.name.clone(), value.as_str());
                }
            }
            best = Some(RouteMatch {
                route: binding.route,
                chain: binding.chain.clone(),
                params,
            });
        }
        best
    }
}
