//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::version::{RuntimeVersion, PREPARED_FORM_VERSION};

/// Default upper bound on capture groups in one combined expression.
pub const DEFAULT_GROUP_LIMIT: usize = 255;

/// Default assignment target replaced by the artifact writer.
pub const DEFAULT_CALL_SITE: &str = "this.router";

/// Options controlling classification, building and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Maximum capture groups per combined expression.
    pub max_groups_per_expression: usize,
    /// Oldest runtime able to load prepared literals.
    pub minimum_runtime: RuntimeVersion,
    /// Assignment target of the matcher construction call.
    pub call_site: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_groups_per_expression: DEFAULT_GROUP_LIMIT,
            minimum_runtime: PREPARED_FORM_VERSION,
            call_site: DEFAULT_CALL_SITE.to_string(),
        }
    }
}

impl CompilerOptions {
    /// Sets the group limit. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_group_limit(mut self, limit: usize) -> Self {
        self.max_groups_per_expression = limit.max(1);
        self
    }

    /// Sets the minimum runtime version.
    #[must_use]
    pub const fn with_minimum_runtime(mut self, version: RuntimeVersion) -> Self {
        self.minimum_runtime = version;
        self
    }

    /// Sets the call site target.
    #[must_use]
    pub fn with_call_site(mut self, target: impl Into<String>) -> Self {
        self.call_site = target.into();
        self
    }
}
