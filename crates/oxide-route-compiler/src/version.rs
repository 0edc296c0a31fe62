//! Matching runtime versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// First runtime version that can load prepared literals.
pub const PREPARED_FORM_VERSION: RuntimeVersion = RuntimeVersion::new(0, 1, 0);

/// A `major.minor.patch` runtime version.
///
/// A leading `v` is accepted, and pre-release or build suffixes are
/// ignored for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuntimeVersion {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
}

impl RuntimeVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version of the runtime shipped with this crate.
    #[must_use]
    pub fn current() -> Self {
        env!("CARGO_PKG_VERSION")
            .parse()
            .unwrap_or(PREPARED_FORM_VERSION)
    }

    /// Returns true when this version exposes the prepared form.
    #[must_use]
    pub fn supports(&self, minimum: &Self) -> bool {
        self >= minimum
    }
}

impl Default for RuntimeVersion {
    fn default() -> Self {
        PREPARED_FORM_VERSION
    }
}

impl FromStr for RuntimeVersion {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed
            .split(|c| c == '-' || c == '+')
            .next()
            .unwrap_or_default();

        let mut parts = core.split('.');
        let mut next = || -> Result<u64, CompileError> {
            parts
                .next()
                .ok_or_else(|| CompileError::InvalidVersion(s.to_string()))?
                .parse()
                .map_err(|_| CompileError::InvalidVersion(s.to_string()))
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(CompileError::InvalidVersion(s.to_string()));
        }
        Ok(version)
    }
}

impl TryFrom<String> for RuntimeVersion {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuntimeVersion> for String {
    fn from(version: RuntimeVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "4.9.11".parse::<RuntimeVersion>().unwrap(),
            RuntimeVersion::new(4, 9, 11)
        );
        assert_eq!(
            "v1.2.3-beta.1+build".parse::<RuntimeVersion>().unwrap(),
            RuntimeVersion::new(1, 2, 3)
        );
        assert!("1.2".parse::<RuntimeVersion>().is_err());
        assert!("1.2.3.4".parse::<RuntimeVersion>().is_err());
        assert!("one.two.three".parse::<RuntimeVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        let minimum = RuntimeVersion::new(4, 9, 11);
        assert!(RuntimeVersion::new(4, 9, 11).supports(&minimum));
        assert!(RuntimeVersion::new(4, 10, 0).supports(&minimum));
        assert!(!RuntimeVersion::new(4, 9, 10).supports(&minimum));
        assert!(!RuntimeVersion::new(3, 99, 99).supports(&minimum));
    }

    #[test]
    fn test_current_supports_prepared_form() {
        assert!(RuntimeVersion::current().supports(&PREPARED_FORM_VERSION));
    }
}
