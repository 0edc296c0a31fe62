//! HTTP methods a route can be registered under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP request methods.
///
/// The declaration order is the order method groups appear in a compiled
/// matcher, so output never depends on which method was declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    /// GET method
    Get,
    /// HEAD method
    Head,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// DELETE method
    Delete,
    /// CONNECT method
    Connect,
    /// OPTIONS method
    Options,
    /// TRACE method
    Trace,
    /// PATCH method
    Patch,
    /// Matches every method.
    All,
}

impl Method {
    /// Every concrete method, excluding `All`.
    pub const STANDARD: [Self; 9] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Connect,
        Self::Options,
        Self::Trace,
        Self::Patch,
    ];

    /// Returns the method as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::All => "ALL",
        }
    }

    /// Returns `true` when a route registered under `self` serves a
    /// request made with `request`.
    #[must_use]
    pub fn accepts(self, request: Self) -> bool {
        self == Self::All || self == request
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "CONNECT" => Ok(Self::Connect),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            "PATCH" => Ok(Self::Patch),
            "ALL" => Ok(Self::All),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!("Patch".parse::<Method>(), Ok(Method::Patch));
        assert_eq!("ALL".parse::<Method>(), Ok(Method::All));
        assert!("FETCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_all_accepts_every_method() {
        for method in Method::STANDARD {
            assert!(Method::All.accepts(method));
        }
        assert!(Method::Get.accepts(Method::Get));
        assert!(!Method::Get.accepts(Method::Post));
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Method::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        let method: Method = serde_json::from_str("\"options\"").unwrap();
        assert_eq!(method, Method::Options);
    }
}
