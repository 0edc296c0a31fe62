//! Path pattern parsing.

use std::fmt;

use regex::Regex;

use crate::error::{CompileError, Result};
use crate::matcher::Params;

/// Sub-expression for one unconstrained capture, slash included.
const CAPTURE_EXPR: &str = "/([^/]+)";

/// Sub-expression for a trailing wildcard. Matches the bare prefix too.
const WILDCARD_EXPR: &str = "(?:|/.*)";

/// One atom of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text, compared byte-for-byte.
    Static(String),
    /// `:name`, matches one non-empty segment.
    Capture(String),
    /// `:name{regex}`, matches text accepted by the constraint.
    ConstrainedCapture {
        /// Parameter name.
        name: String,
        /// Constraint regex source, without braces.
        constraint: String,
    },
    /// `*`, matches the rest of the path.
    Wildcard,
}

/// The kind of a segment, used to group patterns of the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    /// See [`Segment::Static`].
    Static,
    /// See [`Segment::Capture`].
    Capture,
    /// See [`Segment::ConstrainedCapture`].
    Constrained,
    /// See [`Segment::Wildcard`].
    Wildcard,
}

impl Segment {
    /// Returns the kind of this segment.
    #[must_use]
    pub const fn kind(&self) -> SegmentKind {
        match self {
            Self::Static(_) => SegmentKind::Static,
            Self::Capture(_) => SegmentKind::Capture,
            Self::ConstrainedCapture { .. } => SegmentKind::Constrained,
            Self::Wildcard => SegmentKind::Wildcard,
        }
    }

    /// Returns the parameter name for capture segments.
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Self::Capture(name) | Self::ConstrainedCapture { name, .. } => Some(name),
            Self::Static(_) | Self::Wildcard => None,
        }
    }

    /// Regex sub-expression for this segment, including its leading slash.
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Self::Static(text) => format!("/{}", regex::escape(text)),
            Self::Capture(_) => CAPTURE_EXPR.to_string(),
            Self::ConstrainedCapture { constraint, .. } => format!("/({constraint})"),
            Self::Wildcard => WILDCARD_EXPR.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.write_str(text),
            Self::Capture(name) => write!(f, ":{name}"),
            Self::ConstrainedCapture { name, constraint } => write!(f, ":{name}{{{constraint}}}"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// A compiled path pattern.
///
/// Immutable once built. Two patterns are equal when their segments are;
/// the source text is kept for diagnostics only.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The original pattern string.
    source: String,
    /// Parsed segments.
    segments: Vec<Segment>,
    /// Anchored regex for matching a whole request path.
    regex: Regex,
    /// Parameter names with the capture group each one reads from.
    param_groups: Vec<(String, usize)>,
}

/// Parses a path pattern string.
///
/// Pattern syntax:
/// - `/users` - Literal path
/// - `/users/:id` - Path with parameter
/// - `/users/:id{[0-9]+}` - Parameter with a regex constraint
/// - `/files/*` - Wildcard (matches the rest of the path)
///
/// # Errors
///
/// Returns [`CompileError::InvalidPattern`] when the pattern does not
/// start with `/`, a capture brace is unterminated, a capture has no
/// name, a wildcard is not the final segment, or a constraint does not
/// compile.
///
/// # Example
///
/// ```
/// use oxide_route_compiler::parse_pattern;
///
/// let pattern = parse_pattern("/posts/:id/comments/:comment_id").unwrap();
/// let params = pattern.match_path("/posts/123/comments/456").unwrap();
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(params.get("comment_id"), Some("456"));
/// ```
pub fn parse_pattern(path: &str) -> Result<Pattern> {
    let segments = split_raw_segments(path)?
        .into_iter()
        .map(|raw| parse_segment(path, raw))
        .collect::<Result<Vec<_>>>()?;
    Pattern::build(path.to_string(), segments)
}

impl Pattern {
    /// Builds a pattern from already parsed segments.
    ///
    /// # Errors
    ///
    /// Fails like [`parse_pattern`] when the segments violate the
    /// wildcard placement rule or do not compile.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        let source = render_source(&segments);
        Self::build(source, segments)
    }

    fn build(source: String, segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(CompileError::invalid_pattern(&source, "pattern has no segments"));
        }
        let last = segments.len() - 1;
        if segments[..last].iter().any(|s| *s == Segment::Wildcard) {
            return Err(CompileError::invalid_pattern(
                &source,
                "wildcard is only allowed as the final segment",
            ));
        }

        let mut param_groups = Vec::new();
        let mut next_group = 1;
        for segment in &segments {
            match segment {
                Segment::Capture(name) => {
                    param_groups.push((name.clone(), next_group));
                    next_group += 1;
                }
                Segment::ConstrainedCapture { name, constraint } => {
                    param_groups.push((name.clone(), next_group));
                    next_group += 1 + compile_constraint(&source, constraint)?;
                }
                Segment::Static(_) | Segment::Wildcard => {}
            }
        }

        let expression: String = segments.iter().map(Segment::expression).collect();
        let regex = Regex::new(&format!("^{expression}$")).map_err(|e| {
            CompileError::invalid_pattern(&source, format!("pattern does not compile: {e}"))
        })?;

        Ok(Self {
            source,
            segments,
            regex,
            param_groups,
        })
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the parameter names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.param_groups.iter().map(|(name, _)| name.as_str())
    }

    /// Number of capture segments.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.param_groups.len()
    }

    /// Capture groups in the pattern's own regex, excluding group 0.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Kind sequence of the segments.
    #[must_use]
    pub fn shape(&self) -> Vec<SegmentKind> {
        self.segments.iter().map(Segment::kind).collect()
    }

    /// Returns the literal path when every segment is static.
    #[must_use]
    pub fn static_path(&self) -> Option<String> {
        let mut path = String::new();
        for segment in &self.segments {
            let Segment::Static(text) = segment else {
                return None;
            };
            path.push('/');
            path.push_str(text);
        }
        Some(path)
    }

    /// Unanchored regex source, the concatenation of all segment
    /// sub-expressions.
    #[must_use]
    pub fn expression(&self) -> String {
        self.segments.iter().map(Segment::expression).collect()
    }

    /// Attempts to match a whole request path against this pattern.
    ///
    /// Returns extracted parameters if the path matches.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::new();
        for (name, group) in &self.param_groups {
            if let Some(value) = caps.get(*group) {
                params.insert(name.clone(), value.as_str());
            }
        }
        Some(params)
    }

    /// Returns a new pattern with `prefix` mounted in front of this one.
    ///
    /// The root pattern `/` contributes no segments on either side, so
    /// mounting `/` under `/api` yields `/api`.
    ///
    /// # Errors
    ///
    /// Fails when the prefix ends in a wildcard.
    pub fn prefixed(&self, prefix: &Self) -> Result<Self> {
        let mut segments: Vec<Segment> = Vec::new();
        if !prefix.is_root() {
            segments.extend(prefix.segments.iter().cloned());
        }
        if !self.is_root() || segments.is_empty() {
            segments.extend(self.segments.iter().cloned());
        }
        Self::from_segments(segments)
    }

    fn is_root(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Static(text)] if text.is_empty())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_source(&self.segments))
    }
}

/// Splits a request path into segments the same way patterns are split.
///
/// Returns `None` when the path does not start with `/`.
pub(crate) fn split_path(path: &str) -> Option<Vec<&str>> {
    path.strip_prefix('/').map(|rest| rest.split('/').collect())
}

fn render_source(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    out
}

/// Splits on `/` outside of constraint braces. Braces only nest inside
/// segments that start with `:`.
fn split_raw_segments(pattern: &str) -> Result<Vec<&str>> {
    let Some(rest) = pattern.strip_prefix('/') else {
        return Err(CompileError::invalid_pattern(pattern, "pattern must start with '/'"));
    };

    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;
    let mut capture = rest.starts_with(':');
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if depth > 0 => escaped = true,
            '{' if capture => depth += 1,
            '}' if depth > 0 => depth -= 1,
            '/' if depth == 0 => {
                segments.push(&rest[start..i]);
                start = i + 1;
                capture = rest[start..].starts_with(':');
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(CompileError::invalid_pattern(pattern, "unterminated capture brace"));
    }
    segments.push(&rest[start..]);
    Ok(segments)
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment> {
    if raw == "*" {
        return Ok(Segment::Wildcard);
    }
    let Some(capture) = raw.strip_prefix(':') else {
        return Ok(Segment::Static(raw.to_string()));
    };

    let (name, constraint) = match capture.find('{') {
        Some(open) => {
            let body = &capture[open + 1..];
            let Some(constraint) = body.strip_suffix('}') else {
                return Err(CompileError::invalid_pattern(
                    pattern,
                    format!("unexpected text after constraint in segment '{raw}'"),
                ));
            };
            if constraint.is_empty() {
                return Err(CompileError::invalid_pattern(
                    pattern,
                    format!("empty constraint in segment '{raw}'"),
                ));
            }
            (&capture[..open], Some(constraint))
        }
        None => (capture, None),
    };

    if name.is_empty() {
        return Err(CompileError::invalid_pattern(
            pattern,
            "parameters must be registered with a name",
        ));
    }

    Ok(match constraint {
        Some(constraint) => Segment::ConstrainedCapture {
            name: name.to_string(),
            constraint: constraint.to_string(),
        },
        None => Segment::Capture(name.to_string()),
    })
}

/// Compiles a constraint on its own and returns how many capture groups
/// it contains. A constraint that only compiles inside a surrounding group
/// is rejected.
fn compile_constraint(pattern: &str, constraint: &str) -> Result<usize> {
    let regex = Regex::new(constraint).map_err(|e| {
        CompileError::invalid_pattern(pattern, format!("constraint does not compile: {e}"))
    })?;
    Ok(regex.captures_len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(path: &str) -> String {
        match parse_pattern(path) {
            Err(CompileError::InvalidPattern { reason, .. }) => reason,
            other => panic!("expected invalid pattern for {path}, got {other:?}"),
        }
    }

    #[test]
    fn test_segments() {
        let pattern = parse_pattern("/users/:id{[0-9]+}/files/*").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Static("users".into()),
                Segment::ConstrainedCapture {
                    name: "id".into(),
                    constraint: "[0-9]+".into(),
                },
                Segment::Static("files".into()),
                Segment::Wildcard,
            ]
        );
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let root = parse_pattern("/").unwrap();
        assert_eq!(root.segments(), &[Segment::Static(String::new())]);
        assert_eq!(root.expression(), "/");

        let trailing = parse_pattern("/foo/").unwrap();
        assert_eq!(trailing.segments().len(), 2);
        assert!(trailing.match_path("/foo/").is_some());
        assert!(trailing.match_path("/foo").is_none());
    }

    #[test]
    fn test_static_segments_are_not_merged() {
        let pattern = parse_pattern("/a/b/c").unwrap();
        assert_eq!(pattern.segments().len(), 3);
        assert_eq!(pattern.static_path().as_deref(), Some("/a/b/c"));
    }

    #[test]
    fn test_slash_inside_constraint() {
        let pattern = parse_pattern("/files/:path{.+/raw}").unwrap();
        assert_eq!(pattern.segments().len(), 2);
        let params = pattern.match_path("/files/a/b/raw").unwrap();
        assert_eq!(params.get("path"), Some("a/b/raw"));
    }

    #[test]
    fn test_quantifier_braces_nest() {
        let pattern = parse_pattern("/year/:y{[0-9]{4}}").unwrap();
        assert!(pattern.match_path("/year/2024").is_some());
        assert!(pattern.match_path("/year/24").is_none());
    }

    #[test]
    fn test_braces_in_static_segments() {
        let pattern = parse_pattern("/a{b/c}").unwrap();
        assert_eq!(
            pattern.segments(),
            &[Segment::Static("a{b".into()), Segment::Static("c}".into())]
        );
        assert!(pattern.match_path("/a{b/c}").is_some());
        assert!(parse_pattern("/a{/:id").is_ok());
    }

    #[test]
    fn test_single_param() {
        let pattern = parse_pattern("/users/:id").unwrap();
        let params = pattern.match_path("/users/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));
        assert!(pattern.match_path("/users/").is_none());
        assert!(pattern.match_path("/users/1/2").is_none());
    }

    #[test]
    fn test_wildcard_matches_rest() {
        let pattern = parse_pattern("/static/*").unwrap();
        assert!(pattern.match_path("/static").is_some());
        assert!(pattern.match_path("/static/").is_some());
        assert!(pattern.match_path("/static/css/site.css").is_some());
        assert!(pattern.match_path("/staticx").is_none());
    }

    #[test]
    fn test_nested_groups_keep_param_positions() {
        let pattern = parse_pattern("/:a{x(y|z)}/:b").unwrap();
        assert_eq!(pattern.capture_count(), 2);
        assert_eq!(pattern.group_count(), 3);
        let params = pattern.match_path("/xz/tail").unwrap();
        assert_eq!(params.get("a"), Some("xz"));
        assert_eq!(params.get("b"), Some("tail"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(invalid("users").contains("start with '/'"));
        assert!(invalid("/users/:id{[0-9]+").contains("unterminated"));
        assert!(invalid("/*/tail").contains("final segment"));
        assert!(invalid("/users/:{x}").contains("name"));
        assert!(invalid("/users/:").contains("name"));
        assert!(invalid("/users/:id{(}").contains("compile"));
        assert!(invalid("/x/:id{a)|(b}").contains("compile"));
        assert!(invalid("/foo/:x{a)(b}").contains("compile"));
        assert!(invalid("/users/:id{x}.json").contains("after constraint"));
    }

    #[test]
    fn test_display_reparses_to_equal_pattern() {
        for source in [
            "/",
            "/foo/",
            "/users/:id",
            "/a/:b{[a-z]+}/c",
            "/files/*",
            "/x/:y{a/b}",
        ] {
            let pattern = parse_pattern(source).unwrap();
            let reparsed = parse_pattern(&pattern.to_string()).unwrap();
            assert_eq!(pattern, reparsed, "round trip of {source}");
        }
    }

    #[test]
    fn test_prefixed() {
        let prefix = parse_pattern("/api/v1").unwrap();
        let root = parse_pattern("/").unwrap();

        let users = parse_pattern("/users/:id").unwrap().prefixed(&prefix).unwrap();
        assert_eq!(users.to_string(), "/api/v1/users/:id");
        assert_eq!(root.prefixed(&prefix).unwrap().to_string(), "/api/v1");
        assert_eq!(root.prefixed(&root).unwrap().to_string(), "/");
        assert_eq!(
            parse_pattern("/x").unwrap().prefixed(&root).unwrap().to_string(),
            "/x"
        );

        let wildcard = parse_pattern("/mount/*").unwrap();
        assert!(parse_pattern("/x").unwrap().prefixed(&wildcard).is_err());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/"), Some(vec![""]));
        assert_eq!(split_path("/a/b/"), Some(vec!["a", "b", ""]));
        assert_eq!(split_path("a"), None);
    }
}
