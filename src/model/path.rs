//! Resource and field paths
//!
//! A `ResourcePath` addresses collections and documents (`cities/NYC`).
//! A `FieldPath` addresses a (possibly nested) field inside a document.
//! `__name__` is the key field: it stands for the document identity.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::errors::{ModelError, ModelResult};

/// Segment name of the key field
pub const KEY_FIELD_NAME: &str = "__name__";

/// Slash-separated path to a collection or document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Arc<[String]>,
}

impl ResourcePath {
    /// Creates a path from individual segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The database root
    pub fn root() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Parses `a/b/c`. Empty segments are dropped, so `/a//b/` equals `a/b`.
    pub fn from_string(path: &str) -> Self {
        Self::new(path.split('/').filter(|s| !s.is_empty()))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns the path without its last segment (root stays root)
    pub fn parent(&self) -> Self {
        let end = self.segments.len().saturating_sub(1);
        Self::new(self.segments[..end].iter().cloned())
    }

    /// Returns a new path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.to_vec();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// Returns a new path with all of `other`'s segments appended
    pub fn append(&self, other: &ResourcePath) -> Self {
        Self::new(self.segments.iter().chain(other.segments.iter()).cloned())
    }

    pub fn is_prefix_of(&self, other: &ResourcePath) -> bool {
        self.len() <= other.len() && other.segments[..self.len()] == self.segments[..]
    }

    /// True if `other` is exactly one segment below this path
    pub fn is_immediate_parent_of(&self, other: &ResourcePath) -> bool {
        self.len() + 1 == other.len() && self.is_prefix_of(other)
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }
}

impl Ord for ResourcePath {
    fn cmp(&self, other: &Self) -> Ordering {
        for (left, right) in self.segments.iter().zip(other.segments.iter()) {
            match left.cmp(right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.len().cmp(&other.len())
    }
}

impl PartialOrd for ResourcePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

/// Dot-separated path to a field inside a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Arc<[String]>,
}

impl FieldPath {
    /// Creates a field path from segments; no segment may be empty
    pub fn new<I, S>(segments: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ModelError::InvalidFieldPath(
                "field path must have at least one segment".into(),
            ));
        }
        if segments.iter().any(String::is_empty) {
            return Err(ModelError::InvalidFieldPath(format!(
                "empty segment in '{}'",
                segments.join(".")
            )));
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    /// Parses a dotted path such as `address.city`
    pub fn from_dotted(path: &str) -> ModelResult<Self> {
        Self::new(path.split('.'))
    }

    /// The document identity field
    pub fn key_field() -> Self {
        Self {
            segments: Arc::from(vec![KEY_FIELD_NAME.to_string()]),
        }
    }

    pub fn is_key_field(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == KEY_FIELD_NAME
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted form with backtick quoting for segments that are not plain identifiers
    pub fn canonical_string(&self) -> String {
        self.segments
            .iter()
            .map(|segment| escape_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn is_simple_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn escape_segment(segment: &str) -> String {
    if is_simple_identifier(segment) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len() + 2);
    out.push('`');
    for c in segment.chars() {
        if c == '\\' || c == '`' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
    out
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}
