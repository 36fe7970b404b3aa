//! Field paths
//!
//! A `FieldPath` addresses a location inside a record: a root field name
//! followed by any number of nested field names and list indices.
//!
//! # Path Syntax
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `name` | Field of the record | `address` |
//! | `.name` | Field of the nested record or map key | `address.city` |
//! | `[n]` | List element | `tags[0]` |
//! | mixed | | `orders[2].lines[0].sku` |
//!
//! Paths are parsed once and applied segment by segment by the record
//! engine. The first segment is always a field name.

use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::Error;

/// Maximum number of segments in a path
pub const MAX_PATH_LENGTH: usize = 256;

/// Error type for path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty path
    #[error("empty path")]
    Empty,
    /// Empty field name in path
    #[error("empty field name in path at position {0}")]
    EmptyField(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid list index
    #[error("invalid list index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Path starts with an index
    #[error("path must start with a field name")]
    LeadingIndex,
    /// Too many segments
    #[error("path has {0} segments, maximum is {}", MAX_PATH_LENGTH)]
    TooLong(usize),
}

impl From<PathParseError> for Error {
    fn from(e: PathParseError) -> Self {
        Error::invalid_argument(e.to_string())
    }
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Field of a record, or key of a map: `.name`
    Field(String),
    /// List element: `[0]`
    Index(usize),
}

impl PathSegment {
    /// The field name, if this is a field segment
    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::Field(f) => Some(f),
            PathSegment::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(k) => write!(f, ".{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A pre-parsed path into a record
///
/// ```
/// use docrec_core::path::FieldPath;
///
/// let path: FieldPath = "orders[2].sku".parse().unwrap();
/// assert_eq!(path.root(), "orders");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path, FieldPath::field("orders").index(2).key("sku"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    root: String,
    tail: SmallVec<[PathSegment; 4]>,
}

impl FieldPath {
    /// A path made of a single field name
    pub fn field(name: impl Into<String>) -> Self {
        FieldPath {
            root: name.into(),
            tail: SmallVec::new(),
        }
    }

    /// Append a field segment
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.tail.push(PathSegment::Field(key.into()));
        self
    }

    /// Append an index segment
    pub fn index(mut self, idx: usize) -> Self {
        self.tail.push(PathSegment::Index(idx));
        self
    }

    /// Root field name
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Segments after the root field
    pub fn tail(&self) -> &[PathSegment] {
        &self.tail
    }

    /// Total number of segments, root included
    pub fn len(&self) -> usize {
        self.tail.len() + 1
    }

    /// Always false; a path has at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True if the path is a bare field name
    pub fn is_simple(&self) -> bool {
        self.tail.is_empty()
    }

    /// Path without its last segment
    pub fn parent(&self) -> Option<FieldPath> {
        if self.tail.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.tail.pop();
        Some(parent)
    }

    /// Last segment
    pub fn last_segment(&self) -> PathSegment {
        match self.tail.last() {
            Some(seg) => seg.clone(),
            None => PathSegment::Field(self.root.clone()),
        }
    }

    /// The path with the root field stripped, rooted at the first tail field
    ///
    /// Returns `None` when the tail is empty or starts with an index.
    pub fn descend(&self) -> Option<FieldPath> {
        let (first, rest) = self.tail.split_first()?;
        let root = first.as_field()?.to_string();
        Some(FieldPath {
            root,
            tail: rest.iter().cloned().collect(),
        })
    }

    /// Convert to a string representation
    pub fn to_path_string(&self) -> String {
        let mut result = self.root.clone();
        for seg in &self.tail {
            result.push_str(&seg.to_string());
        }
        result
    }

    /// Does `name` need path parsing rather than direct lookup
    pub fn is_path_like(name: &str) -> bool {
        name.contains('.') || name.contains('[')
    }

    /// Root field of a possibly-chained name, without full parsing
    ///
    /// `a.b` and `a[0]` both reduce to `a`.
    pub fn root_of(name: &str) -> &str {
        match name.find(|c| c == '.' || c == '[') {
            Some(pos) => &name[..pos],
            None => name,
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    /// Parse a path from a string
    ///
    /// Supported syntax:
    /// - `foo` - field
    /// - `foo.bar` - nested field
    /// - `foo[0]` - field then index
    /// - `foo[0].bar` - mixed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments: Vec<PathSegment> = Vec::new();
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    if i >= chars.len() || chars[i] == '.' || chars[i] == '[' {
                        return Err(PathParseError::EmptyField(i));
                    }
                }
                '[' => {
                    let start = i;
                    i += 1;
                    let idx_start = i;

                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(PathParseError::UnclosedBracket(start));
                    }

                    let idx_str: String = chars[idx_start..i].iter().collect();
                    let idx = idx_str
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;
                    if segments.is_empty() {
                        return Err(PathParseError::LeadingIndex);
                    }
                    segments.push(PathSegment::Index(idx));
                    i += 1; // closing bracket
                }
                _ => {
                    let key_start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    let key: String = chars[key_start..i].iter().collect();
                    segments.push(PathSegment::Field(key));
                }
            }
        }

        if segments.len() > MAX_PATH_LENGTH {
            return Err(PathParseError::TooLong(segments.len()));
        }

        let mut iter = segments.into_iter();
        let root = match iter.next() {
            Some(PathSegment::Field(root)) => root,
            Some(PathSegment::Index(_)) => return Err(PathParseError::LeadingIndex),
            None => return Err(PathParseError::EmptyField(0)),
        };
        Ok(FieldPath {
            root,
            tail: iter.collect(),
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}
