//! Qualified names: `::`-separated paths identifying packages and declarations

use std::fmt;

/// An ordered sequence of name segments, e.g. `pkg::item`.
///
/// Equality and hashing are segment-wise, so two names built through
/// different routes compare equal whenever their paths match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn single(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Parse a `::`-separated path.
    pub fn parse(text: &str) -> Self {
        Self {
            segments: text.split("::").map(str::to_string).collect(),
        }
    }

    /// A new name with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The trailing segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `prefix` is a segment-wise prefix of this name.
    pub fn starts_with(&self, prefix: &QualifiedName) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self
                .segments
                .iter()
                .zip(&prefix.segments)
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("::"))
    }
}

impl From<&str> for QualifiedName {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}
