use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open range of character offsets into an annotation string.
///
/// Offsets count Unicode scalar values, not bytes, so `°` and accented
/// vowels occupy a single position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Convert a byte range reported by `regex` into a character span of `text`.
    pub fn from_byte_range(text: &str, start: usize, end: usize) -> Self {
        let start_chars = text[..start].chars().count();
        let len_chars = text[start..end].chars().count();
        Self::new(start_chars, start_chars + len_chars)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
