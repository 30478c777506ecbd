#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range of reader positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Span {
    begin: usize,
    end: usize,
}

impl Span {
    /// Create a span; `end` is clamped so it never precedes `begin`.
    #[must_use]
    pub const fn new(begin: usize, end: usize) -> Self {
        if end < begin {
            Self { begin, end: begin }
        } else {
            Self { begin, end }
        }
    }

    /// Empty span at a single position
    #[must_use]
    pub const fn empty(at: usize) -> Self {
        Self { begin: at, end: at }
    }

    #[must_use]
    pub const fn begin(self) -> usize {
        self.begin
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.begin
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.begin == self.end
    }

    #[must_use]
    pub const fn contains(self, position: usize) -> bool {
        position >= self.begin && position < self.end
    }

    #[must_use]
    pub const fn contains_span(self, other: Self) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// Smallest span covering both
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::new(self.begin.min(other.begin), self.end.max(other.end))
    }

    /// Byte/unit range for slicing the source
    #[must_use]
    pub const fn range(self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.begin, self.end)
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(feature = "diagnostics")]
impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        Self::new(miette::SourceOffset::from(span.begin()), span.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new_clamps_end() {
        let span = Span::new(10, 4);
        assert_eq!(span.begin(), 10);
        assert_eq!(span.end(), 10);
        assert!(span.is_empty());
    }

    #[test]
    fn test_span_len() {
        let span = Span::new(10, 25);
        assert_eq!(span.len(), 15);
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(10, 20);

        assert!(!span.contains(9));
        assert!(span.contains(10));
        assert!(span.contains(15));
        assert!(!span.contains(20)); // end is exclusive
    }

    #[test]
    fn test_span_contains_span() {
        let outer = Span::new(10, 30);
        assert!(outer.contains_span(Span::new(15, 25)));
        assert!(!outer.contains_span(Span::new(5, 15)));
        assert!(outer.contains_span(outer));
    }

    #[test]
    fn test_span_cover() {
        let covered = Span::new(3, 5).cover(Span::new(8, 12));
        assert_eq!(covered, Span::new(3, 12));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(10, 20)), "10..20");
    }
}
