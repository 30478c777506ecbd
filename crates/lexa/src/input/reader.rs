use super::{CodeUnit, Span};
use std::fmt;

/// Cursor over a slice of code units.
///
/// Copying a reader takes a snapshot: backtracking is done by keeping a copy
/// and assigning it back, never by undoing individual `bump` calls.
/// Positions are absolute indexes into the original source, including for
/// [`partial`](Self::partial) views, so spans recorded in a sub-range view
/// refer to the same units as spans recorded in the full view.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Reader<'a, U: CodeUnit> {
    source: &'a [U],
    position: usize,
    end: usize,
}

impl<'a, U: CodeUnit> Reader<'a, U> {
    /// Reader over the whole slice
    #[must_use]
    pub const fn new(source: &'a [U]) -> Self {
        Self {
            source,
            position: 0,
            end: source.len(),
        }
    }

    /// Current code unit, or `None` at the end of input.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<U> {
        if self.position < self.end {
            Some(self.source[self.position])
        } else {
            None
        }
    }

    /// Code unit `n` positions ahead of the cursor
    #[inline]
    #[must_use]
    pub fn peek_nth(&self, n: usize) -> Option<U> {
        let index = self.position.checked_add(n)?;
        if index < self.end {
            Some(self.source[index])
        } else {
            None
        }
    }

    /// Consume one unit; a no-op at the end of input.
    #[inline]
    pub fn bump(&mut self) {
        if self.position < self.end {
            self.position += 1;
        }
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.position >= self.end
    }

    /// Position one past the last readable unit of this view
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Full underlying source, ignoring partial view bounds
    #[must_use]
    pub const fn source(&self) -> &'a [U] {
        self.source
    }

    /// Units not consumed yet
    #[must_use]
    pub fn remaining(&self) -> &'a [U] {
        &self.source[self.position..self.end]
    }

    /// Units of a span, clamped to the source.
    #[must_use]
    pub fn slice(&self, span: Span) -> &'a [U] {
        let end = span.end().min(self.source.len());
        let begin = span.begin().min(end);
        &self.source[begin..end]
    }

    /// Independent reader over a sub-range of the same source.
    ///
    /// The view starts at `span.begin()` and reports end of input at
    /// `span.end()`.
    #[must_use]
    pub fn partial(&self, span: Span) -> Self {
        let end = span.end().min(self.source.len());
        Self {
            source: self.source,
            position: span.begin().min(end),
            end,
        }
    }

    /// Move the cursor to `position` if it is inside the view.
    ///
    /// Used by engines that scan ahead with a separate cursor and then commit.
    pub fn reset(&mut self, position: usize) {
        self.position = position.min(self.end);
    }
}

impl<'a> Reader<'a, u8> {
    /// Reader over the UTF-8 bytes of a string
    #[must_use]
    pub const fn from_str(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<U: CodeUnit> fmt::Debug for Reader<'_, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("position", &self.position)
            .field("end", &self.end)
            .field("next", &self.peek())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_bump() {
        let mut reader = Reader::from_str("ab");
        assert_eq!(reader.peek(), Some(b'a'));
        reader.bump();
        assert_eq!(reader.peek(), Some(b'b'));
        assert_eq!(reader.position(), 1);
        reader.bump();
        assert!(reader.is_eof());
        assert_eq!(reader.peek(), None);

        // bump at the end stays put
        reader.bump();
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_copy_is_snapshot() {
        let mut reader = Reader::from_str("xyz");
        let snapshot = reader;
        reader.bump();
        reader.bump();
        assert_eq!(snapshot.position(), 0);
        reader = snapshot;
        assert_eq!(reader.peek(), Some(b'x'));
    }

    #[test]
    fn test_partial_keeps_absolute_positions() {
        let reader = Reader::from_str("hello world");
        let mut partial = reader.partial(Span::new(6, 9));
        assert_eq!(partial.position(), 6);
        assert_eq!(partial.peek(), Some(b'w'));
        partial.bump();
        partial.bump();
        partial.bump();
        assert!(partial.is_eof());
        assert_eq!(partial.position(), 9);
        assert_eq!(partial.slice(Span::new(6, 9)), b"wor");
    }

    #[test]
    fn test_peek_nth() {
        let reader = Reader::new(&['a', 'b', 'c'][..]);
        assert_eq!(reader.peek_nth(2), Some('c'));
        assert_eq!(reader.peek_nth(3), None);
    }

    #[test]
    fn test_slice_is_clamped() {
        let reader = Reader::from_str("abc");
        assert_eq!(reader.slice(Span::new(1, 10)), b"bc");
        assert!(reader.slice(Span::new(7, 10)).is_empty());
    }
}
