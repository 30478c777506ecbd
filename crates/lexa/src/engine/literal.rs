use super::{CharClass, EngineError, Matcher, MatcherRef, Trie, TrieBuilder, ValueParser};
use crate::error::{ErrorKind, GrammarError};
use crate::input::{CodeUnit, Reader};
use compact_str::CompactString;
use std::sync::Arc;

/// Exact unit string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal<U> {
    units: Box<[U]>,
    text: CompactString,
    case_folding: bool,
}

impl<U: CodeUnit> Literal<U> {
    /// Literal of the encoded string; an empty literal always matches
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            units: U::encode(text).into_boxed_slice(),
            text: text.into(),
            case_folding: false,
        }
    }

    /// Compare ASCII letters without regard to case
    #[must_use]
    pub fn ascii_case_folding(mut self) -> Self {
        self.case_folding = true;
        self
    }

    #[must_use]
    pub fn units(&self) -> &[U] {
        &self.units
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    fn unit_eq(&self, expected: U, actual: U) -> bool {
        if expected == actual {
            return true;
        }
        self.case_folding && fold(expected.to_u32()) == fold(actual.to_u32())
    }
}

const fn fold(unit: u32) -> u32 {
    if unit >= 0x41 && unit <= 0x5A { unit + 0x20 } else { unit }
}

impl<U: CodeUnit> Matcher<U> for Literal<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        for (index, &expected) in self.units.iter().enumerate() {
            match reader.peek() {
                Some(actual) if self.unit_eq(expected, actual) => reader.bump(),
                _ => return Err(EngineError::LiteralMismatch { index }),
            }
        }
        Ok(())
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        let index = match error {
            EngineError::LiteralMismatch { index } => index,
            _ => 0,
        };
        ErrorKind::expected_literal(self.text.clone(), index)
    }
}

/// Alternative of literals plus arbitrary matchers.
///
/// Literals share one trie. Matchers that are not plain strings go into a
/// manual group and are each run on a copy of the reader. The option that
/// consumes the most input wins; ties go to the option declared first.
#[derive(Debug, Clone)]
pub struct LiteralSet<U> {
    trie: Trie<U>,
    /// Declaration index of each trie value
    literal_order: Vec<usize>,
    manual: Vec<(usize, MatcherRef<U>)>,
    names: Vec<CompactString>,
}

impl<U: CodeUnit> LiteralSet<U> {
    /// Set of the given strings, in declaration order
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate string.
    pub fn new<'s>(strings: impl IntoIterator<Item = &'s str>) -> Result<Self, GrammarError> {
        let mut builder = LiteralSetBuilder::new();
        for text in strings {
            builder.literal(text)?;
        }
        Ok(builder.build())
    }

    #[must_use]
    pub fn builder() -> LiteralSetBuilder<U> {
        LiteralSetBuilder::new()
    }

    /// Number of options
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name of an option
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(CompactString::as_str)
    }
}

impl<U: CodeUnit> ValueParser<U> for LiteralSet<U> {
    /// Declaration index of the matched option
    type Output = usize;

    fn parse(&self, reader: &mut Reader<'_, U>) -> Result<usize, EngineError> {
        let start = *reader;
        let mut best: Option<(usize, Reader<'_, U>)> = None;

        let mut cursor = start;
        if let Some(value) = self.trie.longest_match(&mut cursor) {
            best = Some((self.literal_order[value as usize], cursor));
        }

        for (index, matcher) in &self.manual {
            let mut cursor = start;
            if matcher.matches(&mut cursor).is_err() {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_index, best_end)) => {
                    cursor.position() > best_end.position()
                        || (cursor.position() == best_end.position() && index < best_index)
                }
            };
            if better {
                best = Some((*index, cursor));
            }
        }

        let (index, end) = best.ok_or(EngineError::Mismatch)?;
        *reader = end;
        Ok(index)
    }
}

impl<U: CodeUnit> Matcher<U> for LiteralSet<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        ValueParser::parse(self, reader).map(|_| ())
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::ExhaustedAlternatives
    }
}

/// Builder for a [`LiteralSet`] mixing strings and matchers
#[derive(Debug)]
pub struct LiteralSetBuilder<U> {
    trie: TrieBuilder<U>,
    literal_order: Vec<usize>,
    manual: Vec<(usize, MatcherRef<U>)>,
    names: Vec<CompactString>,
}

impl<U: CodeUnit> LiteralSetBuilder<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trie: TrieBuilder::new(),
            literal_order: Vec::new(),
            manual: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Add a string option
    ///
    /// # Errors
    ///
    /// Fails on an empty string or a string already in the set.
    pub fn literal(&mut self, text: &str) -> Result<&mut Self, GrammarError> {
        let index = self.names.len();
        self.trie.insert(&U::encode(text), self.literal_order.len() as u32)?;
        self.literal_order.push(index);
        self.names.push(text.into());
        Ok(self)
    }

    /// Add an arbitrary matcher option
    pub fn matcher(&mut self, name: impl Into<CompactString>, matcher: impl Matcher<U> + 'static) -> &mut Self {
        let index = self.names.len();
        self.manual.push((index, Arc::new(matcher)));
        self.names.push(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> LiteralSet<U> {
        LiteralSet {
            trie: self.trie.build(),
            literal_order: self.literal_order,
            manual: self.manual,
            names: self.names,
        }
    }
}

impl<U: CodeUnit> Default for LiteralSetBuilder<U> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier shape: one leading unit followed by any number of trailing units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    leading: CharClass,
    trailing: CharClass,
}

impl Identifier {
    #[must_use]
    pub const fn new(leading: CharClass, trailing: CharClass) -> Self {
        Self { leading, trailing }
    }

    #[must_use]
    pub const fn leading(&self) -> &CharClass {
        &self.leading
    }

    #[must_use]
    pub const fn trailing(&self) -> &CharClass {
        &self.trailing
    }
}

impl<U: CodeUnit> Matcher<U> for Identifier {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        match reader.peek() {
            Some(unit) if self.leading.matches_unit(unit) => reader.bump(),
            _ => return Err(EngineError::Mismatch),
        }
        while reader.peek().is_some_and(|unit| self.trailing.matches_unit(unit)) {
            reader.bump();
        }
        Ok(())
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::expected_char_class(self.leading.name())
    }
}

/// Identifier-shaped literal.
///
/// `if` matches `if (` but not `iffy`: the whole identifier is read first and
/// then compared against the keyword.
#[derive(Debug, Clone)]
pub struct Keyword<U> {
    literal: Literal<U>,
    identifier: Identifier,
}

impl<U: CodeUnit> Keyword<U> {
    #[must_use]
    pub fn new(text: &str, identifier: Identifier) -> Self {
        Self {
            literal: Literal::new(text),
            identifier,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.literal.text()
    }
}

impl<U: CodeUnit> Matcher<U> for Keyword<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        let begin = *reader;
        self.identifier
            .matches(reader)
            .map_err(|_| EngineError::KeywordMismatch)?;
        let read = &begin.remaining()[..reader.position() - begin.position()];
        if read == self.literal.units() {
            Ok(())
        } else {
            Err(EngineError::KeywordMismatch)
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::ExpectedKeyword {
            expected: self.literal.text().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AsciiClass, Digits, Radix};

    fn c_identifier() -> Identifier {
        Identifier::new(
            CharClass::Ascii(AsciiClass::AlphaUnderscore),
            CharClass::Ascii(AsciiClass::Word),
        )
    }

    #[test]
    fn test_literal_reports_failing_index() {
        let literal = Literal::<u8>::new("while");
        let mut reader = Reader::from_str("whale");
        assert_eq!(
            literal.matches(&mut reader),
            Err(EngineError::LiteralMismatch { index: 2 })
        );
        assert_eq!(
            literal.error_kind(EngineError::LiteralMismatch { index: 2 }),
            ErrorKind::expected_literal("while", 2)
        );
    }

    #[test]
    fn test_case_folding() {
        let literal = Literal::<u8>::new("select").ascii_case_folding();
        let mut reader = Reader::from_str("SeLeCt");
        assert_eq!(literal.matches(&mut reader), Ok(()));
    }

    #[test]
    fn test_literal_set_longest_wins() {
        let set = LiteralSet::<u8>::new(["=", "==", "=>"]).unwrap();
        let mut reader = Reader::from_str("==>");
        assert_eq!(set.parse(&mut reader), Ok(1));
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_literal_set_manual_group() {
        let mut builder = LiteralSet::<u8>::builder();
        builder.literal("0").unwrap();
        builder.matcher("number", Digits::new(Radix::Decimal));
        builder.literal("12").unwrap();
        let set = builder.build();

        // digits consume more than the literal "12"
        let mut reader = Reader::from_str("123");
        assert_eq!(set.parse(&mut reader), Ok(1));
        assert_eq!(reader.position(), 3);

        // same length: declaration order picks "0" over the digits
        let mut reader = Reader::from_str("0");
        assert_eq!(set.parse(&mut reader), Ok(0));

        // same length: digits were declared before "12"
        let mut reader = Reader::from_str("12");
        assert_eq!(set.parse(&mut reader), Ok(1));
        assert_eq!(set.name(1), Some("number"));
    }

    #[test]
    fn test_keyword_requires_identifier_boundary() {
        let keyword = Keyword::<u8>::new("if", c_identifier());
        let mut reader = Reader::from_str("if(");
        assert_eq!(keyword.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 2);

        let mut reader = Reader::from_str("iffy");
        assert_eq!(
            keyword.matches(&mut reader),
            Err(EngineError::KeywordMismatch)
        );
    }

    #[test]
    fn test_identifier_shape() {
        let identifier = c_identifier();
        let mut reader = Reader::from_str("_foo9 bar");
        assert_eq!(identifier.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 5);

        let mut reader = Reader::from_str("9foo");
        assert_eq!(identifier.matches(&mut reader), Err(EngineError::Mismatch));
    }
}
