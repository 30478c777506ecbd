use super::{EngineError, Matcher, MatcherRef, match_or_rewind, peek_match};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};

/// Rest of the input; always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct Any;

impl<U: CodeUnit> Matcher<U> for Any {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        reader.reset(reader.end());
        Ok(())
    }
}

/// End of input, consuming nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Eof;

impl<U: CodeUnit> Matcher<U> for Eof {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        if reader.is_eof() {
            Ok(())
        } else {
            Err(EngineError::ExpectedEof)
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::ExpectedEof
    }
}

/// `\n` or `\r\n`
#[derive(Debug, Clone, Copy, Default)]
pub struct Newline;

impl<U: CodeUnit> Matcher<U> for Newline {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        match reader.peek() {
            Some(unit) if unit.is_char(b'\n') => {
                reader.bump();
                Ok(())
            }
            Some(unit) if unit.is_char(b'\r') => {
                reader.bump();
                match reader.peek() {
                    Some(unit) if unit.is_char(b'\n') => {
                        reader.bump();
                        Ok(())
                    }
                    _ => Err(EngineError::Mismatch),
                }
            }
            Some(_) => Err(EngineError::Mismatch),
            None => Err(EngineError::UnexpectedEof),
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::expected_char_class("newline")
    }
}

/// Newline or end of input
#[derive(Debug, Clone, Copy, Default)]
pub struct Eol;

impl<U: CodeUnit> Matcher<U> for Eol {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        if reader.is_eof() {
            return Ok(());
        }
        Newline.matches(reader)
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::expected_char_class("EOL")
    }
}

/// Zero or more repetitions of a matcher
#[derive(Debug, Clone)]
pub struct While<M>(pub M);

impl<U: CodeUnit, M: Matcher<U>> Matcher<U> for While<M> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        loop {
            let before = reader.position();
            if match_or_rewind(&self.0, reader).is_err() || reader.position() == before {
                return Ok(());
            }
        }
    }
}

/// One or more repetitions of a matcher
#[derive(Debug, Clone)]
pub struct WhileOne<M>(pub M);

impl<U: CodeUnit, M: Matcher<U>> Matcher<U> for WhileOne<M> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        self.0.matches(reader)?;
        While(&self.0).matches(reader)
    }

    fn recover(&self, reader: &mut Reader<'_, U>, error: EngineError) -> bool {
        self.0.recover(reader, error)
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        self.0.error_kind(error)
    }
}

impl<U: CodeUnit, M: Matcher<U> + ?Sized> Matcher<U> for &M {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        (**self).matches(reader)
    }

    fn recover(&self, reader: &mut Reader<'_, U>, error: EngineError) -> bool {
        (**self).recover(reader, error)
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        (**self).error_kind(error)
    }
}

/// Consume everything up to and including the first occurrence of `needle`
#[derive(Debug, Clone)]
pub struct Until<U> {
    needle: MatcherRef<U>,
    or_eof: bool,
}

impl<U: CodeUnit> Until<U> {
    #[must_use]
    pub const fn new(needle: MatcherRef<U>) -> Self {
        Self {
            needle,
            or_eof: false,
        }
    }

    /// Also succeed when the input ends before the needle
    #[must_use]
    pub const fn or_eof(mut self) -> Self {
        self.or_eof = true;
        self
    }
}

impl<U: CodeUnit> Matcher<U> for Until<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        loop {
            if match_or_rewind(&self.needle, reader).is_ok() {
                return Ok(());
            }
            if reader.is_eof() {
                return if self.or_eof {
                    Ok(())
                } else {
                    Err(EngineError::UnexpectedEof)
                };
            }
            reader.bump();
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::UnexpectedEof
    }
}

/// Skip ahead to the first position where one of the needles matches,
/// without consuming the needle
#[derive(Debug, Clone)]
pub struct Find<U> {
    needles: Vec<MatcherRef<U>>,
    limit: Option<MatcherRef<U>>,
}

impl<U: CodeUnit> Find<U> {
    #[must_use]
    pub const fn new(needles: Vec<MatcherRef<U>>) -> Self {
        Self {
            needles,
            limit: None,
        }
    }

    /// Give up when `limit` matches before any needle
    #[must_use]
    pub fn limit(mut self, limit: MatcherRef<U>) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl<U: CodeUnit> Matcher<U> for Find<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        loop {
            if self.needles.iter().any(|needle| peek_match(needle, reader)) {
                return Ok(());
            }
            if reader.is_eof() || self.limit.as_ref().is_some_and(|limit| peek_match(limit, reader)) {
                return Err(EngineError::NotFound);
            }
            reader.bump();
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::NotFound
    }
}

/// `token` matches and `excluded` does not match exactly the same input
#[derive(Debug, Clone)]
pub struct Minus<U> {
    token: MatcherRef<U>,
    excluded: MatcherRef<U>,
}

impl<U: CodeUnit> Minus<U> {
    #[must_use]
    pub const fn new(token: MatcherRef<U>, excluded: MatcherRef<U>) -> Self {
        Self { token, excluded }
    }
}

impl<U: CodeUnit> Matcher<U> for Minus<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        let begin = reader.position();
        self.token.matches(reader)?;

        let mut partial = reader.partial(Span::new(begin, reader.position()));
        if self.excluded.matches(&mut partial).is_ok() && partial.is_eof() {
            return Err(EngineError::ExcludedMatch);
        }
        Ok(())
    }

    fn recover(&self, reader: &mut Reader<'_, U>, error: EngineError) -> bool {
        self.token.recover(reader, error)
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        match error {
            EngineError::ExcludedMatch => ErrorKind::MinusFailure,
            other => self.token.error_kind(other),
        }
    }
}

/// Succeeds without consuming if `needle` occurs before `end` or the end of
/// input
#[derive(Debug, Clone)]
pub struct Lookahead<U> {
    needle: MatcherRef<U>,
    end: MatcherRef<U>,
}

impl<U: CodeUnit> Lookahead<U> {
    #[must_use]
    pub const fn new(needle: MatcherRef<U>, end: MatcherRef<U>) -> Self {
        Self { needle, end }
    }
}

impl<U: CodeUnit> Matcher<U> for Lookahead<U> {
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError> {
        let mut cursor = *reader;
        loop {
            if peek_match(&self.needle, &cursor) {
                return Ok(());
            }
            if cursor.is_eof() || peek_match(&self.end, &cursor) {
                return Err(EngineError::NotFound);
            }
            cursor.bump();
        }
    }

    fn error_kind(&self, _error: EngineError) -> ErrorKind {
        ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AsciiClass, CharClass, Literal};
    use std::sync::Arc;

    fn lit(text: &str) -> MatcherRef<u8> {
        Arc::new(Literal::new(text))
    }

    #[test]
    fn test_until_includes_needle() {
        let until = Until::new(lit("*/"));
        let mut reader = Reader::from_str("comment */ rest");
        assert_eq!(until.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 10);

        let mut reader = Reader::from_str("open");
        assert_eq!(until.matches(&mut reader), Err(EngineError::UnexpectedEof));

        let mut reader = Reader::from_str("open");
        assert_eq!(until.or_eof().matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_find_stops_before_needle() {
        let find = Find::new(vec![lit(";")]).limit(lit("}"));
        let mut reader = Reader::from_str("garbage; next");
        assert_eq!(find.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 7);

        let mut reader = Reader::from_str("garbage } ;");
        assert_eq!(find.matches(&mut reader), Err(EngineError::NotFound));
    }

    #[test]
    fn test_minus_excludes_exact_match() {
        let word: MatcherRef<u8> = Arc::new(WhileOne(CharClass::Ascii(AsciiClass::Alpha)));
        let minus = Minus::new(word, lit("null"));
        let mut reader = Reader::from_str("null");
        assert_eq!(minus.matches(&mut reader), Err(EngineError::ExcludedMatch));

        // "nullable" is not exactly "null"
        let mut reader = Reader::from_str("nullable");
        assert_eq!(minus.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_lookahead_does_not_consume() {
        let lookahead = Lookahead::new(lit("="), lit(";"));
        let mut reader = Reader::from_str("a = b;");
        assert_eq!(lookahead.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 0);

        let mut reader = Reader::from_str("a; b = c");
        assert_eq!(lookahead.matches(&mut reader), Err(EngineError::NotFound));
    }

    #[test]
    fn test_newline_and_eol() {
        let mut reader = Reader::from_str("\r\nx");
        assert_eq!(Newline.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 2);

        let mut reader = Reader::from_str("\rx");
        assert_eq!(Newline.matches(&mut reader), Err(EngineError::Mismatch));

        let mut reader = Reader::from_str("");
        assert_eq!(Eol.matches(&mut reader), Ok(()));
    }

    #[test]
    fn test_while_and_any() {
        let blanks = While(CharClass::Ascii(AsciiClass::Blank));
        let mut reader = Reader::from_str("  \tx");
        assert_eq!(blanks.matches(&mut reader), Ok(()));
        assert_eq!(reader.position(), 3);

        let mut reader = Reader::from_str("x");
        assert_eq!(
            WhileOne(CharClass::Ascii(AsciiClass::Blank)).matches(&mut reader),
            Err(EngineError::Mismatch)
        );

        let mut reader = Reader::from_str("rest of it");
        assert_eq!(Any.matches(&mut reader), Ok(()));
        assert!(reader.is_eof());

        let mut reader = Reader::from_str("");
        assert_eq!(Eof.matches(&mut reader), Ok(()));
    }
}
