use super::{BranchKind, IntoRule, Rule, RuleRef, TryResult};
use crate::context::Context;
use crate::engine::{EngineError, Literal, Matcher, MatcherRef};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Kind of a token reported to handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum TokenKind {
    #[default]
    Unknown,
    /// Input skipped by error recovery, or partially matched by a failing token
    Error,
    Whitespace,
    /// Zero-width marker from `position`
    Position,
    Eof,
    Any,
    Literal,
    Identifier,
    Digits,
    /// Grammar-defined kind
    User(u16),
}

impl TokenKind {
    const USER_BASE: u32 = 0x100;

    /// Compact encoding used by the parse tree
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Error => 1,
            Self::Whitespace => 2,
            Self::Position => 3,
            Self::Eof => 4,
            Self::Any => 5,
            Self::Literal => 6,
            Self::Identifier => 7,
            Self::Digits => 8,
            Self::User(id) => Self::USER_BASE + id as u32,
        }
    }

    /// Inverse of [`to_raw`](Self::to_raw); unknown codes map to `Unknown`
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Error,
            2 => Self::Whitespace,
            3 => Self::Position,
            4 => Self::Eof,
            5 => Self::Any,
            6 => Self::Literal,
            7 => Self::Identifier,
            8 => Self::Digits,
            user if user >= Self::USER_BASE && user - Self::USER_BASE <= u16::MAX as u32 => {
                Self::User((user - Self::USER_BASE) as u16)
            }
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("token"),
            Self::Error => f.write_str("error"),
            Self::Whitespace => f.write_str("whitespace"),
            Self::Position => f.write_str("position"),
            Self::Eof => f.write_str("EOF"),
            Self::Any => f.write_str("any"),
            Self::Literal => f.write_str("literal"),
            Self::Identifier => f.write_str("identifier"),
            Self::Digits => f.write_str("digits"),
            Self::User(id) => write!(f, "token#{id}"),
        }
    }
}

/// Rule wrapping one engine.
///
/// A token produces no value. On success it reports `(kind, begin, end)`
/// and skips whitespace. Tried as a branch it backtracks without reporting
/// anything; parsed unconditionally it reports the engine's error, plus an
/// error token over whatever the engine consumed before failing, and leaves
/// the reader at the failure position.
#[derive(Clone)]
pub struct Token<U: CodeUnit> {
    engine: MatcherRef<U>,
    kind: TokenKind,
    error: Option<ErrorKind>,
}

impl<U: CodeUnit> Token<U> {
    pub fn new(engine: impl Matcher<U> + 'static) -> Self {
        Self::from_engine(Arc::new(engine))
    }

    #[must_use]
    pub const fn from_engine(engine: MatcherRef<U>) -> Self {
        Self {
            engine,
            kind: TokenKind::Unknown,
            error: None,
        }
    }

    /// Literal token
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::new(Literal::new(text)).kind(TokenKind::Literal)
    }

    /// Report matches with this kind
    #[must_use]
    pub const fn kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    /// Report failures with this error instead of the engine's
    #[must_use]
    pub fn error(mut self, error: ErrorKind) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub const fn engine(&self) -> &MatcherRef<U> {
        &self.engine
    }

    #[must_use]
    pub const fn token_kind(&self) -> TokenKind {
        self.kind
    }

    fn error_kind(&self, error: EngineError) -> ErrorKind {
        self.error
            .clone()
            .unwrap_or_else(|| self.engine.error_kind(error))
    }

    fn accept(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, begin: usize) {
        ctx.token(self.kind, begin, reader.position());
        ctx.skip_whitespace(reader);
    }
}

impl<U: CodeUnit> fmt::Debug for Token<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("engine", &self.engine)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<U: CodeUnit> Rule<U> for Token<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> TryResult {
        let begin = *reader;
        if self.engine.matches(reader).is_ok() {
            self.accept(ctx, reader, begin.position());
            TryResult::Ok
        } else {
            *reader = begin;
            TryResult::Backtracked
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        match self.engine.matches(reader) {
            Ok(()) => {
                self.accept(ctx, reader, begin);
                true
            }
            Err(error) => {
                let failed = reader.position();
                if failed > begin {
                    ctx.token(TokenKind::Error, begin, failed);
                }
                ctx.report(self.error_kind(error), failed, Span::new(begin, failed));
                false
            }
        }
    }

    fn recover(&self, reader: &mut Reader<'_, U>) -> bool {
        self.engine.recover(reader, EngineError::Mismatch)
    }
}

impl<U: CodeUnit> IntoRule<U> for Token<U> {
    fn into_rule(self) -> RuleRef<U> {
        Arc::new(self)
    }
}

/// Arbitrary rule treated as one token.
///
/// The inner rule runs without whitespace skipping and without reporting
/// anything; on success a single token covers everything it consumed.
#[derive(Debug)]
pub struct Tokenize<U: CodeUnit> {
    rule: RuleRef<U>,
    kind: TokenKind,
}

impl<U: CodeUnit> Tokenize<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self {
            rule,
            kind: TokenKind::Unknown,
        }
    }

    #[must_use]
    pub const fn kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    /// Run the inner rule quietly; returns the reader where it stopped.
    fn probe<'r>(&self, ctx: &mut Context<'_, U>, reader: &Reader<'r, U>) -> (bool, Reader<'r, U>) {
        let mut cursor = *reader;
        let rule = &self.rule;
        let matched = ctx.speculate(|scratch| {
            scratch.without_whitespace(|scratch| rule.parse(scratch, &mut cursor, &mut Vec::new()))
        });
        (matched, cursor)
    }
}

impl<U: CodeUnit> Rule<U> for Tokenize<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> TryResult {
        let begin = reader.position();
        match self.probe(ctx, reader) {
            (true, end) => {
                *reader = end;
                ctx.token(self.kind, begin, reader.position());
                ctx.skip_whitespace(reader);
                TryResult::Ok
            }
            (false, _) => TryResult::Backtracked,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        if self.try_parse(ctx, reader, values) == TryResult::Ok {
            return true;
        }
        let (_, end) = self.probe(ctx, reader);
        *reader = end;
        if end.position() > begin {
            ctx.token(TokenKind::Error, begin, end.position());
        }
        ctx.report(ErrorKind::MissingToken, begin, Span::new(begin, end.position()));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_raw_round_trip() {
        for kind in [
            TokenKind::Unknown,
            TokenKind::Whitespace,
            TokenKind::Digits,
            TokenKind::User(0),
            TokenKind::User(u16::MAX),
        ] {
            assert_eq!(TokenKind::from_raw(kind.to_raw()), kind);
        }
        assert_eq!(TokenKind::from_raw(99), TokenKind::Unknown);
    }

    #[test]
    fn test_token_builder() {
        let token = Token::<u8>::literal("if")
            .kind(TokenKind::User(3))
            .error(ErrorKind::custom("expected if"));
        assert_eq!(token.token_kind(), TokenKind::User(3));
        assert_eq!(
            token.error_kind(EngineError::Mismatch),
            ErrorKind::custom("expected if")
        );
        assert_eq!(TokenKind::User(3).to_string(), "token#3");
    }
}
