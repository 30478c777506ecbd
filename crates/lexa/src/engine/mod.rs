//! # Token Engines
//!
//! Stateless matchers and parsers that operate directly on a [`Reader`].
//!
//! ## Overview
//!
//! An engine is a plain value with no mutable state. It comes in two shapes:
//!
//! - [`Matcher`]: succeeds or fails, producing no value
//! - [`ValueParser`]: succeeds with one value or fails
//!
//! On success the reader has advanced past the match. On failure its position
//! is unspecified: engines do not roll back, callers that need the original
//! position take a copy of the reader before calling and restore it.
//!
//! Engines report failure as an [`EngineError`], a small code local to one
//! matching attempt. Turning that code into a reportable
//! [`ErrorKind`](crate::error::ErrorKind) is the job of
//! [`Matcher::error_kind`], which the token rule calls when it reports an
//! error to the context.

mod char_class;
mod compound;
mod digits;
mod integer;
mod literal;
mod trie;

pub use char_class::{AsciiClass, CharClass};
pub use compound::{Any, Eof, Eol, Find, Lookahead, Minus, Newline, Until, While, WhileOne};
pub use digits::{Digits, NDigits, Radix};
pub use integer::{CodePointId, Integer, IntegerParser, parse_integer};
pub use literal::{Identifier, Keyword, Literal, LiteralSet, LiteralSetBuilder};
pub use trie::{Trie, TrieBuilder};

use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader};
use std::fmt;
use std::sync::Arc;

/// Failure code of a single engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineError {
    /// Input did not match
    Mismatch,
    /// A literal failed at the given unit index
    LiteralMismatch { index: usize },
    /// An identifier was read but it is not the expected keyword
    KeywordMismatch,
    /// A digit was required
    ExpectedDigit,
    /// A digit separator was not followed by a digit
    MissingSeparatorDigit,
    /// A zero was followed by more digits in a trimmed digit run
    LeadingZero,
    /// The value does not fit the target integer type
    Overflow,
    /// The digits do not name a Unicode scalar value
    InvalidCodePoint,
    /// End of input reached while the engine needed more
    UnexpectedEof,
    /// Input was expected to end here
    ExpectedEof,
    /// Input matched a pattern it was required not to match
    ExcludedMatch,
    /// A scanning engine hit its limit before finding its target
    NotFound,
}

/// Default translation from engine codes to reportable error kinds
#[must_use]
pub fn default_error_kind(error: EngineError) -> ErrorKind {
    match error {
        EngineError::Mismatch => ErrorKind::ExhaustedAlternatives,
        EngineError::LiteralMismatch { index } => ErrorKind::expected_literal("", index),
        EngineError::KeywordMismatch => ErrorKind::ExpectedKeyword {
            expected: "".into(),
        },
        EngineError::ExpectedDigit | EngineError::MissingSeparatorDigit => ErrorKind::ExpectedDigit,
        EngineError::LeadingZero => ErrorKind::ForbiddenLeadingZero,
        EngineError::Overflow => ErrorKind::IntegerOverflow,
        EngineError::InvalidCodePoint => ErrorKind::InvalidCodePoint,
        EngineError::UnexpectedEof => ErrorKind::UnexpectedEof,
        EngineError::ExpectedEof => ErrorKind::ExpectedEof,
        EngineError::ExcludedMatch => ErrorKind::MinusFailure,
        EngineError::NotFound => ErrorKind::NotFound,
    }
}

/// Engine that matches input without producing a value
pub trait Matcher<U: CodeUnit>: Send + Sync + fmt::Debug {
    /// Try to match at the reader's position.
    ///
    /// # Errors
    ///
    /// Returns the engine's failure code. The reader position is unspecified
    /// afterwards.
    fn matches(&self, reader: &mut Reader<'_, U>) -> Result<(), EngineError>;

    /// Skip past one malformed occurrence after `error`.
    ///
    /// Returns whether continuing after the skipped input is plausible.
    fn recover(&self, reader: &mut Reader<'_, U>, error: EngineError) -> bool {
        let _ = (reader, error);
        false
    }

    /// Reportable error kind for a failure code of this engine
    fn error_kind(&self, error: EngineError) -> ErrorKind {
        default_error_kind(error)
    }
}

/// Engine that produces one value on success
pub trait ValueParser<U: CodeUnit>: Send + Sync + fmt::Debug {
    type Output;

    /// Parse a value at the reader's position.
    ///
    /// # Errors
    ///
    /// Returns the engine's failure code.
    fn parse(&self, reader: &mut Reader<'_, U>) -> Result<Self::Output, EngineError>;
}

/// Shared handle to a matcher
pub type MatcherRef<U> = Arc<dyn Matcher<U>>;

impl<U: CodeUnit, M: Matcher<U> + ?Sized> Matcher<U> for Arc<M> {
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

/// Run a matcher and restore the reader when it fails.
pub fn match_or_rewind<U: CodeUnit, M: Matcher<U> + ?Sized>(
    matcher: &M,
    reader: &mut Reader<'_, U>,
) -> Result<(), EngineError> {
    let saved = *reader;
    let result = matcher.matches(reader);
    if result.is_err() {
        *reader = saved;
    }
    result
}

/// Whether the matcher would match at the reader's position; never consumes.
pub fn peek_match<U: CodeUnit, M: Matcher<U> + ?Sized>(matcher: &M, reader: &Reader<'_, U>) -> bool {
    let mut copy = *reader;
    matcher.matches(&mut copy).is_ok()
}
