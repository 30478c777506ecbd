//! # Error Types
//!
//! Errors reported while running a grammar, and errors raised while building
//! one.
//!
//! ## Overview
//!
//! - [`Error`]: a parse error value handed to the context's handler. It
//!   carries the production that reported it, the position where it was
//!   detected, the span of input it covers, and an [`ErrorKind`] tag.
//! - [`GrammarError`]: construction-time problems such as a production that
//!   was declared but never defined, or duplicate strings in a trie.
//! - [`ErrorSink`]: where validate-style actions forward errors.
//!
//! Engines never produce these directly. They return a small
//! [`EngineError`](crate::engine::EngineError) code and the token rule that
//! wraps them translates it into an `ErrorKind`.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! so a downstream reporter can render them with source snippets.

use crate::input::Span;
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Tag identifying what went wrong
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    #[error("expected '{expected}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::expected_literal)))]
    ExpectedLiteral {
        expected: CompactString,
        /// Index of the first unit that did not match
        index: usize,
    },

    #[error("expected keyword '{expected}'")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::expected_keyword)))]
    ExpectedKeyword { expected: CompactString },

    #[error("expected {name}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::expected_char_class)))]
    ExpectedCharClass { name: CompactString },

    #[error("expected a digit")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::expected_digit)))]
    ExpectedDigit,

    #[error("none of the alternatives matched")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::exhausted_alternatives)))]
    ExhaustedAlternatives,

    #[error("missing token")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::missing_token)))]
    MissingToken,

    #[error("exhausted choice")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::exhausted_choice)))]
    ExhaustedChoice,

    #[error("missing closing delimiter")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::missing_delimiter)))]
    MissingDelimiter,

    #[error("forbidden leading zero")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::forbidden_leading_zero)))]
    ForbiddenLeadingZero,

    #[error("integer overflow")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::integer_overflow)))]
    IntegerOverflow,

    #[error("invalid code point")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::invalid_code_point)))]
    InvalidCodePoint,

    #[error("reserved identifier")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::reserved_identifier)))]
    ReservedIdentifier,

    #[error("unknown symbol")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::unknown_symbol)))]
    UnknownSymbol,

    #[error("duplicate element in combination")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::combination_duplicate)))]
    CombinationDuplicate,

    #[error("matched an excluded pattern")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::minus_failure)))]
    MinusFailure,

    #[error("input does not match context state")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::context_mismatch)))]
    ContextMismatch,

    #[error("invalid escape sequence")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::invalid_escape_sequence)))]
    InvalidEscapeSequence,

    #[error("unexpected trailing separator")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::unexpected_trailing_separator)))]
    UnexpectedTrailingSeparator,

    #[error("expected end of input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::expected_eof)))]
    ExpectedEof,

    #[error("unexpected end of input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::unexpected_eof)))]
    UnexpectedEof,

    #[error("could not find a recovery point")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::not_found)))]
    NotFound,

    #[error("{0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexa::custom)))]
    Custom(CompactString),
}

impl ErrorKind {
    /// Create an expected-literal error
    #[must_use]
    pub fn expected_literal(expected: impl Into<CompactString>, index: usize) -> Self {
        Self::ExpectedLiteral {
            expected: expected.into(),
            index,
        }
    }

    /// Create an expected-char-class error
    #[must_use]
    pub fn expected_char_class(name: impl Into<CompactString>) -> Self {
        Self::ExpectedCharClass { name: name.into() }
    }

    /// Create a custom error with a free-form message
    #[must_use]
    pub fn custom(message: impl Into<CompactString>) -> Self {
        Self::Custom(message.into())
    }

    /// Short stable identifier, useful for tests and error codes
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::ExpectedLiteral { .. } => "expected_literal",
            Self::ExpectedKeyword { .. } => "expected_keyword",
            Self::ExpectedCharClass { .. } => "expected_char_class",
            Self::ExpectedDigit => "expected_digit",
            Self::ExhaustedAlternatives => "exhausted_alternatives",
            Self::MissingToken => "missing_token",
            Self::ExhaustedChoice => "exhausted_choice",
            Self::MissingDelimiter => "missing_delimiter",
            Self::ForbiddenLeadingZero => "forbidden_leading_zero",
            Self::IntegerOverflow => "integer_overflow",
            Self::InvalidCodePoint => "invalid_code_point",
            Self::ReservedIdentifier => "reserved_identifier",
            Self::UnknownSymbol => "unknown_symbol",
            Self::CombinationDuplicate => "combination_duplicate",
            Self::MinusFailure => "minus_failure",
            Self::ContextMismatch => "context_mismatch",
            Self::InvalidEscapeSequence => "invalid_escape_sequence",
            Self::UnexpectedTrailingSeparator => "unexpected_trailing_separator",
            Self::ExpectedEof => "expected_eof",
            Self::UnexpectedEof => "unexpected_eof",
            Self::NotFound => "not_found",
            Self::Custom(_) => "custom",
        }
    }
}

/// A parse error with location information
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[error("{kind}")]
pub struct Error {
    /// Name of the production that reported the error
    pub production: CompactString,
    /// Position where the error was detected
    pub position: usize,
    /// Input covered by the error (`begin..end`)
    #[cfg_attr(feature = "diagnostics", label)]
    pub span: Span,
    #[source]
    pub kind: ErrorKind,
}

impl Error {
    /// Error detected at `position` and covering `span`
    #[must_use]
    pub fn new(production: impl Into<CompactString>, position: usize, span: Span, kind: ErrorKind) -> Self {
        Self {
            production: production.into(),
            position,
            span,
            kind,
        }
    }

    /// Error covering a single position
    #[must_use]
    pub fn at(production: impl Into<CompactString>, position: usize, kind: ErrorKind) -> Self {
        Self::new(production, position, Span::empty(position), kind)
    }

    #[must_use]
    pub const fn begin(&self) -> usize {
        self.span.begin()
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.span.end()
    }

    /// Human readable message
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Receiver of parse errors
pub trait ErrorSink {
    /// Handle one error
    fn report(&mut self, error: Error);
}

impl ErrorSink for Vec<Error> {
    fn report(&mut self, error: Error) {
        self.push(error);
    }
}

/// Adapter turning a closure into an [`ErrorSink`]
pub struct FnErrorSink<F>(pub F);

impl<F: FnMut(Error)> ErrorSink for FnErrorSink<F> {
    fn report(&mut self, error: Error) {
        (self.0)(error);
    }
}

/// Sink that drops every error
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardErrors;

impl ErrorSink for DiscardErrors {
    fn report(&mut self, _error: Error) {}
}

/// Errors raised while building a grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("production '{name}' was declared but never defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_production)))]
    UndefinedProduction { name: CompactString },

    #[error("production '{name}' is declared twice")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_production)))]
    DuplicateProduction { name: CompactString },

    #[error("production id {id} does not belong to this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_production)))]
    UnknownProduction { id: u32 },

    #[error("string '{text}' appears more than once in a literal set")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_string)))]
    DuplicateString { text: CompactString },

    #[error("literal strings must not be empty")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_literal)))]
    EmptyLiteral,

    #[error("grammar has no entry production")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_entry)))]
    MissingEntry,
}
