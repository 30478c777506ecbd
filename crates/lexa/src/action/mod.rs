//! # Actions
//!
//! Entry points that run a grammar over an input.
//!
//! ## Overview
//!
//! Each action pairs the parse context with a different [`Handler`]:
//!
//! | Action | Handler | Result |
//! |--------|---------|--------|
//! | [`Grammar::validate`] | [`ValidateHandler`] | errors go to an [`ErrorSink`] |
//! | [`Grammar::parse`] | [`ValueHandler`] | the entry production's [`Value`] |
//! | [`Grammar::parse_tree`] | [`ParseTreeBuilder`] | a [`ParseTree`] |
//!
//! All three report an [`Outcome`]. A parse that reported errors but got
//! through thanks to recovery is a [`Outcome::RecoveredFailure`]; its value
//! is still available.
//!
//! Parsing does not require the entry production to consume the whole
//! input. Grammars that must reach the end say so with an `eof` token.

mod parse;
mod validate;

pub use parse::ValueHandler;
pub use validate::ValidateHandler;

use crate::config::{ParseConfig, TreeConfig};
use crate::context::{Context, Handler, ParseStats};
use crate::error::{Error, ErrorSink};
use crate::grammar::Grammar;
use crate::input::{CodeUnit, Reader};
use crate::tree::{ParseTree, ParseTreeBuilder};
use crate::value::Value;
use log::debug;

/// How a parse ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// No errors
    Success,
    /// Errors were reported, but recovery got the entry production through
    RecoveredFailure,
    /// The entry production failed
    FatalFailure,
}

impl Outcome {
    const fn from_run(parsed: bool, errors: usize) -> Self {
        match (parsed, errors) {
            (true, 0) => Self::Success,
            (true, _) => Self::RecoveredFailure,
            (false, _) => Self::FatalFailure,
        }
    }
}

/// Result of [`Grammar::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateResult {
    pub outcome: Outcome,
    /// Position the entry production stopped at
    pub position: usize,
    pub stats: ParseStats,
}

impl ValidateResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Errors were reported, recovered or not
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome != Outcome::Success
    }

    #[must_use]
    pub fn is_recovered_error(&self) -> bool {
        self.outcome == Outcome::RecoveredFailure
    }

    #[must_use]
    pub fn is_fatal_error(&self) -> bool {
        self.outcome == Outcome::FatalFailure
    }

    /// Errors reported, including those past the forwarding limit
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.stats.errors
    }
}

/// Result of [`Grammar::parse`] and [`Grammar::parse_tree`]
#[derive(Debug, Clone)]
pub struct ParseResult<T> {
    value: Option<T>,
    pub outcome: Outcome,
    pub position: usize,
    pub errors: Vec<Error>,
    pub stats: ParseStats,
}

impl<T> ParseResult<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome != Outcome::Success
    }

    #[must_use]
    pub fn is_recovered_error(&self) -> bool {
        self.outcome == Outcome::RecoveredFailure
    }

    #[must_use]
    pub fn is_fatal_error(&self) -> bool {
        self.outcome == Outcome::FatalFailure
    }

    /// The result, if there is one
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

struct Run {
    parsed: bool,
    values: Vec<Value>,
    position: usize,
    stats: ParseStats,
}

/// Parse the entry production of `grammar` with `handler` attached
fn run<U: CodeUnit>(grammar: &Grammar<U>, handler: &mut dyn Handler, reader: Reader<'_, U>, config: ParseConfig) -> Run {
    let entry = grammar.entry();
    let name = grammar.production(entry).map_or("?", |production| production.name());
    debug!("parsing {} units from '{name}'", reader.end() - reader.position());

    let mut reader = reader;
    let mut values = Vec::new();
    let mut context = Context::new(grammar, handler, config);
    let parsed = context.parse_production(entry, &mut reader, &mut values);
    let stats = context.stats();

    debug!(
        "'{name}' {} at {}: {} productions, {} backtracks, {} errors",
        if parsed { "finished" } else { "failed" },
        reader.position(),
        stats.productions,
        stats.backtracks,
        stats.errors,
    );
    Run {
        parsed,
        values,
        position: reader.position(),
        stats,
    }
}

impl<U: CodeUnit> Grammar<U> {
    /// Check `reader` against the grammar, sending errors to `sink`
    pub fn validate(&self, reader: Reader<'_, U>, sink: &mut dyn ErrorSink) -> ValidateResult {
        self.validate_with(reader, sink, ParseConfig::default())
    }

    pub fn validate_with(&self, reader: Reader<'_, U>, sink: &mut dyn ErrorSink, config: ParseConfig) -> ValidateResult {
        let mut handler = ValidateHandler::new(sink);
        let run = run(self, &mut handler, reader, config);
        ValidateResult {
            outcome: Outcome::from_run(run.parsed, run.stats.errors),
            position: run.position,
            stats: run.stats,
        }
    }

    /// Parse `reader` into the entry production's value.
    ///
    /// The value is present unless the entry production failed.
    pub fn parse(&self, reader: Reader<'_, U>) -> ParseResult<Value> {
        self.parse_with(reader, ParseConfig::default())
    }

    pub fn parse_with(&self, reader: Reader<'_, U>, config: ParseConfig) -> ParseResult<Value> {
        let mut handler = ValueHandler::new(self, reader.source());
        let run = run(self, &mut handler, reader, config);
        let value = run.parsed.then(|| run.values.into_iter().next().unwrap_or_default());
        ParseResult {
            value,
            outcome: Outcome::from_run(run.parsed, run.stats.errors),
            position: run.position,
            errors: handler.into_errors(),
            stats: run.stats,
        }
    }

    /// Parse `reader` into a [`ParseTree`].
    ///
    /// The tree is returned even when the entry production fails; it then
    /// holds everything up to the failure.
    pub fn parse_tree(&self, reader: Reader<'_, U>) -> ParseResult<ParseTree> {
        self.parse_tree_with(reader, ParseConfig::default(), TreeConfig::default())
    }

    pub fn parse_tree_with(&self, reader: Reader<'_, U>, config: ParseConfig, tree: TreeConfig) -> ParseResult<ParseTree> {
        let mut builder = ParseTreeBuilder::new(tree);
        let run = run(self, &mut builder, reader, config);
        let (value, errors) = match builder.finish() {
            Ok((tree, errors)) => (Some(tree), errors),
            Err(error) => {
                debug!("discarding tree: {error}");
                (None, Vec::new())
            }
        };
        ParseResult {
            value,
            outcome: Outcome::from_run(run.parsed, run.stats.errors),
            position: run.position,
            errors,
            stats: run.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::*;
    use crate::error::ErrorKind;
    use crate::grammar::GrammarBuilder;

    fn digits_grammar() -> Grammar<u8> {
        let mut builder = GrammarBuilder::new();
        let number = builder.production("number", integer::<u32, u8>(decimal()));
        builder.entry(number);
        builder.build().unwrap()
    }

    #[test]
    fn test_outcome_from_run() {
        assert_eq!(Outcome::from_run(true, 0), Outcome::Success);
        assert_eq!(Outcome::from_run(true, 2), Outcome::RecoveredFailure);
        assert_eq!(Outcome::from_run(false, 1), Outcome::FatalFailure);
    }

    #[test]
    fn test_validate_forwards_errors() {
        let grammar = digits_grammar();
        let mut errors = Vec::new();
        let result = grammar.validate(Reader::from_str("x"), &mut errors);
        assert!(result.is_fatal_error());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ExpectedDigit);
        assert_eq!(errors[0].production, "number");
    }

    #[test]
    fn test_parse_value() {
        let grammar = digits_grammar();
        let result = grammar.parse(Reader::from_str("42"));
        assert!(result.is_success());
        assert_eq!(result.position, 2);
        assert_eq!(
            result.value(),
            Some(&Value::Production {
                name: "number".into(),
                values: vec![Value::Integer(42)],
            })
        );
    }

    #[test]
    fn test_error_limit_still_counts() {
        let mut builder = GrammarBuilder::<u8>::new();
        let item = builder.production("item", try_(lit("x")));
        let items = builder.production("items", times(3, p(item)));
        builder.entry(items);
        let grammar = builder.build().unwrap();

        let mut errors = Vec::new();
        let config = ParseConfig {
            max_errors: 1,
            ..ParseConfig::default()
        };
        let result = grammar.validate_with(Reader::from_str("yyy"), &mut errors, config);
        assert!(result.is_recovered_error());
        assert_eq!(errors.len(), 1);
        assert_eq!(result.error_count(), 3);
    }
}
