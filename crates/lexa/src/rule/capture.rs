use super::{BranchKind, Rule, RuleRef, TokenKind, TryResult};
use crate::context::Context;
use crate::engine::{CodePointId, Identifier, Integer, IntegerParser, Matcher, Trie, TrieBuilder, ValueParser};
use crate::error::{ErrorKind, GrammarError};
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;
use compact_str::CompactString;
use std::marker::PhantomData;
use std::sync::Arc;

/// Rule's input as a [`Value::Lexeme`], followed by the rule's own values.
///
/// The lexeme ends where the rule stopped, before any trailing whitespace.
#[derive(Debug)]
pub struct Capture<U: CodeUnit> {
    rule: RuleRef<U>,
}

impl<U: CodeUnit> Capture<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self { rule }
    }

    fn finish(ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, begin: usize, inner: Vec<Value>) {
        values.push(Value::Lexeme(Span::new(begin, reader.position())));
        values.extend(inner);
        ctx.skip_whitespace(reader);
    }
}

impl<U: CodeUnit> Rule<U> for Capture<U> {
    fn branch_kind(&self) -> BranchKind {
        self.rule.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let begin = reader.position();
        let mut inner = Vec::new();
        let result = ctx.without_whitespace(|ctx| self.rule.try_parse(ctx, reader, &mut inner));
        if result == TryResult::Ok {
            Self::finish(ctx, reader, values, begin, inner);
        }
        result
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        let mut inner = Vec::new();
        if !ctx.without_whitespace(|ctx| self.rule.parse(ctx, reader, &mut inner)) {
            return false;
        }
        Self::finish(ctx, reader, values, begin, inner);
        true
    }
}

/// Current position as a value; reported as a zero-width token
#[derive(Debug, Clone, Copy, Default)]
pub struct Position;

impl<U: CodeUnit> Rule<U> for Position {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let position = reader.position();
        ctx.token(TokenKind::Position, position, position);
        values.push(Value::Integer(position as i128));
        true
    }
}

/// Constant value, consuming nothing
#[derive(Debug, Clone)]
pub struct Constant {
    value: Value,
}

impl Constant {
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }
}

impl<U: CodeUnit> Rule<U> for Constant {
    fn parse(&self, _ctx: &mut Context<'_, U>, _reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        values.push(self.value.clone());
        true
    }
}

/// Report a failed engine match the way a token does: error token over the
/// consumed input, then the error
fn engine_failure<U: CodeUnit>(ctx: &mut Context<'_, U>, begin: usize, failed: usize, kind: ErrorKind) {
    if failed > begin {
        ctx.token(TokenKind::Error, begin, failed);
    }
    ctx.report(kind, failed, Span::new(begin, failed));
}

/// Digits converted to an integer of type `T`, with an optional sign
#[derive(Debug)]
pub struct IntegerRule<T, U> {
    parser: IntegerParser<T>,
    signed: bool,
    _unit: PhantomData<fn(U)>,
}

impl<T: Integer, U: CodeUnit> IntegerRule<T, U> {
    #[must_use]
    pub const fn new(parser: IntegerParser<T>) -> Self {
        Self {
            parser,
            signed: false,
            _unit: PhantomData,
        }
    }

    /// Accept a leading `+` or `-`
    #[must_use]
    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    fn sign(&self, reader: &mut Reader<'_, U>) -> bool {
        if !self.signed {
            return false;
        }
        match reader.peek() {
            Some(unit) if unit.is_char(b'-') => {
                reader.bump();
                true
            }
            Some(unit) if unit.is_char(b'+') => {
                reader.bump();
                false
            }
            _ => false,
        }
    }

    fn run(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, as_branch: bool) -> TryResult {
        let start = *reader;
        let negative = self.sign(reader);
        let begin = reader.position();
        if let Err(error) = self.parser.digits().matches(reader) {
            if as_branch {
                *reader = start;
                return TryResult::Backtracked;
            }
            let kind = Matcher::<U>::error_kind(self.parser.digits(), error);
            engine_failure(ctx, start.position(), reader.position(), kind);
            return TryResult::Canceled;
        }
        let span = Span::new(begin, reader.position());
        ctx.token(TokenKind::Digits, start.position(), span.end());
        match self.parser.convert(reader, span, negative) {
            Ok(value) => values.push(Value::Integer(value.to_i128())),
            Err(_) => {
                ctx.report(ErrorKind::IntegerOverflow, begin, span);
                return TryResult::Canceled;
            }
        }
        ctx.skip_whitespace(reader);
        TryResult::Ok
    }
}

impl<T: Integer, U: CodeUnit> Rule<U> for IntegerRule<T, U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        self.run(ctx, reader, values, true)
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        self.run(ctx, reader, values, false) == TryResult::Ok
    }
}

/// Fixed-width digits naming a code point, e.g. after `\u`
#[derive(Debug, Clone, Copy)]
pub struct CodePointRule {
    engine: CodePointId,
}

impl CodePointRule {
    #[must_use]
    pub const fn new(engine: CodePointId) -> Self {
        Self { engine }
    }
}

impl<U: CodeUnit> Rule<U> for CodePointRule {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        match ValueParser::<U>::parse(&self.engine, reader) {
            Ok(c) => {
                ctx.token(TokenKind::Digits, begin, reader.position());
                values.push(Value::CodePoint(c));
                ctx.skip_whitespace(reader);
                true
            }
            Err(error) => {
                engine_failure(ctx, begin, reader.position(), CodePointId::error_kind(error));
                false
            }
        }
    }
}

/// Identifier producing its lexeme, with reserved words rejected.
///
/// A reserved identifier is reported and parsing carries on with it, so
/// the error does not stop the parse.
#[derive(Debug)]
pub struct IdentifierRule<U: CodeUnit> {
    identifier: Identifier,
    words: Vec<CompactString>,
    reserved: Option<Trie<U>>,
}

impl<U: CodeUnit> IdentifierRule<U> {
    #[must_use]
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            words: Vec::new(),
            reserved: None,
        }
    }

    /// Reject these words
    ///
    /// # Errors
    ///
    /// Fails on an empty or repeated word.
    pub fn reserve<'s>(mut self, words: impl IntoIterator<Item = &'s str>) -> Result<Self, GrammarError> {
        self.words.extend(words.into_iter().map(CompactString::from));
        self.reserved = Some(Trie::from_strings(self.words.iter().map(CompactString::as_str))?);
        Ok(self)
    }

    fn is_reserved(&self, units: &[U]) -> bool {
        self.reserved
            .as_ref()
            .is_some_and(|trie| trie.lookup(units).is_some())
    }

    fn accept(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, begin: usize) {
        let span = Span::new(begin, reader.position());
        ctx.token(TokenKind::Identifier, begin, span.end());
        if self.is_reserved(reader.slice(span)) {
            ctx.report(ErrorKind::ReservedIdentifier, begin, span);
        }
        values.push(Value::Lexeme(span));
        ctx.skip_whitespace(reader);
    }
}

impl<U: CodeUnit> Rule<U> for IdentifierRule<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let begin = reader.position();
        if self.identifier.matches(reader).is_err() {
            reader.reset(begin);
            return TryResult::Backtracked;
        }
        self.accept(ctx, reader, values, begin);
        TryResult::Ok
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        match Matcher::<U>::matches(&self.identifier, reader) {
            Ok(()) => {
                self.accept(ctx, reader, values, begin);
                true
            }
            Err(error) => {
                let kind = Matcher::<U>::error_kind(&self.identifier, error);
                engine_failure(ctx, begin, reader.position(), kind);
                false
            }
        }
    }
}

/// Map from strings to values, looked up by [`Symbol`]
#[derive(Debug, Clone)]
pub struct SymbolTable<U> {
    trie: Trie<U>,
    values: Vec<Value>,
}

impl<U: CodeUnit> SymbolTable<U> {
    /// Table from `(string, value)` pairs
    ///
    /// # Errors
    ///
    /// Fails on an empty or repeated string.
    pub fn new<'s>(entries: impl IntoIterator<Item = (&'s str, Value)>) -> Result<Self, GrammarError> {
        let mut builder = TrieBuilder::new();
        let mut values = Vec::new();
        for (text, value) in entries {
            builder.insert(&U::encode(text), values.len() as u32)?;
            values.push(value);
        }
        Ok(Self {
            trie: builder.build(),
            values,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a string that is exactly in the table
    #[must_use]
    pub fn get(&self, units: &[U]) -> Option<&Value> {
        self.trie
            .lookup(units)
            .and_then(|index| self.values.get(index as usize))
    }

    fn longest(&self, reader: &mut Reader<'_, U>) -> Option<&Value> {
        self.trie
            .longest_match(reader)
            .and_then(|index| self.values.get(index as usize))
    }
}

/// Symbol lookup.
///
/// With a token, the token's lexeme must be exactly in the table; without
/// one, the longest table entry at the reader is taken. The entry's value
/// is produced.
#[derive(Debug)]
pub struct Symbol<U: CodeUnit> {
    table: Arc<SymbolTable<U>>,
    token: Option<RuleRef<U>>,
}

impl<U: CodeUnit> Symbol<U> {
    #[must_use]
    pub const fn new(table: Arc<SymbolTable<U>>, token: Option<RuleRef<U>>) -> Self {
        Self { table, token }
    }

    fn run(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, as_branch: bool) -> TryResult {
        let start = *reader;
        let Some(token) = &self.token else {
            return match self.table.longest(reader) {
                Some(value) => {
                    ctx.token(TokenKind::Identifier, start.position(), reader.position());
                    values.push(value.clone());
                    ctx.skip_whitespace(reader);
                    TryResult::Ok
                }
                None if as_branch => TryResult::Backtracked,
                None => {
                    let position = start.position();
                    ctx.report(ErrorKind::UnknownSymbol, position, Span::empty(position));
                    TryResult::Canceled
                }
            };
        };

        // the lexeme ends before the whitespace the token skips
        let mut scratch = Vec::new();
        let mut end = start;
        let result = if as_branch {
            // nothing is reported until the lexeme is known to be a symbol
            ctx.speculate(|scratch_ctx| {
                scratch_ctx.without_whitespace(|scratch_ctx| token.try_parse(scratch_ctx, &mut end, &mut scratch))
            })
        } else if ctx.without_whitespace(|ctx| token.parse(ctx, &mut end, &mut scratch)) {
            TryResult::Ok
        } else {
            TryResult::Canceled
        };
        if result != TryResult::Ok {
            if !as_branch {
                *reader = end;
            }
            return result;
        }

        let span = Span::new(start.position(), end.position());
        match self.table.get(end.slice(span)) {
            Some(value) => {
                if as_branch {
                    ctx.without_whitespace(|ctx| token.parse(ctx, reader, &mut Vec::new()));
                } else {
                    *reader = end;
                }
                values.push(value.clone());
                ctx.skip_whitespace(reader);
                TryResult::Ok
            }
            None if as_branch => TryResult::Backtracked,
            None => {
                *reader = end;
                ctx.report(ErrorKind::UnknownSymbol, span.begin(), span);
                TryResult::Canceled
            }
        }
    }
}

impl<U: CodeUnit> Rule<U> for Symbol<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        self.run(ctx, reader, values, true)
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        self.run(ctx, reader, values, false) == TryResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table_lookup() {
        let table = SymbolTable::<u8>::new([
            ("amp", Value::CodePoint('&')),
            ("lt", Value::CodePoint('<')),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b"lt"), Some(&Value::CodePoint('<')));
        assert_eq!(table.get(b"l"), None);

        let mut reader = Reader::from_str("ampersand");
        assert_eq!(table.longest(&mut reader), Some(&Value::CodePoint('&')));
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_symbol_table_rejects_duplicates() {
        let result = SymbolTable::<u8>::new([("a", Value::Nothing), ("a", Value::Nothing)]);
        assert!(matches!(result, Err(GrammarError::DuplicateString { .. })));
    }
}
