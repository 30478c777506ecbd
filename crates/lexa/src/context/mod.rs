//! # Parse Context
//!
//! State threaded through one descent over the input.
//!
//! ## Overview
//!
//! The [`Context`] owns two stacks:
//!
//! - **Frames**: one per active production, holding the production, the
//!   whitespace rule in effect and the height of the binding stack when the
//!   production started.
//! - **Bindings**: keyed scratch state ([`Var`] to [`Binding`]) used by
//!   context-sensitive rules and by loops for their break flag. Lookups
//!   search from the top, so an inner binding shadows an outer one with the
//!   same key. Bindings pushed inside a production disappear when it
//!   finishes, fails or backtracks.
//!
//! Every side effect goes through the [`Handler`], which is what decides
//! whether the parse builds values, a tree, or nothing at all.
//!
//! ## Whitespace
//!
//! Whitespace is skipped automatically after every token, after a token
//! production, and at the start of the root production. Productions inherit
//! the whitespace rule of their caller unless they override it; token
//! productions have none. While whitespace is being skipped the context does
//! not skip again, and everything the whitespace rule matches is reported as
//! a single [`TokenKind::Whitespace`] token.

mod handler;

pub use handler::{Handler, NullHandler, ProductionMarker};

use crate::config::ParseConfig;
use crate::error::{Error, ErrorKind};
use crate::grammar::{Grammar, Production, ProductionId, ProductionInfo};
use crate::input::{CodeUnit, Reader, Span};
use crate::rule::{RuleRef, TokenKind, TryResult};
use crate::value::{Sink, Value};
use log::trace;

/// Key of a context binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(&'static str);

impl Var {
    /// Break flag of the innermost loop
    pub(crate) const LOOP_BREAK: Self = Self("<loop break>");

    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

/// Value of a context binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Flag(bool),
    Counter(i64),
    Lexeme(Span),
}

/// Counters collected during one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Productions entered
    pub productions: usize,
    /// Productions that backtracked
    pub backtracks: usize,
    /// Tokens reported to the handler, whitespace included
    pub tokens: usize,
    /// Errors reported, including those past the forwarding limit
    pub errors: usize,
}

#[derive(Debug)]
struct Frame<'c, U: CodeUnit> {
    production: &'c Production<U>,
    whitespace: Option<&'c RuleRef<U>>,
    bindings: usize,
}

impl<U: CodeUnit> Clone for Frame<'_, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U: CodeUnit> Copy for Frame<'_, U> {}

/// Environment of one parse
pub struct Context<'c, U: CodeUnit> {
    grammar: &'c Grammar<U>,
    handler: &'c mut dyn Handler,
    config: ParseConfig,
    frames: Vec<Frame<'c, U>>,
    bindings: Vec<(Var, Binding)>,
    in_whitespace: bool,
    no_whitespace: u32,
    muted: u32,
    stats: ParseStats,
}

impl<'c, U: CodeUnit> Context<'c, U> {
    pub fn new(grammar: &'c Grammar<U>, handler: &'c mut dyn Handler, config: ParseConfig) -> Self {
        Self {
            grammar,
            handler,
            config,
            frames: Vec::new(),
            bindings: Vec::new(),
            in_whitespace: false,
            no_whitespace: 0,
            muted: 0,
            stats: ParseStats::default(),
        }
    }

    #[must_use]
    pub const fn grammar(&self) -> &'c Grammar<U> {
        self.grammar
    }

    #[must_use]
    pub const fn config(&self) -> &ParseConfig {
        &self.config
    }

    #[must_use]
    pub const fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Number of active productions
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Production currently running
    #[must_use]
    pub fn production(&self) -> Option<&'c ProductionInfo> {
        self.frames.last().map(|frame| frame.production.info())
    }

    /// Whether whitespace is being skipped right now
    #[must_use]
    pub const fn is_skipping_whitespace(&self) -> bool {
        self.in_whitespace
    }

    /// Report a token to the handler.
    pub fn token(&mut self, kind: TokenKind, begin: usize, end: usize) {
        if self.muted > 0 {
            return;
        }
        self.stats.tokens += 1;
        self.handler.token(kind, begin, end);
    }

    /// Report an error on behalf of the current production.
    pub fn error(&mut self, error: Error) {
        self.stats.errors += 1;
        if self.stats.errors > self.config.max_errors {
            trace!("dropping error past limit: {error}");
            return;
        }
        match self.frames.last() {
            Some(frame) => self.handler.error(frame.production.info(), error),
            None => self.handler.error(&ProductionInfo::detached(), error),
        }
    }

    /// Report an error of `kind` detected at `position` and covering `span`
    pub fn report(&mut self, kind: ErrorKind, position: usize, span: Span) {
        let name = self.production().map_or("", |info| info.name.as_str());
        let error = Error::new(name, position, span, kind);
        self.error(error);
    }

    /// Sink for a list or loop in the current production
    pub fn sink(&mut self) -> Box<dyn Sink> {
        match self.frames.last() {
            Some(frame) => self.handler.get_sink(frame.production.info()),
            None => self.handler.get_sink(&ProductionInfo::detached()),
        }
    }

    /// Skip whitespace with the rule in effect, if any.
    pub fn skip_whitespace(&mut self, reader: &mut Reader<'_, U>) {
        if self.in_whitespace || self.no_whitespace > 0 {
            return;
        }
        let Some(whitespace) = self.frames.last().and_then(|frame| frame.whitespace) else {
            return;
        };
        self.run_whitespace(whitespace, reader);
    }

    /// Skip input matched by `whitespace`, reporting it as one token.
    ///
    /// The rule is applied repeatedly until it backtracks, fails or stops
    /// making progress.
    pub fn run_whitespace(&mut self, whitespace: &RuleRef<U>, reader: &mut Reader<'_, U>) {
        let begin = reader.position();
        let was_skipping = self.in_whitespace;
        self.in_whitespace = true;
        self.muted += 1;

        let mut scratch = Vec::new();
        loop {
            let before = reader.position();
            let result = whitespace.try_parse(self, reader, &mut scratch);
            scratch.clear();
            if result != TryResult::Ok || reader.position() == before {
                break;
            }
        }

        self.muted -= 1;
        self.in_whitespace = was_skipping;
        if reader.position() > begin {
            self.token(TokenKind::Whitespace, begin, reader.position());
        }
    }

    /// Run `f` with automatic whitespace skipping disabled
    pub fn without_whitespace<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.no_whitespace += 1;
        let result = f(self);
        self.no_whitespace -= 1;
        result
    }

    /// Run `f` against a throwaway context that shares the grammar, frames
    /// and bindings but reports to a [`NullHandler`].
    ///
    /// Nothing `f` does is visible to the real handler, errors included.
    pub fn speculate<T>(&mut self, f: impl FnOnce(&mut Context<'_, U>) -> T) -> T {
        let mut handler = NullHandler;
        let mut scratch = Context {
            grammar: self.grammar,
            handler: &mut handler,
            config: self.config,
            frames: self.frames.clone(),
            bindings: self.bindings.clone(),
            in_whitespace: self.in_whitespace,
            no_whitespace: self.no_whitespace,
            muted: 0,
            stats: ParseStats::default(),
        };
        f(&mut scratch)
    }

    /// Parse production `id` unconditionally.
    ///
    /// Returns `false` if it failed; its error was reported already.
    pub fn parse_production(&mut self, id: ProductionId, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        self.run_production(id, reader, values, false) == TryResult::Ok
    }

    /// Parse production `id` as a branch.
    pub fn try_parse_production(
        &mut self,
        id: ProductionId,
        reader: &mut Reader<'_, U>,
        values: &mut Vec<Value>,
    ) -> TryResult {
        self.run_production(id, reader, values, true)
    }

    fn run_production(
        &mut self,
        id: ProductionId,
        reader: &mut Reader<'_, U>,
        values: &mut Vec<Value>,
        as_branch: bool,
    ) -> TryResult {
        let grammar = self.grammar;
        let Some(production) = grammar.production(id) else {
            let position = reader.position();
            self.report(
                ErrorKind::custom(format!("unknown production {}", id.raw())),
                position,
                Span::empty(position),
            );
            return TryResult::Canceled;
        };
        let info = production.info();
        let begin = *reader;
        self.stats.productions += 1;
        trace!("enter {} at {}", info.name, begin.position());

        let whitespace = if info.token {
            None
        } else if let Some(own) = production.whitespace() {
            Some(own)
        } else if let Some(frame) = self.frames.last() {
            frame.whitespace
        } else {
            grammar.whitespace()
        };

        let marker = if self.muted == 0 {
            self.handler.start_production(info, begin.position())
        } else {
            ProductionMarker::default()
        };
        let is_root = self.frames.is_empty();
        self.frames.push(Frame {
            production,
            whitespace,
            bindings: self.bindings.len(),
        });

        if is_root && self.config.skip_leading_whitespace {
            self.skip_whitespace(reader);
        }

        let mut collected = Vec::new();
        let rule = production.rule();
        let result = if as_branch {
            rule.try_parse(self, reader, &mut collected)
        } else if rule.parse(self, reader, &mut collected) {
            TryResult::Ok
        } else {
            TryResult::Canceled
        };

        let frame = self.frames.pop();
        if let Some(frame) = frame {
            self.bindings.truncate(frame.bindings);
        }

        match result {
            TryResult::Ok => {
                trace!("exit {} at {}", info.name, reader.position());
                if self.muted == 0 {
                    let value = self
                        .handler
                        .finish_production(info, marker, collected, reader.position());
                    if !value.is_nothing() {
                        values.push(value);
                    }
                }
                if info.token {
                    self.skip_whitespace(reader);
                }
            }
            TryResult::Backtracked => {
                trace!("backtrack {} to {}", info.name, begin.position());
                self.stats.backtracks += 1;
                *reader = begin;
                if self.muted == 0 {
                    self.handler.backtrack_production(info, marker);
                }
            }
            TryResult::Canceled => {
                trace!("cancel {} at {}", info.name, reader.position());
                if self.muted == 0 {
                    self.handler.cancel_production(info, marker, reader.position());
                }
            }
        }
        result
    }

    /// Push a binding visible until the current production ends or the
    /// bindings are restored to an earlier mark
    pub fn bind(&mut self, var: Var, binding: Binding) {
        self.bindings.push((var, binding));
    }

    /// Innermost binding of `var`
    #[must_use]
    pub fn binding(&self, var: Var) -> Option<&Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|(key, _)| *key == var)
            .map(|(_, binding)| binding)
    }

    /// Innermost binding of `var`, mutably
    pub fn binding_mut(&mut self, var: Var) -> Option<&mut Binding> {
        self.bindings
            .iter_mut()
            .rev()
            .find(|(key, _)| *key == var)
            .map(|(_, binding)| binding)
    }

    /// Height of the binding stack, for [`restore_bindings`](Self::restore_bindings)
    #[must_use]
    pub fn bindings_mark(&self) -> usize {
        self.bindings.len()
    }

    /// Pop bindings pushed after `mark`
    pub fn restore_bindings(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }
}

impl<U: CodeUnit> std::fmt::Debug for Context<'_, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.frames.len())
            .field("bindings", &self.bindings)
            .field("in_whitespace", &self.in_whitespace)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::*;
    use crate::grammar::GrammarBuilder;

    /// Records events as strings
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Handler for Recorder {
        fn start_production(&mut self, info: &ProductionInfo, position: usize) -> ProductionMarker {
            self.events.push(format!("start {}@{position}", info.name));
            ProductionMarker {
                begin: position,
                state: 0,
            }
        }

        fn token(&mut self, kind: TokenKind, begin: usize, end: usize) {
            self.events.push(format!("{kind} {begin}..{end}"));
        }

        fn finish_production(
            &mut self,
            info: &ProductionInfo,
            _marker: ProductionMarker,
            _values: Vec<Value>,
            position: usize,
        ) -> Value {
            self.events.push(format!("finish {}@{position}", info.name));
            Value::Nothing
        }

        fn backtrack_production(&mut self, info: &ProductionInfo, _marker: ProductionMarker) {
            self.events.push(format!("backtrack {}", info.name));
        }

        fn error(&mut self, _info: &ProductionInfo, error: Error) {
            self.events.push(format!("error {}", error.kind.tag()));
        }
    }

    fn run(grammar: &Grammar<u8>, input: &str) -> (bool, Vec<String>) {
        let mut recorder = Recorder::default();
        let mut reader = Reader::from_str(input);
        let parsed = {
            let mut context = Context::new(grammar, &mut recorder, ParseConfig::default());
            context.parse_production(grammar.entry(), &mut reader, &mut Vec::new())
        };
        (parsed, recorder.events)
    }

    #[test]
    fn test_whitespace_reported_once() {
        let mut builder = GrammarBuilder::<u8>::new();
        builder.production("pair", seq![lit("a"), lit("b")]);
        builder.whitespace(ascii::space());
        let grammar = builder.build().unwrap();

        let (parsed, events) = run(&grammar, " a \t b");
        assert!(parsed);
        let whitespace: Vec<_> = events.iter().filter(|event| event.starts_with("whitespace")).collect();
        assert_eq!(whitespace.len(), 2);
        assert_eq!(events.first().map(String::as_str), Some("start pair@0"));
    }

    #[test]
    fn test_token_production_has_no_inner_whitespace() {
        let mut builder = GrammarBuilder::<u8>::new();
        let root = builder.declare("root");
        let word = builder.declare("word");
        builder.define(root, seq![p(word), lit(";")]);
        builder.define(word, seq![lit("a"), lit("b")]).token();
        builder.whitespace(ascii::space());
        let grammar = builder.build().unwrap();

        assert!(run(&grammar, "ab ;").0);
        assert!(!run(&grammar, "a b;").0);
    }

    #[test]
    fn test_backtrack_reported_for_branch() {
        let mut builder = GrammarBuilder::<u8>::new();
        let root = builder.declare("root");
        let x = builder.production("x", lit("x"));
        builder.define(root, opt(p(x)));
        let grammar = builder.build().unwrap();

        let (parsed, events) = run(&grammar, "y");
        assert!(parsed);
        assert_eq!(events, ["start root@0", "start x@0", "backtrack x", "finish root@0"]);
    }

    #[test]
    fn test_bindings_shadow_and_scope() {
        let mut builder = GrammarBuilder::<u8>::new();
        builder.production("root", lit("a"));
        let grammar = builder.build().unwrap();
        let mut handler = NullHandler;
        let mut context = Context::new(&grammar, &mut handler, ParseConfig::default());

        let var = Var::new("depth");
        let mark = context.bindings_mark();
        context.bind(var, Binding::Counter(1));
        context.bind(var, Binding::Counter(2));
        assert_eq!(context.binding(var), Some(&Binding::Counter(2)));

        if let Some(Binding::Counter(value)) = context.binding_mut(var) {
            *value += 1;
        }
        context.restore_bindings(mark + 1);
        assert_eq!(context.binding(var), Some(&Binding::Counter(1)));
        context.restore_bindings(mark);
        assert_eq!(context.binding(var), None);
    }

    #[test]
    fn test_speculation_is_invisible() {
        let mut builder = GrammarBuilder::<u8>::new();
        let root = builder.production("root", lit("a"));
        let grammar = builder.build().unwrap();
        let mut recorder = Recorder::default();
        {
            let mut context = Context::new(&grammar, &mut recorder, ParseConfig::default());
            let mut reader = Reader::from_str("b");
            let parsed = context.speculate(|scratch| scratch.parse_production(root, &mut reader, &mut Vec::new()));
            assert!(!parsed);
            assert_eq!(context.stats(), ParseStats::default());
        }
        assert!(recorder.events.is_empty());
    }
}
