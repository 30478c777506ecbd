//! Lists of items with optional separators.
//!
//! A plain [`List`] ends as soon as the next item (or separator) does not
//! match. A [`TerminatedList`] knows the token that ends it and can
//! therefore recover from malformed items: it skips input until a
//! separator, an item start or the terminator shows up again.

use super::{BranchKind, Rule, RuleRef, TokenKind, TryResult, probe};
use crate::context::Context;
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::{Sink, Value};
use log::trace;
use std::sync::Arc;

/// What a separator that is not followed by an item means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailing {
    /// Report [`ErrorKind::UnexpectedTrailingSeparator`]; the list still succeeds
    Forbid,
    /// Accept it silently
    Allow,
}

/// Separator between list items
#[derive(Debug, Clone)]
pub struct Separator<U: CodeUnit> {
    rule: RuleRef<U>,
    trailing: Trailing,
}

impl<U: CodeUnit> Separator<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>, trailing: Trailing) -> Self {
        Self { rule, trailing }
    }

    #[must_use]
    pub const fn trailing(&self) -> Trailing {
        self.trailing
    }

    fn trailing_error(&self, ctx: &mut Context<'_, U>, span: Span) {
        if self.trailing == Trailing::Forbid {
            ctx.report(ErrorKind::UnexpectedTrailingSeparator, span.begin(), span);
        }
    }
}

fn push_item(sink: &mut dyn Sink, values: &mut Vec<Value>) {
    sink.push(std::mem::take(values));
}

fn finish_into(sink: Box<dyn Sink>, values: &mut Vec<Value>) {
    let value = sink.finish();
    if !value.is_nothing() {
        values.push(value);
    }
}

/// One or more items, optionally separated.
///
/// Items go to the sink of the current production; the finished sink value
/// is the list's only value.
#[derive(Debug)]
pub struct List<U: CodeUnit> {
    item: RuleRef<U>,
    separator: Option<Separator<U>>,
}

impl<U: CodeUnit> List<U> {
    #[must_use]
    pub const fn new(item: RuleRef<U>, separator: Option<Separator<U>>) -> Self {
        Self { item, separator }
    }

    /// Items after the first one
    fn rest(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, sink: &mut dyn Sink) -> bool {
        let mut item_values = Vec::new();
        loop {
            let before = reader.position();
            if let Some(separator) = &self.separator {
                match separator.rule.try_parse(ctx, reader, &mut item_values) {
                    TryResult::Ok => {}
                    TryResult::Backtracked => return true,
                    TryResult::Canceled => return false,
                }
                let separator_end = reader.position();
                item_values.clear();
                match self.item.try_parse(ctx, reader, &mut item_values) {
                    TryResult::Ok => push_item(sink, &mut item_values),
                    TryResult::Canceled => return false,
                    TryResult::Backtracked => {
                        separator.trailing_error(ctx, Span::new(before, separator_end));
                        return true;
                    }
                }
            } else {
                match self.item.try_parse(ctx, reader, &mut item_values) {
                    TryResult::Ok => push_item(sink, &mut item_values),
                    TryResult::Backtracked => return true,
                    TryResult::Canceled => return false,
                }
            }
            if reader.position() == before {
                return true;
            }
        }
    }
}

impl<U: CodeUnit> Rule<U> for List<U> {
    fn branch_kind(&self) -> BranchKind {
        self.item.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let mut sink = ctx.sink();
        let mut item_values = Vec::new();
        match self.item.try_parse(ctx, reader, &mut item_values) {
            TryResult::Ok => push_item(sink.as_mut(), &mut item_values),
            other => return other,
        }
        if !self.rest(ctx, reader, sink.as_mut()) {
            return TryResult::Canceled;
        }
        finish_into(sink, values);
        TryResult::Ok
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let mut sink = ctx.sink();
        let mut item_values = Vec::new();
        if !self.item.parse(ctx, reader, &mut item_values) {
            return false;
        }
        push_item(sink.as_mut(), &mut item_values);
        if !self.rest(ctx, reader, sink.as_mut()) {
            return false;
        }
        finish_into(sink, values);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Terminator,
    Separator,
    TrailingSeparator(Span),
    Item,
    Recovery,
}

/// List running until its terminator, with error recovery.
///
/// Each step is one state:
///
/// - `Terminator`: try the terminator; done if it matches.
/// - `Separator`: parse the separator (only after at least one item).
/// - `TrailingSeparator`: a separator was just read; if the terminator
///   follows, it was trailing.
/// - `Item`: parse one item.
/// - `Recovery`: skip input until, in order of preference, a separator, an
///   item start (only for lists without separator), or the terminator. The
///   limit tokens and the end of input make recovery fail.
#[derive(Debug)]
pub struct TerminatedList<U: CodeUnit> {
    terminator: RuleRef<U>,
    item: RuleRef<U>,
    separator: Option<Separator<U>>,
    limit: Vec<RuleRef<U>>,
    optional: bool,
}

impl<U: CodeUnit> TerminatedList<U> {
    #[must_use]
    pub const fn new(terminator: RuleRef<U>, item: RuleRef<U>, separator: Option<Separator<U>>) -> Self {
        Self {
            terminator,
            item,
            separator,
            limit: Vec::new(),
            optional: false,
        }
    }

    /// Allow the list to be empty
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Tokens at which recovery gives up
    #[must_use]
    pub fn limit(mut self, limit: Vec<RuleRef<U>>) -> Self {
        self.limit = limit;
        self
    }

    fn recover_to(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>) -> Option<State> {
        let begin = reader.position();
        trace!("list recovery from {begin}");
        let state = loop {
            if let Some(separator) = &self.separator
                && probe(ctx, separator.rule.as_ref(), reader) == TryResult::Ok
            {
                break Some(State::Separator);
            }
            if self.separator.is_none()
                && reader.position() > begin
                && probe(ctx, self.item.as_ref(), reader) != TryResult::Backtracked
            {
                break Some(State::Item);
            }
            if probe(ctx, self.terminator.as_ref(), reader) == TryResult::Ok {
                break Some(State::Terminator);
            }
            let limited = self
                .limit
                .iter()
                .any(|limit| probe(ctx, limit.as_ref(), reader) == TryResult::Ok);
            if limited || reader.is_eof() {
                break None;
            }
            reader.bump();
        };
        if reader.position() > begin {
            ctx.token(TokenKind::Error, begin, reader.position());
        }
        state
    }
}

impl<U: CodeUnit> Rule<U> for TerminatedList<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let mut sink = ctx.sink();
        let mut item_values = Vec::new();
        let mut closing = Vec::new();
        let mut items = 0usize;
        let mut state = if self.optional { State::Terminator } else { State::Item };

        loop {
            state = match state {
                State::Terminator => match self.terminator.try_parse(ctx, reader, &mut closing) {
                    TryResult::Ok => break,
                    TryResult::Canceled => return false,
                    TryResult::Backtracked if self.separator.is_some() && items > 0 => State::Separator,
                    TryResult::Backtracked => State::Item,
                },
                State::Separator => {
                    let Some(separator) = &self.separator else {
                        return false;
                    };
                    let begin = reader.position();
                    if separator.rule.parse(ctx, reader, &mut item_values) {
                        item_values.clear();
                        State::TrailingSeparator(Span::new(begin, reader.position()))
                    } else {
                        State::Recovery
                    }
                }
                State::TrailingSeparator(span) => match self.terminator.try_parse(ctx, reader, &mut closing) {
                    TryResult::Ok => {
                        if let Some(separator) = &self.separator {
                            separator.trailing_error(ctx, span);
                        }
                        break;
                    }
                    TryResult::Canceled => return false,
                    TryResult::Backtracked => State::Item,
                },
                State::Item => {
                    item_values.clear();
                    if self.item.parse(ctx, reader, &mut item_values) {
                        items += 1;
                        push_item(sink.as_mut(), &mut item_values);
                        State::Terminator
                    } else {
                        State::Recovery
                    }
                }
                State::Recovery => match self.recover_to(ctx, reader) {
                    Some(next) => next,
                    None => return false,
                },
            };
        }

        finish_into(sink, values);
        values.append(&mut closing);
        true
    }
}

/// `terminator(t)`: builds lists ending in `t`
#[derive(Debug, Clone)]
pub struct Terminator<U: CodeUnit> {
    terminator: RuleRef<U>,
    limit: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Terminator<U> {
    #[must_use]
    pub const fn new(terminator: RuleRef<U>) -> Self {
        Self {
            terminator,
            limit: Vec::new(),
        }
    }

    /// Tokens at which recovery gives up
    #[must_use]
    pub fn limit(mut self, limit: Vec<RuleRef<U>>) -> Self {
        self.limit = limit;
        self
    }

    /// The terminator rule itself
    #[must_use]
    pub fn rule(&self) -> RuleRef<U> {
        Arc::clone(&self.terminator)
    }

    /// One or more items followed by the terminator
    #[must_use]
    pub fn list(&self, item: RuleRef<U>, separator: Option<Separator<U>>) -> TerminatedList<U> {
        TerminatedList::new(Arc::clone(&self.terminator), item, separator).limit(self.limit.clone())
    }

    /// Zero or more items followed by the terminator
    #[must_use]
    pub fn opt_list(&self, item: RuleRef<U>, separator: Option<Separator<U>>) -> TerminatedList<U> {
        self.list(item, separator).optional()
    }
}

/// `brackets(open, close)`: lists between an opening and a closing token.
///
/// Recovery inside the list stops at the closing token, and gives up at
/// any of the limit tokens.
#[derive(Debug, Clone)]
pub struct Brackets<U: CodeUnit> {
    open: RuleRef<U>,
    close: Terminator<U>,
}

impl<U: CodeUnit> Brackets<U> {
    #[must_use]
    pub const fn new(open: RuleRef<U>, close: RuleRef<U>) -> Self {
        Self {
            open,
            close: Terminator::new(close),
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: Vec<RuleRef<U>>) -> Self {
        self.close = self.close.limit(limit);
        self
    }

    /// `open`, one or more items, `close`
    #[must_use]
    pub fn list(&self, item: RuleRef<U>, separator: Option<Separator<U>>) -> RuleRef<U> {
        self.wrap(self.close.list(item, separator))
    }

    /// `open`, zero or more items, `close`
    #[must_use]
    pub fn opt_list(&self, item: RuleRef<U>, separator: Option<Separator<U>>) -> RuleRef<U> {
        self.wrap(self.close.opt_list(item, separator))
    }

    fn wrap(&self, list: TerminatedList<U>) -> RuleRef<U> {
        Arc::new(super::branch::Seq::new(vec![Arc::clone(&self.open), Arc::new(list)]))
    }
}
