use super::{Rule, RuleRef, Token, TokenKind, TryResult};
use crate::context::Context;
use crate::engine::{CharClass, peek_match};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::{Sink, Value};

#[derive(Debug)]
enum EscapeAction<U: CodeUnit> {
    /// A single unit standing for a value, e.g. `n` for a newline
    Map { unit: u32, value: Value },
    /// Arbitrary rule producing the value, e.g. `u` followed by hex digits
    Rule(RuleRef<U>),
    /// Any unit of the class, taken literally
    Capture(CharClass),
}

/// Escape sequences inside delimited content: an introducer token followed
/// by one of several alternatives.
#[derive(Debug)]
pub struct Escape<U: CodeUnit> {
    introducer: Token<U>,
    actions: Vec<EscapeAction<U>>,
}

impl<U: CodeUnit> Escape<U> {
    #[must_use]
    pub const fn new(introducer: Token<U>) -> Self {
        Self {
            introducer,
            actions: Vec::new(),
        }
    }

    /// `introducer` followed by `from` produces `value`
    #[must_use]
    pub fn map(mut self, from: char, value: impl Into<Value>) -> Self {
        self.actions.push(EscapeAction::Map {
            unit: from as u32,
            value: value.into(),
        });
        self
    }

    /// `introducer` followed by whatever `rule` matches; the rule's values
    /// are the escape's values
    #[must_use]
    pub fn rule(mut self, rule: RuleRef<U>) -> Self {
        self.actions.push(EscapeAction::Rule(rule));
        self
    }

    /// `introducer` followed by any unit of `class`, which stands for itself
    #[must_use]
    pub fn capture(mut self, class: CharClass) -> Self {
        self.actions.push(EscapeAction::Capture(class));
        self
    }

    /// After the introducer: run the first alternative that applies.
    fn sequence(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        for action in &self.actions {
            match action {
                EscapeAction::Map { unit, value } => {
                    if reader.peek().is_some_and(|next| next.to_u32() == *unit) {
                        let begin = reader.position();
                        reader.bump();
                        ctx.token(TokenKind::Literal, begin, reader.position());
                        values.push(value.clone());
                        return TryResult::Ok;
                    }
                }
                EscapeAction::Capture(class) => {
                    if reader.peek().is_some_and(|next| class.matches_unit(next)) {
                        let begin = reader.position();
                        reader.bump();
                        ctx.token(TokenKind::Literal, begin, reader.position());
                        values.push(Value::Lexeme(Span::new(begin, reader.position())));
                        return TryResult::Ok;
                    }
                }
                EscapeAction::Rule(rule) => match rule.try_parse(ctx, reader, values) {
                    TryResult::Backtracked => {}
                    taken => return taken,
                },
            }
        }
        TryResult::Backtracked
    }
}

/// Content between an opening and a closing delimiter.
///
/// Runs of content units become one token and one [`Value::Lexeme`];
/// escape sequences contribute their own values. Everything goes through
/// the production's sink, in input order. A unit outside the content class
/// is reported and skipped. Reaching the end of input before the closing
/// delimiter is an error.
#[derive(Debug)]
pub struct Delimited<U: CodeUnit> {
    open: RuleRef<U>,
    close: RuleRef<U>,
    content: CharClass,
    escapes: Vec<Escape<U>>,
}

impl<U: CodeUnit> Delimited<U> {
    #[must_use]
    pub fn new(open: RuleRef<U>, close: RuleRef<U>) -> Self {
        Self {
            open,
            close,
            content: CharClass::Any,
            escapes: Vec::new(),
        }
    }

    /// Units allowed as content; anything by default
    #[must_use]
    pub fn content(mut self, content: CharClass) -> Self {
        self.content = content;
        self
    }

    #[must_use]
    pub fn escape(mut self, escape: Escape<U>) -> Self {
        self.escapes.push(escape);
        self
    }

    fn flush(ctx: &mut Context<'_, U>, sink: &mut dyn Sink, run: &mut Option<usize>, end: usize) {
        if let Some(begin) = run.take() {
            ctx.token(TokenKind::Unknown, begin, end);
            sink.push(vec![Value::Lexeme(Span::new(begin, end))]);
        }
    }

    /// Content up to and including the closing delimiter
    fn body(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, open_begin: usize) -> bool {
        let mut sink = ctx.sink();
        let mut closing = Vec::new();
        let mut run: Option<usize> = None;

        'content: loop {
            let position = reader.position();
            // A pending run is reported before the closing delimiter
            let try_close = match run {
                Some(_) => {
                    let mut lookahead = *reader;
                    let ahead = ctx.speculate(|scratch| self.close.try_parse(scratch, &mut lookahead, &mut Vec::new()));
                    let closes = ahead != TryResult::Backtracked;
                    if closes {
                        Self::flush(ctx, sink.as_mut(), &mut run, position);
                    }
                    closes
                }
                None => true,
            };
            if try_close {
                match self.close.try_parse(ctx, reader, &mut closing) {
                    TryResult::Ok => break,
                    TryResult::Canceled => return false,
                    TryResult::Backtracked => {}
                }
            }

            let Some(unit) = reader.peek() else {
                Self::flush(ctx, sink.as_mut(), &mut run, position);
                ctx.report(ErrorKind::MissingDelimiter, position, Span::new(open_begin, position));
                return false;
            };

            for escape in &self.escapes {
                if !peek_match(escape.introducer.engine(), reader) {
                    continue;
                }
                Self::flush(ctx, sink.as_mut(), &mut run, position);
                let mut escape_values = Vec::new();
                if !escape.introducer.parse(ctx, reader, &mut escape_values) {
                    return false;
                }
                match escape.sequence(ctx, reader, &mut escape_values) {
                    TryResult::Ok => sink.push(escape_values),
                    TryResult::Canceled => return false,
                    TryResult::Backtracked => {
                        let end = reader.position();
                        ctx.report(ErrorKind::InvalidEscapeSequence, position, Span::new(position, end));
                    }
                }
                continue 'content;
            }

            if self.content.matches_unit(unit) {
                run.get_or_insert(position);
                reader.bump();
            } else {
                Self::flush(ctx, sink.as_mut(), &mut run, position);
                reader.bump();
                let end = reader.position();
                ctx.token(TokenKind::Error, position, end);
                ctx.report(
                    ErrorKind::expected_char_class(self.content.name()),
                    position,
                    Span::new(position, end),
                );
            }
        }

        let value = sink.finish();
        if !value.is_nothing() {
            values.push(value);
        }
        values.append(&mut closing);
        true
    }
}

impl<U: CodeUnit> Rule<U> for Delimited<U> {
    fn branch_kind(&self) -> super::BranchKind {
        self.open.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let begin = reader.position();
        let taken = ctx.without_whitespace(|ctx| match self.open.try_parse(ctx, reader, values) {
            TryResult::Ok if self.body(ctx, reader, values, begin) => TryResult::Ok,
            TryResult::Ok => TryResult::Canceled,
            other => other,
        });
        if taken == TryResult::Ok {
            ctx.skip_whitespace(reader);
        }
        taken
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        let parsed = ctx.without_whitespace(|ctx| {
            self.open.parse(ctx, reader, values) && self.body(ctx, reader, values, begin)
        });
        if parsed {
            ctx.skip_whitespace(reader);
        }
        parsed
    }
}
