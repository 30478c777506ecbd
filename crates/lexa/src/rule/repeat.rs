use super::{BranchKind, Rule, RuleRef, TryResult};
use crate::context::{Binding, Context, Var};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;

/// Repeats its body until a `break_` runs inside it or the body backtracks.
///
/// The break flag lives in the context bindings, so a `break_` inside a
/// nested production still terminates the innermost loop. Iterations that
/// consume nothing without breaking end the loop as well.
#[derive(Debug)]
pub struct Loop<U: CodeUnit> {
    body: RuleRef<U>,
}

impl<U: CodeUnit> Loop<U> {
    #[must_use]
    pub const fn new(body: RuleRef<U>) -> Self {
        Self { body }
    }
}

impl<U: CodeUnit> Rule<U> for Loop<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let mark = ctx.bindings_mark();
        ctx.bind(Var::LOOP_BREAK, Binding::Flag(false));
        let iteration = ctx.bindings_mark();

        let result = loop {
            let before = reader.position();
            match self.body.try_parse(ctx, reader, values) {
                TryResult::Ok => {}
                TryResult::Backtracked => break true,
                TryResult::Canceled => break false,
            }
            // Bindings made by the body last one iteration
            ctx.restore_bindings(iteration);
            if ctx.binding(Var::LOOP_BREAK) == Some(&Binding::Flag(true)) || reader.position() == before {
                break true;
            }
        };

        ctx.restore_bindings(mark);
        result
    }
}

/// Exits the innermost loop after the current iteration
#[derive(Debug, Clone, Copy, Default)]
pub struct Break;

impl<U: CodeUnit> Rule<U> for Break {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Unconditional
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        if let Some(flag) = ctx.binding_mut(Var::LOOP_BREAK) {
            *flag = Binding::Flag(true);
            return true;
        }
        let position = reader.position();
        ctx.report(ErrorKind::custom("break outside of a loop"), position, Span::empty(position));
        false
    }
}

/// Zero or more repetitions of a branch
#[derive(Debug)]
pub struct While<U: CodeUnit> {
    body: RuleRef<U>,
}

impl<U: CodeUnit> While<U> {
    #[must_use]
    pub const fn new(body: RuleRef<U>) -> Self {
        Self { body }
    }
}

fn repeat<U: CodeUnit>(
    body: &dyn Rule<U>,
    ctx: &mut Context<'_, U>,
    reader: &mut Reader<'_, U>,
    values: &mut Vec<Value>,
) -> bool {
    loop {
        let before = reader.position();
        match body.try_parse(ctx, reader, values) {
            TryResult::Ok if reader.position() > before => {}
            TryResult::Ok | TryResult::Backtracked => return true,
            TryResult::Canceled => return false,
        }
    }
}

impl<U: CodeUnit> Rule<U> for While<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        repeat(self.body.as_ref(), ctx, reader, values)
    }
}

/// One or more repetitions; a branch when the body is
#[derive(Debug)]
pub struct WhileOne<U: CodeUnit> {
    body: RuleRef<U>,
}

impl<U: CodeUnit> WhileOne<U> {
    #[must_use]
    pub const fn new(body: RuleRef<U>) -> Self {
        Self { body }
    }
}

impl<U: CodeUnit> Rule<U> for WhileOne<U> {
    fn branch_kind(&self) -> BranchKind {
        self.body.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        match self.body.try_parse(ctx, reader, values) {
            TryResult::Ok if repeat(self.body.as_ref(), ctx, reader, values) => TryResult::Ok,
            TryResult::Ok => TryResult::Canceled,
            other => other,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        self.body.parse(ctx, reader, values) && repeat(self.body.as_ref(), ctx, reader, values)
    }
}

/// Exactly `count` repetitions, optionally separated
#[derive(Debug)]
pub struct Times<U: CodeUnit> {
    count: usize,
    body: RuleRef<U>,
    separator: Option<RuleRef<U>>,
}

impl<U: CodeUnit> Times<U> {
    #[must_use]
    pub const fn new(count: usize, body: RuleRef<U>) -> Self {
        Self {
            count,
            body,
            separator: None,
        }
    }

    #[must_use]
    pub fn separator(mut self, separator: RuleRef<U>) -> Self {
        self.separator = Some(separator);
        self
    }
}

impl<U: CodeUnit> Rule<U> for Times<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        for index in 0..self.count {
            if index > 0
                && let Some(separator) = &self.separator
                && !separator.parse(ctx, reader, values)
            {
                return false;
            }
            if !self.body.parse(ctx, reader, values) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{branch, lit, loop_};
    use crate::grammar::GrammarBuilder;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Binds a scratch counter and records the deepest binding stack seen
    #[derive(Debug)]
    struct BindScratch {
        deepest: Arc<AtomicUsize>,
    }

    impl Rule<u8> for BindScratch {
        fn parse(&self, ctx: &mut Context<'_, u8>, _reader: &mut Reader<'_, u8>, _values: &mut Vec<Value>) -> bool {
            ctx.bind(Var::new("scratch"), Binding::Counter(0));
            self.deepest.fetch_max(ctx.bindings_mark(), Ordering::Relaxed);
            true
        }
    }

    #[test]
    fn test_loop_bindings_last_one_iteration() {
        let deepest = Arc::new(AtomicUsize::new(0));
        let scratch: RuleRef<u8> = Arc::new(BindScratch {
            deepest: Arc::clone(&deepest),
        });
        let mut builder = GrammarBuilder::<u8>::new();
        builder.production("root", loop_(branch(lit("a"), [scratch])));
        let grammar = builder.build().unwrap();

        let mut errors = Vec::new();
        let result = grammar.validate(Reader::from_str("aaaaaaaa"), &mut errors);
        assert!(result.is_success(), "{errors:?}");
        assert_eq!(result.position, 8);
        // break flag plus one scratch binding
        assert_eq!(deepest.load(Ordering::Relaxed), 2);
    }
}
