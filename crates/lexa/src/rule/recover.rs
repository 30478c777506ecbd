use super::{Rule, RuleRef, TokenKind, TryResult, probe};
use crate::context::Context;
use crate::input::{CodeUnit, Reader};
use crate::value::Value;
use log::trace;

/// Run `rule`; if it fails, recover and carry on.
///
/// The error the rule reported stays reported, which is what turns the
/// final outcome into a recovered failure. Without an explicit recovery
/// rule the failing rule's own [`Rule::recover`] hint is used, and parsing
/// continues even if that skips nothing.
#[derive(Debug)]
pub struct Try<U: CodeUnit> {
    rule: RuleRef<U>,
    recovery: Option<RuleRef<U>>,
}

impl<U: CodeUnit> Try<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>, recovery: Option<RuleRef<U>>) -> Self {
        Self { rule, recovery }
    }

    fn recover(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>, mark: usize) -> bool {
        values.truncate(mark);
        let begin = reader.position();
        trace!("recovering at {begin}");
        let recovered = match &self.recovery {
            Some(recovery) => recovery.parse(ctx, reader, values),
            None => {
                self.rule.recover(reader);
                true
            }
        };
        if self.recovery.is_none() && reader.position() > begin {
            ctx.token(TokenKind::Error, begin, reader.position());
        }
        recovered
    }
}

impl<U: CodeUnit> Rule<U> for Try<U> {
    fn branch_kind(&self) -> super::BranchKind {
        self.rule.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let mark = values.len();
        match self.rule.try_parse(ctx, reader, values) {
            TryResult::Canceled if self.recover(ctx, reader, values, mark) => TryResult::Ok,
            TryResult::Canceled => TryResult::Canceled,
            other => other,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let mark = values.len();
        self.rule.parse(ctx, reader, values) || self.recover(ctx, reader, values, mark)
    }
}

/// Skip input until one of `targets` would match; the target is not consumed.
///
/// Fails without consuming anything when a limit or the end of input comes
/// first.
#[derive(Debug)]
pub struct Find<U: CodeUnit> {
    targets: Vec<RuleRef<U>>,
    limit: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Find<U> {
    #[must_use]
    pub const fn new(targets: Vec<RuleRef<U>>) -> Self {
        Self {
            targets,
            limit: Vec::new(),
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: Vec<RuleRef<U>>) -> Self {
        self.limit = limit;
        self
    }
}

fn any_matches<U: CodeUnit>(ctx: &mut Context<'_, U>, rules: &[RuleRef<U>], reader: &Reader<'_, U>) -> bool {
    rules
        .iter()
        .any(|rule| probe(ctx, rule.as_ref(), reader) == TryResult::Ok)
}

impl<U: CodeUnit> Rule<U> for Find<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        let begin = *reader;
        loop {
            if any_matches(ctx, &self.targets, reader) {
                break;
            }
            if reader.is_eof() || any_matches(ctx, &self.limit, reader) {
                *reader = begin;
                return false;
            }
            reader.bump();
        }
        if reader.position() > begin.position() {
            ctx.token(TokenKind::Error, begin.position(), reader.position());
        }
        true
    }
}

/// Skip input until one of `branches` is taken, and parse it.
///
/// Fails when a limit or the end of input comes first.
#[derive(Debug)]
pub struct Recover<U: CodeUnit> {
    branches: Vec<RuleRef<U>>,
    limit: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Recover<U> {
    #[must_use]
    pub const fn new(branches: Vec<RuleRef<U>>) -> Self {
        Self {
            branches,
            limit: Vec::new(),
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: Vec<RuleRef<U>>) -> Self {
        self.limit = limit;
        self
    }
}

impl<U: CodeUnit> Rule<U> for Recover<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let begin = reader.position();
        loop {
            if let Some(branch) = self
                .branches
                .iter()
                .find(|branch| probe(ctx, branch.as_ref(), reader) != TryResult::Backtracked)
            {
                if reader.position() > begin {
                    ctx.token(TokenKind::Error, begin, reader.position());
                }
                return branch.parse(ctx, reader, values);
            }
            if reader.is_eof() || any_matches(ctx, &self.limit, reader) {
                if reader.position() > begin {
                    ctx.token(TokenKind::Error, begin, reader.position());
                }
                return false;
            }
            reader.bump();
        }
    }
}
