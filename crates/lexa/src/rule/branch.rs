use super::{BranchKind, Rule, RuleRef, TryResult, probe};
use crate::context::Context;
use crate::engine::{Lookahead, peek_match};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;
use log::trace;

fn parse_all<U: CodeUnit>(
    rules: &[RuleRef<U>],
    ctx: &mut Context<'_, U>,
    reader: &mut Reader<'_, U>,
    values: &mut Vec<Value>,
) -> bool {
    rules.iter().all(|rule| rule.parse(ctx, reader, values))
}

/// Rules one after another.
///
/// A sequence whose first element is a branch is itself a branch: trying it
/// tries the first element and commits to the rest once that is taken.
#[derive(Debug)]
pub struct Seq<U: CodeUnit> {
    rules: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Seq<U> {
    #[must_use]
    pub const fn new(rules: Vec<RuleRef<U>>) -> Self {
        Self { rules }
    }
}

impl<U: CodeUnit> Rule<U> for Seq<U> {
    fn branch_kind(&self) -> BranchKind {
        self.rules
            .first()
            .map_or(BranchKind::NotBranch, |first| first.branch_kind())
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let Some((first, rest)) = self.rules.split_first() else {
            return TryResult::Ok;
        };
        match first.try_parse(ctx, reader, values) {
            TryResult::Ok if parse_all(rest, ctx, reader, values) => TryResult::Ok,
            TryResult::Ok => TryResult::Canceled,
            other => other,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        parse_all(&self.rules, ctx, reader, values)
    }
}

/// `condition >> then`: taken when the condition matches
#[derive(Debug)]
pub struct Branch<U: CodeUnit> {
    condition: RuleRef<U>,
    then: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Branch<U> {
    #[must_use]
    pub const fn new(condition: RuleRef<U>, then: Vec<RuleRef<U>>) -> Self {
        Self { condition, then }
    }
}

impl<U: CodeUnit> Rule<U> for Branch<U> {
    fn branch_kind(&self) -> BranchKind {
        match self.condition.branch_kind() {
            BranchKind::Conditional => BranchKind::Conditional,
            BranchKind::NotBranch | BranchKind::Unconditional => BranchKind::Unconditional,
        }
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        match self.condition.try_parse(ctx, reader, values) {
            TryResult::Ok if parse_all(&self.then, ctx, reader, values) => TryResult::Ok,
            TryResult::Ok => TryResult::Canceled,
            other => other,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        self.condition.parse(ctx, reader, values) && parse_all(&self.then, ctx, reader, values)
    }
}

/// First branch whose condition matches.
///
/// Members are tried in order. A member that is not a branch, or an
/// unconditional branch, is always taken, so nothing after it is tried.
#[derive(Debug)]
pub struct Choice<U: CodeUnit> {
    branches: Vec<RuleRef<U>>,
}

impl<U: CodeUnit> Choice<U> {
    #[must_use]
    pub const fn new(branches: Vec<RuleRef<U>>) -> Self {
        Self { branches }
    }
}

impl<U: CodeUnit> Rule<U> for Choice<U> {
    fn branch_kind(&self) -> BranchKind {
        let always_taken = self
            .branches
            .iter()
            .any(|branch| branch.branch_kind() != BranchKind::Conditional);
        if always_taken {
            BranchKind::Unconditional
        } else {
            BranchKind::Conditional
        }
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        for branch in &self.branches {
            match branch.try_parse(ctx, reader, values) {
                TryResult::Backtracked => continue,
                taken => return taken,
            }
        }
        TryResult::Backtracked
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        match self.try_parse(ctx, reader, values) {
            TryResult::Ok => true,
            TryResult::Canceled => false,
            TryResult::Backtracked => {
                let position = reader.position();
                trace!("no alternative matched at {position}");
                ctx.report(ErrorKind::ExhaustedChoice, position, Span::empty(position));
                false
            }
        }
    }
}

/// Optional branch; produces [`Value::Nullopt`] when it does not match
#[derive(Debug)]
pub struct Opt<U: CodeUnit> {
    rule: RuleRef<U>,
}

impl<U: CodeUnit> Opt<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self { rule }
    }
}

impl<U: CodeUnit> Rule<U> for Opt<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        match self.rule.try_parse(ctx, reader, values) {
            TryResult::Ok => true,
            TryResult::Canceled => false,
            TryResult::Backtracked => {
                values.push(Value::Nullopt);
                true
            }
        }
    }
}

/// Condition that always holds and consumes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Else;

impl<U: CodeUnit> Rule<U> for Else {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Unconditional
    }

    fn parse(&self, _ctx: &mut Context<'_, U>, _reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        true
    }
}

/// Condition that holds when `rule` would match here; consumes nothing.
///
/// Used outside a branch it reports an error when `rule` does not match and
/// carries on.
#[derive(Debug)]
pub struct Peek<U: CodeUnit> {
    rule: RuleRef<U>,
    negated: bool,
}

impl<U: CodeUnit> Peek<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self { rule, negated: false }
    }

    /// Condition that holds when `rule` would *not* match
    #[must_use]
    pub const fn not(rule: RuleRef<U>) -> Self {
        Self { rule, negated: true }
    }

    fn holds(&self, ctx: &mut Context<'_, U>, reader: &Reader<'_, U>) -> bool {
        let matched = probe(ctx, self.rule.as_ref(), reader) == TryResult::Ok;
        matched != self.negated
    }
}

impl<U: CodeUnit> Rule<U> for Peek<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> TryResult {
        if self.holds(ctx, reader) {
            TryResult::Ok
        } else {
            TryResult::Backtracked
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        if !self.holds(ctx, reader) {
            let position = reader.position();
            let message = if self.negated { "unexpected input" } else { "expected input not found" };
            ctx.report(ErrorKind::custom(message), position, Span::empty(position));
        }
        true
    }
}

/// Condition that holds when the needle occurs before the end token.
///
/// Consumes nothing either way.
#[derive(Debug)]
pub struct LookaheadRule<U: CodeUnit> {
    engine: Lookahead<U>,
}

impl<U: CodeUnit> LookaheadRule<U> {
    #[must_use]
    pub const fn new(engine: Lookahead<U>) -> Self {
        Self { engine }
    }
}

impl<U: CodeUnit> Rule<U> for LookaheadRule<U> {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, _ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> TryResult {
        if peek_match(&self.engine, reader) {
            TryResult::Ok
        } else {
            TryResult::Backtracked
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        if !peek_match(&self.engine, reader) {
            let position = reader.position();
            ctx.report(ErrorKind::NotFound, position, Span::empty(position));
        }
        true
    }
}
