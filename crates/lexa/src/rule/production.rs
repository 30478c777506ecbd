use super::{BranchKind, Rule, RuleRef, TryResult};
use crate::context::Context;
use crate::grammar::ProductionId;
use crate::input::{CodeUnit, Reader};
use crate::value::Value;

/// Call of another production.
///
/// A branch: trying it tries the production's rule as a branch, so a
/// production whose rule backtracks leaves no trace.
///
/// Productions may be declared before they are defined, so the call
/// always reports [`BranchKind::Conditional`]. When the production's rule
/// is not a branch, trying the call still never backtracks: the rule runs
/// unconditionally and the call is taken.
#[derive(Debug, Clone, Copy)]
pub struct ProductionRule {
    id: ProductionId,
}

impl ProductionRule {
    #[must_use]
    pub const fn new(id: ProductionId) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(&self) -> ProductionId {
        self.id
    }
}

impl<U: CodeUnit> Rule<U> for ProductionRule {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::Conditional
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        ctx.try_parse_production(self.id, reader, values)
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        ctx.parse_production(self.id, reader, values)
    }
}

/// Skip whitespace matched by a rule right here, regardless of the
/// production's automatic whitespace
#[derive(Debug)]
pub struct SkipWhitespace<U: CodeUnit> {
    rule: RuleRef<U>,
}

impl<U: CodeUnit> SkipWhitespace<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self { rule }
    }
}

impl<U: CodeUnit> Rule<U> for SkipWhitespace<U> {
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, _values: &mut Vec<Value>) -> bool {
        ctx.run_whitespace(&self.rule, reader);
        true
    }
}

/// Rule parsed with automatic whitespace skipping turned off inside;
/// whitespace after it is skipped as usual
#[derive(Debug)]
pub struct NoWhitespace<U: CodeUnit> {
    rule: RuleRef<U>,
}

impl<U: CodeUnit> NoWhitespace<U> {
    #[must_use]
    pub const fn new(rule: RuleRef<U>) -> Self {
        Self { rule }
    }
}

impl<U: CodeUnit> Rule<U> for NoWhitespace<U> {
    fn branch_kind(&self) -> BranchKind {
        self.rule.branch_kind()
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        let result = ctx.without_whitespace(|ctx| self.rule.try_parse(ctx, reader, values));
        if result == TryResult::Ok {
            ctx.skip_whitespace(reader);
        }
        result
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let parsed = ctx.without_whitespace(|ctx| self.rule.parse(ctx, reader, values));
        if parsed {
            ctx.skip_whitespace(reader);
        }
        parsed
    }
}
