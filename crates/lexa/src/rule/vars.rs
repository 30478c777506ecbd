//! Context-sensitive rules backed by bindings.
//!
//! A variable is created by a rule in some production and stays visible to
//! everything that production calls, until the production ends. Three kinds
//! exist: [`Flag`], [`Counter`] and [`IdentifierVar`] (a captured lexeme
//! that later input must repeat, as in heredoc terminators).

use super::{BranchKind, Rule, RuleRef, TryResult};
use crate::context::{Binding, Context, Var};
use crate::error::ErrorKind;
use crate::input::{CodeUnit, Reader, Span};
use crate::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug)]
enum Op<U: CodeUnit> {
    Create(Binding),
    SetFlag(bool),
    ToggleFlag,
    SelectFlag { then: RuleRef<U>, otherwise: RuleRef<U> },
    RequireFlag(bool),
    Add(i64),
    /// Add (or subtract) the number of units the rule consumed
    Measure { rule: RuleRef<U>, sign: i64 },
    Compare { value: i64, less: RuleRef<U>, equal: RuleRef<U>, greater: RuleRef<U> },
    RequireCount(i64),
    Capture(RuleRef<U>),
    Rematch(RuleRef<U>),
}

/// One operation on one variable
#[derive(Debug)]
pub struct VarRule<U: CodeUnit> {
    var: Var,
    op: Op<U>,
}

impl<U: CodeUnit> VarRule<U> {
    fn rule(var: Var, op: Op<U>) -> RuleRef<U> {
        Arc::new(Self { var, op })
    }

    fn missing(&self, ctx: &mut Context<'_, U>, position: usize) -> bool {
        let message = format!("context variable '{}' does not exist", self.var.name());
        ctx.report(ErrorKind::custom(message), position, Span::empty(position));
        false
    }

    fn mismatch(ctx: &mut Context<'_, U>, position: usize, span: Span) -> bool {
        ctx.report(ErrorKind::ContextMismatch, position, span);
        false
    }

    fn flag(&self, ctx: &Context<'_, U>) -> Option<bool> {
        match ctx.binding(self.var) {
            Some(Binding::Flag(value)) => Some(*value),
            _ => None,
        }
    }

    fn counter(&self, ctx: &Context<'_, U>) -> Option<i64> {
        match ctx.binding(self.var) {
            Some(Binding::Counter(value)) => Some(*value),
            _ => None,
        }
    }

    fn update(&self, ctx: &mut Context<'_, U>, f: impl FnOnce(&mut Binding)) -> bool {
        match ctx.binding_mut(self.var) {
            Some(binding) => {
                f(binding);
                true
            }
            None => false,
        }
    }

    /// Whether a `require` condition holds; `None` if the variable is missing
    fn condition(&self, ctx: &Context<'_, U>) -> Option<bool> {
        match &self.op {
            Op::RequireFlag(expected) => self.flag(ctx).map(|value| value == *expected),
            Op::RequireCount(expected) => self.counter(ctx).map(|value| value == *expected),
            _ => Some(true),
        }
    }
}

impl<U: CodeUnit> Rule<U> for VarRule<U> {
    fn branch_kind(&self) -> BranchKind {
        match self.op {
            Op::RequireFlag(_) | Op::RequireCount(_) => BranchKind::Conditional,
            _ => BranchKind::NotBranch,
        }
    }

    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        match self.op {
            Op::RequireFlag(_) | Op::RequireCount(_) => match self.condition(ctx) {
                Some(true) => TryResult::Ok,
                Some(false) => TryResult::Backtracked,
                None => {
                    self.missing(ctx, reader.position());
                    TryResult::Canceled
                }
            },
            _ if self.parse(ctx, reader, values) => TryResult::Ok,
            _ => TryResult::Canceled,
        }
    }

    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool {
        let position = reader.position();
        match &self.op {
            Op::Create(initial) => {
                ctx.bind(self.var, *initial);
                true
            }
            Op::SetFlag(value) => {
                let value = *value;
                self.update(ctx, |binding| *binding = Binding::Flag(value)) || self.missing(ctx, position)
            }
            Op::ToggleFlag => match self.flag(ctx) {
                Some(value) => self.update(ctx, |binding| *binding = Binding::Flag(!value)),
                None => self.missing(ctx, position),
            },
            Op::SelectFlag { then, otherwise } => match self.flag(ctx) {
                Some(true) => then.parse(ctx, reader, values),
                Some(false) => otherwise.parse(ctx, reader, values),
                None => self.missing(ctx, position),
            },
            Op::RequireFlag(_) | Op::RequireCount(_) => match self.condition(ctx) {
                Some(true) => true,
                Some(false) => Self::mismatch(ctx, position, Span::empty(position)),
                None => self.missing(ctx, position),
            },
            Op::Add(delta) => match self.counter(ctx) {
                Some(value) => self.update(ctx, |binding| *binding = Binding::Counter(value + delta)),
                None => self.missing(ctx, position),
            },
            Op::Measure { rule, sign } => {
                if self.counter(ctx).is_none() {
                    return self.missing(ctx, position);
                }
                if !rule.parse(ctx, reader, values) {
                    return false;
                }
                let consumed = (reader.position() - position) as i64;
                let delta = consumed * sign;
                self.update(ctx, |binding| {
                    if let Binding::Counter(value) = binding {
                        *value += delta;
                    }
                })
            }
            Op::Compare {
                value,
                less,
                equal,
                greater,
            } => match self.counter(ctx).map(|current| current.cmp(value)) {
                Some(Ordering::Less) => less.parse(ctx, reader, values),
                Some(Ordering::Equal) => equal.parse(ctx, reader, values),
                Some(Ordering::Greater) => greater.parse(ctx, reader, values),
                None => self.missing(ctx, position),
            },
            Op::Capture(rule) => {
                let matched = ctx.without_whitespace(|ctx| rule.parse(ctx, reader, values));
                if !matched {
                    return false;
                }
                let captured = Binding::Lexeme(Span::new(position, reader.position()));
                if !self.update(ctx, |binding| *binding = captured) {
                    ctx.bind(self.var, captured);
                }
                ctx.skip_whitespace(reader);
                true
            }
            Op::Rematch(rule) => {
                let Some(&Binding::Lexeme(expected)) = ctx.binding(self.var) else {
                    return self.missing(ctx, position);
                };
                let matched = ctx.without_whitespace(|ctx| rule.parse(ctx, reader, values));
                if !matched {
                    return false;
                }
                let span = Span::new(position, reader.position());
                if reader.slice(span) != reader.slice(expected) {
                    return Self::mismatch(ctx, position, span);
                }
                ctx.skip_whitespace(reader);
                true
            }
        }
    }
}

/// Boolean variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag(Var);

impl Flag {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Var::new(name))
    }

    pub fn create<U: CodeUnit>(self, initial: bool) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Create(Binding::Flag(initial)))
    }

    pub fn set<U: CodeUnit>(self) -> RuleRef<U> {
        VarRule::rule(self.0, Op::SetFlag(true))
    }

    pub fn reset<U: CodeUnit>(self) -> RuleRef<U> {
        VarRule::rule(self.0, Op::SetFlag(false))
    }

    pub fn toggle<U: CodeUnit>(self) -> RuleRef<U> {
        VarRule::rule(self.0, Op::ToggleFlag)
    }

    /// Parse `then` if the flag is set, `otherwise` if not
    pub fn select<U: CodeUnit>(self, then: RuleRef<U>, otherwise: RuleRef<U>) -> RuleRef<U> {
        VarRule::rule(self.0, Op::SelectFlag { then, otherwise })
    }

    /// Branch taken when the flag equals `expected`; a context mismatch
    /// error otherwise
    pub fn require<U: CodeUnit>(self, expected: bool) -> RuleRef<U> {
        VarRule::rule(self.0, Op::RequireFlag(expected))
    }
}

/// Integer variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter(Var);

impl Counter {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Var::new(name))
    }

    pub fn create<U: CodeUnit>(self, initial: i64) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Create(Binding::Counter(initial)))
    }

    pub fn inc<U: CodeUnit>(self) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Add(1))
    }

    pub fn dec<U: CodeUnit>(self) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Add(-1))
    }

    /// Parse `rule` and add the number of units it consumed
    pub fn push<U: CodeUnit>(self, rule: RuleRef<U>) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Measure { rule, sign: 1 })
    }

    /// Parse `rule` and subtract the number of units it consumed
    pub fn pop<U: CodeUnit>(self, rule: RuleRef<U>) -> RuleRef<U> {
        VarRule::rule(self.0, Op::Measure { rule, sign: -1 })
    }

    /// Parse one of three rules depending on how the counter compares to `value`
    pub fn compare<U: CodeUnit>(self, value: i64, less: RuleRef<U>, equal: RuleRef<U>, greater: RuleRef<U>) -> RuleRef<U> {
        VarRule::rule(
            self.0,
            Op::Compare {
                value,
                less,
                equal,
                greater,
            },
        )
    }

    /// Branch taken when the counter equals `expected`
    pub fn require<U: CodeUnit>(self, expected: i64) -> RuleRef<U> {
        VarRule::rule(self.0, Op::RequireCount(expected))
    }

    pub fn is_zero<U: CodeUnit>(self) -> RuleRef<U> {
        self.require(0)
    }
}

/// Lexeme captured once and required to repeat later
#[derive(Debug, Clone)]
pub struct IdentifierVar<U: CodeUnit> {
    var: Var,
    identifier: RuleRef<U>,
}

impl<U: CodeUnit> IdentifierVar<U> {
    /// Variable holding whatever `identifier` matches
    #[must_use]
    pub const fn new(name: &'static str, identifier: RuleRef<U>) -> Self {
        Self {
            var: Var::new(name),
            identifier,
        }
    }

    /// Create the variable with an empty lexeme
    #[must_use]
    pub fn create(&self) -> RuleRef<U> {
        VarRule::rule(self.var, Op::Create(Binding::Lexeme(Span::default())))
    }

    /// Parse the identifier and bind its lexeme
    #[must_use]
    pub fn capture(&self) -> RuleRef<U> {
        VarRule::rule(self.var, Op::Capture(Arc::clone(&self.identifier)))
    }

    /// Parse the identifier and require it to equal the captured lexeme
    #[must_use]
    pub fn rematch(&self) -> RuleRef<U> {
        VarRule::rule(self.var, Op::Rematch(Arc::clone(&self.identifier)))
    }
}
