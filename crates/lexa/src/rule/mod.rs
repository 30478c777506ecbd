//! # Rules
//!
//! The combinator protocol every grammar node implements.
//!
//! ## Overview
//!
//! A [`Rule`] has two entry points:
//!
//! - [`Rule::parse`] runs the rule unconditionally. `false` means it failed
//!   and its error has already been reported to the context.
//! - [`Rule::try_parse`] runs the rule as a *branch*. Besides success and
//!   failure it may answer [`TryResult::Backtracked`]: the branch condition
//!   did not hold and nothing was consumed, so the caller is free to try
//!   something else from the same position.
//!
//! [`Rule::branch_kind`] tells combinators which rules can backtrack.
//! Rules that are not branches behave as unconditional branches: their
//! `try_parse` is their `parse`.
//!
//! Values produced by a rule are appended to the vector passed in; the rest
//! of the caller's sequence plays the role of the continuation.
//!
//! ## Combinators
//!
//! | Module | Rules |
//! |--------|-------|
//! | [`token`] | tokens over engines, `token(rule)` |
//! | [`branch`] | `seq`, `branch`, `choice`, `opt`, `else_`, `peek`, `peek_not`, `lookahead` |
//! | [`repeat`] | `loop_`, `break_`, `while_`, `while_one`, `times` |
//! | [`list`] | `list`, terminated lists, brackets |
//! | [`delimited`] | delimited content with escapes |
//! | [`recover`] | `try_`, `find`, `recover` |
//! | [`vars`] | flags, counters and captured identifiers in the context |
//! | [`capture`] | `capture`, `position`, integers, code points, identifiers, symbols |
//! | [`combination`] | every member at most once, in any order |
//! | [`production`] | production calls and whitespace control |

pub mod branch;
pub mod capture;
pub mod combination;
pub mod delimited;
pub mod list;
pub mod production;
pub mod recover;
pub mod repeat;
pub mod token;
pub mod vars;

pub use token::{Token, TokenKind};

use crate::context::Context;
use crate::engine::CharClass;
use crate::input::{CodeUnit, Reader};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Result of running a rule as a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryResult {
    /// The branch was taken and the rest of it succeeded
    Ok,
    /// The branch was taken and then failed; the error was reported
    Canceled,
    /// The condition did not hold; nothing was consumed
    Backtracked,
}

/// How a rule behaves when tried as a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Not a branch; `try_parse` never backtracks
    NotBranch,
    /// May backtrack
    Conditional,
    /// Branch that is always taken, e.g. `else_`
    Unconditional,
}

/// A grammar node
pub trait Rule<U: CodeUnit>: Send + Sync + fmt::Debug {
    fn branch_kind(&self) -> BranchKind {
        BranchKind::NotBranch
    }

    /// Run as a branch.
    ///
    /// Must not consume input when returning [`TryResult::Backtracked`].
    fn try_parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> TryResult {
        if self.parse(ctx, reader, values) {
            TryResult::Ok
        } else {
            TryResult::Canceled
        }
    }

    /// Run unconditionally; `false` means an error was reported.
    fn parse(&self, ctx: &mut Context<'_, U>, reader: &mut Reader<'_, U>, values: &mut Vec<Value>) -> bool;

    /// Skip a malformed occurrence of this rule after it failed.
    ///
    /// Returns whether anything plausible was skipped.
    fn recover(&self, reader: &mut Reader<'_, U>) -> bool {
        let _ = reader;
        false
    }
}

/// Shared handle to a rule
pub type RuleRef<U> = Arc<dyn Rule<U>>;

/// Whether the rule can backtrack when tried
pub fn is_branch<U: CodeUnit>(rule: &dyn Rule<U>) -> bool {
    rule.branch_kind() != BranchKind::NotBranch
}

/// Try `rule` at `reader` without consuming input or reporting anything
pub(crate) fn probe<U: CodeUnit>(ctx: &mut Context<'_, U>, rule: &dyn Rule<U>, reader: &Reader<'_, U>) -> TryResult {
    let mut cursor = *reader;
    ctx.speculate(|scratch| rule.try_parse(scratch, &mut cursor, &mut Vec::new()))
}

/// Conversion into a [`RuleRef`]
pub trait IntoRule<U: CodeUnit> {
    fn into_rule(self) -> RuleRef<U>;
}

impl<U: CodeUnit> IntoRule<U> for RuleRef<U> {
    fn into_rule(self) -> RuleRef<U> {
        self
    }
}

impl<U: CodeUnit> IntoRule<U> for &RuleRef<U> {
    fn into_rule(self) -> RuleRef<U> {
        Arc::clone(self)
    }
}

/// A string is a literal token
impl<U: CodeUnit> IntoRule<U> for &str {
    fn into_rule(self) -> RuleRef<U> {
        Arc::new(Token::literal(self))
    }
}

/// A character class is a token matching one unit
impl<U: CodeUnit> IntoRule<U> for CharClass {
    fn into_rule(self) -> RuleRef<U> {
        Arc::new(Token::new(self))
    }
}

macro_rules! impl_into_rule {
    ($($rule:ident),+ $(,)?) => {
        $(
            impl<U: CodeUnit> IntoRule<U> for $rule<U> {
                fn into_rule(self) -> RuleRef<U> {
                    Arc::new(self)
                }
            }
        )+
    };
}

use branch::{Branch, Choice, Opt, Peek, Seq};
use capture::{Capture, IdentifierRule, Symbol};
use delimited::Delimited;
use list::{List, TerminatedList};

impl_into_rule!(Branch, Capture, Choice, Delimited, IdentifierRule, List, Opt, Peek, Seq, Symbol, TerminatedList);

impl<T: crate::engine::Integer, U: CodeUnit> IntoRule<U> for capture::IntegerRule<T, U> {
    fn into_rule(self) -> RuleRef<U> {
        Arc::new(self)
    }
}

/// Sequence of rules converted with [`IntoRule`]
///
/// ```rust
/// use lexa::dsl::*;
///
/// let call = seq![ascii::alpha(), "(", ")"];
/// # let _: lexa::rule::RuleRef<u8> = call;
/// ```
#[macro_export]
macro_rules! seq {
    ($($rule:expr),+ $(,)?) => {
        $crate::dsl::seq(::std::vec![$($crate::rule::IntoRule::into_rule($rule)),+])
    };
}

/// Choice between rules converted with [`IntoRule`]
#[macro_export]
macro_rules! choice {
    ($($rule:expr),+ $(,)?) => {
        $crate::dsl::choice(::std::vec![$($crate::rule::IntoRule::into_rule($rule)),+])
    };
}
