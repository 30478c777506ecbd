//! # Grammar DSL
//!
//! Free functions building rules, meant to be glob-imported.
//!
//! ## Overview
//!
//! Token constructors return a [`Token`] so their kind and error can still
//! be adjusted; combinators accept anything implementing [`IntoRule`]
//! (rules, tokens, `&str` literals, character classes) and return a
//! [`RuleRef`]. Builders with options of their own (lists, delimited
//! content, identifiers, integers) return the builder, which converts with
//! [`IntoRule`] as well.
//!
//! ```rust
//! use lexa::dsl::*;
//! use lexa::{Grammar, Reader};
//!
//! let mut builder = Grammar::<u8>::builder();
//! let number = builder.production("number", integer::<u32, u8>(decimal()));
//! let numbers = builder.production(
//!     "numbers",
//!     brackets("[", "]").opt_list(p(number), sep(",")),
//! );
//! builder.whitespace(ascii::space());
//! builder.entry(numbers);
//! let grammar = builder.build().unwrap();
//!
//! let mut errors = Vec::new();
//! assert!(grammar.validate(Reader::from_str("[1, 2, 3]"), &mut errors).is_success());
//! ```

use crate::engine::{
    self, AsciiClass, CharClass, CodePointId, Digits, Identifier, Integer, IntegerParser, Keyword, Literal,
    LiteralSet, MatcherRef, NDigits, Radix,
};
use crate::error::GrammarError;
use crate::grammar::ProductionId;
use crate::input::CodeUnit;
use crate::rule::branch::{Branch, Choice, Else, LookaheadRule, Opt, Peek, Seq};
use crate::rule::capture::{Capture, CodePointRule, Constant, IdentifierRule, IntegerRule, Position, Symbol, SymbolTable};
use crate::rule::combination::Combination;
use crate::rule::delimited::{Delimited, Escape};
use crate::rule::list::{Brackets, List, Separator, Terminator, Trailing};
use crate::rule::production::{NoWhitespace, ProductionRule, SkipWhitespace};
use crate::rule::recover::{Find, Recover, Try};
use crate::rule::repeat::{Break, Loop, Times, While, WhileOne};
use crate::rule::token::Tokenize;
use crate::rule::vars::{Counter, Flag, IdentifierVar};
use crate::rule::{IntoRule, RuleRef, Token, TokenKind};
use crate::value::Value;
use std::sync::Arc;

pub use crate::{choice, seq};

fn rules<U: CodeUnit>(rules: impl IntoIterator<Item = impl IntoRule<U>>) -> Vec<RuleRef<U>> {
    rules.into_iter().map(IntoRule::into_rule).collect()
}

fn engines<U: CodeUnit>(tokens: impl IntoIterator<Item = Token<U>>) -> Vec<MatcherRef<U>> {
    tokens.into_iter().map(|token| Arc::clone(token.engine())).collect()
}

// Tokens

/// Exact string
#[must_use]
pub fn lit<U: CodeUnit>(text: &str) -> Token<U> {
    Token::literal(text)
}

/// Exact string compared without regard to ASCII case
#[must_use]
pub fn lit_ignore_case<U: CodeUnit>(text: &str) -> Token<U> {
    Token::new(Literal::new(text).ascii_case_folding()).kind(TokenKind::Literal)
}

/// Set of literal strings for [`alt`]
///
/// # Errors
///
/// Fails on an empty or repeated string.
pub fn lit_set<'s, U: CodeUnit>(strings: impl IntoIterator<Item = &'s str>) -> Result<LiteralSet<U>, GrammarError> {
    LiteralSet::new(strings)
}

/// Longest of several alternatives; ties go to the one declared first
#[must_use]
pub fn alt<U: CodeUnit>(set: LiteralSet<U>) -> Token<U> {
    Token::new(set).kind(TokenKind::Literal)
}

/// Identifier-shaped literal: `keyword("if", &id)` does not match `iffy`
#[must_use]
pub fn keyword<U: CodeUnit>(text: &str, identifier: &Identifier) -> Token<U> {
    Token::new(Keyword::new(text, identifier.clone())).kind(TokenKind::Literal)
}

/// One unit of the class
#[must_use]
pub fn class<U: CodeUnit>(class: impl Into<CharClass>) -> Token<U> {
    Token::new(class.into())
}

/// Single-unit tokens over the ASCII classes
pub mod ascii {
    use super::{AsciiClass, CodeUnit, Token, class};

    macro_rules! ascii_tokens {
        ($($name:ident => $class:ident),+ $(,)?) => {
            $(
                #[must_use]
                pub fn $name<U: CodeUnit>() -> Token<U> {
                    class(AsciiClass::$class)
                }
            )+
        };
    }

    ascii_tokens! {
        control => Control,
        blank => Blank,
        newline => Newline,
        other_space => OtherSpace,
        space => Space,
        digit => Digit,
        lower => Lower,
        upper => Upper,
        alpha => Alpha,
        alpha_underscore => AlphaUnderscore,
        alpha_digit => AlphaDigit,
        word => Word,
        hex_digit => HexDigit,
        hex_lower => HexLower,
        hex_upper => HexUpper,
        punct => Punct,
        graph => Graph,
        print => Print,
        character => Char,
    }
}

/// Decimal digits without restrictions
#[must_use]
pub const fn decimal() -> Digits {
    Digits::new(Radix::Decimal)
}

/// Run of digits
#[must_use]
pub fn digits<U: CodeUnit>(digits: Digits) -> Token<U> {
    Token::new(digits).kind(TokenKind::Digits)
}

/// Exactly `count` digits
#[must_use]
pub fn n_digits<U: CodeUnit>(radix: Radix, count: usize) -> Token<U> {
    Token::new(NDigits::new(radix, count)).kind(TokenKind::Digits)
}

/// Rest of the input
#[must_use]
pub fn any<U: CodeUnit>() -> Token<U> {
    Token::new(engine::Any).kind(TokenKind::Any)
}

/// End of input
#[must_use]
pub fn eof<U: CodeUnit>() -> Token<U> {
    Token::new(engine::Eof).kind(TokenKind::Eof)
}

/// `\n` or `\r\n`
#[must_use]
pub fn newline<U: CodeUnit>() -> Token<U> {
    Token::new(engine::Newline)
}

/// Newline or end of input
#[must_use]
pub fn eol<U: CodeUnit>() -> Token<U> {
    Token::new(engine::Eol)
}

/// Everything up to and including `needle`
#[must_use]
pub fn until<U: CodeUnit>(needle: Token<U>) -> Token<U> {
    Token::new(engine::Until::new(Arc::clone(needle.engine())))
}

/// Like [`until`], also ending at the end of input
#[must_use]
pub fn until_or_eof<U: CodeUnit>(needle: Token<U>) -> Token<U> {
    Token::new(engine::Until::new(Arc::clone(needle.engine())).or_eof())
}

/// `token`, unless `excluded` matches exactly the same input
#[must_use]
pub fn minus<U: CodeUnit>(token: Token<U>, excluded: Token<U>) -> Token<U> {
    let kind = token.token_kind();
    Token::new(engine::Minus::new(
        Arc::clone(token.engine()),
        Arc::clone(excluded.engine()),
    ))
    .kind(kind)
}

/// Zero or more units of a class, as one token
#[must_use]
pub fn class_while<U: CodeUnit>(class: impl Into<CharClass>) -> Token<U> {
    Token::new(engine::While(class.into()))
}

/// One or more units of a class, as one token
#[must_use]
pub fn class_while_one<U: CodeUnit>(class: impl Into<CharClass>) -> Token<U> {
    Token::new(engine::WhileOne(class.into()))
}

/// Arbitrary rule reported as a single token
pub fn token<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Tokenize::new(rule.into_rule()))
}

// Values

/// Identifier shape from a leading and a trailing class
#[must_use]
pub fn identifier_shape(leading: impl Into<CharClass>, trailing: impl Into<CharClass>) -> Identifier {
    Identifier::new(leading.into(), trailing.into())
}

/// C-style identifier shape: `[A-Za-z_][A-Za-z0-9_]*`
#[must_use]
pub fn c_identifier() -> Identifier {
    identifier_shape(AsciiClass::AlphaUnderscore, AsciiClass::Word)
}

/// Identifier producing its lexeme; add reserved words with
/// [`IdentifierRule::reserve`]
#[must_use]
pub fn identifier<U: CodeUnit>(shape: Identifier) -> IdentifierRule<U> {
    IdentifierRule::new(shape)
}

/// Identifier as a plain token
#[must_use]
pub fn identifier_token<U: CodeUnit>(shape: Identifier) -> Token<U> {
    Token::new(shape).kind(TokenKind::Identifier)
}

/// Lexeme of whatever `rule` matches, followed by its values
pub fn capture<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Capture::new(rule.into_rule()))
}

/// Current position as a value
#[must_use]
pub fn position<U: CodeUnit>() -> RuleRef<U> {
    Arc::new(Position)
}

/// Digits converted to `T`
#[must_use]
pub const fn integer<T: Integer, U: CodeUnit>(digits: Digits) -> IntegerRule<T, U> {
    IntegerRule::new(IntegerParser::new(digits))
}

/// Fixed number of digits naming a code point
#[must_use]
pub fn code_point_id<U: CodeUnit>(radix: Radix, count: usize) -> RuleRef<U> {
    Arc::new(CodePointRule::new(CodePointId::new(radix, count)))
}

/// Constant value
pub fn value<U: CodeUnit>(value: impl Into<Value>) -> RuleRef<U> {
    Arc::new(Constant::new(value.into()))
}

/// Table entry whose string is exactly the lexeme of `token`
#[must_use]
pub fn symbol<U: CodeUnit>(table: &Arc<SymbolTable<U>>, token: impl IntoRule<U>) -> Symbol<U> {
    Symbol::new(Arc::clone(table), Some(token.into_rule()))
}

/// Longest table entry at the current position
#[must_use]
pub fn symbol_prefix<U: CodeUnit>(table: &Arc<SymbolTable<U>>) -> Symbol<U> {
    Symbol::new(Arc::clone(table), None)
}

// Structure

/// Rules one after another
#[must_use]
pub fn seq<U: CodeUnit>(rules: Vec<RuleRef<U>>) -> RuleRef<U> {
    Arc::new(Seq::new(rules))
}

/// `condition` followed by `then`, taken when the condition matches
pub fn branch<U: CodeUnit>(condition: impl IntoRule<U>, then: impl IntoIterator<Item = RuleRef<U>>) -> RuleRef<U> {
    Arc::new(Branch::new(condition.into_rule(), then.into_iter().collect()))
}

/// First member whose condition matches
#[must_use]
pub fn choice<U: CodeUnit>(branches: Vec<RuleRef<U>>) -> RuleRef<U> {
    Arc::new(Choice::new(branches))
}

/// `rule` if it matches; [`Value::Nullopt`] otherwise
pub fn opt<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Opt::new(rule.into_rule()))
}

/// Condition that is always taken, for the last member of a choice
#[must_use]
pub fn else_<U: CodeUnit>() -> RuleRef<U> {
    Arc::new(Else)
}

// Repetition

/// Repeat until `break_` or until the body backtracks
pub fn loop_<U: CodeUnit>(body: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Loop::new(body.into_rule()))
}

/// Leave the innermost `loop_`
#[must_use]
pub fn break_<U: CodeUnit>() -> RuleRef<U> {
    Arc::new(Break)
}

/// Zero or more repetitions of a branch
pub fn while_<U: CodeUnit>(body: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(While::new(body.into_rule()))
}

/// One or more repetitions
pub fn while_one<U: CodeUnit>(body: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(WhileOne::new(body.into_rule()))
}

/// Exactly `count` repetitions
pub fn times<U: CodeUnit>(count: usize, body: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Times::new(count, body.into_rule()))
}

/// Exactly `count` repetitions with a separator between them
pub fn times_sep<U: CodeUnit>(count: usize, body: impl IntoRule<U>, separator: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Times::new(count, body.into_rule()).separator(separator.into_rule()))
}

// Lists

/// Separator; a trailing one is an error
pub fn sep<U: CodeUnit>(rule: impl IntoRule<U>) -> Option<Separator<U>> {
    Some(Separator::new(rule.into_rule(), Trailing::Forbid))
}

/// Separator that may also follow the last item
pub fn trailing_sep<U: CodeUnit>(rule: impl IntoRule<U>) -> Option<Separator<U>> {
    Some(Separator::new(rule.into_rule(), Trailing::Allow))
}

/// Separator whose trailing occurrence is consumed and ignored
pub fn ignore_trailing_sep<U: CodeUnit>(rule: impl IntoRule<U>) -> Option<Separator<U>> {
    trailing_sep(rule)
}

/// One or more items
pub fn list<U: CodeUnit>(item: impl IntoRule<U>, separator: Option<Separator<U>>) -> RuleRef<U> {
    Arc::new(List::new(item.into_rule(), separator))
}

/// Lists ended by `terminator`
pub fn terminator<U: CodeUnit>(terminator: impl IntoRule<U>) -> Terminator<U> {
    Terminator::new(terminator.into_rule())
}

/// Lists between `open` and `close`
pub fn brackets<U: CodeUnit>(open: impl IntoRule<U>, close: impl IntoRule<U>) -> Brackets<U> {
    Brackets::new(open.into_rule(), close.into_rule())
}

/// Content between two delimiters
pub fn delimited<U: CodeUnit>(open: impl IntoRule<U>, close: impl IntoRule<U>) -> Delimited<U> {
    Delimited::new(open.into_rule(), close.into_rule())
}

/// Escape sequences introduced by `introducer`
#[must_use]
pub fn escape<U: CodeUnit>(introducer: Token<U>) -> Escape<U> {
    Escape::new(introducer)
}

// Context state

#[must_use]
pub const fn flag(name: &'static str) -> Flag {
    Flag::new(name)
}

#[must_use]
pub const fn counter(name: &'static str) -> Counter {
    Counter::new(name)
}

pub fn identifier_var<U: CodeUnit>(name: &'static str, identifier: impl IntoRule<U>) -> IdentifierVar<U> {
    IdentifierVar::new(name, identifier.into_rule())
}

// Recovery

/// Parse `rule`, recovering with its own skip hint if it fails
pub fn try_<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Try::new(rule.into_rule(), None))
}

/// Parse `rule`, running `recovery` if it fails
pub fn try_with<U: CodeUnit>(rule: impl IntoRule<U>, recovery: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Try::new(rule.into_rule(), Some(recovery.into_rule())))
}

/// Skip to the next occurrence of a target; see [`find_limited`]
pub fn find<U: CodeUnit>(targets: impl IntoIterator<Item = impl IntoRule<U>>) -> RuleRef<U> {
    Arc::new(Find::new(rules(targets)))
}

/// [`find`] that gives up at a limit token
pub fn find_limited<U: CodeUnit>(
    targets: impl IntoIterator<Item = impl IntoRule<U>>,
    limit: impl IntoIterator<Item = impl IntoRule<U>>,
) -> RuleRef<U> {
    Arc::new(Find::new(rules(targets)).limit(rules(limit)))
}

/// Skip to the first position where a branch is taken, then parse it
pub fn recover<U: CodeUnit>(branches: impl IntoIterator<Item = impl IntoRule<U>>) -> RuleRef<U> {
    Arc::new(Recover::new(rules(branches)))
}

/// [`recover`] that gives up at a limit token
pub fn recover_limited<U: CodeUnit>(
    branches: impl IntoIterator<Item = impl IntoRule<U>>,
    limit: impl IntoIterator<Item = impl IntoRule<U>>,
) -> RuleRef<U> {
    Arc::new(Recover::new(rules(branches)).limit(rules(limit)))
}

/// Skip-to-token recovery done by the engines alone, for hot paths
#[must_use]
pub fn find_token<U: CodeUnit>(targets: impl IntoIterator<Item = Token<U>>) -> Token<U> {
    Token::new(engine::Find::new(engines(targets))).kind(TokenKind::Error)
}

// Lookahead

/// Condition holding when `rule` would match; consumes nothing
pub fn peek<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Peek::new(rule.into_rule()))
}

/// Condition holding when `rule` would not match
pub fn peek_not<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(Peek::not(rule.into_rule()))
}

/// Condition holding when `needle` occurs before `end`
#[must_use]
pub fn lookahead<U: CodeUnit>(needle: Token<U>, end: Token<U>) -> RuleRef<U> {
    let engine = engine::Lookahead::new(Arc::clone(needle.engine()), Arc::clone(end.engine()));
    Arc::new(LookaheadRule::new(engine))
}

// Productions

/// Call a production
#[must_use]
pub fn p<U: CodeUnit>(id: ProductionId) -> RuleRef<U> {
    Arc::new(ProductionRule::new(id))
}

/// Call a production that may be defined later or call itself
#[must_use]
pub fn recurse<U: CodeUnit>(id: ProductionId) -> RuleRef<U> {
    p(id)
}

/// Skip whitespace matched by `rule` here
pub fn whitespace<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(SkipWhitespace::new(rule.into_rule()))
}

/// `rule` without automatic whitespace inside it
pub fn no_whitespace<U: CodeUnit>(rule: impl IntoRule<U>) -> RuleRef<U> {
    Arc::new(NoWhitespace::new(rule.into_rule()))
}

// Combinations

/// Every member exactly once, in any order
pub fn combination<U: CodeUnit>(members: impl IntoIterator<Item = impl IntoRule<U>>) -> RuleRef<U> {
    Arc::new(Combination::new(rules(members)))
}

/// Every member at most once, in any order
pub fn partial_combination<U: CodeUnit>(members: impl IntoIterator<Item = impl IntoRule<U>>) -> RuleRef<U> {
    Arc::new(Combination::partial(rules(members)))
}
