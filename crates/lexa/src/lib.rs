//! # Lexa
//!
//! A grammar-composition engine: describe a language by combining tokens and
//! rules, then run it as a recursive-descent parser.
//!
//! ## Overview
//!
//! Lexa is organised in layers:
//!
//! - **Engines** ([`engine`]): stateless matchers for literals, digits,
//!   character classes, keyword tries and integers.
//! - **Rules** ([`rule`], built with [`dsl`]): sequences, choices, loops,
//!   lists with error recovery, delimited content, context variables and
//!   productions.
//! - **Context** ([`context`]): production frames, automatic whitespace and
//!   scoped bindings for one parse.
//! - **Actions** ([`action`]): validate an input, compute a semantic
//!   [`Value`], or build a [`ParseTree`].
//!
//! Grammars are built once with a [`GrammarBuilder`] and are immutable
//! afterwards; one grammar can run any number of parses concurrently.
//!
//! ## Quick Start
//!
//! ```rust
//! use lexa::dsl::*;
//! use lexa::{GrammarBuilder, Reader, Value};
//!
//! let mut builder = GrammarBuilder::<u8>::new();
//! let number = builder.production("number", integer::<i64, u8>(decimal()));
//! let sum = builder.production("sum", list(p(number), sep("+")));
//! builder.whitespace(ascii::space()).entry(sum);
//! let grammar = builder.build().unwrap();
//!
//! let result = grammar.parse(Reader::from_str("1 + 2 + 39"));
//! assert!(result.is_success());
//!
//! let Some(Value::Production { values, .. }) = result.value() else {
//!     panic!("expected a production value");
//! };
//! assert_eq!(values[0].as_list().map(<[Value]>::len), Some(3));
//! ```
//!
//! ## Error Recovery
//!
//! Rules report errors to the handler and either fail or recover. Recovery
//! is always explicit: [`dsl::try_`], [`dsl::recover`], terminated lists
//! and delimited content. A parse that reported errors but recovered ends
//! with [`Outcome::RecoveredFailure`] and still produces a result.
//!
//! ## Feature Flags
//!
//! - **`diagnostics`**: [`miette`](https://docs.rs/miette) integration for
//!   error types
//! - **`serialize`**: serde derives for spans, token kinds, errors and tree
//!   events

pub mod action;
pub mod config;
pub mod context;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod input;
pub mod rule;
pub mod tree;
pub mod value;

pub use action::{Outcome, ParseResult, ValidateResult};
pub use config::{ParseConfig, TreeConfig};
pub use context::{Context, Handler, ParseStats};
pub use error::{Error, ErrorKind, ErrorSink, GrammarError};
pub use grammar::{Grammar, GrammarBuilder, ProductionId};
pub use input::{CodeUnit, Reader, Span};
pub use rule::{Rule, RuleRef, TokenKind};
pub use tree::{NodeRef, ParseTree, TraverseEvent};
pub use value::{Callback, Sink, Value};
