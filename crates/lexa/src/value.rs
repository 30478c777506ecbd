//! # Semantic Values
//!
//! Values produced by rules and folded by production callbacks.
//!
//! ## Overview
//!
//! Rules append [`Value`]s to the vector their caller hands them. When a
//! production finishes, the value handler passes the collected vector to the
//! production's [`Callback`], and the result becomes a single value in the
//! enclosing production. Loops and lists that need to accumulate an unbounded
//! number of items feed a [`Sink`] instead.
//!
//! Validate and parse-tree actions ignore values: their handlers return
//! [`Value::Nothing`] from every production.

use crate::input::{CodeUnit, Span, units_to_string};
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Dynamic semantic value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Value {
    /// No value; skipped when collected by a production
    #[default]
    Nothing,
    /// An optional rule did not match
    Nullopt,
    Bool(bool),
    Integer(i128),
    CodePoint(char),
    /// Input span captured without interpretation
    Lexeme(Span),
    Text(String),
    List(Vec<Value>),
    /// Default result of a production without a callback
    Production {
        name: CompactString,
        values: Vec<Value>,
    },
}

impl Value {
    #[must_use]
    pub const fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_lexeme(&self) -> Option<Span> {
        match self {
            Self::Lexeme(span) => Some(*span),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name and values of a default production value
    #[must_use]
    pub fn as_production(&self) -> Option<(&str, &[Self])> {
        match self {
            Self::Production { name, values } => Some((name, values)),
            _ => None,
        }
    }

    /// Append the textual form of this value to `out`.
    ///
    /// Lexemes are decoded from `source`, code points are pushed as-is, and
    /// lists and productions contribute their items in order.
    pub fn write_text<U: CodeUnit>(&self, source: &[U], out: &mut String) {
        match self {
            Self::Lexeme(span) => {
                let end = span.end().min(source.len());
                let begin = span.begin().min(end);
                U::push_lossy(&source[begin..end], out);
            }
            Self::CodePoint(c) => out.push(*c),
            Self::Text(text) => out.push_str(text),
            Self::Integer(value) => out.push_str(&value.to_string()),
            Self::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            Self::List(items) | Self::Production { values: items, .. } => {
                for item in items {
                    item.write_text(source, out);
                }
            }
            Self::Nothing | Self::Nullopt => {}
        }
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Self::CodePoint(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

/// Accumulator fed any number of values and finalized once
pub trait Sink {
    /// Feed the values produced by one item
    fn push(&mut self, values: Vec<Value>);

    /// Produce the accumulated value
    fn finish(self: Box<Self>) -> Value;
}

/// Collects each item into a [`Value::List`].
///
/// An item that produced exactly one value contributes that value; an item
/// with several values contributes a nested list; an item without values
/// contributes nothing.
#[derive(Debug, Default)]
pub struct ListSink {
    items: Vec<Value>,
}

impl Sink for ListSink {
    fn push(&mut self, mut values: Vec<Value>) {
        match values.len() {
            0 => {}
            1 => self.items.extend(values.pop()),
            _ => self.items.push(Value::List(values)),
        }
    }

    fn finish(self: Box<Self>) -> Value {
        Value::List(self.items)
    }
}

/// Counts the items pushed into it
#[derive(Debug, Default)]
pub struct CountSink {
    count: i128,
}

impl Sink for CountSink {
    fn push(&mut self, _values: Vec<Value>) {
        self.count += 1;
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Integer(self.count)
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn push(&mut self, _values: Vec<Value>) {}

    fn finish(self: Box<Self>) -> Value {
        Value::Nothing
    }
}

/// Factory creating a fresh sink for each list a production parses
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn Sink> + Send + Sync>;

type CallbackFn<U> = dyn Fn(&CallbackInput<'_, U>, Vec<Value>) -> Value + Send + Sync;

/// What a callback sees besides the collected values
#[derive(Debug, Clone, Copy)]
pub struct CallbackInput<'a, U> {
    /// Production name
    pub name: &'a str,
    /// Whole input, for decoding lexemes
    pub source: &'a [U],
    /// Span from production start to finish
    pub span: Span,
}

/// Production callback turning collected values into one value
pub struct Callback<U> {
    function: Arc<CallbackFn<U>>,
}

impl<U> Clone for Callback<U> {
    fn clone(&self) -> Self {
        Self {
            function: Arc::clone(&self.function),
        }
    }
}

impl<U> fmt::Debug for Callback<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

impl<U: CodeUnit> Callback<U> {
    /// Wrap an arbitrary function
    pub fn new(function: impl Fn(&CallbackInput<'_, U>, Vec<Value>) -> Value + Send + Sync + 'static) -> Self {
        Self {
            function: Arc::new(function),
        }
    }

    /// Call with the values a production collected
    pub fn call(&self, input: &CallbackInput<'_, U>, values: Vec<Value>) -> Value {
        (self.function)(input, values)
    }

    /// Default callback: [`Value::Production`] named after the production
    #[must_use]
    pub fn production() -> Self {
        Self::new(|input, values| Value::Production {
            name: input.name.into(),
            values,
        })
    }

    /// Pass a single value through unchanged; several values become a list
    #[must_use]
    pub fn forward() -> Self {
        Self::new(|_, mut values| match values.len() {
            0 => Value::Nothing,
            1 => values.pop().unwrap_or_default(),
            _ => Value::List(values),
        })
    }

    /// Collect all values into a list
    #[must_use]
    pub fn as_list() -> Self {
        Self::new(|_, values| {
            let mut sink = Box::new(ListSink::default());
            for value in values {
                match value {
                    Value::List(items) => sink.items.extend(items),
                    other => sink.push(vec![other]),
                }
            }
            sink.finish()
        })
    }

    /// Concatenate lexemes, code points and text into one string
    #[must_use]
    pub fn as_string() -> Self {
        Self::new(|input, values| {
            let mut out = String::new();
            for value in &values {
                value.write_text(input.source, &mut out);
            }
            Value::Text(out)
        })
    }

    /// Whole production span as text, ignoring the values
    #[must_use]
    pub fn lexeme_text() -> Self {
        Self::new(|input, _| Value::Text(units_to_string(slice(input.source, input.span))))
    }

    /// Build a value from the collected values
    pub fn construct(function: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static) -> Self {
        Self::new(move |_, values| function(values))
    }

    /// Left fold starting from `init`
    pub fn fold(init: Value, function: impl Fn(Value, Value) -> Value + Send + Sync + 'static) -> Self {
        Self::new(move |_, values| values.into_iter().fold(init.clone(), &function))
    }

    /// Discard everything
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_, _| Value::Nothing)
    }
}

fn slice<U>(source: &[U], span: Span) -> &[U] {
    let end = span.end().min(source.len());
    &source[span.begin().min(end)..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(source: &[u8]) -> CallbackInput<'_, u8> {
        CallbackInput {
            name: "test",
            source,
            span: Span::new(0, source.len()),
        }
    }

    #[test]
    fn test_list_sink_flattens_single_values() {
        let mut sink: Box<dyn Sink> = Box::new(ListSink::default());
        sink.push(vec![Value::Integer(1)]);
        sink.push(vec![]);
        sink.push(vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            sink.finish(),
            Value::List(vec![
                Value::Integer(1),
                Value::List(vec![Value::Integer(2), Value::Integer(3)]),
            ])
        );
    }

    #[test]
    fn test_count_sink() {
        let mut sink: Box<dyn Sink> = Box::new(CountSink::default());
        sink.push(vec![]);
        sink.push(vec![Value::Nullopt]);
        assert_eq!(sink.finish(), Value::Integer(2));
    }

    #[test]
    fn test_forward_and_production() {
        let source = b"";
        assert_eq!(
            Callback::<u8>::forward().call(&input(source), vec![Value::Bool(true)]),
            Value::Bool(true)
        );
        assert_eq!(
            Callback::<u8>::production().call(&input(source), vec![Value::Nullopt]),
            Value::Production {
                name: "test".into(),
                values: vec![Value::Nullopt],
            }
        );
    }

    #[test]
    fn test_as_string_decodes_lexemes() {
        let source = b"hello world";
        let values = vec![
            Value::Lexeme(Span::new(0, 5)),
            Value::CodePoint('-'),
            Value::Lexeme(Span::new(6, 11)),
        ];
        assert_eq!(
            Callback::<u8>::as_string().call(&input(source), values),
            Value::Text("hello-world".into())
        );
    }

    #[test]
    fn test_fold_sums() {
        let sum = Callback::<u8>::fold(Value::Integer(0), |acc, value| {
            Value::Integer(acc.as_integer().unwrap_or(0) + value.as_integer().unwrap_or(0))
        });
        let values = vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)];
        assert_eq!(sum.call(&input(b""), values), Value::Integer(6));
    }

    #[test]
    fn test_lexeme_text_uses_span() {
        let source = b"abc";
        let callback = Callback::<u8>::lexeme_text();
        assert_eq!(callback.call(&input(source), vec![]), Value::Text("abc".into()));
    }
}
