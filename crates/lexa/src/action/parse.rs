use crate::context::{Handler, ProductionMarker};
use crate::error::Error;
use crate::grammar::{Grammar, ProductionInfo};
use crate::input::{CodeUnit, Span};
use crate::rule::TokenKind;
use crate::value::{Callback, CallbackInput, ListSink, Sink, Value};
use log::trace;

/// Handler producing semantic values.
///
/// When a production finishes, its callback turns the values it collected
/// into one value; productions without a callback produce
/// [`Value::Production`]. Lists inside a production feed the production's
/// sink, a [`ListSink`] unless configured otherwise.
pub struct ValueHandler<'g, U: CodeUnit> {
    grammar: &'g Grammar<U>,
    source: &'g [U],
    default_callback: Callback<U>,
    errors: Vec<Error>,
}

impl<'g, U: CodeUnit> ValueHandler<'g, U> {
    /// Handler for parsing `source` with `grammar`
    #[must_use]
    pub fn new(grammar: &'g Grammar<U>, source: &'g [U]) -> Self {
        Self {
            grammar,
            source,
            default_callback: Callback::production(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}

impl<U: CodeUnit> Handler for ValueHandler<'_, U> {
    fn start_production(&mut self, _info: &ProductionInfo, position: usize) -> ProductionMarker {
        ProductionMarker {
            begin: position,
            state: 0,
        }
    }

    fn token(&mut self, _kind: TokenKind, _begin: usize, _end: usize) {}

    fn finish_production(
        &mut self,
        info: &ProductionInfo,
        marker: ProductionMarker,
        values: Vec<Value>,
        position: usize,
    ) -> Value {
        let callback = self
            .grammar
            .production(info.id)
            .and_then(|production| production.callback())
            .unwrap_or(&self.default_callback);
        let input = CallbackInput {
            name: &info.name,
            source: self.source,
            span: Span::new(marker.begin, position),
        };
        let value = callback.call(&input, values);
        trace!("{} produced {value:?}", info.name);
        value
    }

    fn backtrack_production(&mut self, _info: &ProductionInfo, _marker: ProductionMarker) {}

    fn error(&mut self, _info: &ProductionInfo, error: Error) {
        self.errors.push(error);
    }

    fn get_sink(&mut self, info: &ProductionInfo) -> Box<dyn Sink> {
        match self.grammar.production(info.id).and_then(|production| production.sink()) {
            Some(factory) => factory(),
            None => Box::new(ListSink::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dsl::*;
    use crate::grammar::GrammarBuilder;
    use crate::input::Reader;
    use crate::value::{Callback, CountSink, Value};
    use std::sync::Arc;

    #[test]
    fn test_callback_replaces_production_value() {
        let mut builder = GrammarBuilder::<u8>::new();
        let number = builder.declare("number");
        builder
            .define(number, integer::<u8, u8>(decimal()))
            .callback(Callback::forward());
        builder.entry(number);
        let grammar = builder.build().unwrap();

        let result = grammar.parse(Reader::from_str("7"));
        assert_eq!(result.into_value(), Some(Value::Integer(7)));
    }

    #[test]
    fn test_list_feeds_production_sink() {
        let mut builder = GrammarBuilder::<u8>::new();
        let items = builder.declare("items");
        builder
            .define(items, list(lit("x"), sep(",")))
            .sink(Arc::new(|| Box::new(CountSink::default())))
            .callback(Callback::forward());
        builder.entry(items);
        let grammar = builder.build().unwrap();

        let result = grammar.parse(Reader::from_str("x,x,x"));
        assert_eq!(result.into_value(), Some(Value::Integer(3)));
    }

    #[test]
    fn test_as_string_reads_source() {
        let mut builder = GrammarBuilder::<u8>::new();
        let word = builder.declare("word");
        builder
            .define(word, capture(class_while_one(crate::engine::AsciiClass::Alpha)))
            .callback(Callback::as_string());
        builder.entry(word);
        let grammar = builder.build().unwrap();

        let result = grammar.parse(Reader::from_str("hello"));
        assert_eq!(result.value().and_then(Value::as_text), Some("hello"));
    }
}
