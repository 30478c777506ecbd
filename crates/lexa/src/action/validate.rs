use crate::context::{Handler, ProductionMarker};
use crate::error::{Error, ErrorSink};
use crate::grammar::ProductionInfo;
use crate::rule::TokenKind;
use crate::value::{NullSink, Sink, Value};

/// Handler that only checks the input.
///
/// Tokens and values are dropped; errors go straight to the caller's sink.
pub struct ValidateHandler<'s> {
    sink: &'s mut dyn ErrorSink,
}

impl<'s> ValidateHandler<'s> {
    pub fn new(sink: &'s mut dyn ErrorSink) -> Self {
        Self { sink }
    }
}

impl Handler for ValidateHandler<'_> {
    fn start_production(&mut self, _info: &ProductionInfo, position: usize) -> ProductionMarker {
        ProductionMarker {
            begin: position,
            state: 0,
        }
    }

    fn token(&mut self, _kind: TokenKind, _begin: usize, _end: usize) {}

    fn finish_production(
        &mut self,
        _info: &ProductionInfo,
        _marker: ProductionMarker,
        _values: Vec<Value>,
        _position: usize,
    ) -> Value {
        Value::Nothing
    }

    fn backtrack_production(&mut self, _info: &ProductionInfo, _marker: ProductionMarker) {}

    fn error(&mut self, _info: &ProductionInfo, error: Error) {
        self.sink.report(error);
    }

    fn get_sink(&mut self, _info: &ProductionInfo) -> Box<dyn Sink> {
        Box::new(NullSink)
    }
}
