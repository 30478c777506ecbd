use crate::error::Error;
use crate::grammar::ProductionInfo;
use crate::rule::TokenKind;
use crate::value::{ListSink, Sink, Value};

/// Handler state captured when a production starts.
///
/// The context hands it back unchanged to the matching finish, cancel or
/// backtrack call. `state` is free for the handler to use, e.g. as an
/// index into its own stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductionMarker {
    pub begin: usize,
    pub state: usize,
}

/// Side effects of running a grammar.
///
/// The context calls these in lock-step with production dispatch: every
/// `start_production` is matched by exactly one of `finish_production`,
/// `cancel_production` or `backtrack_production`, in LIFO order.
pub trait Handler {
    /// A production begins at `position`
    fn start_production(&mut self, info: &ProductionInfo, position: usize) -> ProductionMarker;

    /// A token matched `begin..end`
    fn token(&mut self, kind: TokenKind, begin: usize, end: usize);

    /// The production succeeded; turn its values into one value
    fn finish_production(
        &mut self,
        info: &ProductionInfo,
        marker: ProductionMarker,
        values: Vec<Value>,
        position: usize,
    ) -> Value;

    /// The production consumed nothing and is discarded
    fn backtrack_production(&mut self, info: &ProductionInfo, marker: ProductionMarker);

    /// The production failed after reporting an error.
    ///
    /// Discards the production by default.
    fn cancel_production(&mut self, info: &ProductionInfo, marker: ProductionMarker, position: usize) {
        let _ = position;
        self.backtrack_production(info, marker);
    }

    /// An error was reported inside the production
    fn error(&mut self, info: &ProductionInfo, error: Error);

    /// Sink for a list or loop parsed inside the production
    fn get_sink(&mut self, info: &ProductionInfo) -> Box<dyn Sink> {
        let _ = info;
        Box::new(ListSink::default())
    }
}

/// Handler that ignores everything; used for speculative parsing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
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

    fn error(&mut self, _info: &ProductionInfo, _error: Error) {}
}
