#![no_main]
use libfuzzer_sys::fuzz_target;
use lexa::dsl::*;
use lexa::{Grammar, GrammarBuilder, Reader};
use std::sync::OnceLock;

/// JSON-like values: numbers, strings, arrays and objects, with recovery
/// inside every bracket pair
fn grammar() -> Option<&'static Grammar<u8>> {
    static GRAMMAR: OnceLock<Option<Grammar<u8>>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| {
            let mut builder = GrammarBuilder::<u8>::new();
            let value = builder.declare("value");
            let number = builder.production("number", integer::<i64, u8>(decimal()).signed());
            let string = builder.production("string", delimited("\"", "\"").escape(escape(lit("\\")).map('n', '\n')));
            let array = builder.production("array", brackets("[", "]").opt_list(recurse(value), sep(",")));
            let member = builder.production("member", seq![p(string), lit(":"), recurse(value)]);
            let object = builder.production("object", brackets("{", "}").opt_list(p(member), trailing_sep(",")));
            builder.define(value, choice![p(number), p(string), p(array), p(object)]);
            builder.whitespace(ascii::space()).entry(value);
            builder.build().ok()
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    // deep nesting recurses once per bracket
    if data.len() > 1024 {
        return;
    }
    let Some(grammar) = grammar() else {
        return;
    };

    let mut errors = Vec::new();
    let validated = grammar.validate(Reader::new(data), &mut errors);
    assert!(validated.position <= data.len());

    let parsed = grammar.parse(Reader::new(data));
    assert_eq!(parsed.outcome, validated.outcome);

    // The tree must exist even for inputs that fail
    let tree = grammar.parse_tree(Reader::new(data));
    assert!(tree.value().is_some());
});
