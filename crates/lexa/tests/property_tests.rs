//! Property-based tests
//!
//! Random inputs for lists, integers and trees; every parse must end in a
//! consistent state whatever the input.

#![cfg(test)]

use lexa::dsl::{ascii, brackets, choice, decimal, integer, lit, p, recurse, sep, while_};
use lexa::{Grammar, GrammarBuilder, Reader, TraverseEvent, Value};
use proptest::prelude::*;

fn number_list_grammar() -> Grammar<u8> {
    let mut builder = GrammarBuilder::new();
    let number = builder.production("number", integer::<u32, u8>(decimal()));
    let numbers = builder.production(
        "numbers",
        brackets("[", "]").opt_list(p(number), sep(",")),
    );
    builder.whitespace(ascii::space()).entry(numbers);
    builder.build().unwrap()
}

fn render(numbers: &[u32]) -> String {
    let items: Vec<_> = numbers.iter().map(u32::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn list_items(value: &Value) -> Vec<i128> {
    let Some((_, values)) = value.as_production() else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(Value::as_list)
        .flatten()
        .filter_map(|item| match item {
            Value::Production { values, .. } => values.first().and_then(Value::as_integer),
            other => other.as_integer(),
        })
        .collect()
}

proptest! {
    #[test]
    fn test_list_keeps_every_item(numbers in prop::collection::vec(any::<u32>(), 0..32)) {
        let grammar = number_list_grammar();
        let input = render(&numbers);
        let result = grammar.parse(Reader::from_str(&input));

        prop_assert!(result.is_success());
        prop_assert_eq!(result.position, input.len());
        let expected: Vec<i128> = numbers.iter().map(|n| i128::from(*n)).collect();
        prop_assert_eq!(list_items(result.value().unwrap()), expected);
    }

    #[test]
    fn test_u8_matches_std(text in "[0-9]{1,5}") {
        let mut builder = GrammarBuilder::<u8>::new();
        builder.production("byte", integer::<u8, u8>(decimal()));
        let grammar = builder.build().unwrap();

        let result = grammar.parse(Reader::from_str(&text));
        match text.parse::<u8>() {
            Ok(expected) => {
                prop_assert!(result.is_success());
                let values = result.value().and_then(Value::as_production).map(|(_, values)| values.to_vec());
                prop_assert_eq!(values, Some(vec![Value::Integer(i128::from(expected))]));
            }
            Err(_) => {
                prop_assert!(result.is_fatal_error());
                prop_assert_eq!(result.errors()[0].kind.tag(), "integer_overflow");
            }
        }
    }

    #[test]
    fn test_recovery_never_panics(input in "[\\[\\]0-9, x;]{0,40}") {
        let grammar = number_list_grammar();
        let mut errors = Vec::new();
        let result = grammar.validate(Reader::from_str(&input), &mut errors);

        prop_assert!(result.position <= input.len());
        prop_assert_eq!(result.error_count(), errors.len());
        if result.is_success() {
            prop_assert!(errors.is_empty());
        }
    }

    #[test]
    fn test_tree_events_balance(input in "[ab(),]{0,30}") {
        let mut builder = GrammarBuilder::<u8>::new();
        let atom = builder.declare("atom");
        let group = builder.declare("group");
        builder.define(atom, choice![lit("a"), lit("b"), p(group)]);
        builder.define(group, brackets("(", ")").opt_list(recurse(atom), sep(",")));
        let root = builder.production("root", while_(p(atom)));
        builder.entry(root);
        let grammar = builder.build().unwrap();

        let result = grammar.parse_tree(Reader::from_str(&input));
        let tree = result.value().unwrap();
        let mut depth = 0i64;
        for (event, _) in tree.traverse() {
            match event {
                TraverseEvent::Enter => depth += 1,
                TraverseEvent::Exit => depth -= 1,
                TraverseEvent::Leaf => {}
            }
            prop_assert!(depth >= 0);
        }
        prop_assert_eq!(depth, 0);

        let covered = tree.root().map_or(0, |root| root.span().end());
        prop_assert_eq!(covered, result.position);
    }
}
