//! Parse trees built through `Grammar::parse_tree`

use lexa::dsl::*;
use lexa::engine::AsciiClass;
use lexa::rule::IntoRule;
use lexa::tree::NodeKind;
use lexa::{GrammarBuilder, ParseConfig, Reader, TokenKind, TraverseEvent, TreeConfig};

fn events(tree: &lexa::ParseTree) -> Vec<(TraverseEvent, String)> {
    tree.traverse()
        .map(|(event, node)| (event, format!("{node:?}")))
        .collect()
}

#[test]
fn test_delimited_tree() {
    let mut builder = GrammarBuilder::<u8>::new();
    builder.production("group", delimited("(", ")"));
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("(ab)"));
    assert!(result.is_success());
    let tree = result.value().unwrap();

    let kinds: Vec<_> = tree.traverse().map(|(event, _)| event).collect();
    assert_eq!(
        kinds,
        [
            TraverseEvent::Enter,
            TraverseEvent::Leaf,
            TraverseEvent::Leaf,
            TraverseEvent::Leaf,
            TraverseEvent::Exit
        ]
    );

    let root = tree.root().unwrap();
    assert_eq!(root.production_name(), Some("group"));
    assert_eq!(root.span().range(), 0..4);
    let tokens: Vec<_> = root.children().map(|child| child.token_kind()).collect();
    assert_eq!(
        tokens,
        [
            Some(TokenKind::Literal),
            Some(TokenKind::Unknown),
            Some(TokenKind::Literal)
        ]
    );
    let content = root.children().nth(1).unwrap();
    assert_eq!(content.lexeme(b"(ab)"), b"ab");
}

#[test]
fn test_delimited_escape_splits_content() {
    let mut builder = GrammarBuilder::<u8>::new();
    builder.production(
        "group",
        delimited("(", ")").escape(escape(lit("\\")).capture(AsciiClass::Punct.into())),
    );
    let grammar = builder.build().unwrap();

    let source = b"(a\\)b)";
    let result = grammar.parse_tree(Reader::new(source));
    assert!(result.is_success());
    let root = result.value().unwrap().root().unwrap();

    let tokens: Vec<_> = root
        .children()
        .map(|child| (child.token_kind(), child.span().range()))
        .collect();
    assert_eq!(
        tokens,
        [
            (Some(TokenKind::Literal), 0..1),
            (Some(TokenKind::Unknown), 1..2),
            (Some(TokenKind::Literal), 2..3),
            (Some(TokenKind::Literal), 3..4),
            (Some(TokenKind::Unknown), 4..5),
            (Some(TokenKind::Literal), 5..6),
        ]
    );

    let text: Vec<u8> = root.children().flat_map(|child| child.lexeme(source).to_vec()).collect();
    assert_eq!(text, source);
}

#[test]
fn test_backtracked_production_leaves_no_nodes() {
    let mut builder = GrammarBuilder::<u8>::new();
    let root = builder.declare("root");
    let x = builder.production("x", lit("x"));
    let y = builder.production("y", lit("y"));
    builder.define(root, choice![p(x), p(y)]);
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("y"));
    assert!(result.is_success());
    let tree = result.value().unwrap();
    assert_eq!(tree.node_count(), 3);

    let child = tree.root().unwrap().first_child().unwrap();
    assert_eq!(child.production_name(), Some("y"));
    assert!(child.is_last_child());
    assert_eq!(child.parent(), tree.root());
}

#[test]
fn test_whitespace_is_a_token() {
    let mut builder = GrammarBuilder::<u8>::new();
    builder.production("pair", seq![lit("a"), lit("b")]);
    builder.whitespace(ascii::space());
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("a  b"));
    let tree = result.value().unwrap();
    let spans: Vec<_> = tree
        .root()
        .unwrap()
        .children()
        .map(|child| (child.token_kind(), child.span().range()))
        .collect();
    assert_eq!(
        spans,
        [
            (Some(TokenKind::Literal), 0..1),
            (Some(TokenKind::Whitespace), 1..3),
            (Some(TokenKind::Literal), 3..4),
        ]
    );
}

#[test]
fn test_transparent_production_has_no_node() {
    let mut builder = GrammarBuilder::<u8>::new();
    let root = builder.declare("root");
    let hidden = builder.declare("hidden");
    builder.define(root, seq![p(hidden), lit("c")]);
    builder.define(hidden, seq![lit("a"), lit("b")]).transparent();
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("abc"));
    let tree = result.value().unwrap();
    let root = tree.root().unwrap();
    assert_eq!(root.children().count(), 3);
    assert!(root.children().all(|child| child.is_token()));
    assert_eq!(tree.node_count(), 4);
}

#[test]
fn test_transparent_entry_still_gets_root() {
    let mut builder = GrammarBuilder::<u8>::new();
    let root = builder.declare("root");
    builder.define(root, lit("a")).transparent();
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("a"));
    let tree = result.value().unwrap();
    assert_eq!(tree.root().unwrap().production_name(), Some("root"));
}

#[test]
fn test_token_production_merges_runs() {
    let mut builder = GrammarBuilder::<u8>::new();
    let root = builder.declare("root");
    let word = builder.declare("word");
    builder.define(root, p(word));
    builder.define(word, while_one(ascii::alpha())).token();
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("abc"));
    let tree = result.value().unwrap();
    let word = tree.root().unwrap().first_child().unwrap();
    assert_eq!(word.production_name(), Some("word"));
    assert_eq!(word.children().count(), 1);
    assert_eq!(word.first_child().unwrap().span().range(), 0..3);
}

#[test]
fn test_failed_parse_keeps_partial_tree() {
    let mut builder = GrammarBuilder::<u8>::new();
    let root = builder.declare("root");
    let inner = builder.declare("inner");
    builder.define(root, seq![lit("a"), p(inner)]);
    builder.define(inner, seq![lit("b"), lit("c")]);
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("abx"));
    assert!(result.is_fatal_error());
    assert_eq!(result.errors().len(), 1);

    let tree = result.value().unwrap();
    assert_eq!(tree.node_count(), 4);
    let inner = tree.root().unwrap().children().nth(1).unwrap();
    assert_eq!(inner.production_name(), Some("inner"));
    assert_eq!(inner.children().count(), 1);
    assert_eq!(inner.span().range(), 1..2);
}

#[test]
fn test_recovery_skips_become_error_tokens() {
    let mut builder = GrammarBuilder::<u8>::new();
    builder.production("items", brackets("[", "]").list(lit("x").into_rule(), sep(",")));
    let grammar = builder.build().unwrap();

    let result = grammar.parse_tree(Reader::from_str("[x,yy]"));
    assert!(result.is_recovered_error());
    let tree = result.value().unwrap();
    let errors: Vec<_> = tree
        .root()
        .unwrap()
        .children()
        .filter(|child| child.token_kind() == Some(TokenKind::Error))
        .map(|child| child.span().range())
        .collect();
    assert_eq!(errors, [3..5]);
}

#[test]
fn test_tree_config_does_not_change_shape() {
    let mut builder = GrammarBuilder::<u8>::new();
    let item = builder.production("item", lit("ab"));
    let items = builder.production("items", while_(p(item)));
    builder.entry(items);
    let grammar = builder.build().unwrap();
    let input = "ab".repeat(40);

    let compact = grammar.parse_tree(Reader::from_str(&input));
    let wide = grammar.parse_tree_with(
        Reader::from_str(&input),
        ParseConfig::default(),
        TreeConfig {
            slab_capacity: 4,
            compact_tokens: false,
        },
    );

    let compact = compact.value().unwrap();
    let wide = wide.value().unwrap();
    assert_eq!(compact.node_count(), 81);
    assert_eq!(events(compact), events(wide));
    assert!(matches!(
        wide.root().unwrap().first_child().unwrap().kind(),
        NodeKind::Production(_)
    ));
}

#[test]
fn test_node_lookup_out_of_range() {
    let mut builder = GrammarBuilder::<u8>::new();
    builder.production("word", while_(ascii::alpha()));
    let grammar = builder.build().unwrap();

    let small = grammar.parse_tree(Reader::from_str("a")).into_value().unwrap();
    let large = grammar.parse_tree(Reader::from_str("abcdef")).into_value().unwrap();

    let root = small.root().unwrap();
    assert_eq!(small.node(root.id()).unwrap(), root);

    let last = large
        .traverse()
        .filter(|(event, _)| *event == TraverseEvent::Leaf)
        .last()
        .map(|(_, node)| node.id())
        .unwrap();
    assert!(large.node(last).is_ok());
    assert!(small.node(last).is_err());
}
