use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lexa::dsl::*;
use lexa::{Grammar, GrammarBuilder, Reader};
use std::hint::black_box;

/// Nested lists of numbers: `[1, [2, 3], 4]`
fn nested_grammar() -> Option<Grammar<u8>> {
    let mut builder = GrammarBuilder::<u8>::new();
    let value = builder.declare("value");
    let number = builder.production("number", integer::<u64, u8>(decimal()));
    let array = builder.production("array", brackets("[", "]").opt_list(recurse(value), sep(",")));
    builder.define(value, choice![p(number), p(array)]);
    builder.whitespace(ascii::space()).entry(value);
    builder.build().ok()
}

fn nested_source(items: usize) -> String {
    let mut source = String::from("[");
    for index in 0..items {
        if index > 0 {
            source.push_str(", ");
        }
        if index % 8 == 0 {
            source.push_str(&format!("[{index}, {}, []]", index + 1));
        } else {
            source.push_str(&index.to_string());
        }
    }
    source.push(']');
    source
}

fn bench_actions(c: &mut Criterion) {
    let Some(grammar) = nested_grammar() else {
        return;
    };
    let mut group = c.benchmark_group("nested_lists");
    for items in [100usize, 10_000] {
        let source = nested_source(items);
        group.throughput(Throughput::Bytes(source.len() as u64));

        group.bench_with_input(BenchmarkId::new("validate", items), &source, |b, source| {
            b.iter(|| {
                let mut errors = Vec::new();
                black_box(grammar.validate(Reader::from_str(source), &mut errors))
            });
        });

        group.bench_with_input(BenchmarkId::new("parse", items), &source, |b, source| {
            b.iter(|| black_box(grammar.parse(Reader::from_str(source)).into_value()));
        });

        group.bench_with_input(BenchmarkId::new("parse_tree", items), &source, |b, source| {
            b.iter(|| {
                let result = grammar.parse_tree(Reader::from_str(source));
                black_box(result.value().map(lexa::ParseTree::node_count))
            });
        });
    }
    group.finish();
}

fn bench_recovery(c: &mut Criterion) {
    let Some(grammar) = nested_grammar() else {
        return;
    };
    let source = nested_source(1_000).replace('7', "x");
    c.bench_function("nested_lists_recovery", |b| {
        b.iter(|| {
            let mut errors = Vec::new();
            let result = grammar.validate(Reader::from_str(&source), &mut errors);
            black_box((result, errors.len()))
        });
    });
}

criterion_group!(benches, bench_actions, bench_recovery);
criterion_main!(benches);
