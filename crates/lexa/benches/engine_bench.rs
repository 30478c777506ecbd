use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lexa::engine::{Radix, Trie, parse_integer};
use lexa::input::Reader;
use std::hint::black_box;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn",
    "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self", "static",
    "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
];

fn keyword_source(count: usize) -> String {
    KEYWORDS.iter().cycle().take(count).copied().collect::<Vec<_>>().join(" ")
}

fn bench_trie(c: &mut Criterion) {
    let Ok(trie) = Trie::<u8>::from_strings(KEYWORDS.iter().copied()) else {
        return;
    };
    let mut group = c.benchmark_group("trie_longest_match");
    for count in [64usize, 1024] {
        let source = keyword_source(count);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &source, |b, source| {
            b.iter(|| {
                let mut reader = Reader::from_str(source);
                let mut hits = 0usize;
                while !reader.is_eof() {
                    if trie.longest_match(&mut reader).is_some() {
                        hits += 1;
                    } else {
                        reader.bump();
                    }
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

fn bench_integers(c: &mut Criterion) {
    let numbers: Vec<String> = (0..1024u64).map(|n| (n * 7_919).to_string()).collect();

    c.bench_function("parse_integer_u32", |b| {
        b.iter(|| {
            for number in &numbers {
                black_box(parse_integer::<u32, u8>(number.as_bytes(), Radix::Decimal, false).ok());
            }
        });
    });

    c.bench_function("parse_integer_u64", |b| {
        b.iter(|| {
            for number in &numbers {
                black_box(parse_integer::<u64, u8>(number.as_bytes(), Radix::Decimal, false).ok());
            }
        });
    });
}

criterion_group!(benches, bench_trie, bench_integers);
criterion_main!(benches);
