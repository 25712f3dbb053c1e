#![allow(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Benchmark invariant enforcement.
//!
//! Measures:
//! - Passing enforcement across growing name lists
//! - Failure cost, including message rendering
//! - Override lookup overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use invariants::{ErrorKind, InvariantSet, Overrides, Template};

// ============================================================================
// FIXTURES
// ============================================================================

struct Sample {
    values: Vec<u32>,
}

fn sample(len: usize) -> Sample {
    Sample {
        values: (1..=u32::try_from(len).expect("small len")).collect(),
    }
}

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("positive_{i}")).collect()
}

fn sample_set(count: usize) -> InvariantSet<Sample, String> {
    (0..count)
        .fold(
            InvariantSet::<Sample, String>::builder("Sample").configure(|cfg| {
                cfg.default_error_kind = Some(ErrorKind::Unprocessable);
                cfg.default_message =
                    Some(Template::parse("{type} failed {condition}").expect("valid"));
            }),
            |builder, i| {
                builder.invariant(format!("positive_{i}"), move |s: &Sample| {
                    s.values.get(i).is_some_and(|v| *v > 0)
                })
            },
        )
        .build()
}

// ============================================================================
// BENCHMARKS
// ============================================================================

fn bench_enforce_passing(c: &mut Criterion) {
    let mut group = c.benchmark_group("enforce_passing");

    for count in [1_usize, 4, 16] {
        let set = sample_set(count);
        let state = sample(count);
        let requested = names(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| set.enforce(black_box(&state), black_box(&requested)));
        });
    }

    group.finish();
}

fn bench_enforce_failing(c: &mut Criterion) {
    let mut group = c.benchmark_group("enforce_failing");
    let set = sample_set(4);
    let empty = Sample { values: Vec::new() };
    let requested = names(4);

    group.bench_function("type_template", |b| {
        b.iter(|| set.enforce(black_box(&empty), black_box(&requested)));
    });

    let overrides = Overrides::new()
        .message("positive_0".to_string(), "first value missing")
        .error_kind("positive_0".to_string(), ErrorKind::NotFound);
    group.bench_function("override", |b| {
        b.iter(|| set.enforce_with(black_box(&empty), black_box(&requested), &overrides));
    });

    group.finish();
}

criterion_group!(benches, bench_enforce_passing, bench_enforce_failing);
criterion_main!(benches);
