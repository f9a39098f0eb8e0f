//! Expression Benchmarks
//!
//! Measures the stages a calculator line goes through:
//!
//! - **Parse**: tokenizing and building the shared tree from text
//! - **Evaluate**: walking a pre-parsed tree with fixed variable bindings
//! - **Differentiate**: building the derivative tree
//! - **Numeric**: zero search, extremum search and Simpson quadrature
//!
//! Run with: `cargo bench --bench expressions`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lepton_calc::context::Bindings;
use lepton_calc::{ParsedExpression, Parser};

const EXPRESSIONS: [(&str, &str); 8] = [
    ("simple_add", "a + 1.1"),
    ("linear", "2.2*a + 1.1"),
    ("polynomial", "a^2 / (2*PI/b) - a/2.2"),
    ("complex_poly", "(a^3 + 2*a^2 - 5*a + 1) / (b^2 + 3*b + 2)"),
    ("trig", "sin(a)*cos(b) + tan(a/b)"),
    ("complex_numbers", "(a + 2i) * (b - i) / (1 + i)"),
    ("shared", "y = a*b + sqrt(a); y^2 + 3*y + 1"),
    (
        "very_complex",
        "(a^3 + b^2*c - 2*a*b + c) / ((a+b)*(b+c)*(a+c) + 1) + sqrt(a*b*c) - sqrt((a+b+c)^3)",
    ),
];

fn bindings() -> Bindings {
    Bindings::from([
        ("a".to_string(), 2.5),
        ("b".to_string(), 1.8),
        ("c".to_string(), 0.7),
        ("PI".to_string(), std::f64::consts::PI),
    ])
}

fn parse_all() -> Vec<(&'static str, ParsedExpression)> {
    let parser = Parser::new();
    EXPRESSIONS
        .iter()
        .map(|(name, text)| {
            let expr = parser
                .parse(text)
                .unwrap_or_else(|e| panic!("failed to parse {name}: {e}"));
            (*name, expr)
        })
        .collect()
}

fn benchmark_parse(c: &mut Criterion) {
    let parser = Parser::new();
    let mut group = c.benchmark_group("Parse");
    for (name, text) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("Parse", name), text, |b, text| {
            b.iter(|| black_box(parser.parse(black_box(text))))
        });
    }
    group.finish();
}

fn benchmark_evaluate(c: &mut Criterion) {
    let bindings = bindings();
    let mut group = c.benchmark_group("Evaluate");
    for (name, expr) in parse_all() {
        group.bench_with_input(BenchmarkId::new("Evaluate", name), &expr, |b, expr| {
            b.iter(|| black_box(expr.evaluate(black_box(&bindings))))
        });
    }
    group.finish();
}

fn benchmark_differentiate(c: &mut Criterion) {
    let bindings = bindings();
    let mut group = c.benchmark_group("Differentiate");
    for (name, expr) in parse_all() {
        group.bench_with_input(BenchmarkId::new("Derive", name), &expr, |b, expr| {
            b.iter(|| black_box(expr.differentiate(black_box("a"))))
        });

        let derivative = expr.differentiate("a");
        group.bench_with_input(
            BenchmarkId::new("EvaluateDerivative", name),
            &derivative,
            |b, derivative| b.iter(|| black_box(derivative.evaluate(black_box(&bindings)))),
        );
    }
    group.finish();
}

fn benchmark_numeric(c: &mut Criterion) {
    let parser = Parser::new();
    let none = Bindings::new();
    let cubic = parser.parse("x^3 - 2*x - 5").expect("valid expression");
    let bump = parser.parse("4 - (x - 1)^2").expect("valid expression");
    let wave = parser.parse("sin(x)^2").expect("valid expression");

    let mut group = c.benchmark_group("Numeric");
    group.bench_function("find_zero", |b| {
        b.iter(|| black_box(cubic.find_zero("x", &none, black_box(0.0), black_box(5.0))))
    });
    group.bench_function("find_extremum", |b| {
        b.iter(|| black_box(bump.find_extremum("x", &none, black_box(-5.0), black_box(5.0), true)))
    });
    group.bench_function("integrate", |b| {
        b.iter(|| black_box(wave.integrate("x", &none, black_box(0.0), black_box(3.0))))
    });
    group.bench_function("sigma", |b| {
        let series = parser.parse("sigma(1, 1000, k, 1/k^2)").expect("valid expression");
        b.iter(|| black_box(series.evaluate(&none)))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_evaluate,
    benchmark_differentiate,
    benchmark_numeric
);
criterion_main!(benches);
