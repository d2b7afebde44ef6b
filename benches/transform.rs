#![allow(clippy::all)]
//! Benchmarks for statement tree transformation.
//!
//! Tests: expand and flatten of whole collections, grammar validation, deep trees.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use r0n_waf_control::waf::{
    expand_collection, flatten_collection, ByteMatchStatement, DefaultAction, Expander,
    FieldToMatch, Grammar, GrammarContext, PositionalConstraint, RateBasedStatement, Rule,
    RuleAction, RuleCollection, Scope, Statement, TextTransformation, TextTransformationType,
};
use std::hint::black_box;

fn byte_match(i: usize) -> Statement {
    Statement::ByteMatch(ByteMatchStatement {
        field_to_match: FieldToMatch::SingleHeader {
            name: format!("x-header-{i}"),
        },
        positional_constraint: PositionalConstraint::Contains,
        search_string: format!("needle-{i}"),
        text_transformations: vec![
            TextTransformation::new(0, TextTransformationType::UrlDecode),
            TextTransformation::new(1, TextTransformationType::Lowercase),
        ],
    })
}

fn collection(rules: usize) -> RuleCollection {
    let mut acl = RuleCollection::web_acl(
        "bench",
        DefaultAction::Allow {
            custom_request_handling: None,
        },
    );
    for i in 0..rules {
        let statement = match i % 3 {
            0 => Statement::or(vec![
                Statement::and(vec![byte_match(i), Statement::not(Statement::geo(["US"]))]),
                byte_match(i + 1),
            ]),
            1 => Statement::RateBased(Box::new(
                RateBasedStatement::per_ip(1000).with_scope_down(byte_match(i)),
            )),
            _ => byte_match(i),
        };
        // Reverse priorities so flatten has to reorder
        let priority = (rules - i) as i32;
        acl.rules
            .push(Rule::new(format!("rule-{i}"), priority, RuleAction::block(), statement));
    }
    acl
}

// ---------------------------------------------------------------------------
// Expand / flatten
// ---------------------------------------------------------------------------

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/expand");
    let expander = Expander::default();

    for size in [1, 10, 100] {
        let acl = collection(size);
        group.bench_with_input(BenchmarkId::new("unchecked", size), &acl, |b, acl| {
            b.iter(|| black_box(expand_collection(acl)));
        });
        group.bench_with_input(BenchmarkId::new("checked", size), &acl, |b, acl| {
            b.iter(|| black_box(expander.expand_collection(acl).unwrap()));
        });
    }

    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/flatten");

    for size in [1, 10, 100] {
        let wire = expand_collection(&collection(size));
        group.bench_with_input(BenchmarkId::new("collection", size), &wire, |b, wire| {
            b.iter(|| black_box(flatten_collection(wire, Scope::Regional).unwrap()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn bench_grammar(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform/grammar");

    for depth in [1usize, 4, 8] {
        let mut statement = byte_match(0);
        for _ in 0..depth {
            statement = Statement::not(statement);
        }
        let grammar = Grammar::new(depth, depth);
        group.bench_with_input(BenchmarkId::new("nested_not", depth), &statement, |b, s| {
            b.iter(|| black_box(grammar.check(s, GrammarContext::WebAclRoot).is_ok()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expand, bench_flatten, bench_grammar);
criterion_main!(benches);
