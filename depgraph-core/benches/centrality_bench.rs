// Benchmark graph construction and centrality at varying graph sizes.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use depgraph_core::analyze::{CentralityConfig, compute_betweenness, compute_pagerank};
use depgraph_core::construct::build_graph;
use depgraph_core::types::{CallReference, CodeObject, ObjectKind};

/// Synthetic code objects that mimic a package-structured call graph.
///
/// `count` procedures spread over packages of 50; each calls ~`fan_out`
/// others, picked with prime multipliers so the graph is sparse and
/// connected-ish. Half the calls are package-qualified, half unqualified.
fn synthetic_objects(count: usize, fan_out: usize) -> Vec<CodeObject> {
    let primes = [7, 13, 31, 61, 127, 251];
    let name = |i: usize| (format!("pkg_{}", i / 50), format!("proc_{i}"));

    (0..count)
        .map(|i| {
            let (pkg, proc_name) = name(i);
            let calls = primes[..fan_out.min(primes.len())]
                .iter()
                .map(|&p| (i.wrapping_mul(p).wrapping_add(1)) % count)
                .filter(|&t| t != i)
                .map(|t| {
                    let (target_pkg, target) = name(t);
                    if t % 2 == 0 {
                        CallReference::new(format!("{target_pkg}.{target}"))
                    } else {
                        CallReference::new(target)
                    }
                })
                .collect();
            CodeObject::new(&pkg, &proc_name, ObjectKind::Procedure).with_calls(calls)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for count in [1_000, 10_000] {
        let objects = synthetic_objects(count, 3);
        group.bench_with_input(BenchmarkId::new("objects", count), &objects, |b, objs| {
            b.iter(|| build_graph(objs));
        });
    }

    group.finish();
}

fn bench_pagerank(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagerank");
    let config = CentralityConfig::default();

    for count in [1_000, 10_000] {
        let graph = build_graph(&synthetic_objects(count, 3));
        group.bench_with_input(BenchmarkId::new("nodes", count), &graph, |b, g| {
            b.iter(|| compute_pagerank(g, &config));
        });
    }

    group.finish();
}

fn bench_betweenness(c: &mut Criterion) {
    let mut group = c.benchmark_group("betweenness");
    // Betweenness is O(V*E), so keep sizes smaller
    group.sample_size(10);

    let exact = CentralityConfig::default();
    for count in [100, 500, 1_000] {
        let graph = build_graph(&synthetic_objects(count, 3));
        group.bench_with_input(BenchmarkId::new("exact_nodes", count), &graph, |b, g| {
            b.iter(|| compute_betweenness(g, &exact));
        });
    }

    // Forced sampling at larger scales
    let sampled = CentralityConfig {
        approx_threshold: 1_000,
        ..CentralityConfig::default()
    };
    for count in [5_000, 10_000] {
        let graph = build_graph(&synthetic_objects(count, 3));
        group.bench_with_input(BenchmarkId::new("approx_nodes", count), &graph, |b, g| {
            b.iter(|| compute_betweenness(g, &sampled));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_pagerank, bench_betweenness);
criterion_main!(benches);
