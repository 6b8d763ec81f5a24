use std::collections::HashSet;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use uuid::Uuid;

use style_graph::algorithms::RelationshipSet;
use style_graph::invariants::ensure_acyclic_replacement;
use style_graph::models::{StyleId, StyleRelationship};

fn lcg_next(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state
}

fn synthetic_taxonomy(
    style_count: usize,
    edge_count: usize,
) -> (Vec<StyleId>, Vec<StyleRelationship>) {
    let ids = (0..style_count)
        .map(|idx| StyleId(Uuid::from_u128((idx as u128) + 1)))
        .collect::<Vec<_>>();

    let mut state = 0x1234_5678_9abc_def0u64;
    let mut seen = HashSet::with_capacity(edge_count);
    let mut edges = Vec::with_capacity(edge_count);
    while edges.len() < edge_count {
        let a = (lcg_next(&mut state) as usize) % style_count;
        let b = (lcg_next(&mut state) as usize) % style_count;
        if a == b {
            continue;
        }
        // Parents sit at the lower index, so the taxonomy stays acyclic.
        let (parent, child) = if a < b { (a, b) } else { (b, a) };
        let pair = (ids[parent], ids[child]);
        if seen.insert(pair) {
            edges.push(StyleRelationship {
                parent_id: pair.0,
                child_id: pair.1,
            });
        }
    }

    (ids, edges)
}

fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("taxonomy_scan");
    for (styles, edge_count) in [(1_000usize, 3_000usize), (3_000usize, 9_000usize)] {
        let (_, edges) = synthetic_taxonomy(styles, edge_count);
        let set = RelationshipSet::from_edges(&edges);

        group.throughput(Throughput::Elements(styles as u64));
        group.bench_with_input(
            BenchmarkId::new("has_cycle", format!("{styles}s_{edge_count}e")),
            &set,
            |b, set| {
                b.iter(|| black_box(set.has_cycle()));
            },
        );
    }
    group.finish();
}

fn bench_replacement_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("replacement_gate");
    for (styles, edge_count) in [(1_000usize, 3_000usize), (3_000usize, 9_000usize)] {
        let (ids, edges) = synthetic_taxonomy(styles, edge_count);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("acyclic_replacement", format!("{styles}s_{edge_count}e")),
            &(ids, edges),
            |b, (ids, edges)| {
                let mut seed = 42u64;
                b.iter(|| {
                    let child = ids[(lcg_next(&mut seed) as usize) % ids.len()];
                    let parents = [
                        ids[(lcg_next(&mut seed) as usize) % ids.len()],
                        ids[(lcg_next(&mut seed) as usize) % ids.len()],
                    ];
                    black_box(ensure_acyclic_replacement(edges, child, &parents).is_ok());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(cycle_checks, bench_full_scan, bench_replacement_gate);
criterion_main!(cycle_checks);
