//! HNSW benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weft_hnsw::{Graph, GraphConfig, Node};
use weft_vector::euclidean_distance;

fn generate_nodes(n: usize, dims: usize) -> Vec<Node<u32>> {
    (0..n)
        .map(|i| {
            let value = (0..dims).map(|j| ((i * j) % 100) as f32 / 100.0).collect();
            Node::new(i as u32, value)
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");
    group.sample_size(10);

    for n in [100, 1000].iter() {
        let nodes = generate_nodes(*n, 128);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bencher, _| {
            bencher.iter(|| {
                let graph: Graph<u32> =
                    Graph::with_seed(euclidean_distance, GraphConfig::default(), 1);
                graph.add(black_box(nodes.clone())).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search");

    for n in [1000, 10000].iter() {
        let graph: Graph<u32> = Graph::with_seed(euclidean_distance, GraphConfig::default(), 1);
        graph.add(generate_nodes(*n, 128)).unwrap();

        let query: Vec<f32> = (0..128).map(|i| i as f32 / 128.0).collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bencher, _| {
            bencher.iter(|| graph.search(black_box(&query), 10).unwrap())
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_delete");
    group.sample_size(10);

    group.bench_function("1000_delete_half", |bencher| {
        bencher.iter_batched(
            || {
                let graph: Graph<u32> =
                    Graph::with_seed(euclidean_distance, GraphConfig::default(), 1);
                graph.add(generate_nodes(1000, 128)).unwrap();
                graph
            },
            |graph| {
                for key in (0..1000u32).step_by(2) {
                    graph.delete(black_box(&key));
                }
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_delete);
criterion_main!(benches);
