//! R-Tree benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use persistent_rtree::{Config, Entry, Point, RTree, Rect};
use std::hint::black_box;

fn grid_entries(size: usize) -> Vec<Entry<u64, 2>> {
    (0..size)
        .map(|i| {
            let x = (i % 100) as f64;
            let y = (i / 100) as f64;
            Entry::new(i as u64, Point::xy(x, y))
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Insert");

    for size in [100, 1000, 10000].iter() {
        let entries = grid_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let tree = RTree::new(Config::default()).insert_all(entries.iter().cloned());
                black_box(tree.size())
            });
        });
    }

    group.finish();
}

fn bench_bulk_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Bulk Load");

    for size in [1000, 10000].iter() {
        let entries = grid_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let tree = RTree::bulk_load(Config::default(), entries.iter().cloned());
                black_box(tree.size())
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Search");

    let tree = RTree::new(Config::default()).insert_all(grid_entries(10000));
    let query = Rect::new([25.0, 25.0], [75.0, 75.0]).unwrap();

    group.bench_function("search_10k", |b| {
        b.iter(|| black_box(tree.search(&query).count()));
    });

    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Nearest");

    let tree = RTree::new(Config::default()).insert_all(grid_entries(10000));
    let point = Point::xy(50.0, 50.0);

    group.bench_function("nearest_10_of_10k", |b| {
        b.iter(|| black_box(tree.nearest(&point, 10).count()));
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_bulk_load, bench_search, bench_nearest);
criterion_main!(benches);
