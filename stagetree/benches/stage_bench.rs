//! Benchmarks for validation and scheduling.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stagetree::prelude::*;

fn chain(len: usize) -> Stage {
    let children = (0..len).map(|i| {
        let stage = Stage::new(format!("s{i}"));
        if i == 0 {
            stage
        } else {
            stage.set_depends_on([format!("s{}", i - 1)])
        }
    });
    Stage::new("chain").add_children(children)
}

fn wide(width: usize, async_mode: bool) -> Stage {
    Stage::new("wide")
        .set_async(async_mode)
        .add_children((0..width).map(|i| Stage::new(format!("w{i}"))))
}

fn graph_benchmark(c: &mut Criterion) {
    let graph = chain(200).dependency_graph();
    c.bench_function("find_cycle_chain_200", |b| {
        b.iter(|| black_box(graph.find_cycle()))
    });
}

fn run_benchmark(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Runtime::new() else {
        return;
    };

    let sync_chain = chain(100);
    c.bench_function("run_sync_chain_100", |b| {
        b.iter(|| runtime.block_on(sync_chain.run(&ExecutionContext::new())))
    });

    let async_wide = wide(100, true);
    c.bench_function("run_async_wide_100", |b| {
        b.iter(|| runtime.block_on(async_wide.run(&ExecutionContext::new())))
    });
}

criterion_group!(benches, graph_benchmark, run_benchmark);
criterion_main!(benches);
