use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sumi::minibuffer::{common_prefix, HistoryStore};

fn bench_common_prefix(c: &mut Criterion) {
    let a = "the/quick/brown/fox/jumps/over/the/lazy/dog.txt";
    let b = "the/quick/brown/fox/jumped/ahead.txt";
    c.bench_function("common_prefix", |bencher| {
        bencher.iter(|| common_prefix(black_box(a), black_box(b)))
    });
}

fn bench_history_walk(c: &mut Criterion) {
    let mut store = HistoryStore::new();
    for i in 0..1000 {
        store.append("Run:", &format!("command-{i}"));
    }
    c.bench_function("history_walk_1000", |bencher| {
        bencher.iter(|| {
            let mut value = store.prev("Run:", "");
            for _ in 0..999 {
                value = store.prev("Run:", &value);
            }
            for _ in 0..1000 {
                store.next("Run:");
            }
            value
        })
    });
}

criterion_group!(benches, bench_common_prefix, bench_history_walk);
criterion_main!(benches);
