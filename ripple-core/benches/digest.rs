use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{Cell, Computed, Engine, ManualScheduler, Value};
use serde_json::json;

fn increment(values: &[Value]) -> Value {
    json!(values[0].as_i64().unwrap_or(0) + 1)
}

fn chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for len in [10, 100, 1000] {
        let engine = Engine::new(ManualScheduler::new());
        let source = Cell::new(0);

        let mut tail: Computed = engine.computed([&source], increment).unwrap();
        for _ in 1..len {
            tail = engine.computed([&tail], increment).unwrap();
        }
        engine.digest().unwrap();

        let mut value = 0;
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                value += 1;
                source.set(value);
                engine.digest().unwrap();
                black_box(tail.get())
            })
        });
    }
    group.finish();
}

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [10, 100, 1000] {
        let engine = Engine::new(ManualScheduler::new());
        let source = Cell::new(0);

        let leaves: Vec<Computed> = (0..width)
            .map(|_| engine.computed([&source], increment).unwrap())
            .collect();
        engine.digest().unwrap();

        let mut value = 0;
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                value += 1;
                source.set(value);
                engine.digest().unwrap();
                black_box(leaves.last().and_then(Computed::get))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, chain, fan_out);
criterion_main!(benches);
