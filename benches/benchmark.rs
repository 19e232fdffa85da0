use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rainflow::{ClassParams, CounterConfig, Flags, RainflowCounter, ResidualMethod};
use rand::distributions::{Distribution, Uniform};

fn random_series(len: usize) -> Vec<f64> {
    let step = Uniform::new(0.0, 50.0);
    let mut rng = rand::thread_rng();
    step.sample_iter(&mut rng).take(len).collect()
}

fn bench_rainflow(c: &mut Criterion) {
    let samples = random_series(100000);
    let config = CounterConfig::new(ClassParams::from_range(50.0, 0.0, 100).unwrap(), 0.5);

    c.bench_function("rainflow counting on large dataset", |b| {
        b.iter(|| {
            let counter = RainflowCounter::from_series(&config, black_box(&samples), ResidualMethod::None).unwrap();
            black_box(counter.pseudo_damage());
        });
    });
}

fn bench_rainflow_chunked(c: &mut Criterion) {
    let samples = random_series(100000);

    c.bench_function("rainflow counting in chunks of 1024", |b| {
        b.iter(|| {
            let mut counter = RainflowCounter::new();
            counter.init(100, 0.5, 0.0, 0.5, Flags::COUNT_MATRIX).unwrap();
            for chunk in samples.chunks(1024) {
                counter.feed(black_box(chunk)).unwrap();
            }
            counter.finalize(ResidualMethod::None).unwrap();
            black_box(counter.cycles());
        });
    });
}

criterion_group!(benches, bench_rainflow, bench_rainflow_chunked);
criterion_main!(benches);
