//! Cost of one Double DQN training step at a few batch sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::Rng;
use sparta::agent::DqnTrainerBuilder;
use sparta::config::TrainerConfig;
use sparta::replay_buffer::Transition;

const STATE_SIZE: usize = 16;
const ACTIONS: usize = 6;

fn random_state<R: Rng>(rng: &mut R) -> Array1<f64> {
    Array1::from_shape_fn(STATE_SIZE, |_| rng.gen_range(-1.0..1.0))
}

fn bench_train_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_step");

    for &batch_size in &[16usize, 32, 64] {
        let mut trainer = DqnTrainerBuilder::new()
            .model_type("bench")
            .input_size(STATE_SIZE)
            .actions((0..ACTIONS).collect::<Vec<usize>>())
            .config(TrainerConfig::default().batch_size(batch_size).hidden_size(64))
            .seed(1)
            .build()
            .unwrap();

        let mut rng = rand::thread_rng();
        for _ in 0..5_000 {
            let action = rng.gen_range(0..ACTIONS);
            let reward = rng.gen_range(-1.0..1.0);
            let done = rng.gen_bool(0.05);
            trainer.remember(Transition::new(
                random_state(&mut rng),
                action,
                reward,
                random_state(&mut rng),
                done,
            ));
        }

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, _| {
            b.iter(|| trainer.train(0.1).unwrap())
        });
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let trainer = DqnTrainerBuilder::new()
        .model_type("bench")
        .input_size(STATE_SIZE)
        .actions((0..ACTIONS).collect::<Vec<usize>>())
        .config(TrainerConfig::default().hidden_size(64))
        .build()
        .unwrap();
    let state = random_state(&mut rand::thread_rng());

    c.bench_function("predict", |b| b.iter(|| trainer.network().predict(state.view()).unwrap()));
}

criterion_group!(benches, bench_train_step, bench_predict);
criterion_main!(benches);
