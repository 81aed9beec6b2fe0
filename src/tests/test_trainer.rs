use std::sync::Arc;

use ndarray::{array, Array1};

use super::init_logging;
use crate::agent::{DqnTrainer, DqnTrainerBuilder};
use crate::config::TrainerConfig;
use crate::error::SpartaError;
use crate::network::QNetwork;
use crate::persistence::{MemoryModelStore, ModelStore};
use crate::replay_buffer::{ReplayBuffer, Transition};

fn trainer(config: TrainerConfig, seed: u64) -> DqnTrainer<u8> {
    DqnTrainerBuilder::new()
        .model_type("slime")
        .input_size(2)
        .actions(vec![0u8, 1])
        .config(config)
        .seed(seed)
        .build()
        .unwrap()
}

fn constant_state() -> Array1<f64> {
    array![1.0, 0.5]
}

fn fill_bandit(trainer: &DqnTrainer<u8>, count: usize) {
    for i in 0..count {
        let action = (i % 2) as u8;
        let reward = if action == 0 { 1.0 } else { -1.0 };
        trainer.remember(Transition::new(constant_state(), action, reward, constant_state(), false));
    }
}

#[test]
fn test_builder_requires_fields() {
    assert!(DqnTrainerBuilder::<u8>::new().input_size(2).actions(vec![0, 1]).build().is_err());
    assert!(DqnTrainerBuilder::<u8>::new().model_type("x").actions(vec![0, 1]).build().is_err());
    assert!(DqnTrainerBuilder::<u8>::new()
        .model_type("x")
        .input_size(2)
        .actions(vec![0, 1])
        .config(TrainerConfig::default().batch_size(0))
        .build()
        .is_err());
}

#[test]
fn test_idle_until_batch_available() {
    let mut trainer = trainer(TrainerConfig::default().batch_size(8).hidden_size(4), 1);
    fill_bandit(&trainer, 7);
    let before = trainer.network().copy();

    assert_eq!(trainer.train(0.5).unwrap(), None);
    assert_eq!(trainer.steps(), 0);
    assert_eq!(trainer.network().hidden.weights, before.hidden.weights);

    fill_bandit(&trainer, 1);
    assert!(trainer.train(0.5).unwrap().is_some());
    assert_eq!(trainer.steps(), 1);
}

#[test]
fn test_target_network_syncs_on_schedule() {
    init_logging();
    let config = TrainerConfig::default()
        .batch_size(4)
        .hidden_size(4)
        .target_update_frequency(3)
        .learning_rate(0.1);
    let mut trainer = trainer(config, 2);
    fill_bandit(&trainer, 20);
    let initial = trainer.target_network().copy();

    for _ in 0..2 {
        trainer.train(0.3).unwrap();
        assert_eq!(trainer.target_network().hidden.weights, initial.hidden.weights);
        assert_eq!(trainer.target_network().output.weights, initial.output.weights);
    }

    trainer.train(0.3).unwrap();
    assert_eq!(trainer.steps(), 3);
    assert_eq!(trainer.target_network().hidden.weights, trainer.network().hidden.weights);
    assert_eq!(trainer.target_network().hidden.biases, trainer.network().hidden.biases);
    assert_eq!(trainer.target_network().output.weights, trainer.network().output.weights);
    assert_eq!(trainer.target_network().output.biases, trainer.network().output.biases);

    trainer.train(0.3).unwrap();
    assert_ne!(trainer.target_network().output.biases, trainer.network().output.biases);
}

#[test]
fn test_learns_rewarded_action() {
    init_logging();
    let config = TrainerConfig::default()
        .batch_size(32)
        .hidden_size(4)
        .learning_rate(0.05)
        .gamma(0.9)
        .target_update_frequency(10);
    let mut trainer = trainer(config, 42);
    fill_bandit(&trainer, 200);

    for _ in 0..600 {
        trainer.train(0.1).unwrap();
    }

    let state = constant_state();
    assert_eq!(*trainer.network().best_action(state.view()).unwrap(), 0);
    let q = trainer.network().predict(state.view()).unwrap();
    assert!(q[0] > q[1], "q-values {:?}", q);
    assert!(trainer.network().is_finite());
}

#[test]
fn test_unknown_actions_are_skipped() {
    let mut trainer = trainer(TrainerConfig::default().batch_size(4).hidden_size(4), 5);
    for _ in 0..4 {
        trainer.remember(Transition::new(constant_state(), 7u8, 1.0, constant_state(), false));
    }
    let before = trainer.network().copy();

    assert_eq!(trainer.train(0.0).unwrap(), Some(0.0));
    assert_eq!(trainer.network().hidden.weights, before.hidden.weights);
    assert_eq!(trainer.network().output.biases, before.output.biases);
}

#[test]
fn test_terminal_transitions_ignore_future() {
    // With done = true the target is just the clipped reward, so the output bias for
    // action 0 must move toward +1 regardless of the target network.
    let config = TrainerConfig::default().batch_size(1).hidden_size(2).learning_rate(0.1);
    let mut trainer = trainer(config, 9);
    let network = QNetwork::from_snapshot(
        "slime",
        &crate::persistence::ModelSnapshot {
            input_size: 2,
            hidden_weights: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            hidden_biases: vec![0.0, 0.0],
            output_weights: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
            output_biases: vec![0.0, 0.0],
            performance: 0.0,
        },
        vec![0u8, 1],
    )
    .unwrap();
    trainer.replace_network(network).unwrap();
    trainer.remember(Transition::new(constant_state(), 0u8, 5.0, constant_state(), true));

    let loss = trainer.train(0.0).unwrap().unwrap();
    assert_eq!(loss, 1.0);
    assert!((trainer.network().output.biases[0] - 0.1).abs() < 1e-12);
    assert_eq!(trainer.network().output.biases[1], 0.0);
}

#[test]
fn test_stats_and_save() {
    let mut trainer = trainer(TrainerConfig::default().batch_size(4).hidden_size(4), 3);
    fill_bandit(&trainer, 10);
    trainer.train(0.25).unwrap();

    let stats = trainer.stats();
    assert_eq!(stats.steps, 1);
    assert_eq!(stats.epsilon, 0.25);
    assert_eq!(stats.buffer_len, 10);
    assert_eq!(stats.average_reward, 0.0);

    let store = MemoryModelStore::new();
    assert!(trainer.save(&store).unwrap());
    assert_eq!(store.load("slime").unwrap().unwrap().performance, 0.0);
}

#[test]
fn test_mis_sized_transition_leaves_no_stale_gradients() {
    let config = TrainerConfig::default().batch_size(2).hidden_size(4).learning_rate(0.1);
    let buffer = Arc::new(ReplayBuffer::with_seed(2, 11).unwrap());
    let mut trainer = DqnTrainerBuilder::new()
        .model_type("slime")
        .input_size(2)
        .actions(vec![0u8, 1])
        .config(config.clone())
        .buffer(Arc::clone(&buffer))
        .seed(11)
        .build()
        .unwrap();

    let terminal = Transition::new(constant_state(), 0u8, 1.0, constant_state(), true);
    buffer.add(terminal.clone());
    buffer.add(Transition::new(array![1.0, 0.5, 0.25], 1u8, -1.0, constant_state(), true));

    let mut failure = None;
    for _ in 0..200 {
        if let Err(err) = trainer.train(0.0) {
            failure = Some(err);
            break;
        }
    }
    assert!(matches!(failure, Some(SpartaError::DimensionMismatch { .. })));
    assert_eq!(trainer.optimizer().pending_samples(), 0);
    assert!(trainer.optimizer().hidden_weight_gradients().iter().all(|&g| g == 0.0));
    assert!(trainer.optimizer().output_weight_gradients().iter().all(|&g| g == 0.0));
    assert!(trainer.optimizer().output_bias_gradients().iter().all(|&g| g == 0.0));

    // The next valid step matches a trainer that never saw the bad transition.
    let mut fresh = trainer_with_network(config, trainer.network().copy());
    buffer.clear();
    for _ in 0..2 {
        buffer.add(terminal.clone());
        fresh.remember(terminal.clone());
    }
    let steps = trainer.steps();
    trainer.train(0.0).unwrap();
    fresh.train(0.0).unwrap();

    assert_eq!(trainer.steps(), steps + 1);
    assert_eq!(trainer.network().hidden.weights, fresh.network().hidden.weights);
    assert_eq!(trainer.network().hidden.biases, fresh.network().hidden.biases);
    assert_eq!(trainer.network().output.weights, fresh.network().output.weights);
    assert_eq!(trainer.network().output.biases, fresh.network().output.biases);
}

fn trainer_with_network(config: TrainerConfig, network: QNetwork<u8>) -> DqnTrainer<u8> {
    DqnTrainer::new(network, config.replay_capacity(2)).unwrap()
}
