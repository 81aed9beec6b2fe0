//! # Sparta - On-line Double DQN for Simulated Agents
//!
//! Sparta is the learning engine behind agents that tick inside a real-time simulation:
//! every agent observes a numeric state, picks an action, later receives its reward, and a
//! shared Q-network is trained incrementally from the accumulated experience.
//!
//! ## Key Features
//!
//! - **Q-Network**: one ReLU hidden layer and a linear output neuron per action
//! - **Manual Backpropagation**: clipped TD errors, summed per sample, averaged per batch
//! - **Experience Replay**: thread-safe circular buffer with uniform sampling
//! - **Double DQN**: online network selects, periodically synced target network evaluates
//! - **Safe Checkpoints**: networks holding NaN/Inf weights are never persisted
//!
//! ## Quick Start
//!
//! ```rust
//! use sparta::agent::DqnTrainerBuilder;
//! use sparta::config::TrainerConfig;
//! use sparta::persistence::MemoryModelStore;
//! use sparta::replay_buffer::Transition;
//! use ndarray::array;
//!
//! let mut trainer = DqnTrainerBuilder::new()
//!     .model_type("skeleton")
//!     .input_size(2)
//!     .actions(vec!["attack", "retreat"])
//!     .config(TrainerConfig::default().batch_size(8).hidden_size(16))
//!     .build()
//!     .unwrap();
//!
//! let state = array![0.5, -0.25];
//! for _ in 0..8 {
//!     trainer.remember(Transition::new(state.clone(), "attack", 1.0, state.clone(), false));
//! }
//! trainer.train(0.1).unwrap();
//!
//! let best = trainer.network().best_action(state.view()).unwrap();
//! println!("best action: {}", best);
//!
//! let store = MemoryModelStore::new();
//! assert!(trainer.save(&store).unwrap());
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions and their output-parameterized derivatives
//! - [`agent`] - Double DQN trainer and the per-tick agent control loop
//! - [`config`] - Trainer and agent hyperparameters
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layer and weight initialization
//! - [`network`] - The two-layer Q-network
//! - [`optimizer`] - Gradient accumulation and mini-batch SGD
//! - [`persistence`] - Model snapshots and stores
//! - [`registry`] - Shared trainers keyed by model type
//! - [`replay_buffer`] - Experience replay

pub mod activations;
pub mod agent;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizer;
pub mod persistence;
pub mod registry;
pub mod replay_buffer;

#[cfg(test)]
mod tests;
