pub mod controller;
pub mod dqn;
pub mod traits;

pub use controller::{Agent, SharedTrainer, TickOutcome};
pub use dqn::{DqnTrainer, DqnTrainerBuilder, TrainingStats};
pub use traits::{GameContext, QAction};
