//! Hyperparameters for the trainer and the agent control loop.
//!
//! Both configs deserialize from JSON with every field optional (missing fields take the
//! defaults below) and offer chained setters:
//!
//! ```rust
//! use sparta::config::TrainerConfig;
//!
//! let config = TrainerConfig::default()
//!     .batch_size(16)
//!     .target_update_frequency(50);
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpartaError};

/// Settings for [`DqnTrainer`](crate::agent::DqnTrainer) and the networks it owns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    /// Discount factor γ.
    pub gamma: f64,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Training steps between target-network syncs.
    pub target_update_frequency: usize,
    /// Bound applied to TD errors and hidden-layer gradients.
    pub clip_threshold: f64,
    pub hidden_size: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            learning_rate: 0.01,
            gamma: 0.95,
            batch_size: 32,
            replay_capacity: 10_000,
            target_update_frequency: 100,
            clip_threshold: 1.0,
            hidden_size: 64,
        }
    }
}

impl TrainerConfig {
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    pub fn target_update_frequency(mut self, frequency: usize) -> Self {
        self.target_update_frequency = frequency;
        self
    }

    pub fn clip_threshold(mut self, threshold: f64) -> Self {
        self.clip_threshold = threshold;
        self
    }

    pub fn hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        positive_finite("learning_rate", self.learning_rate)?;
        positive_finite("clip_threshold", self.clip_threshold)?;
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SpartaError::invalid_parameter("gamma", "must be within [0, 1]"));
        }
        non_zero("batch_size", self.batch_size)?;
        non_zero("replay_capacity", self.replay_capacity)?;
        if self.batch_size > self.replay_capacity {
            return Err(SpartaError::invalid_parameter(
                "batch_size",
                "must not exceed replay_capacity",
            ));
        }
        non_zero("target_update_frequency", self.target_update_frequency)?;
        non_zero("hidden_size", self.hidden_size)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

/// Exploration and pacing settings for an [`Agent`](crate::agent::Agent).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub epsilon_start: f64,
    /// Multiplicative decay applied after every decision.
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    /// When false the agent only exploits: no transitions are recorded, nothing is trained.
    pub training: bool,
    /// The agent decides once every `decision_frequency` ticks.
    pub decision_frequency: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
            training: true,
            decision_frequency: 1,
        }
    }
}

impl AgentConfig {
    pub fn epsilon_start(mut self, epsilon: f64) -> Self {
        self.epsilon_start = epsilon;
        self
    }

    pub fn epsilon_decay(mut self, decay: f64) -> Self {
        self.epsilon_decay = decay;
        self
    }

    pub fn epsilon_min(mut self, epsilon: f64) -> Self {
        self.epsilon_min = epsilon;
        self
    }

    pub fn training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    pub fn decision_frequency(mut self, ticks: u64) -> Self {
        self.decision_frequency = ticks;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("epsilon_start", self.epsilon_start),
            ("epsilon_decay", self.epsilon_decay),
            ("epsilon_min", self.epsilon_min),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SpartaError::invalid_parameter(name, "must be within [0, 1]"));
            }
        }
        if self.epsilon_min > self.epsilon_start {
            return Err(SpartaError::invalid_parameter(
                "epsilon_min",
                "must not exceed epsilon_start",
            ));
        }
        if self.decision_frequency == 0 {
            return Err(SpartaError::invalid_parameter(
                "decision_frequency",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

fn positive_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SpartaError::invalid_parameter(name, "must be a positive finite number"))
    }
}

fn non_zero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        Err(SpartaError::invalid_parameter(name, "must be greater than 0"))
    } else {
        Ok(())
    }
}
