use std::fmt::Debug;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::TrainerConfig;
use crate::error::{Result, SpartaError};
use crate::network::QNetwork;
use crate::optimizer::Optimizer;
use crate::persistence::ModelStore;
use crate::replay_buffer::{ReplayBuffer, Transition};

/// Double DQN trainer: an online network, its frozen target copy and the replay
/// buffer they learn from.
///
/// Each [`train`](Self::train) call is one training step:
/// - sample a mini-batch
/// - pick `a* = argmax_a Q_online(s')` with the online network
/// - evaluate `Q_target(s')[a*]` with the target network
/// - regress `Q_online(s)[a]` toward `clip(r + γ·Q_target(s')[a*], -1, 1)`
///
/// Every `target_update_frequency` steps the online weights are deep-copied into the
/// target network and the running loss is logged and reset.
///
/// # Example
///
/// ```rust
/// use sparta::agent::DqnTrainerBuilder;
/// use sparta::config::TrainerConfig;
/// use sparta::replay_buffer::Transition;
/// use ndarray::array;
///
/// let mut trainer = DqnTrainerBuilder::new()
///     .model_type("guard")
///     .input_size(2)
///     .actions(vec!["left", "right"])
///     .config(TrainerConfig::default().batch_size(4).hidden_size(8))
///     .build()
///     .unwrap();
///
/// // Idle until the buffer holds a full batch.
/// assert!(trainer.train(1.0).unwrap().is_none());
///
/// for _ in 0..4 {
///     trainer.remember(Transition::new(array![0.0, 1.0], "left", 1.0, array![0.0, 1.0], false));
/// }
/// assert!(trainer.train(1.0).unwrap().is_some());
/// ```
pub struct DqnTrainer<A> {
    online: QNetwork<A>,
    target: QNetwork<A>,
    optimizer: Optimizer,
    buffer: Arc<ReplayBuffer<A>>,
    config: TrainerConfig,
    steps: u64,
    running_loss: f64,
    loss_samples: usize,
    last_average_loss: f64,
    last_epsilon: f64,
}

/// Diagnostics reported at every target sync.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub steps: u64,
    pub epsilon: f64,
    pub average_loss: f64,
    pub average_reward: f64,
    pub buffer_len: usize,
}

impl<A: Clone + PartialEq + Debug> DqnTrainer<A> {
    /// Trainer with its own replay buffer of `config.replay_capacity` transitions.
    pub fn new(network: QNetwork<A>, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let buffer = Arc::new(ReplayBuffer::new(config.replay_capacity)?);
        Self::with_buffer(network, buffer, config)
    }

    /// Trainer fed from an existing, possibly shared, replay buffer.
    pub fn with_buffer(
        network: QNetwork<A>,
        buffer: Arc<ReplayBuffer<A>>,
        config: TrainerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let optimizer = Optimizer::new(&network, config.learning_rate, config.clip_threshold)?;
        let target = network.copy();
        Ok(DqnTrainer {
            online: network,
            target,
            optimizer,
            buffer,
            config,
            steps: 0,
            running_loss: 0.0,
            loss_samples: 0,
            last_average_loss: 0.0,
            last_epsilon: 0.0,
        })
    }

    pub fn network(&self) -> &QNetwork<A> {
        &self.online
    }

    pub fn target_network(&self) -> &QNetwork<A> {
        &self.target
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn buffer(&self) -> &Arc<ReplayBuffer<A>> {
        &self.buffer
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn remember(&self, transition: Transition<A>) {
        self.buffer.add(transition);
    }

    /// Run one training step. Returns `Ok(None)` while the buffer holds fewer than
    /// `batch_size` transitions, otherwise the mean squared TD error of the batch.
    pub fn train(&mut self, epsilon: f64) -> Result<Option<f64>> {
        if self.buffer.len() < self.config.batch_size {
            debug!(
                "Idle: {} of {} transitions buffered",
                self.buffer.len(),
                self.config.batch_size
            );
            return Ok(None);
        }

        let batch = self.buffer.sample(self.config.batch_size);
        if batch.is_empty() {
            // Cleared between the size check and the sample.
            return Ok(None);
        }

        let (batch_loss, used) = match self.accumulate_batch(&batch) {
            Ok(totals) => totals,
            Err(err) => {
                // Half a batch of gradients must not leak into the next step.
                self.optimizer.reset();
                return Err(err);
            }
        };
        self.optimizer.apply_gradients(&mut self.online, used)?;

        self.steps += 1;
        self.last_epsilon = epsilon;
        self.running_loss += batch_loss;
        self.loss_samples += used;

        if self.steps % self.config.target_update_frequency as u64 == 0 {
            self.sync_target_network()?;
            self.last_average_loss = self.running_loss / self.loss_samples.max(1) as f64;
            let stats = self.stats();
            info!(
                "[{}] steps={} epsilon={:.3} avg_loss={:.6} avg_reward={:.4} buffer={}",
                self.online.model_type(),
                stats.steps,
                stats.epsilon,
                stats.average_loss,
                stats.average_reward,
                stats.buffer_len
            );
            self.running_loss = 0.0;
            self.loss_samples = 0;
        }

        if used == 0 {
            return Ok(Some(0.0));
        }
        Ok(Some(batch_loss / used as f64))
    }

    /// Accumulate gradients for every usable transition. Returns the summed squared TD
    /// error and the number of transitions used.
    fn accumulate_batch(&mut self, batch: &[Transition<A>]) -> Result<(f64, usize)> {
        let mut batch_loss = 0.0;
        let mut used = 0;
        for transition in batch {
            let action_index = match self.online.action_index(&transition.action) {
                Some(index) => index,
                None => {
                    debug!("Skipping transition for unknown action {:?}", transition.action);
                    continue;
                }
            };
            if !transition.reward.is_finite() {
                debug!("Skipping transition with non-finite reward {}", transition.reward);
                continue;
            }

            let q_values = self.online.predict(transition.state.view())?;
            let target = self.bellman_target(transition)?;
            let error = q_values[action_index] - target;
            batch_loss += error * error;
            used += 1;

            self.optimizer.accumulate_gradients(
                &mut self.online,
                transition.state.view(),
                action_index,
                target,
            )?;
        }
        Ok((batch_loss, used))
    }

    /// `clip(r + γ·Q_target(s')[argmax Q_online(s')], -1, 1)`, with the future term zero
    /// for terminal transitions or when the target network yields a non-finite value.
    fn bellman_target(&self, transition: &Transition<A>) -> Result<f64> {
        let future = if transition.done {
            0.0
        } else {
            let next = transition.next_state.view();
            let best = self.online.best_action_index(next)?;
            let value = self.target.predict(next)?[best];
            if value.is_finite() {
                value
            } else {
                0.0
            }
        };
        Ok((transition.reward + self.config.gamma * future).clamp(-1.0, 1.0))
    }

    /// `θ⁻ ← θ`: deep-copy online weights into the target network.
    pub fn sync_target_network(&mut self) -> Result<()> {
        self.target.copy_weights_from(&self.online)
    }

    /// Replace the online network, e.g. after loading a checkpoint. The target is
    /// re-synced and pending gradients are dropped.
    pub fn replace_network(&mut self, network: QNetwork<A>) -> Result<()> {
        if network.actions() != self.online.actions() {
            return Err(SpartaError::invalid_parameter(
                "network",
                "replacement must score the same actions",
            ));
        }
        self.optimizer = Optimizer::new(&network, self.config.learning_rate, self.config.clip_threshold)?;
        self.target = network.copy();
        self.online = network;
        Ok(())
    }

    pub fn stats(&self) -> TrainingStats {
        let average_loss = if self.loss_samples > 0 {
            self.running_loss / self.loss_samples as f64
        } else {
            self.last_average_loss
        };
        TrainingStats {
            steps: self.steps,
            epsilon: self.last_epsilon,
            average_loss,
            average_reward: self.buffer.average_reward(),
            buffer_len: self.buffer.len(),
        }
    }

    /// Persist the online network with the buffer's average reward as its performance.
    pub fn save(&self, store: &dyn ModelStore) -> Result<bool> {
        self.online.save(store, self.buffer.average_reward())
    }
}

/// Builder pattern for DqnTrainer
pub struct DqnTrainerBuilder<A> {
    model_type: Option<String>,
    input_size: Option<usize>,
    actions: Vec<A>,
    config: TrainerConfig,
    buffer: Option<Arc<ReplayBuffer<A>>>,
    seed: Option<u64>,
}

impl<A: Clone + PartialEq + Debug> DqnTrainerBuilder<A> {
    pub fn new() -> Self {
        DqnTrainerBuilder {
            model_type: None,
            input_size: None,
            actions: Vec::new(),
            config: TrainerConfig::default(),
            buffer: None,
            seed: None,
        }
    }

    pub fn model_type<S: Into<String>>(mut self, model_type: S) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    pub fn input_size(mut self, input_size: usize) -> Self {
        self.input_size = Some(input_size);
        self
    }

    pub fn actions(mut self, actions: Vec<A>) -> Self {
        self.actions = actions;
        self
    }

    pub fn config(mut self, config: TrainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing replay buffer instead of allocating one.
    pub fn buffer(mut self, buffer: Arc<ReplayBuffer<A>>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Seed weight initialization and replay sampling for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<DqnTrainer<A>> {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let model_type = self
            .model_type
            .ok_or_else(|| SpartaError::invalid_parameter("model_type", "Model type not specified"))?;
        let input_size = self
            .input_size
            .ok_or_else(|| SpartaError::invalid_parameter("input_size", "Input size not specified"))?;
        self.config.validate()?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let network = QNetwork::new_with_rng(
            model_type,
            input_size,
            self.config.hidden_size,
            self.actions,
            &mut rng,
        )?;

        let buffer = match (self.buffer, self.seed) {
            (Some(buffer), _) => buffer,
            (None, Some(seed)) => Arc::new(ReplayBuffer::with_seed(self.config.replay_capacity, seed)?),
            (None, None) => Arc::new(ReplayBuffer::new(self.config.replay_capacity)?),
        };
        DqnTrainer::with_buffer(network, buffer, self.config)
    }
}

impl<A: Clone + PartialEq + Debug> Default for DqnTrainerBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}
