use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::dqn::DqnTrainer;
use super::traits::{GameContext, QAction};
use crate::config::AgentConfig;
use crate::error::{Result, SpartaError};
use crate::replay_buffer::{ReplayBuffer, Transition};

/// A trainer shared by every agent acting for the same model.
pub type SharedTrainer<A> = Arc<Mutex<DqnTrainer<A>>>;

/// What happened during one [`Agent::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome<A> {
    /// Between decisions; nothing was observed.
    Waiting,
    /// The context reported a terminal state. The episode's last transition was recorded
    /// and epsilon decayed.
    Terminal,
    /// A new action was chosen and executed.
    Acted { action: A, explored: bool },
}

struct PendingDecision<A> {
    state: Array1<f64>,
    action: A,
    reward: f64,
}

/// Per-entity observe/act/learn loop with epsilon-greedy exploration.
///
/// Every `decision_frequency` ticks the agent:
/// 1. observes the context
/// 2. closes its previous decision into a [`Transition`] carrying the reward collected since
/// 3. runs a training step on the shared trainer
/// 4. picks and executes the next action, or closes the episode on a terminal state
///
/// Epsilon decays after every action and at every episode end while training.
///
/// Agents for the same model share the replay buffer and the trainer, so any number of
/// them may tick on different threads.
pub struct Agent<A> {
    trainer: SharedTrainer<A>,
    buffer: Arc<ReplayBuffer<A>>,
    actions: Arc<[A]>,
    config: AgentConfig,
    epsilon: f64,
    ticks: u64,
    pending: Option<PendingDecision<A>>,
    rng: StdRng,
}

impl<A: Clone + PartialEq + std::fmt::Debug> Agent<A> {
    pub fn new(trainer: SharedTrainer<A>, config: AgentConfig) -> Result<Self> {
        Self::with_rng(trainer, config, StdRng::from_entropy())
    }

    pub fn with_seed(trainer: SharedTrainer<A>, config: AgentConfig, seed: u64) -> Result<Self> {
        Self::with_rng(trainer, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(trainer: SharedTrainer<A>, config: AgentConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let (buffer, actions) = {
            let guard = lock(&trainer)?;
            (Arc::clone(guard.buffer()), guard.network().shared_actions())
        };
        Ok(Agent {
            trainer,
            buffer,
            actions,
            epsilon: config.epsilon_start,
            config,
            ticks: 0,
            pending: None,
            rng,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn trainer(&self) -> &SharedTrainer<A> {
        &self.trainer
    }

    /// Credit a delayed reward to the decision currently in flight.
    pub fn reward(&mut self, reward: f64) {
        if let Some(pending) = self.pending.as_mut() {
            pending.reward += reward;
        }
    }

    /// Drop the in-flight decision without recording it, e.g. when the entity is removed.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Advance the agent by one simulation tick.
    pub fn tick<C>(&mut self, context: &mut C) -> Result<TickOutcome<A>>
    where
        C: GameContext,
        A: QAction<C>,
    {
        self.ticks += 1;
        if self.ticks % self.config.decision_frequency != 0 {
            return Ok(TickOutcome::Waiting);
        }

        let state = context.observation();
        let done = context.is_terminal();

        if let Some(pending) = self.pending.take() {
            if self.config.training {
                self.buffer.add(Transition::new(
                    pending.state,
                    pending.action,
                    pending.reward,
                    state.clone(),
                    done,
                ));
            }
        }

        if self.config.training {
            lock(&self.trainer)?.train(self.epsilon)?;
        }

        if done {
            self.decay_epsilon();
            return Ok(TickOutcome::Terminal);
        }

        let (action, explored) = self.choose_action(&state)?;
        let reward = action.task(context);
        self.pending = Some(PendingDecision {
            state,
            action: action.clone(),
            reward,
        });
        self.decay_epsilon();

        Ok(TickOutcome::Acted { action, explored })
    }

    fn decay_epsilon(&mut self) {
        if self.config.training {
            self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        }
    }

    /// Epsilon-greedy choice. Outside training the agent always exploits.
    fn choose_action(&mut self, state: &Array1<f64>) -> Result<(A, bool)> {
        if self.config.training && self.rng.gen::<f64>() < self.epsilon {
            let index = self.rng.gen_range(0..self.actions.len());
            debug!("Exploring with action {:?}", self.actions[index]);
            return Ok((self.actions[index].clone(), true));
        }
        let trainer = lock(&self.trainer)?;
        let action = trainer.network().best_action(state.view())?.clone();
        Ok((action, false))
    }
}

fn lock<A>(trainer: &SharedTrainer<A>) -> Result<MutexGuard<'_, DqnTrainer<A>>> {
    trainer
        .lock()
        .map_err(|_| SpartaError::lock_poisoned("shared trainer"))
}
