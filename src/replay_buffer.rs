use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpartaError};

/// One step of experience: `state --action--> next_state` with its reward.
///
/// Equality and hashing go by value, comparing floats by bit pattern so that
/// `Eq` and `Hash` agree even for NaN and signed zeros.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition<A> {
    pub state: Array1<f64>,
    pub action: A,
    pub reward: f64,
    pub next_state: Array1<f64>,
    pub done: bool,
}

impl<A> Transition<A> {
    pub fn new(state: Array1<f64>, action: A, reward: f64, next_state: Array1<f64>, done: bool) -> Self {
        Transition {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

fn same_bits(a: &Array1<f64>, b: &Array1<f64>) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl<A: PartialEq> PartialEq for Transition<A> {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.done == other.done
            && self.reward.to_bits() == other.reward.to_bits()
            && same_bits(&self.state, &other.state)
            && same_bits(&self.next_state, &other.next_state)
    }
}

impl<A: Eq> Eq for Transition<A> {}

impl<A: Hash> Hash for Transition<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.len().hash(state);
        for v in self.state.iter() {
            v.to_bits().hash(state);
        }
        self.action.hash(state);
        self.reward.to_bits().hash(state);
        self.next_state.len().hash(state);
        for v in self.next_state.iter() {
            v.to_bits().hash(state);
        }
        self.done.hash(state);
    }
}

struct BufferState<A> {
    slots: Vec<Transition<A>>,
    write_pointer: usize,
    rng: StdRng,
}

/// Fixed-capacity circular experience store with uniform sampling.
///
/// Every operation holds one exclusive lock for its whole duration, so agents may add
/// transitions while a trainer samples from the same buffer. Once full, each `add`
/// overwrites the oldest surviving slot in place; other slots never move.
pub struct ReplayBuffer<A> {
    capacity: usize,
    state: Mutex<BufferState<A>>,
}

impl<A: Clone> ReplayBuffer<A> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Buffer whose sampling sequence is reproducible.
    pub fn with_seed(capacity: usize, seed: u64) -> Result<Self> {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(SpartaError::invalid_parameter(
                "capacity",
                "Capacity must be greater than 0",
            ));
        }
        Ok(ReplayBuffer {
            capacity,
            state: Mutex::new(BufferState {
                slots: Vec::with_capacity(capacity),
                write_pointer: 0,
                rng,
            }),
        })
    }

    // Every mutation leaves the state consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BufferState<A>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, transition: Transition<A>) {
        let mut state = self.lock();
        let index = state.write_pointer;
        if state.slots.len() < self.capacity {
            state.slots.push(transition);
        } else {
            state.slots[index] = transition;
        }
        state.write_pointer = (index + 1) % self.capacity;
    }

    /// Draw `min(batch_size, len())` transitions uniformly, with replacement.
    pub fn sample(&self, batch_size: usize) -> Vec<Transition<A>> {
        let mut state = self.lock();
        let len = state.slots.len();
        if len == 0 {
            return Vec::new();
        }
        let count = batch_size.min(len);
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let index = state.rng.gen_range(0..len);
            batch.push(state.slots[index].clone());
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean reward over the stored transitions, `0.0` when empty. O(n); meant for diagnostics.
    pub fn average_reward(&self) -> f64 {
        let state = self.lock();
        if state.slots.is_empty() {
            return 0.0;
        }
        state.slots.iter().map(|t| t.reward).sum::<f64>() / state.slots.len() as f64
    }

    /// Forget every transition. The backing allocation is kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.slots.clear();
        state.write_pointer = 0;
    }

    /// Stored transitions from oldest to newest.
    pub fn contents(&self) -> Vec<Transition<A>> {
        let state = self.lock();
        if state.slots.len() < self.capacity {
            return state.slots.clone();
        }
        let (newest, oldest) = state.slots.split_at(state.write_pointer);
        oldest.iter().chain(newest.iter()).cloned().collect()
    }
}
