use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::agent::{DqnTrainer, SharedTrainer};
use crate::config::TrainerConfig;
use crate::error::{Result, SpartaError};
use crate::network::QNetwork;
use crate::persistence::ModelStore;

/// Shared trainers keyed by model type, so every entity of one kind learns into the
/// same network.
pub struct ModelRegistry<A> {
    models: HashMap<String, SharedTrainer<A>>,
}

impl<A: Clone + PartialEq + Debug> ModelRegistry<A> {
    pub fn new() -> Self {
        ModelRegistry {
            models: HashMap::new(),
        }
    }

    pub fn get(&self, model_type: &str) -> Option<SharedTrainer<A>> {
        self.models.get(model_type).cloned()
    }

    /// Return the trainer for `model_type`, creating it on first use. A new trainer starts
    /// from the snapshot in `store` when one exists, otherwise from random weights.
    pub fn get_or_create(
        &mut self,
        model_type: &str,
        input_size: usize,
        actions: Vec<A>,
        config: &TrainerConfig,
        store: &dyn ModelStore,
    ) -> Result<SharedTrainer<A>> {
        if let Some(trainer) = self.models.get(model_type) {
            return Ok(Arc::clone(trainer));
        }

        let network = match QNetwork::load(model_type, store, actions.clone())? {
            Some(network) => {
                if network.input_size() != input_size {
                    return Err(SpartaError::dimension_mismatch(
                        format!("model '{}' expects {} inputs", model_type, input_size),
                        format!("stored snapshot has {} inputs", network.input_size()),
                    ));
                }
                info!("Loaded model '{}' from store", model_type);
                network
            }
            None => {
                info!("Creating fresh model '{}'", model_type);
                QNetwork::new(model_type, input_size, config.hidden_size, actions)?
            }
        };

        let trainer = Arc::new(Mutex::new(DqnTrainer::new(network, config.clone())?));
        self.models.insert(model_type.to_string(), Arc::clone(&trainer));
        Ok(trainer)
    }

    pub fn remove(&mut self, model_type: &str) -> Option<SharedTrainer<A>> {
        self.models.remove(model_type)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Persist every registered model. Returns how many snapshots were written; models
    /// with non-finite weights are skipped by [`QNetwork::save`].
    pub fn save_all(&self, store: &dyn ModelStore) -> Result<usize> {
        let mut saved = 0;
        for (model_type, trainer) in &self.models {
            let trainer = trainer
                .lock()
                .map_err(|_| SpartaError::lock_poisoned(format!("trainer '{}'", model_type)))?;
            if trainer.save(store)? {
                saved += 1;
            } else {
                warn!("Model '{}' was not saved", model_type);
            }
        }
        Ok(saved)
    }
}

impl<A: Clone + PartialEq + Debug> Default for ModelRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}
