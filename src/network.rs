use std::fmt::Debug;
use std::sync::Arc;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use rand::Rng;

use crate::activations::Activation;
use crate::error::{Result, SpartaError};
use crate::layers::DenseLayer;
use crate::persistence::{ModelSnapshot, ModelStore};

/// A state -> action-value function built from exactly two dense layers.
///
/// `hidden` uses ReLU and `output` is linear with one neuron per action, so
/// `predict(state)[i]` is the Q-value of `actions()[i]`. The hidden width is free
/// configuration; the invariant is `output.input_size() == hidden.output_size()`.
///
/// The action list is shared between copies of the same network. It is never mutated
/// after construction, so sharing it does not couple the weights of the copies.
#[derive(Debug)]
pub struct QNetwork<A> {
    pub hidden: DenseLayer,
    pub output: DenseLayer,
    actions: Arc<[A]>,
    model_type: String,
}

impl<A: Clone + PartialEq + Debug> QNetwork<A> {
    /// Create a freshly initialized network.
    pub fn new<S: Into<String>>(
        model_type: S,
        input_size: usize,
        hidden_size: usize,
        actions: impl Into<Arc<[A]>>,
    ) -> Result<Self> {
        Self::new_with_rng(model_type, input_size, hidden_size, actions, &mut rand::thread_rng())
    }

    pub fn new_with_rng<S: Into<String>, R: Rng + ?Sized>(
        model_type: S,
        input_size: usize,
        hidden_size: usize,
        actions: impl Into<Arc<[A]>>,
        rng: &mut R,
    ) -> Result<Self> {
        let actions = actions.into();
        if actions.is_empty() {
            return Err(SpartaError::invalid_parameter(
                "actions",
                "a Q-network needs at least one action",
            ));
        }
        let hidden = DenseLayer::new_with_rng(input_size, hidden_size, Activation::Relu, rng)?;
        let output = DenseLayer::new_with_rng(hidden_size, actions.len(), Activation::Linear, rng)?;
        Ok(QNetwork {
            hidden,
            output,
            actions,
            model_type: model_type.into(),
        })
    }

    /// Assemble a network from prebuilt layers, checking that the shapes line up.
    pub fn from_layers<S: Into<String>>(
        model_type: S,
        hidden: DenseLayer,
        output: DenseLayer,
        actions: impl Into<Arc<[A]>>,
    ) -> Result<Self> {
        let actions = actions.into();
        if output.input_size() != hidden.output_size() {
            return Err(SpartaError::dimension_mismatch(
                format!("output layer with {} inputs", hidden.output_size()),
                format!("{} inputs", output.input_size()),
            ));
        }
        if output.output_size() != actions.len() {
            return Err(SpartaError::dimension_mismatch(
                format!("{} output neurons (one per action)", actions.len()),
                format!("{} neurons", output.output_size()),
            ));
        }
        Ok(QNetwork {
            hidden,
            output,
            actions,
            model_type: model_type.into(),
        })
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    pub fn shared_actions(&self) -> Arc<[A]> {
        Arc::clone(&self.actions)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn input_size(&self) -> usize {
        self.hidden.input_size()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden.output_size()
    }

    /// Q-values for every action. Pure: the layer caches are not touched.
    pub fn predict(&self, state: ArrayView1<f64>) -> Result<Array1<f64>> {
        let hidden = self.hidden.evaluate(state)?;
        self.output.evaluate(hidden.view())
    }

    /// Training forward pass. Same values as [`predict`](Self::predict), but both layers
    /// record their outputs for the backward pass.
    pub fn forward(&mut self, state: ArrayView1<f64>) -> Result<Array1<f64>> {
        let hidden = self.hidden.forward(state)?;
        self.output.forward(hidden.view())
    }

    /// Index of the highest-valued action; ties go to the earliest action.
    pub fn best_action_index(&self, state: ArrayView1<f64>) -> Result<usize> {
        let q_values = self.predict(state)?;
        Ok(argmax(&q_values))
    }

    pub fn best_action(&self, state: ArrayView1<f64>) -> Result<&A> {
        let index = self.best_action_index(state)?;
        Ok(&self.actions[index])
    }

    /// Position of `action` in this network's action list, `None` if it is not scored here.
    pub fn action_index(&self, action: &A) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    /// Deep copy of both layers. The copy shares the read-only action list only.
    pub fn copy(&self) -> Self {
        QNetwork {
            hidden: self.hidden.clone(),
            output: self.output.clone(),
            actions: Arc::clone(&self.actions),
            model_type: self.model_type.clone(),
        }
    }

    /// `θ ← θ_other`, element by element, without reallocating.
    pub fn copy_weights_from(&mut self, other: &QNetwork<A>) -> Result<()> {
        self.hidden.copy_params_from(&other.hidden)?;
        self.output.copy_params_from(&other.output)
    }

    pub fn is_finite(&self) -> bool {
        self.hidden.is_finite() && self.output.is_finite()
    }

    pub fn to_snapshot(&self, performance: f64) -> ModelSnapshot {
        ModelSnapshot {
            input_size: self.input_size(),
            hidden_weights: ModelSnapshot::matrix_to_rows(&self.hidden.weights),
            hidden_biases: self.hidden.biases.to_vec(),
            output_weights: ModelSnapshot::matrix_to_rows(&self.output.weights),
            output_biases: self.output.biases.to_vec(),
            performance,
        }
    }

    /// Rebuild a network from a snapshot, binding it to `actions`.
    pub fn from_snapshot<S: Into<String>>(
        model_type: S,
        snapshot: &ModelSnapshot,
        actions: impl Into<Arc<[A]>>,
    ) -> Result<Self> {
        snapshot.validate()?;
        let hidden = DenseLayer::from_parts(
            ModelSnapshot::rows_to_matrix(&snapshot.hidden_weights, snapshot.input_size)?,
            ModelSnapshot::to_vector(&snapshot.hidden_biases),
            Activation::Relu,
        )?;
        let output = DenseLayer::from_parts(
            ModelSnapshot::rows_to_matrix(&snapshot.output_weights, snapshot.hidden_size())?,
            ModelSnapshot::to_vector(&snapshot.output_biases),
            Activation::Linear,
        )?;
        Self::from_layers(model_type, hidden, output, actions)
    }

    /// Persist under [`model_type`](Self::model_type).
    ///
    /// Returns `Ok(false)` without touching the store when any parameter is NaN or
    /// infinite, so a diverged network never replaces the last good checkpoint.
    pub fn save(&self, store: &dyn ModelStore, performance: f64) -> Result<bool> {
        if !self.is_finite() {
            warn!(
                "Refusing to save model '{}': weights or biases contain NaN/Inf",
                self.model_type
            );
            return Ok(false);
        }
        store.save(&self.model_type, &self.to_snapshot(performance))?;
        debug!("Saved model '{}' (performance {:.4})", self.model_type, performance);
        Ok(true)
    }

    /// Load the snapshot stored under `model_type`, or `Ok(None)` if there is none.
    pub fn load(
        model_type: &str,
        store: &dyn ModelStore,
        actions: impl Into<Arc<[A]>>,
    ) -> Result<Option<Self>> {
        match store.load(model_type)? {
            Some(snapshot) => Self::from_snapshot(model_type, &snapshot, actions).map(Some),
            None => Ok(None),
        }
    }
}

/// First index holding the maximum value. NaN never beats a number.
pub(crate) fn argmax(values: &Array1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] || (values[best].is_nan() && !v.is_nan()) {
            best = i;
        }
    }
    best
}
