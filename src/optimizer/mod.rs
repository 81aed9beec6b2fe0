//! Manual backpropagation for the two-layer [`QNetwork`].
//!
//! The optimizer sums per-sample gradients into accumulators shaped like the network
//! it was built for, then applies one averaged gradient-descent step per mini-batch:
//!
//! ```text
//! for each sample:  acc += ∂L/∂θ          (accumulate_gradients)
//! once per batch:   θ -= acc · lr / n     (apply_gradients)
//!                   acc = 0
//! ```

pub mod gradient_clipper;

use std::fmt::Debug;

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{Result, SpartaError};
use crate::network::QNetwork;

pub use gradient_clipper::GradientClipper;

/// Stochastic gradient descent over one Q-network.
#[derive(Clone, Debug)]
pub struct Optimizer {
    learning_rate: f64,
    clipper: GradientClipper,
    hidden_weight_grads: Array2<f64>,
    hidden_bias_grads: Array1<f64>,
    output_weight_grads: Array2<f64>,
    output_bias_grads: Array1<f64>,
    pending: usize,
}

impl Optimizer {
    /// Zeroed accumulators for `network`. The optimizer must only ever be used with
    /// networks of this exact shape.
    pub fn new<A: Clone + PartialEq + Debug>(
        network: &QNetwork<A>,
        learning_rate: f64,
        clip_threshold: f64,
    ) -> Result<Self> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(SpartaError::invalid_parameter(
                "learning_rate",
                "must be a positive finite number",
            ));
        }
        if !(clip_threshold.is_finite() && clip_threshold > 0.0) {
            return Err(SpartaError::invalid_parameter(
                "clip_threshold",
                "must be a positive finite number",
            ));
        }

        Ok(Optimizer {
            learning_rate,
            clipper: GradientClipper::new(clip_threshold),
            hidden_weight_grads: Array2::zeros(network.hidden.weights.dim()),
            hidden_bias_grads: Array1::zeros(network.hidden.biases.dim()),
            output_weight_grads: Array2::zeros(network.output.weights.dim()),
            output_bias_grads: Array1::zeros(network.output.biases.dim()),
            pending: 0,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn clip_threshold(&self) -> f64 {
        self.clipper.threshold()
    }

    /// Number of samples accumulated since the last applied step.
    pub fn pending_samples(&self) -> usize {
        self.pending
    }

    fn check_shape<A: Clone + PartialEq + Debug>(&self, network: &QNetwork<A>) -> Result<()> {
        if network.hidden.weights.dim() != self.hidden_weight_grads.dim()
            || network.output.weights.dim() != self.output_weight_grads.dim()
        {
            return Err(SpartaError::dimension_mismatch(
                format!(
                    "network shaped {:?}/{:?}",
                    self.hidden_weight_grads.dim(),
                    self.output_weight_grads.dim()
                ),
                format!(
                    "{:?}/{:?}",
                    network.hidden.weights.dim(),
                    network.output.weights.dim()
                ),
            ));
        }
        Ok(())
    }

    /// Back-propagate the TD error of one `(state, action)` sample into the accumulators.
    ///
    /// Only the acted-upon output neuron carries error: its gradient is
    /// `clip(Q(state)[action] - clip(target, -1, 1))`. The hidden gradient is
    /// `(W_outᵀ · g_out) ⊙ f'(hidden_out)`, clipped to the same threshold.
    ///
    /// Returns the clipped TD error.
    pub fn accumulate_gradients<A: Clone + PartialEq + Debug>(
        &mut self,
        network: &mut QNetwork<A>,
        state: ArrayView1<f64>,
        action_index: usize,
        target: f64,
    ) -> Result<f64> {
        self.check_shape(network)?;
        if action_index >= network.action_count() {
            return Err(SpartaError::invalid_parameter(
                "action_index".to_string(),
                format!("{} is out of range for {} actions", action_index, network.action_count()),
            ));
        }

        let q_values = network.forward(state)?;
        let hidden_output = network
            .hidden
            .last_output()
            .ok_or_else(|| SpartaError::NumericalError("hidden layer has no cached output".to_string()))?;

        let error = self.clipper.clip(q_values[action_index] - target.clamp(-1.0, 1.0));
        self.pending += 1;

        // One-hot output gradient: every other neuron contributes nothing.
        if error == 0.0 {
            return Ok(error);
        }

        self.output_weight_grads
            .row_mut(action_index)
            .scaled_add(error, hidden_output);
        self.output_bias_grads[action_index] += error;

        let derivative = network.hidden.activation.derivative_of(hidden_output);
        let mut hidden_grad = network.output.weights.row(action_index).mapv(|w| w * error) * &derivative;
        self.clipper.clip_inplace(&mut hidden_grad);

        for (i, &g) in hidden_grad.iter().enumerate() {
            if g != 0.0 {
                self.hidden_weight_grads.row_mut(i).scaled_add(g, &state);
            }
        }
        self.hidden_bias_grads += &hidden_grad;

        Ok(error)
    }

    /// Apply the averaged step `θ -= acc · lr / batch_size` and zero the accumulators.
    /// A `batch_size` of zero leaves everything untouched.
    pub fn apply_gradients<A: Clone + PartialEq + Debug>(
        &mut self,
        network: &mut QNetwork<A>,
        batch_size: usize,
    ) -> Result<()> {
        if batch_size == 0 {
            return Ok(());
        }
        self.check_shape(network)?;

        let step = -self.learning_rate / batch_size as f64;
        network.hidden.weights.scaled_add(step, &self.hidden_weight_grads);
        network.hidden.biases.scaled_add(step, &self.hidden_bias_grads);
        network.output.weights.scaled_add(step, &self.output_weight_grads);
        network.output.biases.scaled_add(step, &self.output_bias_grads);

        self.reset();
        Ok(())
    }

    /// Drop any accumulated gradient without applying it.
    pub fn reset(&mut self) {
        self.hidden_weight_grads.fill(0.0);
        self.hidden_bias_grads.fill(0.0);
        self.output_weight_grads.fill(0.0);
        self.output_bias_grads.fill(0.0);
        self.pending = 0;
    }

    pub fn hidden_weight_gradients(&self) -> &Array2<f64> {
        &self.hidden_weight_grads
    }

    pub fn output_weight_gradients(&self) -> &Array2<f64> {
        &self.output_weight_grads
    }

    pub fn output_bias_gradients(&self) -> &Array1<f64> {
        &self.output_bias_grads
    }
}
