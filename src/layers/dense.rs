use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::initialization::WeightInit;
use crate::activations::Activation;
use crate::error::{Result, SpartaError};

/// A fully connected (dense) layer computing `y = f(Wx + b)`.
///
/// `weights` is laid out as `[output_size][input_size]`: row `i` holds the input
/// weights of neuron `i`, the same shape a [`ModelSnapshot`](crate::persistence::ModelSnapshot)
/// stores.
///
/// The layer caches the post-activation output of the most recent [`forward`](Self::forward)
/// call. Backprop reads that cache, so no other `forward` may run on the same layer
/// between a training forward pass and the gradient computation that consumes it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub activation: Activation,
    #[serde(skip)]
    last_output: Option<Array1<f64>>,
}

impl DenseLayer {
    /// Create a new dense layer. Weights are drawn from a zero-mean normal whose spread
    /// depends on the activation (He for ReLU, Xavier otherwise); biases start at zero.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Result<Self> {
        Self::new_with_rng(input_size, output_size, activation, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new_with_init(
            input_size,
            output_size,
            activation,
            WeightInit::for_activation(&activation),
            rng,
        )
    }

    pub fn new_with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if output_size == 0 {
            return Err(SpartaError::invalid_parameter(
                "output_size",
                "layer must have at least one neuron",
            ));
        }
        let weights = init.initialize_weights((output_size, input_size), rng)?;
        let biases = init.initialize_biases(output_size);
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            last_output: None,
        })
    }

    /// Rebuild a layer from stored parameters.
    pub fn from_parts(weights: Array2<f64>, biases: Array1<f64>, activation: Activation) -> Result<Self> {
        if weights.nrows() != biases.len() {
            return Err(SpartaError::dimension_mismatch(
                format!("{} biases", weights.nrows()),
                format!("{} biases", biases.len()),
            ));
        }
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            last_output: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    fn check_input(&self, input: &ArrayView1<f64>) -> Result<()> {
        if input.len() != self.input_size() {
            return Err(SpartaError::dimension_mismatch(
                format!("input of length {}", self.input_size()),
                format!("length {}", input.len()),
            ));
        }
        Ok(())
    }

    fn activate(&self, input: ArrayView1<f64>) -> Array1<f64> {
        let mut output = self.weights.dot(&input) + &self.biases;
        self.activation.apply_inplace(&mut output);
        output
    }

    /// Forward pass that records its output for a later backward pass.
    pub fn forward(&mut self, input: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_input(&input)?;
        let output = self.activate(input);
        self.last_output = Some(output.clone());
        Ok(output)
    }

    /// Forward pass without touching the cache, usable through a shared reference.
    pub fn evaluate(&self, input: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_input(&input)?;
        Ok(self.activate(input))
    }

    /// Post-activation output of the last [`forward`](Self::forward) call.
    pub fn last_output(&self) -> Option<&Array1<f64>> {
        self.last_output.as_ref()
    }

    /// Overwrite this layer's parameters with a deep copy of `other`'s.
    pub fn copy_params_from(&mut self, other: &DenseLayer) -> Result<()> {
        if self.weights.dim() != other.weights.dim() {
            return Err(SpartaError::dimension_mismatch(
                format!("{:?} weights", self.weights.dim()),
                format!("{:?} weights", other.weights.dim()),
            ));
        }
        self.weights.assign(&other.weights);
        self.biases.assign(&other.biases);
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        self.weights.iter().chain(self.biases.iter()).all(|v| v.is_finite())
    }
}
