use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;

use crate::activations::Activation;
use crate::error::{Result, SpartaError};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// He/Kaiming normal initialization (for ReLU), std = sqrt(2 / fan_in)
    HeNormal,

    /// Xavier normal initialization, std = sqrt(1 / fan_in)
    XavierNormal,

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Standard deviation of the zero-mean normal for a layer with `fan_in` inputs
    pub fn std_dev(&self, fan_in: usize) -> f64 {
        match self {
            WeightInit::HeNormal => (2.0 / fan_in as f64).sqrt(),
            WeightInit::XavierNormal => (1.0 / fan_in as f64).sqrt(),
            WeightInit::Zeros => 0.0,
        }
    }

    /// Initialize a `(output_size, input_size)` weight matrix
    pub fn initialize_weights<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        let (_, fan_in) = shape;
        if fan_in == 0 {
            return Err(SpartaError::invalid_parameter(
                "input_size",
                "layer must have at least one input",
            ));
        }

        match self {
            WeightInit::Zeros => Ok(Array2::zeros(shape)),
            WeightInit::HeNormal | WeightInit::XavierNormal => {
                let normal = Normal::new(0.0, self.std_dev(fan_in))
                    .map_err(|e| SpartaError::NumericalError(e.to_string()))?;
                Ok(Array2::random_using(shape, normal, rng))
            }
        }
    }

    /// Biases always start at zero
    pub fn initialize_biases(&self, size: usize) -> Array1<f64> {
        Array1::zeros(size)
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: &Activation) -> Self {
        if activation.is_rectifier() {
            WeightInit::HeNormal
        } else {
            WeightInit::XavierNormal
        }
    }
}
