use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The activation families a dense layer can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Apply the activation function to a single pre-activation value.
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative `dy/dx`, parameterized by the output `y = apply(x)`.
    #[inline]
    pub fn derivative(&self, y: f64) -> f64 {
        match self {
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
        }
    }

    /// Apply the activation function to an array in-place.
    pub fn apply_inplace(&self, values: &mut Array1<f64>) {
        if *self == Activation::Linear {
            return;
        }
        values.mapv_inplace(|v| self.apply(v));
    }

    /// Element-wise derivative of a cached output vector.
    pub fn derivative_of(&self, outputs: &Array1<f64>) -> Array1<f64> {
        outputs.mapv(|y| self.derivative(y))
    }

    /// He initialization suits the rectifier family, everything else gets Xavier.
    pub fn is_rectifier(&self) -> bool {
        matches!(self, Activation::Relu)
    }
}
