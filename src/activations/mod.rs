//! # Activation Functions Module
//!
//! Scalar activation functions used by the two dense layers of a [`QNetwork`](crate::network::QNetwork).
//!
//! ## Available Activations
//!
//! - **ReLU** (Rectified Linear Unit): `max(0, x)` - used by the hidden layer
//! - **Linear**: Identity function - used by the output layer, Q-values are unbounded
//! - **Sigmoid**: `1 / (1 + e^(-x))` - Outputs between 0 and 1
//! - **Tanh**: Hyperbolic tangent - Outputs between -1 and 1
//!
//! ## Derivatives
//!
//! Every derivative is expressed in terms of the *post-activation* output `y`, not the
//! pre-activation input `x`. The backward pass only ever has `y` at hand (it is what a
//! [`DenseLayer`](crate::layers::DenseLayer) caches), so `derivative` must only be fed
//! values previously produced by `apply` of the same activation.
//!
//! ```rust
//! use sparta::activations::Activation;
//!
//! let y = Activation::Sigmoid.apply(0.0);
//! assert_eq!(y, 0.5);
//! assert_eq!(Activation::Sigmoid.derivative(y), 0.25);
//! ```

pub mod functions;

pub use functions::Activation;
