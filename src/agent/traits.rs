use std::fmt::Debug;

use ndarray::Array1;

/// The simulation an agent is embedded in.
///
/// The learning engine treats both methods as black boxes. The observation length must
/// match the network's input size; a mismatch surfaces as
/// [`SpartaError::DimensionMismatch`](crate::error::SpartaError::DimensionMismatch).
pub trait GameContext {
    fn observation(&self) -> Array1<f64>;

    fn is_terminal(&self) -> bool;
}

/// An action the agent can take in context `C`.
///
/// Actions are opaque to the learning engine beyond equality: networks only need to find
/// an action's position in their action list.
pub trait QAction<C: ?Sized>: Clone + PartialEq + Debug {
    /// Execute the action and return the immediate reward it earned.
    fn task(&self, context: &mut C) -> f64;
}
