pub mod test_replay_buffer;
pub mod test_trainer;

/// Hand-wired 2-2-2 network used where exact gradients are checked.
///
/// hidden: identity weights, ReLU. output: `[[1, 1], [0.5, -1]]`, linear.
pub(crate) fn fixed_network() -> crate::network::QNetwork<u8> {
    use crate::activations::Activation;
    use crate::layers::DenseLayer;
    use ndarray::array;

    let hidden = DenseLayer::from_parts(array![[1.0, 0.0], [0.0, 1.0]], array![0.0, 0.0], Activation::Relu)
        .unwrap();
    let output = DenseLayer::from_parts(array![[1.0, 1.0], [0.5, -1.0]], array![0.0, 0.0], Activation::Linear)
        .unwrap();
    crate::network::QNetwork::from_layers("fixed", hidden, output, vec![0u8, 1]).unwrap()
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
