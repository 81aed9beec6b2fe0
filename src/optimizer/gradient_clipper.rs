use ndarray::Array1;

/// Symmetric clip-by-value applied to TD errors and back-propagated gradients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientClipper {
    threshold: f64,
}

impl GradientClipper {
    pub fn new(threshold: f64) -> Self {
        GradientClipper {
            threshold: threshold.abs(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(-self.threshold, self.threshold)
    }

    pub fn clip_inplace(&self, gradients: &mut Array1<f64>) {
        let t = self.threshold;
        gradients.mapv_inplace(|g| g.clamp(-t, t));
    }
}
