use ndarray::Array3;

use crate::Layer;

pub const DEFAULT_EPS: f32 = 1e-6;

/// Layer normalization over the feature axis.
///
/// Each innermost d_model vector v becomes
///
///   alpha * (v - mean) / (std + eps) + bias
///
/// where std is the sample standard deviation of v and alpha/bias are two
/// learned scalars broadcast over all features. eps is added to the
/// deviation itself, not the variance, and only guards against division by
/// zero.
pub struct LayerNorm {
    pub alpha: f32,
    pub bias: f32,
    pub eps: f32,
}

impl Default for LayerNorm {
    fn default() -> Self {
        LayerNorm::new()
    }
}

impl LayerNorm {
    pub fn new() -> Self {
        Self::with_eps(DEFAULT_EPS)
    }

    pub fn with_eps(eps: f32) -> Self {
        assert!(eps > 0.0, "eps must be positive, got {eps}");

        LayerNorm {
            alpha: 1.0,
            bias: 0.0,
            eps,
        }
    }

    /// Normalizes every [batch, seq] row of a [batch, seq_len, d_model]
    /// tensor independently.
    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let d_model = input.shape()[2];
        assert!(
            d_model > 1,
            "layer norm needs at least two features for a sample deviation, got {d_model}"
        );

        let mut output = input.clone();

        for mut batch_slice in output.outer_iter_mut() {
            for mut row in batch_slice.rows_mut() {
                let n = row.len() as f32;
                let mean = row.sum() / n;
                let variance = row.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / (n - 1.0);
                let std = variance.sqrt();

                for x in row.iter_mut() {
                    *x = self.alpha * (*x - mean) / (std + self.eps) + self.bias;
                }
            }
        }

        output
    }
}

impl Layer for LayerNorm {
    fn layer_type(&self) -> &str {
        "LayerNorm"
    }

    fn parameters(&self) -> usize {
        2 // scalar alpha and bias
    }
}
