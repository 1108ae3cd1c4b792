use ndarray::Array3;

use crate::Layer;
use crate::dropout::Dropout;
use crate::layer_norm::LayerNorm;

/// Pre-norm residual connection around an arbitrary sublayer.
///
/// Computes `x + dropout(sublayer(norm(x)))`: normalization runs before the
/// sublayer, and the un-normalized input feeds the skip path. This ordering
/// is load-bearing and must not be swapped for post-norm.
pub struct ResidualConnection {
    pub norm: LayerNorm,
    dropout: Dropout,
}

impl ResidualConnection {
    pub fn new(dropout_rate: f32) -> Self {
        ResidualConnection {
            norm: LayerNorm::new(),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Wraps `sublayer`, any tensor-to-tensor function of matching shape —
    /// an attention layer closed over its mask, a feed-forward network, or a
    /// bare closure in tests.
    pub fn forward<F>(&mut self, input: &Array3<f32>, mut sublayer: F) -> Array3<f32>
    where
        F: FnMut(&Array3<f32>) -> Array3<f32>,
    {
        let normalized = self.norm.forward(input);
        let transformed = sublayer(&normalized);
        assert_eq!(
            transformed.shape(),
            input.shape(),
            "sublayer must preserve shape for the residual add"
        );

        input + &self.dropout.forward(&transformed)
    }
}

impl Layer for ResidualConnection {
    fn layer_type(&self) -> &str {
        "ResidualConnection"
    }

    fn parameters(&self) -> usize {
        self.norm.parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.dropout.set_training(training);
    }
}
