use ndarray::Array3;

use crate::Layer;
use crate::dropout::Dropout;
use crate::linear::Linear;

/// Position-wise feed-forward network.
///
/// Two affine projections with a ReLU between them. Dropout is applied to
/// the activated hidden state before the second projection. d_ff is a free
/// configuration constant, independent of d_model and the head count.
pub struct FeedForward {
    pub linear_1: Linear, // d_model -> d_ff
    pub linear_2: Linear, // d_ff -> d_model
    dropout: Dropout,
}

impl FeedForward {
    pub fn new(d_model: usize, d_ff: usize, dropout_rate: f32) -> Self {
        FeedForward {
            linear_1: Linear::new(d_model, d_ff),
            linear_2: Linear::new(d_ff, d_model),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Forward pass: [batch, seq_len, d_model] → [batch, seq_len, d_model]
    pub fn forward(&mut self, input: &Array3<f32>) -> Array3<f32> {
        let hidden = self.linear_1.forward(input);
        let activated = hidden.mapv(|x| x.max(0.0)); // ReLU
        let dropped = self.dropout.forward(&activated);
        self.linear_2.forward(&dropped)
    }
}

impl Layer for FeedForward {
    fn layer_type(&self) -> &str {
        "FeedForward"
    }

    fn parameters(&self) -> usize {
        self.linear_1.parameters() + self.linear_2.parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.dropout.set_training(training);
    }
}
