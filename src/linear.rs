use ndarray::{Array2, Array3};
use rand_distr::{Distribution, Normal};

use crate::Layer;

/// Affine projection `x · W + b`.
///
/// The single unit of learned state in the crate: attention owns four of
/// these, the feed-forward network owns two. Weights are read-only during a
/// forward pass; an external training step is the only writer.
pub struct Linear {
    pub weight: Array2<f32>, // [in_dim, out_dim]
    pub bias: Array2<f32>,   // [1, out_dim]
}

impl Linear {
    /// Initialize with random weights and zero bias.
    pub fn new(in_dim: usize, out_dim: usize) -> Self {
        assert!(
            in_dim > 0 && out_dim > 0,
            "linear dimensions must be positive, got {in_dim}x{out_dim}"
        );

        let mut rng = rand::rng();
        // Xavier/He initialization: std = sqrt(2 / fan_in)
        let std = (2.0 / in_dim as f32).sqrt();
        let normal = Normal::new(0.0, std).unwrap();

        Linear {
            weight: Array2::from_shape_fn((in_dim, out_dim), |_| normal.sample(&mut rng)),
            bias: Array2::zeros((1, out_dim)),
        }
    }

    pub fn in_dim(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn out_dim(&self) -> usize {
        self.weight.shape()[1]
    }

    /// Forward pass for batched input: [batch, seq_len, in_dim] → [batch, seq_len, out_dim]
    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let batch_size = input.shape()[0];
        let seq_len = input.shape()[1];
        assert_eq!(
            input.shape()[2],
            self.in_dim(),
            "linear layer expected feature dim {}, got {}",
            self.in_dim(),
            input.shape()[2]
        );

        let mut output = Array3::<f32>::zeros((batch_size, seq_len, self.out_dim()));

        for (mut out_slice, in_slice) in output.outer_iter_mut().zip(input.outer_iter()) {
            // in_slice shape: [seq_len, in_dim], out_slice shape: [seq_len, out_dim]
            out_slice.assign(&(in_slice.dot(&self.weight) + &self.bias));
        }

        output
    }

    /// Forward pass for a single 2-D operand: [rows, in_dim] → [rows, out_dim]
    pub fn forward_2d(&self, input: &Array2<f32>) -> Array2<f32> {
        assert_eq!(
            input.shape()[1],
            self.in_dim(),
            "linear layer expected feature dim {}, got {}",
            self.in_dim(),
            input.shape()[1]
        );

        input.dot(&self.weight) + &self.bias
    }
}

impl Layer for Linear {
    fn layer_type(&self) -> &str {
        "Linear"
    }

    fn parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
