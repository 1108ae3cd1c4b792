use ndarray::{Array2, Array3, s};
use rand_distr::{Distribution, Normal};

use crate::Layer;

/// Token embedding table with √d_model output scaling.
///
/// Row i of the table is the dense vector for token id i. The table is
/// created once at model-build time and read-only during forward passes.
pub struct Embeddings {
    pub table: Array2<f32>, // [vocab_size, d_model]
}

impl Embeddings {
    /// Initialize the table with random embeddings.
    pub fn new(vocab_size: usize, d_model: usize) -> Self {
        assert!(
            vocab_size > 0 && d_model > 0,
            "embedding dimensions must be positive, got {vocab_size}x{d_model}"
        );

        let mut rng = rand::rng();
        // Xavier/He initialization: std = sqrt(2 / fan_in)
        let std = (2.0 / d_model as f32).sqrt();
        let normal = Normal::new(0.0, std).unwrap();

        Embeddings {
            table: Array2::from_shape_fn((vocab_size, d_model), |_| normal.sample(&mut rng)),
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.table.shape()[0]
    }

    pub fn d_model(&self) -> usize {
        self.table.shape()[1]
    }

    /// Looks up each token id and scales the embedding by sqrt(d_model).
    ///
    /// Input: [batch, seq_len] token ids, each in [0, vocab_size).
    /// Output: [batch, seq_len, d_model].
    /// An out-of-range id is a caller bug and panics.
    pub fn forward(&self, ids: &Array2<usize>) -> Array3<f32> {
        let batch_size = ids.shape()[0];
        let seq_len = ids.shape()[1];
        let scale = (self.d_model() as f32).sqrt();

        let mut output = Array3::<f32>::zeros((batch_size, seq_len, self.d_model()));

        for ((b, t), &id) in ids.indexed_iter() {
            assert!(
                id < self.vocab_size(),
                "token id {} out of range for vocabulary of {}",
                id,
                self.vocab_size()
            );
            let embedded = self.table.row(id).mapv(|x| x * scale);
            output.slice_mut(s![b, t, ..]).assign(&embedded);
        }

        output
    }
}

impl Layer for Embeddings {
    fn layer_type(&self) -> &str {
        "Embeddings"
    }

    fn parameters(&self) -> usize {
        self.table.len()
    }
}
