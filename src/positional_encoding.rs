use ndarray::{Array2, Array3, s};

use crate::Layer;
use crate::dropout::Dropout;

/// Fixed sinusoidal positional encoding.
///
/// The table is computed once at construction and shared read-only across
/// all forward calls and batches:
///
///   table[pos, 2i]   = sin(pos / 10000^(2i / d_model))
///   table[pos, 2i+1] = cos(pos / 10000^(2i / d_model))
pub struct PositionalEncoding {
    table: Array2<f32>, // [max_seq_len, d_model]
    dropout: Dropout,
}

impl PositionalEncoding {
    pub fn new(d_model: usize, max_seq_len: usize, dropout_rate: f32) -> Self {
        assert!(
            d_model > 0 && max_seq_len > 0,
            "positional encoding dimensions must be positive, got {max_seq_len}x{d_model}"
        );
        assert_eq!(
            d_model % 2,
            0,
            "d_model must be even for paired sin/cos columns"
        );

        let mut table = Array2::<f32>::zeros((max_seq_len, d_model));
        for pos in 0..max_seq_len {
            for i in 0..d_model / 2 {
                let freq = 1.0 / 10000f32.powf(2.0 * i as f32 / d_model as f32);
                let angle = pos as f32 * freq;
                table[[pos, 2 * i]] = angle.sin();
                table[[pos, 2 * i + 1]] = angle.cos();
            }
        }

        PositionalEncoding {
            table,
            dropout: Dropout::new(dropout_rate),
        }
    }

    pub fn table(&self) -> &Array2<f32> {
        &self.table
    }

    pub fn max_seq_len(&self) -> usize {
        self.table.shape()[0]
    }

    pub fn d_model(&self) -> usize {
        self.table.shape()[1]
    }

    /// Adds the first seq_len rows of the table to every batch entry, then
    /// applies dropout to the sum.
    ///
    /// The table is never extended at call time: seq_len beyond
    /// max_seq_len is a caller bug and panics.
    pub fn forward(&mut self, input: &Array3<f32>) -> Array3<f32> {
        let seq_len = input.shape()[1];
        assert_eq!(
            input.shape()[2],
            self.d_model(),
            "input feature dim {} does not match table d_model {}",
            input.shape()[2],
            self.d_model()
        );
        assert!(
            seq_len <= self.max_seq_len(),
            "seq_len {} exceeds precomputed table length {}",
            seq_len,
            self.max_seq_len()
        );

        let encodings = self.table.slice(s![0..seq_len, ..]);
        let mut output = input.clone();
        for mut batch_slice in output.outer_iter_mut() {
            batch_slice += &encodings;
        }

        self.dropout.forward(&output)
    }
}

impl Layer for PositionalEncoding {
    fn layer_type(&self) -> &str {
        "PositionalEncoding"
    }

    // The table is a fixed buffer, not a learned parameter
    fn parameters(&self) -> usize {
        0
    }

    fn set_training(&mut self, training: bool) {
        self.dropout.set_training(training);
    }
}
