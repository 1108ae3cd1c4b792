use itertools::izip;
use ndarray::{Array2, Array3, Array4, ArrayView2, Axis, s};

use crate::Layer;
use crate::dropout::Dropout;
use crate::linear::Linear;

/// Score written over masked-out positions before the softmax. Large enough
/// that the normalized probability underflows to zero.
const MASK_FILL: f32 = -1e9;

/// Multi-Head Attention
///
/// Projects queries, keys, and values, splits the embedding dimension into
/// multiple attention heads, computes scaled dot-product attention
/// independently per (batch, head) pair, concatenates the heads, and applies
/// a final output projection.
///
/// Architecture:
/// - query: [batch, seq_len_q, d_model], key/value: [batch, seq_len_k, d_model]
/// - Split into num_heads with head_dim = d_model / num_heads
/// - Each head attends over its own subspace, optionally masked
/// - Outputs are concatenated and projected through w_o
pub struct MultiHeadAttention {
    pub d_model: usize,
    pub num_heads: usize,
    pub head_dim: usize,

    // Projections for Q, K, V and the output
    pub w_q: Linear,
    pub w_k: Linear,
    pub w_v: Linear,
    pub w_o: Linear,

    dropout: Dropout,

    /// Attention probabilities from the most recent forward pass, retained
    /// for inspection/visualization only. These are the post-softmax,
    /// post-dropout values — exactly the matrix used in the weighted sum.
    /// Shape: [batch, num_heads, seq_len_q, seq_len_k].
    pub last_attn_weights: Option<Array4<f32>>,
}

impl MultiHeadAttention {
    /// Creates a new MultiHeadAttention layer.
    ///
    /// # Arguments
    /// * `d_model` - The dimension of input embeddings
    /// * `num_heads` - Number of attention heads (must divide d_model evenly)
    /// * `dropout_rate` - Dropout applied to the attention probabilities
    pub fn new(d_model: usize, num_heads: usize, dropout_rate: f32) -> Self {
        assert!(num_heads > 0, "num_heads must be positive");
        assert_eq!(
            d_model % num_heads,
            0,
            "d_model must be divisible by num_heads"
        );

        let head_dim = d_model / num_heads;

        MultiHeadAttention {
            d_model,
            num_heads,
            head_dim,
            w_q: Linear::new(d_model, d_model),
            w_k: Linear::new(d_model, d_model),
            w_v: Linear::new(d_model, d_model),
            w_o: Linear::new(d_model, d_model),
            dropout: Dropout::new(dropout_rate),
            last_attn_weights: None,
        }
    }

    /// Splits a [rows, d_model] array into num_heads arrays of
    /// [rows, head_dim], one column block per head.
    pub fn split_heads(&self, x: &Array2<f32>) -> Vec<Array2<f32>> {
        let mut heads = Vec::with_capacity(self.num_heads);

        for h in 0..self.num_heads {
            let start = h * self.head_dim;
            let end = start + self.head_dim;
            let head = x.slice(s![.., start..end]).to_owned();
            heads.push(head);
        }

        heads
    }

    /// Concatenates per-head [rows, head_dim] arrays back into
    /// [rows, d_model]. Exact inverse of `split_heads`: head h lands in the
    /// same column block it was split from.
    pub fn concat_heads(&self, heads: &[Array2<f32>]) -> Array2<f32> {
        let rows = heads[0].shape()[0];
        let mut result = Array2::zeros((rows, self.d_model));

        for (h, head) in heads.iter().enumerate() {
            let start = h * self.head_dim;
            let end = start + self.head_dim;
            result.slice_mut(s![.., start..end]).assign(head);
        }

        result
    }

    /// Applies softmax row-wise over the key axis.
    fn softmax(scores: &Array2<f32>) -> Array2<f32> {
        let mut result = scores.clone();

        for mut row in result.rows_mut() {
            let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let exp_values: Vec<f32> = row.iter().map(|&x| (x - max_val).exp()).collect();
            let sum_exp: f32 = exp_values.iter().sum();

            for (i, &exp_val) in exp_values.iter().enumerate() {
                row[i] = exp_val / sum_exp;
            }
        }

        result
    }

    /// Scaled dot-product attention for a single head.
    ///
    /// Masked positions (mask value 0) are overwritten with MASK_FILL in the
    /// freshly computed scores matrix before the softmax, so they carry no
    /// probability. This is the one sanctioned in-place fill; caller tensors
    /// are never mutated.
    fn attention_head(
        &mut self,
        q_head: &Array2<f32>,
        k_head: &Array2<f32>,
        v_head: &Array2<f32>,
        mask: Option<&ArrayView2<f32>>,
    ) -> (Array2<f32>, Array2<f32>) {
        let scale = (self.head_dim as f32).sqrt();

        let k_t = k_head.t();
        let mut scores = q_head.dot(&k_t) / scale;

        if let Some(mask) = mask {
            for ((i, j), &keep) in mask.indexed_iter() {
                if keep == 0.0 {
                    scores[[i, j]] = MASK_FILL;
                }
            }
        }

        let probs = Self::softmax(&scores);
        let probs = self.dropout.forward(&probs);
        let output = probs.dot(v_head);

        (output, probs)
    }

    /// Forward pass.
    ///
    /// `query`: [batch, seq_len_q, d_model]
    /// `key`, `value`: [batch, seq_len_k, d_model] (shared seq_len_k)
    /// `mask`: optional [1 | batch, seq_len_q, seq_len_k]; a value of 0
    /// hides the corresponding query/key pair, a leading dimension of 1
    /// broadcasts one mask over the whole batch.
    ///
    /// Returns: [batch, seq_len_q, d_model]. Self-attention passes the same
    /// tensor as query, key, and value; each is still projected and
    /// head-split independently.
    pub fn forward(
        &mut self,
        query: &Array3<f32>,
        key: &Array3<f32>,
        value: &Array3<f32>,
        mask: Option<&Array3<f32>>,
    ) -> Array3<f32> {
        let batch_size = query.shape()[0];
        let seq_len_q = query.shape()[1];
        let seq_len_k = key.shape()[1];

        assert_eq!(
            query.shape()[2],
            self.d_model,
            "query feature dim {} does not match d_model {}",
            query.shape()[2],
            self.d_model
        );
        assert_eq!(
            key.shape()[2],
            self.d_model,
            "key feature dim {} does not match d_model {}",
            key.shape()[2],
            self.d_model
        );
        assert_eq!(
            value.shape()[2],
            self.d_model,
            "value feature dim {} does not match d_model {}",
            value.shape()[2],
            self.d_model
        );
        assert_eq!(
            key.shape()[0],
            batch_size,
            "key batch size must match query batch size"
        );
        assert_eq!(
            value.shape()[0],
            batch_size,
            "value batch size must match query batch size"
        );
        assert_eq!(
            value.shape()[1],
            seq_len_k,
            "key and value must share the same sequence length"
        );
        if let Some(m) = mask {
            assert!(
                m.shape()[0] == 1 || m.shape()[0] == batch_size,
                "mask batch dim must be 1 or {}, got {}",
                batch_size,
                m.shape()[0]
            );
            assert_eq!(m.shape()[1], seq_len_q, "mask rows must match seq_len_q");
            assert_eq!(m.shape()[2], seq_len_k, "mask cols must match seq_len_k");
        }

        // Project Q, K, V — each input through its own projection
        let q = self.w_q.forward(query);
        let k = self.w_k.forward(key);
        let v = self.w_v.forward(value);

        let mut output = Array3::<f32>::zeros((batch_size, seq_len_q, self.d_model));
        let mut attn_weights =
            Array4::<f32>::zeros((batch_size, self.num_heads, seq_len_q, seq_len_k));

        for (b, (q_slice, k_slice, v_slice)) in
            izip!(q.outer_iter(), k.outer_iter(), v.outer_iter()).enumerate()
        {
            // Split each projection into heads independently
            let q_heads = self.split_heads(&q_slice.to_owned());
            let k_heads = self.split_heads(&k_slice.to_owned());
            let v_heads = self.split_heads(&v_slice.to_owned());

            let batch_mask = mask.map(|m| {
                let mb = if m.shape()[0] == 1 { 0 } else { b };
                m.index_axis(Axis(0), mb)
            });

            // Apply attention for each head
            let mut head_outputs = Vec::with_capacity(self.num_heads);
            for h in 0..self.num_heads {
                let (head_output, head_probs) =
                    self.attention_head(&q_heads[h], &k_heads[h], &v_heads[h], batch_mask.as_ref());
                attn_weights.slice_mut(s![b, h, .., ..]).assign(&head_probs);
                head_outputs.push(head_output);
            }

            // Concatenate heads, inverting the split
            let concat = self.concat_heads(&head_outputs);
            output.slice_mut(s![b, .., ..]).assign(&concat);
        }

        self.last_attn_weights = Some(attn_weights);

        // Final output projection restores [batch, seq_len_q, d_model]
        self.w_o.forward(&output)
    }
}

impl Layer for MultiHeadAttention {
    fn layer_type(&self) -> &str {
        "MultiHeadAttention"
    }

    fn parameters(&self) -> usize {
        self.w_q.parameters()
            + self.w_k.parameters()
            + self.w_v.parameters()
            + self.w_o.parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.dropout.set_training(training);
    }
}
