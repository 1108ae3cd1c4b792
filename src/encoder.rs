use ndarray::{Array2, Array3};

use crate::embeddings::Embeddings;
use crate::feed_forward::FeedForward;
use crate::layer_norm::LayerNorm;
use crate::multi_head_attention::MultiHeadAttention;
use crate::positional_encoding::PositionalEncoding;
use crate::residual::ResidualConnection;
use crate::{EMBEDDING_DIM, HIDDEN_DIM, Layer, MAX_SEQ_LEN, NUM_HEADS, NUM_LAYERS};

/// Model hyperparameters, validated before any layer is built.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub vocab_size: usize,
    pub d_model: usize,
    pub num_heads: usize,
    pub d_ff: usize,
    pub num_layers: usize,
    pub max_seq_len: usize,
    pub dropout: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            vocab_size: 10_000,
            d_model: EMBEDDING_DIM,
            num_heads: NUM_HEADS,
            d_ff: HIDDEN_DIM,
            num_layers: NUM_LAYERS,
            max_seq_len: MAX_SEQ_LEN,
            dropout: 0.1,
        }
    }
}

impl EncoderConfig {
    /// Panics on any malformed parameter, so a bad configuration can never
    /// produce a usable component.
    pub fn validate(&self) {
        assert!(self.vocab_size > 0, "vocab_size must be positive");
        assert!(self.d_model > 0, "d_model must be positive");
        assert_eq!(
            self.d_model % 2,
            0,
            "d_model must be even for the sinusoidal table"
        );
        assert!(self.num_heads > 0, "num_heads must be positive");
        assert_eq!(
            self.d_model % self.num_heads,
            0,
            "d_model must be divisible by num_heads"
        );
        assert!(self.d_ff > 0, "d_ff must be positive");
        assert!(self.num_layers > 0, "num_layers must be positive");
        assert!(self.max_seq_len > 0, "max_seq_len must be positive");
        assert!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}",
            self.dropout
        );
    }
}

/// One encoder layer: multi-head self-attention and a feed-forward network,
/// each wrapped in a pre-norm residual connection.
pub struct EncoderLayer {
    pub attention: MultiHeadAttention,
    pub feed_forward: FeedForward,
    attention_residual: ResidualConnection,
    feed_forward_residual: ResidualConnection,
}

impl EncoderLayer {
    pub fn new(d_model: usize, num_heads: usize, d_ff: usize, dropout: f32) -> Self {
        EncoderLayer {
            attention: MultiHeadAttention::new(d_model, num_heads, dropout),
            feed_forward: FeedForward::new(d_model, d_ff, dropout),
            attention_residual: ResidualConnection::new(dropout),
            feed_forward_residual: ResidualConnection::new(dropout),
        }
    }

    /// Self-attention uses the same tensor as query, key, and value.
    pub fn forward(&mut self, input: &Array3<f32>, mask: Option<&Array3<f32>>) -> Array3<f32> {
        let attention = &mut self.attention;
        let attended = self
            .attention_residual
            .forward(input, |x| attention.forward(x, x, x, mask));

        let feed_forward = &mut self.feed_forward;
        self.feed_forward_residual
            .forward(&attended, |x| feed_forward.forward(x))
    }
}

impl Layer for EncoderLayer {
    fn layer_type(&self) -> &str {
        "EncoderLayer"
    }

    fn parameters(&self) -> usize {
        self.attention.parameters()
            + self.feed_forward.parameters()
            + self.attention_residual.parameters()
            + self.feed_forward_residual.parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.attention.set_training(training);
        self.feed_forward.set_training(training);
        self.attention_residual.set_training(training);
        self.feed_forward_residual.set_training(training);
    }
}

/// A stack of encoder layers with a closing normalization.
///
/// Pre-norm layers leave the residual trunk un-normalized, so one final
/// LayerNorm is applied after the stack.
pub struct Encoder {
    pub layers: Vec<EncoderLayer>,
    pub norm: LayerNorm,
}

impl Encoder {
    pub fn new(config: &EncoderConfig) -> Self {
        config.validate();

        let layers = (0..config.num_layers)
            .map(|_| {
                EncoderLayer::new(
                    config.d_model,
                    config.num_heads,
                    config.d_ff,
                    config.dropout,
                )
            })
            .collect();

        Encoder {
            layers,
            norm: LayerNorm::new(),
        }
    }

    pub fn forward(&mut self, input: &Array3<f32>, mask: Option<&Array3<f32>>) -> Array3<f32> {
        let mut hidden = input.clone();
        for layer in &mut self.layers {
            hidden = layer.forward(&hidden, mask);
        }
        self.norm.forward(&hidden)
    }
}

impl Layer for Encoder {
    fn layer_type(&self) -> &str {
        "Encoder"
    }

    fn parameters(&self) -> usize {
        let layer_params: usize = self.layers.iter().map(|l| l.parameters()).sum();
        layer_params + self.norm.parameters()
    }

    fn set_training(&mut self, training: bool) {
        for layer in &mut self.layers {
            layer.set_training(training);
        }
    }
}

/// The full forward graph: token ids → scaled embeddings → positional
/// encoding → encoder stack.
pub struct TransformerEncoder {
    pub embeddings: Embeddings,
    pub positional_encoding: PositionalEncoding,
    pub encoder: Encoder,
}

impl TransformerEncoder {
    pub fn new(config: &EncoderConfig) -> Self {
        config.validate();

        TransformerEncoder {
            embeddings: Embeddings::new(config.vocab_size, config.d_model),
            positional_encoding: PositionalEncoding::new(
                config.d_model,
                config.max_seq_len,
                config.dropout,
            ),
            encoder: Encoder::new(config),
        }
    }

    /// `ids`: [batch, seq_len] token ids.
    /// `mask`: optional [1 | batch, seq_len, seq_len] self-attention mask.
    /// Returns: [batch, seq_len, d_model].
    pub fn forward(&mut self, ids: &Array2<usize>, mask: Option<&Array3<f32>>) -> Array3<f32> {
        let embedded = self.embeddings.forward(ids);
        let encoded_input = self.positional_encoding.forward(&embedded);
        self.encoder.forward(&encoded_input, mask)
    }

    pub fn network_description(&self) -> String {
        let mut parts = vec![
            self.embeddings.layer_type().to_string(),
            self.positional_encoding.layer_type().to_string(),
        ];
        for layer in &self.encoder.layers {
            parts.push(layer.layer_type().to_string());
        }
        parts.join(" -> ")
    }

    pub fn total_parameters(&self) -> usize {
        self.embeddings.parameters()
            + self.positional_encoding.parameters()
            + self.encoder.parameters()
    }
}

impl Layer for TransformerEncoder {
    fn layer_type(&self) -> &str {
        "TransformerEncoder"
    }

    fn parameters(&self) -> usize {
        self.total_parameters()
    }

    fn set_training(&mut self, training: bool) {
        self.positional_encoding.set_training(training);
        self.encoder.set_training(training);
    }
}
