pub mod dropout;
pub mod embeddings;
pub mod encoder;
pub mod feed_forward;
pub mod layer_norm;
pub mod linear;
pub mod multi_head_attention;
pub mod positional_encoding;
pub mod residual;
// Re-export key structs for easier access
pub use dropout::Dropout;
pub use embeddings::Embeddings;
pub use encoder::{Encoder, EncoderConfig, EncoderLayer, TransformerEncoder};
pub use feed_forward::FeedForward;
pub use layer_norm::LayerNorm;
pub use linear::Linear;
pub use multi_head_attention::MultiHeadAttention;
pub use positional_encoding::PositionalEncoding;
pub use residual::ResidualConnection;

// Constants
pub const MAX_SEQ_LEN: usize = 128;
pub const EMBEDDING_DIM: usize = 128;
pub const HIDDEN_DIM: usize = 512;
pub const NUM_HEADS: usize = 8;
pub const NUM_LAYERS: usize = 2;
pub const BATCH_SIZE: usize = 4;

/// Bookkeeping surface shared by every layer in the encoder.
///
/// Forward signatures stay inherent because they differ per layer (attention
/// takes separate query/key/value tensors and a mask); composition happens
/// through closures in `ResidualConnection` instead.
pub trait Layer {
    fn layer_type(&self) -> &str;

    fn parameters(&self) -> usize;

    /// Toggle training/evaluation mode. Only layers holding a dropout care.
    fn set_training(&mut self, _training: bool) {}
}
