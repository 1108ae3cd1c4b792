use ndarray::{Array2, Array3};
use transformer_encoder::{EMBEDDING_DIM, Layer, MultiHeadAttention};

#[test]
fn test_multi_head_attention_forward() {
    // Create multi-head attention module with 8 heads
    let mut mha = MultiHeadAttention::new(EMBEDDING_DIM, 8, 0.0);

    // Create input tensor (batch=2, seq_len=3, d_model=EMBEDDING_DIM)
    let input = Array3::ones((2, 3, EMBEDDING_DIM));

    // Self-attention: the same tensor is query, key, and value
    let output = mha.forward(&input, &input, &input, None);

    // Check output shape - should be same as input
    assert_eq!(output.shape(), input.shape());

    // Verify output is not all zeros
    let output_sum: f32 = output.iter().sum();
    assert!(output_sum.abs() > 0.0, "Output should not be all zeros");
}

#[test]
fn test_multi_head_attention_with_different_sequence_lengths() {
    let mut mha = MultiHeadAttention::new(EMBEDDING_DIM, 4, 0.0);

    for seq_len in 1..10 {
        let input = Array3::ones((1, seq_len, EMBEDDING_DIM));
        let output = mha.forward(&input, &input, &input, None);
        assert_eq!(output.shape(), [1, seq_len, EMBEDDING_DIM]);
    }
}

#[test]
fn test_multi_head_attention_different_head_counts() {
    // Test with different numbers of heads (must divide EMBEDDING_DIM evenly)
    let seq_len = 5;
    let valid_head_counts = vec![1, 2, 4, 8, 16, 32, 64, 128];

    for num_heads in valid_head_counts {
        if EMBEDDING_DIM.is_multiple_of(num_heads) {
            let mut mha = MultiHeadAttention::new(EMBEDDING_DIM, num_heads, 0.0);
            let input = Array3::ones((1, seq_len, EMBEDDING_DIM));

            let _output = mha.forward(&input, &input, &input, None);

            assert_eq!(mha.num_heads, num_heads);
            assert_eq!(mha.head_dim, EMBEDDING_DIM / num_heads);
        }
    }
}

#[test]
fn test_cross_attention_shapes() {
    // Query and key/value sequences of different lengths
    let d_model = 16;
    let batch_size = 2;
    let seq_len_q = 4;
    let seq_len_k = 7;

    let mut mha = MultiHeadAttention::new(d_model, 4, 0.0);
    let query = Array3::ones((batch_size, seq_len_q, d_model));
    let key = Array3::ones((batch_size, seq_len_k, d_model));
    let value = Array3::ones((batch_size, seq_len_k, d_model));

    let output = mha.forward(&query, &key, &value, None);

    // Output length follows the query; the key length only shows up in the
    // retained attention probabilities
    assert_eq!(output.shape(), [batch_size, seq_len_q, d_model]);
    let weights = mha.last_attn_weights.as_ref().unwrap();
    assert_eq!(weights.shape(), [batch_size, 4, seq_len_q, seq_len_k]);
}

#[test]
fn test_attention_probabilities_sum_to_one() {
    let d_model = 32;
    let num_heads = 4;
    let seq_len = 6;

    let mut mha = MultiHeadAttention::new(d_model, num_heads, 0.0);
    let input = Array3::from_shape_fn((2, seq_len, d_model), |(b, i, j)| {
        ((b + i + j) as f32 * 0.3).sin()
    });

    let _output = mha.forward(&input, &input, &input, None);

    let weights = mha.last_attn_weights.as_ref().unwrap();
    for b in 0..2 {
        for h in 0..num_heads {
            for i in 0..seq_len {
                let row_sum: f32 = (0..seq_len).map(|j| weights[[b, h, i, j]]).sum();
                assert!(
                    (row_sum - 1.0).abs() < 1e-5,
                    "attention row should sum to 1, got {row_sum}"
                );
            }
        }
    }
}

#[test]
fn test_masking_concentrates_probability() {
    // A mask hiding all positions except one must put probability ~1 there
    let d_model = 8;
    let num_heads = 2;
    let seq_len = 4;
    let visible = 2;

    let mut mha = MultiHeadAttention::new(d_model, num_heads, 0.0);
    let input = Array3::from_shape_fn((1, seq_len, d_model), |(_, i, j)| {
        ((i * d_model + j) as f32 * 0.1).cos()
    });

    // 0 hides, 1 keeps; only column `visible` stays open for every query row
    let mut mask = Array3::<f32>::zeros((1, seq_len, seq_len));
    for i in 0..seq_len {
        mask[[0, i, visible]] = 1.0;
    }

    let _output = mha.forward(&input, &input, &input, Some(&mask));

    let weights = mha.last_attn_weights.as_ref().unwrap();
    for h in 0..num_heads {
        for i in 0..seq_len {
            for j in 0..seq_len {
                let p = weights[[0, h, i, j]];
                if j == visible {
                    assert!((p - 1.0).abs() < 1e-5, "unhidden position should carry ~1, got {p}");
                } else {
                    assert!(p < 1e-5, "hidden position should carry ~0, got {p}");
                }
            }
        }
    }
}

#[test]
fn test_identity_weights_single_position() {
    // d_model=4, h=2, seq_len=1: with identity projections and no mask,
    // attention over a single position returns the input unchanged
    let d_model = 4;
    let mut mha = MultiHeadAttention::new(d_model, 2, 0.0);
    mha.w_q.weight = Array2::eye(d_model);
    mha.w_k.weight = Array2::eye(d_model);
    mha.w_v.weight = Array2::eye(d_model);
    mha.w_o.weight = Array2::eye(d_model);

    let mut input = Array3::<f32>::zeros((1, 1, d_model));
    input[[0, 0, 0]] = 1.0;
    input[[0, 0, 2]] = 1.0;

    let output = mha.forward(&input, &input, &input, None);

    for j in 0..d_model {
        let diff = (output[[0, 0, j]] - input[[0, 0, j]]).abs();
        assert!(
            diff < 1e-6,
            "identity attention should reproduce the input, diff at {j}: {diff}"
        );
    }
}

#[test]
fn test_mask_broadcasts_over_batch() {
    // A mask with leading dimension 1 applies to every batch entry
    let d_model = 8;
    let batch_size = 3;
    let seq_len = 4;

    let mut mha = MultiHeadAttention::new(d_model, 2, 0.0);
    let input = Array3::from_shape_fn((batch_size, seq_len, d_model), |(b, i, j)| {
        ((b * 31 + i * 7 + j) as f32 * 0.05).sin()
    });

    let mut mask = Array3::<f32>::zeros((1, seq_len, seq_len));
    for i in 0..seq_len {
        mask[[0, i, 0]] = 1.0;
    }

    let _output = mha.forward(&input, &input, &input, Some(&mask));

    let weights = mha.last_attn_weights.as_ref().unwrap();
    for b in 0..batch_size {
        for i in 0..seq_len {
            assert!(
                (weights[[b, 0, i, 0]] - 1.0).abs() < 1e-5,
                "broadcast mask should apply to batch entry {b}"
            );
        }
    }
}

#[test]
fn test_multi_head_attention_parameter_count() {
    let num_heads = 8;
    let mha = MultiHeadAttention::new(EMBEDDING_DIM, num_heads, 0.0);

    // Four projections W_q, W_k, W_v, W_o, each with a bias row
    let expected = 4 * (EMBEDDING_DIM * EMBEDDING_DIM + EMBEDDING_DIM);
    assert_eq!(mha.parameters(), expected);
}

#[test]
fn test_multi_head_attention_numerical_stability() {
    // Test with extreme values to check numerical stability
    let mut mha = MultiHeadAttention::new(EMBEDDING_DIM, 8, 0.0);

    let input_large = Array3::ones((1, 3, EMBEDDING_DIM)) * 100.0;
    let output_large = mha.forward(&input_large, &input_large, &input_large, None);
    assert!(
        output_large.iter().all(|&x| x.is_finite()),
        "Output should be finite with large inputs"
    );

    let input_small = Array3::ones((1, 3, EMBEDDING_DIM)) * 0.001;
    let output_small = mha.forward(&input_small, &input_small, &input_small, None);
    assert!(
        output_small.iter().all(|&x| x.is_finite()),
        "Output should be finite with small inputs"
    );
}

#[test]
#[should_panic(expected = "d_model must be divisible by num_heads")]
fn test_multi_head_attention_invalid_head_count() {
    // Should panic if num_heads doesn't divide d_model
    MultiHeadAttention::new(EMBEDDING_DIM, 7, 0.0); // 128 is not divisible by 7
}

#[test]
#[should_panic(expected = "key and value must share the same sequence length")]
fn test_multi_head_attention_mismatched_key_value() {
    let mut mha = MultiHeadAttention::new(16, 2, 0.0);
    let query = Array3::ones((1, 3, 16));
    let key = Array3::ones((1, 5, 16));
    let value = Array3::ones((1, 4, 16));
    mha.forward(&query, &key, &value, None);
}

#[test]
#[should_panic(expected = "key batch size must match query batch size")]
fn test_multi_head_attention_mismatched_batch() {
    let mut mha = MultiHeadAttention::new(16, 2, 0.0);
    let query = Array3::ones((2, 3, 16));
    let kv = Array3::ones((1, 3, 16));
    mha.forward(&query, &kv, &kv, None);
}
