use ndarray::Array3;
use transformer_encoder::{Layer, MAX_SEQ_LEN, PositionalEncoding};

#[test]
fn test_table_first_row_values() {
    let encoding = PositionalEncoding::new(16, 32, 0.0);
    let table = encoding.table();

    // Position 0: sin(0) = 0 in even columns, cos(0) = 1 in odd columns
    for i in 0..8 {
        assert_eq!(table[[0, 2 * i]], 0.0, "table[0, 2i] should be sin(0)");
        assert_eq!(table[[0, 2 * i + 1]], 1.0, "table[0, 2i+1] should be cos(0)");
    }
}

#[test]
fn test_table_sin_cos_pairs_lie_on_unit_circle() {
    let d_model = 32;
    let max_seq_len = 64;
    let encoding = PositionalEncoding::new(d_model, max_seq_len, 0.0);
    let table = encoding.table();

    for pos in 0..max_seq_len {
        for i in 0..d_model / 2 {
            let s = table[[pos, 2 * i]];
            let c = table[[pos, 2 * i + 1]];
            let magnitude = s * s + c * c;
            assert!(
                (magnitude - 1.0).abs() < 1e-5,
                "sin^2 + cos^2 should be 1 at pos {pos}, pair {i}, got {magnitude}"
            );
        }
    }
}

#[test]
fn test_forward_adds_table_to_every_batch_entry() {
    let d_model = 8;
    let seq_len = 5;
    let mut encoding = PositionalEncoding::new(d_model, 16, 0.0);

    // Zero input makes the output equal to the table itself
    let input = Array3::<f32>::zeros((3, seq_len, d_model));
    let output = encoding.forward(&input);

    let table = encoding.table().clone();
    for b in 0..3 {
        for pos in 0..seq_len {
            for j in 0..d_model {
                assert_eq!(
                    output[[b, pos, j]],
                    table[[pos, j]],
                    "batch entry {b} should carry the shared table"
                );
            }
        }
    }
}

#[test]
fn test_forward_preserves_shape_up_to_max_len() {
    let mut encoding = PositionalEncoding::new(16, MAX_SEQ_LEN, 0.0);

    for seq_len in [1, 2, MAX_SEQ_LEN / 2, MAX_SEQ_LEN] {
        let input = Array3::ones((2, seq_len, 16));
        let output = encoding.forward(&input);
        assert_eq!(output.shape(), [2, seq_len, 16]);
    }
}

#[test]
fn test_eval_mode_is_deterministic() {
    let mut encoding = PositionalEncoding::new(16, 32, 0.5);
    encoding.set_training(false);

    let input = Array3::from_shape_fn((1, 4, 16), |(_, i, j)| ((i + j) as f32 * 0.2).sin());
    let first = encoding.forward(&input);
    let second = encoding.forward(&input);

    assert_eq!(first, second);
}

#[test]
#[should_panic(expected = "exceeds precomputed table length")]
fn test_forward_rejects_sequences_beyond_table() {
    let mut encoding = PositionalEncoding::new(8, 4, 0.0);
    let input = Array3::ones((1, 5, 8));
    encoding.forward(&input);
}

#[test]
#[should_panic(expected = "d_model must be even")]
fn test_odd_d_model_is_rejected() {
    PositionalEncoding::new(7, 16, 0.0);
}
