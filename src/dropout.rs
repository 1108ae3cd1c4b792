use ndarray::{Array, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Inverted dropout.
///
/// In training mode each element is zeroed with probability `rate` and the
/// survivors are rescaled by 1 / (1 - rate) so activations keep their
/// expected magnitude. In evaluation mode the layer is the identity.
pub struct Dropout {
    pub rate: f32,
    training: bool,
    rng: StdRng,
}

impl Dropout {
    pub fn new(rate: f32) -> Self {
        Self::from_rng(rate, StdRng::from_os_rng())
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(rate: f32, seed: u64) -> Self {
        Self::from_rng(rate, StdRng::seed_from_u64(seed))
    }

    fn from_rng(rate: f32, rng: StdRng) -> Self {
        assert!(
            (0.0..1.0).contains(&rate),
            "dropout rate must be in [0, 1), got {rate}"
        );

        Dropout {
            rate,
            training: true,
            rng,
        }
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Applies dropout elementwise. Identity when evaluating or rate is 0.
    pub fn forward<D: Dimension>(&mut self, input: &Array<f32, D>) -> Array<f32, D> {
        if !self.training || self.rate == 0.0 {
            return input.clone();
        }

        let rate = self.rate;
        let keep = 1.0 - rate;
        let rng = &mut self.rng;
        input.mapv(|x| {
            if rng.random::<f32>() < rate {
                0.0
            } else {
                x / keep
            }
        })
    }
}
