use std::marker::PhantomData;

use num_traits::Float;

use super::state::StateSlots;
use super::{impl_hyperparameters, Hyperparameters, Optimizer};
use crate::layers::weights::WeightId;
use crate::numeric::{NumericPolicy, Scalar};

/// Adagrad: per-weight learning rates shrinking with the accumulated squared
/// gradient. `G ← G + g'²`, `w ← w − lr·g' / (√G + ε)`.
#[derive(Debug, Clone)]
pub struct Adagrad<P: NumericPolicy> {
    pub hyper: Hyperparameters,
    pub eps: f64,
    accumulators: StateSlots<P::Weight>,
    _policy: PhantomData<P>,
}

impl<P: NumericPolicy> Adagrad<P> {
    pub fn new(learning_rate: f64) -> Adagrad<P> {
        Adagrad {
            hyper: Hyperparameters::with_learning_rate(learning_rate),
            eps: 1e-8,
            accumulators: StateSlots::new(),
            _policy: PhantomData,
        }
    }

    pub fn accumulator(&self, id: WeightId) -> Option<&[P::Weight]> {
        self.accumulators.get(id)
    }
}

impl<P: NumericPolicy> Default for Adagrad<P> {
    fn default() -> Self {
        Adagrad::new(Hyperparameters::default().learning_rate)
    }
}

impl<P: NumericPolicy> Optimizer<P> for Adagrad<P> {
    fn name(&self) -> &'static str {
        "adagrad"
    }

    impl_hyperparameters!();

    fn update(&mut self, id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]) {
        let lr = self.hyper.rate::<P::Weight>();
        let eps = P::Weight::from_f64_lossy(self.eps);
        let g = self.hyper.decayed::<P>(weights, gradient);
        let sum = self.accumulators.slot(id, weights.len());
        for ((w, s), g) in weights.iter_mut().zip(sum.iter_mut()).zip(g) {
            *s = *s + g * g;
            *w = *w - lr * g / (s.sqrt() + eps);
        }
    }
}
