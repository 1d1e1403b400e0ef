use std::marker::PhantomData;

use super::{impl_hyperparameters, Hyperparameters, Optimizer};
use crate::layers::weights::WeightId;
use crate::numeric::NumericPolicy;

/// Plain stochastic gradient descent: `w ← w − lr·g'`.
#[derive(Debug, Clone)]
pub struct Sgd<P> {
    pub hyper: Hyperparameters,
    _policy: PhantomData<P>,
}

impl<P: NumericPolicy> Sgd<P> {
    pub fn new(learning_rate: f64) -> Sgd<P> {
        Sgd {
            hyper: Hyperparameters::with_learning_rate(learning_rate),
            _policy: PhantomData,
        }
    }
}

impl<P: NumericPolicy> Default for Sgd<P> {
    fn default() -> Self {
        Sgd {
            hyper: Hyperparameters::default(),
            _policy: PhantomData,
        }
    }
}

impl<P: NumericPolicy> Optimizer<P> for Sgd<P> {
    fn name(&self) -> &'static str {
        "sgd"
    }

    impl_hyperparameters!();

    fn update(&mut self, _id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]) {
        let lr = self.hyper.rate::<P::Weight>();
        let g = self.hyper.decayed::<P>(weights, gradient);
        for (w, g) in weights.iter_mut().zip(g) {
            *w = *w - lr * g;
        }
    }
}
