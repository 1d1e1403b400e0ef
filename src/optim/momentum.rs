use std::marker::PhantomData;

use super::state::StateSlots;
use super::{impl_hyperparameters, Hyperparameters, Optimizer};
use crate::layers::weights::WeightId;
use crate::numeric::{NumericPolicy, Scalar};

pub const DEFAULT_MOMENTUM: f64 = 0.9;

/// SGD with classical momentum.
///
/// `v ← μ·v − lr·g'`, then `w ← w + v`.
#[derive(Debug, Clone)]
pub struct Momentum<P: NumericPolicy> {
    pub hyper: Hyperparameters,
    pub momentum: f64,
    velocities: StateSlots<P::Weight>,
    _policy: PhantomData<P>,
}

impl<P: NumericPolicy> Momentum<P> {
    pub fn new(learning_rate: f64, momentum: f64) -> Momentum<P> {
        Momentum {
            hyper: Hyperparameters::with_learning_rate(learning_rate),
            momentum,
            velocities: StateSlots::new(),
            _policy: PhantomData,
        }
    }

    pub fn velocity(&self, id: WeightId) -> Option<&[P::Weight]> {
        self.velocities.get(id)
    }
}

impl<P: NumericPolicy> Default for Momentum<P> {
    fn default() -> Self {
        Momentum::new(Hyperparameters::default().learning_rate, DEFAULT_MOMENTUM)
    }
}

impl<P: NumericPolicy> Optimizer<P> for Momentum<P> {
    fn name(&self) -> &'static str {
        "sgdm"
    }

    impl_hyperparameters!();

    fn update(&mut self, id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]) {
        let lr = self.hyper.rate::<P::Weight>();
        let mu = P::Weight::from_f64_lossy(self.momentum);
        let g = self.hyper.decayed::<P>(weights, gradient);
        let velocity = self.velocities.slot(id, weights.len());
        for ((w, v), g) in weights.iter_mut().zip(velocity.iter_mut()).zip(g) {
            *v = mu * *v - lr * g;
            *w = *w + *v;
        }
    }
}
