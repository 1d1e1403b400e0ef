use std::marker::PhantomData;

use num_traits::One;

use super::momentum::DEFAULT_MOMENTUM;
use super::state::StateSlots;
use super::{impl_hyperparameters, Hyperparameters, Optimizer};
use crate::layers::weights::WeightId;
use crate::numeric::{NumericPolicy, Scalar};

/// SGD with Nesterov momentum.
///
/// Stores the velocity and applies the look-ahead correction directly to the
/// weights, so the gradient passed in is effectively taken at the shifted
/// position: `v ← μ·v − lr·g'`, `w ← w − μ·v_prev + (1 + μ)·v`.
#[derive(Debug, Clone)]
pub struct Nesterov<P: NumericPolicy> {
    pub hyper: Hyperparameters,
    pub momentum: f64,
    velocities: StateSlots<P::Weight>,
    _policy: PhantomData<P>,
}

impl<P: NumericPolicy> Nesterov<P> {
    pub fn new(learning_rate: f64, momentum: f64) -> Nesterov<P> {
        Nesterov {
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

impl<P: NumericPolicy> Default for Nesterov<P> {
    fn default() -> Self {
        Nesterov::new(Hyperparameters::default().learning_rate, DEFAULT_MOMENTUM)
    }
}

impl<P: NumericPolicy> Optimizer<P> for Nesterov<P> {
    fn name(&self) -> &'static str {
        "sgdn"
    }

    impl_hyperparameters!();

    fn update(&mut self, id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]) {
        let lr = self.hyper.rate::<P::Weight>();
        let mu = P::Weight::from_f64_lossy(self.momentum);
        let g = self.hyper.decayed::<P>(weights, gradient);
        let velocity = self.velocities.slot(id, weights.len());
        for ((w, v), g) in weights.iter_mut().zip(velocity.iter_mut()).zip(g) {
            let previous = *v;
            *v = mu * *v - lr * g;
            *w = *w - mu * previous + (P::Weight::one() + mu) * *v;
        }
    }
}
