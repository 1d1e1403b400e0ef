//! Adam optimizer.

use std::collections::HashMap;
use std::marker::PhantomData;

use num_traits::{Float, One};

use super::state::StateSlots;
use super::{impl_hyperparameters, Hyperparameters, Optimizer};
use crate::layers::weights::WeightId;
use crate::numeric::{NumericPolicy, Scalar};

/// Adam optimizer (Adaptive Moment Estimation).
#[derive(Debug, Clone)]
pub struct Adam<P: NumericPolicy> {
    pub hyper: Hyperparameters,
    /// Exponential decay rate for the first moment.
    pub beta1: f64,
    /// Exponential decay rate for the second moment.
    pub beta2: f64,
    /// Small constant for numerical stability.
    pub eps: f64,
    m: StateSlots<P::Weight>,
    v: StateSlots<P::Weight>,
    /// Update count per weight buffer, used for bias correction.
    steps: HashMap<WeightId, i32>,
    _policy: PhantomData<P>,
}

impl<P: NumericPolicy> Adam<P> {
    pub fn new(learning_rate: f64) -> Adam<P> {
        Adam::with_params(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_params(learning_rate: f64, beta1: f64, beta2: f64, eps: f64) -> Adam<P> {
        Adam {
            hyper: Hyperparameters::with_learning_rate(learning_rate),
            beta1,
            beta2,
            eps,
            m: StateSlots::new(),
            v: StateSlots::new(),
            steps: HashMap::new(),
            _policy: PhantomData,
        }
    }

    pub fn first_moment(&self, id: WeightId) -> Option<&[P::Weight]> {
        self.m.get(id)
    }

    pub fn second_moment(&self, id: WeightId) -> Option<&[P::Weight]> {
        self.v.get(id)
    }
}

impl<P: NumericPolicy> Default for Adam<P> {
    fn default() -> Self {
        Adam::new(Hyperparameters::default().learning_rate)
    }
}

impl<P: NumericPolicy> Optimizer<P> for Adam<P> {
    fn name(&self) -> &'static str {
        "adam"
    }

    impl_hyperparameters!();

    fn update(&mut self, id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]) {
        let step = self.steps.entry(id).or_insert(0);
        *step += 1;
        let t = *step;

        let lr = self.hyper.rate::<P::Weight>();
        let beta1 = P::Weight::from_f64_lossy(self.beta1);
        let beta2 = P::Weight::from_f64_lossy(self.beta2);
        let eps = P::Weight::from_f64_lossy(self.eps);
        let one = P::Weight::one();
        let bias_correction1 = one - beta1.powi(t);
        let bias_correction2 = one - beta2.powi(t);

        let g = self.hyper.decayed::<P>(weights, gradient);
        let m = self.m.slot(id, weights.len());
        let v = self.v.slot(id, weights.len());

        for i in 0..weights.len() {
            m[i] = beta1 * m[i] + (one - beta1) * g[i];
            v[i] = beta2 * v[i] + (one - beta2) * g[i] * g[i];

            let m_hat = m[i] / bias_correction1;
            let v_hat = v[i] / bias_correction2;

            weights[i] = weights[i] - lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DoublePrecision;

    #[test]
    fn first_step_is_learning_rate_sized() {
        // With bias correction the first step is lr * sign(g).
        let mut w = vec![1.0, 2.0];
        let mut opt = Adam::<DoublePrecision>::new(0.1);
        opt.update(WeightId(0), &mut w, &[0.1, -0.2]);
        assert!((w[0] - 0.9).abs() < 1e-6);
        assert!((w[1] - 2.1).abs() < 1e-6);
    }

    #[test]
    fn converges_towards_minimum() {
        // minimise x^2, optimum at 0
        let mut w = vec![10.0];
        let mut opt = Adam::<DoublePrecision>::new(0.5);
        for _ in 0..10 {
            let previous = w[0];
            let grad = [2.0 * w[0]];
            opt.update(WeightId(0), &mut w, &grad);
            assert!(w[0] < previous && w[0] > 0.0);
        }
        // steps stay close to lr while the gradient keeps its sign
        assert!(w[0] < 5.5);
    }

    #[test]
    fn moments_are_isolated_per_weight() {
        let mut a = vec![1.0];
        let mut b = vec![1.0];
        let mut opt = Adam::<DoublePrecision>::new(0.1);
        opt.update(WeightId(3), &mut a, &[1.0]);
        let m = opt.first_moment(WeightId(3)).unwrap().to_vec();
        let v = opt.second_moment(WeightId(3)).unwrap().to_vec();
        opt.update(WeightId(4), &mut b, &[-7.0]);
        assert_eq!(opt.first_moment(WeightId(3)).unwrap(), m.as_slice());
        assert_eq!(opt.second_moment(WeightId(3)).unwrap(), v.as_slice());
    }
}
