use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::PI;

use crate::numeric::Scalar;

/// How a freshly constructed weight buffer is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initializer {
    /// N(0, sqrt(2 / fan_in)); recommended before ReLU-like activations.
    He,
    /// N(0, sqrt(1 / fan_in)); recommended before sigmoid, tanh and identity.
    Xavier,
    Zeros,
}

impl Initializer {
    pub fn fill<T: Scalar>(&self, values: &mut [T], fan_in: usize, rng: &mut StdRng) {
        let std_dev = match self {
            Initializer::He => (2.0 / fan_in.max(1) as f64).sqrt(),
            Initializer::Xavier => (1.0 / fan_in.max(1) as f64).sqrt(),
            Initializer::Zeros => {
                values.iter_mut().for_each(|v| *v = T::zero());
                return;
            }
        };
        for v in values.iter_mut() {
            *v = T::from_f64_lossy(sample_standard_normal(rng) * std_dev);
        }
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    // Both uniforms lie in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn same_seed_same_values() {
        let mut a = vec![0.0f64; 16];
        let mut b = vec![0.0f64; 16];
        Initializer::He.fill(&mut a, 4, &mut StdRng::seed_from_u64(7));
        Initializer::He.fill(&mut b, 4, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn zeros_clears_buffer() {
        let mut a = vec![1.0f32; 4];
        Initializer::Zeros.fill(&mut a, 4, &mut StdRng::seed_from_u64(0));
        assert!(a.iter().all(|&v| v == 0.0));
    }
}
