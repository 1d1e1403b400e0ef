use super::clamp_probabilities;
use crate::numeric::Scalar;

/// Cross-entropy summed over independent output units.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// L = −Σ [t·ln o + (1 − t)·ln(1 − o)]
    pub fn loss<B: Scalar>(output: &[B], target: &[B]) -> B {
        let o = clamp_probabilities(output);
        o.iter()
            .zip(target.iter())
            .fold(B::zero(), |acc, (&o, &t)| acc + unit_loss(o, t))
    }

    /// ∂L/∂o = (o − t) / (o·(1 − o))
    pub fn derivative<B: Scalar>(output: &[B], target: &[B]) -> Vec<B> {
        clamp_probabilities(output)
            .iter()
            .zip(target.iter())
            .map(|(&o, &t)| unit_gradient(o, t))
            .collect()
    }
}

/// Cross-entropy of one output unit; `o` must already be clamped.
pub(crate) fn unit_loss<B: Scalar>(o: B, t: B) -> B {
    -(t * o.ln() + (B::one() - t) * (B::one() - o).ln())
}

pub(crate) fn unit_gradient<B: Scalar>(o: B, t: B) -> B {
    (o - t) / (o * (B::one() - o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturated_outputs_stay_finite() {
        let l: f64 = CrossEntropyLoss::loss(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(l.is_finite());
        for g in CrossEntropyLoss::derivative(&[0.0f64, 1.0], &[1.0, 0.0]) {
            assert!(g.is_finite());
        }
    }

    #[test]
    fn perfect_prediction_has_small_loss() {
        let l: f64 = CrossEntropyLoss::loss(&[0.999, 0.001], &[1.0, 0.0]);
        assert!(l < 0.01);
    }
}
