use super::clamp_probabilities;
use super::cross_entropy::{unit_gradient, unit_loss};
use crate::numeric::Scalar;

/// Cross-entropy averaged over the outputs, each one an independent binary
/// decision.
pub struct BceLoss;

impl BceLoss {
    /// L = −Σ [t·ln o + (1 − t)·ln(1 − o)] / n
    pub fn loss<B: Scalar>(output: &[B], target: &[B]) -> B {
        let n = B::from_f64_lossy(output.len() as f64);
        clamp_probabilities(output)
            .iter()
            .zip(target.iter())
            .fold(B::zero(), |acc, (&o, &t)| acc + unit_loss(o, t))
            / n
    }

    /// ∂L/∂o = (o − t) / (o·(1 − o)) / n
    pub fn derivative<B: Scalar>(output: &[B], target: &[B]) -> Vec<B> {
        let n = B::from_f64_lossy(output.len() as f64);
        clamp_probabilities(output)
            .iter()
            .zip(target.iter())
            .map(|(&o, &t)| unit_gradient(o, t) / n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::CrossEntropyLoss;

    #[test]
    fn averages_cross_entropy() {
        let o = [0.3f64, 0.8, 0.5];
        let t = [0.0, 1.0, 1.0];
        let ce = CrossEntropyLoss::loss(&o, &t);
        assert!((BceLoss::loss(&o, &t) - ce / 3.0).abs() < 1e-12);
        let g = BceLoss::derivative(&o, &t);
        let g_ce = CrossEntropyLoss::derivative(&o, &t);
        for (a, b) in g.iter().zip(g_ce.iter()) {
            assert!((a - b / 3.0).abs() < 1e-12);
        }
    }
}
