pub mod bce;
pub mod cross_entropy;
pub mod loss_type;
pub mod mse;

pub use bce::BceLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;
pub use mse::MseLoss;

use tracing::warn;

use crate::numeric::Scalar;

/// Lower bound outputs are clamped to before `ln` or division.
pub const PROBABILITY_EPSILON: f64 = 1e-7;

/// Clamps outputs into `[ε, 1 − ε]`, warning once if anything moved.
pub(crate) fn clamp_probabilities<B: Scalar>(output: &[B]) -> Vec<B> {
    let lo = B::from_f64_lossy(PROBABILITY_EPSILON);
    let hi = B::one() - lo;
    let mut clamped = 0usize;
    let values = output
        .iter()
        .map(|&o| {
            let c = o.max(lo).min(hi);
            if c != o {
                clamped += 1;
            }
            c
        })
        .collect();
    if clamped > 0 {
        warn!(clamped, "cross-entropy output outside (0, 1); clamped to [{:e}, 1 - {:e}]", PROBABILITY_EPSILON, PROBABILITY_EPSILON);
    }
    values
}
