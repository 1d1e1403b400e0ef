use crate::numeric::Scalar;

pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: ½·Σ(o − t)²
    pub fn loss<B: Scalar>(output: &[B], target: &[B]) -> B {
        let half = B::from_f64_lossy(0.5);
        output
            .iter()
            .zip(target.iter())
            .fold(B::zero(), |acc, (&o, &t)| acc + half * (o - t) * (o - t))
    }

    /// Per-output gradient: o − t
    pub fn derivative<B: Scalar>(output: &[B], target: &[B]) -> Vec<B> {
        output.iter().zip(target.iter()).map(|(&o, &t)| o - t).collect()
    }
}
