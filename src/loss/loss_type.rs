use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{BceLoss, CrossEntropyLoss, MseLoss};
use crate::error::{CnnError, Result};
use crate::math::Tensor;
use crate::numeric::{cast, NumericPolicy};

/// Selects which loss function the training loop uses.
///
/// - `MeanSquaredError`   — pair with Identity or Sigmoid output.
/// - `CrossEntropy`       — summed per-unit cross-entropy; pair with Sigmoid
///   or Softmax output.
/// - `BinaryCrossEntropy` — the same, averaged over the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    MeanSquaredError,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl Default for LossType {
    fn default() -> Self {
        LossType::MeanSquaredError
    }
}

impl LossType {
    /// Scalar loss of `output` against `target`, in backward precision.
    pub fn compute<P: NumericPolicy>(
        &self,
        output: &Tensor<P::Forward>,
        target: &[P::Forward],
    ) -> Result<P::Backward> {
        let (o, t) = widen::<P>(output, target)?;
        Ok(match self {
            LossType::MeanSquaredError => MseLoss::loss(&o, &t),
            LossType::CrossEntropy => CrossEntropyLoss::loss(&o, &t),
            LossType::BinaryCrossEntropy => BceLoss::loss(&o, &t),
        })
    }

    /// ∂L/∂output, shaped like `output`.
    pub fn gradient<P: NumericPolicy>(
        &self,
        output: &Tensor<P::Forward>,
        target: &[P::Forward],
    ) -> Result<Tensor<P::Backward>> {
        let (o, t) = widen::<P>(output, target)?;
        let grad = match self {
            LossType::MeanSquaredError => MseLoss::derivative(&o, &t),
            LossType::CrossEntropy => CrossEntropyLoss::derivative(&o, &t),
            LossType::BinaryCrossEntropy => BceLoss::derivative(&o, &t),
        };
        Tensor::from_vec(output.dims(), grad)
    }
}

fn widen<P: NumericPolicy>(
    output: &Tensor<P::Forward>,
    target: &[P::Forward],
) -> Result<(Vec<P::Backward>, Vec<P::Backward>)> {
    if output.len() != target.len() {
        return Err(CnnError::Data(format!(
            "target has {} values but the network produces {}",
            target.len(),
            output.len()
        )));
    }
    Ok((
        output.data().iter().map(|&v| cast(v)).collect(),
        target.iter().map(|&v| cast(v)).collect(),
    ))
}

impl FromStr for LossType {
    type Err = CnnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mse" | "mean_squared_error" => Ok(LossType::MeanSquaredError),
            "ce" | "cross_entropy" => Ok(LossType::CrossEntropy),
            "cebin" | "binary_cross_entropy" => Ok(LossType::BinaryCrossEntropy),
            other => Err(CnnError::Configuration(format!(
                "unknown loss function '{}' (expected MSE|CE|CEbin)",
                other
            ))),
        }
    }
}

impl fmt::Display for LossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LossType::MeanSquaredError => "MSE",
            LossType::CrossEntropy => "CE",
            LossType::BinaryCrossEntropy => "CEbin",
        };
        f.write_str(name)
    }
}
