//! Weight update rules.
//!
//! Every optimizer applies L2 weight decay to the raw gradient first
//! (`g' = g + decay * w`) and then its own rule. Per-weight state is keyed by
//! [`WeightId`] and created on the first update of that id.

pub mod adagrad;
pub mod adam;
pub mod momentum;
pub mod nesterov;
pub mod sgd;
pub mod state;

pub use adagrad::Adagrad;
pub use adam::Adam;
pub use momentum::Momentum;
pub use nesterov::Nesterov;
pub use sgd::Sgd;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CnnError;
use crate::layers::weights::WeightId;
use crate::numeric::{cast, NumericPolicy, Scalar};

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

pub trait Optimizer<P: NumericPolicy> {
    fn name(&self) -> &'static str;

    fn learning_rate(&self) -> f64;
    fn set_learning_rate(&mut self, learning_rate: f64);

    fn weight_decay(&self) -> f64;
    fn set_weight_decay(&mut self, weight_decay: f64);

    /// Updates `weights` in place from `gradient`, both indexed identically.
    fn update(&mut self, id: WeightId, weights: &mut [P::Weight], gradient: &[P::Backward]);
}

/// Learning rate and weight decay shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub weight_decay: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            learning_rate: DEFAULT_LEARNING_RATE,
            weight_decay: 0.0,
        }
    }
}

impl Hyperparameters {
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Hyperparameters {
            learning_rate,
            ..Hyperparameters::default()
        }
    }

    /// Gradient in weight precision with L2 decay folded in.
    pub(crate) fn decayed<P: NumericPolicy>(
        &self,
        weights: &[P::Weight],
        gradient: &[P::Backward],
    ) -> Vec<P::Weight> {
        let decay = P::Weight::from_f64_lossy(self.weight_decay);
        weights
            .iter()
            .zip(gradient.iter())
            .map(|(&w, &g)| cast::<_, P::Weight>(g) + decay * w)
            .collect()
    }

    pub(crate) fn rate<T: Scalar>(&self) -> T {
        T::from_f64_lossy(self.learning_rate)
    }
}

macro_rules! impl_hyperparameters {
    () => {
        fn learning_rate(&self) -> f64 {
            self.hyper.learning_rate
        }

        fn set_learning_rate(&mut self, learning_rate: f64) {
            self.hyper.learning_rate = learning_rate;
        }

        fn weight_decay(&self) -> f64 {
            self.hyper.weight_decay
        }

        fn set_weight_decay(&mut self, weight_decay: f64) {
            self.hyper.weight_decay = weight_decay;
        }
    };
}
pub(crate) use impl_hyperparameters;

/// Names the optimizer variants selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerType {
    Sgd,
    Momentum,
    Nesterov,
    Adam,
    Adagrad,
}

impl OptimizerType {
    pub fn build<P: NumericPolicy>(&self) -> Box<dyn Optimizer<P>> {
        match self {
            OptimizerType::Sgd => Box::new(Sgd::<P>::default()),
            OptimizerType::Momentum => Box::new(Momentum::<P>::default()),
            OptimizerType::Nesterov => Box::new(Nesterov::<P>::default()),
            OptimizerType::Adam => Box::new(Adam::<P>::default()),
            OptimizerType::Adagrad => Box::new(Adagrad::<P>::default()),
        }
    }
}

impl FromStr for OptimizerType {
    type Err = CnnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(OptimizerType::Sgd),
            "sgdm" | "momentum" => Ok(OptimizerType::Momentum),
            "sgdn" | "nesterov" => Ok(OptimizerType::Nesterov),
            "adam" => Ok(OptimizerType::Adam),
            "adagrad" => Ok(OptimizerType::Adagrad),
            other => Err(CnnError::Configuration(format!(
                "unknown optimizer '{}' (expected sgd|sgdm|sgdn|adam|adagrad)",
                other
            ))),
        }
    }
}

impl fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerType::Sgd => "sgd",
            OptimizerType::Momentum => "sgdm",
            OptimizerType::Nesterov => "sgdn",
            OptimizerType::Adam => "adam",
            OptimizerType::Adagrad => "adagrad",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DoublePrecision;

    #[test]
    fn parses_command_line_names() {
        assert_eq!("sgd".parse::<OptimizerType>().unwrap(), OptimizerType::Sgd);
        assert_eq!("SGDM".parse::<OptimizerType>().unwrap(), OptimizerType::Momentum);
        assert_eq!("sgdn".parse::<OptimizerType>().unwrap(), OptimizerType::Nesterov);
        assert_eq!("adam".parse::<OptimizerType>().unwrap(), OptimizerType::Adam);
        assert_eq!("adagrad".parse::<OptimizerType>().unwrap(), OptimizerType::Adagrad);
        assert!(matches!(
            "rmsprop".parse::<OptimizerType>(),
            Err(CnnError::Configuration(_))
        ));
    }

    #[test]
    fn built_optimizers_expose_hyperparameters() {
        for kind in [
            OptimizerType::Sgd,
            OptimizerType::Momentum,
            OptimizerType::Nesterov,
            OptimizerType::Adam,
            OptimizerType::Adagrad,
        ] {
            let mut opt = kind.build::<DoublePrecision>();
            assert_eq!(opt.learning_rate(), DEFAULT_LEARNING_RATE);
            assert_eq!(opt.weight_decay(), 0.0);
            opt.set_learning_rate(0.5);
            opt.set_weight_decay(0.1);
            assert_eq!(opt.learning_rate(), 0.5);
            assert_eq!(opt.weight_decay(), 0.1);
        }
    }

    #[test]
    fn weight_decay_is_added_to_gradient() {
        let hyper = Hyperparameters {
            learning_rate: 1.0,
            weight_decay: 0.5,
        };
        let g = hyper.decayed::<DoublePrecision>(&[2.0, -4.0], &[1.0, 1.0]);
        assert_eq!(g, vec![2.0, -1.0]);
    }
}
