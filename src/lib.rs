//! Convolutional neural networks whose activations, gradients and weights
//! each use an independently chosen scalar type.

pub mod activation;
pub mod cli;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod numeric;
pub mod optim;
pub mod parsers;
pub mod persistence;
pub mod train;

// Convenience re-exports
pub use activation::ActivationFunction;
pub use data::{Dataset, Sample};
pub use error::{CnnError, Result};
pub use layers::Layer;
pub use loss::LossType;
pub use math::{Dimensions, Tensor};
pub use network::{LayerSpec, Network, NetworkSpec};
pub use numeric::{DefaultPolicy, DoublePrecision, Mixed, NumericPolicy, SinglePrecision};
pub use optim::{Optimizer, OptimizerType};
pub use persistence::{dump_network, load_network};
pub use train::{EpochReport, KeepBest, TrainingSettings, ValidationReport};
