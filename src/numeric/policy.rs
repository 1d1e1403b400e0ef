use std::fmt::Debug;

use super::{type_info, Scalar, TypeInfo};

/// Selects the scalar used for each of the three numeric roles.
pub trait NumericPolicy: Debug + Clone + Copy + Send + Sync + 'static {
    /// Activations and raw input data.
    type Forward: Scalar;
    /// Gradients flowing backwards through the chain.
    type Backward: Scalar;
    /// Stored, trainable parameters.
    type Weight: Scalar;

    fn describe() -> [(&'static str, TypeInfo); 3] {
        [
            ("ForwardType", type_info::<Self::Forward>()),
            ("BackwardType", type_info::<Self::Backward>()),
            ("WeightType", type_info::<Self::Weight>()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePrecision;

impl NumericPolicy for SinglePrecision {
    type Forward = f32;
    type Backward = f32;
    type Weight = f32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DoublePrecision;

impl NumericPolicy for DoublePrecision {
    type Forward = f64;
    type Backward = f64;
    type Weight = f64;
}

/// Single precision activations with double precision gradients and weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mixed;

impl NumericPolicy for Mixed {
    type Forward = f32;
    type Backward = f64;
    type Weight = f64;
}

/// Policy the command-line front end is built with.
pub type DefaultPolicy = SinglePrecision;
