//! Scalar types and the numeric policy that selects them.
//!
//! A network is parameterised by a [`NumericPolicy`], which names three
//! independent scalar types: one for forward activations, one for backward
//! gradients and one for stored weights. Values cross between them only
//! through [`cast`].

pub mod policy;

pub use policy::{DefaultPolicy, DoublePrecision, Mixed, NumericPolicy, SinglePrecision};

use std::fmt::{Debug, Display};

use num_traits::{Float, FromPrimitive, ToPrimitive};

/// A scalar usable anywhere in the engine.
pub trait Scalar:
    Float + FromPrimitive + ToPrimitive + Default + Debug + Display + Send + Sync + 'static
{
    /// Short type name shown by `--type-info`.
    const NAME: &'static str;

    fn from_f64_lossy(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::zero)
    }

    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }
}

impl Scalar for f32 {
    const NAME: &'static str = "f32";
}

impl Scalar for f64 {
    const NAME: &'static str = "f64";
}

/// Converts between two scalar representations, rounding as the target does.
#[inline]
pub fn cast<A: Scalar, B: Scalar>(value: A) -> B {
    B::from_f64_lossy(value.to_f64_lossy())
}

/// Range and precision of a scalar type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub epsilon: f64,
}

pub fn type_info<T: Scalar>() -> TypeInfo {
    TypeInfo {
        name: T::NAME,
        min: T::min_value().to_f64_lossy(),
        max: T::max_value().to_f64_lossy(),
        epsilon: T::epsilon().to_f64_lossy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_between_precisions() {
        let x: f64 = 0.1;
        let y: f32 = cast(x);
        assert_eq!(y, 0.1f32);
        let back: f64 = cast(y);
        assert!((back - 0.1).abs() < 1e-7);
    }

    #[test]
    fn type_info_reports_limits() {
        let info = type_info::<f32>();
        assert_eq!(info.name, "f32");
        assert_eq!(info.max, f32::MAX as f64);
        assert_eq!(info.min, f32::MIN as f64);
        assert_eq!(info.epsilon, f32::EPSILON as f64);
    }
}
