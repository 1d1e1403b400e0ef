//! Labelled samples the network trains and validates on.

use num_traits::{One, Zero};

use crate::error::{CnnError, Result};
use crate::math::Tensor;
use crate::numeric::NumericPolicy;

/// One labelled example: an input tensor and the expected flat output.
#[derive(Debug, Clone)]
pub struct Sample<P: NumericPolicy> {
    pub input: Tensor<P::Forward>,
    pub target: Vec<P::Forward>,
}

pub type Dataset<P> = Vec<Sample<P>>;

impl<P: NumericPolicy> Sample<P> {
    pub fn new(input: Tensor<P::Forward>, target: Vec<P::Forward>) -> Sample<P> {
        Sample { input, target }
    }

    /// Sample whose target is the one-hot encoding of `label` over `classes`.
    pub fn one_hot(input: Tensor<P::Forward>, label: usize, classes: usize) -> Result<Sample<P>> {
        if label >= classes {
            return Err(CnnError::Data(format!(
                "label {} out of range for {} outputs",
                label, classes
            )));
        }
        let mut target = vec![P::Forward::zero(); classes];
        target[label] = P::Forward::one();
        Ok(Sample { input, target })
    }
}
