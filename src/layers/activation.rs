use num_traits::Zero;

use crate::activation::{softmax, ActivationFunction};
use crate::error::Result;
use crate::layers::{check_input, check_output_gradient, missing_cache};
use crate::math::{Dimensions, Tensor};
use crate::numeric::{cast, NumericPolicy};

/// Applies an activation function; shape is preserved.
#[derive(Debug, Clone)]
pub struct ActivationLayer<P: NumericPolicy> {
    function: ActivationFunction,
    dims: Dimensions,
    cache: Option<ActivationCache<P>>,
}

#[derive(Debug, Clone)]
enum ActivationCache<P: NumericPolicy> {
    /// Pre-activation values, for element-wise derivatives.
    Input(Tensor<P::Forward>),
    /// Softmax probabilities, for the Jacobian-vector product.
    Output(Tensor<P::Forward>),
}

impl<P: NumericPolicy> ActivationLayer<P> {
    pub fn new(dims: Dimensions, function: ActivationFunction) -> Result<ActivationLayer<P>> {
        dims.validate()?;
        Ok(ActivationLayer {
            function,
            dims,
            cache: None,
        })
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn compute(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        check_input("activation", self.dims, input)?;
        if self.function.is_elementwise() {
            Ok(input.map(|x| self.function.function(x)))
        } else {
            Tensor::from_vec(self.dims, softmax(input.data()))
        }
    }

    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let output = self.compute(input)?;
        self.cache = Some(if self.function.is_elementwise() {
            ActivationCache::Input(input.clone())
        } else {
            ActivationCache::Output(output.clone())
        });
        Ok(output)
    }

    pub fn backward(&mut self, output_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        check_output_gradient("activation", self.dims, output_gradient)?;
        let cache = self.cache.take().ok_or_else(|| missing_cache("activation"))?;
        let g = output_gradient.data();
        let input_gradient: Vec<P::Backward> = match cache {
            ActivationCache::Input(z) => z
                .data()
                .iter()
                .zip(g.iter())
                .map(|(&z, &g)| g * cast::<_, P::Backward>(self.function.derivative(z)))
                .collect(),
            // dL/dz_i = s_i (g_i - Σ_j g_j s_j)
            ActivationCache::Output(s) => {
                let s: Vec<P::Backward> = s.data().iter().map(|&v| cast(v)).collect();
                let dot = s
                    .iter()
                    .zip(g.iter())
                    .fold(P::Backward::zero(), |acc, (&si, &gi)| acc + si * gi);
                s.iter().zip(g.iter()).map(|(&si, &gi)| si * (gi - dot)).collect()
            }
        };
        Tensor::from_vec(self.dims, input_gradient)
    }
}
