use num_traits::Zero;
use rand::rngs::StdRng;

use crate::error::{CnnError, Result};
use crate::layers::weights::{WeightArena, WeightBuffer};
use crate::layers::{check_input, check_output_gradient, missing_cache};
use crate::math::{Dimensions, Initializer, Tensor};
use crate::numeric::{cast, NumericPolicy, Scalar};

/// Fully-connected layer: every output is a weighted sum of every input.
///
/// Inputs of any shape are flattened; the output shape is `outputs × 1 × 1`.
/// Weights are stored row-major, one row of `inputs` values per output.
#[derive(Debug, Clone)]
pub struct DenseLayer<P: NumericPolicy> {
    input_dims: Dimensions,
    output_dims: Dimensions,
    pub weights: WeightBuffer<P>,
    pub biases: WeightBuffer<P>,
    cache: Option<Tensor<P::Forward>>,
}

impl<P: NumericPolicy> DenseLayer<P> {
    pub fn new(input_dims: Dimensions, outputs: usize, arena: &mut WeightArena) -> Result<DenseLayer<P>> {
        input_dims.validate()?;
        if outputs == 0 {
            return Err(CnnError::Configuration(
                "fully-connected layer needs at least one output".into(),
            ));
        }
        let inputs = input_dims.size();
        Ok(DenseLayer {
            input_dims,
            output_dims: Dimensions::flat(outputs)?,
            weights: WeightBuffer::new(arena.allocate(), outputs * inputs),
            biases: WeightBuffer::new(arena.allocate(), outputs),
            cache: None,
        })
    }

    pub fn inputs(&self) -> usize {
        self.input_dims.size()
    }

    pub fn outputs(&self) -> usize {
        self.output_dims.size()
    }

    pub fn input_dims(&self) -> Dimensions {
        self.input_dims
    }

    pub fn output_dims(&self) -> Dimensions {
        self.output_dims
    }

    pub fn initialize(&mut self, init: Initializer, rng: &mut StdRng) {
        let fan_in = self.inputs();
        init.fill(self.weights.values_mut(), fan_in, rng);
        Initializer::Zeros.fill(self.biases.values_mut(), fan_in, rng);
    }

    /// z = W·x + b
    pub fn compute(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        check_input("fully-connected", self.input_dims, input)?;
        let n = self.inputs();
        let x = input.data();
        let w = self.weights.values();
        let b = self.biases.values();
        let out = (0..self.outputs())
            .map(|o| {
                w[o * n..(o + 1) * n]
                    .iter()
                    .zip(x.iter())
                    .fold(cast::<_, P::Forward>(b[o]), |acc, (&wi, &xi)| {
                        acc + cast::<_, P::Forward>(wi) * xi
                    })
            })
            .collect();
        Tensor::from_vec(self.output_dims, out)
    }

    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let out = self.compute(input)?;
        self.cache = Some(input.clone());
        Ok(out)
    }

    /// Accumulates ∂L/∂W = δ·xᵀ and ∂L/∂b = δ, returns ∂L/∂x = Wᵀ·δ.
    pub fn backward(&mut self, output_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        check_output_gradient("fully-connected", self.output_dims, output_gradient)?;
        let input = self.cache.take().ok_or_else(|| missing_cache("fully-connected"))?;
        let n = self.inputs();
        let delta = output_gradient.data();
        let x: Vec<P::Backward> = input.data().iter().map(|&v| cast(v)).collect();

        {
            let w_grad = self.weights.gradient_mut();
            for (o, &d) in delta.iter().enumerate() {
                for (g, &xi) in w_grad[o * n..(o + 1) * n].iter_mut().zip(x.iter()) {
                    *g = *g + d * xi;
                }
            }
        }
        for (g, &d) in self.biases.gradient_mut().iter_mut().zip(delta.iter()) {
            *g = *g + d;
        }
        self.weights.count_sample();
        self.biases.count_sample();

        let w = self.weights.values();
        let mut input_gradient = vec![P::Backward::zero(); n];
        for (o, &d) in delta.iter().enumerate() {
            for (gi, &wi) in input_gradient.iter_mut().zip(w[o * n..(o + 1) * n].iter()) {
                *gi = *gi + cast::<_, P::Backward>(wi) * d;
            }
        }
        Tensor::from_vec(self.input_dims, input_gradient)
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache = None;
    }
}
