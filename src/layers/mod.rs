//! The closed set of layer kinds a network is built from.
//!
//! Every layer follows the same contract: `compute` is a pure forward pass,
//! `forward` additionally caches what `backward` needs, and `backward`
//! consumes that cache, accumulates weight gradients and returns the gradient
//! with respect to its input.

pub mod activation;
pub mod convolution;
pub mod dense;
pub mod pooling;
pub mod weights;

pub use activation::ActivationLayer;
pub use convolution::{ConvolutionLayer, ConvolutionShape};
pub use dense::DenseLayer;
pub use pooling::MaxPoolingLayer;
pub use weights::{WeightArena, WeightBuffer, WeightId};

use rand::rngs::StdRng;
use tracing::debug;

use crate::error::{CnnError, Result};
use crate::math::{Dimensions, Initializer, Tensor};
use crate::network::spec::LayerSpec;
use crate::numeric::{NumericPolicy, Scalar};
use crate::optim::Optimizer;

#[derive(Debug, Clone)]
pub enum Layer<P: NumericPolicy> {
    Convolution(ConvolutionLayer<P>),
    MaxPooling(MaxPoolingLayer<P>),
    FullyConnected(DenseLayer<P>),
    Activation(ActivationLayer<P>),
}

impl<P: NumericPolicy> Layer<P> {
    /// Builds the layer `spec` describes on top of an input of `input_dims`.
    pub fn from_spec(spec: &LayerSpec, input_dims: Dimensions, arena: &mut WeightArena) -> Result<Layer<P>> {
        let layer = match *spec {
            LayerSpec::Convolution { kernel_size, stride, padding, kernels } => Layer::Convolution(
                ConvolutionLayer::new(input_dims, ConvolutionShape { kernel_size, stride, padding, kernels }, arena)?,
            ),
            LayerSpec::MaxPooling { size, stride } => {
                Layer::MaxPooling(MaxPoolingLayer::new(input_dims, size, stride)?)
            }
            LayerSpec::FullyConnected { outputs } => {
                Layer::FullyConnected(DenseLayer::new(input_dims, outputs, arena)?)
            }
            LayerSpec::Activation { function } => Layer::Activation(ActivationLayer::new(input_dims, function)?),
        };
        debug!(
            kind = layer.kind_name(),
            input = %layer.input_dims(),
            output = %layer.output_dims(),
            "built layer"
        );
        Ok(layer)
    }

    pub fn to_spec(&self) -> LayerSpec {
        match self {
            Layer::Convolution(l) => {
                let s = l.shape();
                LayerSpec::Convolution {
                    kernel_size: s.kernel_size,
                    stride: s.stride,
                    padding: s.padding,
                    kernels: s.kernels,
                }
            }
            Layer::MaxPooling(l) => LayerSpec::MaxPooling { size: l.size(), stride: l.stride() },
            Layer::FullyConnected(l) => LayerSpec::FullyConnected { outputs: l.outputs() },
            Layer::Activation(l) => LayerSpec::Activation { function: l.function() },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Layer::Convolution(_) => "convolution",
            Layer::MaxPooling(_) => "max-pooling",
            Layer::FullyConnected(_) => "fully-connected",
            Layer::Activation(_) => "activation",
        }
    }

    pub fn input_dims(&self) -> Dimensions {
        match self {
            Layer::Convolution(l) => l.input_dims(),
            Layer::MaxPooling(l) => l.input_dims(),
            Layer::FullyConnected(l) => l.input_dims(),
            Layer::Activation(l) => l.dims(),
        }
    }

    pub fn output_dims(&self) -> Dimensions {
        match self {
            Layer::Convolution(l) => l.output_dims(),
            Layer::MaxPooling(l) => l.output_dims(),
            Layer::FullyConnected(l) => l.output_dims(),
            Layer::Activation(l) => l.dims(),
        }
    }

    pub fn compute(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        match self {
            Layer::Convolution(l) => l.compute(input),
            Layer::MaxPooling(l) => l.compute(input),
            Layer::FullyConnected(l) => l.compute(input),
            Layer::Activation(l) => l.compute(input),
        }
    }

    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        match self {
            Layer::Convolution(l) => l.forward(input),
            Layer::MaxPooling(l) => l.forward(input),
            Layer::FullyConnected(l) => l.forward(input),
            Layer::Activation(l) => l.forward(input),
        }
    }

    pub fn backward(&mut self, output_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        match self {
            Layer::Convolution(l) => l.backward(output_gradient),
            Layer::MaxPooling(l) => l.backward(output_gradient),
            Layer::FullyConnected(l) => l.backward(output_gradient),
            Layer::Activation(l) => l.backward(output_gradient),
        }
    }

    /// Drops whatever the last `forward` cached.
    pub(crate) fn clear_cache(&mut self) {
        match self {
            Layer::Convolution(l) => l.clear_cache(),
            Layer::MaxPooling(l) => l.clear_cache(),
            Layer::FullyConnected(l) => l.clear_cache(),
            Layer::Activation(l) => l.clear_cache(),
        }
    }

    /// Owned weight buffers in a fixed order: kernels or weights, then biases.
    pub fn weights(&self) -> Vec<&WeightBuffer<P>> {
        match self {
            Layer::Convolution(l) => vec![&l.kernels, &l.biases],
            Layer::FullyConnected(l) => vec![&l.weights, &l.biases],
            Layer::MaxPooling(_) | Layer::Activation(_) => Vec::new(),
        }
    }

    pub fn weights_mut(&mut self) -> Vec<&mut WeightBuffer<P>> {
        match self {
            Layer::Convolution(l) => vec![&mut l.kernels, &mut l.biases],
            Layer::FullyConnected(l) => vec![&mut l.weights, &mut l.biases],
            Layer::MaxPooling(_) | Layer::Activation(_) => Vec::new(),
        }
    }

    /// Updates every owned buffer from its accumulated gradient.
    pub fn apply_update(&mut self, optimizer: &mut dyn Optimizer<P>) {
        for buffer in self.weights_mut() {
            buffer.apply(optimizer);
        }
    }

    pub fn initialize(&mut self, init: Initializer, rng: &mut StdRng) {
        match self {
            Layer::Convolution(l) => l.initialize(init, rng),
            Layer::FullyConnected(l) => l.initialize(init, rng),
            Layer::MaxPooling(_) | Layer::Activation(_) => {}
        }
    }
}

pub(crate) fn check_input<T: Scalar>(layer: &str, expected: Dimensions, input: &Tensor<T>) -> Result<()> {
    if input.dims() != expected {
        return Err(CnnError::ShapeMismatch {
            layer: layer.to_string(),
            expected,
            actual: input.dims(),
        });
    }
    Ok(())
}

pub(crate) fn check_output_gradient<T: Scalar>(
    layer: &str,
    expected: Dimensions,
    gradient: &Tensor<T>,
) -> Result<()> {
    check_input(&format!("{} (output gradient)", layer), expected, gradient)
}

pub(crate) fn missing_cache(layer: &str) -> CnnError {
    CnnError::Precondition(format!("{} backward called without a preceding forward", layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::numeric::DoublePrecision;

    #[test]
    fn spec_round_trip_preserves_geometry() {
        let mut arena = WeightArena::new();
        let input = Dimensions::new(6, 6, 1).unwrap();
        let specs = [
            LayerSpec::Convolution { kernel_size: 3, stride: 1, padding: 1, kernels: 2 },
            LayerSpec::MaxPooling { size: 2, stride: 2 },
            LayerSpec::FullyConnected { outputs: 3 },
            LayerSpec::Activation { function: ActivationFunction::Softmax },
        ];
        let mut dims = input;
        for spec in &specs {
            let layer = Layer::<DoublePrecision>::from_spec(spec, dims, &mut arena).unwrap();
            assert_eq!(&layer.to_spec(), spec);
            assert_eq!(layer.input_dims(), dims);
            dims = layer.output_dims();
        }
        assert_eq!(dims, Dimensions::flat(3).unwrap());
    }

    #[test]
    fn wrong_input_shape_is_rejected() {
        let mut arena = WeightArena::new();
        let mut layer = Layer::<DoublePrecision>::from_spec(
            &LayerSpec::FullyConnected { outputs: 2 },
            Dimensions::flat(3).unwrap(),
            &mut arena,
        )
        .unwrap();
        let err = layer.forward(&Tensor::zeros(Dimensions::flat(4).unwrap())).unwrap_err();
        assert!(matches!(err, CnnError::ShapeMismatch { .. }));
    }

    #[test]
    fn weightless_layers_own_no_buffers() {
        let mut arena = WeightArena::new();
        let layer = Layer::<DoublePrecision>::from_spec(
            &LayerSpec::MaxPooling { size: 2, stride: 2 },
            Dimensions::new(2, 2, 1).unwrap(),
            &mut arena,
        )
        .unwrap();
        assert!(layer.weights().is_empty());
    }
}
