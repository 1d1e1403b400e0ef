use num_traits::Zero;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::error::{CnnError, Result};
use crate::layers::weights::{WeightArena, WeightBuffer};
use crate::layers::{check_input, check_output_gradient, missing_cache};
use crate::math::{Dimensions, Initializer, Tensor};
use crate::numeric::{cast, NumericPolicy, Scalar};

/// Kernel geometry of a convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolutionShape {
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
    pub kernels: usize,
}

impl ConvolutionShape {
    /// Input coordinate hit by output `o` and kernel offset `d`, if inside the
    /// unpadded input.
    #[inline]
    fn source(&self, o: usize, d: usize, extent: usize) -> Option<usize> {
        (o * self.stride + d)
            .checked_sub(self.padding)
            .filter(|&i| i < extent)
    }
}

/// 2-D convolution with learnable square kernels spanning the full input depth.
///
/// Kernel weights are laid out `[kernel][channel][ky][kx]`; there is one bias
/// per kernel. Work is split across kernels (forward, weight gradients) and
/// across input channels (input gradient); every output element is still summed
/// in a fixed order, so results do not depend on the thread count.
#[derive(Debug, Clone)]
pub struct ConvolutionLayer<P: NumericPolicy> {
    shape: ConvolutionShape,
    input_dims: Dimensions,
    output_dims: Dimensions,
    pub kernels: WeightBuffer<P>,
    pub biases: WeightBuffer<P>,
    cache: Option<Tensor<P::Forward>>,
}

impl<P: NumericPolicy> ConvolutionLayer<P> {
    pub fn new(
        input_dims: Dimensions,
        shape: ConvolutionShape,
        arena: &mut WeightArena,
    ) -> Result<ConvolutionLayer<P>> {
        input_dims.validate()?;
        let ConvolutionShape { kernel_size: k, stride, padding, kernels } = shape;
        if k == 0 || stride == 0 || kernels == 0 {
            return Err(CnnError::Configuration(format!(
                "convolution needs positive kernel size, stride and kernel count, got {:?}",
                shape
            )));
        }
        let padded_w = input_dims.width + 2 * padding;
        let padded_h = input_dims.height + 2 * padding;
        if k > padded_w || k > padded_h {
            return Err(CnnError::Configuration(format!(
                "convolution kernel {}x{} does not fit padded input {}x{}",
                k, k, padded_w, padded_h
            )));
        }
        let output_dims = Dimensions::new(
            (padded_w - k) / stride + 1,
            (padded_h - k) / stride + 1,
            kernels,
        )?;
        Ok(ConvolutionLayer {
            shape,
            input_dims,
            output_dims,
            kernels: WeightBuffer::new(arena.allocate(), kernels * input_dims.depth * k * k),
            biases: WeightBuffer::new(arena.allocate(), kernels),
            cache: None,
        })
    }

    pub fn shape(&self) -> ConvolutionShape {
        self.shape
    }

    pub fn input_dims(&self) -> Dimensions {
        self.input_dims
    }

    pub fn output_dims(&self) -> Dimensions {
        self.output_dims
    }

    fn kernel_volume(&self) -> usize {
        self.input_dims.depth * self.shape.kernel_size * self.shape.kernel_size
    }

    pub fn initialize(&mut self, init: Initializer, rng: &mut StdRng) {
        let fan_in = self.kernel_volume();
        init.fill(self.kernels.values_mut(), fan_in, rng);
        Initializer::Zeros.fill(self.biases.values_mut(), fan_in, rng);
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn compute(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        check_input("convolution", self.input_dims, input)?;
        let geo = self.shape;
        let k = geo.kernel_size;
        let in_dims = self.input_dims;
        let out_dims = self.output_dims;
        let volume = self.kernel_volume();
        let weights: Vec<P::Forward> = self.kernels.values().iter().map(|&w| cast(w)).collect();
        let biases = self.biases.values();
        let x = input.data();

        let mut output = Tensor::zeros(out_dims);
        output
            .data_mut()
            .par_chunks_mut(out_dims.plane())
            .enumerate()
            .for_each(|(kernel, plane)| {
                let w = &weights[kernel * volume..(kernel + 1) * volume];
                for oy in 0..out_dims.height {
                    for ox in 0..out_dims.width {
                        let mut sum: P::Forward = cast(biases[kernel]);
                        for c in 0..in_dims.depth {
                            for ky in 0..k {
                                let Some(iy) = geo.source(oy, ky, in_dims.height) else { continue };
                                for kx in 0..k {
                                    let Some(ix) = geo.source(ox, kx, in_dims.width) else { continue };
                                    sum = sum + w[(c * k + ky) * k + kx] * x[in_dims.index(ix, iy, c)];
                                }
                            }
                        }
                        plane[oy * out_dims.width + ox] = sum;
                    }
                }
            });
        Ok(output)
    }

    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let out = self.compute(input)?;
        self.cache = Some(input.clone());
        Ok(out)
    }

    pub fn backward(&mut self, output_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        check_output_gradient("convolution", self.output_dims, output_gradient)?;
        let input = self.cache.take().ok_or_else(|| missing_cache("convolution"))?;
        let geo = self.shape;
        let k = geo.kernel_size;
        let in_dims = self.input_dims;
        let out_dims = self.output_dims;
        let volume = self.kernel_volume();
        let x: Vec<P::Backward> = input.data().iter().map(|&v| cast(v)).collect();
        let delta = output_gradient.data();

        // ∂L/∂K[kernel][c][ky][kx] += Σ δ[ox, oy, kernel] · x[ix, iy, c]
        self.kernels
            .gradient_mut()
            .par_chunks_mut(volume)
            .enumerate()
            .for_each(|(kernel, grad)| {
                let d_plane = &delta[kernel * out_dims.plane()..(kernel + 1) * out_dims.plane()];
                for c in 0..in_dims.depth {
                    for ky in 0..k {
                        for kx in 0..k {
                            let mut sum = P::Backward::zero();
                            for oy in 0..out_dims.height {
                                let Some(iy) = geo.source(oy, ky, in_dims.height) else { continue };
                                for ox in 0..out_dims.width {
                                    let Some(ix) = geo.source(ox, kx, in_dims.width) else { continue };
                                    sum = sum + d_plane[oy * out_dims.width + ox] * x[in_dims.index(ix, iy, c)];
                                }
                            }
                            let g = &mut grad[(c * k + ky) * k + kx];
                            *g = *g + sum;
                        }
                    }
                }
            });
        for (kernel, g) in self.biases.gradient_mut().iter_mut().enumerate() {
            let plane = &delta[kernel * out_dims.plane()..(kernel + 1) * out_dims.plane()];
            *g = plane.iter().fold(*g, |acc, &d| acc + d);
        }
        self.kernels.count_sample();
        self.biases.count_sample();

        // ∂L/∂x[ix, iy, c] = Σ K[kernel][c][ky][kx] · δ[ox, oy, kernel]
        let weights: Vec<P::Backward> = self.kernels.values().iter().map(|&w| cast(w)).collect();
        let mut input_gradient = Tensor::zeros(in_dims);
        input_gradient
            .data_mut()
            .par_chunks_mut(in_dims.plane())
            .enumerate()
            .for_each(|(c, grad_plane)| {
                for kernel in 0..out_dims.depth {
                    let w = &weights[kernel * volume..(kernel + 1) * volume];
                    let d_plane = &delta[kernel * out_dims.plane()..(kernel + 1) * out_dims.plane()];
                    for oy in 0..out_dims.height {
                        for ox in 0..out_dims.width {
                            let d = d_plane[oy * out_dims.width + ox];
                            for ky in 0..k {
                                let Some(iy) = geo.source(oy, ky, in_dims.height) else { continue };
                                for kx in 0..k {
                                    let Some(ix) = geo.source(ox, kx, in_dims.width) else { continue };
                                    let g = &mut grad_plane[iy * in_dims.width + ix];
                                    *g = *g + w[(c * k + ky) * k + kx] * d;
                                }
                            }
                        }
                    }
                }
            });
        Ok(input_gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DoublePrecision;

    fn shape(kernel_size: usize, stride: usize, padding: usize, kernels: usize) -> ConvolutionShape {
        ConvolutionShape { kernel_size, stride, padding, kernels }
    }

    #[test]
    fn output_dimensions() {
        let mut arena = WeightArena::new();
        let l = ConvolutionLayer::<DoublePrecision>::new(
            Dimensions::new(5, 5, 1).unwrap(),
            shape(3, 1, 0, 2),
            &mut arena,
        )
        .unwrap();
        assert_eq!(l.output_dims(), Dimensions::new(3, 3, 2).unwrap());

        let padded = ConvolutionLayer::<DoublePrecision>::new(
            Dimensions::new(5, 5, 3).unwrap(),
            shape(3, 2, 1, 4),
            &mut arena,
        )
        .unwrap();
        assert_eq!(padded.output_dims(), Dimensions::new(3, 3, 4).unwrap());
        assert_eq!(padded.kernels.len(), 4 * 3 * 9);
    }

    #[test]
    fn rejects_kernel_larger_than_input() {
        let mut arena = WeightArena::new();
        let err = ConvolutionLayer::<DoublePrecision>::new(
            Dimensions::new(2, 2, 1).unwrap(),
            shape(3, 1, 0, 1),
            &mut arena,
        )
        .unwrap_err();
        assert!(matches!(err, CnnError::Configuration(_)));
    }

    #[test]
    fn box_kernel_sums_window() {
        let mut arena = WeightArena::new();
        let mut l = ConvolutionLayer::<DoublePrecision>::new(
            Dimensions::new(3, 3, 1).unwrap(),
            shape(2, 1, 0, 1),
            &mut arena,
        )
        .unwrap();
        l.kernels.values_mut().iter_mut().for_each(|w| *w = 1.0);
        l.biases.values_mut()[0] = 0.5;
        let input = Tensor::from_vec(
            Dimensions::new(3, 3, 1).unwrap(),
            (1..=9).map(|v| v as f64).collect(),
        )
        .unwrap();
        let out = l.compute(&input).unwrap();
        // windows: [1,2,4,5] [2,3,5,6] [4,5,7,8] [5,6,8,9]
        assert_eq!(out.data(), &[12.5, 16.5, 24.5, 28.5]);
    }
}
