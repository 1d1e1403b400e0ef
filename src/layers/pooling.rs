use crate::error::{CnnError, Result};
use crate::layers::{check_input, check_output_gradient, missing_cache};
use crate::math::{Dimensions, Tensor};
use crate::numeric::NumericPolicy;

/// Max pooling over square windows, applied to each channel independently.
///
/// The forward pass records which input element won each window; backward
/// routes the gradient to that element only.
#[derive(Debug, Clone)]
pub struct MaxPoolingLayer<P: NumericPolicy> {
    size: usize,
    stride: usize,
    input_dims: Dimensions,
    output_dims: Dimensions,
    cache: Option<Vec<usize>>,
    _policy: std::marker::PhantomData<P>,
}

impl<P: NumericPolicy> MaxPoolingLayer<P> {
    pub fn new(input_dims: Dimensions, size: usize, stride: usize) -> Result<MaxPoolingLayer<P>> {
        input_dims.validate()?;
        if size == 0 || stride == 0 {
            return Err(CnnError::Configuration(
                "pooling size and stride must be positive".into(),
            ));
        }
        if size > input_dims.width || size > input_dims.height {
            return Err(CnnError::Configuration(format!(
                "pooling window {}x{} does not fit input {}",
                size, size, input_dims
            )));
        }
        let output_dims = Dimensions::new(
            (input_dims.width - size) / stride + 1,
            (input_dims.height - size) / stride + 1,
            input_dims.depth,
        )?;
        Ok(MaxPoolingLayer {
            size,
            stride,
            input_dims,
            output_dims,
            cache: None,
            _policy: std::marker::PhantomData,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn input_dims(&self) -> Dimensions {
        self.input_dims
    }

    pub fn output_dims(&self) -> Dimensions {
        self.output_dims
    }

    /// Pooled output plus the flat input index that won each window.
    fn pool(&self, input: &Tensor<P::Forward>) -> Result<(Tensor<P::Forward>, Vec<usize>)> {
        check_input("max-pooling", self.input_dims, input)?;
        let in_dims = self.input_dims;
        let out_dims = self.output_dims;
        let x = input.data();
        let mut output = Tensor::zeros(out_dims);
        let mut winners = vec![0usize; out_dims.size()];

        for c in 0..out_dims.depth {
            for oy in 0..out_dims.height {
                for ox in 0..out_dims.width {
                    let mut best_idx = in_dims.index(ox * self.stride, oy * self.stride, c);
                    for dy in 0..self.size {
                        for dx in 0..self.size {
                            let idx = in_dims.index(ox * self.stride + dx, oy * self.stride + dy, c);
                            if x[idx] > x[best_idx] {
                                best_idx = idx;
                            }
                        }
                    }
                    let out_idx = out_dims.index(ox, oy, c);
                    output.data_mut()[out_idx] = x[best_idx];
                    winners[out_idx] = best_idx;
                }
            }
        }
        Ok((output, winners))
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn compute(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        self.pool(input).map(|(output, _)| output)
    }

    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let (output, winners) = self.pool(input)?;
        self.cache = Some(winners);
        Ok(output)
    }

    pub fn backward(&mut self, output_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        check_output_gradient("max-pooling", self.output_dims, output_gradient)?;
        let winners = self.cache.take().ok_or_else(|| missing_cache("max-pooling"))?;
        let mut input_gradient = Tensor::<P::Backward>::zeros(self.input_dims);
        let grad = input_gradient.data_mut();
        for (&idx, &g) in winners.iter().zip(output_gradient.data().iter()) {
            // overlapping windows may share a winner
            grad[idx] = grad[idx] + g;
        }
        Ok(input_gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DoublePrecision;

    fn input() -> Tensor<f64> {
        Tensor::from_vec(
            Dimensions::new(4, 2, 1).unwrap(),
            vec![1.0, 3.0, 2.0, 0.0, 4.0, 2.0, 1.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn picks_window_maxima() {
        let l = MaxPoolingLayer::<DoublePrecision>::new(Dimensions::new(4, 2, 1).unwrap(), 2, 2).unwrap();
        let out = l.compute(&input()).unwrap();
        assert_eq!(out.dims(), Dimensions::new(2, 1, 1).unwrap());
        assert_eq!(out.data(), &[4.0, 5.0]);
    }

    #[test]
    fn routes_gradient_to_winner() {
        let mut l = MaxPoolingLayer::<DoublePrecision>::new(Dimensions::new(4, 2, 1).unwrap(), 2, 2).unwrap();
        l.forward(&input()).unwrap();
        let g = l
            .backward(&Tensor::from_vec(Dimensions::new(2, 1, 1).unwrap(), vec![0.5, -1.0]).unwrap())
            .unwrap();
        assert_eq!(g.data(), &[0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn window_must_fit() {
        assert!(MaxPoolingLayer::<DoublePrecision>::new(Dimensions::new(1, 4, 1).unwrap(), 2, 2).is_err());
    }
}
