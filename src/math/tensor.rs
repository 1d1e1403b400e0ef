use crate::error::{CnnError, Result};
use crate::math::dimensions::Dimensions;
use crate::numeric::{cast, Scalar};

/// Dense 3-D array of scalars with an attached shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    dims: Dimensions,
    data: Vec<T>,
}

impl<T: Scalar> Tensor<T> {
    pub fn zeros(dims: Dimensions) -> Tensor<T> {
        Tensor {
            dims,
            data: vec![T::zero(); dims.size()],
        }
    }

    pub fn from_vec(dims: Dimensions, data: Vec<T>) -> Result<Tensor<T>> {
        if data.len() != dims.size() {
            return Err(CnnError::Data(format!(
                "tensor of shape {} needs {} values, got {}",
                dims,
                dims.size(),
                data.len()
            )));
        }
        Ok(Tensor { dims, data })
    }

    /// Builds a `n × 1 × 1` tensor from plain values.
    pub fn from_flat(data: Vec<T>) -> Result<Tensor<T>> {
        let dims = Dimensions::flat(data.len())?;
        Ok(Tensor { dims, data })
    }

    /// Converts from `f64` values, mostly for tests and parsers.
    pub fn from_f64(dims: Dimensions, values: &[f64]) -> Result<Tensor<T>> {
        Tensor::from_vec(dims, values.iter().map(|&v| T::from_f64_lossy(v)).collect())
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.dims.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let i = self.dims.index(x, y, z);
        self.data[i] = value;
    }

    pub fn map<F>(&self, f: F) -> Tensor<T>
    where
        F: Fn(T) -> T,
    {
        Tensor {
            dims: self.dims,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Same values in another scalar representation.
    pub fn cast<U: Scalar>(&self) -> Tensor<U> {
        Tensor {
            dims: self.dims,
            data: self.data.iter().map(|&x| cast(x)).collect(),
        }
    }

    /// Reinterprets the storage under a new shape of equal size.
    pub fn reshape(self, dims: Dimensions) -> Result<Tensor<T>> {
        Tensor::from_vec(dims, self.data)
    }

    /// Index of the largest element, first one on ties.
    pub fn argmax(&self) -> usize {
        argmax(&self.data)
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|x| x.to_f64_lossy()).collect()
    }
}

/// Index of the maximum element in a slice.
pub fn argmax<T: Scalar>(values: &[T]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, T)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_follow_layout() {
        let dims = Dimensions::new(2, 2, 2).unwrap();
        let mut t = Tensor::<f32>::zeros(dims);
        t.set(1, 0, 1, 5.0);
        assert_eq!(t.data()[dims.index(1, 0, 1)], 5.0);
        assert_eq!(t.get(1, 0, 1), 5.0);
    }

    #[test]
    fn from_vec_checks_length() {
        let dims = Dimensions::new(2, 2, 1).unwrap();
        assert!(Tensor::<f64>::from_vec(dims, vec![0.0; 3]).is_err());
        assert!(Tensor::<f64>::from_vec(dims, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1f64, 0.7, 0.7, 0.2]), 1);
        assert_eq!(argmax::<f32>(&[]), 0);
    }

    #[test]
    fn reshape_keeps_values() {
        let t = Tensor::<f64>::from_flat(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let r = t.reshape(Dimensions::new(2, 2, 1).unwrap()).unwrap();
        assert_eq!(r.get(1, 1, 0), 4.0);
    }
}
