use num_traits::Zero;

use crate::numeric::{NumericPolicy, Scalar};
use crate::optim::Optimizer;

/// Stable index of a weight buffer, handed out once at layer construction.
///
/// Optimizers key their per-weight state by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeightId(pub usize);

/// Hands out consecutive [`WeightId`]s while a network is being built.
#[derive(Debug, Default)]
pub struct WeightArena {
    next: usize,
}

impl WeightArena {
    pub fn new() -> WeightArena {
        WeightArena::default()
    }

    pub fn allocate(&mut self) -> WeightId {
        let id = WeightId(self.next);
        self.next += 1;
        id
    }
}

/// Trainable parameters together with their batch gradient accumulator.
#[derive(Debug, Clone)]
pub struct WeightBuffer<P: NumericPolicy> {
    id: WeightId,
    values: Vec<P::Weight>,
    gradient: Vec<P::Backward>,
    samples: usize,
}

impl<P: NumericPolicy> WeightBuffer<P> {
    pub fn new(id: WeightId, len: usize) -> WeightBuffer<P> {
        WeightBuffer {
            id,
            values: vec![P::Weight::zero(); len],
            gradient: vec![P::Backward::zero(); len],
            samples: 0,
        }
    }

    pub fn id(&self) -> WeightId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[P::Weight] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [P::Weight] {
        &mut self.values
    }

    /// Summed gradient of the current batch.
    pub fn gradient(&self) -> &[P::Backward] {
        &self.gradient
    }

    pub(crate) fn gradient_mut(&mut self) -> &mut [P::Backward] {
        &mut self.gradient
    }

    /// Number of backward passes accumulated since the last update.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub(crate) fn count_sample(&mut self) {
        self.samples += 1;
    }

    /// Hands the batch-mean gradient to `optimizer`, then clears the accumulator.
    pub fn apply(&mut self, optimizer: &mut dyn Optimizer<P>) {
        if self.samples == 0 {
            return;
        }
        let scale = P::Backward::from_f64_lossy(1.0 / self.samples as f64);
        let mean: Vec<P::Backward> = self.gradient.iter().map(|&g| g * scale).collect();
        optimizer.update(self.id, &mut self.values, &mean);
        self.reset_gradient();
    }

    pub fn reset_gradient(&mut self) {
        self.gradient.iter_mut().for_each(|g| *g = P::Backward::zero());
        self.samples = 0;
    }
}
