use std::collections::HashMap;

use crate::layers::weights::WeightId;
use crate::numeric::Scalar;

/// One auxiliary vector per weight buffer, zero-filled on first access.
#[derive(Debug, Clone, Default)]
pub struct StateSlots<T> {
    slots: HashMap<WeightId, Vec<T>>,
}

impl<T: Scalar> StateSlots<T> {
    pub fn new() -> StateSlots<T> {
        StateSlots {
            slots: HashMap::new(),
        }
    }

    /// The slot for `id`, created with `len` zeros if it does not exist yet.
    pub fn slot(&mut self, id: WeightId, len: usize) -> &mut Vec<T> {
        self.slots.entry(id).or_insert_with(|| vec![T::zero(); len])
    }

    pub fn get(&self, id: WeightId) -> Option<&[T]> {
        self.slots.get(&id).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
