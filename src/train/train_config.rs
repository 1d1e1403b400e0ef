use serde::{Deserialize, Serialize};

use crate::error::{CnnError, Result};

/// Settings for one `Network::train` call.
///
/// # Fields
/// - `epochs`              — full passes over the training data
/// - `batch_size`          — samples per weight update; `1` is online learning
/// - `error_output_rate`   — log the running average error every this many
///                           samples; `0` disables it
/// - `periodic_validation` — validate before and after every epoch
/// - `shuffle`             — visit the training data in a fresh seeded order
///                           each epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub batch_size: usize,
    pub error_output_rate: usize,
    pub periodic_validation: bool,
    pub shuffle: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        TrainingSettings {
            epochs: 1,
            batch_size: 1,
            error_output_rate: 0,
            periodic_validation: false,
            shuffle: false,
        }
    }
}

impl TrainingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CnnError::Configuration("batch size must be at least 1".into()));
        }
        Ok(())
    }
}
