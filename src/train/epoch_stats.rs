use serde::{Deserialize, Serialize};

use crate::train::validation::ValidationReport;

/// Per-epoch statistics handed to the epoch callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all samples in this epoch.
    pub train_loss: f64,
    /// Validation before the first batch, when periodic validation is on.
    pub validation_before: Option<ValidationReport>,
    /// Validation after the last update, when periodic validation is on.
    pub validation_after: Option<ValidationReport>,
    /// Wall-clock duration of the training pass in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochReport {
    /// Accuracy after the epoch, or zero without periodic validation.
    pub fn validation_accuracy(&self) -> f64 {
        self.validation_after.map(|v| v.accuracy).unwrap_or(0.0)
    }

    pub fn validation_loss(&self) -> f64 {
        self.validation_after.map(|v| v.average_loss).unwrap_or(0.0)
    }
}

/// Everything one `train` call produced, epoch by epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochReport>,
}

impl TrainingSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.train_loss)
    }
}
