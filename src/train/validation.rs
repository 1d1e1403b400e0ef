use serde::{Deserialize, Serialize};

/// Outcome of a forward-only pass over a labelled dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Fraction of samples whose output argmax matches the target argmax.
    pub accuracy: f64,
    /// Mean squared-error loss per sample.
    pub average_loss: f64,
    pub samples: usize,
}
