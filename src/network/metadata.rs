use serde::{Deserialize, Serialize};

/// Optional annotations attached to a saved network.
/// All fields are optional so topologies without metadata load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Human-readable class labels for the outputs (e.g. ["0","1",...,"9"]).
    pub output_labels: Option<Vec<String>>,
}

impl ModelMetadata {
    /// Label of output `index`, if one was provided.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.output_labels
            .as_ref()
            .and_then(|labels| labels.get(index))
            .map(String::as_str)
    }
}
