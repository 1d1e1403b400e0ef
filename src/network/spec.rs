use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationFunction;
use crate::error::{CnnError, Result};
use crate::math::Dimensions;
use crate::network::metadata::ModelMetadata;

/// Describes one layer of a network; the input shape is implied by the
/// preceding layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Convolution {
        kernel_size: usize,
        #[serde(default = "one")]
        stride: usize,
        #[serde(default)]
        padding: usize,
        kernels: usize,
    },
    MaxPooling {
        size: usize,
        #[serde(default = "one")]
        stride: usize,
    },
    FullyConnected {
        outputs: usize,
    },
    Activation {
        function: ActivationFunction,
    },
}

fn one() -> usize {
    1
}

/// A fully serializable description of a network topology.
///
/// Trained weights are stored separately, in the blob named by `weights`
/// (relative to the topology file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    pub input: Dimensions,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
    /// Weight blob file name; `<stem>.weights` when absent.
    #[serde(default)]
    pub weights: Option<String>,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>, input: Dimensions) -> NetworkSpec {
        NetworkSpec {
            name: name.into(),
            input,
            layers: Vec::new(),
            metadata: None,
            weights: None,
        }
    }

    /// Appends a layer, builder style.
    pub fn layer(mut self, layer: LayerSpec) -> NetworkSpec {
        self.layers.push(layer);
        self
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> NetworkSpec {
        self.metadata = Some(metadata);
        self
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| CnnError::Persistence(format!("cannot write topology: {}", e)))
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkSpec> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| CnnError::Persistence(format!("malformed topology: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_layers_with_defaults() {
        let json = r#"{
            "input": { "width": 28, "height": 28, "depth": 1 },
            "layers": [
                { "type": "convolution", "kernel_size": 5, "kernels": 6 },
                { "type": "activation", "function": "ReLU" },
                { "type": "max_pooling", "size": 2, "stride": 2 },
                { "type": "fully_connected", "outputs": 10 },
                { "type": "activation", "function": { "LeakyReLU": { "alpha": 0.01 } } }
            ]
        }"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.layers.len(), 5);
        assert_eq!(
            spec.layers[0],
            LayerSpec::Convolution { kernel_size: 5, stride: 1, padding: 0, kernels: 6 }
        );
        assert_eq!(
            spec.layers[4],
            LayerSpec::Activation { function: ActivationFunction::LeakyReLU { alpha: 0.01 } }
        );
        assert!(spec.metadata.is_none());
    }
}
