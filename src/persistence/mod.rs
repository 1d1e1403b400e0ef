//! Saving and loading networks: a JSON topology plus a binary weight blob
//! stored next to it.

pub mod weights;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{CnnError, Result};
use crate::network::{Network, NetworkSpec};
use crate::numeric::NumericPolicy;

/// Blob holding the weights of the topology at `topology`.
pub fn weights_path(topology: &Path, spec: &NetworkSpec) -> PathBuf {
    let file = match &spec.weights {
        Some(name) => PathBuf::from(name),
        None => {
            let stem = topology.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
            let mut name = PathBuf::from(stem);
            name.set_extension("weights");
            name
        }
    };
    topology.parent().unwrap_or_else(|| Path::new("")).join(file)
}

/// Builds the network described at `path`.
///
/// With `load_weights` the weights come from the blob next to it, which must
/// exist and match the topology; otherwise they are freshly initialised from
/// `seed`.
pub fn load_network<P: NumericPolicy>(path: &Path, load_weights: bool, seed: u64) -> Result<Network<P>> {
    let spec = NetworkSpec::load_json(path).map_err(|e| match e {
        CnnError::Io(io) => CnnError::Persistence(format!("cannot read {}: {}", path.display(), io)),
        other => other,
    })?;
    let mut network = Network::from_spec(&spec, seed)?;
    if load_weights {
        let blob = weights_path(path, &spec);
        let file = File::open(&blob)
            .map_err(|e| CnnError::Persistence(format!("cannot open {}: {}", blob.display(), e)))?;
        weights::read_weights(&mut network.weights_mut(), BufReader::new(file))?;
        info!(path = %blob.display(), "loaded weights");
    }
    info!(
        path = %path.display(),
        layers = network.layers().len(),
        input = %network.input_dims(),
        output = %network.output_dims(),
        "loaded network"
    );
    Ok(network)
}

/// Writes the topology to `path` and the weights to the blob next to it.
pub fn dump_network<P: NumericPolicy>(network: &Network<P>, path: &Path) -> Result<()> {
    let mut spec = network.to_spec();
    let blob = weights_path(path, &spec);
    spec.weights = blob.file_name().map(|n| n.to_string_lossy().into_owned());
    spec.save_json(path)?;
    weights::write_weights(&network.weights(), BufWriter::new(File::create(&blob)?))?;
    info!(path = %path.display(), weights = %blob.display(), "saved network");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blob_sits_next_to_topology() {
        let spec = NetworkSpec::new("n", crate::math::Dimensions::flat(1).unwrap());
        assert_eq!(weights_path(Path::new("models/mnist.json"), &spec), PathBuf::from("models/mnist.weights"));
        let named = NetworkSpec { weights: Some("w.bin".into()), ..spec };
        assert_eq!(weights_path(Path::new("models/mnist.json"), &named), PathBuf::from("models/w.bin"));
    }
}
