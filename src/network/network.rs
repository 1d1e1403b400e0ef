use std::collections::HashSet;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::info;

use crate::data::Sample;
use crate::error::{CnnError, Result};
use crate::layers::{Layer, WeightArena, WeightBuffer};
use crate::loss::LossType;
use crate::math::tensor::argmax;
use crate::math::{Dimensions, Initializer, Tensor};
use crate::network::metadata::ModelMetadata;
use crate::network::spec::NetworkSpec;
use crate::numeric::{NumericPolicy, Scalar};
use crate::optim::Optimizer;
use crate::train::{train_loop, EpochReport, TrainingSettings, TrainingSummary, ValidationReport};

/// Called once per finished epoch with that epoch's report.
pub type EpochCallback<P> =
    Box<dyn FnMut(&EpochReport, &TrainingSettings, &Network<P>) -> Result<()>>;

/// An ordered chain of layers, fixed once built.
///
/// Every layer's output shape equals the next layer's input shape; this is
/// checked when the network is built and never again.
pub struct Network<P: NumericPolicy> {
    name: String,
    input_dims: Dimensions,
    layers: Vec<Layer<P>>,
    metadata: ModelMetadata,
    rng: StdRng,
    on_epoch_finished: Option<EpochCallback<P>>,
    output_enabled: bool,
}

impl<P: NumericPolicy> Network<P> {
    /// Wraps already-built layers, checking the chain is shape-consistent and
    /// that no two layers share a weight buffer id.
    pub fn new(input_dims: Dimensions, layers: Vec<Layer<P>>, seed: u64) -> Result<Network<P>> {
        input_dims.validate()?;
        if layers.is_empty() {
            return Err(CnnError::Configuration("network has no layers".into()));
        }
        let mut expected = input_dims;
        for (i, layer) in layers.iter().enumerate() {
            if layer.input_dims() != expected {
                return Err(CnnError::Configuration(format!(
                    "layer {} ({}) expects input {} but receives {}",
                    i,
                    layer.kind_name(),
                    layer.input_dims(),
                    expected
                )));
            }
            expected = layer.output_dims();
        }
        let mut ids = HashSet::new();
        for buffer in layers.iter().flat_map(|l| l.weights()) {
            if !ids.insert(buffer.id()) {
                return Err(CnnError::Configuration(format!(
                    "weight id {} is owned by more than one layer",
                    buffer.id().0
                )));
            }
        }
        Ok(Network {
            name: String::new(),
            input_dims,
            layers,
            metadata: ModelMetadata::default(),
            rng: StdRng::seed_from_u64(seed),
            on_epoch_finished: None,
            output_enabled: false,
        })
    }

    /// Builds every layer `spec` lists and initialises the weights from the
    /// seeded generator.
    pub fn from_spec(spec: &NetworkSpec, seed: u64) -> Result<Network<P>> {
        let mut arena = WeightArena::new();
        let mut dims = spec.input;
        let mut layers = Vec::with_capacity(spec.layers.len());
        for layer_spec in &spec.layers {
            let layer = Layer::from_spec(layer_spec, dims, &mut arena)?;
            dims = layer.output_dims();
            layers.push(layer);
        }
        let mut network = Network::new(spec.input, layers, seed)?;
        network.name = spec.name.clone();
        network.metadata = spec.metadata.clone().unwrap_or_default();
        network.initialize_weights();
        Ok(network)
    }

    pub fn to_spec(&self) -> NetworkSpec {
        NetworkSpec {
            name: self.name.clone(),
            input: self.input_dims,
            layers: self.layers.iter().map(Layer::to_spec).collect(),
            metadata: Some(self.metadata.clone()),
            weights: None,
        }
    }

    /// Re-draws every weight: He for layers feeding a rectifier, Xavier
    /// otherwise. Biases start at zero.
    pub fn initialize_weights(&mut self) {
        for i in 0..self.layers.len() {
            let init = match self.layers.get(i + 1) {
                Some(Layer::Activation(next)) if next.function().is_rectifier() => Initializer::He,
                _ => Initializer::Xavier,
            };
            self.layers[i].initialize(init, &mut self.rng);
        }
    }

    /// Forward pass; every layer caches what its backward pass needs.
    pub fn forward(&mut self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Backward pass from ∂L/∂output; weight gradients accumulate in the
    /// layers. Returns ∂L/∂input.
    pub fn backward(&mut self, loss_gradient: &Tensor<P::Backward>) -> Result<Tensor<P::Backward>> {
        let mut current = loss_gradient.clone();
        for layer in self.layers.iter_mut().rev() {
            current = layer.backward(&current)?;
        }
        Ok(current)
    }

    pub fn apply_updates(&mut self, optimizer: &mut dyn Optimizer<P>) {
        for layer in &mut self.layers {
            layer.apply_update(optimizer);
        }
    }

    /// Forward pass without caching; never touches the layers.
    pub fn predict(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        compute_chain(&self.layers, input)
    }

    /// Single inference; logs the output when output is enabled.
    pub fn run(&self, input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
        let output = self.predict(input)?;
        if self.output_enabled {
            let best = output.argmax();
            info!(
                output = ?output.to_f64_vec(),
                argmax = best,
                label = self.metadata.label(best).unwrap_or("-"),
                "inference"
            );
        }
        Ok(output)
    }

    /// Accuracy and mean squared error over `data`, forward only.
    pub fn validate(&self, data: &[Sample<P>]) -> Result<ValidationReport> {
        if data.is_empty() {
            return Err(CnnError::EmptyDataset("validation"));
        }
        let layers = &self.layers;
        let results = data
            .par_iter()
            .map(|sample| {
                let output = compute_chain(layers, &sample.input)?;
                let loss = LossType::MeanSquaredError.compute::<P>(&output, &sample.target)?;
                Ok::<_, CnnError>((output.argmax() == argmax(&sample.target), loss.to_f64_lossy()))
            })
            .collect::<Result<Vec<(bool, f64)>>>()?;

        let correct = results.iter().filter(|(hit, _)| *hit).count();
        let total_loss: f64 = results.iter().map(|(_, loss)| loss).sum();
        let report = ValidationReport {
            accuracy: correct as f64 / data.len() as f64,
            average_loss: total_loss / data.len() as f64,
            samples: data.len(),
        };
        if self.output_enabled {
            info!(
                accuracy = report.accuracy,
                average_loss = report.average_loss,
                samples = report.samples,
                "validation"
            );
        }
        Ok(report)
    }

    /// Forgets the forward caches and the gradients accumulated since the
    /// last update, leaving the weights as they are.
    pub(crate) fn discard_pending_gradients(&mut self) {
        for layer in &mut self.layers {
            layer.clear_cache();
            for buffer in layer.weights_mut() {
                buffer.reset_gradient();
            }
        }
    }

    /// Runs the training loop; see [`train_loop`].
    pub fn train(
        &mut self,
        settings: &TrainingSettings,
        training: &[Sample<P>],
        loss: LossType,
        optimizer: &mut dyn Optimizer<P>,
        validation: Option<&[Sample<P>]>,
    ) -> Result<TrainingSummary> {
        train_loop(self, settings, training, loss, optimizer, validation)
    }

    pub fn set_on_epoch_finished<F>(&mut self, callback: F)
    where
        F: FnMut(&EpochReport, &TrainingSettings, &Network<P>) -> Result<()> + 'static,
    {
        self.on_epoch_finished = Some(Box::new(callback));
    }

    pub fn clear_on_epoch_finished(&mut self) {
        self.on_epoch_finished = None;
    }

    pub(crate) fn take_epoch_callback(&mut self) -> Option<EpochCallback<P>> {
        self.on_epoch_finished.take()
    }

    pub(crate) fn restore_epoch_callback(&mut self, callback: Option<EpochCallback<P>>) {
        if self.on_epoch_finished.is_none() {
            self.on_epoch_finished = callback;
        }
    }

    pub fn enable_output(&mut self, enabled: bool) {
        self.output_enabled = enabled;
    }

    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn input_dims(&self) -> Dimensions {
        self.input_dims
    }

    pub fn output_dims(&self) -> Dimensions {
        self.layers
            .last()
            .map(Layer::output_dims)
            .unwrap_or(self.input_dims)
    }

    pub fn output_size(&self) -> usize {
        self.output_dims().size()
    }

    pub fn layers(&self) -> &[Layer<P>] {
        &self.layers
    }

    /// Every weight buffer, layer by layer.
    pub fn weights(&self) -> Vec<&WeightBuffer<P>> {
        self.layers.iter().flat_map(|l| l.weights()).collect()
    }

    pub fn weights_mut(&mut self) -> Vec<&mut WeightBuffer<P>> {
        self.layers.iter_mut().flat_map(|l| l.weights_mut()).collect()
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

fn compute_chain<P: NumericPolicy>(layers: &[Layer<P>], input: &Tensor<P::Forward>) -> Result<Tensor<P::Forward>> {
    let mut current = input.clone();
    for layer in layers {
        current = layer.compute(&current)?;
    }
    Ok(current)
}

impl<P: NumericPolicy> fmt::Debug for Network<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.name)
            .field("input_dims", &self.input_dims)
            .field("layers", &self.layers)
            .field("output_enabled", &self.output_enabled)
            .field("has_epoch_callback", &self.on_epoch_finished.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::spec::LayerSpec;
    use crate::numeric::DoublePrecision;

    fn spec() -> NetworkSpec {
        NetworkSpec::new("tiny", Dimensions::new(4, 4, 1).unwrap())
            .layer(LayerSpec::Convolution { kernel_size: 3, stride: 1, padding: 0, kernels: 2 })
            .layer(LayerSpec::Activation { function: ActivationFunction::ReLU })
            .layer(LayerSpec::FullyConnected { outputs: 3 })
            .layer(LayerSpec::Activation { function: ActivationFunction::Softmax })
    }

    #[test]
    fn builds_shape_consistent_chain() {
        let net = Network::<DoublePrecision>::from_spec(&spec(), 7).unwrap();
        assert_eq!(net.layers().len(), 4);
        assert_eq!(net.output_dims(), Dimensions::flat(3).unwrap());
        let ids: Vec<usize> = net.weights().iter().map(|w| w.id().0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rejects_broken_chain() {
        let mut arena = WeightArena::new();
        let a = Layer::<DoublePrecision>::from_spec(
            &LayerSpec::FullyConnected { outputs: 3 },
            Dimensions::flat(2).unwrap(),
            &mut arena,
        )
        .unwrap();
        let b = Layer::<DoublePrecision>::from_spec(
            &LayerSpec::FullyConnected { outputs: 1 },
            Dimensions::flat(4).unwrap(),
            &mut arena,
        )
        .unwrap();
        let err = Network::new(Dimensions::flat(2).unwrap(), vec![a, b], 0).unwrap_err();
        assert!(matches!(err, CnnError::Configuration(_)));
    }

    #[test]
    fn rejects_shared_weight_ids() {
        let mut arena = WeightArena::new();
        let a = Layer::<DoublePrecision>::from_spec(
            &LayerSpec::FullyConnected { outputs: 2 },
            Dimensions::flat(2).unwrap(),
            &mut arena,
        )
        .unwrap();
        let err = Network::new(Dimensions::flat(2).unwrap(), vec![a.clone(), a], 0).unwrap_err();
        assert!(matches!(err, CnnError::Configuration(_)));
    }

    #[test]
    fn same_seed_same_initial_weights() {
        let a = Network::<DoublePrecision>::from_spec(&spec(), 42).unwrap();
        let b = Network::<DoublePrecision>::from_spec(&spec(), 42).unwrap();
        for (wa, wb) in a.weights().iter().zip(b.weights().iter()) {
            assert_eq!(wa.values(), wb.values());
        }
        assert!(a.weights()[1].values().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn run_matches_forward_and_leaves_weights_alone() {
        let mut net = Network::<DoublePrecision>::from_spec(&spec(), 3).unwrap();
        let input = Tensor::from_vec(
            Dimensions::new(4, 4, 1).unwrap(),
            (0..16).map(|v| v as f64 / 16.0).collect(),
        )
        .unwrap();
        let before: Vec<Vec<f64>> = net.weights().iter().map(|w| w.values().to_vec()).collect();
        assert!(!net.output_enabled());
        net.enable_output(true);
        assert!(net.output_enabled());
        let ran = net.run(&input).unwrap();
        let forward = net.forward(&input).unwrap();
        assert_eq!(ran, forward);
        let after: Vec<Vec<f64>> = net.weights().iter().map(|w| w.values().to_vec()).collect();
        assert_eq!(before, after);
        assert!((ran.data().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
