use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::data::Sample;
use crate::error::{CnnError, Result};
use crate::loss::LossType;
use crate::network::network::{EpochCallback, Network};
use crate::numeric::NumericPolicy;
use crate::optim::Optimizer;
use crate::train::epoch_stats::{EpochReport, TrainingSummary};
use crate::train::train_config::TrainingSettings;
use crate::train::trainer::train_sample;
use crate::train::validation::ValidationReport;

/// Trains `network` for `settings.epochs` epochs.
///
/// Every sample's input shape and target length are checked before the first
/// epoch, so a malformed dataset fails without touching any weight. The
/// registered epoch callback is invoked after each epoch; an error it returns
/// stops training and is propagated. On any error the gradients of the
/// unfinished batch are discarded.
pub fn train_loop<P: NumericPolicy>(
    network: &mut Network<P>,
    settings: &TrainingSettings,
    training: &[Sample<P>],
    loss: LossType,
    optimizer: &mut dyn Optimizer<P>,
    validation: Option<&[Sample<P>]>,
) -> Result<TrainingSummary> {
    settings.validate()?;
    if training.is_empty() {
        return Err(CnnError::EmptyDataset("training"));
    }
    check_samples(network, training)?;
    let validation = validation.filter(|v| !v.is_empty());
    if let Some(v) = validation {
        check_samples(network, v)?;
    }
    if settings.periodic_validation && validation.is_none() {
        warn!("periodic validation requested without validation data, skipping it");
    }

    let mut callback = network.take_epoch_callback();
    let result = run_epochs(network, settings, training, loss, optimizer, validation, &mut callback);
    network.restore_epoch_callback(callback);
    if result.is_err() {
        network.discard_pending_gradients();
    }
    result
}

/// Order in which one epoch visits `len` samples.
pub fn epoch_order(len: usize, shuffle: bool, rng: &mut StdRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    if shuffle {
        indices.shuffle(rng);
    }
    indices
}

fn check_samples<P: NumericPolicy>(network: &Network<P>, data: &[Sample<P>]) -> Result<()> {
    let input_dims = network.input_dims();
    let expected = network.output_size();
    for (i, sample) in data.iter().enumerate() {
        if sample.input.dims() != input_dims {
            return Err(CnnError::Data(format!(
                "sample {} has input {}, network expects {}",
                i,
                sample.input.dims(),
                input_dims
            )));
        }
        if sample.target.len() != expected {
            return Err(CnnError::Data(format!(
                "sample {} has {} target values, network produces {}",
                i,
                sample.target.len(),
                expected
            )));
        }
    }
    Ok(())
}

fn run_epochs<P: NumericPolicy>(
    network: &mut Network<P>,
    settings: &TrainingSettings,
    training: &[Sample<P>],
    loss: LossType,
    optimizer: &mut dyn Optimizer<P>,
    validation: Option<&[Sample<P>]>,
    callback: &mut Option<EpochCallback<P>>,
) -> Result<TrainingSummary> {
    let mut summary = TrainingSummary::default();

    for epoch in 1..=settings.epochs {
        let validation_before = periodic_validation(network, settings, validation)?;

        let t_start = Instant::now();
        let order = epoch_order(training.len(), settings.shuffle, network.rng_mut());
        let train_loss = run_one_epoch(network, settings, training, &order, loss, optimizer)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        let validation_after = periodic_validation(network, settings, validation)?;

        let report = EpochReport {
            epoch,
            total_epochs: settings.epochs,
            train_loss,
            validation_before,
            validation_after,
            elapsed_ms,
        };
        info!(
            epoch,
            total = settings.epochs,
            train_loss,
            accuracy = report.validation_accuracy(),
            elapsed_ms,
            "epoch finished"
        );

        if let Some(cb) = callback.as_mut() {
            cb(&report, settings, &*network)?;
        }
        summary.epochs.push(report);
    }

    Ok(summary)
}

fn periodic_validation<P: NumericPolicy>(
    network: &Network<P>,
    settings: &TrainingSettings,
    validation: Option<&[Sample<P>]>,
) -> Result<Option<ValidationReport>> {
    match validation {
        Some(data) if settings.periodic_validation => network.validate(data).map(Some),
        _ => Ok(None),
    }
}

/// One pass over `training` in `order`, updating weights after every batch.
/// Returns the mean loss over all samples.
fn run_one_epoch<P: NumericPolicy>(
    network: &mut Network<P>,
    settings: &TrainingSettings,
    training: &[Sample<P>],
    order: &[usize],
    loss: LossType,
    optimizer: &mut dyn Optimizer<P>,
) -> Result<f64> {
    let mut total_loss = 0.0;
    let mut window_loss = 0.0;
    let mut seen = 0usize;

    for batch in order.chunks(settings.batch_size) {
        for &idx in batch {
            let value = train_sample(network, &training[idx], loss)?;
            total_loss += value;
            window_loss += value;
            seen += 1;

            let rate = settings.error_output_rate;
            if rate > 0 && seen % rate == 0 {
                info!(samples = seen, average_error = window_loss / rate as f64, "training progress");
                window_loss = 0.0;
            }
        }
        network.apply_updates(optimizer);
    }

    Ok(total_loss / order.len() as f64)
}
