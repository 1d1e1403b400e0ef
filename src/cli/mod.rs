//! Command-line front end: option parsing, mode dispatch and reporting.
//!
//! The binary only sets up logging and maps the result of [`run`] to an exit
//! code; everything else happens here.

pub mod args;

pub use args::{Cli, Mode};

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::data::Dataset;
use crate::error::{CnnError, Result};
use crate::network::Network;
use crate::numeric::{DefaultPolicy, NumericPolicy};
use crate::parsers::{load_image, parse_input_dataset, DatasetOptions};
use crate::persistence::{dump_network, load_network};
use crate::train::KeepBest;

/// Runs one invocation with the policy the binary is built with.
pub fn run(cli: &Cli) -> Result<()> {
    run_with::<DefaultPolicy>(cli)
}

pub fn run_with<P: NumericPolicy>(cli: &Cli) -> Result<()> {
    if cli.type_info {
        print_type_info::<P>();
    }
    let mode = cli.mode()?;
    let cnn_path = match (&mode, &cli.cnn) {
        (Mode::TypeInfoOnly, _) => return Ok(()),
        (_, Some(path)) => path.as_path(),
        (_, None) => return Err(CnnError::Configuration("network topology file required".into())),
    };

    let seed = cli.seed.unwrap_or_else(clock_seed);
    let mut network = load_network::<P>(cnn_path, !cli.do_not_load, seed)?;

    match mode {
        Mode::TypeInfoOnly => Ok(()),
        Mode::Inference(input) => infer(cli, &network, &input),
        Mode::Dataset { training, validation } => {
            let options = DatasetOptions {
                input_dims: network.input_dims(),
                output_size: network.output_size(),
                offset: cli.validate_offset.unwrap_or(0),
                count: cli.validate_num.unwrap_or(0),
                grayscale: cli.grayscale,
            };
            let validation_data = parse_input_dataset::<P>(&cli.validate, &options)?;
            let training_data = parse_input_dataset::<P>(
                &cli.train,
                &DatasetOptions {
                    offset: cli.train_offset,
                    count: cli.train_num,
                    ..options
                },
            )?;

            if training {
                if let Err(e) = train(cli, &mut network, cnn_path, &training_data, &validation_data) {
                    if validation && !cli.periodic_validation {
                        warn!("problems occurred during training, skipping validation");
                    }
                    return Err(e);
                }
            }
            // periodic validation already reported the final accuracy
            if validation && !(training && cli.periodic_validation) {
                validate(&network, &validation_data)?;
            }
            Ok(())
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn infer<P: NumericPolicy>(cli: &Cli, network: &Network<P>, input: &Path) -> Result<()> {
    let image = load_image::<P::Forward>(input, network.input_dims(), cli.grayscale)?;
    let output = network.predict(&image)?;
    let best = output.argmax();
    let values: Vec<String> = output.to_f64_vec().iter().map(|v| format!("{:.6}", v)).collect();
    println!("Output: [{}]", values.join(", "));
    match network.metadata().label(best) {
        Some(label) => println!("Class: {} ({})", best, label),
        None => println!("Class: {}", best),
    }
    Ok(())
}

fn train<P: NumericPolicy>(
    cli: &Cli,
    network: &mut Network<P>,
    cnn_path: &Path,
    training: &Dataset<P>,
    validation: &Dataset<P>,
) -> Result<()> {
    if training.is_empty() {
        return Err(CnnError::EmptyDataset("training"));
    }
    let settings = cli.training_settings();
    let mut optimizer = cli.optimizer.build::<P>();
    optimizer.set_learning_rate(cli.learning_rate);
    optimizer.set_weight_decay(cli.weight_decay);
    info!(
        samples = training.len(),
        epochs = settings.epochs,
        batch_size = settings.batch_size,
        optimizer = optimizer.name(),
        loss = %cli.loss_function,
        "training"
    );

    if cli.keep_best {
        let mut keep = KeepBest::new();
        let path = cnn_path.to_path_buf();
        network.set_on_epoch_finished(move |report, _, net| {
            let accuracy = report.validation_accuracy();
            if keep.observe(accuracy) {
                info!(epoch = report.epoch, accuracy, "validation accuracy improved, saving network");
                dump_network(net, &path)?;
            }
            Ok(())
        });
    }

    let validation = (!validation.is_empty()).then_some(validation.as_slice());
    network.train(&settings, training, cli.loss_function, optimizer.as_mut(), validation)?;

    if !cli.do_not_save && !cli.keep_best {
        dump_network(network, cnn_path)?;
    }
    Ok(())
}

fn validate<P: NumericPolicy>(network: &Network<P>, data: &Dataset<P>) -> Result<()> {
    let report = network.validate(data)?;
    println!(
        "Accuracy: {:.2}% ({} samples), average error: {:.6}",
        report.accuracy * 100.0,
        report.samples,
        report.average_loss
    );
    Ok(())
}

pub fn print_type_info<P: NumericPolicy>() {
    for (role, info) in P::describe() {
        println!("=== {} ({}) ===", role, info.name);
        println!("Min: {:e}", info.min);
        println!("Max: {:e}", info.max);
        println!("Eps: {:e}", info.epsilon);
    }
    println!();
}
