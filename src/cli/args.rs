use std::path::PathBuf;

use clap::Parser;

use crate::error::{CnnError, Result};
use crate::loss::LossType;
use crate::optim::{OptimizerType, DEFAULT_LEARNING_RATE};
use crate::train::TrainingSettings;

/// Command-line options.
///
/// Options are grouped the way the modes use them: common, inference,
/// validation and training.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "typecnn",
    version,
    about = "Train, validate and run convolutional neural networks.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// JSON topology of the network; weights live next to it.
    #[arg(short = 'c', long = "cnn", value_name = "FILE", help_heading = "Common")]
    pub cnn: Option<PathBuf>,

    /// Read images as grayscale instead of RGB.
    #[arg(short = 'g', long, help_heading = "Common")]
    pub grayscale: bool,

    /// Print range and precision of the numeric types in use.
    #[arg(long, help_heading = "Common")]
    pub type_info: bool,

    /// Image to run inference on.
    #[arg(short = 'i', long = "input", value_name = "FILE", help_heading = "Inference")]
    pub input: Option<PathBuf>,

    /// Validation data files.
    #[arg(short = 'v', long = "validate", value_name = "FILE", num_args = 1.., help_heading = "Validation")]
    pub validate: Vec<PathBuf>,

    /// Validation records to skip.
    #[arg(long, value_name = "UINT", help_heading = "Validation")]
    pub validate_offset: Option<usize>,

    /// Validation records to use, 0 == all.
    #[arg(long, value_name = "UINT", help_heading = "Validation")]
    pub validate_num: Option<usize>,

    /// Training data files.
    #[arg(short = 't', long = "train", value_name = "FILE", num_args = 1.., help_heading = "Training")]
    pub train: Vec<PathBuf>,

    /// Training records to skip.
    #[arg(long, value_name = "UINT", default_value_t = 0, help_heading = "Training")]
    pub train_offset: usize,

    /// Training records to use, 0 == all.
    #[arg(long, value_name = "UINT", default_value_t = 0, help_heading = "Training")]
    pub train_num: usize,

    /// Seed for weight initialisation and shuffling; defaults to the clock.
    #[arg(short = 's', long, value_name = "UINT", help_heading = "Training")]
    pub seed: Option<u64>,

    #[arg(short = 'e', long, value_name = "UINT", default_value_t = 1, help_heading = "Training")]
    pub epochs: usize,

    #[arg(short = 'l', long, value_name = "FLOAT", default_value_t = DEFAULT_LEARNING_RATE, help_heading = "Training")]
    pub learning_rate: f64,

    /// L2 weight decay.
    #[arg(short = 'd', long, value_name = "FLOAT", default_value_t = 0.0, help_heading = "Training")]
    pub weight_decay: f64,

    #[arg(short = 'b', long, value_name = "UINT", default_value_t = 1, help_heading = "Training")]
    pub batch_size: usize,

    /// Start from freshly initialised weights instead of the saved ones.
    #[arg(long, help_heading = "Training")]
    pub do_not_load: bool,

    /// Do not write the trained network back to disk.
    #[arg(long, help_heading = "Training")]
    pub do_not_save: bool,

    /// sgd, sgdm, sgdn, adam or adagrad.
    #[arg(long, value_name = "NAME", default_value = "sgd", help_heading = "Training")]
    pub optimizer: OptimizerType,

    /// MSE, CE or CEbin.
    #[arg(long, value_name = "NAME", default_value = "MSE", help_heading = "Training")]
    pub loss_function: LossType,

    /// Validate before and after every epoch.
    #[arg(long, help_heading = "Training")]
    pub periodic_validation: bool,

    /// Log the average error of every UINT samples.
    #[arg(long, value_name = "UINT", help_heading = "Training")]
    pub periodic_output: Option<usize>,

    /// Visit training data in a new random order every epoch.
    #[arg(long, help_heading = "Training")]
    pub shuffle: bool,

    /// Save the network whenever validation accuracy improves.
    #[arg(long, help_heading = "Training")]
    pub keep_best: bool,
}

/// What one invocation will do, after option checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Only `--type-info` was given.
    TypeInfoOnly,
    Inference(PathBuf),
    Dataset { training: bool, validation: bool },
}

impl Cli {
    pub fn training(&self) -> bool {
        !self.train.is_empty()
    }

    pub fn validation(&self) -> bool {
        !self.validate.is_empty()
    }

    /// Checks option combinations before anything is loaded.
    pub fn mode(&self) -> Result<Mode> {
        let training = self.training();
        let validation = self.validation();
        let inference = self.input.is_some();

        if !inference && !training && !validation && self.type_info && self.cnn.is_none() {
            return Ok(Mode::TypeInfoOnly);
        }
        if self.cnn.is_none() {
            return Err(config("network topology file required (-c/--cnn)"));
        }
        if !validation && (self.validate_offset.is_some() || self.validate_num.is_some()) {
            return Err(config("cannot set validation num/offset without setting validation files"));
        }
        if self.keep_best && self.do_not_save {
            return Err(config("cannot keep best if saving is not enabled"));
        }
        if self.keep_best && !self.periodic_validation {
            return Err(config("cannot keep best if periodic validation is not enabled"));
        }
        if self.keep_best && !validation {
            return Err(config("cannot keep best without validation files"));
        }
        match (&self.input, training || validation) {
            (None, false) => Err(config(
                "no mode chosen, choose either inference, training and/or validation",
            )),
            (Some(_), true) => Err(config("cannot run input mode along validation/training")),
            (Some(_), false) if self.training_options_given() => {
                Err(config("invalid combination of options for inference mode"))
            }
            (Some(input), false) => Ok(Mode::Inference(input.clone())),
            (None, true) => Ok(Mode::Dataset { training, validation }),
        }
    }

    /// Whether any training or validation option differs from its default.
    fn training_options_given(&self) -> bool {
        self.validate_offset.is_some()
            || self.validate_num.is_some()
            || self.train_offset != 0
            || self.train_num != 0
            || self.seed.is_some()
            || self.epochs != 1
            || self.learning_rate != DEFAULT_LEARNING_RATE
            || self.weight_decay != 0.0
            || self.batch_size != 1
            || self.do_not_load
            || self.do_not_save
            || self.optimizer != OptimizerType::Sgd
            || self.loss_function != LossType::MeanSquaredError
            || self.periodic_validation
            || self.periodic_output.is_some()
            || self.shuffle
            || self.keep_best
    }

    pub fn training_settings(&self) -> TrainingSettings {
        TrainingSettings {
            epochs: self.epochs,
            batch_size: self.batch_size,
            error_output_rate: self.periodic_output.unwrap_or(0),
            periodic_validation: self.periodic_validation,
            shuffle: self.shuffle,
        }
    }
}

fn config(message: &str) -> CnnError {
    CnnError::Configuration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("typecnn").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_training_settings_defaults() {
        let cli = parse(&["-c", "net.json", "-t", "train.bin"]);
        assert_eq!(cli.training_settings(), TrainingSettings::default());
        assert_eq!(cli.optimizer, OptimizerType::Sgd);
        assert_eq!(cli.loss_function, LossType::MeanSquaredError);
        assert_eq!(cli.mode().unwrap(), Mode::Dataset { training: true, validation: false });
    }

    #[test]
    fn several_files_per_flag() {
        let cli = parse(&["-c", "n.json", "-v", "a.bin", "b.bin", "--validate-num", "5"]);
        assert_eq!(cli.validate.len(), 2);
        assert_eq!(cli.validate_num, Some(5));
        assert!(cli.mode().is_ok());
    }

    #[test]
    fn a_mode_is_required() {
        assert!(parse(&["-c", "n.json"]).mode().is_err());
        assert_eq!(parse(&["--type-info"]).mode().unwrap(), Mode::TypeInfoOnly);
    }

    #[test]
    fn inference_excludes_other_modes() {
        let cli = parse(&["-c", "n.json", "-i", "digit.png", "-v", "val.bin"]);
        assert!(matches!(cli.mode(), Err(CnnError::Configuration(_))));
    }

    #[test]
    fn validation_window_needs_files() {
        let cli = parse(&["-c", "n.json", "-t", "t.bin", "--validate-offset", "10"]);
        assert!(matches!(cli.mode(), Err(CnnError::Configuration(_))));
    }

    #[test]
    fn inference_rejects_training_options() {
        let cli = parse(&["-c", "n.json", "-i", "img.png", "-e", "5", "--shuffle"]);
        assert!(matches!(cli.mode(), Err(CnnError::Configuration(_))));
        let cli = parse(&["-c", "n.json", "-i", "img.png", "--optimizer", "adam"]);
        assert!(matches!(cli.mode(), Err(CnnError::Configuration(_))));
        let cli = parse(&["-c", "n.json", "-g", "-i", "img.png"]);
        assert_eq!(cli.mode().unwrap(), Mode::Inference("img.png".into()));
    }

    #[test]
    fn unknown_optimizer_fails_to_parse() {
        let args = ["typecnn", "-c", "n.json", "-t", "t.bin", "--optimizer", "rmsprop"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
