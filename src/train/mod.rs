pub mod epoch_stats;
pub mod keep_best;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;
pub mod validation;

pub use epoch_stats::{EpochReport, TrainingSummary};
pub use keep_best::KeepBest;
pub use loop_fn::{epoch_order, train_loop};
pub use train_config::TrainingSettings;
pub use trainer::train_sample;
pub use validation::ValidationReport;
