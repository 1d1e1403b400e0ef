use std::cell::RefCell;
use std::rc::Rc;

use typecnn::activation::ActivationFunction;
use typecnn::data::Sample;
use typecnn::error::CnnError;
use typecnn::loss::LossType;
use typecnn::math::{Dimensions, Tensor};
use typecnn::network::{LayerSpec, Network, NetworkSpec};
use typecnn::numeric::{DoublePrecision, Mixed, NumericPolicy, Scalar};
use typecnn::optim::{Adam, OptimizerType, Sgd};
use typecnn::train::{KeepBest, TrainingSettings};

type P = DoublePrecision;

fn sample<Q: NumericPolicy>(input: &[f64], target: &[f64]) -> Sample<Q> {
    Sample::new(
        Tensor::from_f64(Dimensions::flat(input.len()).unwrap(), input).unwrap(),
        target.iter().map(|&t| Q::Forward::from_f64_lossy(t)).collect(),
    )
}

/// Two inputs, one identity output, all weights zero.
fn identity_network() -> Network<P> {
    let spec = NetworkSpec::new("identity", Dimensions::flat(2).unwrap())
        .layer(LayerSpec::FullyConnected { outputs: 1 })
        .layer(LayerSpec::Activation { function: ActivationFunction::Identity });
    let mut net = Network::<P>::from_spec(&spec, 0).unwrap();
    for buffer in net.weights_mut() {
        buffer.values_mut().iter_mut().for_each(|w| *w = 0.0);
    }
    net
}

fn two_samples() -> Vec<Sample<P>> {
    vec![sample(&[1.0, 0.0], &[1.0]), sample(&[0.0, 1.0], &[0.0])]
}

fn small_classifier<Q: NumericPolicy>(seed: u64) -> Network<Q> {
    let spec = NetworkSpec::new("classifier", Dimensions::new(4, 4, 1).unwrap())
        .layer(LayerSpec::Convolution { kernel_size: 3, stride: 1, padding: 1, kernels: 2 })
        .layer(LayerSpec::Activation { function: ActivationFunction::Tanh })
        .layer(LayerSpec::MaxPooling { size: 2, stride: 2 })
        .layer(LayerSpec::FullyConnected { outputs: 2 })
        .layer(LayerSpec::Activation { function: ActivationFunction::Sigmoid });
    Network::from_spec(&spec, seed).unwrap()
}

/// Bright-left versus bright-right 4x4 images.
fn stripes<Q: NumericPolicy>(n: usize) -> Vec<Sample<Q>> {
    let dims = Dimensions::new(4, 4, 1).unwrap();
    (0..n)
        .map(|i| {
            let left = i % 2 == 0;
            let shade = 0.6 + 0.04 * (i % 5) as f64;
            let pixels: Vec<f64> = (0..16)
                .map(|p| if (p % 4 < 2) == left { shade } else { 0.1 })
                .collect();
            let label = if left { 0 } else { 1 };
            Sample::one_hot(Tensor::from_f64(dims, &pixels).unwrap(), label, 2).unwrap()
        })
        .collect()
}

fn snapshot<Q: NumericPolicy>(net: &Network<Q>) -> Vec<Vec<f64>> {
    net.weights()
        .iter()
        .map(|b| b.values().iter().map(|v| v.to_f64_lossy()).collect())
        .collect()
}

#[test]
fn one_epoch_of_sgd_reduces_loss() {
    let mut net = identity_network();
    let data = two_samples();
    let before = net.validate(&data).unwrap().average_loss;
    assert!((before - 0.25).abs() < 1e-12);

    let mut sgd = Sgd::<P>::new(0.1);
    net.train(&TrainingSettings::default(), &data, LossType::MeanSquaredError, &mut sgd, None)
        .unwrap();

    let after = net.validate(&data).unwrap().average_loss;
    assert!(after < before, "{} !< {}", after, before);
    let w = snapshot(&net);
    assert!((w[0][0] - 0.1).abs() < 1e-12);
    assert!((w[0][1] + 0.01).abs() < 1e-12);
    assert!((w[1][0] - 0.09).abs() < 1e-12);
}

#[test]
fn optimizer_sees_batch_mean() {
    let mut net = identity_network();
    let settings = TrainingSettings { batch_size: 2, ..TrainingSettings::default() };
    let mut sgd = Sgd::<P>::new(0.1);
    net.train(&settings, &two_samples(), LossType::MeanSquaredError, &mut sgd, None)
        .unwrap();
    let w = snapshot(&net);
    assert!((w[0][0] - 0.05).abs() < 1e-12);
    assert_eq!(w[0][1], 0.0);
    assert!((w[1][0] - 0.05).abs() < 1e-12);
}

#[test]
fn fixed_seed_gives_identical_weights() {
    let data = stripes::<P>(12);
    let settings = TrainingSettings { epochs: 3, batch_size: 4, ..TrainingSettings::default() };
    let run = || {
        let mut net = small_classifier::<P>(5);
        let mut adam = Adam::<P>::new(0.01);
        net.train(&settings, &data, LossType::CrossEntropy, &mut adam, None)
            .unwrap();
        snapshot(&net)
    };
    assert_eq!(run(), run());
}

#[test]
fn shuffling_is_seeded_and_changes_the_result() {
    let data = stripes::<P>(10);
    let run = |shuffle: bool| {
        let settings = TrainingSettings { epochs: 2, shuffle, ..TrainingSettings::default() };
        let mut net = small_classifier::<P>(8);
        let mut sgd = Sgd::<P>::new(0.5);
        net.train(&settings, &data, LossType::MeanSquaredError, &mut sgd, None)
            .unwrap();
        snapshot(&net)
    };
    let shuffled = run(true);
    assert_eq!(shuffled, run(true));
    assert_ne!(shuffled, run(false));
}

#[test]
fn empty_dataset_fails_without_touching_weights() {
    let mut net = small_classifier::<P>(1);
    let before = snapshot(&net);
    let mut sgd = Sgd::<P>::new(0.1);
    let err = net
        .train(&TrainingSettings::default(), &[], LossType::MeanSquaredError, &mut sgd, None)
        .unwrap_err();
    assert!(matches!(err, CnnError::EmptyDataset(_)));
    assert_eq!(snapshot(&net), before);
}

#[test]
fn target_length_mismatch_fails_before_first_update() {
    let mut net = small_classifier::<P>(1);
    let before = snapshot(&net);
    let mut data = stripes::<P>(4);
    data[3].target.push(0.0);
    let mut sgd = Sgd::<P>::new(0.1);
    let err = net
        .train(&TrainingSettings::default(), &data, LossType::MeanSquaredError, &mut sgd, None)
        .unwrap_err();
    assert!(matches!(err, CnnError::Data(_)));
    assert_eq!(snapshot(&net), before);
}

#[test]
fn input_shape_mismatch_fails_before_first_update() {
    let mut net = identity_network();
    let mut data = two_samples();
    data.push(sample(&[1.0, 1.0, 1.0], &[0.0]));
    let settings = TrainingSettings { batch_size: 2, ..TrainingSettings::default() };
    let mut sgd = Sgd::<P>::new(0.1);
    let err = net
        .train(&settings, &data, LossType::MeanSquaredError, &mut sgd, None)
        .unwrap_err();
    assert!(matches!(err, CnnError::Data(_)));
    for buffer in net.weights() {
        assert!(buffer.values().iter().all(|&w| w == 0.0));
        assert_eq!(buffer.samples(), 0);
    }

    // the same network still trains normally afterwards
    data.pop();
    net.train(&settings, &data, LossType::MeanSquaredError, &mut sgd, None)
        .unwrap();
    let w = snapshot(&net);
    assert!((w[0][0] - 0.05).abs() < 1e-12);
}

#[test]
fn zero_batch_size_is_rejected() {
    let mut net = identity_network();
    let settings = TrainingSettings { batch_size: 0, ..TrainingSettings::default() };
    let mut sgd = Sgd::<P>::new(0.1);
    let err = net
        .train(&settings, &two_samples(), LossType::MeanSquaredError, &mut sgd, None)
        .unwrap_err();
    assert!(matches!(err, CnnError::Configuration(_)));
}

#[test]
fn periodic_validation_reports_every_epoch() {
    let mut net = small_classifier::<P>(3);
    let training = stripes::<P>(8);
    let validation = stripes::<P>(4);
    let settings = TrainingSettings {
        epochs: 3,
        periodic_validation: true,
        ..TrainingSettings::default()
    };
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    net.set_on_epoch_finished(move |report, settings, _| {
        assert!(settings.periodic_validation);
        log.borrow_mut().push(report.epoch);
        Ok(())
    });
    let mut opt = OptimizerType::Momentum.build::<P>();
    let summary = net
        .train(&settings, &training, LossType::MeanSquaredError, opt.as_mut(), Some(&validation))
        .unwrap();

    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    assert_eq!(summary.epochs.len(), 3);
    for report in &summary.epochs {
        assert_eq!(report.validation_before.unwrap().samples, 4);
        assert!(report.validation_after.is_some());
        assert!(report.train_loss.is_finite());
    }
}

#[test]
fn cleared_callback_is_not_invoked() {
    let mut net = identity_network();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    net.set_on_epoch_finished(move |_, _, _| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    let settings = TrainingSettings { epochs: 2, ..TrainingSettings::default() };
    let mut sgd = Sgd::<P>::new(0.1);
    net.train(&settings, &two_samples(), LossType::MeanSquaredError, &mut sgd, None)
        .unwrap();
    assert_eq!(*calls.borrow(), 2);

    net.clear_on_epoch_finished();
    let summary = net
        .train(&settings, &two_samples(), LossType::MeanSquaredError, &mut sgd, None)
        .unwrap();
    assert_eq!(*calls.borrow(), 2);
    assert_eq!(summary.final_loss(), Some(summary.epochs[1].train_loss));
}

#[test]
fn callback_errors_stop_training() {
    let mut net = identity_network();
    net.set_on_epoch_finished(|report, _, _| {
        if report.epoch == 2 {
            return Err(CnnError::Persistence("disk full".into()));
        }
        Ok(())
    });
    let settings = TrainingSettings { epochs: 5, ..TrainingSettings::default() };
    let mut sgd = Sgd::<P>::new(0.1);
    let err = net
        .train(&settings, &two_samples(), LossType::MeanSquaredError, &mut sgd, None)
        .unwrap_err();
    assert!(matches!(err, CnnError::Persistence(_)));
}

#[test]
fn keep_best_saves_only_on_improvement() {
    let mut net = small_classifier::<P>(21);
    let training = stripes::<P>(10);
    let validation = stripes::<P>(6);
    let settings = TrainingSettings {
        epochs: 6,
        periodic_validation: true,
        shuffle: true,
        ..TrainingSettings::default()
    };

    let saved = Rc::new(RefCell::new(Vec::new()));
    let observed = Rc::new(RefCell::new(Vec::new()));
    let (saved_log, observed_log) = (Rc::clone(&saved), Rc::clone(&observed));
    let mut keep = KeepBest::new();
    net.set_on_epoch_finished(move |report, _, _| {
        let accuracy = report.validation_accuracy();
        observed_log.borrow_mut().push(accuracy);
        if keep.observe(accuracy) {
            saved_log.borrow_mut().push(accuracy);
        }
        Ok(())
    });
    let mut sgd = Sgd::<P>::new(0.5);
    net.train(&settings, &training, LossType::MeanSquaredError, &mut sgd, Some(&validation))
        .unwrap();

    let saved = saved.borrow();
    let observed = observed.borrow();
    assert_eq!(observed.len(), 6);
    assert!(!saved.is_empty());
    assert!(saved.windows(2).all(|w| w[1] > w[0]));
    let best = observed.iter().cloned().fold(f64::MIN, f64::max);
    assert_eq!(*saved.last().unwrap(), best);
}

#[test]
fn classifier_learns_stripes() {
    let mut net = small_classifier::<P>(4);
    let data = stripes::<P>(16);
    let settings = TrainingSettings { epochs: 30, batch_size: 4, ..TrainingSettings::default() };
    let mut adam = Adam::<P>::new(0.02);
    net.train(&settings, &data, LossType::CrossEntropy, &mut adam, None)
        .unwrap();
    assert_eq!(net.validate(&data).unwrap().accuracy, 1.0);
}

#[test]
fn mixed_precision_trains() {
    let mut net = small_classifier::<Mixed>(9);
    let data = stripes::<Mixed>(8);
    let before = net.validate(&data).unwrap().average_loss;
    let settings = TrainingSettings { epochs: 10, ..TrainingSettings::default() };
    let mut opt = OptimizerType::Adagrad.build::<Mixed>();
    opt.set_learning_rate(0.1);
    net.train(&settings, &data, LossType::BinaryCrossEntropy, opt.as_mut(), None)
        .unwrap();
    let after = net.validate(&data).unwrap().average_loss;
    assert!(after < before, "{} !< {}", after, before);
}

#[test]
fn input_gradient_has_input_shape() {
    let mut net = small_classifier::<P>(2);
    let input = stripes::<P>(1).remove(0);
    let out = net.forward(&input.input).unwrap();
    let grad = LossType::MeanSquaredError
        .gradient::<P>(&out, &input.target)
        .unwrap();
    let dx = net.backward(&grad).unwrap();
    assert_eq!(dx.dims(), net.input_dims());
}
