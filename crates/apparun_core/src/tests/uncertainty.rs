//! Tests for Monte Carlo uncertainty propagation
//!
//! These tests verify that:
//! - Runs are reproducible by seed and differ across seeds
//! - Pinned parameters hold their value in every sample
//! - Numeric failures follow the explicit failure policy
//! - Timeouts truncate at sample boundaries and cancellation fails the run

use std::time::Duration;

use crate::config::{FailurePolicy, ModelBuilder, UncertaintyConfig};
use crate::error::{AssignmentError, EvalError, NumericError, RunError};
use crate::evaluate::{Outcome, evaluate_many};
use crate::model::{Assignment, Distribution, Model, Parameter};
use crate::progress::{RunControl, RunProgress};
use crate::stats::summarize;
use crate::uncertainty::{run, summarize_outcomes};

fn product_model() -> Model {
    ModelBuilder::new()
        .parameter(
            Parameter::float("mass", 2.0).with_distribution(Distribution::Normal {
                mean: 2.0,
                std_dev: 0.2,
                min: Some(0.0),
                max: None,
            }),
        )
        .parameter(
            Parameter::float("factor", 1.5)
                .with_distribution(Distribution::Uniform { min: 1.0, max: 2.0 }),
        )
        .parameter(Parameter::float("distance", 100.0))
        .quantity("production", "mass * factor")
        .quantity("transport", "mass * distance * 0.001")
        .quantity("total", "production + transport")
        .build()
        .unwrap()
}

/// `y = 10 / x` with `x` drawn uniformly from `values`
fn reciprocal_model(values: Vec<f64>) -> Model {
    ModelBuilder::new()
        .parameter(Parameter::float("x", 1.0).with_distribution(Distribution::Discrete {
            values,
            weights: None,
        }))
        .quantity("y", "10 / x")
        .build()
        .unwrap()
}

#[test]
fn test_runs_are_reproducible_by_seed() {
    let model = product_model();
    let config = UncertaintyConfig::new(500, FailurePolicy::Abort).with_seed(7);

    let a = run(&model, &Assignment::new(), &config, None).unwrap();
    let b = run(&model, &Assignment::new(), &config, None).unwrap();
    assert_eq!(a, b);

    let c = run(&model, &Assignment::new(), &config.clone().with_seed(8), None).unwrap();
    assert_ne!(a.get("total").unwrap().samples, c.get("total").unwrap().samples);
}

#[test]
fn test_summary_statistics() {
    let model = product_model();
    let config = UncertaintyConfig::new(2000, FailurePolicy::Abort)
        .with_seed(1)
        .with_percentiles(vec![0.1, 0.5, 0.9]);
    let result = run(&model, &Assignment::new(), &config, None).unwrap();

    assert_eq!(result.requested_samples, 2000);
    assert_eq!(result.completed_samples, 2000);
    assert_eq!(result.kept_samples(), 2000);
    assert!(result.dropped.is_empty());
    assert!(!result.truncated);
    assert_eq!(result.quantities.len(), 3);

    let total = result.get("total").unwrap();
    assert_eq!(total.samples.len(), 2000);
    let summary = &total.summary;
    // E[mass * factor] + E[mass] * 0.1 = 3.0 + 0.2
    assert!((summary.mean - 3.2).abs() < 0.05, "mean {}", summary.mean);
    assert!(summary.min <= summary.percentile(0.1).unwrap());
    assert!(summary.percentile(0.1).unwrap() <= summary.median);
    assert_eq!(summary.percentile(0.5), Some(summary.median));
    assert!(summary.median <= summary.percentile(0.9).unwrap());
    assert!(summary.percentile(0.9).unwrap() <= summary.max);
    assert_eq!(summary.percentile(0.25), None);

    // Samples stay aligned across quantities
    let production = &result.get("production").unwrap().samples;
    let transport = &result.get("transport").unwrap().samples;
    for i in 0..total.samples.len() {
        assert_eq!(total.samples[i], production[i] + transport[i]);
    }
}

#[test]
fn test_pinned_parameters_hold() {
    let model = product_model();
    let config = UncertaintyConfig::new(200, FailurePolicy::Abort).with_seed(3);
    let pinned = Assignment::new().with("mass", 2.5).with("distance", 40.0);
    let result = run(&model, &pinned, &config, None).unwrap();

    let transport = &result.get("transport").unwrap().summary;
    assert!((transport.mean - 0.1).abs() < 1e-12);
    assert!(transport.std_dev < 1e-12);

    let production = &result.get("production").unwrap().summary;
    assert!(production.min >= 2.5 && production.max < 5.0);
    assert!(production.std_dev > 0.0);
}

#[test]
fn test_invalid_inputs() {
    let model = product_model();
    let config = UncertaintyConfig::new(10, FailurePolicy::Abort);

    let err = run(&model, &Assignment::new().with("speed", 1.0), &config, None).unwrap_err();
    assert_eq!(
        err,
        RunError::Assignment(AssignmentError::UnknownParameter {
            name: "speed".to_string()
        })
    );

    let zero = UncertaintyConfig::new(0, FailurePolicy::Abort);
    assert!(matches!(
        run(&model, &Assignment::new(), &zero, None),
        Err(RunError::InvalidConfig(_))
    ));
}

#[test]
fn test_abort_policy_fails_on_first_numeric_error() {
    let model = reciprocal_model(vec![0.0, 1.0, 2.0]);
    let abort = UncertaintyConfig::new(100, FailurePolicy::Abort).with_seed(11);
    let drop = UncertaintyConfig::new(100, FailurePolicy::Drop).with_seed(11);

    let dropped = run(&model, &Assignment::new(), &drop, None).unwrap().dropped;
    assert!(!dropped.is_empty());

    let err = run(&model, &Assignment::new(), &abort, None).unwrap_err();
    assert_eq!(
        err,
        RunError::Sample {
            index: dropped[0],
            source: EvalError::Numeric {
                quantity: "y".to_string(),
                source: NumericError::DivisionByZero,
            },
        }
    );
}

#[test]
fn test_drop_policy_reports_dropped_samples() {
    let model = reciprocal_model(vec![0.0, 1.0, 2.0]);
    let config = UncertaintyConfig::new(300, FailurePolicy::Drop).with_seed(5);
    let result = run(&model, &Assignment::new(), &config, None).unwrap();

    assert_eq!(result.completed_samples, 300);
    assert!(result.dropped.len() > 50 && result.dropped.len() < 150);
    assert!(result.dropped.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(result.kept_samples(), 300 - result.dropped.len());

    let y = result.get("y").unwrap();
    assert_eq!(y.samples.len(), result.kept_samples());
    assert!(y.samples.iter().all(|&v| v == 10.0 || v == 5.0));
}

#[test]
fn test_every_sample_dropped() {
    let model = reciprocal_model(vec![0.0]);
    let config = UncertaintyConfig::new(20, FailurePolicy::Drop);
    assert_eq!(
        run(&model, &Assignment::new(), &config, None).unwrap_err(),
        RunError::NoSuccessfulSamples { dropped: 20 }
    );
}

#[test]
fn test_progress_counts_every_sample() {
    let model = product_model();
    let progress = RunProgress::new();
    let config = UncertaintyConfig::new(64, FailurePolicy::Abort);
    run(&model, &Assignment::new(), &config, Some(&progress)).unwrap();
    assert_eq!(progress.total(), 64);
    assert_eq!(progress.completed(), 64);
    assert_eq!(progress.fraction(), 1.0);
}

#[test]
fn test_cancelled_run_fails() {
    let model = product_model();
    let progress = RunProgress::new();
    progress.cancel();
    let config = UncertaintyConfig::new(64, FailurePolicy::Abort);
    assert_eq!(
        run(&model, &Assignment::new(), &config, Some(&progress)).unwrap_err(),
        RunError::Cancelled { completed: 0 }
    );
}

#[test]
fn test_timeout() {
    let model = product_model();

    let expired = UncertaintyConfig::new(64, FailurePolicy::Abort).with_timeout(Duration::ZERO);
    assert_eq!(
        run(&model, &Assignment::new(), &expired, None).unwrap_err(),
        RunError::DeadlineExceeded
    );

    let generous =
        UncertaintyConfig::new(64, FailurePolicy::Abort).with_timeout(Duration::from_secs(600));
    let result = run(&model, &Assignment::new(), &generous, None).unwrap();
    assert!(!result.truncated);
    assert_eq!(result.completed_samples, 64);
}

#[test]
fn test_unbounded_timeout_completes() {
    let model = product_model();
    let mut config = UncertaintyConfig::new(32, FailurePolicy::Abort);
    config.timeout_secs = Some(1e19);
    let result = run(&model, &Assignment::new(), &config, None).unwrap();
    assert!(!result.truncated);
    assert_eq!(result.completed_samples, 32);
}

#[test]
fn test_truncated_outcomes_keep_the_finished_prefix() {
    let names = ["a".to_string(), "b".to_string()];
    let config = UncertaintyConfig::new(3, FailurePolicy::Abort).with_percentiles(vec![0.5]);
    let outcomes = [
        Outcome::Done(vec![1.0, 10.0]),
        Outcome::Done(vec![3.0, 30.0]),
        Outcome::Skipped,
    ];
    let result = summarize_outcomes(&names, &config, &outcomes).unwrap();

    assert!(result.truncated);
    assert_eq!(result.requested_samples, 3);
    assert_eq!(result.completed_samples, 2);
    assert!(result.dropped.is_empty());
    let a = result.get("a").unwrap();
    assert_eq!(a.samples, vec![1.0, 3.0]);
    assert_eq!(a.summary.mean, 2.0);
    assert_eq!((a.summary.min, a.summary.max), (1.0, 3.0));
    assert_eq!(result.get("b").unwrap().summary.mean, 20.0);

    // A sample finished after the first skipped one is not kept
    let scattered = [
        Outcome::Done(vec![1.0, 10.0]),
        Outcome::Skipped,
        Outcome::Done(vec![5.0, 50.0]),
    ];
    let result = summarize_outcomes(&names, &config, &scattered).unwrap();
    assert_eq!(result.completed_samples, 1);
    assert_eq!(result.get("a").unwrap().samples, vec![1.0]);

    assert_eq!(
        summarize_outcomes(&names, &config, &[Outcome::Skipped, Outcome::Skipped]).unwrap_err(),
        RunError::DeadlineExceeded
    );
}

#[test]
fn test_truncated_outcomes_follow_the_failure_policy() {
    let names = ["y".to_string()];
    let failed = Outcome::Failed(EvalError::Numeric {
        quantity: "y".to_string(),
        source: NumericError::DivisionByZero,
    });
    let outcomes = [Outcome::Done(vec![4.0]), failed, Outcome::Skipped, Outcome::Skipped];

    let drop = UncertaintyConfig::new(4, FailurePolicy::Drop);
    let result = summarize_outcomes(&names, &drop, &outcomes).unwrap();
    assert!(result.truncated);
    assert_eq!(result.completed_samples, 2);
    assert_eq!(result.dropped, vec![1]);
    assert_eq!(result.kept_samples(), 1);
    assert_eq!(result.get("y").unwrap().samples, vec![4.0]);

    let abort = UncertaintyConfig::new(4, FailurePolicy::Abort);
    assert!(matches!(
        summarize_outcomes(&names, &abort, &outcomes),
        Err(RunError::Sample { index: 1, .. })
    ));
}

#[test]
fn test_deadline_mid_run_keeps_sampled_prefix() {
    let model = product_model();
    let config = UncertaintyConfig::new(10, FailurePolicy::Abort).with_seed(4);
    let full = run(&model, &Assignment::new(), &config, None).unwrap();

    // The same draws as the run, with the deadline passing after four samples
    let samples = model.registry().sample(&Assignment::new(), 10, 4).unwrap();
    let mut outcomes = evaluate_many(&model, &samples, &RunControl::new(None, None));
    for outcome in &mut outcomes[4..] {
        *outcome = Outcome::Skipped;
    }
    let truncated = summarize_outcomes(model.quantity_names(), &config, &outcomes).unwrap();

    assert!(truncated.truncated);
    assert_eq!(truncated.completed_samples, 4);
    assert_eq!(truncated.requested_samples, 10);
    assert_eq!(truncated.seed, 4);
    for (name, distribution) in &truncated.quantities {
        let prefix = &full.get(name).unwrap().samples[..4];
        assert_eq!(distribution.samples, prefix);
        assert_eq!(distribution.summary, summarize(prefix, &config.percentiles));
    }
}
