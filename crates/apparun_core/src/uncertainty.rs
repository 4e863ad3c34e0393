//! Monte Carlo uncertainty propagation
//!
//! Draws assignments for the free stochastic parameters, evaluates the model
//! for each of them and summarizes every quantity's samples.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::{FailurePolicy, UncertaintyConfig};
use crate::error::RunError;
use crate::evaluate::{Outcome, completed_prefix, evaluate_many};
use crate::model::{Assignment, DistributionResult, Model, QuantityDistribution};
use crate::progress::{RunControl, RunProgress};
use crate::stats::summarize;

/// Propagate parameter uncertainty through the model.
///
/// Parameters named in `pinned` keep that value in every sample. Numeric
/// failures follow `config.on_error`; any other failure aborts the run.
/// When the timeout passes, the run keeps the longest prefix of samples that
/// finished and marks the result truncated. Cancelling through `progress`
/// fails the run.
pub fn run(
    model: &Model,
    pinned: &Assignment,
    config: &UncertaintyConfig,
    progress: Option<&RunProgress>,
) -> Result<DistributionResult, RunError> {
    config.validate().map_err(RunError::InvalidConfig)?;

    let samples = model.registry().sample(pinned, config.n_samples, config.seed)?;
    debug!(
        n_samples = config.n_samples,
        seed = config.seed,
        free = model.registry().free_stochastic(pinned).len(),
        "starting uncertainty run"
    );

    if let Some(progress) = progress {
        progress.reset(samples.len());
    }
    let control = RunControl::new(progress, config.timeout());
    let outcomes = evaluate_many(model, &samples, &control);

    if control.is_cancelled() {
        return Err(RunError::Cancelled {
            completed: completed_prefix(&outcomes),
        });
    }
    summarize_outcomes(model.quantity_names(), config, &outcomes)
}

/// Summarize the evaluated prefix of `outcomes`, whose values are indexed
/// like `names`
pub(crate) fn summarize_outcomes(
    names: &[String],
    config: &UncertaintyConfig,
    outcomes: &[Outcome],
) -> Result<DistributionResult, RunError> {
    let completed = completed_prefix(outcomes);
    let truncated = completed < outcomes.len();
    if truncated {
        warn!(completed, requested = config.n_samples, "uncertainty run hit its deadline");
    }
    if completed == 0 {
        return Err(RunError::DeadlineExceeded);
    }

    let mut kept: Vec<&[f64]> = Vec::with_capacity(completed);
    let mut dropped = Vec::new();
    for (index, outcome) in outcomes[..completed].iter().enumerate() {
        match outcome {
            Outcome::Done(values) => kept.push(values),
            Outcome::Failed(err) if err.is_numeric() && config.on_error == FailurePolicy::Drop => {
                warn!(index, error = %err, "dropping failed sample");
                dropped.push(index);
            }
            Outcome::Failed(err) => {
                return Err(RunError::Sample {
                    index,
                    source: err.clone(),
                });
            }
            Outcome::Skipped => break,
        }
    }
    if kept.is_empty() {
        return Err(RunError::NoSuccessfulSamples {
            dropped: dropped.len(),
        });
    }

    let quantities: BTreeMap<String, QuantityDistribution> = names
        .iter()
        .enumerate()
        .map(|(q, name)| {
            let samples: Vec<f64> = kept.iter().map(|values| values[q]).collect();
            let summary = summarize(&samples, &config.percentiles);
            (name.clone(), QuantityDistribution { samples, summary })
        })
        .collect();

    debug!(
        completed,
        dropped = dropped.len(),
        truncated,
        "uncertainty run finished"
    );

    Ok(DistributionResult {
        seed: config.seed,
        requested_samples: config.n_samples,
        completed_samples: completed,
        dropped,
        truncated,
        quantities,
    })
}
