//! Global sensitivity analysis
//!
//! Ranks the free stochastic parameters by how much each drives the
//! variation of the chosen outputs:
//! 1. A [`DesignGenerator`] fills the unit hypercube with base rows
//! 2. An [`ImportanceEstimator`] expands each row into evaluation points
//! 3. Points are mapped onto parameter values through inverse CDFs and the
//!    model is evaluated at each of them
//! 4. Indices are estimated per output, with bootstrap confidence intervals
//!    over design rows

mod design;
mod estimator;

pub use design::{DesignGenerator, RandomDesign, SobolDesign, SobolSequence};
pub use estimator::{
    EvaluatedRow, ImportanceEstimator, Indices, SobolEstimator, SpearmanEstimator,
};

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{debug, warn};

use crate::config::{BootstrapConfig, FailurePolicy, SensitivityConfig};
use crate::error::SensitivityError;
use crate::evaluate::{Outcome, completed_prefix, evaluate_many};
use crate::model::{
    Assignment, IndexEstimate, Model, ParameterImportance, QuantityId, SensitivityResult,
};
use crate::progress::{RunControl, RunProgress};
use crate::stats::percentile;

/// Offsets the bootstrap stream from the design stream of the same seed
const BOOTSTRAP_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Rank free stochastic parameters by importance for each output.
///
/// Parameters named in `pinned` are held at that value and left out of the
/// analysis. Rows whose evaluations fail numerically are dropped as a whole
/// under [`FailurePolicy::Drop`]; any other failure aborts.
pub fn rank(
    model: &Model,
    pinned: &Assignment,
    config: &SensitivityConfig,
    progress: Option<&RunProgress>,
) -> Result<SensitivityResult, SensitivityError> {
    config.validate().map_err(SensitivityError::InvalidConfig)?;

    let outputs = resolve_outputs(model, &config.outputs)?;
    let registry = model.registry();
    let base = registry.complete(pinned)?;
    let free = registry.free_stochastic(pinned);
    let d = free.len();
    if d == 0 {
        return Err(SensitivityError::NoFreeParameters);
    }

    let estimator = config.method.estimator();
    let required = estimator.minimum_rows(d);
    let insufficient = |provided: usize| SensitivityError::InsufficientSamples {
        method: config.method.name(),
        parameters: d,
        required,
        provided,
    };
    if config.n_samples < required {
        return Err(insufficient(config.n_samples));
    }

    let generator = config.design.generator();
    let dims = estimator.design_dims(d);
    if dims > generator.max_dimensions() {
        return Err(SensitivityError::DesignDimensions {
            required: dims,
            supported: generator.max_dimensions(),
        });
    }

    let width = estimator.points_per_row(d);
    let mut points = Vec::with_capacity(config.n_samples * width);
    for row in generator.generate(config.n_samples, dims, config.seed) {
        estimator.expand_row(&row, d, &mut points);
    }
    let assignments: Vec<Assignment> = points
        .iter()
        .map(|point| registry.sample_unit(&base, &free, point))
        .collect();

    debug!(
        method = config.method.name(),
        parameters = d,
        rows = config.n_samples,
        evaluations = assignments.len(),
        "starting sensitivity analysis"
    );

    if let Some(progress) = progress {
        progress.reset(assignments.len());
    }
    let control = RunControl::new(progress, config.timeout());
    let outcomes = evaluate_many(model, &assignments, &control);

    let evaluated = completed_prefix(&outcomes);
    if control.is_cancelled() {
        return Err(SensitivityError::Cancelled {
            completed: evaluated,
        });
    }
    let RowOutcomes {
        kept,
        dropped_rows,
        complete_rows,
    } = split_rows(&outcomes, width, config.on_error)?;
    let truncated = complete_rows < config.n_samples;
    if truncated {
        warn!(complete_rows, requested = config.n_samples, "sensitivity analysis hit its deadline");
    }
    if kept.len() < required {
        return Err(insufficient(kept.len()));
    }

    let resamples = bootstrap_resamples(kept.len(), &config.bootstrap, config.seed);
    let parameter_names: Vec<String> = free
        .iter()
        .map(|&id| registry.parameter(id).name.clone())
        .collect();

    let mut results = BTreeMap::new();
    for &(name, q) in &outputs {
        let per_row: Vec<Vec<f64>> = kept
            .iter()
            .map(|(_, values)| values.iter().map(|v| v[q.index()]).collect())
            .collect();
        let rows: Vec<EvaluatedRow<'_>> = kept
            .iter()
            .zip(&per_row)
            .map(|((row, _), outputs)| EvaluatedRow {
                point: &points[row * width],
                outputs,
            })
            .collect();

        let estimates = estimator.estimate(&rows, d);
        let replicates: Vec<Vec<Indices>> = resamples
            .iter()
            .map(|sample| {
                let rows: Vec<EvaluatedRow<'_>> = sample.iter().map(|&i| rows[i]).collect();
                estimator.estimate(&rows, d)
            })
            .collect();

        let importances = parameter_names
            .iter()
            .enumerate()
            .map(|(p, parameter)| {
                let interval = |pick: fn(&Indices) -> Option<f64>| {
                    let value = pick(&estimates[p])?;
                    let draws: Vec<f64> = replicates.iter().filter_map(|r| pick(&r[p])).collect();
                    Some(confidence_interval(value, &draws, config.bootstrap.confidence))
                };
                ParameterImportance {
                    parameter: parameter.clone(),
                    first_order: interval(|i| i.first_order),
                    total_order: interval(|i| i.total_order),
                    rank_correlation: interval(|i| i.rank_correlation),
                }
            })
            .collect();
        results.insert(name.to_string(), importances);
    }

    debug!(
        used_rows = kept.len(),
        dropped = dropped_rows.len(),
        truncated,
        "sensitivity analysis finished"
    );

    Ok(SensitivityResult {
        method: estimator.method(),
        seed: config.seed,
        base_samples: config.n_samples,
        used_samples: kept.len(),
        evaluations: evaluated,
        dropped_rows,
        truncated,
        parameters: parameter_names,
        outputs: results,
    })
}

/// Output quantities to analyze; all of them when none are named
fn resolve_outputs<'a>(
    model: &'a Model,
    requested: &'a [String],
) -> Result<Vec<(&'a str, QuantityId)>, SensitivityError> {
    if requested.is_empty() {
        return Ok(model
            .quantity_names()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), QuantityId(i as u32)))
            .collect());
    }
    requested
        .iter()
        .map(|name| {
            model
                .graph()
                .lookup(name)
                .map(|id| (name.as_str(), id))
                .ok_or_else(|| SensitivityError::UnknownOutput(name.clone()))
        })
        .collect()
}

/// Row indices of each bootstrap replicate, drawn with replacement
fn bootstrap_resamples(rows: usize, config: &BootstrapConfig, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = Pcg64::seed_from_u64(seed ^ BOOTSTRAP_STREAM);
    (0..config.resamples)
        .map(|_| (0..rows).map(|_| rng.random_range(0..rows)).collect())
        .collect()
}

/// Percentile interval of the bootstrap draws around a point estimate
fn confidence_interval(value: f64, draws: &[f64], confidence: f64) -> IndexEstimate {
    if draws.is_empty() {
        return IndexEstimate {
            value,
            conf_low: value,
            conf_high: value,
        };
    }
    let tail = (1.0 - confidence) / 2.0;
    IndexEstimate {
        value,
        conf_low: percentile(draws, tail),
        conf_high: percentile(draws, 1.0 - tail),
    }
}

/// Design rows of an evaluated run
#[derive(Debug)]
pub(crate) struct RowOutcomes<'a> {
    /// Rows whose every evaluation succeeded, with their values per point
    kept: Vec<(usize, Vec<&'a [f64]>)>,
    dropped_rows: Vec<usize>,
    /// Rows fully inside the evaluated prefix
    complete_rows: usize,
}

/// Group `outcomes` into rows of `width` points. Rows cut by a deadline are
/// left out entirely.
pub(crate) fn split_rows(
    outcomes: &[Outcome],
    width: usize,
    on_error: FailurePolicy,
) -> Result<RowOutcomes<'_>, SensitivityError> {
    let complete_rows = completed_prefix(outcomes) / width;
    let mut kept = Vec::with_capacity(complete_rows);
    let mut dropped_rows = Vec::new();
    'rows: for row in 0..complete_rows {
        let mut values = Vec::with_capacity(width);
        for (offset, outcome) in outcomes[row * width..(row + 1) * width].iter().enumerate() {
            match outcome {
                Outcome::Done(v) => values.push(v.as_slice()),
                Outcome::Failed(err) if err.is_numeric() && on_error == FailurePolicy::Drop => {
                    warn!(row, error = %err, "dropping failed design row");
                    dropped_rows.push(row);
                    continue 'rows;
                }
                Outcome::Failed(err) => {
                    return Err(SensitivityError::Sample {
                        index: row * width + offset,
                        source: err.clone(),
                    });
                }
                Outcome::Skipped => continue 'rows,
            }
        }
        kept.push((row, values));
    }
    Ok(RowOutcomes {
        kept,
        dropped_rows,
        complete_rows,
    })
}
