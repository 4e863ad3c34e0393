//! Command implementations

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use apparun_core::model::ModelMetadata;
use apparun_core::{
    Assignment, BatchAssignment, BatchValue, EvaluationResult, Model, ModelFormat, RunProgress,
    SensitivityConfig, SensitivityMethod, UncertaintyConfig, dump_model, evaluate, evaluate_batch,
    load_model, rank_sensitivity, run_uncertainty,
};
use color_eyre::eyre::{WrapErr, bail, eyre};
use serde::Serialize;

use crate::cli::{
    AssignmentArgs, Command, OutputFormat, PolicyArg, SensitivityArgs, UncertaintyArgs,
};
use crate::output::{emit, emit_text};
use crate::util::{format_of, read_document};

/// How often a long run logs its progress
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Run one parsed command
pub fn run(command: Command) -> color_eyre::Result<()> {
    match command {
        Command::Check { model, output } => {
            let loaded = load_model_file(&model)?;
            emit(&ModelSummary::of(&loaded), &output)
        }
        Command::Params { model, output } => {
            let loaded = load_model_file(&model)?;
            emit(&loaded.parameters(), &output)
        }
        Command::Compute {
            model,
            assignment,
            group_by,
            output,
        } => {
            let loaded = load_model_file(&model)?;
            let batch = read_assignment(&assignment)?;
            if is_broadcast(&batch) {
                let rows = evaluate_batch(&loaded, &batch)?;
                let computed: Vec<_> = rows
                    .into_iter()
                    .map(|values| Computed::new(&loaded, values, group_by.as_deref()))
                    .collect();
                emit(&computed, &output)
            } else {
                let values = evaluate(&loaded, &pinned(batch)?)?;
                emit(&Computed::new(&loaded, values, group_by.as_deref()), &output)
            }
        }
        Command::Uncertainty {
            model,
            run,
            assignment,
            output,
        } => {
            let loaded = load_model_file(&model)?;
            let pinned = pinned(read_assignment(&assignment)?)?;
            let config = uncertainty_config(&run)?;
            let mut result = with_progress("uncertainty", |progress| {
                run_uncertainty(&loaded, &pinned, &config, Some(progress))
            })?;
            if run.summary_only {
                for distribution in result.quantities.values_mut() {
                    distribution.samples.clear();
                }
            }
            emit(&result, &output)
        }
        Command::Sensitivity {
            model,
            run,
            assignment,
            output,
        } => {
            let loaded = load_model_file(&model)?;
            let pinned = pinned(read_assignment(&assignment)?)?;
            let config = sensitivity_config(&run)?;
            let result = with_progress("sensitivity", |progress| {
                rank_sensitivity(&loaded, &pinned, &config, Some(progress))
            })?;
            emit(&result, &output)
        }
        Command::Dump { model, output } => {
            let loaded = load_model_file(&model)?;
            let format = match output.format {
                OutputFormat::Json => ModelFormat::Json,
                OutputFormat::Yaml => ModelFormat::Yaml,
            };
            emit_text(&dump_model(&loaded, format)?, &output)
        }
    }
}

/// Load a model file, picking the format from its extension
pub fn load_model_file(path: &Path) -> color_eyre::Result<Model> {
    let format = format_of(path)?;
    let source =
        fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let model = load_model(&source, format)
        .wrap_err_with(|| format!("invalid model {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        parameters = model.parameters().len(),
        quantities = model.quantity_names().len(),
        "loaded model"
    );
    Ok(model)
}

/// Merge the params file with `--set` overrides
fn read_assignment(args: &AssignmentArgs) -> color_eyre::Result<BatchAssignment> {
    let mut batch = match &args.params {
        Some(path) => read_document::<BatchAssignment>(path)?,
        None => BatchAssignment::new(),
    };
    for (name, value) in &args.set {
        batch.insert(name.clone(), value.clone());
    }
    Ok(batch)
}

fn is_broadcast(batch: &BatchAssignment) -> bool {
    batch.iter().any(|(_, value)| matches!(value, BatchValue::Many(_)))
}

/// Single-valued assignment; value lists are only meaningful to `compute`
fn pinned(batch: BatchAssignment) -> color_eyre::Result<Assignment> {
    batch
        .iter()
        .map(|(name, value)| match value {
            BatchValue::One(value) => Ok((name.clone(), value.clone())),
            BatchValue::Many(_) => Err(eyre!(
                "parameter `{name}` has a list of values; lists are only accepted by compute"
            )),
        })
        .collect()
}

/// Run configuration from `--config`, with flags taking precedence
fn uncertainty_config(args: &UncertaintyArgs) -> color_eyre::Result<UncertaintyConfig> {
    let mut config = match &args.config {
        Some(path) => read_document::<UncertaintyConfig>(path)?,
        None => {
            let Some(samples) = args.samples else {
                bail!("--samples is required unless --config is given");
            };
            UncertaintyConfig::new(samples, args.on_error.unwrap_or(PolicyArg::Abort).into())
        }
    };
    if let Some(samples) = args.samples {
        config.n_samples = samples;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if !args.percentiles.is_empty() {
        config.percentiles = args.percentiles.clone();
    }
    if let Some(policy) = args.on_error {
        config.on_error = policy.into();
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = Some(timeout);
    }
    config.validate().map_err(|e| eyre!(e))?;
    Ok(config)
}

fn sensitivity_config(args: &SensitivityArgs) -> color_eyre::Result<SensitivityConfig> {
    let mut config = match &args.config {
        Some(path) => read_document::<SensitivityConfig>(path)?,
        None => {
            let Some(samples) = args.samples else {
                bail!("--samples is required unless --config is given");
            };
            SensitivityConfig::new(
                args.method.map(SensitivityMethod::from).unwrap_or_default(),
                samples,
                args.on_error.unwrap_or(PolicyArg::Abort).into(),
            )
        }
    };
    if let Some(samples) = args.samples {
        config.n_samples = samples;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(method) = args.method {
        config.method = method.into();
    }
    if !args.outputs.is_empty() {
        config.outputs = args.outputs.clone();
    }
    if let Some(design) = args.design {
        config.design = design.into();
    }
    if let Some(resamples) = args.bootstrap {
        config.bootstrap.resamples = resamples;
    }
    if let Some(confidence) = args.confidence {
        config.bootstrap.confidence = confidence;
    }
    if let Some(policy) = args.on_error {
        config.on_error = policy.into();
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = Some(timeout);
    }
    config.validate().map_err(|e| eyre!(e))?;
    Ok(config)
}

/// Run `f` while a reporter thread logs its progress
fn with_progress<T>(label: &str, f: impl FnOnce(&RunProgress) -> T) -> T {
    let progress = RunProgress::new();
    thread::scope(|scope| {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let watched = progress.clone();
        scope.spawn(move || {
            while matches!(
                done_rx.recv_timeout(PROGRESS_INTERVAL),
                Err(RecvTimeoutError::Timeout)
            ) {
                tracing::info!(
                    run = label,
                    completed = watched.completed(),
                    total = watched.total(),
                    "progress"
                );
            }
        });
        let out = f(&progress);
        drop(done_tx);
        out
    })
}

/// Overview printed by `check`
#[derive(Debug, Serialize)]
struct ModelSummary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a ModelMetadata>,
    parameters: usize,
    stochastic: Vec<&'a str>,
    symbols: usize,
    quantities: usize,
    evaluation_order: Vec<&'a str>,
    /// Values at the parameter defaults, when they evaluate
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_error: Option<String>,
}

impl<'a> ModelSummary<'a> {
    fn of(model: &'a Model) -> Self {
        let names = model.quantity_names();
        let (defaults, default_error) = match evaluate(model, &Assignment::new()) {
            Ok(values) => (Some(values), None),
            Err(e) => {
                tracing::warn!(error = %e, "model does not evaluate at its defaults");
                (None, Some(e.to_string()))
            }
        };
        Self {
            metadata: model.metadata(),
            parameters: model.parameters().len(),
            stochastic: model
                .parameters()
                .iter()
                .filter(|p| p.is_stochastic())
                .map(|p| p.name.as_str())
                .collect(),
            symbols: model.registry().symbol_names().len(),
            quantities: names.len(),
            evaluation_order: model.order().iter().map(|id| names[id.index()].as_str()).collect(),
            defaults,
            default_error,
        }
    }
}

/// Output of `compute` for one assignment
#[derive(Debug, Serialize)]
struct Computed {
    values: EvaluationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<BTreeMap<String, f64>>,
}

impl Computed {
    fn new(model: &Model, values: EvaluationResult, group_by: Option<&str>) -> Self {
        let groups = group_by.map(|key| values.combine_by_property(model, key));
        Self { values, groups }
    }
}
