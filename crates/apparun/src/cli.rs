//! Command-line interface definition

use std::path::PathBuf;

use apparun_core::{DesignKind, FailurePolicy, ParamValue, SensitivityMethod};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "apparun")]
#[command(about = "Evaluate parametric life-cycle impact models")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a model and summarize it
    Check {
        model: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the parameters of a model
    Params {
        model: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Evaluate every quantity for one assignment or a broadcast batch
    Compute {
        model: PathBuf,
        #[command(flatten)]
        assignment: AssignmentArgs,
        /// Also sum quantities grouped by this property
        #[arg(long)]
        group_by: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Propagate parameter uncertainty with Monte Carlo sampling
    Uncertainty {
        model: PathBuf,
        #[command(flatten)]
        run: UncertaintyArgs,
        #[command(flatten)]
        assignment: AssignmentArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rank parameters by their influence on the outputs
    Sensitivity {
        model: PathBuf,
        #[command(flatten)]
        run: SensitivityArgs,
        #[command(flatten)]
        assignment: AssignmentArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Write a model back out, normalized, in the output format
    Dump {
        model: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Parameter values supplied on the command line
#[derive(Args, Debug, Default, Clone)]
pub struct AssignmentArgs {
    /// YAML or JSON file mapping parameter names to values (or value lists)
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Set one parameter, overriding the params file
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, ParamValue)>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct UncertaintyArgs {
    /// YAML or JSON run configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of samples
    #[arg(long)]
    pub samples: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Percentile in [0, 1] to report; repeatable
    #[arg(long = "percentile")]
    pub percentiles: Vec<f64>,

    /// What to do with samples failing on a numeric error
    #[arg(long, value_enum)]
    pub on_error: Option<PolicyArg>,

    /// Stop starting samples after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<f64>,

    /// Leave per-sample values out of the output
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SensitivityArgs {
    /// YAML or JSON run configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of base design rows
    #[arg(long)]
    pub samples: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Output quantity to analyze; repeatable, all when omitted
    #[arg(long = "output")]
    pub outputs: Vec<String>,

    #[arg(long, value_enum)]
    pub design: Option<DesignArg>,

    /// Bootstrap resamples for confidence intervals
    #[arg(long)]
    pub bootstrap: Option<usize>,

    /// Confidence level of the intervals
    #[arg(long)]
    pub confidence: Option<f64>,

    #[arg(long, value_enum)]
    pub on_error: Option<PolicyArg>,

    #[arg(long)]
    pub timeout_secs: Option<f64>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Abort,
    Drop,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Abort => FailurePolicy::Abort,
            PolicyArg::Drop => FailurePolicy::Drop,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    Sobol,
    Spearman,
}

impl From<MethodArg> for SensitivityMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Sobol => SensitivityMethod::Sobol,
            MethodArg::Spearman => SensitivityMethod::Spearman,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignArg {
    Sobol,
    Random,
}

impl From<DesignArg> for DesignKind {
    fn from(design: DesignArg) -> Self {
        match design {
            DesignArg::Sobol => DesignKind::Sobol,
            DesignArg::Random => DesignKind::Random,
        }
    }
}

/// Parse `name=value`. Booleans and numbers are recognized; anything else is
/// taken as an enum option.
pub fn parse_assignment(arg: &str) -> Result<(String, ParamValue), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in `{arg}`"));
    }
    let raw = raw.trim();
    let value = match raw {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                ParamValue::Integer(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                ParamValue::Float(f)
            } else {
                ParamValue::Text(raw.to_string())
            }
        }
    };
    Ok((name.to_string(), value))
}
