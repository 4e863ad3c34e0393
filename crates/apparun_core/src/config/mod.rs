//! Run configuration
//!
//! Configuration types for uncertainty propagation and sensitivity analysis.
//! Both deserialize from YAML or JSON with defaults for everything except the
//! sample count and the failure policy, which callers must always choose.
//!
//! # Builder DSL
//!
//! Models can also be assembled in code with [`ModelBuilder`]:
//!
//! ```ignore
//! use apparun_core::config::ModelBuilder;
//! use apparun_core::model::{Distribution, Parameter};
//!
//! let model = ModelBuilder::new()
//!     .parameter(Parameter::float("mass", 2.0)
//!         .with_distribution(Distribution::Uniform { min: 1.0, max: 3.0 }))
//!     .quantity("impact", "mass * 3")
//!     .build()?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod builder;

pub use builder::ModelBuilder;

/// What a batch run does when a sample fails with a numeric error.
///
/// Has no default; every run states its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole run on the first failing sample
    Abort,
    /// Drop failing samples, log them and report their indices
    Drop,
}

fn default_percentiles() -> Vec<f64> {
    vec![0.05, 0.25, 0.5, 0.75, 0.95]
}

fn check_timeout(timeout_secs: Option<f64>) -> Result<(), String> {
    match timeout_secs {
        Some(t) if Duration::try_from_secs_f64(t).is_err() => Err(format!(
            "timeout must be a representable non-negative number of seconds, got {t}"
        )),
        _ => Ok(()),
    }
}

/// Monte Carlo uncertainty propagation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyConfig {
    pub n_samples: usize,
    #[serde(default)]
    pub seed: u64,
    /// Percentiles in `[0, 1]` to report for every quantity
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,
    pub on_error: FailurePolicy,
    /// Wall-clock budget; the run keeps the samples finished in time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
}

impl UncertaintyConfig {
    #[must_use]
    pub fn new(n_samples: usize, on_error: FailurePolicy) -> Self {
        Self {
            n_samples,
            seed: 0,
            percentiles: default_percentiles(),
            on_error,
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs_f64());
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.and_then(|t| Duration::try_from_secs_f64(t).ok())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_samples == 0 {
            return Err("n_samples must be at least 1".to_string());
        }
        if let Some(p) = self.percentiles.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(format!("percentiles must lie in [0, 1], got {p}"));
        }
        check_timeout(self.timeout_secs)
    }
}

/// Importance measure estimated by a sensitivity analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMethod {
    /// Variance-based first- and total-order Sobol indices (Saltelli design)
    #[default]
    Sobol,
    /// Spearman rank correlation between each parameter and the output
    Spearman,
}

impl SensitivityMethod {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SensitivityMethod::Sobol => "sobol",
            SensitivityMethod::Spearman => "spearman",
        }
    }
}

/// How unit-hypercube design points are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignKind {
    /// Scrambled Sobol low-discrepancy sequence
    #[default]
    Sobol,
    /// Independent uniform draws
    Random,
}

fn default_resamples() -> usize {
    100
}

fn default_confidence() -> f64 {
    0.95
}

/// Bootstrap settings for confidence intervals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_resamples")]
    pub resamples: usize,
    /// Confidence level in `(0, 1)`
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: default_resamples(),
            confidence: default_confidence(),
        }
    }
}

/// Global sensitivity analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Output quantities to analyze; empty means all
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub method: SensitivityMethod,
    /// Base design rows
    pub n_samples: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub design: DesignKind,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    pub on_error: FailurePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
}

impl SensitivityConfig {
    #[must_use]
    pub fn new(method: SensitivityMethod, n_samples: usize, on_error: FailurePolicy) -> Self {
        Self {
            outputs: Vec::new(),
            method,
            n_samples,
            seed: 0,
            design: DesignKind::default(),
            bootstrap: BootstrapConfig::default(),
            on_error,
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_design(mut self, design: DesignKind) -> Self {
        self.design = design;
        self
    }

    #[must_use]
    pub fn with_bootstrap(mut self, resamples: usize, confidence: f64) -> Self {
        self.bootstrap = BootstrapConfig {
            resamples,
            confidence,
        };
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs_f64());
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.and_then(|t| Duration::try_from_secs_f64(t).ok())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_samples == 0 {
            return Err("n_samples must be at least 1".to_string());
        }
        let confidence = self.bootstrap.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(format!("bootstrap confidence must lie in (0, 1), got {confidence}"));
        }
        check_timeout(self.timeout_secs)
    }
}
