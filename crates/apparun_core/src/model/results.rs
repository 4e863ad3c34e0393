//! Outputs of evaluation, uncertainty propagation and sensitivity analysis

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Model;
use crate::config::SensitivityMethod;

/// Values of every quantity for one assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResult {
    pub values: BTreeMap<String, f64>,
}

impl EvaluationResult {
    #[must_use]
    pub fn get(&self, quantity: &str) -> Option<f64> {
        self.values.get(quantity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Sum quantity values grouped by the value of property `key`.
    ///
    /// Quantities that do not carry the property are left out. Sums run in
    /// declaration order.
    #[must_use]
    pub fn combine_by_property(&self, model: &Model, key: &str) -> BTreeMap<String, f64> {
        let mut combined = BTreeMap::new();
        for quantity in model.graph().quantities() {
            let (Some(group), Some(value)) =
                (quantity.properties.get(key), self.get(&quantity.name))
            else {
                continue;
            };
            *combined.entry(group.clone()).or_insert(0.0) += value;
        }
        combined
    }
}

/// Summary statistics of one quantity's samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); zero for a single sample
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// (percentile in `[0, 1]`, value) pairs in requested order
    pub percentiles: Vec<(f64, f64)>,
}

impl SummaryStats {
    /// Value at a requested percentile
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(q, _)| (q - p).abs() < 1e-9)
            .map(|(_, v)| *v)
    }
}

/// Samples of one quantity, indexed like the run's kept samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityDistribution {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<f64>,
    pub summary: SummaryStats,
}

/// Result of a Monte Carlo uncertainty run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub seed: u64,
    pub requested_samples: usize,
    /// Samples evaluated before the run finished or timed out
    pub completed_samples: usize,
    /// Indices of samples dropped for numeric failures
    pub dropped: Vec<usize>,
    /// Whether the run stopped early at its deadline
    pub truncated: bool,
    pub quantities: BTreeMap<String, QuantityDistribution>,
}

impl DistributionResult {
    /// Samples that made it into the statistics
    #[must_use]
    pub fn kept_samples(&self) -> usize {
        self.completed_samples - self.dropped.len()
    }

    #[must_use]
    pub fn get(&self, quantity: &str) -> Option<&QuantityDistribution> {
        self.quantities.get(quantity)
    }
}

/// A point estimate with its bootstrap confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexEstimate {
    pub value: f64,
    pub conf_low: f64,
    pub conf_high: f64,
}

/// Importance of one parameter for one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterImportance {
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_order: Option<IndexEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_order: Option<IndexEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_correlation: Option<IndexEstimate>,
}

impl ParameterImportance {
    /// The score used to order parameters: total order for Sobol, absolute
    /// correlation for Spearman
    #[must_use]
    pub fn score(&self) -> f64 {
        self.total_order
            .or(self.first_order)
            .map(|e| e.value)
            .or(self.rank_correlation.map(|e| e.value.abs()))
            .unwrap_or(0.0)
    }
}

/// Result of a sensitivity analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub method: SensitivityMethod,
    pub seed: u64,
    /// Design rows requested
    pub base_samples: usize,
    /// Design rows used in the estimates
    pub used_samples: usize,
    /// Model evaluations performed
    pub evaluations: usize,
    /// Design rows dropped for numeric failures
    pub dropped_rows: Vec<usize>,
    pub truncated: bool,
    /// Free parameters analyzed, in declaration order
    pub parameters: Vec<String>,
    /// Per output quantity, one entry per free parameter in declaration order
    pub outputs: BTreeMap<String, Vec<ParameterImportance>>,
}

impl SensitivityResult {
    #[must_use]
    pub fn get(&self, output: &str, parameter: &str) -> Option<&ParameterImportance> {
        self.outputs
            .get(output)?
            .iter()
            .find(|importance| importance.parameter == parameter)
    }

    /// Parameters for `output` ordered from most to least important
    #[must_use]
    pub fn ranking(&self, output: &str) -> Vec<&ParameterImportance> {
        let mut ranked: Vec<&ParameterImportance> =
            self.outputs.get(output).map(|v| v.iter().collect()).unwrap_or_default();
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
        ranked
    }
}
