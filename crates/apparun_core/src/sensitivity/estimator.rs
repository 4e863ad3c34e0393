//! Importance estimators over evaluated design rows

use crate::config::SensitivityMethod;
use crate::stats::{pearson, population_variance, ranks};

use super::design::saltelli_row;

/// One design row after evaluation, for a single output
#[derive(Debug, Clone, Copy)]
pub struct EvaluatedRow<'a> {
    /// First design point of the row
    pub point: &'a [f64],
    /// Output value at every point of the row, in emission order
    pub outputs: &'a [f64],
}

/// Point estimates for one parameter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Indices {
    pub first_order: Option<f64>,
    pub total_order: Option<f64>,
    pub rank_correlation: Option<f64>,
}

/// Turns evaluated design rows into per-parameter importance measures
pub trait ImportanceEstimator: Send + Sync {
    fn method(&self) -> SensitivityMethod;

    /// Coordinates of one raw design row for `d` parameters
    fn design_dims(&self, d: usize) -> usize;

    /// Evaluation points derived from one raw design row
    fn expand_row(&self, base: &[f64], d: usize, out: &mut Vec<Vec<f64>>);

    /// Points `expand_row` emits per row
    fn points_per_row(&self, d: usize) -> usize;

    /// Fewest rows giving a meaningful estimate
    fn minimum_rows(&self, d: usize) -> usize;

    /// One entry per parameter, in design column order
    fn estimate(&self, rows: &[EvaluatedRow<'_>], d: usize) -> Vec<Indices>;
}

impl SensitivityMethod {
    #[must_use]
    pub fn estimator(self) -> Box<dyn ImportanceEstimator> {
        match self {
            SensitivityMethod::Sobol => Box::new(SobolEstimator),
            SensitivityMethod::Spearman => Box::new(SpearmanEstimator),
        }
    }
}

/// First- and total-order Sobol indices from a Saltelli design.
///
/// With `f_A`, `f_B` and `f_ABi` the outputs at the row's points and `V` the
/// variance of all `f_A` and `f_B` values:
/// `S1_i = mean(f_B * (f_ABi - f_A)) / V` and
/// `ST_i = mean((f_A - f_ABi)^2) / (2 V)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SobolEstimator;

impl ImportanceEstimator for SobolEstimator {
    fn method(&self) -> SensitivityMethod {
        SensitivityMethod::Sobol
    }

    fn design_dims(&self, d: usize) -> usize {
        2 * d
    }

    fn expand_row(&self, base: &[f64], d: usize, out: &mut Vec<Vec<f64>>) {
        saltelli_row(base, d, out);
    }

    fn points_per_row(&self, d: usize) -> usize {
        d + 2
    }

    fn minimum_rows(&self, d: usize) -> usize {
        (2 * (d + 1)).max(8)
    }

    fn estimate(&self, rows: &[EvaluatedRow<'_>], d: usize) -> Vec<Indices> {
        let n = rows.len() as f64;
        let f_a = |row: &EvaluatedRow<'_>| row.outputs[0];
        let f_b = |row: &EvaluatedRow<'_>| row.outputs[d + 1];

        let pooled: Vec<f64> = rows.iter().map(f_a).chain(rows.iter().map(f_b)).collect();
        let variance = population_variance(&pooled);
        if variance <= 0.0 || !variance.is_finite() {
            return vec![
                Indices {
                    first_order: Some(0.0),
                    total_order: Some(0.0),
                    rank_correlation: None,
                };
                d
            ];
        }

        (0..d)
            .map(|i| {
                let mut first = 0.0;
                let mut total = 0.0;
                for row in rows {
                    let (a, b, ab) = (f_a(row), f_b(row), row.outputs[i + 1]);
                    first += b * (ab - a);
                    total += (a - ab).powi(2);
                }
                Indices {
                    first_order: Some(first / n / variance),
                    total_order: Some(0.5 * total / n / variance),
                    rank_correlation: None,
                }
            })
            .collect()
    }
}

/// Spearman rank correlation between each design coordinate and the output
#[derive(Debug, Clone, Copy, Default)]
pub struct SpearmanEstimator;

impl ImportanceEstimator for SpearmanEstimator {
    fn method(&self) -> SensitivityMethod {
        SensitivityMethod::Spearman
    }

    fn design_dims(&self, d: usize) -> usize {
        d
    }

    fn expand_row(&self, base: &[f64], _d: usize, out: &mut Vec<Vec<f64>>) {
        out.push(base.to_vec());
    }

    fn points_per_row(&self, _d: usize) -> usize {
        1
    }

    fn minimum_rows(&self, d: usize) -> usize {
        d + 3
    }

    fn estimate(&self, rows: &[EvaluatedRow<'_>], d: usize) -> Vec<Indices> {
        let y: Vec<f64> = rows.iter().map(|row| row.outputs[0]).collect();
        let y_ranks = ranks(&y);
        (0..d)
            .map(|i| {
                let x: Vec<f64> = rows.iter().map(|row| row.point[i]).collect();
                Indices {
                    rank_correlation: Some(pearson(&ranks(&x), &y_ranks)),
                    ..Indices::default()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::design::{DesignGenerator, SobolDesign};

    /// Expand and evaluate `f` over a Sobol design
    fn evaluate(
        estimator: &dyn ImportanceEstimator,
        n: usize,
        d: usize,
        f: impl Fn(&[f64]) -> f64,
    ) -> Vec<Indices> {
        let base = SobolDesign.generate(n, estimator.design_dims(d), 5);
        let mut points = Vec::new();
        for row in &base {
            estimator.expand_row(row, d, &mut points);
        }
        let outputs: Vec<f64> = points.iter().map(|p| f(p)).collect();
        let width = estimator.points_per_row(d);
        let rows: Vec<EvaluatedRow<'_>> = (0..n)
            .map(|r| EvaluatedRow {
                point: &points[r * width],
                outputs: &outputs[r * width..(r + 1) * width],
            })
            .collect();
        estimator.estimate(&rows, d)
    }

    #[test]
    fn test_sobol_additive_model() {
        // Var(2x) = 4/12, Var(y) = 1/12: S = 0.8 and 0.2, no interactions,
        // third parameter unused
        let indices = evaluate(&SobolEstimator, 1024, 3, |p| 2.0 * p[0] + p[1]);
        let s1: Vec<f64> = indices.iter().map(|i| i.first_order.unwrap()).collect();
        let st: Vec<f64> = indices.iter().map(|i| i.total_order.unwrap()).collect();
        assert!((s1[0] - 0.8).abs() < 0.05, "{s1:?}");
        assert!((s1[1] - 0.2).abs() < 0.05, "{s1:?}");
        assert!(s1[2].abs() < 0.02, "{s1:?}");
        assert!((st[0] - 0.8).abs() < 0.05, "{st:?}");
        assert!((st[1] - 0.2).abs() < 0.05, "{st:?}");
        assert_eq!(st[2], 0.0);
    }

    #[test]
    fn test_sobol_constant_output() {
        let indices = evaluate(&SobolEstimator, 16, 2, |_| 3.0);
        assert!(indices.iter().all(|i| i.first_order == Some(0.0) && i.total_order == Some(0.0)));
    }

    #[test]
    fn test_spearman_signs() {
        let indices = evaluate(&SpearmanEstimator, 256, 3, |p| p[0].exp() - 0.5 * p[1]);
        let rho: Vec<f64> = indices.iter().map(|i| i.rank_correlation.unwrap()).collect();
        assert!(rho[0] > 0.85, "{rho:?}");
        assert!(rho[1] < 0.0, "{rho:?}");
        assert!(rho[2].abs() < 0.2, "{rho:?}");
    }

    #[test]
    fn test_minimum_rows() {
        assert_eq!(SobolEstimator.minimum_rows(1), 8);
        assert_eq!(SobolEstimator.minimum_rows(5), 12);
        assert_eq!(SpearmanEstimator.minimum_rows(2), 5);
    }
}
