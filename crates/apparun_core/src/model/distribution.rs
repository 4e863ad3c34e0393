use std::collections::BTreeMap;

use rand::distr::weighted::WeightedIndex;
use rand::distr::{Distribution as _, Uniform};
use rand::Rng;
use rand_distr::{LogNormal, Normal, Triangular};
use serde::{Deserialize, Serialize};

use super::parameters::{ParamKind, ParamValue, Parameter};
use crate::stats::normal_quantile;

/// Probability distribution of a stochastic parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Continuous on `[min, max)` for floats, inclusive for integers
    Uniform { min: f64, max: f64 },
    /// Normal, optionally clamped to `[min, max]`
    Normal {
        mean: f64,
        std_dev: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// `exp(N(mu, sigma))`
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    /// Finite set of values with optional weights (uniform when absent)
    Discrete {
        values: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<f64>>,
    },
    /// Probability of `true`
    Bernoulli { p: f64 },
    /// Weight per enum option; options left out have weight zero
    Categorical { weights: BTreeMap<String, f64> },
}

impl Distribution {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Uniform { .. } => "uniform",
            Distribution::Normal { .. } => "normal",
            Distribution::LogNormal { .. } => "log_normal",
            Distribution::Triangular { .. } => "triangular",
            Distribution::Discrete { .. } => "discrete",
            Distribution::Bernoulli { .. } => "bernoulli",
            Distribution::Categorical { .. } => "categorical",
        }
    }

    /// Check the distribution is defined and fits a parameter of `kind`
    pub(crate) fn validate(&self, kind: ParamKind, options: &[String]) -> Result<(), String> {
        let fits = matches!(
            (kind, self),
            (
                ParamKind::Float,
                Distribution::Uniform { .. }
                    | Distribution::Normal { .. }
                    | Distribution::LogNormal { .. }
                    | Distribution::Triangular { .. }
                    | Distribution::Discrete { .. }
            ) | (ParamKind::Integer, Distribution::Uniform { .. } | Distribution::Discrete { .. })
                | (ParamKind::Bool, Distribution::Bernoulli { .. })
                | (ParamKind::Enum, Distribution::Categorical { .. })
        );
        if !fits {
            return Err(format!(
                "{} distribution does not apply to {} parameters",
                self.name(),
                kind.name()
            ));
        }

        let all_finite = |values: &[f64]| values.iter().all(|v| v.is_finite());
        match self {
            Distribution::Uniform { min, max } => {
                if !all_finite(&[*min, *max]) || min >= max {
                    return Err(format!("uniform needs finite min < max, got [{min}, {max}]"));
                }
                if kind == ParamKind::Integer {
                    check_integers(&[*min, *max])?;
                }
            }
            Distribution::Normal {
                mean,
                std_dev,
                min,
                max,
            } => {
                if !all_finite(&[*mean, *std_dev]) || *std_dev < 0.0 {
                    return Err(format!("normal needs finite mean and std_dev >= 0, got std_dev {std_dev}"));
                }
                if let (Some(lo), Some(hi)) = (min, max)
                    && lo > hi
                {
                    return Err(format!("normal clamp bounds are reversed: [{lo}, {hi}]"));
                }
            }
            Distribution::LogNormal { mu, sigma } => {
                if !all_finite(&[*mu, *sigma]) || *sigma < 0.0 {
                    return Err(format!("log_normal needs finite mu and sigma >= 0, got sigma {sigma}"));
                }
            }
            Distribution::Triangular { min, mode, max } => {
                if !all_finite(&[*min, *mode, *max]) || min >= max || mode < min || mode > max {
                    return Err(format!(
                        "triangular needs min <= mode <= max and min < max, got ({min}, {mode}, {max})"
                    ));
                }
            }
            Distribution::Discrete { values, weights } => {
                if values.is_empty() || !all_finite(values) {
                    return Err("discrete needs at least one finite value".to_string());
                }
                if kind == ParamKind::Integer {
                    check_integers(values)?;
                }
                if let Some(weights) = weights {
                    if weights.len() != values.len() {
                        return Err(format!(
                            "discrete has {} values but {} weights",
                            values.len(),
                            weights.len()
                        ));
                    }
                    check_weights(weights.iter().copied())?;
                }
            }
            Distribution::Bernoulli { p } => {
                if !(0.0..=1.0).contains(p) {
                    return Err(format!("bernoulli probability must lie in [0, 1], got {p}"));
                }
            }
            Distribution::Categorical { weights } => {
                if let Some(unknown) = weights.keys().find(|k| !options.contains(k)) {
                    return Err(format!("categorical weight for unknown option `{unknown}`"));
                }
                check_weights(weights.values().copied())?;
            }
        }
        Ok(())
    }
}

fn check_weights(weights: impl Iterator<Item = f64>) -> Result<(), String> {
    let mut total = 0.0;
    for weight in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(format!("weights must be finite and non-negative, got {weight}"));
        }
        total += weight;
    }
    if total <= 0.0 {
        return Err("weights sum to zero".to_string());
    }
    Ok(())
}

/// A validated distribution ready to draw values of its parameter's kind.
///
/// Supports both pseudo-random draws and inverse-CDF mapping of a unit
/// coordinate, which structured sample designs rely on.
#[derive(Debug, Clone)]
pub enum Sampler {
    Uniform {
        dist: Uniform<f64>,
        min: f64,
        max: f64,
    },
    UniformInt {
        min: i64,
        max: i64,
    },
    Normal {
        dist: Normal<f64>,
        mean: f64,
        std_dev: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    LogNormal {
        dist: LogNormal<f64>,
        mu: f64,
        sigma: f64,
    },
    Triangular {
        dist: Triangular<f64>,
        min: f64,
        mode: f64,
        max: f64,
    },
    /// Discrete, bernoulli and categorical draws
    Weighted {
        values: Vec<ParamValue>,
        /// Normalized cumulative weights, last entry 1.0
        cumulative: Vec<f64>,
        index: WeightedIndex<f64>,
    },
}

impl Sampler {
    /// Build the sampler for a stochastic parameter.
    ///
    /// Returns `Ok(None)` for fixed parameters. The declaration must already
    /// be validated.
    pub fn for_parameter(parameter: &Parameter) -> Result<Option<Self>, String> {
        let Some(distribution) = &parameter.distribution else {
            return Ok(None);
        };
        let integer = parameter.kind == ParamKind::Integer;
        let sampler = match distribution {
            Distribution::Uniform { min, max } if integer => Sampler::UniformInt {
                min: *min as i64,
                max: *max as i64,
            },
            Distribution::Uniform { min, max } => Sampler::Uniform {
                dist: Uniform::new(*min, *max).map_err(|e| e.to_string())?,
                min: *min,
                max: *max,
            },
            Distribution::Normal {
                mean,
                std_dev,
                min,
                max,
            } => Sampler::Normal {
                dist: Normal::new(*mean, *std_dev).map_err(|e| e.to_string())?,
                mean: *mean,
                std_dev: *std_dev,
                min: *min,
                max: *max,
            },
            Distribution::LogNormal { mu, sigma } => Sampler::LogNormal {
                dist: LogNormal::new(*mu, *sigma).map_err(|e| e.to_string())?,
                mu: *mu,
                sigma: *sigma,
            },
            Distribution::Triangular { min, mode, max } => Sampler::Triangular {
                dist: Triangular::new(*min, *max, *mode).map_err(|e| e.to_string())?,
                min: *min,
                mode: *mode,
                max: *max,
            },
            Distribution::Discrete { values, weights } => {
                let weights = weights.clone().unwrap_or_else(|| vec![1.0; values.len()]);
                let values = values
                    .iter()
                    .map(|v| {
                        if integer {
                            ParamValue::Integer(*v as i64)
                        } else {
                            ParamValue::Float(*v)
                        }
                    })
                    .collect();
                Self::weighted(values, weights)?
            }
            Distribution::Bernoulli { p } => Self::weighted(
                vec![ParamValue::Bool(false), ParamValue::Bool(true)],
                vec![1.0 - p, *p],
            )?,
            Distribution::Categorical { weights } => {
                let values = parameter
                    .options
                    .iter()
                    .map(|option| ParamValue::Text(option.clone()))
                    .collect();
                let weights = parameter
                    .options
                    .iter()
                    .map(|option| weights.get(option).copied().unwrap_or(0.0))
                    .collect();
                Self::weighted(values, weights)?
            }
        };
        Ok(Some(sampler))
    }

    fn weighted(values: Vec<ParamValue>, weights: Vec<f64>) -> Result<Self, String> {
        let index = WeightedIndex::new(&weights).map_err(|e| e.to_string())?;
        let total: f64 = weights.iter().sum();
        let mut running = 0.0;
        let mut cumulative: Vec<f64> = weights
            .iter()
            .map(|w| {
                running += w;
                running / total
            })
            .collect();
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Ok(Sampler::Weighted {
            values,
            cumulative,
            index,
        })
    }

    /// Draw one value from `rng`
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match self {
            Sampler::Uniform { dist, .. } => ParamValue::Float(dist.sample(rng)),
            Sampler::UniformInt { min, max } => ParamValue::Integer(rng.random_range(*min..=*max)),
            Sampler::Normal { dist, min, max, .. } => {
                ParamValue::Float(clamp(dist.sample(rng), *min, *max))
            }
            Sampler::LogNormal { dist, .. } => ParamValue::Float(dist.sample(rng)),
            Sampler::Triangular { dist, .. } => ParamValue::Float(dist.sample(rng)),
            Sampler::Weighted { values, index, .. } => values[index.sample(rng)].clone(),
        }
    }

    /// Map a unit coordinate `u` in `[0, 1)` through the inverse CDF
    #[must_use]
    pub fn quantile(&self, u: f64) -> ParamValue {
        let u = u.clamp(0.0, 1.0);
        match self {
            Sampler::Uniform { min, max, .. } => ParamValue::Float(min + u * (max - min)),
            Sampler::UniformInt { min, max } => {
                let (min, max) = (i128::from(*min), i128::from(*max));
                let offset = (u * (max - min + 1) as f64).floor() as i128;
                ParamValue::Integer((min + offset).min(max) as i64)
            }
            Sampler::Normal {
                mean,
                std_dev,
                min,
                max,
                ..
            } => ParamValue::Float(clamp(mean + std_dev * normal_quantile(u), *min, *max)),
            Sampler::LogNormal { mu, sigma, .. } => {
                ParamValue::Float((mu + sigma * normal_quantile(u)).exp())
            }
            Sampler::Triangular { min, mode, max, .. } => {
                let split = (mode - min) / (max - min);
                let value = if u < split {
                    min + (u * (max - min) * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
                };
                ParamValue::Float(value)
            }
            Sampler::Weighted {
                values, cumulative, ..
            } => {
                let i = cumulative.partition_point(|&c| c <= u).min(values.len() - 1);
                values[i].clone()
            }
        }
    }
}

/// Largest magnitude up to which every integer is exact in an `f64`
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn check_integers(values: &[f64]) -> Result<(), String> {
    match values
        .iter()
        .find(|v| v.fract() != 0.0 || v.abs() > MAX_EXACT_INTEGER)
    {
        Some(v) => Err(format!(
            "integer distribution values must be whole numbers within ±2^53, got {v}"
        )),
        None => Ok(()),
    }
}

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |lo| value.max(lo));
    max.map_or(value, |hi| value.min(hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn sampler(parameter: Parameter) -> Sampler {
        parameter.validate().unwrap();
        Sampler::for_parameter(&parameter).unwrap().unwrap()
    }

    #[test]
    fn test_distribution_must_fit_kind() {
        let bernoulli = Distribution::Bernoulli { p: 0.5 };
        assert!(bernoulli.validate(ParamKind::Bool, &[]).is_ok());
        assert!(bernoulli.validate(ParamKind::Float, &[]).is_err());

        let normal = Distribution::Normal {
            mean: 0.0,
            std_dev: 1.0,
            min: None,
            max: None,
        };
        assert!(normal.validate(ParamKind::Integer, &[]).is_err());
    }

    #[test]
    fn test_invalid_distribution_parameters() {
        let uniform = Distribution::Uniform { min: 2.0, max: 1.0 };
        assert!(uniform.validate(ParamKind::Float, &[]).is_err());

        let triangular = Distribution::Triangular {
            min: 0.0,
            mode: 3.0,
            max: 2.0,
        };
        assert!(triangular.validate(ParamKind::Float, &[]).is_err());

        let categorical = Distribution::Categorical {
            weights: BTreeMap::from([("DE".to_string(), 1.0)]),
        };
        assert!(categorical.validate(ParamKind::Enum, &["FR".to_string()]).is_err());
    }

    #[test]
    fn test_uniform_quantile_and_draws() {
        let s = sampler(
            Parameter::float("x", 1.0).with_distribution(Distribution::Uniform { min: 2.0, max: 4.0 }),
        );
        assert_eq!(s.quantile(0.25), ParamValue::Float(2.5));

        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..100 {
            let v = s.draw(&mut rng).as_f64().unwrap();
            assert!((2.0..4.0).contains(&v));
        }
    }

    #[test]
    fn test_integer_uniform_is_inclusive() {
        let s = sampler(
            Parameter::integer("n", 1).with_distribution(Distribution::Uniform { min: 1.0, max: 3.0 }),
        );
        assert_eq!(s.quantile(0.0), ParamValue::Integer(1));
        assert_eq!(s.quantile(0.5), ParamValue::Integer(2));
        assert_eq!(s.quantile(0.999), ParamValue::Integer(3));
    }

    #[test]
    fn test_wide_integer_bounds() {
        let limit = MAX_EXACT_INTEGER;
        let s = sampler(
            Parameter::integer("n", 0)
                .with_distribution(Distribution::Uniform { min: -limit, max: limit }),
        );
        assert_eq!(s.quantile(0.0), ParamValue::Integer(-(1 << 53)));
        assert_eq!(s.quantile(0.5), ParamValue::Integer(0));
        assert_eq!(s.quantile(1.0), ParamValue::Integer(1 << 53));

        // Bounds an f64 cannot count exactly are rejected up front
        let too_wide = Distribution::Uniform { min: -5e18, max: 5e18 };
        assert!(too_wide.validate(ParamKind::Integer, &[]).is_err());
        assert!(too_wide.validate(ParamKind::Float, &[]).is_ok());
        let discrete = Distribution::Discrete {
            values: vec![1.0, 1e19],
            weights: None,
        };
        assert!(discrete.validate(ParamKind::Integer, &[]).is_err());
    }

    #[test]
    fn test_normal_quantile_is_clamped() {
        let s = sampler(Parameter::float("x", 0.0).with_distribution(Distribution::Normal {
            mean: 10.0,
            std_dev: 2.0,
            min: Some(9.0),
            max: None,
        }));
        let median = s.quantile(0.5).as_f64().unwrap();
        assert!((median - 10.0).abs() < 1e-9);
        assert_eq!(s.quantile(0.01), ParamValue::Float(9.0));
    }

    #[test]
    fn test_triangular_quantile_hits_mode() {
        let s = sampler(Parameter::float("x", 1.0).with_distribution(Distribution::Triangular {
            min: 0.0,
            mode: 1.0,
            max: 2.0,
        }));
        let mode = s.quantile(0.5).as_f64().unwrap();
        assert!((mode - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_quantiles() {
        let coin = sampler(
            Parameter::boolean("flag", false).with_distribution(Distribution::Bernoulli { p: 0.25 }),
        );
        assert_eq!(coin.quantile(0.7), ParamValue::Bool(false));
        assert_eq!(coin.quantile(0.8), ParamValue::Bool(true));

        let region = sampler(
            Parameter::enumeration("region", ["FR", "EU", "US"], "FR").with_distribution(
                Distribution::Categorical {
                    weights: BTreeMap::from([("FR".to_string(), 1.0), ("US".to_string(), 1.0)]),
                },
            ),
        );
        assert_eq!(region.quantile(0.2), ParamValue::Text("FR".to_string()));
        assert_eq!(region.quantile(0.6), ParamValue::Text("US".to_string()));
    }

    #[test]
    fn test_discrete_integer_values() {
        let s = sampler(Parameter::integer("n", 2).with_distribution(Distribution::Discrete {
            values: vec![2.0, 4.0],
            weights: None,
        }));
        let mut rng = Pcg64::seed_from_u64(1);
        let value = s.draw(&mut rng);
        assert!(matches!(value, ParamValue::Integer(2 | 4)));
    }
}
