//! End-to-end scenarios on small reference models
//!
//! Each test loads a model from YAML, the way an upstream model-building tool
//! would hand it over, and checks a complete evaluation path.

use crate::config::{FailurePolicy, UncertaintyConfig};
use crate::error::{EvalError, ModelError, NumericError};
use crate::evaluate::evaluate;
use crate::load::{ModelFormat, load_model};
use crate::model::Assignment;
use crate::uncertainty::run;

fn yaml(source: &str) -> crate::model::Model {
    load_model(source, ModelFormat::Yaml).unwrap()
}

/// A default parameter flows through a single quantity
#[test]
fn test_default_parameter_times_three() {
    let model = yaml(
        r#"
parameters:
  - name: x
    type: float
    default: 2.0
quantities:
  - name: impact
    expr: "x * 3"
"#,
    );

    let result = evaluate(&model, &Assignment::new()).unwrap();
    assert_eq!(result.get("impact"), Some(6.0));
}

/// Division by an assigned zero is an error, never an infinity
#[test]
fn test_division_by_assigned_zero() {
    let model = yaml(
        r#"
parameters:
  - name: x
    type: float
    default: 1.0
quantities:
  - name: y
    expr: "10 / x"
"#,
    );

    let err = evaluate(&model, &Assignment::new().with("x", 0.0)).unwrap_err();
    assert_eq!(
        err,
        EvalError::Numeric {
            quantity: "y".to_string(),
            source: NumericError::DivisionByZero,
        }
    );
}

/// A dangling reference is reported with the missing name
#[test]
fn test_undeclared_symbol_is_malformed() {
    let err = load_model(
        r#"
parameters:
  - name: x
    type: float
    default: 1.0
quantities:
  - name: a
    expr: "x + z"
"#,
        ModelFormat::Yaml,
    )
    .unwrap_err();

    assert!(err.is_malformed());
    assert_eq!(
        err,
        ModelError::UndeclaredSymbol {
            quantity: "a".to_string(),
            symbol: "z".to_string(),
        }
    );
    assert!(err.to_string().contains("`z`"));
}

/// Quantities referencing each other cannot be loaded
#[test]
fn test_cycle_is_rejected_with_its_path() {
    let err = load_model(
        r#"
quantities:
  - name: a
    expr: "b + 1"
  - name: b
    expr: "c * 2"
  - name: c
    expr: "a - 1"
"#,
        ModelFormat::Yaml,
    )
    .unwrap_err();

    let ModelError::Cyclic(cycle) = &err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert!(!err.is_malformed());
    assert_eq!(cycle.cycle, vec!["a", "b", "c", "a"]);
}

/// Same seed, same distribution summary
#[test]
fn test_uniform_uncertainty_is_reproducible() {
    let model = yaml(
        r#"
parameters:
  - name: x
    type: float
    default: 5.0
    distribution:
      type: uniform
      min: 0.0
      max: 10.0
quantities:
  - name: impact
    expr: "x"
"#,
    );
    let config = UncertaintyConfig::new(1000, FailurePolicy::Abort).with_seed(42);

    let first = run(&model, &Assignment::new(), &config, None).unwrap();
    let second = run(&model, &Assignment::new(), &config, None).unwrap();

    let a = &first.get("impact").unwrap().summary;
    let b = &second.get("impact").unwrap().summary;
    assert_eq!(a.mean.to_bits(), b.mean.to_bits());
    assert_eq!(a.std_dev.to_bits(), b.std_dev.to_bits());

    // Uniform(0, 10): mean 5, standard deviation 10 / sqrt(12)
    assert!((a.mean - 5.0).abs() < 0.3, "mean {}", a.mean);
    assert!((a.std_dev - 2.887).abs() < 0.2, "std_dev {}", a.std_dev);
    assert!(a.min >= 0.0 && a.max < 10.0);
}

/// Enum parameters expand into one indicator symbol per option
#[test]
fn test_enum_indicator_symbols() {
    let model = yaml(
        r#"
parameters:
  - name: grid
    type: enum
    default: fr
    options: [fr, us, cn]
  - name: energy
    type: float
    default: 10.0
quantities:
  - name: intensity
    expr: "0.05 * grid_fr + 0.4 * grid_us + 0.6 * grid_cn"
  - name: impact
    expr: "energy * intensity"
"#,
    );

    let fr = evaluate(&model, &Assignment::new()).unwrap();
    assert!((fr.get("impact").unwrap() - 0.5).abs() < 1e-12);

    let us = evaluate(&model, &Assignment::new().with("grid", "us")).unwrap();
    assert!((us.get("impact").unwrap() - 4.0).abs() < 1e-12);

    let err = evaluate(&model, &Assignment::new().with("grid", "de")).unwrap_err();
    assert!(err.to_string().contains("one of [fr, us, cn]"), "{err}");
}

/// Quantities sharing a property value are pooled
#[test]
fn test_combine_by_property() {
    let model = yaml(
        r#"
parameters:
  - name: mass
    type: float
    default: 2.0
quantities:
  - name: production
    expr: "mass * 3"
    properties:
      stage: manufacturing
  - name: assembly
    expr: "1.5"
    properties:
      stage: manufacturing
  - name: disposal
    expr: "mass / 4"
    properties:
      stage: end_of_life
  - name: total
    expr: "production + assembly + disposal"
"#,
    );

    let result = evaluate(&model, &Assignment::new()).unwrap();
    let by_stage = result.combine_by_property(&model, "stage");
    assert_eq!(by_stage.len(), 2);
    assert_eq!(by_stage["manufacturing"], 7.5);
    assert_eq!(by_stage["end_of_life"], 0.5);
    assert_eq!(result.get("total"), Some(8.0));
    assert!(result.combine_by_property(&model, "category").is_empty());
}
