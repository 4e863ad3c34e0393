//! Tests for the Builder DSL
//!
//! These tests demonstrate and verify the fluent builder API for assembling
//! models in code instead of from a document.

use crate::config::ModelBuilder;
use crate::error::ModelError;
use crate::evaluate::evaluate;
use crate::load::{ModelFormat, dump_model, load_model};
use crate::model::{Assignment, Distribution, LcaPractitioner, LcaStudy, Parameter};

/// Test basic ModelBuilder usage
#[test]
fn test_model_builder_basic() {
    let model = ModelBuilder::new()
        .parameter(Parameter::float("mass", 2.0))
        .quantity("impact", "mass * 3")
        .build()
        .unwrap();

    assert!(model.metadata().is_none());
    assert_eq!(model.parameters().len(), 1);
    assert_eq!(
        evaluate(&model, &Assignment::new()).unwrap().get("impact"),
        Some(6.0)
    );
}

/// Test a model with every parameter kind, metadata and properties
#[test]
fn test_model_builder_full() {
    let model = ModelBuilder::new()
        .author(LcaPractitioner {
            name: Some("Jane Doe".to_string()),
            organization: Some("Example Lab".to_string()),
            mail: None,
        })
        .report(LcaStudy {
            version: Some("2".to_string()),
            ..Default::default()
        })
        .parameter(
            Parameter::float("mass", 2.0)
                .with_distribution(Distribution::Uniform { min: 1.0, max: 3.0 }),
        )
        .parameter(Parameter::integer("count", 10))
        .parameter(Parameter::boolean("reuse", false))
        .parameter(Parameter::enumeration("grid", ["fr", "de"], "fr"))
        .quantity_with(
            "production",
            "mass * count * (0.1 * grid_fr + 0.5 * grid_de)",
            [("stage", "manufacturing")],
        )
        .quantity_with("transport", "count * 0.2", [("stage", "distribution")])
        .quantity("total", "(production + transport) * (1 - 0.5 * reuse)")
        .build()
        .unwrap();

    let metadata = model.metadata().unwrap();
    assert_eq!(metadata.author.as_ref().unwrap().name.as_deref(), Some("Jane Doe"));
    assert_eq!(metadata.report.as_ref().unwrap().version.as_deref(), Some("2"));
    assert!(metadata.reviewer.is_none());

    let result = evaluate(&model, &Assignment::new().with("grid", "de")).unwrap();
    assert_eq!(result.get("production"), Some(10.0));
    assert_eq!(result.get("transport"), Some(2.0));
    assert_eq!(result.get("total"), Some(12.0));

    let reused = evaluate(&model, &Assignment::new().with("grid", "de").with("reuse", true)).unwrap();
    assert_eq!(reused.get("total"), Some(6.0));
}

/// A built model dumps to a document that loads back to the same model
#[test]
fn test_builder_matches_loaded_document() {
    let builder = ModelBuilder::new()
        .parameter(Parameter::float("x", 1.5))
        .quantity("y", "x ^ 2");
    assert_eq!(builder.document().quantities.len(), 1);

    let model = builder.build().unwrap();
    let json = dump_model(&model, ModelFormat::Json).unwrap();
    let loaded = load_model(&json, ModelFormat::Json).unwrap();
    assert_eq!(loaded.to_document(), model.to_document());
    assert_eq!(
        evaluate(&loaded, &Assignment::new()).unwrap().get("y"),
        Some(2.25)
    );
}

/// Validation applies to built models just as to loaded ones
#[test]
fn test_builder_validation() {
    let err = ModelBuilder::new()
        .parameter(Parameter::float("x", 1.0))
        .parameter(Parameter::float("x", 2.0))
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::DuplicateParameter("x".to_string()));

    let err = ModelBuilder::new()
        .quantity("a", "b")
        .quantity("b", "a")
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::Cyclic(_)));

    let err = ModelBuilder::new()
        .parameter(
            Parameter::integer("n", 1).with_distribution(Distribution::Bernoulli { p: 0.5 }),
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidParameter { ref parameter, .. } if parameter == "n"));
}
