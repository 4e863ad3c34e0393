//! Model Builder
//!
//! Fluent API for assembling a model in code instead of loading a document.
//! The result goes through the same validation as a loaded document.
//!
//! # Example
//!
//! ```ignore
//! use apparun_core::config::ModelBuilder;
//! use apparun_core::model::{Distribution, Parameter};
//!
//! let model = ModelBuilder::new()
//!     .parameter(Parameter::float("mass", 2.0))
//!     .parameter(Parameter::enumeration("region", ["FR", "EU"], "FR"))
//!     .quantity("transport", "mass * (0.2 * region_FR + 0.3 * region_EU)")
//!     .quantity_with("total", "transport + 1", [("stage", "use")])
//!     .build()?;
//! ```

use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::load::build_model;
use crate::model::{
    LcaPractitioner, LcaStudy, Model, ModelDocument, ModelMetadata, Parameter, QuantityDocument,
};

/// Builder for models with document-equivalent validation
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    document: ModelDocument,
}

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    fn metadata_mut(&mut self) -> &mut ModelMetadata {
        self.document.metadata.get_or_insert_with(ModelMetadata::default)
    }

    #[must_use]
    pub fn author(mut self, author: LcaPractitioner) -> Self {
        self.metadata_mut().author = Some(author);
        self
    }

    #[must_use]
    pub fn reviewer(mut self, reviewer: LcaPractitioner) -> Self {
        self.metadata_mut().reviewer = Some(reviewer);
        self
    }

    #[must_use]
    pub fn report(mut self, report: LcaStudy) -> Self {
        self.metadata_mut().report = Some(report);
        self
    }

    // =========================================================================
    // Parameters and quantities
    // =========================================================================

    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.document.parameters.push(parameter);
        self
    }

    /// Add a quantity from expression source text
    #[must_use]
    pub fn quantity(self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.quantity_with(name, expr, std::iter::empty::<(String, String)>())
    }

    /// Add a quantity carrying properties such as an impact category
    #[must_use]
    pub fn quantity_with(
        mut self,
        name: impl Into<String>,
        expr: impl Into<String>,
        properties: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let properties: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.document.quantities.push(QuantityDocument {
            name: name.into(),
            expr: expr.into(),
            properties,
        });
        self
    }

    /// The document built so far
    #[must_use]
    pub fn document(&self) -> &ModelDocument {
        &self.document
    }

    /// Validate and assemble the model
    pub fn build(self) -> Result<Model, ModelError> {
        build_model(self.document)
    }
}
