//! Reading and writing model documents

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::error::ModelError;
use crate::expr::{Reference, parse};
use crate::graph::{ExpressionGraph, Quantity};
use crate::model::{Model, ModelDocument, QuantityId};
use crate::registry::ParameterRegistry;

/// Serialization format of a model document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Yaml,
    Json,
}

impl ModelFormat {
    /// Guess the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(ModelFormat::Yaml),
            "json" => Some(ModelFormat::Json),
            _ => None,
        }
    }
}

/// Deserialize a document without validating it
pub fn parse_document(source: &str, format: ModelFormat) -> Result<ModelDocument, ModelError> {
    match format {
        ModelFormat::Yaml => {
            serde_saphyr::from_str(source).map_err(|e| ModelError::Syntax(e.to_string()))
        }
        ModelFormat::Json => {
            serde_json::from_str(source).map_err(|e| ModelError::Syntax(e.to_string()))
        }
    }
}

/// Load and validate a model from document text
pub fn load_model(source: &str, format: ModelFormat) -> Result<Model, ModelError> {
    build_model(parse_document(source, format)?)
}

/// Validate a document and assemble the model.
///
/// Checks, in order: parameter declarations, quantity names, expression
/// syntax, that every identifier names a symbol or quantity, and finally
/// that quantity references are acyclic.
pub fn build_model(document: ModelDocument) -> Result<Model, ModelError> {
    let registry = ParameterRegistry::new(document.parameters)?;

    let mut seen = FxHashSet::default();
    for quantity in &document.quantities {
        if !seen.insert(quantity.name.as_str()) {
            return Err(ModelError::DuplicateQuantity(quantity.name.clone()));
        }
        if registry.lookup_symbol(&quantity.name).is_some() {
            return Err(ModelError::DuplicateSymbol(quantity.name.clone()));
        }
    }

    let names: Vec<&str> = document.quantities.iter().map(|q| q.name.as_str()).collect();
    let lookup = |name: &str| {
        registry
            .lookup_symbol(name)
            .map(Reference::Symbol)
            .or_else(|| {
                names
                    .iter()
                    .position(|n| *n == name)
                    .map(|i| Reference::Quantity(QuantityId(i as u32)))
            })
    };

    let mut quantities = Vec::with_capacity(document.quantities.len());
    for quantity in &document.quantities {
        let expr = parse(&quantity.expr).map_err(|source| ModelError::Expression {
            quantity: quantity.name.clone(),
            source,
        })?;
        let expr = expr
            .resolve(&lookup)
            .map_err(|symbol| ModelError::UndeclaredSymbol {
                quantity: quantity.name.clone(),
                symbol,
            })?;
        quantities.push(Quantity {
            name: quantity.name.clone(),
            source: quantity.expr.clone(),
            expr,
            properties: quantity.properties.clone(),
        });
    }

    let graph = ExpressionGraph::new(quantities)?;
    let model = Model::new(document.metadata, registry, graph)?;
    tracing::debug!(
        parameters = model.parameters().len(),
        quantities = model.quantity_names().len(),
        "loaded model"
    );
    Ok(model)
}

/// Serialize a model back to document text
pub fn dump_model(model: &Model, format: ModelFormat) -> Result<String, ModelError> {
    let document = model.to_document();
    match format {
        ModelFormat::Yaml => {
            serde_saphyr::to_string(&document).map_err(|e| ModelError::Syntax(e.to_string()))
        }
        ModelFormat::Json => {
            serde_json::to_string_pretty(&document).map_err(|e| ModelError::Syntax(e.to_string()))
        }
    }
}
