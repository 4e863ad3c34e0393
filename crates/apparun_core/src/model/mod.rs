mod assignment;
mod distribution;
mod document;
mod ids;
mod metadata;
mod parameters;
mod results;

pub use assignment::{Assignment, BatchAssignment, BatchValue};
pub use distribution::{Distribution, Sampler};
pub use document::{ModelDocument, QuantityDocument};
pub use ids::{ParameterId, QuantityId, SymbolId};
pub use metadata::{LcaPractitioner, LcaStudy, ModelMetadata};
pub use parameters::{ParamKind, ParamValue, Parameter};
pub use results::{
    DistributionResult, EvaluationResult, IndexEstimate, ParameterImportance,
    QuantityDistribution, SensitivityResult, SummaryStats,
};

use crate::error::{Error, EvalError, ModelError};
use crate::expr::{Expr, ExprNames};
use crate::graph::ExpressionGraph;
use crate::registry::ParameterRegistry;

/// A loaded impact model.
///
/// Immutable once built: evaluation only ever reads it, so a model can be
/// shared between threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Model {
    metadata: Option<ModelMetadata>,
    registry: ParameterRegistry,
    graph: ExpressionGraph,
    /// Cached topological order of the graph
    order: Vec<QuantityId>,
}

impl Model {
    /// Assemble a model, rejecting dependency cycles
    pub fn new(
        metadata: Option<ModelMetadata>,
        registry: ParameterRegistry,
        graph: ExpressionGraph,
    ) -> Result<Self, ModelError> {
        let order = graph.topological_order()?;
        Ok(Self {
            metadata,
            registry,
            graph,
            order,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    #[must_use]
    pub fn graph(&self) -> &ExpressionGraph {
        &self.graph
    }

    /// Quantities in an order where every quantity follows its references
    #[must_use]
    pub fn order(&self) -> &[QuantityId] {
        &self.order
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        self.registry.parameters()
    }

    /// Quantity names in declaration order
    #[must_use]
    pub fn quantity_names(&self) -> &[String] {
        self.graph.names()
    }

    /// Names used to render bound expressions of this model
    #[must_use]
    pub fn expr_names(&self) -> ExprNames<'_> {
        ExprNames {
            symbols: self.registry.symbol_names(),
            quantities: self.graph.names(),
        }
    }

    /// Substitute a (possibly partial) assignment into one quantity.
    ///
    /// The assignment is completed with defaults first; references to other
    /// quantities remain symbolic.
    pub fn substitute(&self, quantity: &str, assignment: &Assignment) -> Result<Expr, Error> {
        let id = self
            .graph
            .lookup(quantity)
            .ok_or_else(|| EvalError::UnresolvedReference {
                quantity: quantity.to_string(),
                reference: quantity.to_string(),
            })?;
        let completed = self.registry.complete(assignment)?;
        let symbols = self.registry.symbol_values(&completed)?;
        self.graph
            .substitute(id, &symbols)
            .map_err(|source| {
                EvalError::Numeric {
                    quantity: quantity.to_string(),
                    source,
                }
                .into()
            })
    }

    /// Write the model back out as a document
    #[must_use]
    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            metadata: self.metadata.clone(),
            parameters: self.registry.parameters().to_vec(),
            quantities: self
                .graph
                .quantities()
                .iter()
                .map(|quantity| QuantityDocument {
                    name: quantity.name.clone(),
                    expr: quantity.source.clone(),
                    properties: quantity.properties.clone(),
                })
                .collect(),
        }
    }
}
