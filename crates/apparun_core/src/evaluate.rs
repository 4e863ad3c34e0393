//! Point and batch evaluation of a model

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::EvalError;
use crate::expr::{Reference, ReduceError, Scope};
use crate::model::{Assignment, BatchAssignment, EvaluationResult, Model, QuantityId, SymbolId};
use crate::progress::RunControl;

/// Values visible while walking the evaluation order
struct Values<'a> {
    symbols: &'a [f64],
    quantities: Vec<Option<f64>>,
}

impl Scope for Values<'_> {
    fn symbol(&self, id: SymbolId) -> Option<f64> {
        self.symbols.get(id.index()).copied()
    }

    fn quantity(&self, id: QuantityId) -> Option<f64> {
        self.quantities.get(id.index()).copied().flatten()
    }
}

fn reference_name(model: &Model, reference: &Reference) -> String {
    match reference {
        Reference::Symbol(id) => model
            .registry()
            .symbol_names()
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| format!("$s{}", id.0)),
        Reference::Quantity(id) => model
            .quantity_names()
            .get(id.index())
            .cloned()
            .unwrap_or_else(|| format!("$q{}", id.0)),
        Reference::Name(name) => name.clone(),
    }
}

/// Reduce the quantities in `order` given the symbol values.
///
/// Returns values indexed by [`QuantityId`]; quantities not in `order` are
/// `None`. A quantity referencing one that has not been computed yet fails
/// with [`EvalError::UnresolvedReference`].
pub(crate) fn evaluate_symbols(
    model: &Model,
    symbols: &[f64],
    order: &[QuantityId],
) -> Result<Vec<Option<f64>>, EvalError> {
    let mut values = Values {
        symbols,
        quantities: vec![None; model.graph().len()],
    };
    for &id in order {
        let quantity = model.graph().quantity(id);
        let value = quantity.expr.reduce(&values).map_err(|err| match err {
            ReduceError::Numeric(source) => EvalError::Numeric {
                quantity: quantity.name.clone(),
                source,
            },
            ReduceError::Unresolved(reference) => EvalError::UnresolvedReference {
                quantity: quantity.name.clone(),
                reference: reference_name(model, &reference),
            },
        })?;
        values.quantities[id.index()] = Some(value);
    }
    Ok(values.quantities)
}

/// Evaluate every quantity for a (possibly partial) assignment.
///
/// Missing parameters take their defaults. Quantities are reduced in the
/// model's dependency order.
pub fn evaluate(model: &Model, assignment: &Assignment) -> Result<EvaluationResult, EvalError> {
    evaluate_in_order(model, assignment, model.order())
}

/// Evaluate following a caller-supplied order instead of the model's own.
///
/// Only quantities in `order` are reported.
pub fn evaluate_in_order(
    model: &Model,
    assignment: &Assignment,
    order: &[QuantityId],
) -> Result<EvaluationResult, EvalError> {
    let completed = model.registry().complete(assignment)?;
    let symbols = model.registry().symbol_values(&completed)?;
    let values = evaluate_symbols(model, &symbols, order)?;
    Ok(EvaluationResult {
        values: order
            .iter()
            .filter_map(|id| {
                values[id.index()].map(|v| (model.quantity_names()[id.index()].clone(), v))
            })
            .collect(),
    })
}

/// Evaluate every row of a broadcast batch.
///
/// Rows are evaluated in order and the first failing row aborts the batch.
pub fn evaluate_batch(
    model: &Model,
    batch: &BatchAssignment,
) -> Result<Vec<EvaluationResult>, EvalError> {
    let rows = model.registry().broadcast(batch)?;
    tracing::debug!(rows = rows.len(), "evaluating batch");
    rows.iter().map(|row| evaluate(model, row)).collect()
}

/// Outcome of one evaluation inside a sampled run
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// Values of every quantity, indexed by [`QuantityId`]
    Done(Vec<f64>),
    Failed(EvalError),
    /// Not attempted because the run was cancelled or timed out
    Skipped,
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }
}

fn evaluate_one(model: &Model, assignment: &Assignment, control: &RunControl<'_>) -> Outcome {
    if control.should_stop() {
        return Outcome::Skipped;
    }
    let outcome: Result<Vec<f64>, EvalError> = model
        .registry()
        .symbol_values(assignment)
        .map_err(EvalError::from)
        .and_then(|symbols| evaluate_symbols(model, &symbols, model.order()))
        .map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect());
    control.tick();
    match outcome {
        Ok(values) => Outcome::Done(values),
        Err(err) => Outcome::Failed(err),
    }
}

/// Evaluate complete assignments, in parallel when enabled. Outcomes keep
/// the input order.
pub(crate) fn evaluate_many(
    model: &Model,
    assignments: &[Assignment],
    control: &RunControl<'_>,
) -> Vec<Outcome> {
    #[cfg(feature = "parallel")]
    let outcomes: Vec<Outcome> = assignments
        .par_iter()
        .map(|assignment| evaluate_one(model, assignment, control))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Outcome> = assignments
        .iter()
        .map(|assignment| evaluate_one(model, assignment, control))
        .collect();

    outcomes
}

/// Number of leading outcomes that were actually evaluated
pub(crate) fn completed_prefix(outcomes: &[Outcome]) -> usize {
    outcomes
        .iter()
        .position(Outcome::is_skipped)
        .unwrap_or(outcomes.len())
}
