//! Parameter registry: declared parameters, their numeric symbols, and the
//! ways assignments are produced for them.

use rand::SeedableRng;
use rand_pcg::Pcg64;
use rustc_hash::FxHashMap;

use crate::error::{AssignmentError, ModelError};
use crate::model::{
    Assignment, BatchAssignment, BatchValue, ParamValue, Parameter, ParameterId, Sampler, SymbolId,
};

#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    parameters: Vec<Parameter>,
    samplers: Vec<Option<Sampler>>,
    index: FxHashMap<String, ParameterId>,
    symbols: Vec<String>,
    symbol_index: FxHashMap<String, SymbolId>,
}

impl ParameterRegistry {
    /// Validate declarations and build the symbol table.
    ///
    /// Symbols are laid out in declaration order: one per scalar parameter,
    /// one per option for enum parameters.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, ModelError> {
        let mut index = FxHashMap::default();
        let mut samplers = Vec::with_capacity(parameters.len());
        let mut symbols = Vec::new();
        let mut symbol_index = FxHashMap::default();

        for (i, parameter) in parameters.iter().enumerate() {
            let invalid = |reason: String| ModelError::InvalidParameter {
                parameter: parameter.name.clone(),
                reason,
            };
            parameter.validate().map_err(invalid)?;
            if index
                .insert(parameter.name.clone(), ParameterId(i as u32))
                .is_some()
            {
                return Err(ModelError::DuplicateParameter(parameter.name.clone()));
            }
            samplers.push(Sampler::for_parameter(parameter).map_err(invalid)?);

            for name in parameter.symbol_names() {
                let id = SymbolId(symbols.len() as u32);
                if symbol_index.insert(name.clone(), id).is_some() {
                    return Err(ModelError::DuplicateSymbol(name));
                }
                symbols.push(name);
            }
        }

        tracing::debug!(
            parameters = parameters.len(),
            symbols = symbols.len(),
            "built parameter registry"
        );

        Ok(Self {
            parameters,
            samplers,
            index,
            symbols,
            symbol_index,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<ParameterId> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.id(name).map(|id| &self.parameters[id.index()])
    }

    #[must_use]
    pub fn parameter(&self, id: ParameterId) -> &Parameter {
        &self.parameters[id.index()]
    }

    /// Names of all numeric symbols, indexed by [`SymbolId`]
    #[must_use]
    pub fn symbol_names(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_index.get(name).copied()
    }

    /// Every parameter at its default
    #[must_use]
    pub fn defaults(&self) -> Assignment {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }

    fn check_known(&self, partial: &Assignment) -> Result<(), AssignmentError> {
        match partial.iter().find(|(name, _)| !self.index.contains_key(*name)) {
            Some((name, _)) => Err(AssignmentError::UnknownParameter { name: name.clone() }),
            None => Ok(()),
        }
    }

    /// Fill missing parameters with defaults and type-check supplied ones.
    ///
    /// The result names every parameter, with values normalized to their
    /// parameter's kind.
    pub fn complete(&self, partial: &Assignment) -> Result<Assignment, AssignmentError> {
        self.check_known(partial)?;
        self.parameters
            .iter()
            .map(|parameter| {
                let value = partial.get(&parameter.name).unwrap_or(&parameter.default);
                Ok::<_, AssignmentError>((parameter.name.clone(), parameter.coerce(value)?))
            })
            .collect()
    }

    /// Numeric symbol values of a complete assignment, indexed by [`SymbolId`]
    pub fn symbol_values(&self, assignment: &Assignment) -> Result<Vec<f64>, AssignmentError> {
        let mut values = Vec::with_capacity(self.symbols.len());
        for parameter in &self.parameters {
            let value = match assignment.get(&parameter.name) {
                Some(value) => parameter.coerce(value)?,
                None => parameter.default.clone(),
            };
            parameter.push_symbols(&value, &mut values);
        }
        Ok(values)
    }

    /// Stochastic parameters the caller did not pin, in declaration order
    #[must_use]
    pub fn free_stochastic(&self, pinned: &Assignment) -> Vec<ParameterId> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_stochastic() && !pinned.contains(&p.name))
            .map(|(i, _)| ParameterId(i as u32))
            .collect()
    }

    /// Draw `n` complete assignments.
    ///
    /// Free stochastic parameters are drawn from their distributions;
    /// everything else keeps its pinned or default value. Draws come from a
    /// PCG64 stream seeded with `seed`, sample by sample and within a sample
    /// in declaration order, so the same seed always yields the same
    /// assignments.
    pub fn sample(
        &self,
        pinned: &Assignment,
        n: usize,
        seed: u64,
    ) -> Result<Vec<Assignment>, AssignmentError> {
        let base = self.complete(pinned)?;
        let free = self.free_stochastic(pinned);
        let mut rng = Pcg64::seed_from_u64(seed);

        Ok((0..n)
            .map(|_| {
                let mut assignment = base.clone();
                for &id in &free {
                    if let Some(sampler) = &self.samplers[id.index()] {
                        let name = self.parameters[id.index()].name.clone();
                        assignment.insert(name, sampler.draw(&mut rng));
                    }
                }
                assignment
            })
            .collect())
    }

    /// Map a point of the unit hypercube onto the `free` parameters through
    /// their inverse CDFs, on top of the complete assignment `base`.
    ///
    /// `point[i]` drives `free[i]`.
    #[must_use]
    pub fn sample_unit(&self, base: &Assignment, free: &[ParameterId], point: &[f64]) -> Assignment {
        let mut assignment = base.clone();
        for (&id, &u) in free.iter().zip(point) {
            if let Some(sampler) = &self.samplers[id.index()] {
                let name = self.parameters[id.index()].name.clone();
                assignment.insert(name, sampler.quantile(u));
            }
        }
        assignment
    }

    /// Expand a batch into one complete assignment per row.
    ///
    /// List entries must all have the same length; scalars are repeated on
    /// every row. A batch without lists yields a single row.
    pub fn broadcast(&self, batch: &BatchAssignment) -> Result<Vec<Assignment>, AssignmentError> {
        let mut rows: Option<(&str, usize)> = None;
        for (name, value) in batch.iter() {
            if !self.index.contains_key(name) {
                return Err(AssignmentError::UnknownParameter { name: name.clone() });
            }
            if let BatchValue::Many(values) = value {
                match rows {
                    None => rows = Some((name.as_str(), values.len())),
                    Some((first, len)) if len != values.len() => {
                        return Err(AssignmentError::BatchLengthMismatch {
                            first: first.to_string(),
                            first_len: len,
                            other: name.clone(),
                            other_len: values.len(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let count = rows.map_or(1, |(_, len)| len);
        (0..count)
            .map(|row| {
                let partial: Assignment = batch
                    .iter()
                    .map(|(name, value)| {
                        let value: &ParamValue = match value {
                            BatchValue::One(value) => value,
                            BatchValue::Many(values) => &values[row],
                        };
                        (name.clone(), value.clone())
                    })
                    .collect();
                self.complete(&partial)
            })
            .collect()
    }
}
