//! Expression graph: named quantities and the references between them

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use rustc_hash::FxHashMap;

use crate::error::{CyclicDependencyError, ModelError, NumericError};
use crate::expr::Expr;
use crate::model::{QuantityId, SymbolId};

/// A named quantity with its bound expression
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub name: String,
    /// Expression source as written in the model document
    pub source: String,
    pub expr: Expr,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ExpressionGraph {
    quantities: Vec<Quantity>,
    names: Vec<String>,
    index: FxHashMap<String, QuantityId>,
    /// Distinct quantities each quantity references, in first-use order
    dependencies: Vec<Vec<QuantityId>>,
}

impl ExpressionGraph {
    /// Build the graph from quantities whose expressions are already bound.
    pub fn new(quantities: Vec<Quantity>) -> Result<Self, ModelError> {
        let mut index = FxHashMap::default();
        for (i, quantity) in quantities.iter().enumerate() {
            if index
                .insert(quantity.name.clone(), QuantityId(i as u32))
                .is_some()
            {
                return Err(ModelError::DuplicateQuantity(quantity.name.clone()));
            }
        }

        let mut dependencies = Vec::with_capacity(quantities.len());
        for quantity in &quantities {
            let mut refs = Vec::new();
            quantity.expr.quantity_refs(&mut refs);
            let mut distinct: Vec<QuantityId> = Vec::with_capacity(refs.len());
            for id in refs {
                if id.index() >= quantities.len() {
                    return Err(ModelError::UndeclaredSymbol {
                        quantity: quantity.name.clone(),
                        symbol: format!("$q{}", id.0),
                    });
                }
                if !distinct.contains(&id) {
                    distinct.push(id);
                }
            }
            dependencies.push(distinct);
        }

        let names = quantities.iter().map(|q| q.name.clone()).collect();
        Ok(Self {
            quantities,
            names,
            index,
            dependencies,
        })
    }

    #[must_use]
    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    #[must_use]
    pub fn quantity(&self, id: QuantityId) -> &Quantity {
        &self.quantities[id.index()]
    }

    /// Quantity names indexed by [`QuantityId`]
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<QuantityId> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Quantities directly referenced by `id`
    #[must_use]
    pub fn dependencies(&self, id: QuantityId) -> &[QuantityId] {
        &self.dependencies[id.index()]
    }

    /// Order in which every quantity comes after all quantities it
    /// references.
    ///
    /// Kahn's algorithm over a min-heap of ready quantities, so among
    /// quantities that are ready at the same time the one declared first is
    /// emitted first. The order is therefore fully deterministic.
    pub fn topological_order(&self) -> Result<Vec<QuantityId>, CyclicDependencyError> {
        let n = self.quantities.len();
        let mut pending: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, deps) in self.dependencies.iter().enumerate() {
            for dep in deps {
                dependents[dep.index()].push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(QuantityId(i as u32));
            for &dependent in &dependents[i] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() == n {
            Ok(order)
        } else {
            Err(self.find_cycle(&pending))
        }
    }

    /// Walk references among the quantities Kahn's algorithm could not
    /// emit. Each of those still references another unemitted quantity, so
    /// the walk must revisit a node.
    fn find_cycle(&self, pending: &[usize]) -> CyclicDependencyError {
        let stuck = |i: usize| pending[i] > 0;
        let Some(start) = (0..pending.len()).find(|&i| stuck(i)) else {
            return CyclicDependencyError { cycle: Vec::new() };
        };

        let mut path: Vec<usize> = Vec::new();
        let mut position: FxHashMap<usize, usize> = FxHashMap::default();
        let mut current = start;
        loop {
            if let Some(&at) = position.get(&current) {
                let mut cycle: Vec<String> =
                    path[at..].iter().map(|&i| self.names[i].clone()).collect();
                cycle.push(self.names[current].clone());
                return CyclicDependencyError { cycle };
            }
            position.insert(current, path.len());
            path.push(current);
            match self.dependencies[current]
                .iter()
                .map(|id| id.index())
                .find(|&dep| stuck(dep))
            {
                Some(next) => current = next,
                None => {
                    return CyclicDependencyError {
                        cycle: path.iter().map(|&i| self.names[i].clone()).collect(),
                    };
                }
            }
        }
    }

    /// Substitute symbol values into one quantity's expression and fold
    /// constants. References to other quantities stay symbolic.
    pub fn substitute(&self, id: QuantityId, symbols: &[f64]) -> Result<Expr, NumericError> {
        self.quantities[id.index()]
            .expr
            .substitute(&|symbol: SymbolId| symbols.get(symbol.index()).copied())
    }
}
