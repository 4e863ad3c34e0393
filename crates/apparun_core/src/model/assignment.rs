use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::parameters::ParamValue;

/// Parameter name to value. Any subset of the model's parameters; missing
/// entries fall back to defaults when the assignment is completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, ParamValue>);

impl Assignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Assignment {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One entry of a batch: a single value shared by every row, or one value
/// per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchValue {
    Many(Vec<ParamValue>),
    One(ParamValue),
}

impl From<ParamValue> for BatchValue {
    fn from(value: ParamValue) -> Self {
        BatchValue::One(value)
    }
}

impl From<Vec<ParamValue>> for BatchValue {
    fn from(values: Vec<ParamValue>) -> Self {
        BatchValue::Many(values)
    }
}

impl From<f64> for BatchValue {
    fn from(value: f64) -> Self {
        BatchValue::One(value.into())
    }
}

impl From<i64> for BatchValue {
    fn from(value: i64) -> Self {
        BatchValue::One(value.into())
    }
}

impl From<bool> for BatchValue {
    fn from(value: bool) -> Self {
        BatchValue::One(value.into())
    }
}

impl From<&str> for BatchValue {
    fn from(value: &str) -> Self {
        BatchValue::One(value.into())
    }
}

/// Assignment whose entries may be lists; scalars are broadcast to the
/// common list length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchAssignment(BTreeMap<String, BatchValue>);

impl BatchAssignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<BatchValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<BatchValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BatchValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Assignment> for BatchAssignment {
    fn from(assignment: Assignment) -> Self {
        Self(
            assignment
                .0
                .into_iter()
                .map(|(name, value)| (name, BatchValue::One(value)))
                .collect(),
        )
    }
}
