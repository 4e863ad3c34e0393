use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metadata::ModelMetadata;
use super::parameters::Parameter;

/// Serialized form of a model, as read from YAML or JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub quantities: Vec<QuantityDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantityDocument {
    pub name: String,
    /// Expression source text
    pub expr: String,
    /// Free-form labels such as an impact category or life-cycle stage
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}
