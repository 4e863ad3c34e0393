use serde::{Deserialize, Serialize};

/// Descriptive information carried along with a model. Never affects
/// evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<LcaPractitioner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<LcaPractitioner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<LcaStudy>,
}

/// A person who built or reviewed the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LcaPractitioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
}

/// The study the model was produced for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LcaStudy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Version of the model-building tool that produced the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appabuild_version: Option<String>,
}
