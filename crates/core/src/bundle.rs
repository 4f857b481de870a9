use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// FHIR Bundle resource as produced by the model.
///
/// Only the fields the formatter needs are typed. `type` is optional and
/// free-form here because generated bundles often omit or miscase it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

/// Entry in a Bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<JsonValue>,
}

/// Short description of one resource inside a generated artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ResourceSummary {
    /// Summarize a resource object, `None` if it carries no `resourceType`
    pub fn of(resource: &JsonValue) -> Option<Self> {
        let resource_type = resource.get("resourceType")?.as_str()?;
        Some(Self {
            resource_type: resource_type.to_string(),
            id: resource
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

/// `Patient/p1`, or just `Patient` without an id
impl fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.resource_type, id),
            None => f.write_str(&self.resource_type),
        }
    }
}

impl Bundle {
    /// Summaries of every entry resource that has a resource type
    pub fn resources(&self) -> Vec<ResourceSummary> {
        self.entry
            .iter()
            .filter_map(|e| e.resource.as_ref())
            .filter_map(ResourceSummary::of)
            .collect()
    }
}
