//! Classification and rendering of the model's final answer

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::bundle::{Bundle, ResourceSummary};

/// What the model produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Prose,
    FhirBundle,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Prose => "prose",
            ArtifactKind::FhirBundle => "fhir_bundle",
        }
    }
}

/// A classified and rendered answer
#[derive(Debug, Clone, Serialize)]
pub struct FormattedOutput {
    pub kind: ArtifactKind,
    pub rendered: String,
    /// Resources in the artifact; empty for prose
    pub resources: Vec<ResourceSummary>,
    /// Parsed FHIR JSON, present only for `FhirBundle`
    #[serde(skip)]
    pub document: Option<JsonValue>,
}

/// True if `value` is a JSON object with a non-empty string `resourceType`
pub fn is_fhir_resource(value: &JsonValue) -> bool {
    value
        .get("resourceType")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty())
}

/// Candidate JSON text: the whole answer, or the first fenced code block
fn json_candidate(text: &str) -> &str {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed;
    }

    // Fenced block; the rest of the opening line is an info string
    // such as json, JSON or fhir
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body = match after.split_once('\n') {
            Some((info, rest)) if !info.trim_start().starts_with('{') => rest,
            _ => after,
        };
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    trimmed
}

/// Classify the final answer.
///
/// FHIR if the answer (or its first fenced block) parses as a FHIR resource;
/// anything else, including truncated or malformed JSON, is prose.
pub fn format_answer(answer: &str) -> FormattedOutput {
    let candidate = json_candidate(answer);

    match serde_json::from_str::<JsonValue>(candidate) {
        Ok(document) if is_fhir_resource(&document) => {
            let resources = if document["resourceType"] == "Bundle" {
                serde_json::from_value::<Bundle>(document.clone())
                    .map(|bundle| bundle.resources())
                    .unwrap_or_default()
            } else {
                ResourceSummary::of(&document).into_iter().collect()
            };
            let rendered =
                serde_json::to_string_pretty(&document).unwrap_or_else(|_| candidate.to_string());
            FormattedOutput {
                kind: ArtifactKind::FhirBundle,
                rendered,
                resources,
                document: Some(document),
            }
        }
        _ => FormattedOutput {
            kind: ArtifactKind::Prose,
            rendered: answer.trim().to_string(),
            resources: Vec::new(),
            document: None,
        },
    }
}
