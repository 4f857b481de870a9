use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

/// FHIR OperationOutcome resource.
///
/// Used both for our own API errors and for reading what a remote FHIR
/// server answers to a POST. Issue codes are kept as strings since remote
/// servers are free to use any code from the value set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    fn single(severity: IssueSeverity, code: &str, diagnostics: &str) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue {
                severity,
                code: code.to_string(),
                diagnostics: Some(diagnostics.to_string()),
            }],
        }
    }

    pub fn error(code: &str, diagnostics: &str) -> Self {
        Self::single(IssueSeverity::Error, code, diagnostics)
    }

    pub fn invalid(diagnostics: &str) -> Self {
        Self::error("invalid", diagnostics)
    }

    pub fn throttled(diagnostics: &str) -> Self {
        Self::error("throttled", diagnostics)
    }

    /// Parse a response body as an OperationOutcome, if it is one
    pub fn from_body(body: &str) -> Option<Self> {
        let outcome: Self = serde_json::from_str(body).ok()?;
        (outcome.resource_type == "OperationOutcome").then_some(outcome)
    }

    /// True when any issue is an error or fatal
    pub fn has_errors(&self) -> bool {
        self.issue
            .iter()
            .any(|i| matches!(i.severity, IssueSeverity::Error | IssueSeverity::Fatal))
    }

    /// One line per issue: `severity/code: diagnostics`
    pub fn summary(&self) -> String {
        self.issue
            .iter()
            .map(|i| {
                let severity = match i.severity {
                    IssueSeverity::Fatal => "fatal",
                    IssueSeverity::Error => "error",
                    IssueSeverity::Warning => "warning",
                    IssueSeverity::Information => "information",
                };
                match &i.diagnostics {
                    Some(d) => format!("{severity}/{}: {d}", i.code),
                    None => format!("{severity}/{}", i.code),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_reads_server_outcome() {
        let body = r#"{"resourceType":"OperationOutcome","issue":[
            {"severity":"error","code":"business-rule","diagnostics":"Duplicate identifier"},
            {"severity":"warning","code":"informational"}
        ]}"#;
        let outcome = OperationOutcome::from_body(body).unwrap();
        assert!(outcome.has_errors());
        assert_eq!(
            outcome.summary(),
            "error/business-rule: Duplicate identifier\nwarning/informational"
        );
    }

    #[test]
    fn test_from_body_rejects_other_resources() {
        assert!(OperationOutcome::from_body(r#"{"resourceType":"Bundle"}"#).is_none());
        assert!(OperationOutcome::from_body("not json").is_none());
    }

    #[test]
    fn test_invalid_serializes_as_fhir() {
        let json = serde_json::to_value(OperationOutcome::invalid("Missing 'query'")).unwrap();
        assert_eq!(json["resourceType"], "OperationOutcome");
        assert_eq!(json["issue"][0]["severity"], "error");
        assert_eq!(json["issue"][0]["code"], "invalid");
    }
}
