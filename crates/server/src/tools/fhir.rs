//! POSTing generated resources to a FHIR server

use std::fmt;
use std::time::Duration;

use fhir_synth_core::OperationOutcome;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::truncate_chars;
use crate::config::FhirAuth;

const FHIR_JSON: &str = "application/fhir+json";

/// Response bodies longer than this are cut in reports
const MAX_REPORTED_BODY: usize = 500;

#[derive(Debug, Error)]
pub enum FhirPostError {
    #[error("POST to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not serialize FHIR resource: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of a POST; non-2xx statuses are reported, not raised
#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub endpoint: String,
    pub status: u16,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
}

impl PostReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Display for PostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POST {} returned HTTP {}", self.endpoint, self.status)?;
        match &self.outcome {
            Some(outcome) => write!(f, "\n{}", outcome.summary()),
            None if !self.body.trim().is_empty() => {
                write!(f, "\n{}", truncate_chars(self.body.trim(), MAX_REPORTED_BODY))
            }
            None => Ok(()),
        }
    }
}

/// HTTP client for FHIR servers
#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    auth: Option<FhirAuth>,
}

impl FhirClient {
    pub fn new(timeout: Duration, auth: Option<FhirAuth>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            auth,
        })
    }

    pub async fn post(
        &self,
        endpoint: &str,
        resource: &JsonValue,
    ) -> Result<PostReport, FhirPostError> {
        let body = serde_json::to_vec(resource)?;
        let transport = |source| FhirPostError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let mut request = self
            .http
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
            .header(reqwest::header::ACCEPT, FHIR_JSON)
            .body(body);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.user, auth.password.as_deref());
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        let outcome = OperationOutcome::from_body(&body);

        if outcome.as_ref().is_some_and(OperationOutcome::has_errors) {
            tracing::warn!(endpoint, status, "FHIR server reported errors");
        } else {
            tracing::info!(endpoint, status, "Posted FHIR resource");
        }

        Ok(PostReport {
            endpoint: endpoint.to_string(),
            status,
            body,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::json;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_post_sends_fhir_json_with_basic_auth() {
        let router = Router::new().route(
            "/fhir",
            post(|headers: HeaderMap, body: String| async move {
                assert_eq!(headers["content-type"], FHIR_JSON);
                assert!(headers["authorization"].to_str().unwrap().starts_with("Basic "));
                let value: JsonValue = serde_json::from_str(&body).unwrap();
                assert_eq!(value["resourceType"], "Bundle");
                (StatusCode::OK, r#"{"resourceType":"Bundle","type":"transaction-response"}"#)
            }),
        );
        let base = spawn(router).await;

        let auth = FhirAuth {
            user: "synth".to_string(),
            password: Some("secret".to_string()),
        };
        let client = FhirClient::new(Duration::from_secs(5), Some(auth)).unwrap();
        let report = client
            .post(&format!("{base}/fhir"), &json!({"resourceType": "Bundle", "type": "transaction"}))
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.outcome.is_none());
        assert!(report.to_string().starts_with("POST "));
    }

    #[tokio::test]
    async fn test_rejection_is_reported_with_outcome() {
        let router = Router::new().route(
            "/fhir",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    r#"{"resourceType":"OperationOutcome","issue":[{"severity":"error","code":"invalid","diagnostics":"Bundle.type is required"}]}"#,
                )
            }),
        );
        let base = spawn(router).await;

        let client = FhirClient::new(Duration::from_secs(5), None).unwrap();
        let report = client
            .post(&format!("{base}/fhir"), &json!({"resourceType": "Bundle"}))
            .await
            .unwrap();

        assert_eq!(report.status, 422);
        assert!(!report.is_success());
        assert!(report.outcome.as_ref().unwrap().has_errors());
        assert!(report.to_string().contains("Bundle.type is required"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FhirClient::new(Duration::from_secs(2), None).unwrap();
        let err = client
            .post(&format!("http://{addr}/fhir"), &json!({"resourceType": "Bundle"}))
            .await
            .unwrap_err();
        assert!(matches!(err, FhirPostError::Transport { .. }));
    }
}
