//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fhir_synth_core::{CorpusError, IndexError, OperationOutcome};
use thiserror::Error;

use crate::agent::AgentError;
use crate::ai::ModelError;

/// Fatal errors raised before any interaction can happen
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("OPENAI_API_KEY is not set. Add it to your .env file or environment.")]
    MissingApiKey,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidSetting { key: String, value: String },

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedding the corpus failed: {0}")]
    Embedding(#[source] ModelError),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Web API error type, rendered as a FHIR OperationOutcome
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Generation(AgentError),
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        AppError::Generation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, outcome) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, OperationOutcome::invalid(&msg)),
            AppError::Generation(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                OperationOutcome::error("exception", &format!("Generation failed: {err}")),
            ),
        };

        (status, Json(outcome)).into_response()
    }
}
