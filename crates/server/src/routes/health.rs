//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::startup::Components;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    passages: usize,
    embedding_model: String,
    dimensions: usize,
    tools: Vec<String>,
}

/// GET /health - report the loaded index and the enabled tools
pub async fn check(State(app): State<Components>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        passages: app.index.len(),
        embedding_model: app.index.embedding_model().to_string(),
        dimensions: app.index.dimensions(),
        tools: app.pipeline.tool_names(),
    })
}
