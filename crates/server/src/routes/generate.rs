//! Generation endpoints: the HTML form and the JSON API

use axum::{
    Form, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use fhir_synth_core::{ArtifactKind, ResourceSummary};
use serde::{Deserialize, Serialize};

use super::page::{PageView, ResultView, render_page};
use crate::error::AppError;
use crate::pipeline::Generation;
use crate::startup::Components;
use crate::tools::PostReport;

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// POST a FHIR result here
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub kind: ArtifactKind,
    pub response: String,
    pub resources: Vec<ResourceSummary>,
    pub tools_used: Vec<String>,
    pub turns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_error: Option<String>,
}

/// Outcome of the optional FHIR POST after a generation
enum PostResult {
    Skipped,
    Sent(PostReport),
    Failed(String),
}

fn requested_endpoint(endpoint: Option<&str>) -> Option<&str> {
    endpoint.map(str::trim).filter(|e| !e.is_empty())
}

async fn post_if_requested(app: &Components, generation: &Generation, endpoint: Option<&str>) -> PostResult {
    let Some(endpoint) = endpoint else {
        return PostResult::Skipped;
    };
    let Some(document) = &generation.output.document else {
        return PostResult::Skipped;
    };
    if let Some(report) = generation.posted_to(endpoint) {
        tracing::debug!(endpoint, "Agent already posted the resource");
        return PostResult::Sent(report.clone());
    }

    match app.fhir.post(endpoint, document).await {
        Ok(report) => PostResult::Sent(report),
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "FHIR POST failed");
            PostResult::Failed(e.to_string())
        }
    }
}

/// POST /generate - form submission, answers with the page
pub async fn form(
    State(app): State<Components>,
    Form(input): Form<GenerateForm>,
) -> (StatusCode, Html<String>) {
    let mut view = PageView {
        query: input.query.clone(),
        endpoint: input.endpoint.clone(),
        ..Default::default()
    };

    let scenario = input.query.trim();
    if scenario.is_empty() {
        view.error = Some("Please enter a valid request.".to_string());
        return (StatusCode::BAD_REQUEST, Html(render_page(&view)));
    }

    // The form only posts when the user typed an endpoint
    let endpoint = requested_endpoint(Some(input.endpoint.as_str()));
    let generation = match app.pipeline.generate(scenario, endpoint).await {
        Ok(generation) => generation,
        Err(e) => {
            tracing::error!(error = %e, "Generation failed");
            view.error = Some(format!("Error during generation: {e}"));
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(render_page(&view)));
        }
    };

    let post = match post_if_requested(&app, &generation, endpoint).await {
        PostResult::Skipped => None,
        PostResult::Sent(report) => Some(report.to_string()),
        PostResult::Failed(reason) => Some(format!("Failed to POST bundle: {reason}")),
    };

    view.result = Some(ResultView {
        kind: generation.output.kind.as_str().to_string(),
        rendered: generation.output.rendered,
        tools_used: generation.tools_used,
        resources: generation.output.resources.iter().map(ToString::to_string).collect(),
        post,
    });
    (StatusCode::OK, Html(render_page(&view)))
}

/// POST /api/generate - JSON in, JSON out
pub async fn api(
    State(app): State<Components>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let scenario = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'query'".to_string()))?;

    let endpoint = requested_endpoint(request.endpoint.as_deref());
    let generation = app.pipeline.generate(scenario, endpoint).await?;

    let (post, post_error) = match post_if_requested(&app, &generation, endpoint).await {
        PostResult::Skipped => (None, None),
        PostResult::Sent(report) => (Some(report), None),
        PostResult::Failed(reason) => (None, Some(reason)),
    };

    Ok(Json(GenerateResponse {
        kind: generation.output.kind,
        response: generation.output.rendered,
        resources: generation.output.resources,
        tools_used: generation.tools_used,
        turns: generation.turns,
        post,
        post_error,
    }))
}
