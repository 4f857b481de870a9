//! OpenAI API client: chat completions with function tools, and embeddings

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatModel, Embedder, ModelError, ModelReply, ToolCall, ToolSpec};
use crate::agent::Turn;

/// Inputs per embeddings request
const EMBEDDING_BATCH: usize = 96;

/// Client for the OpenAI chat completions and embeddings APIs
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool call as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

/// Request body for chat completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
}

/// Response from chat completions
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Error detail from the API
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Message {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Convert the agent transcript into chat messages
pub fn to_messages(transcript: &[Turn]) -> Vec<Message> {
    transcript
        .iter()
        .map(|turn| match turn {
            Turn::Prompt(prompt) => Message::text("user", prompt),
            Turn::Assistant { content, calls } => Message {
                role: "assistant".to_string(),
                content: content.clone(),
                tool_calls: calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_call_id: None,
            },
            Turn::ToolResult {
                call_id, output, ..
            } => Message {
                role: "tool".to_string(),
                content: Some(output.as_message()),
                tool_calls: Vec::new(),
                tool_call_id: Some(call_id.clone()),
            },
            Turn::Answer(answer) => Message::text("assistant", answer),
        })
        .collect()
}

/// Interpret the assistant message of a completion
fn to_reply(message: Message) -> ModelReply {
    if message.tool_calls.is_empty() {
        return ModelReply::Answer(message.content.unwrap_or_default());
    }

    ModelReply::ToolCalls {
        content: message.content.filter(|c| !c.is_empty()),
        calls: message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect(),
    }
}

impl OpenAiClient {
    /// Create a new client; `timeout` bounds each individual request
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ModelError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_err) => api_err.error.message,
                Err(_) => body,
            };
            return Err(ModelError::Api { status, message });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ModelError::Malformed(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolSpec],
    ) -> Result<ModelReply, ModelError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: to_messages(transcript),
            tools: tools
                .iter()
                .map(|function| ToolDefinition {
                    kind: "function",
                    function,
                })
                .collect(),
        };

        let response: ChatResponse = self.post("/chat/completions", &request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Malformed("No choices in response".to_string()))?;

        tracing::debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("none"),
            tool_calls = choice.message.tool_calls.len(),
            "Chat completion received"
        );

        Ok(to_reply(choice.message))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBEDDING_BATCH) {
            let request = EmbeddingRequest {
                model: &self.embedding_model,
                input: batch,
            };
            let mut response: EmbeddingResponse = self.post("/embeddings", &request).await?;

            if response.data.len() != batch.len() {
                return Err(ModelError::Malformed(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    response.data.len()
                )));
            }
            response.data.sort_by_key(|d| d.index);
            vectors.extend(response.data.into_iter().map(|d| d.embedding));
        }

        tracing::debug!(count = vectors.len(), model = %self.embedding_model, "Embedded texts");
        Ok(vectors)
    }
}
