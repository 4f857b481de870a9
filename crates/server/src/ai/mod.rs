//! Model access: chat completions with tools, and embeddings

pub mod client;
pub mod lexical;

pub use client::OpenAiClient;
pub use lexical::LexicalEmbedder;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::agent::Turn;

/// Failures talking to the model or embedding provider
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected model response: {0}")]
    Malformed(String),
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON argument text, exactly as the model produced it
    pub arguments: String,
}

/// What the model answered for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// No tool calls: this is the final answer
    Answer(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

/// A chat model that can request tool calls
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, transcript: &[Turn], tools: &[ToolSpec])
    -> Result<ModelReply, ModelError>;
}

/// Turns text into embedding vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError>;
}
