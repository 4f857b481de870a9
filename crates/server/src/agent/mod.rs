//! Tool-calling agent loop
//!
//! The agent alternates between asking the model for the next step and
//! executing the tool calls it requested, until the model answers without
//! tools or the turn budget runs out. Tool failures are fed back to the
//! model as tool results; model failures end the run.

pub mod transcript;

pub use transcript::{ToolOutput, Turn};

use thiserror::Error;

use crate::ai::{ChatModel, ModelError, ModelReply, ToolCall};
use crate::tools::{ToolContext, ToolExecutor};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent stopped after {max_turns} model turns without a final answer")]
    LoopExceeded { max_turns: u32 },

    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),
}

/// Where the loop currently is
#[derive(Debug)]
enum AgentState {
    AwaitingModel,
    ExecutingTool(Vec<ToolCall>),
    Done(String),
    Failed(AgentError),
}

/// A finished run
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub transcript: Vec<Turn>,
    /// Distinct tool names called, in first-use order
    pub tools_used: Vec<String>,
    /// Model calls made
    pub turns: u32,
}

pub struct Agent<'a> {
    model: &'a dyn ChatModel,
    tools: &'a dyn ToolExecutor,
    max_turns: u32,
}

impl<'a> Agent<'a> {
    pub fn new(model: &'a dyn ChatModel, tools: &'a dyn ToolExecutor, max_turns: u32) -> Self {
        Self {
            model,
            tools,
            max_turns,
        }
    }

    /// Run one interaction starting from an assembled prompt
    pub async fn run(&self, prompt: &str, ctx: &mut ToolContext) -> Result<AgentRun, AgentError> {
        let specs = self.tools.specs();
        let mut transcript = vec![Turn::Prompt(prompt.to_string())];
        let mut tools_used: Vec<String> = Vec::new();
        let mut turns = 0u32;
        let mut state = AgentState::AwaitingModel;

        loop {
            state = match state {
                AgentState::AwaitingModel if turns >= self.max_turns => {
                    AgentState::Failed(AgentError::LoopExceeded {
                        max_turns: self.max_turns,
                    })
                }
                AgentState::AwaitingModel => {
                    turns += 1;
                    metrics::counter!("agent_model_calls_total").increment(1);

                    match self.model.complete(&transcript, &specs).await {
                        Ok(ModelReply::Answer(answer)) => {
                            transcript.push(Turn::Answer(answer.clone()));
                            AgentState::Done(answer)
                        }
                        Ok(ModelReply::ToolCalls { content, calls }) => {
                            tracing::debug!(turn = turns, calls = calls.len(), "Model requested tools");
                            transcript.push(Turn::Assistant {
                                content,
                                calls: calls.clone(),
                            });
                            AgentState::ExecutingTool(calls)
                        }
                        Err(e) => AgentState::Failed(e.into()),
                    }
                }
                AgentState::ExecutingTool(calls) => {
                    for call in calls {
                        let output = self.execute(&call, ctx).await;
                        if !tools_used.contains(&call.name) {
                            tools_used.push(call.name.clone());
                        }
                        transcript.push(Turn::ToolResult {
                            call_id: call.id,
                            tool: call.name,
                            output,
                        });
                    }
                    AgentState::AwaitingModel
                }
                AgentState::Done(answer) => {
                    tracing::info!(turns, tools = ?tools_used, "Agent finished");
                    return Ok(AgentRun {
                        answer,
                        transcript,
                        tools_used,
                        turns,
                    });
                }
                AgentState::Failed(err) => {
                    tracing::warn!(turns, error = %err, "Agent run failed");
                    return Err(err);
                }
            };
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &mut ToolContext) -> ToolOutput {
        tracing::info!(tool = %call.name, "Executing agent tool");

        match self.tools.execute(call, ctx).await {
            Ok(text) => {
                metrics::counter!("agent_tool_calls_total", "tool" => call.name.clone(), "outcome" => "success")
                    .increment(1);
                ToolOutput::Success(text)
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                metrics::counter!("agent_tool_calls_total", "tool" => call.name.clone(), "outcome" => "failure")
                    .increment(1);
                ToolOutput::Failure(e.to_string())
            }
        }
    }
}
