//! One interaction end to end: prompt, agent loop, formatting

use std::sync::Arc;

use fhir_synth_core::{FormattedOutput, format_answer};

use crate::agent::{Agent, AgentError};
use crate::ai::ChatModel;
use crate::rag::PromptBuilder;
use crate::tools::{PostReport, ToolContext, ToolExecutor};

/// Result of a successful interaction
#[derive(Debug, Clone)]
pub struct Generation {
    pub output: FormattedOutput,
    pub tools_used: Vec<String>,
    pub turns: u32,
    /// FHIR POSTs the agent made through its tools
    pub posts: Vec<PostReport>,
}

impl Generation {
    /// A successful POST the agent already made to `endpoint`
    pub fn posted_to(&self, endpoint: &str) -> Option<&PostReport> {
        self.posts
            .iter()
            .find(|report| report.endpoint == endpoint && report.is_success())
    }
}

/// Shared by the CLI and every web request; holds no per-request state
pub struct Pipeline {
    prompts: PromptBuilder,
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolExecutor>,
    max_turns: u32,
}

impl Pipeline {
    pub fn new(
        prompts: PromptBuilder,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolExecutor>,
        max_turns: u32,
    ) -> Self {
        Self {
            prompts,
            model,
            tools,
            max_turns,
        }
    }

    /// Names of the tools offered to the model
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.specs().into_iter().map(|spec| spec.name).collect()
    }

    /// `endpoint` is where the user wants FHIR output posted, if anywhere
    pub async fn generate(
        &self,
        scenario: &str,
        endpoint: Option<&str>,
    ) -> Result<Generation, AgentError> {
        let prompt = self.prompts.build_prompt(scenario).await;
        let agent = Agent::new(self.model.as_ref(), self.tools.as_ref(), self.max_turns);
        let mut ctx = ToolContext::new(endpoint);

        let run = match agent.run(&prompt, &mut ctx).await {
            Ok(run) => run,
            Err(e) => {
                metrics::counter!("agent_runs_total", "outcome" => "error").increment(1);
                return Err(e);
            }
        };

        let output = format_answer(&run.answer);
        metrics::counter!("agent_runs_total", "outcome" => output.kind.as_str()).increment(1);
        tracing::info!(
            kind = output.kind.as_str(),
            resources = output.resources.len(),
            turns = run.turns,
            "Generation complete"
        );

        Ok(Generation {
            output,
            tools_used: run.tools_used,
            turns: run.turns,
            posts: ctx.posts,
        })
    }
}
