use fhir_synth_core::ScoredPassage;

use super::Retriever;

const PREAMBLE: &str = r#"You are an assistant specialized in generating synthetic clinical data.
Use the retrieved FHIR context below to generate comprehensive and accurate synthetic clinical data for the user's request.
The data can be natural language or FHIR, as the user asks. When FHIR is requested, answer with a single FHIR JSON resource (normally a Bundle) and nothing else, strictly following the FHIR schema relevant to the request.
You may call the search tools to ground the data in current clinical knowledge, and post_fhir_bundle only when the user asks to send the result to a server.
If the context is insufficient, say that you cannot fulfill the request."#;

const NO_CONTEXT: &str = "(no reference material was retrieved)";

/// Assemble the prompt text from retrieved passages and the scenario
pub fn render_prompt(scenario: &str, passages: &[ScoredPassage]) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n\n## Retrieved context\n");

    if passages.is_empty() {
        prompt.push_str(NO_CONTEXT);
        prompt.push('\n');
    }
    for passage in passages {
        prompt.push_str(&format!("\n### Source: {}\n{}\n", passage.source, passage.text));
    }

    prompt.push_str("\n## Request\n");
    prompt.push_str(scenario);
    prompt
}

/// Builds the agent prompt for a scenario
#[derive(Clone)]
pub struct PromptBuilder {
    retriever: Retriever,
    top_k: usize,
}

impl PromptBuilder {
    pub fn new(retriever: Retriever, top_k: usize) -> Self {
        Self { retriever, top_k }
    }

    /// Retrieval failures degrade to a prompt without context
    pub async fn build_prompt(&self, scenario: &str) -> String {
        let passages = match self.retriever.query(scenario, self.top_k).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, continuing without context");
                Vec::new()
            }
        };

        render_prompt(scenario, &passages)
    }
}
