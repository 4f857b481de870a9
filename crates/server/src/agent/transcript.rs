use crate::ai::ToolCall;

/// Result of executing one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Success(String),
    /// The tool failed; the message is shown to the model so it can recover
    Failure(String),
}

impl ToolOutput {
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }

    /// Text sent back to the model
    pub fn as_message(&self) -> String {
        match self {
            ToolOutput::Success(text) => text.clone(),
            ToolOutput::Failure(reason) => format!(
                "Error: {reason}\nThe tool call failed. Try different arguments or another tool."
            ),
        }
    }
}

/// One entry of the agent transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// The assembled prompt that opens the interaction
    Prompt(String),
    /// A model reply that requested tools
    Assistant {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        tool: String,
        output: ToolOutput,
    },
    /// The model's final answer; always the last turn of a finished run
    Answer(String),
}
