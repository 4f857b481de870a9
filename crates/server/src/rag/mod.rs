//! Retrieval-augmented prompt assembly

pub mod prompt;
pub mod retriever;

pub use prompt::{PromptBuilder, render_prompt};
pub use retriever::{RetrievalError, Retriever};
