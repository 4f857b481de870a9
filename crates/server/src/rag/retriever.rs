use std::sync::Arc;

use fhir_synth_core::{ScoredPassage, VectorIndex};
use thiserror::Error;

use crate::ai::{Embedder, ModelError};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding the query failed: {0}")]
    Embedding(#[from] ModelError),

    #[error("Embedder returned no vector for the query")]
    EmptyEmbedding,

    #[error("Index was built with {index}, but queries are embedded with {embedder}")]
    ModelMismatch { index: String, embedder: String },
}

/// Similarity search over the shared vector index
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredPassage>, RetrievalError> {
        if self.index.embedding_model() != self.embedder.model_name() {
            return Err(RetrievalError::ModelMismatch {
                index: self.index.embedding_model().to_string(),
                embedder: self.embedder.model_name().to_string(),
            });
        }
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(RetrievalError::EmptyEmbedding)?;

        let results = self.index.query(&embedding, k);
        tracing::debug!(k, hits = results.len(), "Retrieved passages");
        Ok(results)
    }
}
