//! Composition root: builds the index, clients and pipeline from config

use std::sync::Arc;

use fhir_synth_core::{ChunkConfig, VectorIndex, extract_bundled_archives, load_corpus};

use crate::ai::{ChatModel, Embedder, LexicalEmbedder, ModelError, OpenAiClient};
use crate::config::{Config, EmbeddingBackend};
use crate::error::StartupError;
use crate::pipeline::Pipeline;
use crate::rag::{PromptBuilder, Retriever};
use crate::tools::{FhirClient, SearchEndpoints, Toolbox};

const USER_AGENT: &str = concat!("fhir-synth/", env!("CARGO_PKG_VERSION"));

/// Long-lived pieces shared by the CLI and the web server
#[derive(Clone)]
pub struct Components {
    pub pipeline: Arc<Pipeline>,
    pub index: Arc<VectorIndex>,
    pub fhir: FhirClient,
    pub default_endpoint: Option<String>,
}

fn openai_client(config: &Config) -> Result<OpenAiClient, StartupError> {
    Ok(OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.chat_model,
        &config.embedding_model,
        config.model_timeout,
    )?)
}

/// The embedder selected by `EMBEDDINGS`
pub fn embedder(config: &Config) -> Result<Arc<dyn Embedder>, StartupError> {
    Ok(match config.embeddings {
        EmbeddingBackend::OpenAi => Arc::new(openai_client(config)?),
        EmbeddingBackend::Lexical => Arc::new(LexicalEmbedder::default()),
    })
}

/// Extract bundled archives, load and chunk the corpus, embed every passage
pub async fn build_index(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, StartupError> {
    let extracted = extract_bundled_archives(&config.content_dir, &config.corpus_dir)?;
    if !extracted.is_empty() {
        tracing::info!(dirs = ?extracted, "Extracted bundled FHIR archives");
    }

    let corpus = load_corpus(&config.corpus_dir)?;
    if corpus.is_empty() {
        tracing::warn!(
            dir = %config.corpus_dir.display(),
            "Corpus is empty, prompts will carry no retrieved context"
        );
    }
    let passages = corpus.passages(&ChunkConfig::default());
    tracing::info!(
        documents = corpus.len(),
        passages = passages.len(),
        model = embedder.model_name(),
        "Embedding corpus"
    );

    let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .map_err(StartupError::Embedding)?;
    if vectors.len() != passages.len() {
        return Err(StartupError::Embedding(ModelError::Malformed(format!(
            "Expected {} embeddings, got {}",
            passages.len(),
            vectors.len()
        ))));
    }

    let embedded = passages
        .into_iter()
        .zip(vectors)
        .map(|(passage, vector)| passage.with_embedding(vector))
        .collect();

    Ok(VectorIndex::build(embedder.model_name(), embedded)?)
}

/// Reuse the index at `INDEX_PATH` when it matches the embedder, otherwise
/// build it (and save it when a path is configured)
pub async fn load_or_build_index(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, StartupError> {
    if let Some(path) = config.index_path.as_deref().filter(|p| p.exists()) {
        let index = VectorIndex::load(path)?;
        if index.embedding_model() == embedder.model_name() {
            tracing::info!(
                path = %path.display(),
                passages = index.len(),
                dimensions = index.dimensions(),
                built_at = %index.built_at(),
                "Loaded vector index"
            );
            return Ok(index);
        }
        tracing::warn!(
            path = %path.display(),
            index_model = index.embedding_model(),
            embedder = embedder.model_name(),
            "Saved index uses a different embedding model, rebuilding"
        );
    }

    let index = build_index(config, embedder).await?;
    if let Some(path) = &config.index_path {
        index.save(path)?;
        tracing::info!(path = %path.display(), "Saved vector index");
    }
    Ok(index)
}

/// Build everything an interaction needs
pub async fn initialize(config: &Config) -> Result<Components, StartupError> {
    let embedder = embedder(config)?;
    let index = load_or_build_index(config, embedder.as_ref()).await?;

    let index = Arc::new(index);
    let retriever = Retriever::new(embedder, index.clone());
    let prompts = PromptBuilder::new(retriever, config.top_k);
    let model: Arc<dyn ChatModel> = Arc::new(openai_client(config)?);

    let http = reqwest::Client::builder()
        .timeout(config.tool_timeout)
        .user_agent(USER_AGENT)
        .build()?;
    let fhir = FhirClient::new(config.tool_timeout, config.fhir_auth.clone())?;
    let toolbox = Toolbox::new(
        http,
        SearchEndpoints::default(),
        fhir.clone(),
        config.fhir_endpoint.clone(),
    );

    let pipeline = Pipeline::new(prompts, model, Arc::new(toolbox), config.max_turns);

    Ok(Components {
        pipeline: Arc::new(pipeline),
        index,
        fhir,
        default_endpoint: config.fhir_endpoint.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn lexical_config(corpus: &std::path::Path, index: Option<std::path::PathBuf>) -> Config {
        let mut env = HashMap::from([
            ("OPENAI_API_KEY".to_string(), "sk-test".to_string()),
            ("EMBEDDINGS".to_string(), "lexical".to_string()),
            ("CORPUS_DIR".to_string(), corpus.display().to_string()),
            (
                "CONTENT_DIR".to_string(),
                corpus.join("no-content").display().to_string(),
            ),
        ]);
        if let Some(index) = index {
            env.insert("INDEX_PATH".to_string(), index.display().to_string());
        }
        Config::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    #[tokio::test]
    async fn test_index_is_built_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        fs::write(
            corpus.join("Patient.json"),
            r#"{"resourceType":"StructureDefinition","name":"Patient"}"#,
        )
        .unwrap();
        let index_path = dir.path().join("index.json");

        let config = lexical_config(&corpus, Some(index_path.clone()));
        let embedder = embedder(&config).unwrap();

        let built = load_or_build_index(&config, embedder.as_ref()).await.unwrap();
        assert_eq!(built.len(), 1);
        assert!(index_path.exists());

        // Corpus changes are not picked up while the saved index exists
        fs::remove_file(corpus.join("Patient.json")).unwrap();
        let loaded = load_or_build_index(&config, embedder.as_ref()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.built_at(), built.built_at());
    }

    #[tokio::test]
    async fn test_missing_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = lexical_config(&dir.path().join("absent"), None);
        let embedder = embedder(&config).unwrap();

        let err = build_index(&config, embedder.as_ref()).await.unwrap_err();
        assert!(matches!(err, StartupError::Corpus(_)));
    }
}
