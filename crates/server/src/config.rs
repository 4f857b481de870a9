//! Application configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StartupError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Which embedder turns passages and scenarios into vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// OpenAI embeddings endpoint
    OpenAi,
    /// Local hashed bag-of-words, no network
    Lexical,
}

/// Basic-auth credentials for the FHIR server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FhirAuth {
    pub user: String,
    pub password: Option<String>,
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embeddings: EmbeddingBackend,
    pub fhir_endpoint: Option<String>,
    pub fhir_auth: Option<FhirAuth>,
    pub corpus_dir: PathBuf,
    pub content_dir: PathBuf,
    pub index_path: Option<PathBuf>,
    pub top_k: usize,
    pub max_turns: u32,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    pub bind_address: String,
    pub rate_limit_rps: u32,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(StartupError::MissingApiKey)?;

        let embeddings = match get("EMBEDDINGS").as_deref() {
            None | Some("openai") => EmbeddingBackend::OpenAi,
            Some("lexical") => EmbeddingBackend::Lexical,
            Some(other) => {
                return Err(StartupError::InvalidSetting {
                    key: "EMBEDDINGS".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let fhir_auth = get("FHIR_AUTH_USER").map(|user| FhirAuth {
            user,
            password: get("FHIR_AUTH_PASSWORD"),
        });

        let rate_limit_rps: u32 = positive_or(&get, "RATE_LIMIT_RPS", 5)?;

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
            chat_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            embeddings,
            fhir_endpoint: get("FHIR_ENDPOINT"),
            fhir_auth,
            corpus_dir: get("CORPUS_DIR")
                .unwrap_or_else(|| "fhir_corpus".into())
                .into(),
            content_dir: get("CONTENT_DIR").unwrap_or_else(|| "content".into()).into(),
            index_path: get("INDEX_PATH").map(PathBuf::from),
            top_k: positive_or(&get, "RAG_TOP_K", 4)?,
            max_turns: positive_or(&get, "AGENT_MAX_TURNS", 10)?,
            model_timeout: Duration::from_secs(parse_or(&get, "MODEL_TIMEOUT_SECS", 120)?),
            tool_timeout: Duration::from_secs(parse_or(&get, "TOOL_TIMEOUT_SECS", 15)?),
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:5000".into()),
            rate_limit_rps,
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, StartupError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StartupError::InvalidSetting {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// Like [`parse_or`], but zero is rejected
fn positive_or<T, G>(get: &G, key: &str, default: T) -> Result<T, StartupError>
where
    T: FromStr + Default + PartialEq + ToString,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if value == T::default() {
        return Err(StartupError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}
