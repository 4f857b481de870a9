use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading the on-disk schema/example corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to walk corpus directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to extract archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },
}

/// Failures while building, saving or loading the vector index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Passage {id} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Passage {0} has an empty or non-finite embedding")]
    InvalidEmbedding(String),

    #[error("Unsupported index format version {0}")]
    UnsupportedVersion(u32),

    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
