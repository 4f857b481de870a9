//! Document store loader: FHIR schema files and example bundles on disk

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use walkdir::{DirEntry, WalkDir};

use crate::chunker::{ChunkConfig, split_text};
use crate::error::CorpusError;
use crate::passage::PassageText;

static PLACEHOLDER_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(null|undefined)\b").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleaned corpus documents keyed by their path relative to the corpus root.
///
/// Keys are `/`-separated and iterate in sorted order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: BTreeMap<String, String>,
}

impl Corpus {
    pub fn documents(&self) -> &BTreeMap<String, String> {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Chunk every document into passages, in document order
    pub fn passages(&self, config: &ChunkConfig) -> Vec<PassageText> {
        self.documents
            .iter()
            .flat_map(|(source, text)| {
                split_text(text, config)
                    .into_iter()
                    .enumerate()
                    .map(move |(n, chunk)| PassageText {
                        id: format!("{source}#{n}"),
                        source: source.clone(),
                        text: chunk,
                    })
            })
            .collect()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Load every `*.json` file under `dir`.
///
/// Hidden files and directories are skipped. A file that is not valid JSON
/// fails the whole load, since the index would otherwise silently miss it.
pub fn load_corpus(dir: &Path) -> Result<Corpus, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::MissingDirectory(dir.to_path_buf()));
    }

    let mut documents = BTreeMap::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json")
        {
            continue;
        }

        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let json: JsonValue = serde_json::from_str(&raw).map_err(|source| CorpusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let cleaned = clean_json(json);
        let relative = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        documents.insert(relative, cleaned.to_string());
    }

    tracing::info!(dir = %dir.display(), documents = documents.len(), "Loaded corpus");
    Ok(Corpus { documents })
}

/// Strip nulls and placeholder words so passages carry only meaningful text
pub fn clean_json(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, clean_json(v)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(clean_json)
                .collect(),
        ),
        JsonValue::String(s) => {
            let without_words = PLACEHOLDER_WORDS.replace_all(&s, "");
            let collapsed = WHITESPACE_RUN.replace_all(&without_words, " ");
            JsonValue::String(collapsed.trim().to_string())
        }
        other => other,
    }
}
