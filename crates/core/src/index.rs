//! In-memory vector index over corpus passages, with JSON persistence

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::passage::{Passage, ScoredPassage};

const INDEX_FORMAT_VERSION: u32 = 1;

/// Exhaustive cosine-similarity index.
///
/// Embeddings are L2 normalised when the index is built, so a query is a dot
/// product against every passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndex {
    version: u32,
    embedding_model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    passages: Vec<Passage>,
}

/// L2 normalize a vector in place
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex {
    /// Build an index; every embedding must be non-empty, finite and share
    /// the dimension of the first passage.
    pub fn build(
        embedding_model: impl Into<String>,
        passages: Vec<Passage>,
    ) -> Result<Self, IndexError> {
        let dimensions = passages.first().map(|p| p.embedding.len()).unwrap_or(0);

        let mut normalized = Vec::with_capacity(passages.len());
        for mut passage in passages {
            if passage.embedding.is_empty() || passage.embedding.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::InvalidEmbedding(passage.id));
            }
            if passage.embedding.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    id: passage.id,
                    expected: dimensions,
                    actual: passage.embedding.len(),
                });
            }
            normalize(&mut passage.embedding);
            normalized.push(passage);
        }

        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            built_at: Utc::now(),
            passages: normalized,
        })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Top `k` passages by cosine similarity, nearest first.
    ///
    /// A query of the wrong dimension matches nothing.
    pub fn query(&self, embedding: &[f32], k: usize) -> Vec<ScoredPassage> {
        if k == 0 || embedding.len() != self.dimensions {
            return Vec::new();
        }

        let mut query = embedding.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(f32, &Passage)> = self
            .passages
            .iter()
            .map(|p| (dot(&query, &p.embedding), p))
            .collect();
        // Stable sort: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .map(|(score, p)| ScoredPassage {
                id: p.id.clone(),
                source: p.source.clone(),
                text: p.text.clone(),
                score,
            })
            .collect()
    }

    /// Write the index as JSON, replacing any previous file
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read an index written by [`VectorIndex::save`]. No freshness check
    /// against the corpus is made.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path)?;
        let index: Self = serde_json::from_slice(&bytes)?;
        if index.version != INDEX_FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(index.version));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn passage(id: &str, embedding: Vec<f32>) -> Passage {
        Passage {
            id: id.to_string(),
            source: format!("{id}.json"),
            text: format!("text of {id}"),
            embedding,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            "test-model",
            vec![
                passage("patient", vec![1.0, 0.0, 0.0]),
                passage("condition", vec![0.0, 1.0, 0.0]),
                passage("mixed", vec![1.0, 1.0, 0.0]),
                passage("observation", vec![0.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_query_returns_nearest_first() {
        let index = sample_index();
        let results = index.query(&[0.9, 0.1, 0.0], 2);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["patient", "mixed"]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_query_is_bounded_and_ordered_for_any_k() {
        let index = sample_index();
        let queries = [
            vec![1.0, 0.0, 0.0],
            vec![0.2, 0.3, 0.9],
            vec![-1.0, 2.0, 0.5],
            vec![0.0, 0.0, 0.0],
        ];
        for query in &queries {
            for k in 0..=6 {
                let results = index.query(query, k);
                assert!(results.len() <= k);
                assert_eq!(results.len(), k.min(index.len()));
                for pair in results.windows(2) {
                    assert!(pair[0].score >= pair[1].score);
                }
            }
        }
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::build(
            "m",
            vec![
                passage("first", vec![1.0, 0.0]),
                passage("second", vec![2.0, 0.0]),
            ],
        )
        .unwrap();
        let ids: Vec<_> = index
            .query(&[1.0, 0.0], 2)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_wrong_dimension_query_matches_nothing() {
        assert!(sample_index().query(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_build_rejects_mismatched_dimensions() {
        let err = VectorIndex::build(
            "m",
            vec![passage("a", vec![1.0, 0.0]), passage("b", vec![1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { actual: 1, .. }));
    }

    #[test]
    fn test_build_rejects_non_finite_embedding() {
        let err = VectorIndex::build("m", vec![passage("a", vec![f32::NAN, 1.0])]).unwrap_err();
        assert!(matches!(err, IndexError::InvalidEmbedding(_)));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/index.json");
        let index = sample_index();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.embedding_model(), "test-model");
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.query(&[0.0, 0.0, 1.0], 1)[0].id, "observation");
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let mut json = serde_json::to_value(sample_index()).unwrap();
        json["version"] = serde_json::json!(99);
        std::fs::write(&path, json.to_string()).unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedVersion(99)));
    }
}
