//! Offline embedder: hashed bag of words

use async_trait::async_trait;

use super::{Embedder, ModelError};

const DEFAULT_DIMENSIONS: usize = 256;

/// Deterministic term-frequency embedder.
///
/// Lowercased alphanumeric tokens are hashed (FNV-1a) into a fixed number
/// of buckets. Good enough to rank FHIR passages by shared vocabulary when
/// no embedding API is available.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
    name: String,
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

impl LexicalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            name: format!("lexical-fnv-{dimensions}"),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for LexicalEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_and_deterministic() {
        let embedder = LexicalEmbedder::new(64);
        assert_eq!(
            embedder.embed_one("Diabetes Mellitus"),
            embedder.embed_one("diabetes, mellitus!")
        );
    }

    #[test]
    fn test_counts_tokens() {
        let embedder = LexicalEmbedder::new(8);
        let vector = embedder.embed_one("patient patient condition");
        assert_eq!(vector.len(), 8);
        assert_eq!(vector.iter().sum::<f32>(), 3.0);
    }

    #[tokio::test]
    async fn test_embed_keeps_input_order() {
        let embedder = LexicalEmbedder::default();
        let texts = vec!["Patient".to_string(), String::new()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors[0].iter().any(|v| *v > 0.0));
        assert!(vectors[1].iter().all(|v| *v == 0.0));
        assert_eq!(embedder.model_name(), "lexical-fnv-256");
    }
}
