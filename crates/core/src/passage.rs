use serde::{Deserialize, Serialize};

/// A chunk of corpus text before it has been embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageText {
    /// `<relative path>#<chunk number>`
    pub id: String,
    /// Relative path of the corpus file the chunk came from
    pub source: String,
    pub text: String,
}

/// An indexed passage: text plus its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl PassageText {
    pub fn with_embedding(self, embedding: Vec<f32>) -> Passage {
        Passage {
            id: self.id,
            source: self.source,
            text: self.text,
            embedding,
        }
    }
}

/// A passage returned from a similarity query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPassage {
    pub id: String,
    pub source: String,
    pub text: String,
    pub score: f32,
}
