use serde::{Deserialize, Serialize};

/// Where a query vector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    /// Computed by the configured embedding backend.
    Live,
    /// Seeded from a hash of the query text; reproducible.
    Fallback,
    /// Blank text with no live answer; drawn from a fresh random source.
    Random,
}

impl EmbeddingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSource::Live => "live",
            EmbeddingSource::Fallback => "fallback",
            EmbeddingSource::Random => "random",
        }
    }
}

/// Query embedding handed to the vector tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryEmbedding {
    /// Embedding values, always of the configured dimension.
    pub vector: Vec<f32>,
    /// How the vector was produced.
    pub source: EmbeddingSource,
    /// Name of the model configured for the live backend.
    pub model_name: String,
}

impl QueryEmbedding {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn is_live(&self) -> bool {
        self.source == EmbeddingSource::Live
    }
}
