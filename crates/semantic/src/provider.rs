use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::HttpEmbeddingBackend;
use crate::fallback::FallbackGenerator;
use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingSource, QueryEmbedding, SemanticConfig, SemanticError};

/// Something that turns text into a vector over the network (or pretends to).
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn invoke(&self, text: &str) -> Result<Vec<f32>, SemanticError>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Query embeddings with a guaranteed answer.
///
/// Tries the live backend (when one is configured) and answers with a fallback
/// vector on any failure, so callers never see an error.
pub struct EmbeddingProvider {
    backend: Option<Arc<dyn EmbeddingBackend>>,
    fallback: FallbackGenerator,
    placeholder: String,
    model_name: String,
    normalize: bool,
}

impl EmbeddingProvider {
    /// Build from config: `api` mode wires up [`HttpEmbeddingBackend`], `fast` mode
    /// uses fallback vectors only.
    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let backend: Option<Arc<dyn EmbeddingBackend>> = if cfg.is_api_mode() {
            Some(Arc::new(HttpEmbeddingBackend::from_config(cfg)?))
        } else {
            None
        };
        Ok(Self::assemble(backend, cfg))
    }

    /// Use a caller-supplied backend regardless of `cfg.mode`.
    pub fn with_backend(
        backend: Arc<dyn EmbeddingBackend>,
        cfg: &SemanticConfig,
    ) -> Result<Self, SemanticError> {
        let cfg = SemanticConfig {
            mode: "fast".into(),
            ..cfg.clone()
        };
        cfg.validate()?;
        Ok(Self::assemble(Some(backend), &cfg))
    }

    fn assemble(backend: Option<Arc<dyn EmbeddingBackend>>, cfg: &SemanticConfig) -> Self {
        Self {
            backend,
            fallback: FallbackGenerator::new(cfg.dimension, cfg.fallback_range, cfg.boosts.clone()),
            placeholder: cfg.placeholder_text.clone(),
            model_name: cfg.model_name.clone(),
            normalize: cfg.normalize,
        }
    }

    pub fn dimension(&self) -> usize {
        self.fallback.dimension()
    }

    pub fn has_live_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Embed `text`, never failing.
    pub async fn embed(&self, text: &str) -> QueryEmbedding {
        if let Some(backend) = &self.backend {
            match self.embed_live(backend.as_ref(), text).await {
                Ok(vector) => return self.finish(vector, EmbeddingSource::Live),
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "embedding backend failed, using fallback vector");
                }
            }
        }
        self.fallback(text)
    }

    /// The offline answer for `text`, without touching the backend.
    pub fn fallback(&self, text: &str) -> QueryEmbedding {
        let (vector, source) = self.fallback.generate(text);
        debug!(source = source.as_str(), dimension = vector.len(), "generated fallback embedding");
        self.finish(vector, source)
    }

    /// One live attempt with shape checks; errors are left to the caller.
    async fn embed_live(
        &self,
        backend: &dyn EmbeddingBackend,
        text: &str,
    ) -> Result<Vec<f32>, SemanticError> {
        let input = if text.trim().is_empty() {
            self.placeholder.as_str()
        } else {
            text
        };

        let vector = backend.invoke(input).await?;
        if vector.is_empty() {
            return Err(SemanticError::EmptyEmbedding);
        }
        if vector.len() != self.dimension() {
            return Err(SemanticError::DimensionMismatch {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(SemanticError::MalformedResponse(
                "embedding contains non-finite values".into(),
            ));
        }
        Ok(vector)
    }

    fn finish(&self, mut vector: Vec<f32>, source: EmbeddingSource) -> QueryEmbedding {
        if self.normalize {
            l2_normalize_in_place(&mut vector);
        }
        QueryEmbedding {
            vector,
            source,
            model_name: self.model_name.clone(),
        }
    }
}
