use thiserror::Error;

/// Errors surfaced by live embedding attempts.
///
/// None of these escape [`EmbeddingProvider::embed`](crate::EmbeddingProvider::embed);
/// they are logged and answered with a fallback vector instead.
#[derive(Debug, Clone, Error)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., `api` mode without an `api_url`).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Connection refused, DNS failure, timeout and friends.
    #[error("embedding request failed: {0}")]
    Transport(String),
    /// The backend answered with a non-2xx status.
    #[error("embedding backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The body was not JSON or did not contain a vector where we expected one.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
    /// The backend returned a zero-length vector.
    #[error("embedding backend returned an empty vector")]
    EmptyEmbedding,
    /// The vector length disagrees with the deployment's configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The circuit breaker is refusing calls to this backend.
    #[error("circuit breaker is open for backend '{0}'")]
    CircuitOpen(String),
}

impl SemanticError {
    /// Transient failures worth another attempt. Auth and payload problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SemanticError::Transport(_) => true,
            SemanticError::Http { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            _ => false,
        }
    }
}
