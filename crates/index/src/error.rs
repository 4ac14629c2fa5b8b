use thiserror::Error;

/// Failures talking to (or configuring) a search backend.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Search request failed: {0}")]
    Transport(String),
    #[error("Search backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed search response: {0}")]
    MalformedResponse(String),
    /// A query spec failed validation before anything was sent.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Invalid index config: {0}")]
    Config(String),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn invalid_query<E: std::fmt::Display>(err: E) -> Self {
        Self::InvalidQuery(err.to_string())
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        IndexError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::MalformedResponse(e.to_string())
    }
}
