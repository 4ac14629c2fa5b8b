//! Query Embeddings
//!
//! This crate turns a cleaned product query into the vector the KNN tier searches
//! with. The one promise it makes: `embed` always gives you a vector of the
//! configured dimension, no matter what the embedding service is doing.
//!
//! Two modes:
//!
//! - **API mode** - Call a remote embedding endpoint (Bedrock Titan, Hugging Face,
//!   OpenAI-compatible, or a plain `{"text": ..}` service).
//! - **Fast mode** - Skip the network. Every vector comes from the fallback.
//!
//! The fallback is the interesting bit. When the backend is down, slow, returns
//! garbage, or answers with the wrong dimension, we seed a PRNG from a hash of the
//! query text and draw a vector from it, then nudge a few positions for known retail
//! vocabulary (see [`BoostTable`]). The same query always gets the same vector, so
//! results stay stable while the backend is out. Blank queries get a random vector.
//!
//! Live calls go through bounded retries and a per-backend circuit breaker, so a
//! dead endpoint costs a few milliseconds per request instead of a full timeout.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{EmbeddingProvider, EmbeddingSource, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = SemanticConfig {
//!         mode: "fast".into(),
//!         dimension: 384,
//!         ..Default::default()
//!     };
//!     let provider = EmbeddingProvider::from_config(&cfg).unwrap();
//!
//!     let embedding = provider.embed("running shoes").await;
//!     assert_eq!(embedding.vector.len(), 384);
//!     assert_eq!(embedding.source, EmbeddingSource::Fallback);
//! }
//! ```
//!
//! ## API mode
//!
//! ```no_run
//! use semantic::{EmbeddingProvider, SemanticConfig};
//!
//! let cfg = SemanticConfig {
//!     mode: "api".into(),
//!     api_url: Some("http://localhost:8080/embed".into()),
//!     api_auth_header: Some("Bearer YOUR_TOKEN".into()),
//!     api_provider: Some("titan".into()),
//!     dimension: 1536,
//!     ..Default::default()
//! };
//! let provider = EmbeddingProvider::from_config(&cfg).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod resilience;
pub mod types;

mod api;
mod boosts;
mod fallback;
mod normalize;
mod provider;
mod serde_millis;

pub use api::{ApiProviderKind, HttpEmbeddingBackend};
pub use boosts::BoostTable;
pub use config::SemanticConfig;
pub use error::SemanticError;
pub use fallback::FallbackGenerator;
pub use provider::{EmbeddingBackend, EmbeddingProvider};
pub use types::{EmbeddingSource, QueryEmbedding};
