use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{IndexError, IndexRequest};

/// One raw hit as the engine returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    /// Engine document id (`_id`), when the engine reports one.
    pub id: Option<String>,
    /// Engine-native relevance score.
    pub score: Option<f64>,
    /// Projected document source.
    pub source: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexResponse {
    pub hits: Vec<RawHit>,
    /// Total matches reported by the engine (not just this page).
    pub total: u64,
}

/// A document store that can answer KNN and lexical searches.
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn query(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError>;

    /// Cheap liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Connection details for an Elasticsearch-compatible cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticConfig {
    /// Base URL, e.g. `https://search.example.com:9243`.
    pub endpoint: String,
    pub index: String,
    /// Sent as `Authorization: ApiKey <key>`.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".into(),
            index: "products".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Selects and builds the search backend.
///
/// # Example
/// ```
/// use index::BackendConfig;
///
/// // Ephemeral, for tests and demos
/// let backend = BackendConfig::in_memory().build().unwrap();
/// assert_eq!(backend.name(), "in_memory");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Elasticsearch(ElasticConfig),
    /// Optionally seeded from a JSON array or newline-delimited JSON file.
    InMemory {
        #[serde(default)]
        documents_path: Option<PathBuf>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Elasticsearch(ElasticConfig::default())
    }
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory {
            documents_path: None,
        }
    }

    pub fn elasticsearch(endpoint: impl Into<String>, index: impl Into<String>) -> Self {
        BackendConfig::Elasticsearch(ElasticConfig {
            endpoint: endpoint.into(),
            index: index.into(),
            ..ElasticConfig::default()
        })
    }

    pub fn build(&self) -> Result<Arc<dyn SearchIndex>, IndexError> {
        match self {
            BackendConfig::Elasticsearch(cfg) => Ok(Arc::new(ElasticsearchIndex::new(cfg)?)),
            BackendConfig::InMemory { documents_path } => {
                let index = match documents_path {
                    Some(path) => InMemoryIndex::from_json_file(path)?,
                    None => InMemoryIndex::new(),
                };
                Ok(Arc::new(index))
            }
        }
    }
}

pub mod elastic;
pub mod memory;

pub use elastic::ElasticsearchIndex;
pub use memory::InMemoryIndex;
