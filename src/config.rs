//! YAML configuration for the search pipeline.
//!
//! One file describes every stage: the embedding provider, the search backend
//! and its field mapping, and the paging limits the transport enforces.
//! Deployment secrets usually arrive through the environment instead, so
//! [`PipelineConfig::apply_env`] layers the well-known variables on top.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "catalog-prod"
//!
//! semantic:
//!   mode: "api"
//!   api_url: "https://bedrock-runtime.us-east-1.amazonaws.com/model/amazon.titan-embed-text-v1/invoke"
//!   api_provider: "titan"
//!   dimension: 1536
//!
//! index:
//!   backend:
//!     kind: "elasticsearch"
//!     endpoint: "https://search.example.com:9243"
//!     index: "products"
//!   fields:
//!     vector: "embeddings"
//!     title_boost: 2.0
//!
//! search:
//!   default_limit: 10
//!   max_limit: 100
//! ```

use std::fs;
use std::path::Path;

use index::{BackendConfig, ElasticConfig, FieldMapping, IndexError};
use semantic::{SemanticConfig, SemanticError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ENV_ELASTICSEARCH_ENDPOINT: &str = "ELASTICSEARCH_ENDPOINT";
pub const ENV_ELASTICSEARCH_APIKEY: &str = "ELASTICSEARCH_APIKEY";
pub const ENV_ELASTICSEARCH_INDEX: &str = "ELASTICSEARCH_INDEX";
pub const ENV_EMBEDDING_API_URL: &str = "PRODSEARCH_EMBEDDING_API_URL";
pub const ENV_EMBEDDING_API_TOKEN: &str = "PRODSEARCH_EMBEDDING_API_TOKEN";

/// Errors that can occur when loading or applying pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("semantic stage: {0}")]
    Semantic(#[from] SemanticError),

    #[error("index stage: {0}")]
    Index(#[from] IndexError),
}

/// Top-level configuration for the whole search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Query embedding configuration
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Search backend and document field mapping
    #[serde(default)]
    pub index: IndexYamlConfig,

    /// Paging limits
    #[serde(default)]
    pub search: SearchYamlConfig,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults when `path` is `None`), then environment overrides,
    /// then validation of the merged result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    ///
    /// Any `ELASTICSEARCH_*` variable selects the Elasticsearch backend, so a
    /// file configured for the in-memory backend can be pointed at a cluster
    /// without editing it.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let endpoint = var(ENV_ELASTICSEARCH_ENDPOINT);
        let api_key = var(ENV_ELASTICSEARCH_APIKEY);
        let index_name = var(ENV_ELASTICSEARCH_INDEX);
        if endpoint.is_some() || api_key.is_some() || index_name.is_some() {
            let mut elastic = match std::mem::take(&mut self.index.backend) {
                BackendConfig::Elasticsearch(elastic) => elastic,
                BackendConfig::InMemory { .. } => ElasticConfig::default(),
            };
            if let Some(endpoint) = endpoint {
                debug!(endpoint = %endpoint, "elasticsearch endpoint from environment");
                elastic.endpoint = endpoint;
            }
            if let Some(index_name) = index_name {
                elastic.index = index_name;
            }
            if api_key.is_some() {
                elastic.api_key = api_key;
            }
            self.index.backend = BackendConfig::Elasticsearch(elastic);
        }

        if let Some(url) = var(ENV_EMBEDDING_API_URL) {
            debug!(url = %url, "embedding endpoint from environment");
            self.semantic.mode = "api".into();
            self.semantic.api_url = Some(url);
        }
        if let Some(token) = var(ENV_EMBEDDING_API_TOKEN) {
            // A bare token becomes a bearer credential; "Scheme value" passes through.
            self.semantic.api_auth_header = Some(if token.contains(' ') {
                token
            } else {
                format!("Bearer {token}")
            });
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.semantic.validate()?;
        self.index.validate()?;
        self.search.validate()?;

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            semantic: SemanticConfig::default(),
            index: IndexYamlConfig::default(),
            search: SearchYamlConfig::default(),
        }
    }
}

/// Search backend YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub fields: FieldMapping,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if let BackendConfig::Elasticsearch(elastic) = &self.backend {
            if elastic.endpoint.trim().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "index.backend.endpoint must not be empty".to_string(),
                ));
            }
            if elastic.index.trim().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "index.backend.index must not be empty".to_string(),
                ));
            }
            if elastic.timeout_secs == 0 {
                return Err(ConfigLoadError::Validation(
                    "index.backend.timeout_secs must be >= 1".to_string(),
                ));
            }
        }

        let fields = &self.fields;
        for (name, value) in [
            ("vector", &fields.vector),
            ("title", &fields.title),
            ("description", &fields.description),
            ("category", &fields.category),
            ("brand", &fields.brand),
            ("price", &fields.price),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigLoadError::Validation(format!(
                    "index.fields.{name} must not be empty"
                )));
            }
        }
        if !fields.title_boost.is_finite() || fields.title_boost <= 0.0 {
            return Err(ConfigLoadError::Validation(
                "index.fields.title_boost must be a positive number".to_string(),
            ));
        }
        if fields.source_includes.is_empty() {
            return Err(ConfigLoadError::Validation(
                "index.fields.source_includes must name at least one field".to_string(),
            ));
        }
        Ok(())
    }
}

/// Paging limits applied to inbound requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchYamlConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl SearchYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_limit == 0 {
            return Err(ConfigLoadError::Validation(
                "search.max_limit must be >= 1".to_string(),
            ));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigLoadError::Validation(format!(
                "search.default_limit must be between 1 and {}",
                self.max_limit
            )));
        }
        Ok(())
    }
}

impl Default for SearchYamlConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
version: "1.0"
name: "test config"
semantic:
  dimension: 384
index:
  backend:
    kind: "in_memory"
"#;

        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.name, Some("test config".to_string()));
        assert_eq!(config.semantic.dimension, 384);
        assert_eq!(config.semantic.mode, "fast");
        assert_eq!(config.index.backend, BackendConfig::in_memory());
        assert_eq!(config.index.fields, FieldMapping::default());
        assert_eq!(config.search.max_limit, 100);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
version: "1"
index:
  backend:
    kind: "elasticsearch"
    endpoint: "http://es.internal:9200"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        let BackendConfig::Elasticsearch(elastic) = &config.index.backend else {
            panic!("expected elasticsearch backend");
        };
        assert_eq!(elastic.endpoint, "http://es.internal:9200");
        assert_eq!(elastic.index, "products");
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.version, "1.0");
        assert!(config.name.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = PipelineConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_semantic_validation() {
        let yaml = r#"
version: "1.0"
semantic:
  mode: "api"
"#;

        let result = PipelineConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigLoadError::Semantic(_))));
    }

    #[test]
    fn test_search_limit_validation() {
        let yaml = r#"
version: "1.0"
search:
  default_limit: 50
  max_limit: 20
"#;

        let err = PipelineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("default_limit"));
    }

    #[test]
    fn test_field_validation() {
        let yaml = r#"
version: "1.0"
index:
  fields:
    title_boost: 0
"#;

        let err = PipelineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("title_boost"));
    }

    #[test]
    fn test_env_overrides_elasticsearch() {
        let mut config = PipelineConfig::from_yaml(
            "version: \"1.0\"\nindex:\n  backend:\n    kind: in_memory\n",
        )
        .unwrap();

        config.apply_env_with(env(&[
            (ENV_ELASTICSEARCH_ENDPOINT, "https://cluster:9243 "),
            (ENV_ELASTICSEARCH_APIKEY, "c2VjcmV0"),
            (ENV_ELASTICSEARCH_INDEX, ""),
        ]));

        assert_eq!(
            config.index.backend,
            BackendConfig::Elasticsearch(ElasticConfig {
                endpoint: "https://cluster:9243".into(),
                api_key: Some("c2VjcmV0".into()),
                ..ElasticConfig::default()
            })
        );
    }

    #[test]
    fn test_env_overrides_embedding_api() {
        let mut config = PipelineConfig::default();
        config.apply_env_with(env(&[
            (ENV_EMBEDDING_API_URL, "http://embedder:9000/embed"),
            (ENV_EMBEDDING_API_TOKEN, "abc123"),
        ]));

        assert!(config.semantic.is_api_mode());
        assert_eq!(config.semantic.api_url.as_deref(), Some("http://embedder:9000/embed"));
        assert_eq!(config.semantic.api_auth_header.as_deref(), Some("Bearer abc123"));
        assert!(config.validate().is_ok());

        config.apply_env_with(env(&[(ENV_EMBEDDING_API_TOKEN, "Basic dXNlcg==")]));
        assert_eq!(config.semantic.api_auth_header.as_deref(), Some("Basic dXNlcg=="));
    }

    #[test]
    fn test_no_env_leaves_config_untouched() {
        let mut config = PipelineConfig::default();
        config.apply_env_with(|_| None);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_full_yaml_roundtrip() {
        let mut config = PipelineConfig {
            name: Some("production".into()),
            ..PipelineConfig::default()
        };
        config.semantic.dimension = 768;
        config.index.fields.title_boost = 3.0;

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
