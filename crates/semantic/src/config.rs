use serde::{Deserialize, Serialize};

use crate::boosts::BoostTable;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::SemanticError;

/// Runtime configuration for query embeddings: which backend to call, what shape
/// its vectors have, and how the fallback behaves when it can't be reached.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://bedrock-runtime.us-east-1.amazonaws.com/model/amazon.titan-embed-text-v1/invoke".into()),
///     api_provider: Some("titan".into()),
///     dimension: 1536,
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// `"api"` calls the remote backend and falls back on failure; `"fast"` skips the
    /// backend entirely and always uses fallback vectors.
    pub mode: String,
    /// Friendly label surfaced on every `QueryEmbedding`; also sent as `model` to
    /// OpenAI-style backends.
    pub model_name: String,
    /// Embedding endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header value (e.g., `"Bearer xxx"`).
    pub api_auth_header: Option<String>,
    /// Payload dialect: `"titan"`, `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Per-request timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Vector length every embedding must have. Must match the index mapping.
    pub dimension: usize,
    /// Fallback components are drawn uniformly from `[-fallback_range, fallback_range]`.
    pub fallback_range: f32,
    /// Sent to the live backend in place of blank query text.
    pub placeholder_text: String,
    /// L2-normalize vectors before handing them to the index.
    pub normalize: bool,
    /// Term boosts applied to fallback vectors.
    pub boosts: BoostTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_config: Option<CircuitBreakerConfig>,
    /// Retry and circuit breaking around live calls. Defaults to true.
    pub enable_resilience: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "fast".into(),
            model_name: "amazon.titan-embed-text-v1".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(10),
            dimension: 1536,
            fallback_range: 0.1,
            placeholder_text: "empty query".into(),
            normalize: false,
            boosts: BoostTable::default(),
            retry_config: None,           // Uses defaults when None
            circuit_breaker_config: None, // Uses defaults when None
            enable_resilience: true,
        }
    }
}

impl SemanticConfig {
    pub fn is_api_mode(&self) -> bool {
        self.mode.eq_ignore_ascii_case("api")
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        let mode = self.mode.to_ascii_lowercase();
        if mode != "api" && mode != "fast" {
            return Err(SemanticError::InvalidConfig(format!(
                "mode must be 'api' or 'fast', got '{}'",
                self.mode
            )));
        }
        if self.dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        if !self.fallback_range.is_finite() || self.fallback_range <= 0.0 {
            return Err(SemanticError::InvalidConfig(
                "fallback_range must be a positive number".into(),
            ));
        }
        if self.is_api_mode()
            && self
                .api_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(SemanticError::InvalidConfig(
                "api_url is required for api mode".into(),
            ));
        }
        if self.api_timeout_secs == Some(0) {
            return Err(SemanticError::InvalidConfig(
                "api_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, "fast");
        assert_eq!(cfg.dimension, 1536);
        assert_eq!(cfg.placeholder_text, "empty query");
        assert!(cfg.api_url.is_none());
        assert!(cfg.enable_resilience);
        assert!(!cfg.boosts.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_mode_requires_url() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("api_url"));
    }

    #[test]
    fn rejects_bad_shapes() {
        let zero_dim = SemanticConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(zero_dim.validate().is_err());

        let bad_range = SemanticConfig {
            fallback_range: f32::NAN,
            ..Default::default()
        };
        assert!(bad_range.validate().is_err());

        let bad_mode = SemanticConfig {
            mode: "onnx".into(),
            ..Default::default()
        };
        assert!(bad_mode.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: SemanticConfig =
            serde_json::from_str(r#"{"mode":"api","api_url":"http://localhost:9000/embed","dimension":384}"#)
                .unwrap();
        assert!(cfg.is_api_mode());
        assert_eq!(cfg.dimension, 384);
        assert_eq!(cfg.placeholder_text, "empty query");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn resilience_durations_serialize_as_millis() {
        let cfg = SemanticConfig {
            retry_config: Some(RetryConfig::default()),
            ..Default::default()
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["retry_config"]["base_delay"], 100);
        assert!(json.get("circuit_breaker_config").is_none());
    }
}
