use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::resilience::{execute_with_retry_async, CircuitBreaker, RetryConfig};
use crate::{EmbeddingBackend, SemanticConfig, SemanticError};

/// Request/response dialect spoken by the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProviderKind {
    /// Bedrock Titan: `{"inputText": ..}` -> `{"embedding": [..]}`.
    Titan,
    /// Hugging Face feature extraction: `{"inputs": ..}` -> `[..]` or `[[..]]`.
    HuggingFace,
    /// OpenAI-compatible: `{"input": .., "model": ..}` -> `{"data": [{"embedding": [..]}]}`.
    OpenAI,
    /// `{"text": ..}` -> any of the shapes above.
    Custom,
}

impl ApiProviderKind {
    pub fn from_name(name: Option<&str>) -> Self {
        match name.unwrap_or("custom").to_ascii_lowercase().as_str() {
            "titan" | "bedrock" => ApiProviderKind::Titan,
            "hf" | "huggingface" => ApiProviderKind::HuggingFace,
            "openai" | "gpt" => ApiProviderKind::OpenAI,
            _ => ApiProviderKind::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProviderKind::Titan => "titan",
            ApiProviderKind::HuggingFace => "hf",
            ApiProviderKind::OpenAI => "openai",
            ApiProviderKind::Custom => "custom",
        }
    }
}

/// Live embedding backend reached over HTTP.
///
/// Each instance owns its own connection pool and circuit breaker, so two
/// providers pointed at different endpoints never trip each other.
pub struct HttpEmbeddingBackend {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    provider: ApiProviderKind,
    model_name: String,
    retry: RetryConfig,
    breaker: Option<CircuitBreaker>,
}

impl HttpEmbeddingBackend {
    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let url = cfg
            .api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;

        let timeout = Duration::from_secs(cfg.api_timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let (retry, breaker) = if cfg.enable_resilience {
            (
                cfg.retry_config.unwrap_or_default(),
                Some(CircuitBreaker::new(
                    cfg.circuit_breaker_config.unwrap_or_default(),
                )),
            )
        } else {
            (RetryConfig::disabled(), None)
        };

        Ok(Self {
            client,
            url: url.to_string(),
            auth_header: cfg.api_auth_header.clone(),
            provider: ApiProviderKind::from_name(cfg.api_provider.as_deref()),
            model_name: cfg.model_name.clone(),
            retry,
            breaker,
        })
    }

    pub fn provider(&self) -> ApiProviderKind {
        self.provider
    }

    pub fn breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_ref()
    }

    async fn send(&self, payload: &Value) -> Result<Value, SemanticError> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SemanticError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::MalformedResponse(format!("invalid JSON: {e}")))
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn invoke(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        if let Some(cb) = &self.breaker {
            if !cb.allow_request() {
                return Err(SemanticError::CircuitOpen(self.provider.as_str().into()));
            }
        }

        let payload = build_api_payload(self.provider, text, &self.model_name);
        let outcome = execute_with_retry_async(
            &self.retry,
            |attempt| {
                let payload = &payload;
                async move {
                    if attempt > 0 {
                        debug!(attempt, backend = self.provider.as_str(), "retrying embedding request");
                    }
                    self.send(payload).await
                }
            },
            SemanticError::is_retryable,
        )
        .await;

        let attempts = outcome.attempts;
        // A 200 with an unusable body counts against the breaker too.
        let result = outcome.into_result().and_then(parse_embedding);
        if let Some(cb) = &self.breaker {
            match &result {
                Ok(_) => cb.record_success(),
                Err(_) => cb.record_failure(),
            }
        }
        if result.is_ok() {
            debug!(attempts, backend = self.provider.as_str(), "embedding backend answered");
        }
        result
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

fn build_api_payload(provider: ApiProviderKind, text: &str, model_name: &str) -> Value {
    match provider {
        ApiProviderKind::Titan => json!({ "inputText": text }),
        ApiProviderKind::HuggingFace => json!({ "inputs": text }),
        ApiProviderKind::OpenAI => json!({ "input": text, "model": model_name }),
        ApiProviderKind::Custom => json!({ "text": text }),
    }
}

/// Pull the single query vector out of whichever response shape the backend uses.
fn parse_embedding(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embedding) = map.remove("embedding") {
                return parse_embedding_collection(embedding);
            }
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }
            if let Some(Value::Array(items)) = map.remove("data") {
                let first = items.into_iter().next().ok_or(SemanticError::EmptyEmbedding)?;
                return match first {
                    Value::Object(mut obj) => obj
                        .remove("embedding")
                        .ok_or_else(|| {
                            SemanticError::MalformedResponse(
                                "missing `embedding` field in data item".into(),
                            )
                        })
                        .and_then(parse_embedding_vector),
                    _ => Err(SemanticError::MalformedResponse(
                        "unexpected entry inside `data` array".into(),
                    )),
                };
            }
            Err(SemanticError::MalformedResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

/// Accepts `[..]` or `[[..], ..]` and returns the first vector.
fn parse_embedding_collection(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(items) if items.is_empty() => Err(SemanticError::EmptyEmbedding),
        Value::Array(items) if items.iter().all(Value::is_array) => items
            .into_iter()
            .next()
            .map(parse_embedding_vector)
            .unwrap_or(Err(SemanticError::EmptyEmbedding)),
        other => parse_embedding_vector(other),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    let values = match value {
        Value::Array(values) => values,
        other => {
            return Err(SemanticError::MalformedResponse(format!(
                "embedding vector must be an array, got {other}"
            )))
        }
    };
    if values.is_empty() {
        return Err(SemanticError::EmptyEmbedding);
    }
    values
        .into_iter()
        .map(|entry| match entry {
            Value::Number(num) => num
                .as_f64()
                .map(|f| f as f32)
                .filter(|f| f.is_finite())
                .ok_or_else(|| SemanticError::MalformedResponse("non-finite embedding value".into())),
            other => Err(SemanticError::MalformedResponse(format!(
                "embedding entries must be numbers, got {other}"
            ))),
        })
        .collect()
}
